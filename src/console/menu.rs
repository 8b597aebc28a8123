use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    CreateAccount,
    Transaction,
    AccountDetails,
    Transfer,
    TransactionHistory,
    Reports,
    Exit,
}

impl MenuOption {
    pub const ALL: [MenuOption; 7] = [
        MenuOption::CreateAccount,
        MenuOption::Transaction,
        MenuOption::AccountDetails,
        MenuOption::Transfer,
        MenuOption::TransactionHistory,
        MenuOption::Reports,
        MenuOption::Exit,
    ];

    pub fn key(self) -> usize {
        match self {
            MenuOption::CreateAccount => 1,
            MenuOption::Transaction => 2,
            MenuOption::AccountDetails => 3,
            MenuOption::Transfer => 4,
            MenuOption::TransactionHistory => 5,
            MenuOption::Reports => 6,
            MenuOption::Exit => 7,
        }
    }
}

impl fmt::Display for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuOption::CreateAccount => "Create account",
            MenuOption::Transaction => "Deposit / withdraw",
            MenuOption::AccountDetails => "Display account details",
            MenuOption::Transfer => "Transfer funds",
            MenuOption::TransactionHistory => "Transaction history",
            MenuOption::Reports => "Generate reports",
            MenuOption::Exit => "Exit",
        })
    }
}

impl FromStr for MenuOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = s.trim();
        choice
            .parse::<usize>()
            .ok()
            .and_then(|key| Self::ALL.into_iter().find(|opt| opt.key() == key))
            .ok_or_else(|| choice.to_string())
    }
}

pub fn write_menu<W>(output: &mut W) -> io::Result<()>
where
    W: Write,
{
    writeln!(output)?;
    writeln!(output, "===== Bank Menu =====")?;
    for option in MenuOption::ALL {
        writeln!(output, "{}. {option}", option.key())?;
    }
    Ok(())
}
