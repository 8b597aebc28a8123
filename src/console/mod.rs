//! Menu-driven front end over a [`Bank`].
//!
//! Kept in the library rather than the binary so the integration tests can
//! drive whole sessions from scripted input.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::{
    bank::Bank,
    command::{TransactionCommand, parse_amount, parse_opening_balance},
    storage::{LedgerStore, LoadOutcome, SaveOutcome},
};
use menu::{MenuOption, write_menu};

pub mod menu;

/// Loads the ledger from `store`, runs a session over it and saves it back.
///
/// The ledger is saved even when the session stops on an I/O error; that
/// error is returned once the save is done.
pub fn run_with_store<R, W>(store: &LedgerStore, input: R, output: &mut W) -> Result<SaveOutcome>
where
    R: BufRead,
    W: Write,
{
    // an unreadable ledger must not be replaced by an empty one on exit
    let LoadOutcome {
        mut bank, skipped, ..
    } = store
        .load()
        .with_context(|| format!("Failed to load ledger from `{}`", store.root().display()))?;

    let session = Session {
        input,
        output,
        bank: &mut bank,
    }
    .run();
    if let Err(err) = &session {
        tracing::error!("session ended early, saving anyway: {err:#}");
    }

    let saved = store
        .save(&bank, &skipped)
        .with_context(|| format!("Failed to save ledger to `{}`", store.root().display()))?;
    session?;
    Ok(saved)
}

enum Flow {
    Continue,
    Exit,
}

/// One interactive session. Ends on the exit option or end of input;
/// saving is left to the caller.
pub struct Session<'w, 'b, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub bank: &'b mut Bank,
}

impl<'w, 'b, R, W> Session<'w, 'b, R, W>
where
    R: BufRead,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        loop {
            write_menu(self.output).context("Failed to write menu")?;
            let Some(choice) = self.prompt("Enter your choice: ")? else {
                break;
            };
            let flow = match choice.parse::<MenuOption>() {
                Ok(option) => self.handle(option)?,
                Err(choice) => {
                    writeln!(self.output, "Invalid option `{choice}`, choose 1-7.")?;
                    Flow::Continue
                }
            };
            if let Flow::Exit = flow {
                break;
            }
        }
        self.output.flush()?;
        Ok(())
    }

    fn handle(&mut self, option: MenuOption) -> Result<Flow> {
        tracing::debug!(%option, "menu option selected");
        match option {
            MenuOption::CreateAccount => self.create_account(),
            MenuOption::Transaction => self.perform_transaction(),
            MenuOption::AccountDetails => self.account_details(),
            MenuOption::Transfer => self.transfer(),
            MenuOption::TransactionHistory => self.transaction_history(),
            MenuOption::Reports => self.reports(),
            MenuOption::Exit => {
                writeln!(self.output, "Goodbye.")?;
                Ok(Flow::Exit)
            }
        }
    }

    /// `None` once input is exhausted.
    fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn create_account(&mut self) -> Result<Flow> {
        let Some(number) = self.prompt("Account number (8 digits): ")? else {
            return Ok(Flow::Exit);
        };
        let Some(first_name) = self.prompt("First name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(last_name) = self.prompt("Last name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(balance) = self.prompt("Initial balance: ")? else {
            return Ok(Flow::Exit);
        };

        let balance = match parse_opening_balance(&balance) {
            Ok(balance) => balance,
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        match self
            .bank
            .create_account(&number, &first_name, &last_name, balance)
        {
            Ok(acc) => writeln!(
                self.output,
                "Account {} created for {} with balance {:.2}.",
                acc.number(),
                acc.holder_name(),
                acc.balance()
            )?,
            Err(err) => writeln!(self.output, "Error: {err}")?,
        }
        Ok(Flow::Continue)
    }

    fn perform_transaction(&mut self) -> Result<Flow> {
        let Some(number) = self.prompt("Account number: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(kind) = self.prompt("Transaction type (deposit/withdrawal): ")? else {
            return Ok(Flow::Exit);
        };
        let Some(amount) = self.prompt("Amount: ")? else {
            return Ok(Flow::Exit);
        };

        let command = match TransactionCommand::parse(&kind, &amount) {
            Ok(command) => command,
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        match self
            .bank
            .perform_transaction(&number, command.amount, command.kind)
        {
            Ok(record) => writeln!(self.output, "Recorded {record}")?,
            Err(err) => writeln!(self.output, "Error: {err}")?,
        }
        Ok(Flow::Continue)
    }

    fn account_details(&mut self) -> Result<Flow> {
        let Some(number) = self.prompt("Account number: ")? else {
            return Ok(Flow::Exit);
        };
        match self.bank.display_account_details(&number) {
            Some(details) => write!(self.output, "{details}")?,
            None => writeln!(self.output, "Account {number} not found.")?,
        }
        Ok(Flow::Continue)
    }

    fn transfer(&mut self) -> Result<Flow> {
        let Some(from) = self.prompt("From account: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(to) = self.prompt("To account: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(amount) = self.prompt("Amount: ")? else {
            return Ok(Flow::Exit);
        };

        let amount = match parse_amount(&amount) {
            Ok(amount) => amount,
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Flow::Continue);
            }
        };
        match self.bank.transfer(&from, &to, amount) {
            Ok((withdrawal, _)) => writeln!(
                self.output,
                "Transferred {:.2} from {from} to {to}.",
                withdrawal.amount
            )?,
            Err(err) => writeln!(self.output, "Error: {err}")?,
        }
        Ok(Flow::Continue)
    }

    fn transaction_history(&mut self) -> Result<Flow> {
        let Some(number) = self.prompt("Account number: ")? else {
            return Ok(Flow::Exit);
        };
        match self.bank.transaction_history(&number) {
            None => writeln!(self.output, "Account {number} not found.")?,
            Some([]) => writeln!(self.output, "No transactions recorded.")?,
            Some(records) => {
                for record in records {
                    writeln!(self.output, "{record}")?;
                }
            }
        }
        Ok(Flow::Continue)
    }

    fn reports(&mut self) -> Result<Flow> {
        if self.bank.is_empty() {
            writeln!(self.output, "No accounts.")?;
        } else {
            write!(self.output, "{}", self.bank.generate_reports())?;
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader, Read};

    use super::*;

    fn run_script(bank: &mut Bank, script: &str) -> String {
        let mut output = Vec::new();
        Session {
            input: script.as_bytes(),
            output: &mut output,
            bank,
        }
        .run()
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn exit_and_end_of_input_both_stop() {
        let mut bank = Bank::new();
        let out = run_script(&mut bank, "7\n6\n");
        assert!(out.contains("Goodbye."));
        assert!(!out.contains("No accounts."));

        let out = run_script(&mut bank, "6\n");
        assert!(out.contains("No accounts."));
        assert!(!out.contains("Goodbye."));
    }

    #[test]
    fn invalid_choice_reprompts() {
        let mut bank = Bank::new();
        let out = run_script(&mut bank, "9\nabc\n7\n");
        assert!(out.contains("Invalid option `9`, choose 1-7."));
        assert!(out.contains("Invalid option `abc`, choose 1-7."));
        assert_eq!(out.matches("===== Bank Menu =====").count(), 3);
    }

    #[test]
    fn input_ending_mid_prompt() {
        let mut bank = Bank::new();
        let out = run_script(&mut bank, "1\n12345678\nJane\n");
        assert!(out.ends_with("Last name: "));
        assert!(bank.is_empty());
    }

    #[test]
    fn validation_errors_are_printed() {
        let mut bank = Bank::new();
        let out = run_script(
            &mut bank,
            "1\n1234\nJane\nDoe\n10\n\
             1\n12345678\nJane\nDoe\n-10\n\
             2\n12345678\nrefund\n10\n\
             3\n12345678\n7\n",
        );
        assert!(out.contains("Error: Account number must be exactly 8 digits, got `1234`"));
        assert!(out.contains("Error: Opening balance must not be negative, got -10"));
        assert!(out.contains("Error: Unknown transaction type `refund`"));
        assert!(out.contains("Account 12345678 not found."));
        assert!(bank.is_empty());
    }

    struct BrokenInput;

    impl Read for BrokenInput {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("input closed"))
        }
    }

    #[test]
    fn ledger_is_saved_when_session_fails() {
        let dir = std::env::temp_dir().join(format!("cute-bank-broken-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = LedgerStore::new(&dir);

        let script = "1\n12345678\nJane\nDoe\n10\n".as_bytes();
        let input = BufReader::new(script.chain(BrokenInput));
        let err = run_with_store(&store, input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to read input"));

        let loaded = store.load().unwrap();
        assert!(loaded.issues.is_empty());
        let acc = loaded.bank.find_account("12345678").unwrap();
        assert_eq!(acc.holder_name(), "Jane Doe");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn run_with_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("cute-bank-store-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = LedgerStore::new(&dir);

        run_with_store(&store, "1\n12345678\nJane\nDoe\n10\n7\n".as_bytes(), &mut Vec::new())
            .unwrap();
        let mut output = Vec::new();
        run_with_store(&store, "2\n12345678\nw\n4\n7\n".as_bytes(), &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("Current funds: 6.00"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.bank.find_account("12345678").unwrap().balance().to_string(), "6");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
