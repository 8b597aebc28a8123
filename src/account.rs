use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{CommandError, TransactionCommand, TransactionKind, is_valid_account_number};

/// Eight ASCII digits, validated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if is_valid_account_number(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(CommandError::InvalidAccountNumber(s.to_string()))
        }
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable entry of an account's transaction log.
///
/// Records are the source of truth for the balance: an account's current
/// funds are always its opening balance with every record applied in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub kind: TransactionKind,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance_after: Decimal,
}

impl fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.2} -- {} -- Current funds: {:.2}",
            self.kind,
            self.amount,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.balance_after
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("{kind} amount must be greater than zero, got {amount}")]
    NonPositiveAmount {
        kind: TransactionKind,
        amount: Decimal,
    },
    #[error("Insufficient funds: requested {requested:.2}, available {available:.2}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },
    #[error("History entry {entry} cannot be replayed: {source}")]
    UnreplayableEntry {
        entry: usize,
        source: Box<AccountError>,
    },
    #[error("History entry {entry} records a balance of {recorded:.2}, but replay gives {replayed:.2}")]
    BalanceMismatch {
        entry: usize,
        recorded: Decimal,
        replayed: Decimal,
    },
}

#[derive(Debug, Clone)]
pub struct Account {
    number: AccountNumber,
    holder_name: String,
    opening_balance: Decimal,
    balance: Decimal,
    history: Vec<TransactionRecord>,
}

impl Account {
    /// Opening balance is rounded to two decimal places.
    pub fn new(number: AccountNumber, holder_name: String, opening_balance: Decimal) -> Self {
        let opening_balance = opening_balance.round_dp(2);
        Self {
            number,
            holder_name,
            opening_balance,
            balance: opening_balance,
            history: Vec::new(),
        }
    }

    /// Rebuilds an account by replaying stored records from its opening balance.
    ///
    /// Every record must be acceptable at the point it is replayed, and its
    /// `balance_after` must match the running balance. `entry` in the
    /// returned errors is 1-based.
    pub fn restore(
        number: AccountNumber,
        holder_name: String,
        opening_balance: Decimal,
        records: impl IntoIterator<Item = TransactionRecord>,
    ) -> Result<Self, AccountError> {
        let mut account = Self::new(number, holder_name, opening_balance);
        for (idx, record) in records.into_iter().enumerate() {
            let entry = idx + 1;
            let replayed = account
                .handle_transaction(
                    TransactionCommand {
                        kind: record.kind,
                        amount: record.amount,
                    },
                    record.timestamp,
                )
                .map_err(|source| AccountError::UnreplayableEntry {
                    entry,
                    source: Box::new(source),
                })?;
            if replayed.balance_after != record.balance_after {
                return Err(AccountError::BalanceMismatch {
                    entry,
                    recorded: record.balance_after,
                    replayed: replayed.balance_after,
                });
            }
            account.apply(&replayed);
        }
        Ok(account)
    }

    pub fn number(&self) -> &AccountNumber {
        &self.number
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    pub fn opening_balance(&self) -> Decimal {
        self.opening_balance
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn history(&self) -> &[TransactionRecord] {
        &self.history
    }

    pub fn deposit(&mut self, amount: Decimal) -> Result<TransactionRecord, AccountError> {
        self.execute(TransactionCommand::deposit(amount))
    }

    pub fn withdraw(&mut self, amount: Decimal) -> Result<TransactionRecord, AccountError> {
        self.execute(TransactionCommand::withdrawal(amount))
    }

    /// Validates and applies the command, timestamped now.
    /// A rejected command leaves balance and history untouched.
    pub fn execute(
        &mut self,
        command: TransactionCommand,
    ) -> Result<TransactionRecord, AccountError> {
        let record = self.handle_transaction(command, Utc::now())?;
        self.apply(&record);
        tracing::debug!(
            account = %self.number,
            kind = %record.kind,
            amount = %record.amount,
            balance = %record.balance_after,
            "transaction applied"
        );
        Ok(record)
    }

    pub fn handle_transaction(
        &self,
        command: TransactionCommand,
        timestamp: DateTime<Utc>,
    ) -> Result<TransactionRecord, AccountError> {
        if command.amount <= Decimal::zero() {
            return Err(AccountError::NonPositiveAmount {
                kind: command.kind,
                amount: command.amount,
            });
        }

        let balance_after = match command.kind {
            TransactionKind::Deposit => self.balance + command.amount,
            TransactionKind::Withdrawal => {
                if command.amount > self.balance {
                    return Err(AccountError::InsufficientFunds {
                        requested: command.amount,
                        available: self.balance,
                    });
                }
                self.balance - command.amount
            }
        };

        Ok(TransactionRecord {
            kind: command.kind,
            amount: command.amount,
            timestamp,
            balance_after,
        })
    }

    pub fn apply(&mut self, record: &TransactionRecord) {
        match record.kind {
            TransactionKind::Deposit => self.balance += record.amount,
            TransactionKind::Withdrawal => self.balance -= record.amount,
        }
        self.history.push(record.clone());
    }

    pub fn total_deposited(&self) -> Decimal {
        self.total_of(TransactionKind::Deposit)
    }

    pub fn total_withdrawn(&self) -> Decimal {
        self.total_of(TransactionKind::Withdrawal)
    }

    fn total_of(&self, kind: TransactionKind) -> Decimal {
        self.history
            .iter()
            .filter(|record| record.kind == kind)
            .map(|record| record.amount)
            .sum()
    }

    pub fn details(&self) -> AccountDetails {
        AccountDetails {
            number: self.number.clone(),
            holder_name: self.holder_name.clone(),
            opening_balance: self.opening_balance,
            balance: self.balance,
            total_deposited: self.total_deposited(),
            total_withdrawn: self.total_withdrawn(),
            transaction_count: self.history.len(),
        }
    }
}

/// Snapshot summary of one account, displayed as a multi-line block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDetails {
    pub number: AccountNumber,
    pub holder_name: String,
    pub opening_balance: Decimal,
    pub balance: Decimal,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub transaction_count: usize,
}

impl fmt::Display for AccountDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Account number: {}", self.number)?;
        writeln!(f, "Account holder: {}", self.holder_name)?;
        writeln!(f, "Opening balance: {:.2}", self.opening_balance)?;
        writeln!(f, "Current balance: {:.2}", self.balance)?;
        writeln!(f, "Total deposits: {:.2}", self.total_deposited)?;
        writeln!(f, "Total withdrawals: {:.2}", self.total_withdrawn)?;
        writeln!(f, "Transactions: {}", self.transaction_count)
    }
}
