use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, prelude::Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of every account number, in ASCII digits.
pub const ACCOUNT_NUMBER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => f.write_str("Deposit"),
            TransactionKind::Withdrawal => f.write_str("Withdrawal"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_kind(s)
    }
}

/// A deposit or withdrawal request against a single account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionCommand {
    pub kind: TransactionKind,
    pub amount: Decimal,
}

impl TransactionCommand {
    pub fn deposit(amount: Decimal) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount,
        }
    }

    pub fn withdrawal(amount: Decimal) -> Self {
        Self {
            kind: TransactionKind::Withdrawal,
            amount,
        }
    }

    /// Builds a command from raw user input, rejecting unknown kinds and
    /// amounts that are not strictly positive.
    pub fn parse(kind: &str, amount: &str) -> Result<Self, CommandError> {
        Ok(Self {
            kind: parse_kind(kind)?,
            amount: parse_amount(amount)?,
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Account number must be exactly 8 digits, got `{0}`")]
    InvalidAccountNumber(String),
    #[error("`{0}` is not a valid amount")]
    InvalidAmount(String),
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("Opening balance must not be negative, got {0}")]
    NegativeBalance(Decimal),
    #[error("Unknown transaction type `{0}`, expected `deposit` or `withdrawal`")]
    UnknownKind(String),
}

/// Exactly [`ACCOUNT_NUMBER_LEN`] characters, all ASCII digits.
pub fn is_valid_account_number(input: &str) -> bool {
    input.len() == ACCOUNT_NUMBER_LEN && input.bytes().all(|b| b.is_ascii_digit())
}

pub fn is_valid_transaction_amount(input: &str) -> bool {
    parse_amount(input).is_ok()
}

/// Parses a transaction amount: a decimal number strictly greater than zero.
pub fn parse_amount(input: &str) -> Result<Decimal, CommandError> {
    let amount = parse_decimal(input)?;
    if amount > Decimal::zero() {
        Ok(amount)
    } else {
        Err(CommandError::NonPositiveAmount(amount))
    }
}

/// Parses an opening balance: any decimal number that is not negative.
pub fn parse_opening_balance(input: &str) -> Result<Decimal, CommandError> {
    let balance = parse_decimal(input)?;
    if balance >= Decimal::zero() {
        Ok(balance)
    } else {
        Err(CommandError::NegativeBalance(balance))
    }
}

pub fn parse_kind(input: &str) -> Result<TransactionKind, CommandError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "deposit" | "d" => Ok(TransactionKind::Deposit),
        "withdrawal" | "withdraw" | "w" => Ok(TransactionKind::Withdrawal),
        _ => Err(CommandError::UnknownKind(input.trim().to_string())),
    }
}

fn parse_decimal(input: &str) -> Result<Decimal, CommandError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed).map_err(|_| CommandError::InvalidAmount(trimmed.to_string()))
}
