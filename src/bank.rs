use chrono::Utc;
use rust_decimal::{Decimal, prelude::Zero};
use thiserror::Error;

use crate::{
    account::{Account, AccountDetails, AccountError, AccountNumber, TransactionRecord},
    command::{CommandError, TransactionCommand, TransactionKind},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("{field} must not be empty")]
    EmptyName { field: &'static str },
    #[error("Opening balance must not be negative, got {0}")]
    NegativeOpeningBalance(Decimal),
    #[error("Account {0} already exists")]
    DuplicateAccount(AccountNumber),
    #[error("Account {0} not found")]
    AccountNotFound(String),
    #[error("Cannot transfer funds from an account to itself")]
    SameAccountTransfer,
}

/// The ledger: every account known to this process, in creation order.
///
/// Account numbers are unique. Lookups are linear scans, which is fine for
/// the handful of accounts an interactive session deals with.
#[derive(Debug, Default)]
pub struct Bank {
    accounts: Vec<Account>,
}

impl Bank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn create_account(
        &mut self,
        number: &str,
        first_name: &str,
        last_name: &str,
        initial_balance: Decimal,
    ) -> Result<&Account, BankError> {
        let number: AccountNumber = number.parse()?;
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(BankError::EmptyName {
                field: "First name",
            });
        }
        let last_name = last_name.trim();
        if last_name.is_empty() {
            return Err(BankError::EmptyName { field: "Last name" });
        }
        if initial_balance < Decimal::zero() {
            return Err(BankError::NegativeOpeningBalance(initial_balance));
        }

        let account = Account::new(number, format!("{first_name} {last_name}"), initial_balance);
        let account = self.insert_account(account)?;
        tracing::debug!(account = %account.number(), "account created");
        Ok(account)
    }

    /// Registers an already built account, e.g. one restored from storage.
    pub fn insert_account(&mut self, account: Account) -> Result<&Account, BankError> {
        if self.find_account(account.number().as_str()).is_some() {
            return Err(BankError::DuplicateAccount(account.number().clone()));
        }
        let idx = self.accounts.len();
        self.accounts.push(account);
        Ok(&self.accounts[idx])
    }

    pub fn find_account(&self, number: &str) -> Option<&Account> {
        let number = number.trim();
        self.accounts
            .iter()
            .find(|acc| acc.number().as_str() == number)
    }

    fn position(&self, number: &str) -> Result<usize, BankError> {
        let number = number.trim();
        self.accounts
            .iter()
            .position(|acc| acc.number().as_str() == number)
            .ok_or_else(|| BankError::AccountNotFound(number.to_string()))
    }

    /// Deposits into or withdraws from an account. The amount is rounded to
    /// two decimal places first; a rejection leaves the ledger unchanged.
    pub fn perform_transaction(
        &mut self,
        number: &str,
        amount: Decimal,
        kind: TransactionKind,
    ) -> Result<TransactionRecord, BankError> {
        let idx = self.position(number)?;
        let record = self.accounts[idx].execute(TransactionCommand {
            kind,
            amount: amount.round_dp(2),
        })?;
        Ok(record)
    }

    /// Moves funds between two distinct accounts. Both legs are validated
    /// before either is applied, so a rejected transfer changes nothing.
    pub fn transfer(
        &mut self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<(TransactionRecord, TransactionRecord), BankError> {
        let from_idx = self.position(from)?;
        let to_idx = self.position(to)?;
        if from_idx == to_idx {
            return Err(BankError::SameAccountTransfer);
        }

        let amount = amount.round_dp(2);
        let now = Utc::now();
        let withdrawal = self.accounts[from_idx]
            .handle_transaction(TransactionCommand::withdrawal(amount), now)?;
        let deposit =
            self.accounts[to_idx].handle_transaction(TransactionCommand::deposit(amount), now)?;

        self.accounts[from_idx].apply(&withdrawal);
        self.accounts[to_idx].apply(&deposit);
        tracing::debug!(
            from = %self.accounts[from_idx].number(),
            to = %self.accounts[to_idx].number(),
            %amount,
            "transfer applied"
        );
        Ok((withdrawal, deposit))
    }

    pub fn display_account_details(&self, number: &str) -> Option<AccountDetails> {
        self.find_account(number).map(Account::details)
    }

    pub fn transaction_history(&self, number: &str) -> Option<&[TransactionRecord]> {
        self.find_account(number).map(Account::history)
    }

    /// Every account's summary, concatenated in creation order.
    pub fn generate_reports(&self) -> String {
        self.accounts
            .iter()
            .map(|acc| acc.details().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn create_and_transact() {
        let mut bank = Bank::new();
        let acc = bank
            .create_account("12345678", "Jane", "Doe", dec("100.00"))
            .unwrap();
        assert_eq!(acc.holder_name(), "Jane Doe");
        assert_eq!(acc.balance(), dec("100"));

        let record = bank
            .perform_transaction("12345678", dec("50.00"), TransactionKind::Deposit)
            .unwrap();
        assert_eq!(record.kind, TransactionKind::Deposit);
        assert_eq!(record.amount, dec("50"));
        let acc = bank.find_account("12345678").unwrap();
        assert_eq!(acc.balance(), dec("150"));
        assert_eq!(acc.history().len(), 1);

        let err = bank
            .perform_transaction("12345678", dec("200.00"), TransactionKind::Withdrawal)
            .unwrap_err();
        assert!(matches!(
            err,
            BankError::Account(AccountError::InsufficientFunds { .. })
        ));
        assert_eq!(bank.find_account("12345678").unwrap().balance(), dec("150"));

        bank.perform_transaction("12345678", dec("150.00"), TransactionKind::Withdrawal)
            .unwrap();
        let acc = bank.find_account("12345678").unwrap();
        assert_eq!(acc.balance(), Decimal::zero());
        assert_eq!(acc.history().len(), 2);
    }

    #[test]
    fn create_account_validation() {
        let mut bank = Bank::new();
        for bad in ["123", "ABCDEFGH", "123456789"] {
            let err = bank
                .create_account(bad, "Jane", "Doe", dec("1"))
                .unwrap_err();
            assert_eq!(
                err,
                BankError::Command(CommandError::InvalidAccountNumber(bad.to_string()))
            );
        }
        assert_eq!(
            bank.create_account("12345678", "  ", "Doe", dec("1"))
                .unwrap_err(),
            BankError::EmptyName {
                field: "First name"
            }
        );
        assert_eq!(
            bank.create_account("12345678", "Jane", "", dec("1"))
                .unwrap_err(),
            BankError::EmptyName { field: "Last name" }
        );
        assert_eq!(
            bank.create_account("12345678", "Jane", "Doe", dec("-1"))
                .unwrap_err(),
            BankError::NegativeOpeningBalance(dec("-1"))
        );
        assert!(bank.is_empty());

        let acc = bank
            .create_account("12345678", " Jane ", " Doe ", dec("10.005"))
            .unwrap();
        assert_eq!(acc.holder_name(), "Jane Doe");
        assert_eq!(acc.opening_balance(), dec("10.00"));
    }

    #[test]
    fn duplicate_account_numbers_are_rejected() {
        let mut bank = Bank::new();
        bank.create_account("12345678", "Jane", "Doe", dec("1"))
            .unwrap();
        let err = bank
            .create_account("12345678", "John", "Roe", dec("2"))
            .unwrap_err();
        assert_eq!(
            err,
            BankError::DuplicateAccount("12345678".parse().unwrap())
        );
        assert_eq!(bank.len(), 1);
        assert_eq!(
            bank.find_account("12345678").unwrap().holder_name(),
            "Jane Doe"
        );
    }

    #[test]
    fn insert_account_returns_the_registered_account() {
        let mut bank = Bank::new();
        bank.create_account("11111111", "Jane", "Doe", dec("1"))
            .unwrap();
        let restored = Account::new(
            "22222222".parse().unwrap(),
            "John Roe".to_string(),
            dec("3"),
        );
        let inserted = bank.insert_account(restored.clone()).unwrap();
        assert_eq!(inserted.number().as_str(), "22222222");
        assert_eq!(inserted.balance(), dec("3"));

        assert_eq!(
            bank.insert_account(restored).unwrap_err(),
            BankError::DuplicateAccount("22222222".parse().unwrap())
        );
        let numbers: Vec<_> = bank.accounts().map(|acc| acc.number().as_str()).collect();
        assert_eq!(numbers, ["11111111", "22222222"]);
    }

    #[test]
    fn lookups_on_empty_bank() {
        let mut bank = Bank::new();
        assert!(bank.find_account("12345678").is_none());
        assert!(bank.find_account("").is_none());
        assert!(bank.display_account_details("12345678").is_none());
        assert!(bank.transaction_history("12345678").is_none());
        assert_eq!(bank.generate_reports(), "");
        assert_eq!(
            bank.perform_transaction("12345678", dec("1"), TransactionKind::Deposit)
                .unwrap_err(),
            BankError::AccountNotFound("12345678".to_string())
        );
    }

    #[test]
    fn rejected_transactions_leave_ledger_unchanged() {
        let mut bank = Bank::new();
        bank.create_account("12345678", "Jane", "Doe", dec("5"))
            .unwrap();
        for amount in ["0", "-3", "0.004"] {
            let err = bank
                .perform_transaction("12345678", dec(amount), TransactionKind::Deposit)
                .unwrap_err();
            assert!(matches!(
                err,
                BankError::Account(AccountError::NonPositiveAmount { .. })
            ));
        }
        let acc = bank.find_account("12345678").unwrap();
        assert_eq!(acc.balance(), dec("5"));
        assert!(acc.history().is_empty());
    }

    #[test]
    fn transfers() {
        let mut bank = Bank::new();
        bank.create_account("11111111", "Jane", "Doe", dec("100"))
            .unwrap();
        bank.create_account("22222222", "John", "Roe", dec("0"))
            .unwrap();

        let (withdrawal, deposit) = bank.transfer("11111111", "22222222", dec("40")).unwrap();
        assert_eq!(withdrawal.kind, TransactionKind::Withdrawal);
        assert_eq!(withdrawal.balance_after, dec("60"));
        assert_eq!(deposit.kind, TransactionKind::Deposit);
        assert_eq!(deposit.balance_after, dec("40"));

        // insufficient funds: nothing moves
        let err = bank
            .transfer("11111111", "22222222", dec("60.01"))
            .unwrap_err();
        assert!(matches!(
            err,
            BankError::Account(AccountError::InsufficientFunds { .. })
        ));
        assert_eq!(
            bank.transfer("11111111", "11111111", dec("1")).unwrap_err(),
            BankError::SameAccountTransfer
        );
        assert_eq!(
            bank.transfer("11111111", "33333333", dec("1")).unwrap_err(),
            BankError::AccountNotFound("33333333".to_string())
        );

        let from = bank.find_account("11111111").unwrap();
        let to = bank.find_account("22222222").unwrap();
        assert_eq!(from.balance(), dec("60"));
        assert_eq!(from.history().len(), 1);
        assert_eq!(to.balance(), dec("40"));
        assert_eq!(to.history().len(), 1);
    }

    #[test]
    fn reports_follow_creation_order() {
        let mut bank = Bank::new();
        bank.create_account("22222222", "John", "Roe", dec("2"))
            .unwrap();
        bank.create_account("11111111", "Jane", "Doe", dec("1"))
            .unwrap();

        let first = bank.display_account_details("22222222").unwrap();
        let second = bank.display_account_details("11111111").unwrap();
        assert_eq!(bank.generate_reports(), format!("{first}{second}"));
        assert!(bank.generate_reports().starts_with("Account number: 22222222\n"));
    }
}
