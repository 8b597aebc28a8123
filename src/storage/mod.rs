//! Flat-file persistence for the [`Bank`].
//!
//! The ledger file and the per-account history files are separate write
//! targets and are not updated atomically. An interrupted save can leave
//! them out of step; [`LedgerStore::load`] catches that by replaying each
//! history and comparing the result with the stored current balance.
//!
//! Lines that cannot be restored are never dropped: they are returned in
//! [`LoadOutcome::skipped`] and written back by [`LedgerStore::save`].

use std::{
    fs::{self, File},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{Account, AccountError, AccountNumber, TransactionRecord},
    bank::{Bank, BankError},
};

use history_file::{read_history, write_history};
use ledger_file::{LedgerLine, LedgerParser, LedgerRow, RowError, SkippedRow, write_ledger};

pub mod history_file;
pub mod ledger_file;

pub const LEDGER_FILE: &str = "accounts.csv";
pub const HISTORY_DIR: &str = "transaction_histories";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read or write `{}`: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

/// A problem that affected part of a load or save but did not stop it.
#[derive(Debug, Error)]
pub enum StorageIssue {
    #[error("Skipped ledger line {line}: {source}")]
    MalformedRow { line: u64, source: RowError },
    #[error("Skipped account {number}: {source}")]
    DuplicateAccount {
        number: AccountNumber,
        source: BankError,
    },
    #[error("Skipped account {number}: {source}")]
    UnreadableHistory {
        number: AccountNumber,
        source: StorageError,
    },
    #[error("Skipped account {number}: {source}")]
    InconsistentHistory {
        number: AccountNumber,
        source: AccountError,
    },
    #[error(
        "Skipped account {number}: stored balance {stored:.2} does not match replayed history ({replayed:.2})"
    )]
    BalanceMismatch {
        number: AccountNumber,
        stored: Decimal,
        replayed: Decimal,
    },
    #[error("Transaction history of account {number} was not saved: {source}")]
    HistoryNotSaved {
        number: AccountNumber,
        source: StorageError,
    },
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub bank: Bank,
    pub issues: Vec<StorageIssue>,
    /// Ledger lines left out of `bank`, to be handed back to [`LedgerStore::save`].
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Default)]
pub struct SaveOutcome {
    pub issues: Vec<StorageIssue>,
}

/// Data directory holding the ledger file and a subdirectory of
/// per-account transaction histories.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    root: PathBuf,
}

impl LedgerStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }

    pub fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    pub fn history_path(&self, number: &AccountNumber) -> PathBuf {
        self.history_dir()
            .join(format!("{number}_transaction_history.txt"))
    }

    /// Loads every account that can be restored consistently.
    ///
    /// A missing ledger file yields an empty bank. A ledger file that exists
    /// but cannot be read aborts the load; anything narrower is recorded in
    /// [`LoadOutcome::issues`] and the affected line is kept aside in
    /// [`LoadOutcome::skipped`].
    pub fn load(&self) -> Result<LoadOutcome, StorageError> {
        let path = self.ledger_path();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no ledger file, starting empty");
                return Ok(LoadOutcome::default());
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };

        let mut outcome = LoadOutcome::default();
        for (line, parsed) in LedgerParser::new(file) {
            let LedgerLine { raw, row } = match parsed {
                Ok(parsed) => parsed,
                Err(source) => return Err(StorageError::Csv { path, source }),
            };
            let restored = row
                .map_err(|source| StorageIssue::MalformedRow { line, source })
                .and_then(|row| {
                    let number = row.number.clone();
                    let account = self.restore_account(row)?;
                    outcome
                        .bank
                        .insert_account(account)
                        .map(|_| ())
                        .map_err(|source| StorageIssue::DuplicateAccount { number, source })
                });
            if let Err(issue) = restored {
                outcome.report(issue);
                outcome.skipped.push(SkippedRow { line, record: raw });
            }
        }

        tracing::info!(
            path = %path.display(),
            accounts = outcome.bank.len(),
            skipped = outcome.skipped.len(),
            "ledger loaded"
        );
        Ok(outcome)
    }

    fn restore_account(&self, row: LedgerRow) -> Result<Account, StorageIssue> {
        let LedgerRow {
            number,
            holder_name,
            opening_balance,
            balance,
        } = row;
        let records = match self.load_transaction_history(&number) {
            Ok(records) => records,
            Err(source) => return Err(StorageIssue::UnreadableHistory { number, source }),
        };
        let account = match Account::restore(number.clone(), holder_name, opening_balance, records)
        {
            Ok(account) => account,
            Err(source) => return Err(StorageIssue::InconsistentHistory { number, source }),
        };
        match balance {
            Some(stored) if stored != account.balance() => Err(StorageIssue::BalanceMismatch {
                number,
                stored,
                replayed: account.balance(),
            }),
            _ => Ok(account),
        }
    }

    /// Reads one account's history; a missing file means no transactions yet.
    pub fn load_transaction_history(
        &self,
        number: &AccountNumber,
    ) -> Result<Vec<TransactionRecord>, StorageError> {
        let path = self.history_path(number);
        match File::open(&path) {
            Ok(file) => read_history(file).map_err(|source| StorageError::Csv { path, source }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    /// Overwrites the ledger file, then each account's history file.
    ///
    /// `skipped` lines from the last load are appended to the ledger as they
    /// were read, unless the bank now holds an account with the same number.
    /// Their history files are left alone.
    ///
    /// Failing to write the ledger file is an error. A history file that
    /// cannot be written is recorded in [`SaveOutcome::issues`] and the
    /// remaining accounts are still saved.
    pub fn save(&self, bank: &Bank, skipped: &[SkippedRow]) -> Result<SaveOutcome, StorageError> {
        fs::create_dir_all(&self.root).map_err(|source| StorageError::Io {
            path: self.root.clone(),
            source,
        })?;
        let path = self.ledger_path();
        let file = File::create(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        let kept = skipped.iter().filter(|row| match row.number() {
            Some(number) if bank.find_account(number).is_some() => {
                tracing::warn!(
                    line = row.line,
                    number,
                    "dropping skipped ledger line, the bank holds this account number"
                );
                false
            }
            _ => true,
        });
        write_ledger(file, bank.accounts(), kept).map_err(|source| StorageError::Csv {
            path: path.clone(),
            source,
        })?;

        let mut outcome = SaveOutcome::default();
        for account in bank.accounts() {
            if let Err(source) = self.save_transaction_history(account) {
                let issue = StorageIssue::HistoryNotSaved {
                    number: account.number().clone(),
                    source,
                };
                tracing::warn!("{issue}");
                outcome.issues.push(issue);
            }
        }

        tracing::info!(
            path = %path.display(),
            accounts = bank.len(),
            issues = outcome.issues.len(),
            "ledger saved"
        );
        Ok(outcome)
    }

    /// Writes one account's history, creating the history directory if needed.
    pub fn save_transaction_history(&self, account: &Account) -> Result<(), StorageError> {
        let dir = self.history_dir();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io { path: dir, source })?;
        let path = self.history_path(account.number());
        let file = File::create(&path).map_err(|source| StorageError::Io {
            path: path.clone(),
            source,
        })?;
        write_history(file, account.history()).map_err(|source| StorageError::Csv { path, source })
    }
}

impl LoadOutcome {
    fn report(&mut self, issue: StorageIssue) {
        tracing::warn!("{issue}");
        self.issues.push(issue);
    }
}
