/// Single account state: balance, opening balance and the transaction log.
/// Commands are validated into log records, which are then applied.
pub mod account;

/// Transaction kinds, commands and the pure input validation helpers.
pub mod command;

/// The ledger of all accounts, enforcing unique account numbers.
pub mod bank;

/// Loading and saving the ledger file and per-account history files.
pub mod storage;

/// Interactive menu session. It lives in the library so that integration
/// tests can run scripted sessions against it.
pub mod console;
