use std::io::{Read, Write};

use csv::{ByteRecord, ByteRecordsIntoIter, StringRecord, Trim};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{Account, AccountNumber},
    command::{CommandError, parse_opening_balance},
};

/// One account as stored in the ledger file.
///
/// `balance` is absent in files written before the current balance was
/// stored; such rows are restored without reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub number: AccountNumber,
    pub holder_name: String,
    pub opening_balance: Decimal,
    pub balance: Option<Decimal>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Line is not valid UTF-8")]
    NotUtf8,
    #[error("Missing {0} field")]
    MissingField(&'static str),
    #[error("Invalid {field}: {source}")]
    InvalidField {
        field: &'static str,
        source: CommandError,
    },
}

impl TryFrom<&StringRecord> for LedgerRow {
    type Error = RowError;

    fn try_from(record: &StringRecord) -> Result<Self, Self::Error> {
        let field = move |idx: usize, name: &'static str| {
            record
                .get(idx)
                .filter(|value| !value.is_empty())
                .ok_or(RowError::MissingField(name))
        };
        let number: AccountNumber = field(0, "account number")?
            .parse()
            .map_err(invalid("account number"))?;
        let holder_name = field(1, "holder name")?.to_string();
        let opening_balance =
            parse_opening_balance(field(2, "opening balance")?).map_err(invalid("opening balance"))?;
        let balance = match record.get(3).filter(|value| !value.is_empty()) {
            Some(value) => Some(parse_opening_balance(value).map_err(invalid("current balance"))?),
            None => None,
        };
        if record.len() > 4 {
            tracing::debug!(
                account = %number,
                extra = record.len() - 4,
                "ignoring trailing ledger fields"
            );
        }

        Ok(Self {
            number,
            holder_name,
            opening_balance,
            balance,
        })
    }
}

fn invalid(field: &'static str) -> impl FnOnce(CommandError) -> RowError {
    move |source| RowError::InvalidField { field, source }
}

/// A ledger line as read, together with its parsed form.
///
/// The raw record is kept so a line that could not be restored can be
/// written back unchanged instead of being dropped from the file.
#[derive(Debug)]
pub struct LedgerLine {
    pub raw: ByteRecord,
    pub row: Result<LedgerRow, RowError>,
}

/// Ledger line left out of the bank on load, carried until the next save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line: u64,
    pub record: ByteRecord,
}

impl SkippedRow {
    /// Account number field, if the line has a readable one.
    pub fn number(&self) -> Option<&str> {
        self.record
            .get(0)
            .and_then(|field| std::str::from_utf8(field).ok())
    }
}

/// Parses the ledger file, one account per line:
/// `account_number,holder_name,opening_balance[,current_balance[,...]]`.
///
/// Yields the line number alongside each line so callers can report
/// malformed lines and keep going.
pub struct LedgerParser<R> {
    iter: ByteRecordsIntoIter<R>,
}

impl<R> LedgerParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_byte_records(),
        }
    }
}

impl<R> Iterator for LedgerParser<R>
where
    R: Read,
{
    type Item = (u64, Result<LedgerLine, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|raw| {
            let line = raw.map(|raw| {
                let row = StringRecord::from_byte_record(raw.clone())
                    .map_err(|_| RowError::NotUtf8)
                    .and_then(|record| LedgerRow::try_from(&record));
                LedgerLine { raw, row }
            });
            (curr_line, line)
        })
    }
}

/// Writes one line per account (number, holder name, opening and current
/// balance), followed by the skipped lines exactly as they were read.
pub fn write_ledger<'a, 'b, W>(
    output: W,
    accounts: impl Iterator<Item = &'a Account>,
    skipped: impl Iterator<Item = &'b SkippedRow>,
) -> Result<(), csv::Error>
where
    W: Write,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(output);
    for acc in accounts {
        writer.write_record([
            acc.number().as_str(),
            acc.holder_name(),
            acc.opening_balance().to_string().as_str(),
            acc.balance().to_string().as_str(),
        ])?;
    }
    for row in skipped {
        writer.write_byte_record(&row.record)?;
    }
    writer.flush()?;
    Ok(())
}
