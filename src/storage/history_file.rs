use std::io::{Read, Write};

use csv::Trim;

use crate::account::TransactionRecord;

/// Reads a transaction history: one `kind,amount,timestamp,balance_after`
/// line per record, oldest first.
pub fn read_history<R>(source: R) -> Result<Vec<TransactionRecord>, csv::Error>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(source)
        .into_deserialize()
        .collect()
}

pub fn write_history<W>(output: W, records: &[TransactionRecord]) -> Result<(), csv::Error>
where
    W: Write,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
