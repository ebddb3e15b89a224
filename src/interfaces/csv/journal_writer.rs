use crate::domain::transfer::Transfer;
use crate::error::Result;
use std::io::Write;

/// Writes the transfer journal as `id,status,reason,entries` CSV.
///
/// Entries are flattened to `account:amount` pairs joined by `;`.
pub struct JournalWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> JournalWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transfers<I>(&mut self, transfers: I) -> Result<()>
    where
        I: IntoIterator<Item = Transfer>,
    {
        self.writer
            .write_record(["id", "status", "reason", "entries"])?;
        for transfer in transfers {
            let entries = transfer
                .entries
                .iter()
                .map(|entry| format!("{}:{}", entry.account_num, entry.amount.normalize()))
                .collect::<Vec<_>>()
                .join(";");
            let reason = transfer
                .error_reason
                .map(|reason| reason.to_string())
                .unwrap_or_default();
            self.writer.write_record([
                transfer.id.to_string(),
                transfer.status.to_string(),
                reason,
                entries,
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
