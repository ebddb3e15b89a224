use crate::domain::account::Account;
use crate::error::Result;
use std::io::Write;

/// Writes the final account balances as `account,balance` CSV.
pub struct AccountWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> AccountWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Balances are written normalized (`100.0` becomes `100`).
    pub fn write_accounts<I>(&mut self, accounts: I) -> Result<()>
    where
        I: IntoIterator<Item = Account>,
    {
        self.writer.write_record(["account", "balance"])?;
        for account in accounts {
            let balance = account.balance.to_string();
            self.writer
                .write_record([account.account_num.as_str(), balance.as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_accounts() {
        let mut out = Vec::new();
        AccountWriter::new(&mut out)
            .write_accounts(vec![
                Account::new("acc1", dec!(70.00)),
                Account::new("acc2", dec!(30.5)),
            ])
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "account,balance\nacc1,70\nacc2,30.5\n");
    }
}
