use crate::domain::user::User;
use crate::error::Result;
use std::io::Write;

/// Writes the final `user,role,balance` report.
pub struct BalanceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> BalanceWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes one row per user, in the order given, then flushes.
    pub fn write_balances(&mut self, users: impl IntoIterator<Item = User>) -> Result<()> {
        self.writer.write_record(["user", "role", "balance"])?;
        for user in users {
            self.writer.write_record([
                user.id.to_string(),
                user.role.to_string(),
                user.balance.to_string(),
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
