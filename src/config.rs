use crate::domain::schema::Schema;
use crate::error::Result;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);

/// Runtime settings of the ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Upper bound on acquiring every lock of one atomic unit.
    pub lock_timeout: Duration,
    /// Declaration installed on a fresh collection.
    pub schema: Schema,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            schema: Schema::accounts(),
        }
    }
}

impl LedgerConfig {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Replaces the schema with the JSON declaration stored at `path`.
    pub fn with_schema_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(self.with_schema(Schema::from_json(&raw)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_millis(500));
        assert_eq!(config.schema, Schema::accounts());
    }

    #[test]
    fn test_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"required": ["accountNum"], "properties": {{"accountNum": {{"bsonType": "string"}}}}}}"#
        )
        .unwrap();

        let config = LedgerConfig::default()
            .with_lock_timeout(Duration::from_millis(5))
            .with_schema_file(file.path())
            .unwrap();
        assert_eq!(config.lock_timeout, Duration::from_millis(5));
        assert_eq!(config.schema.required, vec!["accountNum"]);
    }

    #[test]
    fn test_schema_file_missing() {
        assert!(
            LedgerConfig::default()
                .with_schema_file("does/not/exist.json")
                .is_err()
        );
    }
}
