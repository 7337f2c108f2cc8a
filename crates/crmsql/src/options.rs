//! Per-database switches.

use crmsql_core::Error;
use crmsql_query::TimestampColumn;
use serde::{Deserialize, Serialize};

/// Behavior flags of one opened database.
///
/// Usually shipped as JSON next to the database file:
///
/// ```
/// use crmsql::DatabaseOptions;
///
/// let options = DatabaseOptions::from_json_str(
///     r#"{ "ignore_lookup_rows": true, "timestamp_column": "update" }"#,
/// )
/// .unwrap();
/// assert!(options.ignore_lookup_rows);
/// assert!(!options.fixed_catalog_sort_by_sortinfo);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseOptions {
    /// Order fixed catalogs by sort info instead of by text.
    pub fixed_catalog_sort_by_sortinfo: bool,
    /// Root query nodes skip lookup-only rows.
    pub ignore_lookup_rows: bool,
    /// Column stamped by record template writes.
    pub timestamp_column: TimestampColumn,
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed_catalog_sort_by_sortinfo(mut self, enabled: bool) -> Self {
        self.fixed_catalog_sort_by_sortinfo = enabled;
        self
    }

    pub fn ignore_lookup_rows(mut self, enabled: bool) -> Self {
        self.ignore_lookup_rows = enabled;
        self
    }

    pub fn timestamp_column(mut self, column: TimestampColumn) -> Self {
        self.timestamp_column = column;
        self
    }

    /// Parse options from JSON. Missing keys keep their defaults.
    #[allow(clippy::result_large_err)]
    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid database options: {}", e)))
    }

    #[allow(clippy::result_large_err)]
    pub fn to_json_string(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Config(format!("cannot encode database options: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = DatabaseOptions::default();
        assert!(!options.fixed_catalog_sort_by_sortinfo);
        assert!(!options.ignore_lookup_rows);
        assert_eq!(options.timestamp_column, TimestampColumn::Sync);
    }

    #[test]
    fn json_round_trip_keeps_every_flag() {
        let options = DatabaseOptions::new()
            .fixed_catalog_sort_by_sortinfo(true)
            .timestamp_column(TimestampColumn::Update);
        let json = options.to_json_string().unwrap();
        assert!(json.contains("\"timestamp_column\":\"update\""));
        assert_eq!(DatabaseOptions::from_json_str(&json).unwrap(), options);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = DatabaseOptions::from_json_str("{ \"ignore_lookup_rows\": 3 }").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.starts_with("invalid database options")));
    }
}
