//! Backend configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Asset database configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetDbConfig {
    /// SQLite file-backed store.
    Sqlite {
        /// Database file path.
        path: PathBuf,
        /// Busy timeout for concurrent writers, in seconds.
        busy_timeout_secs: Option<u64>,
    },
    /// PostgreSQL store.
    Postgres {
        /// Connection URL.
        url: String,
        /// Connection pool size.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Per-statement timeout in milliseconds.
        statement_timeout_ms: Option<u64>,
    },
}

fn default_max_connections() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_defaults() {
        let config: AssetDbConfig =
            serde_json::from_str(r#"{"type": "postgres", "url": "postgres://localhost/depot"}"#)
                .unwrap();
        match config {
            AssetDbConfig::Postgres {
                max_connections,
                statement_timeout_ms,
                ..
            } => {
                assert_eq!(max_connections, 10);
                assert!(statement_timeout_ms.is_none());
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_config_parses() {
        let config: AssetDbConfig =
            serde_json::from_str(r#"{"type": "sqlite", "path": "/tmp/assets.db", "busy_timeout_secs": 5}"#)
                .unwrap();
        match config {
            AssetDbConfig::Sqlite {
                path,
                busy_timeout_secs,
            } => {
                assert_eq!(path, PathBuf::from("/tmp/assets.db"));
                assert_eq!(busy_timeout_secs, Some(5));
            }
            other => panic!("unexpected config: {other:?}"),
        }
    }
}
