//! Runtime configuration, read from the environment.
//!
//! | Variable             | Default            |
//! |----------------------|--------------------|
//! | `DB_PATH`            | `/data/events.db`  |
//! | `DB_BUSY_TIMEOUT_MS` | `10000`            |

use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "/data/events.db";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: String,
    /// How long a connection waits on a locked database before giving up.
    pub busy_timeout: Duration,
}

impl Config {
    /// `db_override` (the `--db` flag) wins over `DB_PATH`.
    pub fn from_env(db_override: Option<String>) -> Self {
        let db_path = db_override
            .or_else(|| std::env::var("DB_PATH").ok())
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let busy_timeout =
            Duration::from_millis(parse_env("DB_BUSY_TIMEOUT_MS", DEFAULT_BUSY_TIMEOUT_MS));
        Self {
            db_path,
            busy_timeout,
        }
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
