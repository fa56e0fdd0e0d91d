use crate::error::EventError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Row selection shared by listing, export and backfill scans.
///
/// `since`/`until` are compared as text against the stored timestamp, so they
/// must use the same `YYYY-MM-DDTHH:MM:SSZ` shape to behave as time bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Literal substring looked up in path, header blob and client_ip.
    pub contains: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    /// `None` and `Some(0)` both mean no cap.
    pub limit: Option<u32>,
}

impl EventFilter {
    pub fn effective_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }

    #[must_use]
    pub fn without_limit(mut self) -> Self {
        self.limit = None;
        self
    }

    pub fn contains_text(&self) -> Option<&str> {
        self.contains.as_deref().filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsKey {
    ClientIp,
    Method,
    Path,
}

impl StatsKey {
    pub fn column(self) -> &'static str {
        match self {
            Self::ClientIp => "client_ip",
            Self::Method => "method",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for StatsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for StatsKey {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client_ip" => Ok(Self::ClientIp),
            "method" => Ok(Self::Method),
            "path" => Ok(Self::Path),
            other => Err(EventError::invalid(format!(
                "stats --by must be one of: client_ip, method, path (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    pub key: String,
    pub count: u64,
}
