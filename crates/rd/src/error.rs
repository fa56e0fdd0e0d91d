use rd_core::RedirectorError;
use rd_core::error::StorageError;
use serde_json::json;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Redirector(#[from] RedirectorError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// 1 not found, 2 invalid argument, 3 storage unavailable, 4 anything else.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Redirector(err) if err.is_not_found() => ExitCode::from(1),
            Self::Redirector(err) if err.is_invalid_argument() => ExitCode::from(2),
            Self::Redirector(RedirectorError::Storage(StorageError::Unavailable { .. })) => {
                ExitCode::from(3)
            }
            _ => ExitCode::from(4),
        }
    }

    /// Machine-readable error body for the JSON-emitting commands.
    pub fn envelope(&self) -> Option<serde_json::Value> {
        match self {
            Self::Redirector(RedirectorError::Event(rd_core::error::EventError::NotFound {
                id,
            })) => Some(json!({ "error": "not-found", "id": id })),
            Self::Redirector(RedirectorError::Event(
                rd_core::error::EventError::InvalidArgument { message },
            )) => Some(json!({ "error": "bad-args", "detail": message })),
            _ => None,
        }
    }

    pub fn is_broken_pipe(&self) -> bool {
        match self {
            Self::Io(err) => err.kind() == std::io::ErrorKind::BrokenPipe,
            Self::Csv(err) => matches!(err.kind(), csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::BrokenPipe),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rd_core::error::EventError;

    #[test]
    fn not_found_and_invalid_have_distinct_codes() {
        let missing = CliError::from(RedirectorError::from(EventError::not_found("latest")));
        let invalid = CliError::from(RedirectorError::from(EventError::invalid("bad mix")));
        assert_eq!(missing.exit_code(), ExitCode::from(1));
        assert_eq!(invalid.exit_code(), ExitCode::from(2));
        assert_ne!(missing.exit_code(), invalid.exit_code());
    }

    #[test]
    fn envelopes_match_wire_shape() {
        let missing = CliError::from(RedirectorError::from(EventError::not_found("latest")));
        assert_eq!(
            missing.envelope(),
            Some(json!({"error": "not-found", "id": "latest"}))
        );
        let invalid = CliError::from(RedirectorError::from(EventError::invalid(
            "cannot mix 'latest' with numeric ids",
        )));
        assert_eq!(
            invalid.envelope(),
            Some(json!({"error": "bad-args", "detail": "cannot mix 'latest' with numeric ids"}))
        );
    }

    #[test]
    fn unavailable_storage_exits_3() {
        let err = CliError::from(RedirectorError::from(StorageError::Unavailable {
            message: "database is locked".into(),
        }));
        assert_eq!(err.exit_code(), ExitCode::from(3));
        assert_eq!(err.envelope(), None);
    }
}
