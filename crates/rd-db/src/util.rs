use rd_core::RedirectorError;
use rd_core::error::StorageError;
use rusqlite::ErrorCode;

/// Maps a SQLite failure onto the storage error kinds. Lock contention past
/// the busy timeout and unopenable files count as unavailable.
pub fn storage_error(err: rusqlite::Error) -> RedirectorError {
    let unavailable = matches!(
        err.sqlite_error_code(),
        Some(
            ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::ReadOnly
        )
    );
    let message = err.to_string();
    if unavailable {
        StorageError::Unavailable { message }.into()
    } else {
        StorageError::Query { message }.into()
    }
}

pub fn decode_error(column: &str, message: impl std::fmt::Display) -> RedirectorError {
    StorageError::Decode {
        message: format!("{column}: {message}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_maps_to_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(matches!(
            storage_error(err),
            RedirectorError::Storage(StorageError::Unavailable { .. })
        ));
    }

    #[test]
    fn other_failures_are_query_errors() {
        assert!(matches!(
            storage_error(rusqlite::Error::QueryReturnedNoRows),
            RedirectorError::Storage(StorageError::Query { .. })
        ));
    }
}
