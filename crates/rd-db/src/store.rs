use rd_core::RedirectorError;
use rd_core::store::Store;
use rusqlite::Connection;
use std::time::Duration;

use crate::event_repo::EventRepo;
use crate::schema;
use crate::util::storage_error;

pub struct DbStore {
    conn: Connection,
}

impl DbStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open(path: &str, busy_timeout: Duration) -> Result<Self, RedirectorError> {
        let conn = schema::open_and_migrate(path, busy_timeout).map_err(storage_error)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Writes a consistent copy of the database to `dest`, which must not exist.
    pub fn backup_to(&self, dest: &str) -> Result<(), RedirectorError> {
        self.conn
            .execute("VACUUM INTO ?1", [dest])
            .map_err(storage_error)?;
        tracing::info!(dest, "database backup written");
        Ok(())
    }
}

impl Store for DbStore {
    type Events<'a>
        = EventRepo<'a>
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_> {
        EventRepo::new(&self.conn)
    }

    fn with_tx<F, T>(&self, f: F) -> Result<T, RedirectorError>
    where
        F: FnOnce(&Self) -> Result<T, RedirectorError>,
    {
        // IMMEDIATE takes the write lock up front so rows read inside the
        // transaction cannot change before it commits.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(storage_error)?;
        let result = f(self);
        match result {
            Ok(value) => {
                self.conn.execute_batch("COMMIT").map_err(storage_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.conn.execute_batch("ROLLBACK") {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                tracing::debug!(error = %err, "transaction rolled back");
                Err(err)
            }
        }
    }
}
