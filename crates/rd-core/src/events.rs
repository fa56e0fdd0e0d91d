use crate::error::RedirectorError;
use crate::types::{Event, EventFilter, Headers, NewEvent, Order, StatsKey, StatsRow};

/// The columns the address backfill needs from each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRow {
    pub id: i64,
    pub client_ip: String,
    pub headers: Headers,
}

pub trait EventRepository {
    /// Inserts one event and returns it with its assigned id.
    fn append(&self, event: NewEvent) -> Result<Event, RedirectorError>;
    fn get(&self, id: i64) -> Result<Option<Event>, RedirectorError>;
    fn latest(&self) -> Result<Option<Event>, RedirectorError>;
    /// Highest id in the table, 0 when empty.
    fn max_id(&self) -> Result<i64, RedirectorError>;
    fn list(&self, filter: &EventFilter, order: Order) -> Result<Vec<Event>, RedirectorError>;
    /// Events with `id > watermark`, ascending.
    fn after(&self, watermark: i64) -> Result<Vec<Event>, RedirectorError>;
    /// The subset of `ids` that exist, ascending by id.
    fn get_many(&self, ids: &[i64]) -> Result<Vec<Event>, RedirectorError>;
    fn delete_many(&self, ids: &[i64]) -> Result<usize, RedirectorError>;
    fn stats(&self, key: StatsKey, limit: Option<u32>) -> Result<Vec<StatsRow>, RedirectorError>;
    fn scan_addresses(&self, limit: Option<u32>) -> Result<Vec<AddressRow>, RedirectorError>;
    /// Sets `client_ip` only if it still holds `expected`. Returns whether a row changed.
    fn set_client_ip(
        &self,
        id: i64,
        expected: &str,
        client_ip: &str,
    ) -> Result<bool, RedirectorError>;
}
