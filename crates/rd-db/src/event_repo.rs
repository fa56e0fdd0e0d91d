use crate::query::{SqlQuery, contains_pattern};
use crate::util::{decode_error, storage_error};
use rd_core::RedirectorError;
use rd_core::events::{AddressRow, EventRepository};
use rd_core::types::{
    Event, EventFilter, Headers, NewEvent, Order, StatsKey, StatsRow, format_timestamp,
    parse_timestamp,
};
use rusqlite::{Connection, params, params_from_iter};

const SELECT_EVENTS: &str =
    "SELECT id, ts, method, path, query, headers, body, client_ip FROM events";

pub struct EventRepo<'a> {
    pub conn: &'a Connection,
}

impl<'a> EventRepo<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl EventRepository for EventRepo<'_> {
    fn append(&self, event: NewEvent) -> Result<Event, RedirectorError> {
        let sql = "INSERT INTO events (ts, method, path, query, headers, body, client_ip) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
        self.conn
            .execute(
                sql,
                params![
                    format_timestamp(&event.timestamp),
                    event.method,
                    event.path,
                    event.query,
                    event.headers.as_str(),
                    event.body,
                    event.client_ip,
                ],
            )
            .map_err(storage_error)?;
        let id = self.conn.last_insert_rowid();
        Ok(event.into_event(id))
    }

    fn get(&self, id: i64) -> Result<Option<Event>, RedirectorError> {
        let mut query = SqlQuery::new(SELECT_EVENTS);
        query.and_where("id = ?", [id]);
        Ok(query_events(self.conn, &query)?.into_iter().next())
    }

    fn latest(&self) -> Result<Option<Event>, RedirectorError> {
        let mut query = SqlQuery::new(SELECT_EVENTS);
        query.push(" ORDER BY id DESC").limit(Some(1));
        Ok(query_events(self.conn, &query)?.into_iter().next())
    }

    fn max_id(&self) -> Result<i64, RedirectorError> {
        self.conn
            .query_row("SELECT COALESCE(MAX(id), 0) FROM events", [], |row| row.get(0))
            .map_err(storage_error)
    }

    fn list(&self, filter: &EventFilter, order: Order) -> Result<Vec<Event>, RedirectorError> {
        let mut query = SqlQuery::new(SELECT_EVENTS);
        if let Some(needle) = filter.contains_text() {
            let pattern = contains_pattern(needle);
            query.and_where(
                "(path LIKE ? ESCAPE '\\' OR headers LIKE ? ESCAPE '\\' OR client_ip LIKE ? ESCAPE '\\')",
                [pattern.clone(), pattern.clone(), pattern],
            );
        }
        if let Some(since) = &filter.since {
            query.and_where("ts >= ?", [since.clone()]);
        }
        if let Some(until) = &filter.until {
            query.and_where("ts <= ?", [until.clone()]);
        }
        query.push(match order {
            Order::NewestFirst => " ORDER BY id DESC",
            Order::OldestFirst => " ORDER BY id ASC",
        });
        query.limit(filter.effective_limit());
        query_events(self.conn, &query)
    }

    fn after(&self, watermark: i64) -> Result<Vec<Event>, RedirectorError> {
        let mut query = SqlQuery::new(SELECT_EVENTS);
        query.and_where("id > ?", [watermark]).push(" ORDER BY id ASC");
        query_events(self.conn, &query)
    }

    fn get_many(&self, ids: &[i64]) -> Result<Vec<Event>, RedirectorError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = SqlQuery::new(SELECT_EVENTS);
        query.and_where_in("id", ids).push(" ORDER BY id ASC");
        query_events(self.conn, &query)
    }

    fn delete_many(&self, ids: &[i64]) -> Result<usize, RedirectorError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut query = SqlQuery::new("DELETE FROM events");
        query.and_where_in("id", ids);
        self.conn
            .execute(query.sql(), params_from_iter(query.params()))
            .map_err(storage_error)
    }

    fn stats(&self, key: StatsKey, limit: Option<u32>) -> Result<Vec<StatsRow>, RedirectorError> {
        let mut query = SqlQuery::new(match key {
            StatsKey::ClientIp => {
                "SELECT client_ip AS key, COUNT(*) AS n FROM events GROUP BY client_ip"
            }
            StatsKey::Method => "SELECT method AS key, COUNT(*) AS n FROM events GROUP BY method",
            StatsKey::Path => "SELECT path AS key, COUNT(*) AS n FROM events GROUP BY path",
        });
        query.push(" ORDER BY n DESC, key ASC").limit(limit);

        let mut stmt = self.conn.prepare(query.sql()).map_err(storage_error)?;
        let mut rows = stmt
            .query(params_from_iter(query.params()))
            .map_err(storage_error)?;
        let mut stats = Vec::new();
        while let Some(row) = rows.next().map_err(storage_error)? {
            let key: Option<String> = row.get(0).map_err(storage_error)?;
            let count: i64 = row.get(1).map_err(storage_error)?;
            stats.push(StatsRow {
                key: key.unwrap_or_default(),
                count: u64::try_from(count).map_err(|err| decode_error("n", err))?,
            });
        }
        Ok(stats)
    }

    fn scan_addresses(&self, limit: Option<u32>) -> Result<Vec<AddressRow>, RedirectorError> {
        let mut query = SqlQuery::new("SELECT id, client_ip, headers FROM events ORDER BY id ASC");
        query.limit(limit);

        let mut stmt = self.conn.prepare(query.sql()).map_err(storage_error)?;
        let mut rows = stmt
            .query(params_from_iter(query.params()))
            .map_err(storage_error)?;
        let mut scanned = Vec::new();
        while let Some(row) = rows.next().map_err(storage_error)? {
            let client_ip: Option<String> = row.get(1).map_err(storage_error)?;
            let headers: Option<String> = row.get(2).map_err(storage_error)?;
            scanned.push(AddressRow {
                id: row.get(0).map_err(storage_error)?,
                client_ip: client_ip.unwrap_or_default(),
                headers: Headers::from_raw(headers.unwrap_or_default()),
            });
        }
        Ok(scanned)
    }

    fn set_client_ip(
        &self,
        id: i64,
        expected: &str,
        client_ip: &str,
    ) -> Result<bool, RedirectorError> {
        let changed = self
            .conn
            .execute(
                "UPDATE events SET client_ip = ?1 WHERE id = ?2 AND TRIM(COALESCE(client_ip, '')) = ?3",
                params![client_ip, id, expected],
            )
            .map_err(storage_error)?;
        Ok(changed == 1)
    }
}

fn query_events(conn: &Connection, query: &SqlQuery) -> Result<Vec<Event>, RedirectorError> {
    let mut stmt = conn.prepare(query.sql()).map_err(storage_error)?;
    let mut rows = stmt
        .query(params_from_iter(query.params()))
        .map_err(storage_error)?;
    let mut events = Vec::new();
    while let Some(row) = rows.next().map_err(storage_error)? {
        events.push(map_event_row(row)?);
    }
    Ok(events)
}

fn map_event_row(row: &rusqlite::Row<'_>) -> Result<Event, RedirectorError> {
    let ts: String = row.get(1).map_err(storage_error)?;
    let query: Option<String> = row.get(4).map_err(storage_error)?;
    let headers: String = row.get(5).map_err(storage_error)?;
    let body: Option<String> = row.get(6).map_err(storage_error)?;
    let client_ip: Option<String> = row.get(7).map_err(storage_error)?;

    Ok(Event {
        id: row.get(0).map_err(storage_error)?,
        timestamp: parse_timestamp(&ts).map_err(|err| decode_error("ts", err))?,
        method: row.get(2).map_err(storage_error)?,
        path: row.get(3).map_err(storage_error)?,
        query: query.unwrap_or_default(),
        headers: Headers::from_raw(headers),
        body: body.unwrap_or_default(),
        client_ip: client_ip.unwrap_or_default(),
    })
}
