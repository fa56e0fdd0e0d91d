use crate::backfill::{self, BackfillOptions, IpCorrection};
use crate::error::{EventError, RedirectorError};
use crate::events::EventRepository;
use crate::ids::IdSelection;
use crate::store::Store;
use crate::types::{Event, EventFilter, NewEvent, Order, StatsKey, StatsRow};
use serde::Serialize;

/// Ids fetched and deleted per statement inside a delete transaction.
const DELETE_CHUNK: usize = 500;

/// Administrative operations over one store handle.
pub struct Admin<S: Store> {
    store: S,
}

impl<S: Store> Admin<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn events(&self) -> EventsApi<'_, S> {
        EventsApi { core: self }
    }

    pub fn backfill(&self) -> BackfillApi<'_, S> {
        BackfillApi { core: self }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// One entry of a numeric `show`: the event, or an inline miss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ShowItem {
    Found(Event),
    Missing { error: &'static str, id: i64 },
}

impl ShowItem {
    fn missing(id: i64) -> Self {
        Self::Missing {
            error: "not-found",
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Latest(Event),
    Items(Vec<ShowItem>),
}

pub struct EventsApi<'a, S: Store> {
    core: &'a Admin<S>,
}

impl<S: Store> EventsApi<'_, S> {
    /// Capture-side entry point: one atomic insert per request.
    pub fn append(&self, event: NewEvent) -> Result<Event, RedirectorError> {
        self.core.store.events().append(event)
    }

    pub fn max_id(&self) -> Result<i64, RedirectorError> {
        self.core.store.events().max_id()
    }

    /// Matching events, newest first, capped by `filter.limit`.
    pub fn list(&self, filter: &EventFilter) -> Result<Vec<Event>, RedirectorError> {
        self.core.store.events().list(filter, Order::NewestFirst)
    }

    /// Like [`list`](Self::list) but never capped.
    pub fn export(&self, filter: &EventFilter) -> Result<Vec<Event>, RedirectorError> {
        let filter = filter.clone().without_limit();
        self.core.store.events().list(&filter, Order::NewestFirst)
    }

    pub fn stats(&self, key: StatsKey, limit: Option<u32>) -> Result<Vec<StatsRow>, RedirectorError> {
        self.core
            .store
            .events()
            .stats(key, limit.filter(|limit| *limit > 0))
    }

    /// Looks events up without touching them.
    ///
    /// Missing numeric ids are reported inline; a missing `latest` is an error.
    pub fn show(&self, selection: &IdSelection) -> Result<Shown, RedirectorError> {
        let repo = self.core.store.events();
        match selection {
            IdSelection::Latest => repo
                .latest()?
                .map(Shown::Latest)
                .ok_or_else(|| EventError::not_found("latest").into()),
            IdSelection::Ids(ids) => {
                let mut items = Vec::with_capacity(ids.len());
                for &id in ids {
                    items.push(match repo.get(id)? {
                        Some(event) => ShowItem::Found(event),
                        None => ShowItem::missing(id),
                    });
                }
                Ok(Shown::Items(items))
            }
        }
    }

    /// Removes the selected events and returns what was removed, ascending by id.
    ///
    /// Selection and deletion share one write transaction, so every returned
    /// event is gone and nothing outside the result was touched.
    pub fn delete(&self, selection: &IdSelection) -> Result<Vec<Event>, RedirectorError> {
        match selection {
            IdSelection::Ids(ids) if ids.is_empty() => Ok(Vec::new()),
            IdSelection::Latest => self.core.store.with_tx(|store| {
                let repo = store.events();
                let latest = repo
                    .latest()?
                    .ok_or_else(|| EventError::not_found("latest"))?;
                remove_exact(&repo, std::slice::from_ref(&latest.id))?;
                tracing::info!(id = latest.id, "deleted latest event");
                Ok(vec![latest])
            }),
            IdSelection::Ids(ids) => self.core.store.with_tx(|store| {
                let repo = store.events();
                let mut deleted = Vec::new();
                for chunk in ids.chunks(DELETE_CHUNK) {
                    let found = repo.get_many(chunk)?;
                    let found_ids: Vec<i64> = found.iter().map(|event| event.id).collect();
                    remove_exact(&repo, &found_ids)?;
                    deleted.extend(found);
                }
                deleted.sort_by_key(|event| event.id);
                tracing::info!(requested = ids.len(), deleted = deleted.len(), "deleted events");
                Ok(deleted)
            }),
        }
    }
}

fn remove_exact<R: EventRepository>(repo: &R, ids: &[i64]) -> Result<(), RedirectorError> {
    if ids.is_empty() {
        return Ok(());
    }
    let removed = repo.delete_many(ids)?;
    if removed != ids.len() {
        return Err(RedirectorError::Internal {
            message: format!("selected {} rows but deleted {removed}", ids.len()),
        });
    }
    Ok(())
}

pub struct BackfillApi<'a, S: Store> {
    core: &'a Admin<S>,
}

impl<S: Store> BackfillApi<'_, S> {
    /// Dry run: proposed `client_ip` corrections, oldest first.
    pub fn plan(&self, options: &BackfillOptions) -> Result<Vec<IpCorrection>, RedirectorError> {
        let limit = options.limit.filter(|limit| *limit > 0);
        let rows = self.core.store.events().scan_addresses(limit)?;
        Ok(backfill::plan(rows, options))
    }

    /// Writes corrections in one transaction. A row whose address changed
    /// since planning is skipped. Returns the number of rows updated.
    pub fn apply(&self, corrections: &[IpCorrection]) -> Result<usize, RedirectorError> {
        if corrections.is_empty() {
            return Ok(0);
        }
        let updated = self.core.store.with_tx(|store| {
            let repo = store.events();
            let mut updated = 0;
            for correction in corrections {
                if repo.set_client_ip(correction.id, &correction.old_ip, &correction.new_ip)? {
                    updated += 1;
                } else {
                    tracing::warn!(id = correction.id, "client_ip changed since planning, skipped");
                }
            }
            Ok(updated)
        })?;
        tracing::info!(planned = corrections.len(), updated, "applied address corrections");
        Ok(updated)
    }
}
