//! Live follow of newly appended events.

use crate::error::RedirectorError;
use crate::events::EventRepository;
use crate::store::Store;
use crate::types::Event;
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    pub interval: Duration,
    /// Start watermark. `None` starts at the current max id.
    pub after: Option<i64>,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            after: None,
        }
    }
}

impl TailOptions {
    pub fn with_interval_secs(mut self, secs: f64) -> Self {
        self.interval = Duration::try_from_secs_f64(secs)
            .unwrap_or(DEFAULT_INTERVAL)
            .max(MIN_INTERVAL);
        self
    }
}

/// One bounded read: everything past `watermark`, plus the advanced watermark.
pub fn poll_once<S: Store>(store: &S, watermark: i64) -> Result<(Vec<Event>, i64), RedirectorError> {
    let events = store.events().after(watermark)?;
    let next = events.last().map_or(watermark, |event| event.id.max(watermark));
    Ok((events, next))
}

/// Polls until `shutdown` resolves, handing each non-empty batch to `on_batch`.
///
/// `open` is called once per poll and the handle is dropped before the next
/// sleep. A failed poll is logged and retried on the next tick. Returns the
/// last watermark reached.
pub async fn follow<S, O, F, C>(
    open: O,
    options: TailOptions,
    mut on_batch: F,
    shutdown: C,
) -> Result<i64, RedirectorError>
where
    S: Store,
    O: Fn() -> Result<S, RedirectorError>,
    F: FnMut(&[Event]) -> Result<(), RedirectorError>,
    C: Future<Output = ()>,
{
    let mut watermark = match options.after {
        Some(after) => after,
        None => open()?.events().max_id()?,
    };
    tracing::info!(watermark, interval = ?options.interval, "tail started");

    let mut ticker = tokio::time::interval(options.interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                let polled = open().and_then(|store| poll_once(&store, watermark));
                match polled {
                    Ok((events, next)) if !events.is_empty() => {
                        on_batch(&events)?;
                        watermark = next;
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(watermark, error = %err, "tail poll failed"),
                }
            }
        }
    }

    tracing::info!(watermark, "tail stopped");
    Ok(watermark)
}
