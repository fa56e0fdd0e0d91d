pub mod event;
pub mod filter;
pub mod headers;

pub use event::{Event, EventSummary, NewEvent, format_timestamp, parse_timestamp};
pub use filter::{EventFilter, Order, StatsKey, StatsRow};
pub use headers::{HeaderParseError, Headers};
