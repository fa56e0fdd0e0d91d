pub mod admin;
pub mod backfill;
pub mod error;
pub mod events;
pub mod ids;
pub mod ip;
pub mod store;
pub mod tail;

pub mod types;

pub use crate::admin::{Admin, ShowItem, Shown};
pub use crate::error::RedirectorError;
pub use crate::store::Store;
