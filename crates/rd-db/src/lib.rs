pub mod event_repo;
pub mod query;
pub mod schema;
pub mod store;
pub mod util;

pub use crate::store::DbStore;
