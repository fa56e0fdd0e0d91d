pub mod backfill;
pub mod events;
