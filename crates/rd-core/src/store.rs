use crate::events::EventRepository;
use crate::RedirectorError;

pub trait Store {
    type Events<'a>: EventRepository
    where
        Self: 'a;

    fn events(&self) -> Self::Events<'_>;

    /// Runs `f` as one write transaction: commit on `Ok`, roll back on `Err`.
    fn with_tx<F, T>(&self, f: F) -> Result<T, RedirectorError>
    where
        F: FnOnce(&Self) -> Result<T, RedirectorError>;
}
