use std::{
    sync::{PoisonError, RwLock},
    time::{Duration, Instant},
};

use tracing::debug;

/// A single memoized value that expires `ttl` after it was stored.
///
/// The lock is only held to read or replace the value, never while a refresh
/// runs, so concurrent callers that find the value stale may each refresh it.
#[derive(Debug)]
pub struct TtlCell<T> {
    ttl: Duration,
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCell<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The stored value if it has not expired.
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref()
            .filter(|(stored, _)| stored.elapsed() < self.ttl)
            .map(|(_, value)| value.clone())
    }

    pub fn set(&self, value: T) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some((Instant::now(), value));
    }

    /// Time since the value was stored, expired or not.
    pub fn age(&self) -> Option<Duration> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(stored, _)| stored.elapsed())
    }

    pub fn invalidate(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Returns the fresh value, or runs `refresh` and stores its result.
    ///
    /// A failed refresh leaves any previous value in place.
    pub fn get_or_refresh<E, F>(&self, refresh: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        debug!("cached value expired, refreshing");
        let value = refresh()?;
        self.set(value.clone());
        Ok(value)
    }
}
