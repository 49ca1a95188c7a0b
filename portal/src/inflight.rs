use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::PortalError;

/// Record ids with a mutation in flight.
///
/// A control stays disabled while its record is busy; a second submission
/// is refused instead of being sent twice.
#[derive(Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Releases its key when dropped, whether the call succeeded or not.
pub struct InFlightGuard {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

fn lock(keys: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    keys.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InFlight {
    pub fn begin(&self, key: &str) -> Result<InFlightGuard, PortalError> {
        if !lock(&self.keys).insert(key.to_string()) {
            return Err(PortalError::Busy);
        }
        Ok(InFlightGuard {
            keys: self.keys.clone(),
            key: key.to_string(),
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        lock(&self.keys).contains(key)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.keys).remove(&self.key);
    }
}
