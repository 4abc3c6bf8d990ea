//! Shared observed-value cell.
//!
//! Every capability and property keeps its last observed value in a
//! [`ValueCell`]: the owning driver callback is the single writer, while the
//! query, report, and specification paths only read. Clones share the same
//! slot, which is how a driver keeps a write handle to a facet it has already
//! handed to a [`Device`](crate::device::Device).

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::QueryError;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
    fault: Option<QueryError>,
}

/// Last observed value of one facet, plus an optional query fault.
///
/// A driver raises the fault when it decides the hardware is gone (e.g. a
/// staleness watchdog firing); any read performed for a state or report
/// snapshot then yields the whole-device [`QueryError`]. The next successful
/// write clears the fault.
#[derive(Debug)]
pub struct ValueCell<T> {
    slot: Arc<RwLock<Slot<T>>>,
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for ValueCell<T> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<T> ValueCell<T> {
    /// Create a cell, optionally seeded with an initial value.
    #[must_use]
    pub fn new(initial: Option<T>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot {
                value: initial,
                fault: None,
            })),
        }
    }

    /// Store a new value and clear any pending fault.
    pub fn set(&self, value: T) {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.value = Some(value);
        slot.fault = None;
    }

    /// Raise a query fault; the stored value is kept but unreadable until
    /// the next [`set`](Self::set) or [`clear_fault`](Self::clear_fault).
    pub fn fail(&self, error: QueryError) {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.fault = Some(error);
    }

    /// Drop a pending fault without touching the stored value.
    pub fn clear_fault(&self) {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        slot.fault = None;
    }
}

impl<T: Clone> ValueCell<T> {
    /// Read the current value, honoring a raised fault.
    ///
    /// # Errors
    ///
    /// Returns the pending [`QueryError`] if the owning driver has marked
    /// this facet as failed.
    pub fn read(&self) -> Result<Option<T>, QueryError> {
        let slot = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match &slot.fault {
            Some(fault) => Err(fault.clone()),
            None => Ok(slot.value.clone()),
        }
    }
}
