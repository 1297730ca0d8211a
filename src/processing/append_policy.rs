//! Bounded append for per-series sample logs.
//!
//! The bound is soft: a series at or under `max_len` always takes the whole
//! batch through the store's atomic append, even when that carries it past the
//! bound. Only a series that is already over the bound is reset, by replacing
//! its values with the incoming batch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::data::store::SeriesStore;
use crate::error::SignalError;
use crate::state::data_series::SeriesField;

/// Which mutation an append turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendDecision {
    /// Atomic append of the batch to the stored values.
    Append,
    /// Replace the stored values with the batch.
    Replace,
    /// Batch larger than the bound on its own.
    Reject,
    /// Nothing to do.
    Skip,
}

/// Evaluate the append table for a series holding `current_len` samples.
///
/// Rows are checked in order. With a non-empty batch the `Reject` and `Skip`
/// rows cannot be reached once the series is over the bound, because
/// `current_len + batch_len > max_len` already holds there.
pub fn decide(current_len: usize, batch_len: usize, max_len: usize) -> AppendDecision {
    if batch_len == 0 {
        return AppendDecision::Skip;
    }
    if current_len <= max_len {
        return AppendDecision::Append;
    }
    if current_len.saturating_add(batch_len) > max_len {
        return AppendDecision::Replace;
    }
    if batch_len > max_len {
        return AppendDecision::Reject;
    }
    AppendDecision::Skip
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AppendAction {
    Appended,
    Replaced,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    pub signal_id: String,
    #[serde(rename = "length")]
    pub new_length: usize,
    pub action: AppendAction,
}

/// One mutex per signal id, held across the length read and the mutation.
#[derive(Debug, Default)]
pub struct SeriesLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SeriesLocks {
    pub fn handle(&self, signal_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(signal_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop `handle` from the map unless another caller still holds a clone.
    /// Clones are only made under the map lock, so the count cannot race.
    pub fn release(&self, signal_id: &str, handle: &Arc<Mutex<()>>) {
        let mut locks = self.locks.lock();
        let ours = locks.get(signal_id).is_some_and(|h| Arc::ptr_eq(h, handle));
        if ours && Arc::strong_count(handle) <= 2 {
            locks.remove(signal_id);
        }
    }

    /// Number of ids with a lock entry.
    #[cfg(test)]
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop the lock entry of a deleted series.
    pub fn forget(&self, signal_id: &str) {
        self.locks.lock().remove(signal_id);
    }

    pub fn clear(&self) {
        self.locks.lock().clear();
    }
}

#[derive(Debug)]
pub struct AppendPolicy {
    max_len: usize,
    locks: SeriesLocks,
}

impl AppendPolicy {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            locks: SeriesLocks::default(),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn locks(&self) -> &SeriesLocks {
        &self.locks
    }

    /// Append `batch` to the series, issuing at most one store mutation.
    pub fn append(
        &self,
        store: &dyn SeriesStore,
        signal_id: &str,
        batch: &[f64],
    ) -> Result<AppendOutcome, SignalError> {
        let handle = self.locks.handle(signal_id);
        let result = {
            let _guard = handle.lock();
            self.append_locked(store, signal_id, batch)
        };
        // Unknown ids must not leave a lock entry behind.
        if matches!(result, Err(SignalError::NotFound(_))) {
            self.locks.release(signal_id, &handle);
        }
        result
    }

    fn append_locked(
        &self,
        store: &dyn SeriesStore,
        signal_id: &str,
        batch: &[f64],
    ) -> Result<AppendOutcome, SignalError> {
        let current_len = store
            .value_count(signal_id)?
            .ok_or_else(|| SignalError::NotFound(signal_id.to_string()))?;

        let (new_length, action) = match decide(current_len, batch.len(), self.max_len) {
            AppendDecision::Append => {
                let len = store.append_values(signal_id, batch)?;
                if len > self.max_len {
                    tracing::debug!(
                        "Signal {signal_id} holds {len} samples, past the bound of {}",
                        self.max_len
                    );
                }
                (len, AppendAction::Appended)
            }
            AppendDecision::Replace => {
                store.update_field(signal_id, SeriesField::Values(batch.to_vec()))?;
                (batch.len(), AppendAction::Replaced)
            }
            AppendDecision::Reject => {
                return Err(SignalError::BatchTooLarge {
                    len: batch.len(),
                    max: self.max_len,
                });
            }
            AppendDecision::Skip => (current_len, AppendAction::Unchanged),
        };

        Ok(AppendOutcome {
            signal_id: signal_id.to_string(),
            new_length,
            action,
        })
    }
}
