use crate::error::StoreError;
use crate::state::data_series::{SeriesField, SeriesFilter, SeriesRecord};

/// Contract the signal service needs from the document store holding series.
///
/// Implementations must be safe to share between request tasks. `append_values`
/// must be atomic with respect to other calls on the same series; everything
/// else only needs per-call atomicity.
pub trait SeriesStore: Send + Sync {
    /// Point lookup. `Ok(None)` means the series does not exist.
    fn get(&self, signal_id: &str) -> Result<Option<SeriesRecord>, StoreError>;

    /// Insert or overwrite.
    fn put(&self, record: SeriesRecord) -> Result<(), StoreError>;

    /// Insert, failing with [`StoreError::AlreadyExists`] on an id collision.
    fn insert(&self, record: SeriesRecord) -> Result<(), StoreError>;

    fn update_field(&self, signal_id: &str, field: SeriesField) -> Result<(), StoreError>;

    /// Append to `signal_values` without transferring the existing values.
    /// Returns the new length.
    fn append_values(&self, signal_id: &str, values: &[f64]) -> Result<usize, StoreError>;

    /// Current length of `signal_values`, or `None` if the series does not exist.
    fn value_count(&self, signal_id: &str) -> Result<Option<usize>, StoreError>;

    /// Returns whether a record was removed.
    fn delete(&self, signal_id: &str) -> Result<bool, StoreError>;

    fn list_all(&self) -> Result<Vec<SeriesRecord>, StoreError>;

    fn query(&self, filter: &SeriesFilter) -> Result<Vec<SeriesRecord>, StoreError>;
}
