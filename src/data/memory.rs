use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::data::store::SeriesStore;
use crate::error::StoreError;
use crate::state::data_series::{SeriesField, SeriesFilter, SeriesRecord};

/// In-process store keyed by signal id. Listings come back ordered by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, SeriesRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SeriesRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.signal_id.clone(), r))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Copy of every record, for snapshotting.
    pub(crate) fn snapshot(&self) -> Vec<SeriesRecord> {
        self.records.read().values().cloned().collect()
    }

    /// Take over every record of `staged`, dropping the current ones.
    pub(crate) fn replace_with(&self, staged: MemoryStore) {
        *self.records.write() = staged.records.into_inner();
    }
}

impl SeriesStore for MemoryStore {
    fn get(&self, signal_id: &str) -> Result<Option<SeriesRecord>, StoreError> {
        Ok(self.records.read().get(signal_id).cloned())
    }

    fn put(&self, record: SeriesRecord) -> Result<(), StoreError> {
        self.records.write().insert(record.signal_id.clone(), record);
        Ok(())
    }

    fn insert(&self, record: SeriesRecord) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.signal_id) {
            return Err(StoreError::AlreadyExists(record.signal_id));
        }
        records.insert(record.signal_id.clone(), record);
        Ok(())
    }

    fn update_field(&self, signal_id: &str, field: SeriesField) -> Result<(), StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(signal_id)
            .ok_or_else(|| StoreError::NotFound(signal_id.to_string()))?;
        field.apply(record);
        Ok(())
    }

    fn append_values(&self, signal_id: &str, values: &[f64]) -> Result<usize, StoreError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(signal_id)
            .ok_or_else(|| StoreError::NotFound(signal_id.to_string()))?;
        record.signal_values.extend_from_slice(values);
        Ok(record.signal_values.len())
    }

    fn value_count(&self, signal_id: &str) -> Result<Option<usize>, StoreError> {
        Ok(self.records.read().get(signal_id).map(SeriesRecord::sample_count))
    }

    fn delete(&self, signal_id: &str) -> Result<bool, StoreError> {
        Ok(self.records.write().remove(signal_id).is_some())
    }

    fn list_all(&self) -> Result<Vec<SeriesRecord>, StoreError> {
        Ok(self.snapshot())
    }

    fn query(&self, filter: &SeriesFilter) -> Result<Vec<SeriesRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }
}
