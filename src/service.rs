use std::sync::Arc;

use crate::data::demo;
use crate::data::store::SeriesStore;
use crate::error::SignalError;
use crate::processing::append_policy::{AppendOutcome, AppendPolicy};
use crate::processing::statistics::SeriesStats;
use crate::processing::window;
use crate::state::data_series::{SeriesFilter, SeriesRecord};

/// Token that must accompany a delete-all request.
pub const DELETE_ALL_CONFIRMATION: &str = "y";

/// Maps signal operations onto the store, the append policy and the stats engine.
pub struct SignalService {
    store: Arc<dyn SeriesStore>,
    policy: AppendPolicy,
    default_fsample: f64,
}

impl SignalService {
    pub fn new(
        store: Arc<dyn SeriesStore>,
        max_signal_samples: usize,
        default_fsample: f64,
    ) -> Self {
        Self {
            store,
            policy: AppendPolicy::new(max_signal_samples),
            default_fsample,
        }
    }

    pub fn max_signal_samples(&self) -> usize {
        self.policy.max_len()
    }

    pub fn get(&self, signal_id: &str) -> Result<SeriesRecord, SignalError> {
        self.store
            .get(signal_id)
            .map_err(|e| self.backend_failure("get", signal_id, e.into()))?
            .ok_or_else(|| SignalError::NotFound(signal_id.to_string()))
    }

    pub fn list(&self, filter: &SeriesFilter) -> Result<Vec<SeriesRecord>, SignalError> {
        let result = if *filter == SeriesFilter::default() {
            self.store.list_all()
        } else {
            self.store.query(filter)
        };
        result.map_err(|e| self.backend_failure("list", "*", e.into()))
    }

    /// Create an empty series. Fails if the id is taken; the existing record is left alone.
    pub fn create(
        &self,
        signal_id: &str,
        signal_name: Option<String>,
        fsample: Option<f64>,
    ) -> Result<SeriesRecord, SignalError> {
        let fsample = fsample.unwrap_or(self.default_fsample);
        let record = SeriesRecord::new(signal_id, signal_name, fsample);
        self.store
            .insert(record.clone())
            .map_err(|e| self.backend_failure("create", signal_id, e.into()))?;
        tracing::info!("Created signal {signal_id} at {} Hz", record.fsample);
        Ok(record)
    }

    /// Full replacement. Not bound-checked; the next append deals with oversize series.
    pub fn replace(
        &self,
        signal_id: &str,
        signal_values: Vec<f64>,
        signal_name: Option<String>,
        fsample: Option<f64>,
    ) -> Result<SeriesRecord, SignalError> {
        let existing = self
            .store
            .get(signal_id)
            .map_err(|e| self.backend_failure("replace", signal_id, e.into()))?;
        let fsample = fsample
            .or_else(|| existing.as_ref().map(|r| r.fsample))
            .unwrap_or(self.default_fsample);
        let signal_name = signal_name.or_else(|| existing.and_then(|r| r.signal_name));

        let record = SeriesRecord::new(signal_id, signal_name, fsample).with_values(signal_values);
        self.store
            .put(record.clone())
            .map_err(|e| self.backend_failure("replace", signal_id, e.into()))?;
        tracing::info!("Replaced signal {signal_id} with {} samples", record.sample_count());
        Ok(record)
    }

    pub fn append(&self, signal_id: &str, batch: &[f64]) -> Result<AppendOutcome, SignalError> {
        let outcome = self
            .policy
            .append(self.store.as_ref(), signal_id, batch)
            .map_err(|e| self.backend_failure("append", signal_id, e))?;
        tracing::debug!(
            "Append to signal {signal_id}: {} samples -> {:?}, length {}",
            batch.len(),
            outcome.action,
            outcome.new_length
        );
        Ok(outcome)
    }

    pub fn delete(&self, signal_id: &str) -> Result<(), SignalError> {
        let removed = self
            .store
            .delete(signal_id)
            .map_err(|e| self.backend_failure("delete", signal_id, e.into()))?;
        if !removed {
            return Err(SignalError::NotFound(signal_id.to_string()));
        }
        self.policy.locks().forget(signal_id);
        tracing::info!("Deleted signal {signal_id}");
        Ok(())
    }

    /// Delete every series when `confirm` is exactly `"y"`. Returns how many were removed.
    pub fn delete_all(&self, confirm: &str) -> Result<usize, SignalError> {
        if confirm != DELETE_ALL_CONFIRMATION {
            return Err(SignalError::ConfirmationFailed);
        }
        let records = self
            .store
            .list_all()
            .map_err(|e| self.backend_failure("delete_all", "*", e.into()))?;

        let mut deleted = 0;
        for record in &records {
            let removed = self
                .store
                .delete(&record.signal_id)
                .map_err(|e| self.backend_failure("delete_all", &record.signal_id, e.into()))?;
            if removed {
                deleted += 1;
            }
        }
        self.policy.locks().clear();
        tracing::info!("Deleted all signals ({deleted})");
        Ok(deleted)
    }

    pub fn stats(&self, signal_id: &str) -> Result<SeriesStats, SignalError> {
        let record = self.get(signal_id)?;
        SeriesStats::compute(&record.signal_values, record.fsample)
            .ok_or_else(|| SignalError::EmptySeries(signal_id.to_string()))
    }

    /// Samples in `[start, end)` plus the series' rate.
    pub fn subset(
        &self,
        signal_id: &str,
        start: usize,
        end: usize,
    ) -> Result<(Vec<f64>, f64), SignalError> {
        let record = self.get(signal_id)?;
        let values = window::subset(&record.signal_values, start, end)?.to_vec();
        Ok((values, record.fsample))
    }

    pub fn last_n(&self, signal_id: &str, n: usize) -> Result<Vec<f64>, SignalError> {
        let record = self.get(signal_id)?;
        Ok(window::last_n(&record.signal_values, n).to_vec())
    }

    /// Overwrite the demo series. Returns how many were written.
    pub fn seed_demo(&self) -> Result<usize, SignalError> {
        let series = demo::demo_series();
        let count = series.len();
        for record in series {
            let id = record.signal_id.clone();
            self.store
                .put(record)
                .map_err(|e| self.backend_failure("seed", &id, e.into()))?;
        }
        tracing::info!("Seeded {count} demo signals");
        Ok(count)
    }

    fn backend_failure(&self, op: &str, signal_id: &str, error: SignalError) -> SignalError {
        if error.is_retryable() {
            tracing::warn!("Store failure during {op} on signal {signal_id}: {error}");
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;
    use crate::error::StoreError;
    use crate::processing::append_policy::AppendAction;
    use crate::state::data_series::SeriesField;

    fn service_with(records: Vec<SeriesRecord>, max: usize) -> (Arc<MemoryStore>, SignalService) {
        let store = Arc::new(MemoryStore::from_records(records));
        let service = SignalService::new(store.clone(), max, 1000.0);
        (store, service)
    }

    fn series(id: &str, values: Vec<f64>) -> SeriesRecord {
        SeriesRecord::new(id, Some(format!("signal{id}")), 10.0).with_values(values)
    }

    /// Every call fails the way an unreachable backend would.
    struct DownStore;

    impl SeriesStore for DownStore {
        fn get(&self, _: &str) -> Result<Option<SeriesRecord>, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn put(&self, _: SeriesRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn insert(&self, _: SeriesRecord) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn update_field(&self, _: &str, _: SeriesField) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn append_values(&self, _: &str, _: &[f64]) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn value_count(&self, _: &str) -> Result<Option<usize>, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn delete(&self, _: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn list_all(&self) -> Result<Vec<SeriesRecord>, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
        fn query(&self, _: &SeriesFilter) -> Result<Vec<SeriesRecord>, StoreError> {
            Err(StoreError::Unavailable("timeout".into()))
        }
    }

    #[test]
    fn create_collision_leaves_existing_record() {
        let (store, service) = service_with(vec![series("1", vec![1.0, 2.0])], 10);

        assert_eq!(
            service.create("1", None, None).err(),
            Some(SignalError::AlreadyExists("1".into()))
        );
        let kept = store.get("1").ok().flatten();
        assert_eq!(kept, Some(series("1", vec![1.0, 2.0])));
    }

    #[test]
    fn create_uses_default_rate() {
        let (_, service) = service_with(Vec::new(), 10);
        let record = service.create("9", Some("ecg".into()), None).unwrap();
        assert_eq!(record.fsample, 1000.0);
        assert!(record.is_empty());
        assert_eq!(service.get("9").map(|r| r.signal_name), Ok(Some("ecg".into())));
    }

    #[test]
    fn stats_over_stored_series() {
        let (_, service) = service_with(vec![series("1", vec![1.0, 2.0, 3.0, 4.0])], 10);
        let stats = service.stats("1").unwrap();
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.sampling_rate, 10.0);
    }

    #[test]
    fn stats_on_empty_series_is_an_error() {
        let (_, service) = service_with(vec![series("1", Vec::new())], 10);
        assert_eq!(service.stats("1").err(), Some(SignalError::EmptySeries("1".into())));
        assert_eq!(service.stats("2").err(), Some(SignalError::NotFound("2".into())));
    }

    #[test]
    fn subset_and_last_n() {
        let (_, service) = service_with(
            vec![
                series("1", (0..10).map(f64::from).collect()),
                series("2", vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ],
            100,
        );

        assert_eq!(service.subset("1", 2, 5), Ok((vec![2.0, 3.0, 4.0], 10.0)));
        assert_eq!(service.last_n("2", 3), Ok(vec![3.0, 4.0, 5.0]));
        assert_eq!(service.last_n("2", 100), Ok(vec![1.0, 2.0, 3.0, 4.0, 5.0]));
    }

    #[test]
    fn delete_all_requires_confirmation() {
        let (store, service) = service_with(vec![series("1", vec![]), series("2", vec![])], 10);

        assert_eq!(service.delete_all("n"), Err(SignalError::ConfirmationFailed));
        assert_eq!(store.len(), 2);

        assert_eq!(service.delete_all("y"), Ok(2));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_missing_series_is_not_found() {
        let (_, service) = service_with(vec![series("1", vec![])], 10);
        assert_eq!(service.delete("1"), Ok(()));
        assert_eq!(service.delete("1"), Err(SignalError::NotFound("1".into())));
    }

    #[test]
    fn replace_keeps_rate_and_skips_bound_check() {
        let (_, service) = service_with(vec![series("1", vec![1.0])], 4);

        let record = service
            .replace("1", vec![0.0; 9], None, None)
            .unwrap();
        assert_eq!(record.fsample, 10.0);
        assert_eq!(record.signal_name.as_deref(), Some("signal1"));
        assert_eq!(record.sample_count(), 9);

        // already over the bound, so the next append resets the series
        let outcome = service.append("1", &[5.0]).unwrap();
        assert_eq!(outcome.action, AppendAction::Replaced);
        assert_eq!(service.get("1").map(|r| r.signal_values), Ok(vec![5.0]));
    }

    #[test]
    fn list_filters_by_name() {
        let (_, service) = service_with(vec![series("1", vec![]), series("2", vec![])], 10);
        assert_eq!(service.list(&SeriesFilter::default()).map(|v| v.len()), Ok(2));
        let named = service.list(&SeriesFilter::by_name("signal2")).unwrap();
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].signal_id, "2");
    }

    #[test]
    fn seed_demo_overwrites_fixed_ids() {
        let (store, service) = service_with(vec![series("1", vec![42.0])], 10);
        assert_eq!(service.seed_demo(), Ok(3));
        assert_eq!(store.len(), 3);
        assert_eq!(store.value_count("1"), Ok(Some(1000)));
    }

    #[test]
    fn backend_failures_are_not_reported_as_missing() {
        let service = SignalService::new(Arc::new(DownStore), 10, 1000.0);

        for err in [
            service.get("1").err(),
            service.append("1", &[1.0]).err(),
            service.delete("1").err(),
            service.stats("1").err(),
            service.delete_all("y").err(),
        ] {
            let err = err.expect("expected failure");
            assert_eq!(err, SignalError::StoreUnavailable("timeout".into()));
            assert!(err.is_retryable());
        }
    }
}
