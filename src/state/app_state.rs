use std::sync::Arc;
use std::time::Duration;

use crate::data::file_store::FileStore;
use crate::data::memory::MemoryStore;
use crate::data::store::SeriesStore;
use crate::error::SignalError;
use crate::service::SignalService;
use crate::state::config::Config;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared handle given to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SignalService>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: SignalService, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            request_timeout,
        }
    }

    /// Build the store named by the config and wire it into a service.
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let store: Arc<dyn SeriesStore> = match &config.store_path {
            Some(path) => Arc::new(FileStore::open(path.clone())?),
            None => Arc::new(MemoryStore::new()),
        };
        let service = SignalService::new(store, config.max_signal_samples, config.default_fsample);
        Ok(Self::new(service, config.request_timeout()))
    }

    /// Run a service call on the blocking pool, bounded by the request timeout.
    /// Expiry and worker failure are both reported as an unavailable store.
    pub async fn run<T, F>(&self, op: F) -> Result<T, SignalError>
    where
        T: Send + 'static,
        F: FnOnce(&SignalService) -> Result<T, SignalError> + Send + 'static,
    {
        let service = Arc::clone(&self.service);
        let task = tokio::task::spawn_blocking(move || op(service.as_ref()));
        match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!("Signal worker failed: {join_err}");
                Err(SignalError::StoreUnavailable(format!("worker failed: {join_err}")))
            }
            Err(_) => {
                tracing::warn!("Store call exceeded {:?}", self.request_timeout);
                Err(SignalError::StoreUnavailable(format!(
                    "request timed out after {} ms",
                    self.request_timeout.as_millis()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(timeout: Duration) -> AppState {
        AppState::new(SignalService::new(Arc::new(MemoryStore::new()), 10, 1000.0), timeout)
    }

    #[tokio::test]
    async fn run_returns_the_service_result() {
        let state = state(Duration::from_secs(1));
        assert_eq!(state.run(|s| Ok(s.max_signal_samples())).await, Ok(10));
        assert_eq!(
            state.run(|s| s.get("nope")).await.err(),
            Some(SignalError::NotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn slow_store_call_is_reported_unavailable() {
        let state = state(Duration::from_millis(10));
        let err = state
            .run(|_| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await
            .err();
        assert!(matches!(err, Some(SignalError::StoreUnavailable(_))), "{err:?}");
    }

    #[test]
    fn from_config_opens_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_path: Some(dir.path().join("signals.json")),
            ..Config::default()
        };
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.service.max_signal_samples(), 100_000);
        assert_eq!(state.request_timeout, Duration::from_secs(5));
    }
}
