use serde::{Deserialize, Serialize};

/// Soft bound on samples per series. A series at or under it takes any batch
/// whole; only a series already past it is reset by its next append.
pub const MAX_SIGNAL_SAMPLES: usize = 100_000;

/// A stored, rate-tagged sequence of samples. Insertion order is temporal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub signal_id: String,
    #[serde(default)]
    pub signal_name: Option<String>,
    #[serde(default)]
    pub signal_values: Vec<f64>,
    /// Sampling rate in Hz, fixed for the life of the series.
    pub fsample: f64,
}

impl SeriesRecord {
    /// Create an empty series.
    pub fn new(signal_id: impl Into<String>, signal_name: Option<String>, fsample: f64) -> Self {
        Self {
            signal_id: signal_id.into(),
            signal_name,
            signal_values: Vec::new(),
            fsample,
        }
    }

    pub fn with_values(mut self, values: Vec<f64>) -> Self {
        self.signal_values = values;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.signal_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal_values.is_empty()
    }
}

/// One field of a [`SeriesRecord`] together with its new value. Only the
/// values are updated in place; name and rate change through a full replace.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesField {
    Values(Vec<f64>),
}

impl SeriesField {
    pub fn apply(self, record: &mut SeriesRecord) {
        match self {
            SeriesField::Values(values) => record.signal_values = values,
        }
    }
}

/// Criteria for [`SeriesStore::query`](crate::data::store::SeriesStore::query).
/// Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesFilter {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_samples: Option<usize>,
}

impl SeriesFilter {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            min_samples: None,
        }
    }

    pub fn matches(&self, record: &SeriesRecord) -> bool {
        if let Some(name) = &self.name {
            if record.signal_name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_samples {
            if record.sample_count() < min {
                return false;
            }
        }
        true
    }
}
