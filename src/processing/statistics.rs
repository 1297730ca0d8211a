use serde::Serialize;

/// Descriptive statistics of a stored series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation (divides by N).
    pub std: f64,
    /// Population variance.
    pub var: f64,
    pub sampling_rate: f64,
}

impl SeriesStats {
    /// Compute statistics over `samples`. `fsample` is passed through as the
    /// sampling rate. Returns `None` for an empty sequence.
    pub fn compute(samples: &[f64], fsample: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let count = samples.len() as f64;
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / count;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

        Some(SeriesStats {
            mean,
            median,
            max,
            min,
            std: var.sqrt(),
            var,
            sampling_rate: fsample,
        })
    }
}
