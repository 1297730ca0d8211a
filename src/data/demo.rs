use rand::Rng;

use crate::state::data_series::SeriesRecord;

pub const DEMO_SERIES_COUNT: usize = 3;
pub const DEMO_SAMPLES: usize = 1000;
pub const DEMO_FSAMPLE: f64 = 1000.0;

/// Fixed demo series `"1"`..`"3"` filled with uniform noise in `[0, 1)`.
pub fn demo_series() -> Vec<SeriesRecord> {
    let mut rng = rand::thread_rng();
    (1..=DEMO_SERIES_COUNT)
        .map(|i| {
            let values = (0..DEMO_SAMPLES).map(|_| rng.gen::<f64>()).collect();
            SeriesRecord::new(i.to_string(), Some(format!("signal{i}")), DEMO_FSAMPLE)
                .with_values(values)
        })
        .collect()
}
