use crate::error::SignalError;

/// Half-open slice `[start, end)` of `values`, with both bounds clipped to the
/// length. A `start` past `end` is rejected before clipping.
pub fn subset(values: &[f64], start: usize, end: usize) -> Result<&[f64], SignalError> {
    if start > end {
        return Err(SignalError::InvalidRange { start, end });
    }
    let end = end.min(values.len());
    let start = start.min(end);
    Ok(&values[start..end])
}

/// The last `n` samples, or all of them when `n` exceeds the length.
pub fn last_n(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}
