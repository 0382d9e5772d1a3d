use ndarray::ArrayView1;

/// Trailing moving average. Output has `len - window + 1` points; edges are
/// dropped rather than padded, and a series shorter than the window yields
/// nothing.
pub fn smooth(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return Vec::new();
    }
    let scale = window as f64;
    ArrayView1::from(series)
        .windows(window)
        .into_iter()
        .map(|w| w.sum() / scale)
        .collect()
}
