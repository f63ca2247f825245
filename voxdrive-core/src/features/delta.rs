//! Local regression deltas over a feature sequence.
//!
//! The standard 9-frame estimate: for frame `t`,
//! `Δx[t] = Σ k·(x[t+k] − x[t−k]) / (2·Σ k²)` with `k` in 1..=4 and edge
//! frames replicated. Applying it twice gives the acceleration sequence.

use ndarray::Array2;

pub const DELTA_WIDTH: usize = 9;

/// Row-wise delta of a coefficient-major matrix (rows are coefficients,
/// columns are frames). A matrix narrower than the window just sees more
/// edge replication; a single frame yields zero deltas.
pub fn delta(matrix: &Array2<f32>) -> Array2<f32> {
    let (rows, cols) = matrix.dim();
    let mut out = Array2::<f32>::zeros((rows, cols));
    if cols == 0 {
        return out;
    }

    let half = DELTA_WIDTH / 2;
    let denom: f32 = 2.0 * (1..=half).map(|k| (k * k) as f32).sum::<f32>();
    let last = cols - 1;

    for r in 0..rows {
        for t in 0..cols {
            let mut acc = 0.0f32;
            for k in 1..=half {
                let ahead = matrix[[r, (t + k).min(last)]];
                let behind = matrix[[r, t.saturating_sub(k)]];
                acc += k as f32 * (ahead - behind);
            }
            out[[r, t]] = acc / denom;
        }
    }
    out
}
