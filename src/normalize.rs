//! Global z-score standardization of window tensors.
//!
//! `Standardizer::fit`: one μ and σ (ddof = 0) over every sample of the
//! training windows, accumulated in f64.
//! `Standardizer::apply_inplace`: `x = (x - μ) / σ`, for train, test and
//! validation alike, so no statistics leak from held-out rows.
use ndarray::Array3;

/// Mean and standard deviation fitted on training windows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardizer {
    pub mean: f32,
    pub std: f32,
}

impl Standardizer {
    /// Fit on `windows` ([N, S, 1]). An empty tensor gives `μ = 0, σ = 0`.
    pub fn fit(windows: &Array3<f32>) -> Self {
        if windows.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n = windows.len() as f64;
        let mean = windows.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = windows
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;
        Self { mean: mean as f32, std: var.sqrt() as f32 }
    }

    /// Standardize in place. `σ = 0` leaves the data unchanged.
    pub fn apply_inplace(&self, windows: &mut Array3<f32>) {
        if self.std > 0.0 {
            let (mean, std) = (self.mean, self.std);
            windows.mapv_inplace(|v| (v - mean) / std);
        }
    }
}
