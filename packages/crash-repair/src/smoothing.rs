//! Local smoothing filters for synthesized transitions
//!
//! Savitzky-Golay coefficients come from the least-squares projection matrix
//! of a polynomial fit over the window; the edge samples are evaluated from a
//! fit to the first/last full window instead of padding the signal.

use nalgebra::DMatrix;

use crate::config::SmoothingMethod;

/// Savitzky-Golay window for a series of length `n`:
/// `min(max_window, n / 2 * 2 - 1)`, or `None` if that is not above 3
pub fn smoothing_window(n: usize, max_window: usize) -> Option<usize> {
    let largest_odd_below = (n / 2 * 2) as i64 - 1;
    let window = (max_window as i64).min(largest_odd_below);
    if window > 3 {
        Some(window as usize)
    } else {
        None
    }
}

/// Apply the configured smoothing; short series are returned unchanged
pub fn smooth(method: &SmoothingMethod, values: &[f64]) -> Vec<f64> {
    match *method {
        SmoothingMethod::SavitzkyGolay {
            max_window,
            polyorder,
        } => match smoothing_window(values.len(), max_window) {
            Some(window) if window > polyorder => savgol_filter(values, window, polyorder)
                .unwrap_or_else(|e| {
                    log::debug!("Savitzky-Golay skipped: {}", e);
                    values.to_vec()
                }),
            _ => values.to_vec(),
        },
        SmoothingMethod::Gaussian { sigma } => {
            if smoothing_window(values.len(), 15).is_some() {
                gaussian_filter1d(values, sigma)
            } else {
                values.to_vec()
            }
        }
        SmoothingMethod::Off => values.to_vec(),
    }
}

/// Savitzky-Golay filter with polynomial edge fitting
pub fn savgol_filter(values: &[f64], window: usize, polyorder: usize) -> Result<Vec<f64>, String> {
    let n = values.len();
    if window % 2 == 0 {
        return Err(format!("window length must be odd, got {}", window));
    }
    if polyorder >= window {
        return Err(format!(
            "polyorder {} must be less than window length {}",
            polyorder, window
        ));
    }
    if window > n {
        return Err(format!(
            "window length {} exceeds series length {}",
            window, n
        ));
    }

    let projection = projection_matrix(window, polyorder)?;
    let half = window / 2;
    let mut out = vec![0.0; n];

    for (i, slot) in out.iter_mut().enumerate() {
        let (row, offset) = if i < half {
            (i, 0)
        } else if i >= n - half {
            (i - (n - window), n - window)
        } else {
            (half, i - half)
        };
        *slot = (0..window)
            .map(|j| projection[(row, j)] * values[offset + j])
            .sum();
    }

    Ok(out)
}

/// Hat matrix `A (AᵀA)⁻¹ Aᵀ` of a polynomial fit over centred window positions
fn projection_matrix(window: usize, polyorder: usize) -> Result<DMatrix<f64>, String> {
    let half = (window / 2) as f64;
    let design = DMatrix::from_fn(window, polyorder + 1, |r, c| {
        (r as f64 - half).powi(c as i32)
    });
    let normal = design.transpose() * &design;
    let inverse = normal
        .try_inverse()
        .ok_or_else(|| "singular normal matrix".to_string())?;
    Ok(&design * inverse * design.transpose())
}

/// Gaussian smoothing with a kernel truncated at 4 sigma and mirrored edges
pub fn gaussian_filter1d(values: &[f64], sigma: f64) -> Vec<f64> {
    let n = values.len();
    if n == 0 || !(sigma > 0.0) {
        return values.to_vec();
    }

    let radius = (4.0 * sigma + 0.5) as i64;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= total;
    }

    (0..n as i64)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, k)| w * values[reflect_index(i + k, n)])
                .sum()
        })
        .collect()
}

/// Half-sample symmetric reflection: `d c b a | a b c d | d c b a`
fn reflect_index(i: i64, n: usize) -> usize {
    let n = n as i64;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}
