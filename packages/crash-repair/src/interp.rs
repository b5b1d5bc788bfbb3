//! Interpolation primitives
//!
//! - [`Pchip`]: shape-preserving piecewise cubic Hermite interpolant
//!   (Fritsch-Carlson derivatives with harmonic-mean weighting). It never
//!   overshoots the data between knots, which keeps synthesized transitions
//!   inside the envelope of the surrounding samples.
//! - [`interp_linear`]: piecewise-linear lookup, clamped at both ends.

/// Monotone piecewise cubic Hermite interpolant
#[derive(Debug, Clone)]
pub struct Pchip {
    x: Vec<f64>,
    y: Vec<f64>,
    d: Vec<f64>,
}

impl Pchip {
    /// Fit through `(x, y)`. `x` must be finite and strictly increasing.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, String> {
        if x.len() != y.len() {
            return Err(format!(
                "abscissa has {} points but ordinate has {}",
                x.len(),
                y.len()
            ));
        }
        if x.len() < 2 {
            return Err(format!("need at least 2 points, got {}", x.len()));
        }
        if !is_strictly_increasing(x) {
            return Err("abscissa must be finite and strictly increasing".to_string());
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err("ordinate contains non-finite values".to_string());
        }

        let d = derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            d,
        })
    }

    /// Evaluate at `t`, extrapolating with the end pieces outside the knots
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        let k = self
            .x
            .partition_point(|&xi| xi <= t)
            .saturating_sub(1)
            .min(n - 2);

        let h = self.x[k + 1] - self.x[k];
        let slope = (self.y[k + 1] - self.y[k]) / h;
        let (d0, d1) = (self.d[k], self.d[k + 1]);

        let c2 = (3.0 * slope - 2.0 * d0 - d1) / h;
        let c3 = (d0 + d1 - 2.0 * slope) / (h * h);
        let dt = t - self.x[k];

        self.y[k] + dt * (d0 + dt * (c2 + dt * c3))
    }

    pub fn eval_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.eval(t)).collect()
    }
}

fn derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let m: Vec<f64> = y
        .windows(2)
        .zip(&h)
        .map(|(w, &hk)| (w[1] - w[0]) / hk)
        .collect();

    if n == 2 {
        return vec![m[0], m[0]];
    }

    let mut d = vec![0.0; n];
    for k in 1..n - 1 {
        let (m0, m1) = (m[k - 1], m[k]);
        if m0 * m1 <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[k] + h[k - 1];
        let w2 = h[k] + 2.0 * h[k - 1];
        d[k] = (w1 + w2) / (w1 / m0 + w2 / m1);
    }

    d[0] = edge_derivative(h[0], h[1], m[0], m[1]);
    d[n - 1] = edge_derivative(h[n - 2], h[n - 3], m[n - 2], m[n - 3]);
    d
}

/// Three-point end derivative, limited to keep the end piece shape-preserving
fn edge_derivative(h0: f64, h1: f64, m0: f64, m1: f64) -> f64 {
    let d = ((2.0 * h0 + h1) * m0 - h0 * m1) / (h0 + h1);
    if sign(d) != sign(m0) {
        0.0
    } else if sign(m0) != sign(m1) && d.abs() > 3.0 * m0.abs() {
        3.0 * m0
    } else {
        d
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Linear interpolation of `(xp, fp)` at `x`.
///
/// `xp` must be non-decreasing. Values outside `[xp[0], xp[last]]` take the
/// nearest end value.
pub fn interp_linear(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }

    let j = xp.partition_point(|&v| v <= x);
    let i = j - 1;
    let frac = (x - xp[i]) / (xp[j] - xp[i]);
    fp[i] + frac * (fp[j] - fp[i])
}

/// `n` evenly spaced points from `start` to `end` inclusive
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            out[n - 1] = end;
            out
        }
    }
}

pub fn is_strictly_increasing(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite()) && values.windows(2).all(|w| w[1] > w[0])
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pchip_passes_through_knots() {
        let x = [0.0, 1.0, 2.0, 3.5, 4.0];
        let y = [0.0, 0.5, 0.2, 0.9, 1.0];
        let p = Pchip::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((p.eval(*xi) - yi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_pchip_two_points_is_linear() {
        let p = Pchip::new(&[0.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!((p.eval(1.0) - 2.0).abs() < 1e-12);
        assert!((p.eval(3.0) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_pchip_does_not_overshoot_step() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();
        let p = Pchip::new(&x, &y).unwrap();
        for i in 0..=90 {
            let v = p.eval(i as f64 / 10.0);
            assert!((-1e-12..=1.0 + 1e-12).contains(&v), "overshoot at {}: {}", i, v);
        }
    }

    fn is_non_decreasing(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[1] >= w[0])
    }

    #[test]
    fn test_pchip_monotone_data_gives_monotone_curve() {
        let x = [0.0, 0.1, 0.5, 0.6, 2.0, 2.1];
        let y = [0.0, 0.01, 0.02, 0.8, 0.81, 1.0];
        let p = Pchip::new(&x, &y).unwrap();
        let samples = p.eval_many(&linspace(0.0, 2.1, 200));
        assert!(is_non_decreasing(&samples));
    }

    #[test]
    fn test_pchip_rejects_duplicate_abscissa() {
        assert!(Pchip::new(&[0.0, 1.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 3.0]).is_err());
        assert!(Pchip::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(Pchip::new(&[0.0], &[0.0]).is_err());
        assert!(Pchip::new(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_interp_linear() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 0.0];
        assert_eq!(interp_linear(-1.0, &xp, &fp), 0.0);
        assert!((interp_linear(0.5, &xp, &fp) - 5.0).abs() < 1e-12);
        assert!((interp_linear(1.5, &xp, &fp) - 5.0).abs() < 1e-12);
        assert_eq!(interp_linear(1.0, &xp, &fp), 10.0);
        assert_eq!(interp_linear(3.0, &xp, &fp), 0.0);
    }

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(0.1, 0.7, 7);
        assert_eq!(v.len(), 7);
        assert_eq!(v[0], 0.1);
        assert_eq!(v[6], 0.7);
        assert!((v[3] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
