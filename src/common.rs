use serde::{Deserialize, Serialize};

use crate::error::{Result, SaxsError};

/// Measured scattering spectrum: intensity `intensity[i]` at scattering
/// vector magnitude `q[i]` (1/Angstrom).
///
/// Fields are only reachable through [`Spectrum::new`], so every instance,
/// deserialized ones included, has matching lengths and non-negative q.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpectrumData")]
pub struct Spectrum {
    q: Vec<f64>,
    intensity: Vec<f64>,
}

#[derive(Deserialize)]
struct SpectrumData {
    q: Vec<f64>,
    intensity: Vec<f64>,
}

impl TryFrom<SpectrumData> for Spectrum {
    type Error = SaxsError;

    fn try_from(data: SpectrumData) -> Result<Self> {
        Self::new(data.q, data.intensity)
    }
}

impl Spectrum {
    /// Build a spectrum, rejecting mismatched lengths and negative q.
    pub fn new(q: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if q.len() != intensity.len() {
            return Err(SaxsError::InvalidSpectrum(format!(
                "q has {} points, intensity has {}",
                q.len(),
                intensity.len()
            )));
        }
        if let Some(bad) = q.iter().find(|v| **v < 0.0) {
            return Err(SaxsError::InvalidSpectrum(format!(
                "negative scattering vector {bad}"
            )));
        }
        Ok(Self { q, intensity })
    }

    /// Build a spectrum from `(q, I)` pairs.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let (q, intensity) = pairs.iter().copied().unzip();
        Self::new(q, intensity)
    }

    pub fn q(&self) -> &[f64] {
        &self.q
    }

    pub fn intensity(&self) -> &[f64] {
        &self.intensity
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    /// Points usable for log-space fitting: finite positive intensity, and q
    /// strictly inside `q_range` when one is given.
    pub fn fit_mask(&self, q_range: Option<(f64, f64)>) -> Vec<bool> {
        self.q
            .iter()
            .zip(self.intensity.iter())
            .map(|(&q, &i)| {
                let in_range = match q_range {
                    Some((lo, hi)) => q > lo && q < hi,
                    None => true,
                };
                i.is_finite() && i > 0.0 && in_range
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Math utilities
// ---------------------------------------------------------------------------

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![start];
    }
    let step = (end - start) / (n - 1) as f64;
    (0..n).map(|i| start + i as f64 * step).collect()
}

/// Standardize to zero mean and unit (population) standard deviation.
///
/// Returns the standardized values with the mean and std used.
pub fn standardize(values: &[f64]) -> (Vec<f64>, f64, f64) {
    let m = mean(values);
    let s = std_dev(values);
    (values.iter().map(|v| (v - m) / s).collect(), m, s)
}

/// Solve the dense system `a · x = b` by Gaussian elimination with partial
/// pivoting. `a` is row-major `n × n`. Returns `None` for a singular matrix.
pub fn solve_linear(a: &[f64], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    if a.len() != n * n {
        return None;
    }
    let mut m = a.to_vec();
    let mut x = b.to_vec();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i * n + col].abs().total_cmp(&m[j * n + col].abs()))?;
        if m[pivot * n + col].abs() < 1e-300 || !m[pivot * n + col].is_finite() {
            return None;
        }
        if pivot != col {
            for k in 0..n {
                m.swap(col * n + k, pivot * n + k);
            }
            x.swap(col, pivot);
        }
        let diag = m[col * n + col];
        for row in (col + 1)..n {
            let factor = m[row * n + col] / diag;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                m[row * n + k] -= factor * m[col * n + k];
            }
            x[row] -= factor * x[col];
        }
    }

    for row in (0..n).rev() {
        let mut acc = x[row];
        for k in (row + 1)..n {
            acc -= m[row * n + k] * x[k];
        }
        x[row] = acc / m[row * n + row];
    }
    Some(x)
}

/// Evaluate a polynomial with ascending coefficients (`c[0] + c[1] x + ...`).
pub fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Unweighted least-squares polynomial fit of the given degree.
///
/// Coefficients are ascending. Solved through the normal equations, so
/// inputs should be standardized beforehand for anything above low order.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<Vec<f64>> {
    let n = degree + 1;
    if x.len() != y.len() || x.len() < n {
        return None;
    }
    let mut a = vec![0.0; n * n];
    let mut b = vec![0.0; n];
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let powers: Vec<f64> = (0..2 * n - 1).map(|k| xi.powi(k as i32)).collect();
        for i in 0..n {
            for j in 0..n {
                a[i * n + j] += powers[i + j];
            }
            b[i] += yi * powers[i];
        }
    }
    solve_linear(&a, &b)
}

/// Sum of squared differences between `y1` and `y2`.
///
/// With weights, the weights are first normalized to sum to one.
pub fn compute_chi2(y1: &[f64], y2: &[f64], weights: Option<&[f64]>) -> f64 {
    match weights {
        None => y1
            .iter()
            .zip(y2.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum(),
        Some(w) => {
            let w_sum: f64 = w.iter().sum();
            y1.iter()
                .zip(y2.iter())
                .zip(w.iter())
                .map(|((a, b), wi)| (a - b) * (a - b) * wi / w_sum)
                .sum()
        }
    }
}

/// Coefficient of determination of `y2` as a prediction of `y1`.
pub fn compute_rsquared(y1: &[f64], y2: &[f64]) -> f64 {
    let m = mean(y1);
    let sum_var: f64 = y1.iter().map(|v| (v - m) * (v - m)).sum();
    let sum_res = compute_chi2(y1, y2, None);
    1.0 - sum_res / sum_var
}

/// Pearson correlation coefficient between `y1` and `y2`.
pub fn compute_pearson(y1: &[f64], y2: &[f64]) -> f64 {
    let m1 = mean(y1);
    let m2 = mean(y2);
    let mut cov = 0.0;
    let mut v1 = 0.0;
    let mut v2 = 0.0;
    for (a, b) in y1.iter().zip(y2.iter()) {
        cov += (a - m1) * (b - m2);
        v1 += (a - m1) * (a - m1);
        v2 += (b - m2) * (b - m2);
    }
    cov / (v1.sqrt() * v2.sqrt())
}

/// Convert NaN/Inf to None for JSON safety.
pub fn finite_or_none(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}
