//! Fast numerical descriptors of a raw spectrum.
//!
//! Nothing here assumes a population model. The metrics are meant to stay
//! comparable across spectra with different intensity scaling or q domains,
//! and feed classification or sanity checks rather than the fit loop.

use serde::{Deserialize, Serialize};

use crate::common::{
    finite_or_none, mean, polyfit, polyval, solve_linear, standardize, std_dev, Spectrum,
};
use crate::error::{Result, SaxsError};

/// Half-width, in points, of the window used to find I·q⁴ extrema.
const IQ4_WINDOW: usize = 10;

/// Descriptive metrics of a spectrum. `None` marks a metric that is not
/// finite or not defined for the input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumProfile {
    #[serde(rename = "q_Imax")]
    pub q_imax: Option<f64>,
    #[serde(rename = "Imax")]
    pub i_max: Option<f64>,
    #[serde(rename = "Imax_over_Imean")]
    pub imax_over_imean: Option<f64>,
    /// I_max over the mean intensity within ±10% of q_Imax.
    #[serde(rename = "Imax_sharpness")]
    pub imax_sharpness: Option<f64>,
    /// Summed |Δ log I| at the first step and at every sign change of
    /// Δ log I, over the log-intensity range. Near zero for smooth decay.
    #[serde(rename = "logI_fluctuation")]
    pub logi_fluctuation: Option<f64>,
    #[serde(rename = "logI_max_over_std")]
    pub logi_max_over_std: Option<f64>,
    #[serde(rename = "logI_range_over_std")]
    pub logi_range_over_std: Option<f64>,
}

/// Index of the first maximum (or minimum, with `Ordering::Less`) value.
fn arg_extreme(values: &[f64], want: std::cmp::Ordering) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            None => best = Some(i),
            Some(b) => {
                if v.total_cmp(&values[b]) == want {
                    best = Some(i);
                }
            }
        }
    }
    best
}

fn argmax(values: &[f64]) -> Option<usize> {
    arg_extreme(values, std::cmp::Ordering::Greater)
}

fn argmin(values: &[f64]) -> Option<usize> {
    arg_extreme(values, std::cmp::Ordering::Less)
}

/// Profile a spectrum. Never fails; degenerate inputs yield `None` fields.
pub fn profile_spectrum(spectrum: &Spectrum) -> SpectrumProfile {
    let q = spectrum.q();
    let intensity = spectrum.intensity();
    let Some(idx_max) = argmax(intensity) else {
        return SpectrumProfile::default();
    };

    let i_max = intensity[idx_max];
    let q_imax = q[idx_max];
    let i_mean = mean(intensity);

    let around_max: Vec<f64> = q
        .iter()
        .zip(intensity.iter())
        .filter(|(qi, _)| **qi > 0.9 * q_imax && **qi < 1.1 * q_imax)
        .map(|(_, i)| *i)
        .collect();
    let imax_sharpness = i_max / mean(&around_max);

    let log_i: Vec<f64> = intensity.iter().filter(|i| **i > 0.0).map(|i| i.ln()).collect();
    let mut profile = SpectrumProfile {
        q_imax: finite_or_none(q_imax),
        i_max: finite_or_none(i_max),
        imax_over_imean: finite_or_none(i_max / i_mean),
        imax_sharpness: finite_or_none(imax_sharpness),
        ..SpectrumProfile::default()
    };
    if log_i.is_empty() {
        return profile;
    }

    let log_max = log_i.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let log_min = log_i.iter().copied().fold(f64::INFINITY, f64::min);
    let log_range = log_max - log_min;
    let log_std = std_dev(&log_i);
    profile.logi_max_over_std = finite_or_none(log_max / log_std);
    profile.logi_range_over_std = finite_or_none(log_range / log_std);
    profile.logi_fluctuation = finite_or_none(log_fluctuation(&log_i) / log_range);
    profile
}

/// Sum of |Δ| over the first difference and every difference whose sign
/// flips relative to the previous one.
fn log_fluctuation(log_i: &[f64]) -> f64 {
    if log_i.len() < 2 {
        return f64::NAN;
    }
    let diffs: Vec<f64> = log_i.windows(2).map(|w| w[1] - w[0]).collect();
    let mut fluc = diffs[0].abs();
    for k in 1..diffs.len() {
        if diffs[k] * diffs[k - 1] < 0.0 {
            fluc += diffs[k].abs();
        }
    }
    fluc
}

// ---------------------------------------------------------------------------
// I(q=0) extrapolation
// ---------------------------------------------------------------------------

/// Polynomial least squares with the slope pinned at one point.
///
/// Minimizes `Σ (p(q) − I)²` subject to `p'(q_cons) = slope` through the
/// Lagrangian, solving the normal equations augmented with one constraint
/// row and column. `order` is the number of coefficients, so the polynomial
/// has degree `order - 1`. Returns the ascending coefficients; the
/// multiplier is discarded. Inputs are used as given, so standardize them
/// first for a standardized fit.
pub fn fit_with_slope_constraint(
    q: &[f64],
    intensity: &[f64],
    q_cons: f64,
    slope: f64,
    order: usize,
) -> Option<Vec<f64>> {
    if order == 0 {
        return None;
    }
    let n_coef = order;
    let n = n_coef + 1;
    let mut a = vec![0.0; n * n];
    let mut b = vec![0.0; n];

    // d/dq of q^k at q_cons
    let dpow = |k: usize| -> f64 {
        if k == 0 {
            0.0
        } else {
            k as f64 * q_cons.powi(k as i32 - 1)
        }
    };

    for i in 0..n_coef {
        for j in 0..n_coef {
            a[i * n + j] = q.iter().map(|x| x.powi((i + j) as i32)).sum();
        }
        a[i * n + n_coef] = -dpow(i);
        b[i] = q
            .iter()
            .zip(intensity.iter())
            .map(|(x, y)| y * x.powi(i as i32))
            .sum();
    }
    for j in 0..n_coef {
        a[n_coef * n + j] = dpow(j);
    }
    b[n_coef] = slope;

    let mut solution = solve_linear(&a, &b)?;
    solution.truncate(n_coef);
    Some(solution)
}

/// Coefficient count used by [`fit_i0`] callers that have no better choice: a
/// cubic.
pub const DEFAULT_I0_ORDER: usize = 4;

/// Estimate of I(q→0) by a standardized polynomial fit with zero slope at
/// q = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct I0Estimate {
    pub i_at_0: f64,
    /// Ascending coefficients in standardized q and I.
    pub coefficients: Vec<f64>,
    pub q_mean: f64,
    pub q_std: f64,
    pub i_mean: f64,
    pub i_std: f64,
}

impl I0Estimate {
    /// Evaluate the fitted polynomial at an unstandardized q.
    pub fn eval(&self, q: f64) -> f64 {
        polyval(&self.coefficients, (q - self.q_mean) / self.q_std) * self.i_std + self.i_mean
    }
}

/// Extrapolate I(q=0) using every point of the spectrum.
///
/// q and I are standardized, then fitted with an `order`-coefficient
/// polynomial whose slope vanishes at the standardized position of q = 0.
pub fn fit_i0(q: &[f64], intensity: &[f64], order: usize) -> Option<I0Estimate> {
    if order == 0 || q.len() != intensity.len() || q.len() < order {
        return None;
    }
    let (q_s, q_mean, q_std) = standardize(q);
    let (i_s, i_mean, i_std) = standardize(intensity);
    if !(q_std > 0.0 && i_std > 0.0) {
        return None;
    }
    let q_zero = -q_mean / q_std;
    let coefficients = fit_with_slope_constraint(&q_s, &i_s, q_zero, 0.0, order)?;
    let i_at_0 = polyval(&coefficients, q_zero) * i_std + i_mean;
    Some(I0Estimate {
        i_at_0,
        coefficients,
        q_mean,
        q_std,
        i_mean,
        i_std,
    })
}

// ---------------------------------------------------------------------------
// I·q⁴ metrics
// ---------------------------------------------------------------------------

/// Shape of the I·q⁴ curve around its first minimum, designed for spectra
/// dominated by a dilute spherical form factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Iq4Metrics {
    pub q_at_iqqqq_min1: f64,
    pub iqqqq_min1: f64,
    pub i_at_iqqqq_min1: f64,
    /// Focal width of the quadratic fit of I·q⁴ near the minimum.
    pub piqqqq_qwidth: f64,
    pub piqqqq_iqqqqfocus: f64,
    pub pi_qvertex: f64,
    pub pi_ivertex: f64,
    /// Focal width of the quadratic fit of I near the minimum.
    pub pi_qwidth: f64,
    pub pi_ifocus: f64,
}

/// Vertex, focal width and focal height of a standardized quadratic fit.
struct Parabola {
    x_vertex: f64,
    y_vertex: f64,
    width: f64,
    y_focus: f64,
}

fn local_parabola(x: &[f64], y: &[f64]) -> Option<Parabola> {
    let (x_s, x_mean, x_std) = standardize(x);
    let (y_s, y_mean, y_std) = standardize(y);
    let c = polyfit(&x_s, &y_s, 2)?;
    let (b, a) = (c[1], c[2]);
    if a == 0.0 {
        return None;
    }
    let xs_vertex = -b / (2.0 * a);
    let ys_vertex = polyval(&c, xs_vertex);
    Some(Parabola {
        x_vertex: xs_vertex * x_std + x_mean,
        y_vertex: ys_vertex * y_std + y_mean,
        width: (1.0 / a).abs() * x_std,
        y_focus: (ys_vertex + 1.0 / (4.0 * a)) * y_std + y_mean,
    })
}

/// Locate the first local maximum of I·q⁴ and the first local minimum after
/// it, then characterize I·q⁴ and I around that minimum with quadratic fits.
pub fn iq4_metrics(spectrum: &Spectrum) -> Result<Iq4Metrics> {
    let q = spectrum.q();
    let intensity = spectrum.intensity();
    let iqqqq: Vec<f64> = q
        .iter()
        .zip(intensity.iter())
        .map(|(q, i)| i * q.powi(4))
        .collect();

    let w = IQ4_WINDOW;
    let n = iqqqq.len();
    let mut idx_max1 = None;
    let mut idx_min1 = None;
    if n > 2 * w + 2 {
        for idx in w..(n - w - 2) {
            let window = &iqqqq[idx - w..=idx + w];
            if idx_max1.is_none() && argmax(window) == Some(w) {
                idx_max1 = Some(idx);
            }
            if idx_max1.is_some() && idx_min1.is_none() && argmin(window) == Some(w) {
                idx_min1 = Some(idx);
                break;
            }
        }
    }
    let Some(idx_min1) = idx_min1 else {
        return Err(SaxsError::Profile(format!(
            "unable to find first maximum and minimum of I*q^4 with a window of {w} points"
        )));
    };

    let q_min1 = q[idx_min1];
    let near: Vec<usize> = (0..n)
        .filter(|&i| q[i] > 0.9 * q_min1 && q[i] < 1.1 * q_min1)
        .collect();
    let q_near: Vec<f64> = near.iter().map(|&i| q[i]).collect();
    let iqqqq_near: Vec<f64> = near.iter().map(|&i| iqqqq[i]).collect();
    let i_near: Vec<f64> = near.iter().map(|&i| intensity[i]).collect();

    let fit_err = || SaxsError::Profile("quadratic fit near the I*q^4 minimum failed".to_string());
    let p_iqqqq = local_parabola(&q_near, &iqqqq_near).ok_or_else(fit_err)?;
    let p_i = local_parabola(&q_near, &i_near).ok_or_else(fit_err)?;

    Ok(Iq4Metrics {
        q_at_iqqqq_min1: p_iqqqq.x_vertex,
        iqqqq_min1: p_iqqqq.y_vertex,
        i_at_iqqqq_min1: p_iqqqq.y_vertex / p_iqqqq.x_vertex.powi(4),
        piqqqq_qwidth: p_iqqqq.width,
        piqqqq_iqqqqfocus: p_iqqqq.y_focus,
        pi_qvertex: p_i.x_vertex,
        pi_ivertex: p_i.y_vertex,
        pi_qwidth: p_i.width,
        pi_ifocus: p_i.y_focus,
    })
}
