use serde::{Deserialize, Serialize};

use crate::common::{compute_chi2, Spectrum};
use crate::error::{Result, SaxsError};
use crate::model::compute_saxs;
use crate::params::{Parameters, Populations};

/// Per-point weighting of the log-space residuals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weights {
    /// Plain sum of squared log residuals.
    #[default]
    Uniform,
    /// One weight per spectrum point (e.g. inverse variance). Weights of the
    /// fitted points are normalized to sum to one.
    PerPoint(Vec<f64>),
}

/// Chi2log objective: `Σ (ln I_model − ln I_measured)²` over the fit mask.
///
/// The mask (finite positive intensity, optional q window) is applied before
/// any logarithm is taken, and the model is only evaluated at masked q.
#[derive(Debug, Clone)]
pub struct Objective {
    populations: Populations,
    q_fit: Vec<f64>,
    i_fit: Vec<f64>,
    log_i_fit: Vec<f64>,
    weights: Option<Vec<f64>>,
}

impl Objective {
    pub fn new(
        spectrum: &Spectrum,
        populations: &Populations,
        q_range: Option<(f64, f64)>,
        weights: &Weights,
    ) -> Result<Self> {
        let mask = spectrum.fit_mask(q_range);

        let weights = match weights {
            Weights::Uniform => None,
            Weights::PerPoint(w) => {
                if w.len() != spectrum.len() {
                    return Err(SaxsError::InvalidSpectrum(format!(
                        "{} weights for {} points",
                        w.len(),
                        spectrum.len()
                    )));
                }
                let selected = select(w, &mask);
                let total: f64 = selected.iter().sum();
                if !(total.is_finite() && total > 0.0) {
                    return Err(SaxsError::InvalidSpectrum(format!(
                        "weights of the fitted points sum to {total}"
                    )));
                }
                Some(selected)
            }
        };

        let q_fit = select(spectrum.q(), &mask);
        let i_fit = select(spectrum.intensity(), &mask);
        let log_i_fit = i_fit.iter().map(|i| i.ln()).collect();

        Ok(Self {
            populations: populations.clone(),
            q_fit,
            i_fit,
            log_i_fit,
            weights,
        })
    }

    /// False when no point survives the mask.
    pub fn is_fittable(&self) -> bool {
        !self.q_fit.is_empty()
    }

    pub fn n_points(&self) -> usize {
        self.q_fit.len()
    }

    /// Masked q values.
    pub fn q_fit(&self) -> &[f64] {
        &self.q_fit
    }

    /// Masked measured intensities.
    pub fn intensity_fit(&self) -> &[f64] {
        &self.i_fit
    }

    /// Model intensity at the masked q values.
    pub fn model(&self, params: &Parameters) -> Vec<f64> {
        compute_saxs(&self.q_fit, &self.populations, params)
    }

    /// Objective value; `+inf` for an unfittable spectrum.
    ///
    /// # Panics
    ///
    /// Panics if `params` is shorter than the population record requires.
    /// [`SaxsFitter::evaluate`](crate::fit::SaxsFitter::evaluate) validates
    /// first.
    pub fn evaluate(&self, params: &Parameters) -> f64 {
        if !self.is_fittable() {
            return f64::INFINITY;
        }
        let log_model: Vec<f64> = self.model(params).iter().map(|i| i.ln()).collect();
        compute_chi2(&log_model, &self.log_i_fit, self.weights.as_deref())
    }
}

fn select(values: &[f64], mask: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(mask.iter())
        .filter(|(_, keep)| **keep)
        .map(|(v, _)| *v)
        .collect()
}
