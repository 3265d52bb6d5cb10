use log::{debug, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::codec::FlatParams;
use crate::common::finite_or_none;
use crate::error::Result;
use crate::fit::SaxsFitter;
use crate::params::{Bounds, FixedFlags, Parameters};

/// Settings for the Metropolis-Hastings search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnealConfig {
    /// Fractional step size of the random walk.
    pub stepsize: f64,
    pub nsteps: usize,
    /// Metropolis temperature; zero rejects every non-improving trial.
    pub temperature: f64,
    pub seed: u64,
}

impl Default for AnnealConfig {
    fn default() -> Self {
        Self {
            stepsize: 0.1,
            nsteps: 1000,
            temperature: 0.0,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealReport {
    pub reject_ratio: f64,
    pub n_steps: usize,
    pub n_rejected: usize,
    pub objective_init: Option<f64>,
    pub objective_best: Option<f64>,
    pub objective_final: Option<f64>,
}

/// Best-seen and final-iterate parameters of a random walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnealResult {
    pub best: Parameters,
    pub last: Parameters,
    pub report: Option<AnnealReport>,
}

impl AnnealResult {
    pub fn empty() -> Self {
        Self {
            best: Parameters::new(),
            last: Parameters::new(),
            report: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_empty() && self.last.is_empty() && self.report.is_none()
    }
}

impl SaxsFitter {
    /// Metropolis-Hastings random walk over the free parameters.
    ///
    /// Every free parameter is scaled by `1 + 2(u − 0.5)·stepsize`, or set to
    /// `u·stepsize·range` when it is exactly zero, then clamped to its
    /// bounds. Lower objectives are always accepted; higher ones with
    /// probability `exp(−ΔE/T)`, never when `T = 0`.
    pub fn anneal(
        &self,
        params: Option<&Parameters>,
        fixed: Option<&FixedFlags>,
        bounds: Option<&Bounds>,
        config: &AnnealConfig,
    ) -> Result<AnnealResult> {
        if self.is_unsupported() {
            return Ok(AnnealResult::empty());
        }

        let flat = self.flatten(params, fixed, bounds)?;
        let start = flat.decode();
        if !self.objective().is_fittable() {
            warn!("spectrum has no points with positive intensity in the fit range");
            return Ok(AnnealResult {
                best: start.clone(),
                last: start,
                report: None,
            });
        }

        let eval = |values: &[f64]| -> f64 {
            let v = self.objective().evaluate(&flat.with_free_values(values).decode());
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let bounds = flat.free_bounds();
        let mut rng = SmallRng::seed_from_u64(config.seed);

        let init = flat.free_values();
        let mut current = init.clone();
        let mut best = init.clone();
        let obj_init = eval(&init);
        let mut obj_current = obj_init;
        let mut obj_best = obj_init;
        let mut n_rejected = 0usize;

        for _ in 0..config.nsteps {
            let trial: Vec<f64> = current
                .iter()
                .zip(bounds.iter())
                .map(|(&v, bound)| {
                    let u: f64 = rng.random::<f64>();
                    let stepped = if v == 0.0 {
                        u * config.stepsize * bound.range()
                    } else {
                        v * (1.0 + 2.0 * (u - 0.5) * config.stepsize)
                    };
                    bound.clamp(stepped)
                })
                .collect();

            let obj_trial = eval(&trial);
            let accept = if obj_trial < obj_current {
                true
            } else if config.temperature == 0.0 {
                false
            } else {
                let u: f64 = rng.random::<f64>();
                (-(obj_trial - obj_current) / config.temperature).exp() > u
            };

            if accept {
                if obj_trial < obj_best {
                    best = trial.clone();
                    obj_best = obj_trial;
                }
                current = trial;
                obj_current = obj_trial;
            } else {
                n_rejected += 1;
            }
        }

        let reject_ratio = if config.nsteps > 0 {
            n_rejected as f64 / config.nsteps as f64
        } else {
            0.0
        };
        debug!(
            "anneal: {} steps, reject ratio {reject_ratio:.3}, objective {obj_init:.4e} -> {obj_best:.4e}",
            config.nsteps
        );

        Ok(AnnealResult {
            best: decode(&flat, &best),
            last: decode(&flat, &current),
            report: Some(AnnealReport {
                reject_ratio,
                n_steps: config.nsteps,
                n_rejected,
                objective_init: finite_or_none(obj_init),
                objective_best: finite_or_none(obj_best),
                objective_final: finite_or_none(obj_current),
            }),
        })
    }
}

fn decode(flat: &FlatParams, values: &[f64]) -> Parameters {
    flat.with_free_values(values).decode()
}
