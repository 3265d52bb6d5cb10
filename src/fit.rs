use std::sync::atomic::{AtomicUsize, Ordering};

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus,
};
use argmin::solver::neldermead::NelderMead;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::codec::FlatParams;
use crate::common::{finite_or_none, mean, std_dev, Spectrum};
use crate::definitions::Bound;
use crate::error::Result;
use crate::objective::{Objective, Weights};
use crate::params::{
    default_bounds, default_fixed, default_params, intensity_only_fixed, Bounds, FixedFlags,
    Parameters, Populations,
};

/// Cost returned for parameter sets whose model is not finite.
const NON_FINITE_COST: f64 = 1e99;

/// Relative size of the initial simplex edges.
const SIMPLEX_STEP: f64 = 0.05;

/// Initial simplex edge for a coordinate that starts at exactly zero.
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Settings for local refinement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    /// Only points with `q_min < q < q_max` are fitted.
    pub q_range: Option<(f64, f64)>,
    pub weights: Weights,
    /// Iteration cap for each Nelder-Mead run.
    pub max_iters: u64,
    /// Convergence threshold on the standard deviation of the simplex costs.
    pub sd_tolerance: f64,
    /// Extra Nelder-Mead runs restarted from the best vertex after convergence.
    pub restarts: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            q_range: None,
            weights: Weights::Uniform,
            max_iters: 4000,
            sd_tolerance: 1e-12,
            restarts: 2,
        }
    }
}

/// Fit quality summary. Float fields are `None` when not finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub success: bool,
    pub objective_init: Option<f64>,
    pub objective_value: Option<f64>,
    /// Mean fitted intensity over the standard deviation of the residual
    /// intensity, on the fitted points.
    pub snr: Option<f64>,
    pub n_points: usize,
    pub n_free: usize,
    pub n_iter: u64,
    pub n_evals: usize,
    pub message: String,
}

/// Optimized parameters plus report.
///
/// Unidentified spectra and spectra with diffraction peaks produce an empty
/// result: no parameters and no report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: Parameters,
    pub report: Option<FitReport>,
}

impl FitResult {
    pub fn empty() -> Self {
        Self {
            params: Parameters::new(),
            report: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.report.is_none()
    }

    pub fn success(&self) -> bool {
        self.report.as_ref().is_some_and(|r| r.success)
    }
}

// ---------------------------------------------------------------------------
// Cost function
// ---------------------------------------------------------------------------

struct FitProblem<'a> {
    objective: &'a Objective,
    template: &'a FlatParams,
    n_evals: &'a AtomicUsize,
}

impl CostFunction for FitProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> std::result::Result<Self::Output, ArgminError> {
        self.n_evals.fetch_add(1, Ordering::Relaxed);
        let params = self.template.with_free_values(p).decode();
        let value = self.objective.evaluate(&params);
        if !value.is_finite() {
            return Ok(NON_FINITE_COST);
        }
        Ok(value)
    }
}

/// Starting simplex around `x0`: one vertex per coordinate, stepped by 5%
/// (or a small absolute step from zero), reflected back inside the bounds.
fn initial_simplex(x0: &[f64], bounds: &[Bound]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for (i, bound) in bounds.iter().enumerate() {
        let step = if x0[i] != 0.0 {
            SIMPLEX_STEP * x0[i]
        } else {
            SIMPLEX_ZERO_STEP
        };
        let mut vertex = x0.to_vec();
        vertex[i] = if bound.contains(x0[i] + step) {
            x0[i] + step
        } else {
            bound.clamp(x0[i] - step)
        };
        simplex.push(vertex);
    }
    simplex
}

fn clamp_all(values: &[f64], bounds: &[Bound]) -> Vec<f64> {
    values
        .iter()
        .zip(bounds.iter())
        .map(|(v, b)| b.clamp(*v))
        .collect()
}

// ---------------------------------------------------------------------------
// Fitter
// ---------------------------------------------------------------------------

/// Fits the parameters of a population record against one spectrum.
#[derive(Debug, Clone)]
pub struct SaxsFitter {
    spectrum: Spectrum,
    populations: Populations,
    config: FitConfig,
    objective: Objective,
}

impl SaxsFitter {
    pub fn new(spectrum: Spectrum, populations: Populations) -> Result<Self> {
        Self::with_config(spectrum, populations, FitConfig::default())
    }

    pub fn with_config(
        spectrum: Spectrum,
        populations: Populations,
        config: FitConfig,
    ) -> Result<Self> {
        let objective = Objective::new(&spectrum, &populations, config.q_range, &config.weights)?;
        Ok(Self {
            spectrum,
            populations,
            config,
            objective,
        })
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn populations(&self) -> &Populations {
        &self.populations
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Default parameters for this fitter's populations.
    pub fn default_params(&self) -> Parameters {
        default_params(&self.populations)
    }

    /// Chi2log objective of `params` against the spectrum. Parameters of
    /// populations absent from this fitter are ignored.
    pub fn evaluate(&self, params: &Parameters) -> Result<f64> {
        params.validate(&self.populations)?;
        Ok(self.objective.evaluate(params))
    }

    /// True when the populations flag a spectrum the model cannot describe.
    pub(crate) fn is_unsupported(&self) -> bool {
        self.populations.is_unidentified() || self.populations.has_diffraction_peaks()
    }

    /// Build the flat vector from a starting record plus partial fixed and
    /// bounds records, each merged positionally over the defaults.
    pub(crate) fn flatten(
        &self,
        params: Option<&Parameters>,
        fixed: Option<&FixedFlags>,
        bounds: Option<&Bounds>,
    ) -> Result<FlatParams> {
        let start = match params {
            Some(p) => {
                let mut p = p.clone();
                p.restrict_to(&self.populations);
                p
            }
            None => self.default_params(),
        };

        let mut fixed_full = default_fixed(&self.populations);
        if let Some(f) = fixed {
            fixed_full.update(f);
        }
        let mut bounds_full = default_bounds(&self.populations);
        if let Some(b) = bounds {
            bounds_full.update(b);
        }

        FlatParams::encode(&self.populations, &start, &fixed_full, &bounds_full)
    }

    /// Local refinement with a bounded Nelder-Mead simplex.
    ///
    /// `params` defaults to the parameter table; `fixed` and `bounds` may be
    /// partial. Non-convergence and unfittable spectra are reported through
    /// `FitReport::success`; only malformed records return an error.
    pub fn fit(
        &self,
        params: Option<&Parameters>,
        fixed: Option<&FixedFlags>,
        bounds: Option<&Bounds>,
    ) -> Result<FitResult> {
        if self.is_unsupported() {
            return Ok(FitResult::empty());
        }

        let flat = self.flatten(params, fixed, bounds)?;
        let start = flat.decode();

        if !self.objective.is_fittable() {
            warn!("spectrum has no points with positive intensity in the fit range");
            return Ok(FitResult {
                params: start,
                report: Some(FitReport {
                    success: false,
                    objective_init: None,
                    objective_value: None,
                    snr: None,
                    n_points: 0,
                    n_free: flat.n_free(),
                    n_iter: 0,
                    n_evals: 0,
                    message: "no fittable points".to_string(),
                }),
            });
        }

        let objective_init = self.objective.evaluate(&start);
        let n_evals = AtomicUsize::new(0);
        let free_bounds = flat.free_bounds();
        let mut best = clamp_all(&flat.free_values(), &free_bounds);
        let mut best_cost = objective_init;
        let mut n_iter = 0;
        let mut success;
        let mut message;

        debug!(
            "fitting {} free of {} parameters over {} points",
            flat.n_free(),
            flat.len(),
            self.objective.n_points()
        );

        if best.is_empty() {
            success = true;
            message = "all parameters fixed".to_string();
        } else {
            success = false;
            message = String::new();
            for round in 0..=self.config.restarts {
                let solver = match NelderMead::new(initial_simplex(&best, &free_bounds))
                    .with_sd_tolerance(self.config.sd_tolerance)
                {
                    Ok(solver) => solver,
                    Err(e) => {
                        message = e.to_string();
                        success = false;
                        break;
                    }
                };
                let problem = FitProblem {
                    objective: &self.objective,
                    template: &flat,
                    n_evals: &n_evals,
                };
                let res = Executor::new(problem, solver)
                    .configure(|state| state.max_iters(self.config.max_iters))
                    .run();
                match res {
                    Ok(res) => {
                        let state = res.state();
                        n_iter += state.get_iter();
                        let termination = state.get_termination_status();
                        success = matches!(
                            termination,
                            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                                | TerminationStatus::Terminated(
                                    TerminationReason::TargetCostReached
                                )
                        );
                        message = termination.to_string();
                        let cost = state.get_best_cost();
                        if let Some(param) = state.get_best_param() {
                            if cost <= best_cost {
                                best = clamp_all(param, &free_bounds);
                                best_cost = cost;
                            }
                        }
                        debug!("Nelder-Mead round {round}: cost {cost:.6e}, {message}");
                    }
                    Err(e) => {
                        message = e.to_string();
                        success = false;
                    }
                }
                if !success {
                    break;
                }
            }
        }

        let fitted = flat.with_free_values(&best).decode();
        let objective_value = self.objective.evaluate(&fitted);
        if success && !objective_value.is_finite() {
            success = false;
            message = "objective is not finite at the optimum".to_string();
        }
        if !success {
            warn!("fit did not converge: {message}");
        }

        Ok(FitResult {
            report: Some(FitReport {
                success,
                objective_init: finite_or_none(objective_init),
                objective_value: finite_or_none(objective_value),
                snr: finite_or_none(self.snr(&fitted)),
                n_points: self.objective.n_points(),
                n_free: flat.n_free(),
                n_iter,
                n_evals: n_evals.load(Ordering::Relaxed),
                message,
            }),
            params: fitted,
        })
    }

    /// Refine only amplitude parameters (`I0_floor`, `G_gp`, `I0_sphere`,
    /// `I_pkcenter`), holding every size and shape parameter fixed.
    pub fn fit_intensity_params(&self, params: Option<&Parameters>) -> Result<FitResult> {
        let fixed = intensity_only_fixed(&self.populations);
        self.fit(params, Some(&fixed), None)
    }

    fn snr(&self, params: &Parameters) -> f64 {
        let model = self.objective.model(params);
        let residual: Vec<f64> = self
            .objective
            .intensity_fit()
            .iter()
            .zip(model.iter())
            .map(|(i, m)| i - m)
            .collect();
        mean(&model) / std_dev(&residual)
    }
}
