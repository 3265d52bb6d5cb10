use rayon::prelude::*;

use crate::common::Spectrum;
use crate::error::Result;
use crate::fit::{FitConfig, FitResult, SaxsFitter};
use crate::params::{Parameters, Populations};
use crate::profile::{profile_spectrum, SpectrumProfile};

/// One spectrum to fit, with its population record and optional start point.
#[derive(Debug, Clone)]
pub struct FitJob {
    pub spectrum: Spectrum,
    pub populations: Populations,
    pub params: Option<Parameters>,
}

impl FitJob {
    pub fn new(spectrum: Spectrum, populations: Populations) -> Self {
        Self {
            spectrum,
            populations,
            params: None,
        }
    }
}

/// Fit a batch of spectra in parallel.
///
/// Jobs are independent and share only the read-only config. Results come
/// back in job order; one malformed job does not affect the others.
pub fn fit_batch(jobs: &[FitJob], config: &FitConfig) -> Vec<Result<FitResult>> {
    jobs.par_iter()
        .map(|job| {
            let fitter = SaxsFitter::with_config(
                job.spectrum.clone(),
                job.populations.clone(),
                config.clone(),
            )?;
            fitter.fit(job.params.as_ref(), None, None)
        })
        .collect()
}

/// Profile a batch of spectra in parallel.
pub fn profile_batch(spectra: &[Spectrum]) -> Vec<SpectrumProfile> {
    spectra.par_iter().map(profile_spectrum).collect()
}
