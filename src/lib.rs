pub mod anneal;
pub mod batch;
pub mod codec;
pub mod common;
pub mod definitions;
pub mod error;
pub mod fit;
pub mod model;
pub mod objective;
pub mod params;
pub mod profile;

pub use anneal::{AnnealConfig, AnnealReport, AnnealResult};
pub use batch::{fit_batch, profile_batch, FitJob};
pub use codec::{FlatEntry, FlatParams};
pub use common::Spectrum;
pub use definitions::{param_table, Bound, ParamName, ParamRole, ParamSpec, Population};
pub use error::{Result, SaxsError};
pub use fit::{FitConfig, FitReport, FitResult, SaxsFitter};
pub use model::{compute_saxs, guinier_porod, spherical_normal_saxs};
pub use objective::{Objective, Weights};
pub use params::{
    default_bounds, default_fixed, default_params, update_params, Bounds, Entry, FixedFlags,
    ParamRecord, Parameters, Populations,
};
pub use profile::{
    fit_i0, iq4_metrics, profile_spectrum, I0Estimate, Iq4Metrics, SpectrumProfile,
    DEFAULT_I0_ORDER,
};
