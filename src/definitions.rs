//! Population types, parameter names and the read-only parameter table.
//!
//! Both enums derive `Ord` from their declaration order. Records keyed by
//! them iterate in that order, which fixes the layout of the flat optimizer
//! vector: `I0_floor` first, then each population's parameters.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Populations
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    /// Diffuse scatterers described by the Guinier-Porod model.
    GuinierPorod,
    /// Spheres with normally distributed radii.
    SphericalNormal,
    /// Pseudo-Voigt diffraction peaks (not modelled yet).
    DiffractionPeaks,
    /// Unfamiliar spectrum; disables every physical term.
    Unidentified,
}

impl Population {
    pub fn key(self) -> &'static str {
        match self {
            Population::GuinierPorod => "guinier_porod",
            Population::SphericalNormal => "spherical_normal",
            Population::DiffractionPeaks => "diffraction_peaks",
            Population::Unidentified => "unidentified",
        }
    }

    /// Parameters carried once per instance of this population.
    pub fn params(self) -> &'static [ParamName] {
        match self {
            Population::GuinierPorod => &[ParamName::GGp, ParamName::RgGp, ParamName::DGp],
            Population::SphericalNormal => &[
                ParamName::I0Sphere,
                ParamName::R0Sphere,
                ParamName::SigmaSphere,
            ],
            Population::DiffractionPeaks => &[
                ParamName::IPkcenter,
                ParamName::QPkcenter,
                ParamName::PkHwhm,
            ],
            Population::Unidentified => &[],
        }
    }
}

impl std::fmt::Display for Population {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParamName {
    #[serde(rename = "I0_floor")]
    I0Floor,
    #[serde(rename = "G_gp")]
    GGp,
    #[serde(rename = "rg_gp")]
    RgGp,
    #[serde(rename = "D_gp")]
    DGp,
    #[serde(rename = "I0_sphere")]
    I0Sphere,
    #[serde(rename = "r0_sphere")]
    R0Sphere,
    #[serde(rename = "sigma_sphere")]
    SigmaSphere,
    #[serde(rename = "I_pkcenter")]
    IPkcenter,
    #[serde(rename = "q_pkcenter")]
    QPkcenter,
    #[serde(rename = "pk_hwhm")]
    PkHwhm,
}

/// Whether a parameter scales intensity or shapes the curve.
///
/// Intensity-only refinement frees `Amplitude` parameters and holds every
/// `Structural` one fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamRole {
    Amplitude,
    Structural,
}

/// Closed interval a parameter is confined to during fitting.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bound {
    pub lower: f64,
    pub upper: f64,
}

impl Bound {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.lower).min(self.upper)
    }

    pub fn range(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// One row of the parameter table.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: ParamName,
    pub key: &'static str,
    /// `None` for global parameters such as the flat floor.
    pub population: Option<Population>,
    pub role: ParamRole,
    pub default: f64,
    pub bound: Bound,
    pub description: &'static str,
    pub units: &'static str,
}

static PARAM_TABLE: [ParamSpec; 10] = [
    ParamSpec {
        name: ParamName::I0Floor,
        key: "I0_floor",
        population: None,
        role: ParamRole::Amplitude,
        default: 0.0,
        bound: Bound::new(0.0, 10.0),
        description: "magnitude of the floor term, flat for all q",
        units: "arbitrary",
    },
    ParamSpec {
        name: ParamName::GGp,
        key: "G_gp",
        population: Some(Population::GuinierPorod),
        role: ParamRole::Amplitude,
        default: 1.0,
        bound: Bound::new(0.0, 1.0e4),
        description: "Guinier prefactor for Guinier-Porod scatterers",
        units: "arbitrary",
    },
    ParamSpec {
        name: ParamName::RgGp,
        key: "rg_gp",
        population: Some(Population::GuinierPorod),
        role: ParamRole::Structural,
        default: 10.0,
        bound: Bound::new(1.0e-6, 1.0e3),
        description: "radius of gyration for Guinier-Porod scatterers",
        units: "Angstrom",
    },
    ParamSpec {
        name: ParamName::DGp,
        key: "D_gp",
        population: Some(Population::GuinierPorod),
        role: ParamRole::Structural,
        default: 4.0,
        bound: Bound::new(0.0, 4.0),
        description: "Porod exponent for Guinier-Porod scatterers",
        units: "unitless",
    },
    ParamSpec {
        name: ParamName::I0Sphere,
        key: "I0_sphere",
        population: Some(Population::SphericalNormal),
        role: ParamRole::Amplitude,
        default: 1.0,
        bound: Bound::new(0.0, 1.0e4),
        description: "spherical form factor intensity scaling factor",
        units: "arbitrary",
    },
    ParamSpec {
        name: ParamName::R0Sphere,
        key: "r0_sphere",
        population: Some(Population::SphericalNormal),
        role: ParamRole::Structural,
        default: 20.0,
        bound: Bound::new(1.0e-6, 1.0e3),
        description: "mean sphere radius",
        units: "Angstrom",
    },
    ParamSpec {
        name: ParamName::SigmaSphere,
        key: "sigma_sphere",
        population: Some(Population::SphericalNormal),
        role: ParamRole::Structural,
        default: 0.05,
        bound: Bound::new(0.0, 0.5),
        description: "fractional standard deviation of sphere radius",
        units: "unitless",
    },
    ParamSpec {
        name: ParamName::IPkcenter,
        key: "I_pkcenter",
        population: Some(Population::DiffractionPeaks),
        role: ParamRole::Amplitude,
        default: 1.0,
        bound: Bound::new(0.0, 1.0e4),
        description: "diffraction peak intensity at its center",
        units: "arbitrary",
    },
    ParamSpec {
        name: ParamName::QPkcenter,
        key: "q_pkcenter",
        population: Some(Population::DiffractionPeaks),
        role: ParamRole::Structural,
        default: 0.1,
        bound: Bound::new(0.0, 1.0),
        description: "q value of the diffraction peak center",
        units: "1/Angstrom",
    },
    ParamSpec {
        name: ParamName::PkHwhm,
        key: "pk_hwhm",
        population: Some(Population::DiffractionPeaks),
        role: ParamRole::Structural,
        default: 1.0e-3,
        bound: Bound::new(1.0e-9, 0.1),
        description: "diffraction peak half-width at half-max",
        units: "1/Angstrom",
    },
];

impl ParamName {
    pub const ALL: [ParamName; 10] = [
        ParamName::I0Floor,
        ParamName::GGp,
        ParamName::RgGp,
        ParamName::DGp,
        ParamName::I0Sphere,
        ParamName::R0Sphere,
        ParamName::SigmaSphere,
        ParamName::IPkcenter,
        ParamName::QPkcenter,
        ParamName::PkHwhm,
    ];

    /// Table row for this parameter.
    pub fn spec(self) -> &'static ParamSpec {
        // Table rows are laid out in declaration order.
        &PARAM_TABLE[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn population(self) -> Option<Population> {
        self.spec().population
    }

    pub fn role(self) -> ParamRole {
        self.spec().role
    }

    pub fn default_value(self) -> f64 {
        self.spec().default
    }

    pub fn default_bound(self) -> Bound {
        self.spec().bound
    }

    pub fn is_global(self) -> bool {
        self.population().is_none()
    }
}

impl std::fmt::Display for ParamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// The complete, read-only parameter table.
pub fn param_table() -> &'static [ParamSpec] {
    &PARAM_TABLE
}
