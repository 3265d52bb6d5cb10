//! Closed-form scattering intensities.
//!
//! Supported populations and their parameters:
//!
//! - `guinier_porod`: `G_gp` (Guinier prefactor), `rg_gp` (radius of
//!   gyration), `D_gp` (Porod exponent)
//! - `spherical_normal`: `I0_sphere` (intensity scale), `r0_sphere` (mean
//!   radius), `sigma_sphere` (fractional std of the radius)
//! - `diffraction_peaks`: not modelled; flags the spectrum as unsupported
//! - `unidentified`: unfamiliar spectrum, every population is ignored
//!
//! `I0_floor` adds a flat term at every q.

use std::f64::consts::PI;

use crate::definitions::{ParamName, Population};
use crate::params::{Parameters, Populations};

/// Below this fractional width the sphere population is treated as
/// monodisperse.
const SIGMA_MONODISPERSE: f64 = 1e-9;

/// Radius sampling half-width, in units of sigma·r0.
const RADIUS_SPAN_SIGMAS: f64 = 5.0;

/// Radius sampling step, in units of sigma·r0.
const RADIUS_STEP_SIGMAS: f64 = 0.02;

/// Total SAXS intensity at each q.
///
/// When the spectrum is unidentified or holds diffraction peaks only the
/// flat floor is evaluated (zero if `I0_floor` is absent).
///
/// # Panics
///
/// Panics if a parameter list is shorter than its population count. Records
/// should pass [`Parameters::validate`] first.
pub fn compute_saxs(q: &[f64], populations: &Populations, params: &Parameters) -> Vec<f64> {
    let floor = params.value(ParamName::I0Floor, 0).copied().unwrap_or(0.0);
    let mut intensity = vec![floor; q.len()];

    if populations.is_unidentified() || populations.has_diffraction_peaks() {
        return intensity;
    }

    for (population, count) in populations.active() {
        for idx in 0..count {
            match population {
                Population::GuinierPorod => {
                    let g = params.values(ParamName::GGp)[idx];
                    let rg = params.values(ParamName::RgGp)[idx];
                    let d = params.values(ParamName::DGp)[idx];
                    for (i, term) in guinier_porod(q, rg, d, g).into_iter().enumerate() {
                        intensity[i] += term;
                    }
                }
                Population::SphericalNormal => {
                    let i0 = params.values(ParamName::I0Sphere)[idx];
                    let r0 = params.values(ParamName::R0Sphere)[idx];
                    let sigma = params.values(ParamName::SigmaSphere)[idx];
                    for (i, term) in spherical_normal_saxs(q, r0, sigma).into_iter().enumerate() {
                        intensity[i] += i0 * term;
                    }
                }
                Population::DiffractionPeaks | Population::Unidentified => {}
            }
        }
    }

    intensity
}

/// Crossover between the Guinier and Porod regimes.
pub fn guinier_porod_splice(r_g: f64, porod_exponent: f64) -> f64 {
    (1.5 * porod_exponent).sqrt() / r_g
}

/// Guinier-Porod intensity (Hammouda, J. Appl. Cryst. 43, 716-719, 2010).
///
/// `G·exp(-q²rg²/3)` up to the splice point, `P·q^-D` beyond it, with the
/// Porod prefactor `P` chosen so the two branches meet.
pub fn guinier_porod(q: &[f64], r_g: f64, porod_exponent: f64, guinier_factor: f64) -> Vec<f64> {
    let q_splice = guinier_porod_splice(r_g, porod_exponent);
    let porod_factor = guinier_factor
        * (-0.5 * porod_exponent).exp()
        * (1.5 * porod_exponent).powf(0.5 * porod_exponent)
        / r_g.powf(porod_exponent);

    q.iter()
        .map(|&qi| {
            if qi <= q_splice {
                guinier_factor * (-qi * qi * r_g * r_g / 3.0).exp()
            } else {
                porod_factor / qi.powf(porod_exponent)
            }
        })
        .collect()
}

/// Sphere form factor amplitude `3(sin x − x cos x)/x³`. Small x uses the
/// series `1 − x²/10`, which avoids the 0/0 at x = 0.
#[inline]
fn sphere_amplitude(x: f64) -> f64 {
    if x.abs() < 1e-4 {
        return 1.0 - x * x / 10.0;
    }
    3.0 * (x.sin() - x * x.cos()) / (x * x * x)
}

/// SAXS intensity of spheres with normally distributed radii, normalized so
/// that I(q=0) = 1.
///
/// The radius density is sampled from `max(r0 − 5σr, dr)` up to `r0 + 5σr`
/// in steps `dr = 0.02σr`, where `σr = sigma·r0`. Each radius contributes
/// its squared volume times the density, times the squared form factor.
pub fn spherical_normal_saxs(q: &[f64], r0: f64, sigma: f64) -> Vec<f64> {
    if sigma < SIGMA_MONODISPERSE {
        return q
            .iter()
            .map(|&qi| {
                let f = sphere_amplitude(qi * r0);
                f * f
            })
            .collect();
    }

    let sigma_r = sigma * r0;
    let dr = sigma_r * RADIUS_STEP_SIGMAS;
    let r_min = (r0 - RADIUS_SPAN_SIGMAS * sigma_r).max(dr);
    let r_max = r0 + RADIUS_SPAN_SIGMAS * sigma_r;
    let n_r = ((r_max - r_min) / dr).ceil().max(0.0) as usize;

    let norm = 1.0 / ((2.0 * PI).sqrt() * sigma_r);
    let samples: Vec<(f64, f64)> = (0..n_r)
        .map(|k| {
            let r = r_min + k as f64 * dr;
            let volume = 4.0 / 3.0 * PI * r * r * r;
            let density = norm * (-(r0 - r) * (r0 - r) / (2.0 * sigma_r * sigma_r)).exp();
            (r, volume * volume * density * dr)
        })
        .collect();

    let i_zero: f64 = samples.iter().map(|(_, w)| w).sum();

    q.iter()
        .map(|&qi| {
            if qi == 0.0 {
                return 1.0;
            }
            let total: f64 = samples
                .iter()
                .map(|&(r, w)| {
                    let f = sphere_amplitude(qi * r);
                    w * f * f
                })
                .sum();
            total / i_zero
        })
        .collect()
}
