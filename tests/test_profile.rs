
use approx::assert_relative_eq;
use saxs_fitting::batch::profile_batch;
use saxs_fitting::common::{linspace, polyval, Spectrum};
use saxs_fitting::error::SaxsError;
use saxs_fitting::profile::{
    fit_i0, fit_with_slope_constraint, iq4_metrics, profile_spectrum, SpectrumProfile,
    DEFAULT_I0_ORDER,
};

// ---------------------------------------------------------------------------
// profile_spectrum
// ---------------------------------------------------------------------------

#[test]
fn sharp_peak_is_detected() {
    let spectrum = synthetic::peaked_spectrum(500, 0.3, 500.0, 0.002);
    let profile = profile_spectrum(&spectrum);

    let q_imax = profile.q_imax.unwrap();
    assert!((q_imax - 0.3).abs() < 0.002, "q_Imax = {q_imax}");
    let sharpness = profile.imax_sharpness.unwrap();
    assert!(sharpness > 2.0, "sharpness = {sharpness}");
    let fluc = profile.logi_fluctuation.unwrap();
    assert!(fluc < 0.5, "fluctuation = {fluc}");
    assert!(profile.imax_over_imean.unwrap() > 1.0);
}

#[test]
fn smooth_decay_profile() {
    let spectrum = synthetic::guinier_porod_spectrum(200, 100.0, 20.0, 4.0, 0.01);
    let profile = profile_spectrum(&spectrum);

    assert_eq!(profile.q_imax, Some(spectrum.q()[0]), "maximum at lowest q");
    assert_relative_eq!(profile.imax_sharpness.unwrap(), 1.0, max_relative = 1e-12);
    let fluc = profile.logi_fluctuation.unwrap();
    assert!(fluc < 0.05, "monotonic decay should barely fluctuate, got {fluc}");
    assert!(profile.logi_range_over_std.unwrap() > 0.0);
}

#[test]
fn noise_raises_fluctuation() {
    let clean = synthetic::guinier_porod_spectrum(200, 100.0, 20.0, 4.0, 0.01);
    let noisy = synthetic::with_noise(&clean, 0.2, 3);
    let f_clean = profile_spectrum(&clean).logi_fluctuation.unwrap();
    let f_noisy = profile_spectrum(&noisy).logi_fluctuation.unwrap();
    assert!(f_noisy > f_clean, "noisy {f_noisy} vs clean {f_clean}");
}

#[test]
fn empty_spectrum_profiles_to_none() {
    let spectrum = Spectrum::new(vec![], vec![]).unwrap();
    assert_eq!(profile_spectrum(&spectrum), SpectrumProfile::default());
}

#[test]
fn non_positive_intensity_leaves_log_metrics_empty() {
    let spectrum = Spectrum::new(vec![0.1, 0.2], vec![0.0, -1.0]).unwrap();
    let profile = profile_spectrum(&spectrum);
    assert_eq!(profile.q_imax, Some(0.1));
    assert!(profile.logi_fluctuation.is_none());
    assert!(profile.logi_max_over_std.is_none());
}

#[test]
fn profile_serializes_with_metric_keys() {
    let spectrum = synthetic::peaked_spectrum(200, 0.3, 50.0, 0.005);
    let json = serde_json::to_value(profile_spectrum(&spectrum)).unwrap();
    for key in [
        "q_Imax",
        "Imax_over_Imean",
        "Imax_sharpness",
        "logI_fluctuation",
        "logI_max_over_std",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }
}

#[test]
fn batch_profiles_in_order() {
    let spectra = vec![
        synthetic::peaked_spectrum(200, 0.2, 500.0, 0.003),
        synthetic::guinier_porod_spectrum(200, 100.0, 20.0, 4.0, 0.01),
    ];
    let profiles = profile_batch(&spectra);
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0], profile_spectrum(&spectra[0]));
    assert_eq!(profiles[1], profile_spectrum(&spectra[1]));
}

// ---------------------------------------------------------------------------
// I(0) extrapolation
// ---------------------------------------------------------------------------

#[test]
fn slope_constraint_recovers_exact_polynomial() {
    let x = linspace(-1.0, 2.0, 30);
    let y: Vec<f64> = x.iter().map(|x| 1.0 + x + x * x).collect();
    let c = fit_with_slope_constraint(&x, &y, 0.0, 1.0, 3).unwrap();
    assert_eq!(c.len(), 3, "order counts coefficients");
    for (got, want) in c.iter().zip([1.0, 1.0, 1.0]) {
        assert_relative_eq!(*got, want, epsilon = 1e-9);
    }
}

#[test]
fn slope_constraint_is_enforced() {
    let x = linspace(0.0, 1.0, 11);
    let y: Vec<f64> = x.iter().map(|x| 2.0 * x).collect();
    let c = fit_with_slope_constraint(&x, &y, 0.5, 0.0, 2).unwrap();
    assert_eq!(c.len(), 2);
    assert_relative_eq!(c[1], 0.0, epsilon = 1e-12);
    assert_relative_eq!(c[0], 1.0, epsilon = 1e-12);
}

#[test]
fn fit_i0_extrapolates_quadratic() {
    let q = linspace(0.1, 1.0, 40);
    let i: Vec<f64> = q.iter().map(|q| 5.0 - 2.0 * q * q).collect();
    let est = fit_i0(&q, &i, 3).unwrap();
    assert_eq!(est.coefficients.len(), 3);
    assert_relative_eq!(est.i_at_0, 5.0, epsilon = 1e-8);
    assert_relative_eq!(est.eval(0.5), 4.5, epsilon = 1e-8);

    // Zero slope at q = 0 in unstandardized coordinates.
    let h = 1e-5;
    let slope = (est.eval(h) - est.eval(-h)) / (2.0 * h);
    assert!(slope.abs() < 1e-5, "slope at q=0 = {slope}");
}

#[test]
fn fit_i0_default_order_is_cubic() {
    let q = linspace(0.05, 1.0, 60);
    let i: Vec<f64> = q.iter().map(|q| 5.0 - 2.0 * q * q + q * q * q).collect();
    let est = fit_i0(&q, &i, DEFAULT_I0_ORDER).unwrap();
    assert_eq!(est.coefficients.len(), 4, "default fit has four coefficients");
    assert_relative_eq!(est.i_at_0, 5.0, epsilon = 1e-7);
    assert_relative_eq!(est.eval(0.5), 5.0 - 0.5 + 0.125, epsilon = 1e-7);
}

#[test]
fn slope_constraint_rejects_zero_order() {
    let x = linspace(0.0, 1.0, 5);
    assert!(fit_with_slope_constraint(&x, &x, 0.0, 0.0, 0).is_none());
}

#[test]
fn fit_i0_rejects_degenerate_input() {
    assert!(fit_i0(&[0.1, 0.2], &[1.0, 1.0, 1.0], 3).is_none());
    assert!(fit_i0(&[0.1, 0.2], &[1.0, 2.0], 3).is_none());
    assert!(fit_i0(&[0.1, 0.2, 0.3], &[1.0, 1.0, 1.0], 3).is_none());
    assert!(fit_i0(&[0.1, 0.2, 0.3], &[3.0, 2.0, 1.0], 0).is_none());
}

// ---------------------------------------------------------------------------
// I·q⁴ metrics
// ---------------------------------------------------------------------------

#[test]
fn iq4_minimum_of_sphere() {
    let spectrum = synthetic::sphere_spectrum(500, 0.5, 1.0, 20.0, 0.05, 0.0);
    let m = iq4_metrics(&spectrum).unwrap();
    let q_expected = 4.493_409_457_909_064 / 20.0;
    assert!(
        ((m.q_at_iqqqq_min1 - q_expected) / q_expected).abs() < 0.05,
        "q at I*q^4 minimum = {}",
        m.q_at_iqqqq_min1
    );
    assert!(m.piqqqq_qwidth > 0.0);
    assert!(m.pi_qwidth > 0.0);
    assert!(m.iqqqq_min1.is_finite());
}

#[test]
fn iq4_without_extrema_is_an_error() {
    let spectrum = synthetic::guinier_porod_spectrum(200, 100.0, 20.0, 3.0, 0.0);
    let err = iq4_metrics(&spectrum).unwrap_err();
    assert!(matches!(err, SaxsError::Profile(_)), "got {err}");
}

#[test]
fn iq4_short_spectrum_is_an_error() {
    let q = linspace(0.01, 0.1, 5);
    let i: Vec<f64> = q.iter().map(|q| polyval(&[1.0, -1.0], *q)).collect();
    let spectrum = Spectrum::new(q, i).unwrap();
    assert!(iq4_metrics(&spectrum).is_err());
}
