use approx::assert_relative_eq;
use saxs_fitting::common::{
    compute_chi2, compute_pearson, compute_rsquared, finite_or_none, linspace, mean, polyfit,
    polyval, solve_linear, standardize, std_dev, Spectrum,
};
use saxs_fitting::error::SaxsError;

// ---------------------------------------------------------------------------
// Spectrum
// ---------------------------------------------------------------------------

#[test]
fn spectrum_rejects_length_mismatch() {
    let err = Spectrum::new(vec![0.1, 0.2], vec![1.0]).unwrap_err();
    assert!(matches!(err, SaxsError::InvalidSpectrum(_)), "got {err}");
}

#[test]
fn spectrum_rejects_negative_q() {
    assert!(Spectrum::new(vec![-0.1, 0.2], vec![1.0, 1.0]).is_err());
}

#[test]
fn spectrum_deserialization_is_validated() {
    let err = serde_json::from_str::<Spectrum>(r#"{"q": [0.1, 0.2, 0.3], "intensity": [1.0]}"#);
    assert!(err.is_err(), "mismatched lengths must not deserialize");
    let err = serde_json::from_str::<Spectrum>(r#"{"q": [-0.1], "intensity": [1.0]}"#);
    assert!(err.is_err(), "negative q must not deserialize");

    let s: Spectrum =
        serde_json::from_str(r#"{"q": [0.1, 0.2], "intensity": [3.0, 2.0]}"#).unwrap();
    assert_eq!(s.len(), 2);
    let json = serde_json::to_value(&s).unwrap();
    assert_eq!(json["intensity"], serde_json::json!([3.0, 2.0]));
}

#[test]
fn spectrum_from_pairs() {
    let s = Spectrum::from_pairs(&[(0.1, 5.0), (0.2, 4.0)]).unwrap();
    assert_eq!(s.q(), &[0.1, 0.2]);
    assert_eq!(s.intensity(), &[5.0, 4.0]);
    assert_eq!(s.len(), 2);
}

#[test]
fn fit_mask_drops_bad_points_and_applies_window() {
    let s = Spectrum::new(
        vec![0.01, 0.02, 0.03, 0.04, 0.05],
        vec![1.0, 0.0, f64::INFINITY, 2.0, 3.0],
    )
    .unwrap();
    assert_eq!(s.fit_mask(None), vec![true, false, false, true, true]);
    // Window bounds are exclusive.
    assert_eq!(
        s.fit_mask(Some((0.01, 0.05))),
        vec![false, false, false, true, false]
    );
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn mean_and_population_std() {
    let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    assert_eq!(mean(&v), 5.0);
    assert_eq!(std_dev(&v), 2.0);
    assert!(mean(&[]).is_nan());
}

#[test]
fn standardize_zero_mean_unit_std() {
    let (s, m, sd) = standardize(&[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(m, 2.5);
    assert_relative_eq!(mean(&s), 0.0, epsilon = 1e-15);
    assert_relative_eq!(std_dev(&s), 1.0, epsilon = 1e-12);
    assert!(sd > 0.0);
}

#[test]
fn chi2_plain_and_weighted() {
    let a = [1.0, 2.0, 3.0];
    let b = [1.0, 3.0, 5.0];
    assert_eq!(compute_chi2(&a, &b, None), 5.0);
    // Weights normalized to sum 1: (0 + 1*1 + 4*3) / 4
    assert_relative_eq!(compute_chi2(&a, &b, Some(&[0.0, 1.0, 3.0])), 13.0 / 4.0);
}

#[test]
fn rsquared_and_pearson() {
    let y = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(compute_rsquared(&y, &y), 1.0);
    assert_relative_eq!(compute_pearson(&y, &[2.0, 4.0, 6.0, 8.0]), 1.0, epsilon = 1e-12);
    assert_relative_eq!(compute_pearson(&y, &[4.0, 3.0, 2.0, 1.0]), -1.0, epsilon = 1e-12);
}

#[test]
fn finite_or_none_values() {
    assert_eq!(finite_or_none(1.5), Some(1.5));
    assert_eq!(finite_or_none(f64::NAN), None);
    assert_eq!(finite_or_none(f64::INFINITY), None);
}

// ---------------------------------------------------------------------------
// Linear algebra
// ---------------------------------------------------------------------------

#[test]
fn solve_linear_needs_pivoting() {
    // Zero on the leading diagonal.
    let a = [0.0, 1.0, 1.0, 1.0];
    let x = solve_linear(&a, &[2.0, 3.0]).unwrap();
    assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
    assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
}

#[test]
fn solve_linear_singular() {
    assert!(solve_linear(&[1.0, 2.0, 2.0, 4.0], &[1.0, 2.0]).is_none());
    assert!(solve_linear(&[1.0, 2.0, 3.0], &[1.0, 2.0]).is_none());
}

#[test]
fn polyfit_recovers_cubic() {
    let x = linspace(-1.0, 1.0, 25);
    let coeffs = [0.5, -1.0, 2.0, 0.25];
    let y: Vec<f64> = x.iter().map(|x| polyval(&coeffs, *x)).collect();
    let fit = polyfit(&x, &y, 3).unwrap();
    for (got, want) in fit.iter().zip(coeffs) {
        assert_relative_eq!(*got, want, epsilon = 1e-9);
    }
}

#[test]
fn polyfit_needs_enough_points() {
    assert!(polyfit(&[0.0, 1.0], &[1.0, 2.0], 2).is_none());
}

#[test]
fn linspace_endpoints() {
    let v = linspace(0.0, 1.0, 5);
    assert_eq!(v, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
}
