use saxs_fitting::definitions::{param_table, Bound, ParamName, ParamRole, Population};
use saxs_fitting::error::SaxsError;
use saxs_fitting::params::{
    default_bounds, default_fixed, default_params, update_params, Entry, FixedFlags, Parameters,
    Populations,
};

fn gp_sphere() -> Populations {
    Populations::new()
        .with(Population::GuinierPorod, 1)
        .with(Population::SphericalNormal, 2)
}

// ---------------------------------------------------------------------------
// Parameter table
// ---------------------------------------------------------------------------

#[test]
fn table_rows_match_names() {
    let table = param_table();
    assert_eq!(table.len(), ParamName::ALL.len());
    for (row, name) in table.iter().zip(ParamName::ALL) {
        assert_eq!(row.name, name, "table row out of declaration order");
        assert!(
            row.bound.contains(row.default),
            "default of {} outside its bounds",
            row.key
        );
    }
}

#[test]
fn roles_and_globals() {
    assert!(ParamName::I0Floor.is_global());
    assert_eq!(ParamName::I0Sphere.role(), ParamRole::Amplitude);
    assert_eq!(ParamName::R0Sphere.role(), ParamRole::Structural);
    assert_eq!(
        ParamName::RgGp.population(),
        Some(Population::GuinierPorod)
    );
    assert_eq!(ParamName::SigmaSphere.key(), "sigma_sphere");
}

// ---------------------------------------------------------------------------
// Defaults and shape
// ---------------------------------------------------------------------------

#[test]
fn defaults_have_full_shape() {
    let pops = gp_sphere();
    let params = default_params(&pops);
    assert!(params.validate(&pops).is_ok());
    assert_eq!(params.values(ParamName::I0Floor), &[0.0]);
    assert_eq!(params.values(ParamName::GGp).len(), 1);
    assert_eq!(params.values(ParamName::R0Sphere), &[20.0, 20.0]);
    assert!(!params.contains(ParamName::QPkcenter));

    let fixed = default_fixed(&pops);
    assert!(fixed.values(ParamName::SigmaSphere).iter().all(|f| !f));

    let bounds = default_bounds(&pops);
    assert_eq!(bounds.values(ParamName::DGp), &[Bound::new(0.0, 4.0)]);
}

#[test]
fn validate_reports_missing_parameter() {
    let pops = gp_sphere();
    let mut params = default_params(&pops);
    params.remove(ParamName::RgGp);
    assert_eq!(
        params.validate(&pops),
        Err(SaxsError::MissingParameter(ParamName::RgGp))
    );
}

#[test]
fn validate_reports_shape_mismatch() {
    let pops = gp_sphere();
    let mut params = default_params(&pops);
    params.set_list(ParamName::R0Sphere, vec![20.0]);
    match params.validate(&pops) {
        Err(SaxsError::ShapeMismatch {
            name,
            expected,
            actual,
        }) => {
            assert_eq!(name, ParamName::R0Sphere);
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("expected shape mismatch, got {other:?}"),
    }
}

#[test]
fn restrict_drops_absent_populations() {
    let superset = gp_sphere();
    let mut params = default_params(&superset);
    let sphere_only = Populations::new().with(Population::SphericalNormal, 2);
    params.restrict_to(&sphere_only);
    assert!(!params.contains(ParamName::GGp));
    assert!(params.contains(ParamName::I0Floor));
    assert!(params.validate(&sphere_only).is_ok());
}

// ---------------------------------------------------------------------------
// Positional update
// ---------------------------------------------------------------------------

#[test]
fn update_is_positional() {
    let mut old = Parameters::new();
    old.set_list(ParamName::R0Sphere, vec![1.0, 2.0]);
    let mut new = Parameters::new();
    new.set_list(ParamName::R0Sphere, vec![5.0]);

    let merged = update_params(&old, &new);
    assert_eq!(merged.values(ParamName::R0Sphere), &[5.0, 2.0]);
    assert_eq!(old.values(ParamName::R0Sphere), &[1.0, 2.0], "old untouched");
}

#[test]
fn update_ignores_unknown_keys_and_extra_values() {
    let mut old = Parameters::new();
    old.set_scalar(ParamName::I0Floor, 0.1);
    let mut new = Parameters::new();
    new.set_list(ParamName::I0Floor, vec![0.2, 0.3])
        .set_scalar(ParamName::GGp, 7.0);

    let merged = update_params(&old, &new);
    assert_eq!(merged.values(ParamName::I0Floor), &[0.2]);
    assert!(!merged.contains(ParamName::GGp));
}

#[test]
fn update_fixed_flags() {
    let pops = gp_sphere();
    let mut partial = FixedFlags::new();
    partial.set_list(ParamName::SigmaSphere, vec![true]);
    let merged = update_params(&default_fixed(&pops), &partial);
    assert_eq!(merged.values(ParamName::SigmaSphere), &[true, false]);
}

#[test]
fn scalar_equals_single_element_list() {
    assert_eq!(Entry::Scalar(3.0), Entry::List(vec![3.0]));
    assert_ne!(Entry::Scalar(3.0), Entry::List(vec![3.0, 3.0]));
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn records_use_parameter_keys() {
    let pops = Populations::new().with(Population::SphericalNormal, 1);
    let params = default_params(&pops);
    let json = serde_json::to_value(&params).unwrap();
    assert_eq!(json["I0_floor"], serde_json::json!(0.0));
    assert_eq!(json["r0_sphere"], serde_json::json!([20.0]));

    let pops_json = serde_json::to_value(&pops).unwrap();
    assert_eq!(pops_json["spherical_normal"], serde_json::json!(1));
}

#[test]
fn records_deserialize_from_json() {
    let params: Parameters = serde_json::from_str(
        r#"{"I0_floor": 0.01, "I0_sphere": [100.0], "r0_sphere": [25.0], "sigma_sphere": [0.15]}"#,
    )
    .unwrap();
    let pops: Populations = serde_json::from_str(r#"{"spherical_normal": 1}"#).unwrap();
    assert!(params.validate(&pops).is_ok());
    assert_eq!(params.value(ParamName::R0Sphere, 0), Some(&25.0));
}
