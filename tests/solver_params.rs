//! Solver parameter parsing through the public configuration API

use bgremove_tiles::{
    params::{SHIFTS_FIELD, EPSILON_FIELD},
    preconditioner::{DEFAULT_DISCARD_THRESHOLD, DEFAULT_SHIFTS},
    BgRemovalError, Locale, PreconditionerFactory, RawSolverParams, RemovalConfig,
};

#[test]
fn empty_form_yields_defaults() {
    let config = RemovalConfig::builder()
        .raw_solver_params(&RawSolverParams::default())
        .unwrap()
        .build()
        .unwrap();

    let preconditioner = config.preconditioner();
    assert_eq!(preconditioner.discard_threshold(), DEFAULT_DISCARD_THRESHOLD);
    assert_eq!(preconditioner.shifts(), &DEFAULT_SHIFTS);
    assert_eq!(config.matting.epsilon, 1e-7);
}

#[test]
fn parsed_values_reach_the_preconditioner_in_order() {
    let raw = RawSolverParams {
        discard_threshold: Some("5e-5".to_string()),
        shifts: Some(" 1e-2 , 0 ,3".to_string()),
        epsilon: Some("1E-6".to_string()),
    };
    let config = RemovalConfig::builder()
        .raw_solver_params(&raw)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(config.preconditioner().shifts(), &[1e-2, 0.0, 3.0]);
    assert_eq!(config.preconditioner().discard_threshold(), 5e-5);
    assert_eq!(config.matting.epsilon, 1e-6);
}

#[test]
fn invalid_fields_name_themselves() {
    let raw = RawSolverParams {
        shifts: Some("1,,2".to_string()),
        ..RawSolverParams::default()
    };
    let err = raw.parse(Locale::En).unwrap_err();
    assert!(matches!(err, BgRemovalError::Parse { .. }));
    assert_eq!(err.field(), Some(SHIFTS_FIELD));

    let raw = RawSolverParams {
        epsilon: Some("tiny".to_string()),
        ..RawSolverParams::default()
    };
    let err = raw.parse(Locale::ZhCn).unwrap_err();
    assert_eq!(err.field(), Some(EPSILON_FIELD));
    assert!(err.to_string().starts_with("Epsilon "));
}

#[test]
fn factory_copies_its_inputs() {
    let mut shifts = vec![0.0, 1.0];
    let preconditioner = PreconditionerFactory::ichol(1e-3, &shifts);
    shifts.push(2.0);
    assert_eq!(preconditioner.shifts(), &[0.0, 1.0]);
}
