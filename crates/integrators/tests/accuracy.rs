//! Local truncation error of the integration rules on a harmonic oscillator.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use stride_core::{ActionModel, DifferentialActionModel};
use stride_integrators::{EulerModel, IntegratedActionData, IntegratorConfig, Rk2Model};
use stride_models::LqrModel;

/// `q̈ = −q`, started at `q = 1, v = 0`.
fn oscillator() -> Arc<dyn DifferentialActionModel> {
    let model = LqrModel::new(
        DMatrix::from_element(1, 1, -1.0),
        DMatrix::zeros(1, 1),
        DMatrix::zeros(1, 1),
        DVector::zeros(1),
    )
    .expect("oscillator should be well formed");
    Arc::new(model)
}

fn one_step_error(model: &dyn ActionModel<Data = IntegratedActionData>, dt: f64) -> f64 {
    let mut data = model.create_data();
    let x = DVector::from_vec(vec![1.0, 0.0]);
    model
        .calc(&mut data, &x, &DVector::zeros(1))
        .expect("calc should succeed");

    let exact = DVector::from_vec(vec![dt.cos(), -dt.sin()]);
    (&data.xnext - exact).norm()
}

fn error_ratio<M, F>(build: F) -> f64
where
    M: ActionModel<Data = IntegratedActionData>,
    F: Fn(IntegratorConfig) -> M,
{
    let dt = 0.05;
    let coarse = build(IntegratorConfig::default().with_dt(dt));
    let fine = build(IntegratorConfig::default().with_dt(dt / 2.0));
    one_step_error(&coarse, dt) / one_step_error(&fine, dt / 2.0)
}

#[test]
fn euler_local_error_is_second_order() {
    let ratio = error_ratio(|config| {
        EulerModel::new(oscillator(), None, config).expect("should build")
    });
    assert!((3.5..4.5).contains(&ratio), "ratio = {ratio}");
}

#[test]
fn midpoint_local_error_is_third_order() {
    let ratio = error_ratio(|config| {
        Rk2Model::new(oscillator(), None, config).expect("should build")
    });
    assert!((7.0..9.0).contains(&ratio), "ratio = {ratio}");
}
