//! Explicit midpoint (second-order Runge–Kutta) integration.
//!
//! One step evaluates the differential model twice:
//!
//! ```text
//! k₀    = [v(x), a(x, u(0))]
//! y₁    = integrate(x, ½·dt·k₀)
//! k₁    = [v(y₁), a(y₁, u(½))]
//! dx    = dt·k₁
//! xnext = integrate(x, dx)
//! cost  = dt·ℓ(y₁, u(½))
//! ```
//!
//! First derivatives are exact. Cost Hessians keep only the first-order
//! sensitivities of `y₁` (Gauss–Newton), which is exact when the dynamics
//! are linear on a flat state space.

use std::{fmt, sync::Arc};

use nalgebra::DVector;
use stride_core::{
    ActionModel, Argument, Composition, ControlParametrization, DifferentialActionModel, Error,
    StateManifold,
};

use crate::{IntegratedActionData, IntegratorBase, IntegratorConfig, Stage};

const STAGES: usize = 2;

/// Normalized time of the second stage.
const MIDPOINT: f64 = 0.5;

/// A discrete-time action model built by one explicit midpoint step.
pub struct Rk2Model {
    base: IntegratorBase,
}

impl Rk2Model {
    /// Creates a midpoint integrator around `differential`.
    ///
    /// See [`IntegratorBase::new`] for how `control` and `config` are used.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if the control dimension of `control`
    /// differs from the differential model's.
    pub fn new(
        differential: Arc<dyn DifferentialActionModel>,
        control: Option<Arc<dyn ControlParametrization>>,
        config: IntegratorConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            base: IntegratorBase::new(differential, control, config)?,
        })
    }

    /// Returns the shared integrator configuration.
    #[must_use]
    pub fn base(&self) -> &IntegratorBase {
        &self.base
    }

    /// Returns the shared integrator configuration for modification.
    pub fn base_mut(&mut self) -> &mut IntegratorBase {
        &mut self.base
    }
}

/// Writes the stage tangent `k = [v(y), a]`.
fn stage_tangent(stage: &mut Stage, nv: usize) {
    let nx = stage.y.len();
    stage.k.rows_mut(0, nv).copy_from(&stage.y.rows(nx - nv, nv));
    stage.k.rows_mut(nv, nv).copy_from(&stage.differential.xout);
}

/// Writes `∂k/∂y = [[0, I], [∂a/∂y]]`.
fn stage_tangent_jacobian(stage: &mut Stage, nv: usize) {
    stage.dk_dy.fill(0.0);
    for i in 0..nv {
        stage.dk_dy[(i, nv + i)] = 1.0;
    }
    stage.dk_dy.rows_mut(nv, nv).copy_from(&stage.differential.fx);
}

impl ActionModel for Rk2Model {
    type Data = IntegratedActionData;

    fn state(&self) -> &Arc<dyn StateManifold> {
        self.base.state()
    }

    fn nu(&self) -> usize {
        self.base.nu()
    }

    fn nr(&self) -> usize {
        self.base.nr()
    }

    fn u_lb(&self) -> &DVector<f64> {
        self.base.u_lb()
    }

    fn u_ub(&self) -> &DVector<f64> {
        self.base.u_ub()
    }

    fn create_data(&self) -> IntegratedActionData {
        self.base.create_data(STAGES)
    }

    fn check_data(&self, data: &IntegratedActionData) -> bool {
        self.base.check_data(data, STAGES)
    }

    fn calc(
        &self,
        data: &mut IntegratedActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error> {
        self.base.ensure_inputs(data, x, u, STAGES)?;
        let state = self.base.state();
        let control = self.base.control();
        let differential = self.base.differential();
        let nv = state.nv();

        let (first, rest) = data.stages.split_at_mut(1);
        let (s0, s1) = (&mut first[0], &mut rest[0]);

        s0.y.copy_from(x);
        s0.dy.fill(0.0);
        control.value(0.0, u, &mut s0.u_diff);
        differential.calc(&mut s0.differential, x, &s0.u_diff)?;

        if self.base.is_integrating() {
            let dt = self.base.dt();
            stage_tangent(s0, nv);

            s1.dy.copy_from(&(&s0.k * (MIDPOINT * dt)));
            state.integrate(x, &s1.dy, &mut s1.y);
            control.value(MIDPOINT, u, &mut s1.u_diff);
            differential.calc(&mut s1.differential, &s1.y, &s1.u_diff)?;
            stage_tangent(s1, nv);

            data.dx.copy_from(&(&s1.k * dt));
            state.integrate(x, &data.dx, &mut data.xnext);
            data.cost = dt * s1.differential.cost;
        } else {
            self.base.passthrough(data, x);
        }

        self.base.copy_residual(data);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut IntegratedActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error> {
        self.base.ensure_inputs(data, x, u, STAGES)?;
        let state = self.base.state();
        let control = self.base.control();
        let differential = self.base.differential();
        let nv = state.nv();

        let (first, rest) = data.stages.split_at_mut(1);
        let (s0, s1) = (&mut first[0], &mut rest[0]);

        control.value(0.0, u, &mut s0.u_diff);
        differential.calc_diff(&mut s0.differential, x, &s0.u_diff)?;

        if !self.base.is_integrating() {
            self.base.passthrough_dynamics(data, x);
            self.base.first_stage_cost_derivatives(data, u);
            return Ok(());
        }

        let dt = self.base.dt();
        let half_dt = MIDPOINT * dt;

        // First stage: y₀ = x.
        stage_tangent_jacobian(s0, nv);
        s0.dk_dx.copy_from(&s0.dk_dy);
        control.multiply_by_d_value(0.0, u, &s0.differential.fu, &mut s0.da_du);
        s0.dk_du.fill(0.0);
        s0.dk_du.rows_mut(nv, nv).copy_from(&s0.da_du);

        // Sensitivities of the midpoint state.
        s1.dy_dx.copy_from(&(&s0.dk_dx * half_dt));
        state.jintegrate_transport(x, &s1.dy, &mut s1.dy_dx, Argument::Second);
        state.jintegrate(
            x,
            &s1.dy,
            &mut s1.dy_dx,
            Argument::First,
            Composition::Accumulate,
        );
        s1.dy_du.copy_from(&(&s0.dk_du * half_dt));
        state.jintegrate_transport(x, &s1.dy, &mut s1.dy_du, Argument::Second);

        // Second stage, chained through y₁.
        control.value(MIDPOINT, u, &mut s1.u_diff);
        differential.calc_diff(&mut s1.differential, &s1.y, &s1.u_diff)?;
        control.d_value(MIDPOINT, u, &mut s1.du_dp);

        stage_tangent_jacobian(s1, nv);
        s1.dk_dx.copy_from(&(&s1.dk_dy * &s1.dy_dx));
        control.multiply_by_d_value(MIDPOINT, u, &s1.differential.fu, &mut s1.da_du);
        s1.dk_du.copy_from(&(&s1.dk_dy * &s1.dy_du));
        let mut da_block = s1.dk_du.rows_mut(nv, nv);
        da_block += &s1.da_du;

        data.fx.copy_from(&(&s1.dk_dx * dt));
        data.fu.copy_from(&(&s1.dk_du * dt));
        state.jintegrate_transport(x, &data.dx, &mut data.fx, Argument::Second);
        state.jintegrate_transport(x, &data.dx, &mut data.fu, Argument::Second);
        state.jintegrate(
            x,
            &data.dx,
            &mut data.fx,
            Argument::First,
            Composition::Accumulate,
        );

        // Cost of the second stage, pulled back to (x, p).
        let d1 = &s1.differential;
        s1.dl_dx.copy_from(&s1.dy_dx.tr_mul(&d1.lx));
        control.transpose_gradient(MIDPOINT, u, &d1.lu, &mut s1.dl_du);
        s1.dl_du += s1.dy_du.tr_mul(&d1.lx);

        data.lx.copy_from(&(&s1.dl_dx * dt));
        data.lu.copy_from(&(&s1.dl_du * dt));

        let lxx_dy_dx = &d1.lxx * &s1.dy_dx;
        let lxx_dy_du = &d1.lxx * &s1.dy_du;
        data.lxx.copy_from(&(s1.dy_dx.tr_mul(&lxx_dy_dx) * dt));

        // ℓxu·J and Jᵀ·ℓuu·J, built in the output buffers.
        control.multiply_by_d_value(MIDPOINT, u, &d1.lxu, &mut data.lxu);
        let luu_j = &d1.luu * &s1.du_dp;
        control.multiply_d_value_transpose_by(MIDPOINT, u, &luu_j, &mut data.luu);

        let s = data.lxu.tr_mul(&s1.dy_du);
        let lxu = s1.dy_dx.tr_mul(&data.lxu) + s1.dy_dx.tr_mul(&lxx_dy_du);
        let luu = &data.luu + s.transpose() + &s + s1.dy_du.tr_mul(&lxx_dy_du);
        data.lxu.copy_from(&(lxu * dt));
        data.luu.copy_from(&(luu * dt));
        Ok(())
    }

    fn quasi_static(
        &self,
        data: &mut IntegratedActionData,
        x: &DVector<f64>,
        maxiter: usize,
        tol: f64,
    ) -> Result<DVector<f64>, Error> {
        self.base.quasi_static(data, x, maxiter, tol, STAGES)
    }
}

impl fmt::Display for Rk2Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt_named(f, "IntegratedActionModelRK2")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use stride_models::LqrModel;

    use crate::{EulerModel, PolyOne};

    fn double_integrator() -> Arc<LqrModel> {
        let model = LqrModel::new(
            DMatrix::zeros(1, 1),
            DMatrix::zeros(1, 1),
            DMatrix::identity(1, 1),
            DVector::zeros(1),
        )
        .expect("double integrator should be well formed");
        Arc::new(model)
    }

    fn rk2(dt: f64) -> Rk2Model {
        Rk2Model::new(
            double_integrator(),
            None,
            IntegratorConfig::default().with_dt(dt),
        )
        .expect("should build")
    }

    #[test]
    fn constant_acceleration_is_integrated_exactly() {
        let model = rk2(0.1);
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![3.0]);

        model.calc(&mut data, &x, &u).expect("calc should succeed");

        // q + v·dt + ½·a·dt², v + a·dt
        let expected = DVector::from_vec(vec![1.0 + 0.2 + 0.015, 2.0 + 0.3]);
        assert_relative_eq!(data.xnext, expected, epsilon = 1e-14);
        assert_relative_eq!(data.stages[1].y, DVector::from_vec(vec![1.1, 2.15]), epsilon = 1e-14);
    }

    #[test]
    fn cost_and_residual_come_from_different_stages() {
        let model = rk2(0.1);
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![3.0]);

        model.calc(&mut data, &x, &u).expect("calc should succeed");

        let midpoint_cost = 0.5 * (1.1 * 1.1 + 2.15 * 2.15 + 9.0);
        assert_relative_eq!(data.cost, 0.1 * midpoint_cost, epsilon = 1e-14);
        assert_eq!(data.r, DVector::from_vec(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn double_integrator_derivatives() {
        let model = rk2(0.1);
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![3.0]);

        model.calc(&mut data, &x, &u).expect("calc should succeed");
        model.calc_diff(&mut data, &x, &u).expect("calc_diff should succeed");

        let fx = DMatrix::from_row_slice(2, 2, &[1.0, 0.1, 0.0, 1.0]);
        let fu = DMatrix::from_row_slice(2, 1, &[0.005, 0.1]);
        assert_relative_eq!(data.fx, fx, epsilon = 1e-15);
        assert_relative_eq!(data.fu, fu, epsilon = 1e-15);

        // y₁ = [q + ½dt·v, v + ½dt·u] with an identity cost on (y₁, u).
        let dy_dx = DMatrix::from_row_slice(2, 2, &[1.0, 0.05, 0.0, 1.0]);
        let dy_du = DMatrix::from_row_slice(2, 1, &[0.0, 0.05]);
        let lxx = dy_dx.tr_mul(&dy_dx) * 0.1;
        let luu = (DMatrix::identity(1, 1) + dy_du.tr_mul(&dy_du)) * 0.1;
        assert_relative_eq!(data.lxx, lxx, epsilon = 1e-15);
        assert_relative_eq!(data.lxu, dy_dx.tr_mul(&dy_du) * 0.1, epsilon = 1e-15);
        assert_relative_eq!(data.luu, luu, epsilon = 1e-15);
    }

    #[test]
    fn passthrough_matches_euler_passthrough() {
        let midpoint = rk2(0.0);
        let euler = EulerModel::new(
            double_integrator(),
            None,
            IntegratorConfig::default().with_dt(0.0),
        )
        .expect("should build");
        let x = DVector::from_vec(vec![0.4, -1.7]);
        let u = DVector::from_vec(vec![2.5]);

        let mut a = midpoint.create_data();
        let mut b = euler.create_data();
        midpoint.calc(&mut a, &x, &u).expect("calc should succeed");
        euler.calc(&mut b, &x, &u).expect("calc should succeed");
        midpoint.calc_diff(&mut a, &x, &u).expect("calc_diff should succeed");
        euler.calc_diff(&mut b, &x, &u).expect("calc_diff should succeed");

        assert_eq!(a.xnext, x);
        assert!(a.fu.iter().all(|&v| v == 0.0));
        assert_eq!(a.xnext, b.xnext);
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.fx, b.fx);
        assert_eq!(a.lx, b.lx);
        assert_eq!(a.luu, b.luu);
    }

    #[test]
    fn polynomial_control_is_sampled_at_both_stages() {
        let model = Rk2Model::new(
            double_integrator(),
            Some(Arc::new(PolyOne::new(1))),
            IntegratorConfig::default().with_dt(0.2),
        )
        .expect("should build");
        let mut data = model.create_data();
        let x = DVector::from_vec(vec![0.0, 0.0]);
        let p = DVector::from_vec(vec![2.0, -1.0]);

        model.calc(&mut data, &x, &p).expect("calc should succeed");
        model.calc_diff(&mut data, &x, &p).expect("calc_diff should succeed");

        assert_eq!(data.stages[0].u_diff, DVector::from_vec(vec![2.0]));
        assert_eq!(data.stages[1].u_diff, DVector::from_vec(vec![-1.0]));

        // v₁ = ½·dt·p0 and a₁ = p1, so xnext = [dt·v₁, dt·p1].
        assert_relative_eq!(
            data.xnext,
            DVector::from_vec(vec![0.2 * 0.2, -0.2]),
            epsilon = 1e-15
        );
        assert_relative_eq!(
            data.fu,
            DMatrix::from_row_slice(2, 2, &[0.02, 0.0, 0.0, 0.2]),
            epsilon = 1e-15
        );
    }

    #[test]
    fn data_sized_for_euler_is_rejected() {
        let midpoint = rk2(0.1);
        let euler = EulerModel::new(double_integrator(), None, IntegratorConfig::default())
            .expect("should build");
        let mut foreign = euler.create_data();

        assert!(midpoint.check_data(&midpoint.create_data()));
        assert!(!midpoint.check_data(&foreign));
        assert_eq!(
            midpoint
                .calc_diff(&mut foreign, &DVector::zeros(2), &DVector::zeros(1))
                .unwrap_err(),
            Error::IncompatibleData
        );
    }

    #[test]
    fn setters_switch_modes() {
        let mut model = rk2(0.1);
        let x = DVector::from_vec(vec![1.0, 2.0]);
        let u = DVector::from_vec(vec![3.0]);

        assert_eq!(model.base_mut().set_dt(-1.0), Err(Error::NegativeTimeStep(-1.0)));
        assert_eq!(model.base().dt(), 0.1);

        model.base_mut().set_dt(0.0).expect("zero step should be accepted");
        let mut data = model.create_data();
        model.calc(&mut data, &x, &u).expect("calc should succeed");
        assert_eq!(data.xnext, x);
    }

    #[test]
    fn display_names_the_rule() {
        assert_eq!(
            rk2(0.25).to_string(),
            "IntegratedActionModelRK2 {dt=0.25, LqrModel {nq=1, nu=1}}"
        );
    }
}
