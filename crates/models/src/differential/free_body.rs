use std::{fmt, sync::Arc};

use nalgebra::{DVector, Matrix3, Vector3};
use stride_core::{
    DifferentialActionData, DifferentialActionModel, Error, StateManifold, ensure_dimension,
};

use crate::OrientationState;

/// A torque-driven rigid body rotating freely about its center of mass.
///
/// The state lives on [`OrientationState`] and the control is a body-frame
/// torque `τ`. Euler's equations give the angular acceleration
///
/// ```text
/// ω̇ = I⁻¹ (τ − ω × Iω)
/// ```
///
/// for a diagonal inertia `I`. The cost penalizes tilt of the body `z` axis
/// away from the world `z` axis, angular velocity, and torque:
///
/// ```text
/// ℓ = w_tilt (1 − e₃ᵀ R e₃) + ½ w_v |ω|² + ½ w_u |τ|²
/// ```
///
/// The residual is `[ω, τ]`. Cost Hessians are exact in the tangent chart of
/// the state.
#[derive(Debug, Clone)]
pub struct FreeBodyModel {
    state: Arc<dyn StateManifold>,
    inertia: Vector3<f64>,
    w_tilt: f64,
    w_v: f64,
    w_u: f64,
    u_lb: DVector<f64>,
    u_ub: DVector<f64>,
}

impl FreeBodyModel {
    /// Creates a body with the given principal moments of inertia.
    ///
    /// Moments must be positive. The cost weights default to
    /// `w_tilt = 1`, `w_v = 0.1`, `w_u = 0.01`, and torque is unbounded.
    #[must_use]
    pub fn new(inertia: Vector3<f64>) -> Self {
        Self {
            state: Arc::new(OrientationState::new()),
            inertia,
            w_tilt: 1.0,
            w_v: 0.1,
            w_u: 0.01,
            u_lb: DVector::from_element(3, f64::NEG_INFINITY),
            u_ub: DVector::from_element(3, f64::INFINITY),
        }
    }

    /// Replaces the tilt, velocity, and torque weights.
    #[must_use]
    pub fn with_weights(mut self, w_tilt: f64, w_v: f64, w_u: f64) -> Self {
        self.w_tilt = w_tilt;
        self.w_v = w_v;
        self.w_u = w_u;
        self
    }

    /// Limits each torque component to `[-limit, limit]`.
    #[must_use]
    pub fn with_torque_limit(mut self, limit: f64) -> Self {
        self.u_lb.fill(-limit);
        self.u_ub.fill(limit);
        self
    }

    /// Returns the principal moments of inertia.
    #[must_use]
    pub fn inertia(&self) -> &Vector3<f64> {
        &self.inertia
    }

    fn split(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(Vector3<f64>, Vector3<f64>), Error> {
        ensure_dimension("x", x, self.state.nx())?;
        ensure_dimension("u", u, 3)?;
        Ok((
            OrientationState::angular_velocity(x),
            Vector3::new(u[0], u[1], u[2]),
        ))
    }

    /// World `z` axis expressed in the body frame.
    fn up_in_body(x: &DVector<f64>) -> Vector3<f64> {
        OrientationState::orientation(x).inverse_transform_vector(&Vector3::z())
    }
}

impl DifferentialActionModel for FreeBodyModel {
    fn state(&self) -> &Arc<dyn StateManifold> {
        &self.state
    }

    fn nu(&self) -> usize {
        3
    }

    fn nr(&self) -> usize {
        6
    }

    fn u_lb(&self) -> &DVector<f64> {
        &self.u_lb
    }

    fn u_ub(&self) -> &DVector<f64> {
        &self.u_ub
    }

    fn calc(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error> {
        let (omega, tau) = self.split(x, u)?;

        let momentum = self.inertia.component_mul(&omega);
        let alpha = (tau - omega.cross(&momentum)).component_div(&self.inertia);
        data.xout.copy_from(&alpha);

        let up = Self::up_in_body(x);
        data.cost = self.w_tilt * (1.0 - up.z)
            + 0.5 * self.w_v * omega.norm_squared()
            + 0.5 * self.w_u * tau.norm_squared();

        data.r.fixed_rows_mut::<3>(0).copy_from(&omega);
        data.r.fixed_rows_mut::<3>(3).copy_from(&tau);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error> {
        let (omega, tau) = self.split(x, u)?;
        let inertia = Matrix3::from_diagonal(&self.inertia);
        let inertia_inv = Matrix3::from_diagonal(&self.inertia.map(f64::recip));

        // Orientation does not enter the dynamics.
        let dalpha_domega =
            -inertia_inv * (omega.cross_matrix() * inertia - (inertia * omega).cross_matrix());
        data.fx.fill(0.0);
        data.fx.fixed_view_mut::<3, 3>(0, 3).copy_from(&dalpha_domega);
        data.fu.copy_from(&inertia_inv);

        let up = Self::up_in_body(x);
        let e3 = Vector3::z();
        let tilt_grad = -self.w_tilt * e3.cross(&up);
        let tilt_hess = -self.w_tilt
            * ((up * e3.transpose() + e3 * up.transpose()) * 0.5 - Matrix3::identity() * up.z);

        data.lx.fixed_rows_mut::<3>(0).copy_from(&tilt_grad);
        data.lx.fixed_rows_mut::<3>(3).copy_from(&(omega * self.w_v));
        data.lu.copy_from(&(tau * self.w_u));

        data.lxx.fill(0.0);
        data.lxx.fixed_view_mut::<3, 3>(0, 0).copy_from(&tilt_hess);
        data.lxx
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&(Matrix3::identity() * self.w_v));
        data.lxu.fill(0.0);
        data.luu.copy_from(&(Matrix3::identity() * self.w_u));
        Ok(())
    }
}

impl fmt::Display for FreeBodyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FreeBodyModel {{inertia=[{}, {}, {}]}}",
            self.inertia.x, self.inertia.y, self.inertia.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, UnitQuaternion};

    const EPS: f64 = 1e-5;

    fn model() -> FreeBodyModel {
        FreeBodyModel::new(Vector3::new(0.8, 1.3, 2.1)).with_weights(2.0, 0.3, 0.05)
    }

    fn sample() -> (DVector<f64>, DVector<f64>) {
        let q = UnitQuaternion::from_euler_angles(0.4, -0.6, 0.9);
        let x = OrientationState::compose(&q, &Vector3::new(0.7, -0.4, 1.1));
        let u = DVector::from_vec(vec![0.2, -0.5, 0.3]);
        (x, u)
    }

    fn retract(x: &DVector<f64>, dx: &DVector<f64>) -> DVector<f64> {
        let state = OrientationState::new();
        let mut out = state.zero();
        state.integrate(x, dx, &mut out);
        out
    }

    fn tangent(i: usize, scale: f64) -> DVector<f64> {
        let mut dx = DVector::zeros(6);
        dx[i] = scale;
        dx
    }

    #[test]
    fn symmetric_body_spins_without_acceleration() {
        let model = FreeBodyModel::new(Vector3::new(1.5, 1.5, 1.5));
        let mut data = model.create_data();
        let (x, _) = sample();

        model
            .calc(&mut data, &x, &DVector::zeros(3))
            .expect("calc should succeed");

        assert_relative_eq!(data.xout, DVector::zeros(3), epsilon = 1e-15);
    }

    #[test]
    fn upright_body_at_rest_has_zero_cost() {
        let model = model();
        let mut data = model.create_data();
        let x = OrientationState.zero();

        model
            .calc(&mut data, &x, &DVector::zeros(3))
            .expect("calc should succeed");

        assert_relative_eq!(data.cost, 0.0);
    }

    #[test]
    fn dynamics_jacobians_match_finite_differences() {
        let model = model();
        let mut data = model.create_data();
        let (x, u) = sample();

        model.calc_diff(&mut data, &x, &u).expect("calc_diff should succeed");
        let (fx, fu) = (data.fx.clone(), data.fu.clone());

        let mut accel = |x: &DVector<f64>, u: &DVector<f64>| {
            model.calc(&mut data, x, u).expect("calc should succeed");
            data.xout.clone()
        };

        for i in 0..6 {
            let fd = (accel(&retract(&x, &tangent(i, EPS)), &u)
                - accel(&retract(&x, &tangent(i, -EPS)), &u))
                / (2.0 * EPS);
            assert_relative_eq!(fx.column(i).into_owned(), fd, epsilon = 1e-8);
        }
        for i in 0..3 {
            let mut up = u.clone();
            let mut um = u.clone();
            up[i] += EPS;
            um[i] -= EPS;
            let fd = (accel(&x, &up) - accel(&x, &um)) / (2.0 * EPS);
            assert_relative_eq!(fu.column(i).into_owned(), fd, epsilon = 1e-8);
        }
    }

    #[test]
    fn cost_derivatives_match_finite_differences() {
        let model = model();
        let mut data = model.create_data();
        let (x, u) = sample();

        model.calc_diff(&mut data, &x, &u).expect("calc_diff should succeed");
        let (lx, lxx) = (data.lx.clone(), data.lxx.clone());

        let mut cost = |dx: DVector<f64>| {
            model
                .calc(&mut data, &retract(&x, &dx), &u)
                .expect("calc should succeed");
            data.cost
        };

        let h = 1e-4;
        let mut fd_hess = DMatrix::zeros(6, 6);
        for i in 0..6 {
            let fd = (cost(tangent(i, EPS)) - cost(tangent(i, -EPS))) / (2.0 * EPS);
            assert_relative_eq!(lx[i], fd, epsilon = 1e-8);

            for k in 0..6 {
                let (ei, ek) = (tangent(i, h), tangent(k, h));
                fd_hess[(i, k)] = (cost(&ei + &ek) - cost(&ei - &ek) - cost(&ek - &ei)
                    + cost(-(&ei + &ek)))
                    / (4.0 * h * h);
            }
        }
        assert_relative_eq!(lxx, fd_hess, epsilon = 1e-5);
    }

    #[test]
    fn torque_limit_is_symmetric() {
        let model = model().with_torque_limit(0.5);

        assert_eq!(model.u_lb(), &DVector::from_element(3, -0.5));
        assert_eq!(model.u_ub(), &DVector::from_element(3, 0.5));
    }

    #[test]
    fn quasi_static_torque_is_zero() {
        let model = model();
        let mut data = model.create_data();
        let (x, _) = sample();

        let u = model
            .quasi_static(&mut data, &x, 5, 1e-12)
            .expect("quasi-static solve should succeed");

        assert_relative_eq!(u, DVector::zeros(3), epsilon = 1e-14);
    }

    #[test]
    fn display_lists_inertia() {
        assert_eq!(model().to_string(), "FreeBodyModel {inertia=[0.8, 1.3, 2.1]}");
    }
}
