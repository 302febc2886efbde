use std::{fmt::Display, sync::Arc};

use nalgebra::{DMatrix, DVector};

use crate::{Error, StateManifold, ensure_dimension};

/// Scratch data for a [`DifferentialActionModel`].
///
/// Holds the continuous-time quantities at one `(x, u)` point. All
/// derivatives are expressed in the tangent frame at `x`.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialActionData {
    /// Generalized acceleration (`nv`).
    pub xout: DVector<f64>,

    /// Instantaneous cost.
    pub cost: f64,

    /// Cost residual (`nr`).
    pub r: DVector<f64>,

    /// `∂xout/∂x` (`nv × ndx`).
    pub fx: DMatrix<f64>,

    /// `∂xout/∂u` (`nv × nu`).
    pub fu: DMatrix<f64>,

    /// Cost gradient with respect to the state (`ndx`).
    pub lx: DVector<f64>,

    /// Cost gradient with respect to the control (`nu`).
    pub lu: DVector<f64>,

    /// Cost Hessian with respect to the state (`ndx × ndx`).
    pub lxx: DMatrix<f64>,

    /// Mixed cost Hessian (`ndx × nu`).
    pub lxu: DMatrix<f64>,

    /// Cost Hessian with respect to the control (`nu × nu`).
    pub luu: DMatrix<f64>,
}

impl DifferentialActionData {
    /// Creates zero-filled data with the given dimensions.
    #[must_use]
    pub fn new(nv: usize, ndx: usize, nu: usize, nr: usize) -> Self {
        Self {
            xout: DVector::zeros(nv),
            cost: 0.0,
            r: DVector::zeros(nr),
            fx: DMatrix::zeros(nv, ndx),
            fu: DMatrix::zeros(nv, nu),
            lx: DVector::zeros(ndx),
            lu: DVector::zeros(nu),
            lxx: DMatrix::zeros(ndx, ndx),
            lxu: DMatrix::zeros(ndx, nu),
            luu: DMatrix::zeros(nu, nu),
        }
    }

    /// Returns true if every buffer has the given dimensions.
    #[must_use]
    pub fn has_shape(&self, nv: usize, ndx: usize, nu: usize, nr: usize) -> bool {
        self.xout.len() == nv
            && self.r.len() == nr
            && self.fx.shape() == (nv, ndx)
            && self.fu.shape() == (nv, nu)
            && self.lx.len() == ndx
            && self.lu.len() == nu
            && self.lxx.shape() == (ndx, ndx)
            && self.lxu.shape() == (ndx, nu)
            && self.luu.shape() == (nu, nu)
    }
}

/// A continuous-time dynamics-and-cost model.
///
/// Computes the generalized acceleration `a = f(x, u)` and the instantaneous
/// cost `ℓ(x, u)`, along with their first and second derivatives. Integrators
/// turn this into a discrete-time [`ActionModel`](crate::ActionModel).
pub trait DifferentialActionModel: Display + Send + Sync {
    /// The state manifold this model evolves on.
    fn state(&self) -> &Arc<dyn StateManifold>;

    /// Dimension of the control.
    fn nu(&self) -> usize;

    /// Dimension of the cost residual.
    fn nr(&self) -> usize;

    /// Lower control bounds (`nu`), possibly `-∞`.
    fn u_lb(&self) -> &DVector<f64>;

    /// Upper control bounds (`nu`), possibly `+∞`.
    fn u_ub(&self) -> &DVector<f64>;

    /// Creates scratch data sized for this model.
    fn create_data(&self) -> DifferentialActionData {
        let state = self.state();
        DifferentialActionData::new(state.nv(), state.ndx(), self.nu(), self.nr())
    }

    /// Returns true if `data` can be used with this model.
    fn check_data(&self, data: &DifferentialActionData) -> bool {
        let state = self.state();
        data.has_shape(state.nv(), state.ndx(), self.nu(), self.nr())
    }

    /// Computes the acceleration, cost, and residual at `(x, u)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` or `u` have the wrong size.
    fn calc(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error>;

    /// Computes the derivatives of the acceleration and cost at `(x, u)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` or `u` have the wrong size.
    fn calc_diff(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error>;

    /// Computes the control that yields zero acceleration at `x`.
    ///
    /// The default implementation zeroes the velocity of `x` and runs
    /// Gauss–Newton iterations `u ← u − pinv(Fu) · a` until the update norm is
    /// at most `tol` or `maxiter` iterations have run. Non-convergence is not
    /// an error; the last iterate is returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` has the wrong size, or
    /// [`Error::Calculation`] if the pseudo-inverse of `Fu` cannot be formed.
    fn quasi_static(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        maxiter: usize,
        tol: f64,
    ) -> Result<DVector<f64>, Error> {
        let state = self.state();
        let (nx, nv) = (state.nx(), state.nv());
        ensure_dimension("x", x, nx)?;

        let mut x0 = x.clone();
        x0.rows_mut(nx - nv, nv).fill(0.0);

        let mut u = DVector::zeros(self.nu());
        for iter in 0..maxiter {
            self.calc(data, &x0, &u)?;
            self.calc_diff(data, &x0, &u)?;

            let fu_pinv = data
                .fu
                .clone()
                .pseudo_inverse(1e-12)
                .map_err(|msg| Error::Calculation(msg.to_string()))?;
            let du = -(fu_pinv * &data.xout);
            u += &du;

            if du.norm() <= tol {
                tracing::debug!(iter, "quasi-static solve converged");
                return Ok(u);
            }
        }

        tracing::debug!(maxiter, "quasi-static solve reached the iteration limit");
        Ok(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_data_is_zero_filled() {
        let data = DifferentialActionData::new(2, 4, 3, 1);

        assert!(data.has_shape(2, 4, 3, 1));
        assert_eq!(data.cost, 0.0);
        assert!(data.fx.iter().all(|&v| v == 0.0));
        assert!(data.luu.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn shape_check_rejects_other_dimensions() {
        let data = DifferentialActionData::new(2, 4, 3, 1);

        assert!(!data.has_shape(2, 4, 2, 1));
        assert!(!data.has_shape(3, 6, 3, 1));
        assert!(!data.has_shape(2, 4, 3, 0));
    }
}
