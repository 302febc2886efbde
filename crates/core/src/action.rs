use std::{fmt::Display, sync::Arc};

use nalgebra::DVector;

use crate::{Error, StateManifold};

/// A discrete-time transition-plus-cost model consumed by a trajectory solver.
///
/// Maps a state `x` and a control parameter vector `u` to the next state
/// `xnext = f(x, u)` and a stage cost `l(x, u)`, along with their derivatives.
/// A solver calls [`calc`](Self::calc) and then [`calc_diff`](Self::calc_diff)
/// at the same point on the same data.
///
/// Models are read-only during evaluation. Each trajectory node owns one
/// [`Data`](Self::Data) value created by [`create_data`](Self::create_data),
/// which is reused in place for every subsequent call.
pub trait ActionModel: Display + Send + Sync {
    /// Per-node scratch data.
    type Data;

    /// The state manifold this model evolves on.
    fn state(&self) -> &Arc<dyn StateManifold>;

    /// Dimension of the control parameter vector.
    fn nu(&self) -> usize;

    /// Dimension of the cost residual.
    fn nr(&self) -> usize;

    /// Lower bounds on the control parameters.
    fn u_lb(&self) -> &DVector<f64>;

    /// Upper bounds on the control parameters.
    fn u_ub(&self) -> &DVector<f64>;

    /// Creates scratch data sized for this model.
    fn create_data(&self) -> Self::Data;

    /// Returns true if `data` can be used with this model.
    fn check_data(&self, data: &Self::Data) -> bool;

    /// Computes the next state and cost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` or `u` have the wrong size.
    fn calc(&self, data: &mut Self::Data, x: &DVector<f64>, u: &DVector<f64>) -> Result<(), Error>;

    /// Computes the derivatives of the next state and cost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` or `u` have the wrong size.
    fn calc_diff(
        &self,
        data: &mut Self::Data,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error>;

    /// Computes the control parameters that keep the system at rest at `x`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if `x` has the wrong size, or any error
    /// raised by the underlying iterative solve.
    fn quasi_static(
        &self,
        data: &mut Self::Data,
        x: &DVector<f64>,
        maxiter: usize,
        tol: f64,
    ) -> Result<DVector<f64>, Error>;
}
