use std::fmt::Debug;

use nalgebra::{DMatrix, DVector};

/// Discretizes the control trajectory over one integration step.
///
/// The control is a function of normalized time `t ∈ [0, 1]`, where `0` is
/// the beginning of the step and `1` its end. It depends on a parameter vector
/// `p` of dimension [`np`](Self::np), which may be larger than the control
/// dimension [`nw`](Self::nw). The solver optimizes over `p`; the differential
/// model sees `u = value(t, p)`.
///
/// Output arguments must be pre-sized by the caller. Implementations may
/// panic on mismatched sizes; integrators validate sizes before calling.
pub trait ControlParametrization: Debug + Send + Sync {
    /// Dimension of the control value.
    fn nw(&self) -> usize;

    /// Dimension of the control parameters.
    fn np(&self) -> usize;

    /// Changes the control dimension in place.
    fn resize(&mut self, nw: usize);

    /// Writes the control at normalized time `t` into `u_out`.
    fn value(&self, t: f64, p: &DVector<f64>, u_out: &mut DVector<f64>);

    /// Writes parameters that reproduce the control `u` at time `t` into `p_out`.
    fn value_inv(&self, t: f64, u: &DVector<f64>, p_out: &mut DVector<f64>);

    /// Maps control box bounds into parameter space.
    ///
    /// Any `p` inside the returned box must map, at every `t ∈ [0, 1]`, to a
    /// control inside the original box. The mapping need not be tight.
    fn convert_bounds(
        &self,
        u_lb: &DVector<f64>,
        u_ub: &DVector<f64>,
        p_lb: &mut DVector<f64>,
        p_ub: &mut DVector<f64>,
    );

    /// Writes the Jacobian `∂u/∂p` (`nw × np`) into `j_out`.
    fn d_value(&self, t: f64, p: &DVector<f64>, j_out: &mut DMatrix<f64>);

    /// Computes `out = a · ∂u/∂p` without forming the Jacobian.
    fn multiply_by_d_value(
        &self,
        t: f64,
        p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    );

    /// Computes `out = (∂u/∂p)ᵀ · a` without forming the Jacobian.
    fn multiply_d_value_transpose_by(
        &self,
        t: f64,
        p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    );

    /// Computes `out = (∂u/∂p)ᵀ · g` for a control-space gradient `g`.
    fn transpose_gradient(
        &self,
        t: f64,
        p: &DVector<f64>,
        g: &DVector<f64>,
        out: &mut DVector<f64>,
    );

    /// Returns the control at normalized time `t`.
    #[must_use]
    fn value_of(&self, t: f64, p: &DVector<f64>) -> DVector<f64> {
        let mut u = DVector::zeros(self.nw());
        self.value(t, p, &mut u);
        u
    }

    /// Returns parameters that reproduce the control `u` at time `t`.
    #[must_use]
    fn value_inv_of(&self, t: f64, u: &DVector<f64>) -> DVector<f64> {
        let mut p = DVector::zeros(self.np());
        self.value_inv(t, u, &mut p);
        p
    }

    /// Returns the Jacobian `∂u/∂p` at normalized time `t`.
    #[must_use]
    fn d_value_of(&self, t: f64, p: &DVector<f64>) -> DMatrix<f64> {
        let mut j = DMatrix::zeros(self.nw(), self.np());
        self.d_value(t, p, &mut j);
        j
    }
}
