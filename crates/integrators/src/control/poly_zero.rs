use nalgebra::{DMatrix, DVector};
use stride_core::ControlParametrization;

/// Zero-order hold: the control is constant over the step and equal to `p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyZero {
    nw: usize,
}

impl PolyZero {
    /// Creates a parametrization of a control with `nw` entries.
    #[must_use]
    pub fn new(nw: usize) -> Self {
        Self { nw }
    }
}

impl ControlParametrization for PolyZero {
    fn nw(&self) -> usize {
        self.nw
    }

    fn np(&self) -> usize {
        self.nw
    }

    fn resize(&mut self, nw: usize) {
        self.nw = nw;
    }

    fn value(&self, _t: f64, p: &DVector<f64>, u_out: &mut DVector<f64>) {
        u_out.copy_from(p);
    }

    fn value_inv(&self, _t: f64, u: &DVector<f64>, p_out: &mut DVector<f64>) {
        p_out.copy_from(u);
    }

    fn convert_bounds(
        &self,
        u_lb: &DVector<f64>,
        u_ub: &DVector<f64>,
        p_lb: &mut DVector<f64>,
        p_ub: &mut DVector<f64>,
    ) {
        p_lb.copy_from(u_lb);
        p_ub.copy_from(u_ub);
    }

    fn d_value(&self, _t: f64, _p: &DVector<f64>, j_out: &mut DMatrix<f64>) {
        j_out.fill_with_identity();
    }

    fn multiply_by_d_value(
        &self,
        _t: f64,
        _p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) {
        out.copy_from(a);
    }

    fn multiply_d_value_transpose_by(
        &self,
        _t: f64,
        _p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) {
        out.copy_from(a);
    }

    fn transpose_gradient(
        &self,
        _t: f64,
        _p: &DVector<f64>,
        g: &DVector<f64>,
        out: &mut DVector<f64>,
    ) {
        out.copy_from(g);
    }
}
