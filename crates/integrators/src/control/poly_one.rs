use nalgebra::{DMatrix, DVector};
use stride_core::ControlParametrization;

/// First-order polynomial control over the step.
///
/// The parameters are `p = [p0, p1]` and the control is
///
/// ```text
/// u(t) = (1 − 2t)·p0 + 2t·p1
/// ```
///
/// so `p0` is the control at the start of the step and `p1` the control at
/// its midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolyOne {
    nw: usize,
}

impl PolyOne {
    /// Creates a parametrization of a control with `nw` entries.
    #[must_use]
    pub fn new(nw: usize) -> Self {
        Self { nw }
    }

    /// Weights of `p0` and `p1` at time `t`.
    fn weights(t: f64) -> (f64, f64) {
        (1.0 - 2.0 * t, 2.0 * t)
    }
}

fn one_sided_margin(bound: f64) -> f64 {
    bound.abs().max(1.0)
}

impl ControlParametrization for PolyOne {
    fn nw(&self) -> usize {
        self.nw
    }

    fn np(&self) -> usize {
        2 * self.nw
    }

    fn resize(&mut self, nw: usize) {
        self.nw = nw;
    }

    fn value(&self, t: f64, p: &DVector<f64>, u_out: &mut DVector<f64>) {
        let (c0, c1) = Self::weights(t);
        u_out.copy_from(&(p.rows(0, self.nw) * c0 + p.rows(self.nw, self.nw) * c1));
    }

    fn value_inv(&self, _t: f64, u: &DVector<f64>, p_out: &mut DVector<f64>) {
        p_out.rows_mut(0, self.nw).copy_from(u);
        p_out.rows_mut(self.nw, self.nw).copy_from(u);
    }

    /// Maps each control box `[lb, ub]` to a parameter box that keeps `u(t)`
    /// inside `[lb, ub]` for every `t ∈ [0, 1]`.
    ///
    /// `u` is linear in `t`, so only `u(0) = p0` and `u(1) = 2·p1 − p0` need
    /// to stay inside the box. A finite box shrinks to `[lb + r/3, ub − r/3]`
    /// with `r = ub − lb` for both halves of `p`. A box open on one side caps
    /// `p0` within a margin `m = max(|b|, 1)` of its finite bound `b` and
    /// pulls the bound on `p1` in by `m/2`. A box open on both sides stays open.
    fn convert_bounds(
        &self,
        u_lb: &DVector<f64>,
        u_ub: &DVector<f64>,
        p_lb: &mut DVector<f64>,
        p_ub: &mut DVector<f64>,
    ) {
        let n = self.nw;
        for i in 0..n {
            let (lb, ub) = (u_lb[i], u_ub[i]);
            let ((lo0, hi0), (lo1, hi1)) = match (lb.is_finite(), ub.is_finite()) {
                (true, true) => {
                    let third = (ub - lb) / 3.0;
                    let shrunk = (lb + third, ub - third);
                    (shrunk, shrunk)
                }
                (true, false) => {
                    let m = one_sided_margin(lb);
                    ((lb, lb + m), (lb + 0.5 * m, ub))
                }
                (false, true) => {
                    let m = one_sided_margin(ub);
                    ((ub - m, ub), (lb, ub - 0.5 * m))
                }
                (false, false) => ((lb, ub), (lb, ub)),
            };
            p_lb[i] = lo0;
            p_ub[i] = hi0;
            p_lb[n + i] = lo1;
            p_ub[n + i] = hi1;
        }
    }

    fn d_value(&self, t: f64, _p: &DVector<f64>, j_out: &mut DMatrix<f64>) {
        let (c0, c1) = Self::weights(t);
        j_out.fill(0.0);
        for i in 0..self.nw {
            j_out[(i, i)] = c0;
            j_out[(i, self.nw + i)] = c1;
        }
    }

    fn multiply_by_d_value(
        &self,
        t: f64,
        _p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) {
        let (c0, c1) = Self::weights(t);
        out.columns_mut(0, self.nw).copy_from(&(a * c0));
        out.columns_mut(self.nw, self.nw).copy_from(&(a * c1));
    }

    fn multiply_d_value_transpose_by(
        &self,
        t: f64,
        _p: &DVector<f64>,
        a: &DMatrix<f64>,
        out: &mut DMatrix<f64>,
    ) {
        let (c0, c1) = Self::weights(t);
        out.rows_mut(0, self.nw).copy_from(&(a * c0));
        out.rows_mut(self.nw, self.nw).copy_from(&(a * c1));
    }

    fn transpose_gradient(
        &self,
        t: f64,
        _p: &DVector<f64>,
        g: &DVector<f64>,
        out: &mut DVector<f64>,
    ) {
        let (c0, c1) = Self::weights(t);
        out.rows_mut(0, self.nw).copy_from(&(g * c0));
        out.rows_mut(self.nw, self.nw).copy_from(&(g * c1));
    }
}
