use nalgebra::{DMatrix, DVector};
use stride_core::DifferentialActionData;

/// Scratch data for one stage of an integration rule.
///
/// A stage evaluates the differential model at the state `y`, reached from the
/// node state `x` by the tangent offset `dy`, with the control `u_diff`
/// sampled from the parametrization at the stage time. Derivatives with
/// respect to `u` are taken with respect to the control parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Differential model data at this stage.
    pub differential: DifferentialActionData,

    /// Control passed to the differential model (`nw`).
    pub u_diff: DVector<f64>,

    /// Stage state (`nx`).
    pub y: DVector<f64>,

    /// Tangent offset from `x` to `y` (`ndx`).
    pub dy: DVector<f64>,

    /// Stage tangent `[v(y), a(y, u)]` (`ndx`).
    pub k: DVector<f64>,

    /// Control Jacobian `∂u_diff/∂p` at the stage time (`nw × np`).
    pub du_dp: DMatrix<f64>,

    /// `∂a/∂p` (`nv × np`).
    pub da_du: DMatrix<f64>,

    /// `∂k/∂y` (`ndx × ndx`).
    pub dk_dy: DMatrix<f64>,

    /// `∂k/∂x` (`ndx × ndx`).
    pub dk_dx: DMatrix<f64>,

    /// `∂k/∂p` (`ndx × np`).
    pub dk_du: DMatrix<f64>,

    /// `∂y/∂x` (`ndx × ndx`).
    pub dy_dx: DMatrix<f64>,

    /// `∂y/∂p` (`ndx × np`).
    pub dy_du: DMatrix<f64>,

    /// Stage cost gradient with respect to `x` (`ndx`).
    pub dl_dx: DVector<f64>,

    /// Stage cost gradient with respect to `p` (`np`).
    pub dl_du: DVector<f64>,
}

impl Stage {
    pub(crate) fn new(
        differential: DifferentialActionData,
        nx: usize,
        ndx: usize,
        nw: usize,
        np: usize,
    ) -> Self {
        let nv = differential.xout.len();
        Self {
            differential,
            u_diff: DVector::zeros(nw),
            y: DVector::zeros(nx),
            dy: DVector::zeros(ndx),
            k: DVector::zeros(ndx),
            du_dp: DMatrix::zeros(nw, np),
            da_du: DMatrix::zeros(nv, np),
            dk_dy: DMatrix::zeros(ndx, ndx),
            dk_dx: DMatrix::zeros(ndx, ndx),
            dk_du: DMatrix::zeros(ndx, np),
            dy_dx: DMatrix::zeros(ndx, ndx),
            dy_du: DMatrix::zeros(ndx, np),
            dl_dx: DVector::zeros(ndx),
            dl_du: DVector::zeros(np),
        }
    }

    fn has_shape(&self, nx: usize, ndx: usize, nw: usize, np: usize) -> bool {
        let nv = self.differential.xout.len();
        self.u_diff.len() == nw
            && self.y.len() == nx
            && self.dy.len() == ndx
            && self.k.len() == ndx
            && self.du_dp.shape() == (nw, np)
            && self.da_du.shape() == (nv, np)
            && self.dk_dy.shape() == (ndx, ndx)
            && self.dk_dx.shape() == (ndx, ndx)
            && self.dk_du.shape() == (ndx, np)
            && self.dy_dx.shape() == (ndx, ndx)
            && self.dy_du.shape() == (ndx, np)
            && self.dl_dx.len() == ndx
            && self.dl_du.len() == np
    }
}

/// Scratch data for an integrated action model.
///
/// Shared by every integration rule; rules differ only in the number of
/// [`Stage`]s. Buffers are sized once by `create_data` and reused in place.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratedActionData {
    /// Next state (`nx`).
    pub xnext: DVector<f64>,

    /// Stage cost over the step.
    pub cost: f64,

    /// Cost residual (`nr`).
    pub r: DVector<f64>,

    /// `∂xnext/∂x` (`ndx × ndx`).
    pub fx: DMatrix<f64>,

    /// `∂xnext/∂p` (`ndx × np`).
    pub fu: DMatrix<f64>,

    /// Cost gradient with respect to the state (`ndx`).
    pub lx: DVector<f64>,

    /// Cost gradient with respect to the control parameters (`np`).
    pub lu: DVector<f64>,

    /// Cost Hessian with respect to the state (`ndx × ndx`).
    pub lxx: DMatrix<f64>,

    /// Mixed cost Hessian (`ndx × np`).
    pub lxu: DMatrix<f64>,

    /// Cost Hessian with respect to the control parameters (`np × np`).
    pub luu: DMatrix<f64>,

    /// Tangent step from `x` to `xnext` (`ndx`).
    pub dx: DVector<f64>,

    /// Per-stage scratch, in evaluation order.
    pub stages: Vec<Stage>,
}

/// Dimensions an [`IntegratedActionData`] is sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dimensions {
    pub nx: usize,
    pub ndx: usize,
    pub nw: usize,
    pub np: usize,
    pub nr: usize,
}

impl IntegratedActionData {
    pub(crate) fn new(dims: Dimensions, stages: Vec<Stage>) -> Self {
        let Dimensions { nx, ndx, np, nr, .. } = dims;
        Self {
            xnext: DVector::zeros(nx),
            cost: 0.0,
            r: DVector::zeros(nr),
            fx: DMatrix::zeros(ndx, ndx),
            fu: DMatrix::zeros(ndx, np),
            lx: DVector::zeros(ndx),
            lu: DVector::zeros(np),
            lxx: DMatrix::zeros(ndx, ndx),
            lxu: DMatrix::zeros(ndx, np),
            luu: DMatrix::zeros(np, np),
            dx: DVector::zeros(ndx),
            stages,
        }
    }

    /// Returns true if the node buffers and `count` stages match `dims`.
    ///
    /// Nested differential data is not inspected.
    pub(crate) fn has_shape(&self, dims: Dimensions, count: usize) -> bool {
        let Dimensions {
            nx,
            ndx,
            nw,
            np,
            nr,
        } = dims;
        self.xnext.len() == nx
            && self.r.len() == nr
            && self.fx.shape() == (ndx, ndx)
            && self.fu.shape() == (ndx, np)
            && self.lx.len() == ndx
            && self.lu.len() == np
            && self.lxx.shape() == (ndx, ndx)
            && self.lxu.shape() == (ndx, np)
            && self.luu.shape() == (np, np)
            && self.dx.len() == ndx
            && self.stages.len() == count
            && self.stages.iter().all(|s| s.has_shape(nx, ndx, nw, np))
    }
}
