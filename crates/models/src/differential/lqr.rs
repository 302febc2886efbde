use std::{fmt, sync::Arc};

use nalgebra::{DMatrix, DVector};
use stride_core::{
    DifferentialActionData, DifferentialActionModel, Error, StateManifold, ensure_dimension,
    ensure_shape,
};

use crate::EuclideanState;

/// Linear dynamics with a quadratic cost on a Euclidean state.
///
/// With `x = [q, v]`:
///
/// ```text
/// a = Fq·q + Fv·v + Fu·u + f0
/// ℓ = ½ xᵀQx + ½ uᵀRu + xᵀNu + qᵀx + rᵀu
/// ```
///
/// The residual is `[x, u]`. Every derivative is constant except the cost
/// gradients, and every second derivative is exact.
#[derive(Debug, Clone)]
pub struct LqrModel {
    state: Arc<dyn StateManifold>,
    fq: DMatrix<f64>,
    fv: DMatrix<f64>,
    fu: DMatrix<f64>,
    f0: DVector<f64>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    n: DMatrix<f64>,
    qv: DVector<f64>,
    rv: DVector<f64>,
    u_lb: DVector<f64>,
    u_ub: DVector<f64>,
}

impl LqrModel {
    /// Creates a model with the given drift and an identity cost.
    ///
    /// The number of velocities is taken from `fq` and the control dimension
    /// from the columns of `fu`. Control bounds start unbounded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] or [`Error::Dimension`] if the matrices do not
    /// agree on the number of velocities.
    pub fn new(
        fq: DMatrix<f64>,
        fv: DMatrix<f64>,
        fu: DMatrix<f64>,
        f0: DVector<f64>,
    ) -> Result<Self, Error> {
        let nv = fq.nrows();
        let nu = fu.ncols();
        ensure_shape("fq", &fq, (nv, nv))?;
        ensure_shape("fv", &fv, (nv, nv))?;
        ensure_shape("fu", &fu, (nv, nu))?;
        ensure_dimension("f0", &f0, nv)?;

        let nx = 2 * nv;
        Ok(Self {
            state: Arc::new(EuclideanState::new(nv)),
            fq,
            fv,
            fu,
            f0,
            q: DMatrix::identity(nx, nx),
            r: DMatrix::identity(nu, nu),
            n: DMatrix::zeros(nx, nu),
            qv: DVector::zeros(nx),
            rv: DVector::zeros(nu),
            u_lb: DVector::from_element(nu, f64::NEG_INFINITY),
            u_ub: DVector::from_element(nu, f64::INFINITY),
        })
    }

    /// Replaces the cost weights.
    ///
    /// `q` and `r` are symmetrized, so only their symmetric parts matter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] or [`Error::Dimension`] if a weight does not
    /// match the state or control dimension.
    pub fn with_cost(
        mut self,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        n: DMatrix<f64>,
        qv: DVector<f64>,
        rv: DVector<f64>,
    ) -> Result<Self, Error> {
        let nx = self.state.nx();
        let nu = self.fu.ncols();
        ensure_shape("q", &q, (nx, nx))?;
        ensure_shape("r", &r, (nu, nu))?;
        ensure_shape("n", &n, (nx, nu))?;
        ensure_dimension("qv", &qv, nx)?;
        ensure_dimension("rv", &rv, nu)?;

        self.q = (&q + q.transpose()) * 0.5;
        self.r = (&r + r.transpose()) * 0.5;
        self.n = n;
        self.qv = qv;
        self.rv = rv;
        Ok(self)
    }

    /// Replaces the control bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if a bound does not have `nu` entries.
    pub fn with_control_bounds(
        mut self,
        u_lb: DVector<f64>,
        u_ub: DVector<f64>,
    ) -> Result<Self, Error> {
        let nu = self.fu.ncols();
        ensure_dimension("u_lb", &u_lb, nu)?;
        ensure_dimension("u_ub", &u_ub, nu)?;

        self.u_lb = u_lb;
        self.u_ub = u_ub;
        Ok(self)
    }

    fn ensure_inputs(&self, x: &DVector<f64>, u: &DVector<f64>) -> Result<(), Error> {
        ensure_dimension("x", x, self.state.nx())?;
        ensure_dimension("u", u, self.fu.ncols())
    }
}

impl DifferentialActionModel for LqrModel {
    fn state(&self) -> &Arc<dyn StateManifold> {
        &self.state
    }

    fn nu(&self) -> usize {
        self.fu.ncols()
    }

    fn nr(&self) -> usize {
        self.state.nx() + self.fu.ncols()
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
        self.ensure_inputs(x, u)?;
        let nv = self.state.nv();
        let nx = self.state.nx();

        let (q, v) = (x.rows(0, nv), x.rows(nv, nv));
        data.xout
            .copy_from(&(&self.fq * q + &self.fv * v + &self.fu * u + &self.f0));

        data.cost = 0.5 * x.dot(&(&self.q * x))
            + 0.5 * u.dot(&(&self.r * u))
            + x.dot(&(&self.n * u))
            + self.qv.dot(x)
            + self.rv.dot(u);

        data.r.rows_mut(0, nx).copy_from(x);
        data.r.rows_mut(nx, u.len()).copy_from(u);
        Ok(())
    }

    fn calc_diff(
        &self,
        data: &mut DifferentialActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Result<(), Error> {
        self.ensure_inputs(x, u)?;
        let nv = self.state.nv();

        data.fx.columns_mut(0, nv).copy_from(&self.fq);
        data.fx.columns_mut(nv, nv).copy_from(&self.fv);
        data.fu.copy_from(&self.fu);

        data.lx.copy_from(&(&self.q * x + &self.n * u + &self.qv));
        data.lu.copy_from(&(&self.r * u + self.n.tr_mul(x) + &self.rv));
        data.lxx.copy_from(&self.q);
        data.lxu.copy_from(&self.n);
        data.luu.copy_from(&self.r);
        Ok(())
    }
}

impl fmt::Display for LqrModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LqrModel {{nq={}, nu={}}}", self.state.nq(), self.fu.ncols())
    }
}
