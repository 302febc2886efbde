use std::{fmt, sync::Arc};

use nalgebra::DVector;
use stride_core::{
    Argument, Composition, ControlParametrization, DifferentialActionModel, Error, StateManifold,
    ensure_dimension,
};

use crate::{
    IntegratorConfig, PolyZero,
    data::{Dimensions, IntegratedActionData, Stage},
};

/// Configuration and bookkeeping shared by every integration rule.
///
/// Holds the differential model, the control parametrization, and the time
/// step, and keeps the parameter-space control bounds in sync with them.
/// A time step of zero puts the integrator in passthrough mode, where the
/// next state is the current state and costs are not scaled.
pub struct IntegratorBase {
    differential: Arc<dyn DifferentialActionModel>,
    control: Arc<dyn ControlParametrization>,
    dt: f64,
    dt2: f64,
    with_cost_residual: bool,
    u_lb: DVector<f64>,
    u_ub: DVector<f64>,
    unone: DVector<f64>,
    has_control_limits: bool,
}

impl IntegratorBase {
    /// Creates the shared state of an integrator.
    ///
    /// When `control` is `None`, a [`PolyZero`] sized to the differential
    /// model's control is used. A negative `config.dt` is replaced by
    /// [`IntegratorConfig::DEFAULT_DT`] and a warning is logged.
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
        let nu = differential.nu();
        let control: Arc<dyn ControlParametrization> = match control {
            Some(control) => control,
            None => Arc::new(PolyZero::new(nu)),
        };
        if control.nw() != nu {
            return Err(Error::Dimension {
                name: "control",
                expected: nu,
                found: control.nw(),
            });
        }

        let dt = if !config.dt.is_finite() || config.dt < 0.0 {
            tracing::warn!(
                dt = config.dt,
                fallback = IntegratorConfig::DEFAULT_DT,
                "invalid time step, using the default"
            );
            IntegratorConfig::DEFAULT_DT
        } else {
            config.dt
        };

        let mut base = Self {
            differential,
            control,
            dt,
            dt2: dt * dt,
            with_cost_residual: config.with_cost_residual,
            u_lb: DVector::zeros(0),
            u_ub: DVector::zeros(0),
            unone: DVector::zeros(0),
            has_control_limits: false,
        };
        base.refresh_bounds();
        Ok(base)
    }

    /// Returns the differential model.
    #[must_use]
    pub fn differential(&self) -> &Arc<dyn DifferentialActionModel> {
        &self.differential
    }

    /// Returns the control parametrization.
    #[must_use]
    pub fn control(&self) -> &Arc<dyn ControlParametrization> {
        &self.control
    }

    /// Returns the state manifold of the differential model.
    #[must_use]
    pub fn state(&self) -> &Arc<dyn StateManifold> {
        self.differential.state()
    }

    /// Returns the time step.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns true unless the integrator is in passthrough mode.
    #[must_use]
    pub fn is_integrating(&self) -> bool {
        self.dt > 0.0
    }

    /// Returns whether the stage residual is copied into the action data.
    #[must_use]
    pub fn with_cost_residual(&self) -> bool {
        self.with_cost_residual
    }

    /// Dimension of the control parameters.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.control.np()
    }

    /// Dimension of the cost residual.
    #[must_use]
    pub fn nr(&self) -> usize {
        self.differential.nr()
    }

    /// Lower bounds on the control parameters.
    #[must_use]
    pub fn u_lb(&self) -> &DVector<f64> {
        &self.u_lb
    }

    /// Upper bounds on the control parameters.
    #[must_use]
    pub fn u_ub(&self) -> &DVector<f64> {
        &self.u_ub
    }

    /// Neutral control parameters.
    #[must_use]
    pub fn unone(&self) -> &DVector<f64> {
        &self.unone
    }

    /// Returns true if any control parameter bound is finite.
    #[must_use]
    pub fn has_control_limits(&self) -> bool {
        self.has_control_limits
    }

    /// Sets the time step.
    ///
    /// A step of zero switches to passthrough mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFiniteTimeStep`] if `dt` is NaN or infinite and
    /// [`Error::NegativeTimeStep`] if `dt < 0`. The integrator is left
    /// unchanged in both cases.
    pub fn set_dt(&mut self, dt: f64) -> Result<(), Error> {
        if !dt.is_finite() {
            return Err(Error::NonFiniteTimeStep(dt));
        }
        if dt < 0.0 {
            return Err(Error::NegativeTimeStep(dt));
        }
        self.dt = dt;
        self.dt2 = dt * dt;
        self.refresh_bounds();
        Ok(())
    }

    /// Sets whether the stage residual is copied into the action data.
    pub fn set_with_cost_residual(&mut self, with_cost_residual: bool) {
        self.with_cost_residual = with_cost_residual;
    }

    /// Replaces the differential model.
    ///
    /// If the new model has a different control dimension, the control
    /// parametrization is resized in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SharedControl`] if a resize is needed while the
    /// parametrization is shared with another owner. The integrator is left
    /// unchanged.
    pub fn set_differential(
        &mut self,
        differential: Arc<dyn DifferentialActionModel>,
    ) -> Result<(), Error> {
        let nw = differential.nu();
        if self.control.nw() != nw {
            Arc::get_mut(&mut self.control)
                .ok_or(Error::SharedControl)?
                .resize(nw);
        }
        self.differential = differential;
        self.refresh_bounds();
        Ok(())
    }

    /// Replaces the control parametrization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dimension`] if its control dimension differs from the
    /// differential model's. The integrator is left unchanged.
    pub fn set_control(&mut self, control: Arc<dyn ControlParametrization>) -> Result<(), Error> {
        let nu = self.differential.nu();
        if control.nw() != nu {
            return Err(Error::Dimension {
                name: "control",
                expected: nu,
                found: control.nw(),
            });
        }
        self.control = control;
        self.refresh_bounds();
        Ok(())
    }

    fn refresh_bounds(&mut self) {
        let np = self.control.np();
        if self.unone.len() != np {
            self.unone = DVector::zeros(np);
        }
        self.u_lb = DVector::from_element(np, f64::NEG_INFINITY);
        self.u_ub = DVector::from_element(np, f64::INFINITY);
        self.control.convert_bounds(
            self.differential.u_lb(),
            self.differential.u_ub(),
            &mut self.u_lb,
            &mut self.u_ub,
        );
        self.has_control_limits = self
            .u_lb
            .iter()
            .chain(self.u_ub.iter())
            .any(|b| b.is_finite());
    }

    pub(crate) fn dt2(&self) -> f64 {
        self.dt2
    }

    /// Scale applied to stage costs: `dt`, or one in passthrough mode.
    pub(crate) fn cost_scale(&self) -> f64 {
        if self.is_integrating() { self.dt } else { 1.0 }
    }

    fn dimensions(&self) -> Dimensions {
        let state = self.state();
        Dimensions {
            nx: state.nx(),
            ndx: state.ndx(),
            nw: self.control.nw(),
            np: self.control.np(),
            nr: self.nr(),
        }
    }

    pub(crate) fn create_data(&self, count: usize) -> IntegratedActionData {
        let dims = self.dimensions();
        let stages = (0..count)
            .map(|_| {
                Stage::new(
                    self.differential.create_data(),
                    dims.nx,
                    dims.ndx,
                    dims.nw,
                    dims.np,
                )
            })
            .collect();
        IntegratedActionData::new(dims, stages)
    }

    pub(crate) fn check_data(&self, data: &IntegratedActionData, count: usize) -> bool {
        data.has_shape(self.dimensions(), count)
            && data
                .stages
                .iter()
                .all(|stage| self.differential.check_data(&stage.differential))
    }

    /// Validates inputs before any computation.
    pub(crate) fn ensure_inputs(
        &self,
        data: &IntegratedActionData,
        x: &DVector<f64>,
        u: &DVector<f64>,
        count: usize,
    ) -> Result<(), Error> {
        ensure_dimension("x", x, self.state().nx())?;
        ensure_dimension("u", u, self.nu())?;
        if self.check_data(data, count) {
            Ok(())
        } else {
            Err(Error::IncompatibleData)
        }
    }

    /// Solves the quasi-static control on the first stage and maps it back
    /// into parameter space at `t = 0`.
    pub(crate) fn quasi_static(
        &self,
        data: &mut IntegratedActionData,
        x: &DVector<f64>,
        maxiter: usize,
        tol: f64,
        count: usize,
    ) -> Result<DVector<f64>, Error> {
        ensure_dimension("x", x, self.state().nx())?;
        if !self.check_data(data, count) {
            return Err(Error::IncompatibleData);
        }
        let uc = self
            .differential
            .quasi_static(&mut data.stages[0].differential, x, maxiter, tol)?;
        Ok(self.control.value_inv_of(0.0, &uc))
    }

    /// Copies the first-stage residual when residuals are enabled.
    pub(crate) fn copy_residual(&self, data: &mut IntegratedActionData) {
        if self.with_cost_residual {
            data.r.copy_from(&data.stages[0].differential.r);
        }
    }

    /// Holds the state in place and reports the unscaled first-stage cost.
    pub(crate) fn passthrough(&self, data: &mut IntegratedActionData, x: &DVector<f64>) {
        data.dx.fill(0.0);
        data.xnext.copy_from(x);
        data.cost = data.stages[0].differential.cost;
    }

    /// Writes `Fx = ∂integrate(x, 0)/∂x` and `Fu = 0`.
    pub(crate) fn passthrough_dynamics(&self, data: &mut IntegratedActionData, x: &DVector<f64>) {
        self.state().jintegrate(
            x,
            &data.dx,
            &mut data.fx,
            Argument::First,
            Composition::Overwrite,
        );
        data.fu.fill(0.0);
    }

    /// Maps the first-stage cost derivatives into parameter space, scaled by
    /// [`cost_scale`](Self::cost_scale).
    ///
    /// Expects the first stage's differential derivatives to be current.
    pub(crate) fn first_stage_cost_derivatives(
        &self,
        data: &mut IntegratedActionData,
        u: &DVector<f64>,
    ) {
        let scale = self.cost_scale();
        let stage = &mut data.stages[0];
        let d = &stage.differential;

        self.control.d_value(0.0, u, &mut stage.du_dp);
        stage.dl_dx.copy_from(&d.lx);
        self.control
            .transpose_gradient(0.0, u, &d.lu, &mut stage.dl_du);

        data.lx.copy_from(&(&stage.dl_dx * scale));
        data.lu.copy_from(&(&stage.dl_du * scale));
        data.lxx.copy_from(&(&d.lxx * scale));

        self.control
            .multiply_by_d_value(0.0, u, &d.lxu, &mut data.lxu);
        data.lxu *= scale;

        let luu_j = &d.luu * &stage.du_dp;
        self.control
            .multiply_d_value_transpose_by(0.0, u, &luu_j, &mut data.luu);
        data.luu *= scale;
    }

    pub(crate) fn fmt_named(&self, f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
        write!(f, "{name} {{dt={}, {}}}", self.dt, self.differential)
    }
}
