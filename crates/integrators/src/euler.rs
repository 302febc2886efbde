//! Explicit Euler integration of a differential action model.
//!
//! With `x = [q, v]` and `a = f(x, u)`, one step is
//!
//! ```text
//! dx    = [v·dt + a·dt², a·dt]
//! xnext = integrate(x, dx)
//! cost  = dt·ℓ(x, u)
//! ```
//!
//! The position is advanced with the updated velocity (semi-implicit Euler).

use std::{fmt, sync::Arc};

use nalgebra::DVector;
use stride_core::{
    ActionModel, Argument, Composition, ControlParametrization, DifferentialActionModel, Error,
    StateManifold,
};

use crate::{IntegratedActionData, IntegratorBase, IntegratorConfig};

const STAGES: usize = 1;

/// A discrete-time action model built by one explicit Euler step.
pub struct EulerModel {
    base: IntegratorBase,
}

impl EulerModel {
    /// Creates an Euler integrator around `differential`.
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

impl ActionModel for EulerModel {
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
        let control = self.base.control();
        if control.np() > control.nw() {
            tracing::warn!(
                np = control.np(),
                nw = control.nw(),
                "Euler samples the control only at the start of the step; \
                 a parametrization with more parameters than controls is wasted"
            );
        }
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
        let (nx, nv) = (state.nx(), state.nv());

        let stage = &mut data.stages[0];
        stage.y.copy_from(x);
        self.base.control().value(0.0, u, &mut stage.u_diff);
        self.base
            .differential()
            .calc(&mut stage.differential, x, &stage.u_diff)?;

        if self.base.is_integrating() {
            let (dt, dt2) = (self.base.dt(), self.base.dt2());
            let a = &stage.differential.xout;
            let v = x.rows(nx - nv, nv);
            data.dx.rows_mut(0, nv).copy_from(&(v * dt + a * dt2));
            data.dx.rows_mut(nv, nv).copy_from(&(a * dt));
            state.integrate(x, &data.dx, &mut data.xnext);
            data.cost = dt * stage.differential.cost;
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
        let nv = state.nv();

        let stage = &mut data.stages[0];
        control.value(0.0, u, &mut stage.u_diff);
        self.base
            .differential()
            .calc_diff(&mut stage.differential, x, &stage.u_diff)?;

        if self.base.is_integrating() {
            let (dt, dt2) = (self.base.dt(), self.base.dt2());
            let d = &stage.differential;
            control.multiply_by_d_value(0.0, u, &d.fu, &mut stage.da_du);

            data.fx.rows_mut(0, nv).copy_from(&(&d.fx * dt2));
            data.fx.rows_mut(nv, nv).copy_from(&(&d.fx * dt));
            for i in 0..nv {
                data.fx[(i, nv + i)] += dt;
            }
            data.fu.rows_mut(0, nv).copy_from(&(&stage.da_du * dt2));
            data.fu.rows_mut(nv, nv).copy_from(&(&stage.da_du * dt));

            state.jintegrate_transport(x, &data.dx, &mut data.fx, Argument::Second);
            state.jintegrate_transport(x, &data.dx, &mut data.fu, Argument::Second);
            state.jintegrate(
                x,
                &data.dx,
                &mut data.fx,
                Argument::First,
                Composition::Accumulate,
            );
        } else {
            self.base.passthrough_dynamics(data, x);
        }

        self.base.first_stage_cost_derivatives(data, u);
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

impl fmt::Display for EulerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt_named(f, "IntegratedActionModelEuler")
    }
}
