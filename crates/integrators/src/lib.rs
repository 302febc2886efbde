//! Integrated action models for the Stride framework.
//!
//! Turns a continuous-time [`DifferentialActionModel`] into a discrete-time
//! [`ActionModel`] by integrating it over one time step, together with exact
//! first derivatives of the discrete transition and of the step cost.
//!
//! Two integration rules share the same configuration ([`IntegratorBase`])
//! and scratch data ([`IntegratedActionData`]):
//!
//! - [`EulerModel`]: explicit Euler, one evaluation per step
//! - [`Rk2Model`]: explicit midpoint, two evaluations per step
//!
//! The control seen by the differential model is parametrized over the step
//! by a [`ControlParametrization`]; [`PolyZero`] holds it constant and
//! [`PolyOne`] varies it linearly.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stride_core::ActionModel;
//! use stride_integrators::{EulerModel, IntegratorConfig};
//!
//! let model = EulerModel::new(differential, None, IntegratorConfig::default().with_dt(0.01))?;
//! let mut data = model.create_data();
//! model.calc(&mut data, &x, &u)?;
//! model.calc_diff(&mut data, &x, &u)?;
//! ```
//!
//! [`DifferentialActionModel`]: stride_core::DifferentialActionModel
//! [`ActionModel`]: stride_core::ActionModel
//! [`ControlParametrization`]: stride_core::ControlParametrization

mod base;
mod config;
pub mod control;
mod data;
mod euler;
mod rk2;

pub use base::IntegratorBase;
pub use config::IntegratorConfig;
pub use control::{PolyOne, PolyZero};
pub use data::{IntegratedActionData, Stage};
pub use euler::EulerModel;
pub use rk2::Rk2Model;
