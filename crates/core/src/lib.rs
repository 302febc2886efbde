//! Core traits and types for the Stride framework.
//!
//! This crate defines the shared abstractions that integrators and models
//! build on:
//!
//! - [`StateManifold`]: retraction, inverse retraction, and Jacobian transport
//!   on a (possibly non-Euclidean) state space
//! - [`DifferentialActionModel`]: continuous-time dynamics and cost with their
//!   first and second derivatives
//! - [`ControlParametrization`]: maps a per-step parameter vector to a
//!   time-varying control signal
//! - [`ActionModel`]: discrete-time transition and cost consumed by a
//!   trajectory solver
//!
//! Models are immutable configuration shared behind [`Arc`](std::sync::Arc).
//! Scratch data is created once per trajectory node and is exclusively owned
//! by it, so independent nodes can be evaluated in parallel without locking.

mod action;
mod control;
mod differential;
mod error;
mod state;

pub use action::ActionModel;
pub use control::ControlParametrization;
pub use differential::{DifferentialActionData, DifferentialActionModel};
pub use error::{Error, ensure_dimension, ensure_shape};
pub use state::{Argument, Composition, StateManifold};
