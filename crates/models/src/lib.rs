//! Reference collaborators for the Stride framework.
//!
//! Integrators are written against the [`StateManifold`] and
//! [`DifferentialActionModel`] traits. This crate provides small, exact
//! implementations of both:
//!
//! - [`EuclideanState`]: `x = [q, v]` with vector addition as retraction
//! - [`OrientationState`]: a unit quaternion and a body angular velocity,
//!   with the SO(3) exponential map as retraction
//! - [`LqrModel`]: linear dynamics with a quadratic cost
//! - [`FreeBodyModel`]: torque-driven rotation of a rigid body
//!
//! [`StateManifold`]: stride_core::StateManifold
//! [`DifferentialActionModel`]: stride_core::DifferentialActionModel

pub mod differential;
pub mod state;

pub use differential::{FreeBodyModel, LqrModel};
pub use state::{EuclideanState, OrientationState};
