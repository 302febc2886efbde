//! Control parametrizations over one integration step.
//!
//! Both variants implement [`ControlParametrization`](stride_core::ControlParametrization).
//! Time is normalized, so `t = 0` is the start of the step and `t = 1` its end.

mod poly_one;
mod poly_zero;

pub use poly_one::PolyOne;
pub use poly_zero::PolyZero;
