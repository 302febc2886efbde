#[cfg(feature = "serde-derive")]
use serde::{Deserialize, Serialize};

/// Construction parameters shared by every integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-derive", serde(default))]
pub struct IntegratorConfig {
    /// Integration time step.
    ///
    /// Zero selects passthrough mode. A negative value is replaced by the
    /// default when the integrator is built.
    pub dt: f64,

    /// Whether the stage residual is copied into the action data.
    pub with_cost_residual: bool,
}

impl IntegratorConfig {
    /// Time step used when none is given or a negative one is supplied.
    pub const DEFAULT_DT: f64 = 1e-3;

    /// Returns the config with the given time step.
    #[must_use]
    pub fn with_dt(self, dt: f64) -> Self {
        Self { dt, ..self }
    }

    /// Returns the config with residual copying turned on or off.
    #[must_use]
    pub fn with_cost_residual(self, with_cost_residual: bool) -> Self {
        Self {
            with_cost_residual,
            ..self
        }
    }
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            dt: Self::DEFAULT_DT,
            with_cost_residual: true,
        }
    }
}
