use std::fmt::Debug;

use nalgebra::{DMatrix, DVector};

/// Selects which argument of the retraction `integrate(x, dx)` a Jacobian is taken with respect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    /// The base point `x`.
    First,

    /// The tangent step `dx`.
    Second,
}

/// How a computed Jacobian is written into its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// Replace the destination.
    Overwrite,

    /// Add into the destination.
    Accumulate,
}

impl Composition {
    /// Writes `value` into `target` according to this composition mode.
    ///
    /// # Panics
    ///
    /// Panics if `target` and `value` have different shapes.
    pub fn apply(self, target: &mut DMatrix<f64>, value: &DMatrix<f64>) {
        match self {
            Self::Overwrite => target.copy_from(value),
            Self::Accumulate => *target += value,
        }
    }
}

/// A state space with a retraction and its tangent-frame Jacobians.
///
/// States are laid out as `[q, v]`, with the generalized velocity occupying
/// the last `nv` entries. Tangent vectors are laid out as `[dq, dv]` with
/// `ndx = 2 * nv`. Jacobians are expressed in tangent coordinates, so a
/// derivative taken at `x` lives in the tangent frame at `x` and must be
/// transported before it can be composed with derivatives taken at
/// `integrate(x, dx)`.
///
/// The retraction must satisfy `integrate(x, diff(x, y)) == y` for nearby
/// states, and `integrate(x, 0) == x`.
pub trait StateManifold: Debug + Send + Sync {
    /// Dimension of the state representation.
    fn nx(&self) -> usize;

    /// Dimension of the tangent space.
    fn ndx(&self) -> usize;

    /// Dimension of the configuration representation.
    fn nq(&self) -> usize;

    /// Dimension of the generalized velocity.
    fn nv(&self) -> usize;

    /// Returns the neutral state.
    fn zero(&self) -> DVector<f64>;

    /// Retracts `x` by the tangent step `dx`, writing the result to `xout`.
    fn integrate(&self, x: &DVector<f64>, dx: &DVector<f64>, xout: &mut DVector<f64>);

    /// Computes the tangent step taking `x0` to `x1`, writing it to `dxout`.
    fn diff(&self, x0: &DVector<f64>, x1: &DVector<f64>, dxout: &mut DVector<f64>);

    /// Computes `∂integrate(x, dx)/∂argument` into `j` (`ndx × ndx`).
    fn jintegrate(
        &self,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        j: &mut DMatrix<f64>,
        argument: Argument,
        composition: Composition,
    );

    /// Transports `j` in place into the tangent frame at `integrate(x, dx)`.
    ///
    /// Left-multiplies `j` (`ndx × k`) by `∂integrate(x, dx)/∂argument`
    /// without materializing that Jacobian when the manifold allows it.
    fn jintegrate_transport(
        &self,
        x: &DVector<f64>,
        dx: &DVector<f64>,
        j: &mut DMatrix<f64>,
        argument: Argument,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_replaces_target() {
        let mut target = DMatrix::from_element(2, 2, 5.0);
        let value = DMatrix::identity(2, 2);

        Composition::Overwrite.apply(&mut target, &value);

        assert_eq!(target, value);
    }

    #[test]
    fn accumulate_adds_into_target() {
        let mut target = DMatrix::from_element(2, 2, 1.0);
        let value = DMatrix::identity(2, 2);

        Composition::Accumulate.apply(&mut target, &value);

        assert_eq!(target, DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]));
    }
}
