use nalgebra::{DMatrix, DVector};
use stride_core::{Argument, Composition, StateManifold};

/// A Euclidean state `x = [q, v]` with `nq == nv`.
///
/// The retraction is plain vector addition, so every retraction Jacobian is
/// the identity and transport is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EuclideanState {
    nv: usize,
}

impl EuclideanState {
    /// Creates a state with `nv` positions and `nv` velocities.
    #[must_use]
    pub fn new(nv: usize) -> Self {
        Self { nv }
    }
}

impl StateManifold for EuclideanState {
    fn nx(&self) -> usize {
        2 * self.nv
    }

    fn ndx(&self) -> usize {
        2 * self.nv
    }

    fn nq(&self) -> usize {
        self.nv
    }

    fn nv(&self) -> usize {
        self.nv
    }

    fn zero(&self) -> DVector<f64> {
        DVector::zeros(self.nx())
    }

    fn integrate(&self, x: &DVector<f64>, dx: &DVector<f64>, xout: &mut DVector<f64>) {
        xout.copy_from(x);
        *xout += dx;
    }

    fn diff(&self, x0: &DVector<f64>, x1: &DVector<f64>, dxout: &mut DVector<f64>) {
        dxout.copy_from(x1);
        *dxout -= x0;
    }

    fn jintegrate(
        &self,
        _x: &DVector<f64>,
        _dx: &DVector<f64>,
        j: &mut DMatrix<f64>,
        _argument: Argument,
        composition: Composition,
    ) {
        match composition {
            Composition::Overwrite => j.fill_with_identity(),
            Composition::Accumulate => {
                for i in 0..self.ndx() {
                    j[(i, i)] += 1.0;
                }
            }
        }
    }

    fn jintegrate_transport(
        &self,
        _x: &DVector<f64>,
        _dx: &DVector<f64>,
        _j: &mut DMatrix<f64>,
        _argument: Argument,
    ) {
    }
}
