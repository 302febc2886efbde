use nalgebra::{DMatrix, DVector, Matrix3, Quaternion, UnitQuaternion, Vector3};
use stride_core::{Argument, Composition, StateManifold};

/// The orientation of a rigid body together with its body angular velocity.
///
/// The state is `x = [w, i, j, k, ωx, ωy, ωz]`: a unit quaternion followed by
/// the angular velocity in the body frame. Tangent vectors are
/// `[δθ, δω]`, where `δθ` is a body-frame rotation vector.
///
/// The retraction is `integrate(x, dx) = (R · Exp(δθ), ω + δω)`, so the
/// Jacobians with respect to the base point and the step are `Exp(δθ)ᵀ` and
/// the right Jacobian `Jr(δθ)` of SO(3), respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrientationState;

impl OrientationState {
    /// Creates the state manifold.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Builds a state vector from an orientation and a body angular velocity.
    #[must_use]
    pub fn compose(orientation: &UnitQuaternion<f64>, omega: &Vector3<f64>) -> DVector<f64> {
        let mut x = DVector::zeros(7);
        write_orientation(orientation, &mut x);
        x.fixed_rows_mut::<3>(4).copy_from(omega);
        x
    }

    /// Returns the orientation stored in `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` has fewer than four entries.
    #[must_use]
    pub fn orientation(x: &DVector<f64>) -> UnitQuaternion<f64> {
        UnitQuaternion::from_quaternion(Quaternion::new(x[0], x[1], x[2], x[3]))
    }

    /// Returns the body angular velocity stored in `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` has fewer than seven entries.
    #[must_use]
    pub fn angular_velocity(x: &DVector<f64>) -> Vector3<f64> {
        Vector3::new(x[4], x[5], x[6])
    }
}

impl StateManifold for OrientationState {
    fn nx(&self) -> usize {
        7
    }

    fn ndx(&self) -> usize {
        6
    }

    fn nq(&self) -> usize {
        4
    }

    fn nv(&self) -> usize {
        3
    }

    fn zero(&self) -> DVector<f64> {
        Self::compose(&UnitQuaternion::identity(), &Vector3::zeros())
    }

    fn integrate(&self, x: &DVector<f64>, dx: &DVector<f64>, xout: &mut DVector<f64>) {
        let q = Self::orientation(x) * UnitQuaternion::from_scaled_axis(rotation_step(dx));
        write_orientation(&q, xout);
        for i in 0..3 {
            xout[4 + i] = x[4 + i] + dx[3 + i];
        }
    }

    fn diff(&self, x0: &DVector<f64>, x1: &DVector<f64>, dxout: &mut DVector<f64>) {
        let relative = Self::orientation(x0).inverse() * Self::orientation(x1);
        dxout.fixed_rows_mut::<3>(0).copy_from(&relative.scaled_axis());
        for i in 0..3 {
            dxout[3 + i] = x1[4 + i] - x0[4 + i];
        }
    }

    fn jintegrate(
        &self,
        _x: &DVector<f64>,
        dx: &DVector<f64>,
        j: &mut DMatrix<f64>,
        argument: Argument,
        composition: Composition,
    ) {
        let block = rotation_block(&rotation_step(dx), argument);
        match composition {
            Composition::Overwrite => {
                j.fill(0.0);
                j.fixed_view_mut::<3, 3>(0, 0).copy_from(&block);
                j.fixed_view_mut::<3, 3>(3, 3).fill_with_identity();
            }
            Composition::Accumulate => {
                let mut top_left = j.fixed_view_mut::<3, 3>(0, 0);
                top_left += block;
                for i in 3..6 {
                    j[(i, i)] += 1.0;
                }
            }
        }
    }

    fn jintegrate_transport(
        &self,
        _x: &DVector<f64>,
        dx: &DVector<f64>,
        j: &mut DMatrix<f64>,
        argument: Argument,
    ) {
        // The velocity block of either Jacobian is the identity.
        let block = rotation_block(&rotation_step(dx), argument);
        let top = block * j.fixed_rows::<3>(0);
        j.fixed_rows_mut::<3>(0).copy_from(&top);
    }
}

fn rotation_step(dx: &DVector<f64>) -> Vector3<f64> {
    Vector3::new(dx[0], dx[1], dx[2])
}

fn write_orientation(q: &UnitQuaternion<f64>, out: &mut DVector<f64>) {
    out[0] = q.w;
    out[1] = q.i;
    out[2] = q.j;
    out[3] = q.k;
}

/// Rotation block of `∂integrate/∂argument` for the step `phi`.
fn rotation_block(phi: &Vector3<f64>, argument: Argument) -> Matrix3<f64> {
    match argument {
        Argument::First => UnitQuaternion::from_scaled_axis(*phi)
            .to_rotation_matrix()
            .into_inner()
            .transpose(),
        Argument::Second => right_jacobian(phi),
    }
}

/// Right Jacobian of the SO(3) exponential map.
fn right_jacobian(phi: &Vector3<f64>) -> Matrix3<f64> {
    let theta2 = phi.norm_squared();
    let (a, b) = if theta2 < 1e-8 {
        (0.5 - theta2 / 24.0, 1.0 / 6.0 - theta2 / 120.0)
    } else {
        let theta = theta2.sqrt();
        (
            (1.0 - theta.cos()) / theta2,
            (theta - theta.sin()) / (theta2 * theta),
        )
    };
    let hat = phi.cross_matrix();
    Matrix3::identity() - hat * a + hat * hat * b
}
