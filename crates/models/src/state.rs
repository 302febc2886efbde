//! State manifolds.

mod euclidean;
mod orientation;

pub use euclidean::EuclideanState;
pub use orientation::OrientationState;
