use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Errors that can occur when configuring or evaluating an action model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// An input vector does not have the dimension the model expects.
    ///
    /// Checked before any computation, so the data is left untouched.
    #[error("{name} has wrong dimension (it should be {expected}, got {found})")]
    Dimension {
        name: &'static str,
        expected: usize,
        found: usize,
    },

    /// A matrix does not have the shape the model expects.
    #[error("{name} has wrong shape (it should be {expected:?}, got {found:?})")]
    Shape {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A negative time step was passed to a setter.
    #[error("time step must be non-negative, got {0}")]
    NegativeTimeStep(f64),

    /// A time step that is NaN or infinite was passed to a setter.
    #[error("time step must be finite, got {0}")]
    NonFiniteTimeStep(f64),

    /// Scratch data was not created by the model it is used with.
    #[error("data does not match the model it is used with")]
    IncompatibleData,

    /// The control parametrization is held elsewhere and cannot be resized in place.
    #[error("control parametrization is shared and cannot be resized in place")]
    SharedControl,

    /// The calculation failed due to a numerical or internal error.
    #[error("calculation error: {0}")]
    Calculation(String),
}

/// Checks that `v` has exactly `expected` entries.
///
/// # Errors
///
/// Returns [`Error::Dimension`] naming `name` if the sizes differ.
pub fn ensure_dimension(
    name: &'static str,
    v: &DVector<f64>,
    expected: usize,
) -> Result<(), Error> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(Error::Dimension {
            name,
            expected,
            found: v.len(),
        })
    }
}

/// Checks that `m` has exactly `expected` rows and columns.
///
/// # Errors
///
/// Returns [`Error::Shape`] naming `name` if the shapes differ.
pub fn ensure_shape(
    name: &'static str,
    m: &DMatrix<f64>,
    expected: (usize, usize),
) -> Result<(), Error> {
    if m.shape() == expected {
        Ok(())
    } else {
        Err(Error::Shape {
            name,
            expected,
            found: m.shape(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_dimension_passes() {
        let v = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert!(ensure_dimension("x", &v, 3).is_ok());
    }

    #[test]
    fn mismatched_shape_reports_both_axes() {
        let m = DMatrix::<f64>::zeros(2, 3);
        let err = ensure_shape("fu", &m, (2, 2)).unwrap_err();

        assert_eq!(
            err,
            Error::Shape {
                name: "fu",
                expected: (2, 2),
                found: (2, 3)
            }
        );
    }

    #[test]
    fn mismatched_dimension_reports_sizes() {
        let v = DVector::from_vec(vec![1.0, 2.0]);
        let err = ensure_dimension("u", &v, 3).unwrap_err();

        assert_eq!(
            err,
            Error::Dimension {
                name: "u",
                expected: 3,
                found: 2
            }
        );
        assert_eq!(
            err.to_string(),
            "u has wrong dimension (it should be 3, got 2)"
        );
    }

    #[test]
    fn time_step_errors_name_the_value() {
        assert_eq!(
            Error::NegativeTimeStep(-0.5).to_string(),
            "time step must be non-negative, got -0.5"
        );
        assert_eq!(
            Error::NonFiniteTimeStep(f64::INFINITY).to_string(),
            "time step must be finite, got inf"
        );
    }
}
