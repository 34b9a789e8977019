use thiserror::Error;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Indicates that two shares, or a share and a protocol, belong to
    /// different protocol instances (different seeds, Galois elements or
    /// key-switching targets).
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Indicates that the levels or the decomposition of two objects disagree.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Indicates that fewer parties than the threshold are active.
    #[error("Insufficient parties: {0} provided, {1} required")]
    InsufficientParties(usize, usize),

    /// Indicates an invalid input parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates an error in the underlying mathematical library.
    #[error("{0}")]
    MathError(mhe_math::Error),

    /// Indicates an error in the parameters.
    #[error("{0}")]
    ParametersError(ParametersError),

    /// Indicates a serialization error.
    #[error("Serialization error")]
    SerializationError,

    /// Indicates a default error
    #[error("{0}")]
    DefaultError(String),
}

impl From<mhe_math::Error> for Error {
    fn from(e: mhe_math::Error) -> Self {
        Error::MathError(e)
    }
}

/// Separate enum to indicate parameters-related errors.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ParametersError {
    /// Indicates that the degree is invalid.
    #[error("Invalid degree: {0} is not a power of 2 larger than 8")]
    InvalidDegree(usize),

    /// Indicates that the moduli sizes are invalid.
    #[error("Invalid modulus size: {0}, expected an integer between {1} and {2}")]
    InvalidModulusSize(usize, usize, usize),

    /// Indicates that there exists not enough primes of this size.
    #[error("Not enough primes of size {0} for polynomials of degree {1}")]
    NotEnoughPrimes(usize, usize),

    /// Indicates that the distribution parameters are invalid.
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// Indicates that too many parameters were specified.
    #[error("{0}")]
    TooManySpecified(String),

    /// Indicates that too few parameters were specified.
    #[error("{0}")]
    TooFewSpecified(String),
}

#[cfg(test)]
mod tests {
    use crate::{Error, ParametersError};

    #[test]
    fn error_strings() {
        assert_eq!(
            Error::ProtocolMismatch("different seeds".to_string()).to_string(),
            "Protocol mismatch: different seeds"
        );
        assert_eq!(
            Error::ShapeMismatch("level 2 != level 1".to_string()).to_string(),
            "Shape mismatch: level 2 != level 1"
        );
        assert_eq!(
            Error::InsufficientParties(2, 3).to_string(),
            "Insufficient parties: 2 provided, 3 required"
        );
        assert_eq!(
            Error::InvalidParameter("threshold".to_string()).to_string(),
            "Invalid parameter: threshold"
        );
        assert_eq!(
            Error::MathError(mhe_math::Error::InvalidContext).to_string(),
            mhe_math::Error::InvalidContext.to_string()
        );
        assert_eq!(
            Error::ParametersError(ParametersError::InvalidDegree(10)).to_string(),
            "Invalid degree: 10 is not a power of 2 larger than 8"
        );
        assert_eq!(
            Error::ParametersError(ParametersError::InvalidModulusSize(1, 2, 3)).to_string(),
            "Invalid modulus size: 1, expected an integer between 2 and 3"
        );
        assert_eq!(
            Error::ParametersError(ParametersError::NotEnoughPrimes(1, 2)).to_string(),
            "Not enough primes of size 1 for polynomials of degree 2"
        );
        assert_eq!(Error::SerializationError.to_string(), "Serialization error");
        assert_eq!(Error::DefaultError("test".to_string()).to_string(), "test");
    }
}
