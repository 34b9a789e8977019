use thiserror::Error;

use crate::rq::Representation;

/// The Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum encapsulating all the possible errors from this library.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// Indicates that an error in the serialization / deserialization.
    #[error("Serialization error")]
    SerializationError,

    /// Indicates that the provided context is invalid.
    #[error("Invalid context")]
    InvalidContext,

    /// Indicates that a level exceeds the levels of a context.
    #[error("Invalid level {0}: the maximum level is {1}")]
    InvalidLevel(usize, usize),

    /// Indicates an incorrect representation.
    #[error("Incorrect representation: got {0:?}, expected {1:?}")]
    IncorrectRepresentation(Representation, Representation),

    /// Indicates that the modulus is invalid.
    #[error("Invalid modulus: modulus {0} should be odd and between 3 and (1 << 62) - 1.")]
    InvalidModulus(u64),

    /// Indicates that a decomposition is not supported.
    #[error("Invalid decomposition: {0}")]
    InvalidDecomposition(String),

    /// Indicates an error with a sampler.
    #[error("Sampling error: {0}")]
    SamplingError(String),

    /// Indicates a default error.
    #[error("{0}")]
    Default(String),
}

#[cfg(test)]
mod tests {
    use crate::{rq::Representation, Error};

    #[test]
    fn error_strings() {
        assert_eq!(Error::SerializationError.to_string(), "Serialization error");
        assert_eq!(Error::InvalidContext.to_string(), "Invalid context");
        assert_eq!(
            Error::InvalidLevel(3, 2).to_string(),
            "Invalid level 3: the maximum level is 2"
        );
        assert_eq!(
            Error::IncorrectRepresentation(Representation::Ntt, Representation::PowerBasis)
                .to_string(),
            "Incorrect representation: got Ntt, expected PowerBasis"
        );
        assert_eq!(
            Error::InvalidModulus(0).to_string(),
            "Invalid modulus: modulus 0 should be odd and between 3 and (1 << 62) - 1."
        );
        assert_eq!(Error::Default("test".to_string()).to_string(), "test");
    }
}
