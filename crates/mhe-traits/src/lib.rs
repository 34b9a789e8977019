#![crate_name = "mhe_traits"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Traits shared by the crates of the mhe.rs library.

use rand::{CryptoRng, RngCore};
use std::sync::Arc;

/// The parameters of a lattice-based scheme.
pub trait FheParameters {}

/// Indicates that an object is parametrized.
pub trait FheParametrized {
    /// The type of the parameters.
    type Parameters: FheParameters;
}

/// Encrypt a plaintext into a ciphertext.
pub trait FheEncrypter<P, C> {
    /// The type of error returned.
    type Error;

    /// Try to encrypt a plaintext.
    fn try_encrypt<R: RngCore + CryptoRng>(&self, pt: &P, rng: &mut R) -> Result<C, Self::Error>;
}

/// Decrypt a ciphertext into a plaintext.
pub trait FheDecrypter<P, C> {
    /// The type of error returned.
    type Error;

    /// Try to decrypt a ciphertext.
    fn try_decrypt(&self, ct: &C) -> Result<P, Self::Error>;
}

/// Serialize an object into bytes.
pub trait Serialize {
    /// Serialize `Self` into a vector of bytes.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Deserialize a parametrized object from bytes.
pub trait DeserializeParametrized
where
    Self: Sized,
    Self: FheParametrized,
{
    /// The type of error returned.
    type Error;

    /// Attempt to deserialize from a vector of bytes.
    fn from_bytes(bytes: &[u8], par: &Arc<Self::Parameters>) -> Result<Self, Self::Error>;
}

/// Deserialize an object that lives in a context (e.g. a ring).
pub trait DeserializeWithContext
where
    Self: Sized,
{
    /// The type of error returned.
    type Error;

    /// The type of the context.
    type Context;

    /// Attempt to deserialize from a vector of bytes.
    fn from_bytes(bytes: &[u8], ctx: &Arc<Self::Context>) -> Result<Self, Self::Error>;
}

/// Deserialize an object without context.
pub trait Deserialize
where
    Self: Sized,
{
    /// The type of error returned.
    type Error;

    /// Attempt to deserialize from a vector of bytes.
    fn try_deserialize(bytes: &[u8]) -> Result<Self, Self::Error>;
}
