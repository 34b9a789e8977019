//! Protobuf messages for the serialization of keys, ciphertexts and shares.
//!
//! Polynomials are nested as the bytes of their own messages, and the
//! uniform components that can be regenerated from a seed are omitted.

use crate::{rlwe::Seed, Error, Result};

/// Messages for the single-party objects.
pub mod rlwe;

/// Messages for the protocol shares.
pub mod mhe;

/// Encode an optional seed; an absent seed is encoded as no bytes.
pub(crate) fn seed_to_bytes(seed: &Option<Seed>) -> Vec<u8> {
    seed.map(|s| s.to_vec()).unwrap_or_default()
}

/// Decode an optional seed.
pub(crate) fn seed_from_bytes(bytes: &[u8]) -> Result<Option<Seed>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let seed = Seed::try_from(bytes).map_err(|_| Error::SerializationError)?;
    Ok(Some(seed))
}
