#![crate_name = "mhe"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Multiparty and threshold key management for RLWE-based homomorphic
//! encryption.
//!
//! The [`rlwe`] module holds the single-party objects (parameters, keys,
//! ciphertexts and gadget ciphertexts) and the [`mhe`] module the protocols
//! through which N parties holding additive shares of a secret jointly produce
//! them.

mod errors;
mod proto;

pub mod mhe;
pub mod rlwe;

pub use errors::{Error, ParametersError, Result};
