//! Single-party RLWE objects over the rings R_Q and R_QP: parameters, keys,
//! ciphertexts, gadget ciphertexts and the operations consuming them.

mod ciphertext;
mod evaluator;
pub(crate) mod gadget;
pub(crate) mod keys;
mod parameters;
mod public_key;
mod secret_key;

pub mod noise;

pub use ciphertext::Ciphertext;
pub use evaluator::Evaluator;
pub use gadget::{GadgetCiphertext, GadgetShape};
pub use keys::{EvaluationKey, GaloisKey, RelinearizationKey};
pub use parameters::{Parameters, ParametersBuilder};
pub use public_key::PublicKey;
pub use secret_key::SecretKey;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed of the generator of the public uniform polynomials.
pub type Seed = <ChaCha8Rng as SeedableRng>::Seed;
