//! Multiparty protocols over additive shares of an RLWE secret.
//!
//! Every protocol follows the same life cycle: a share is allocated for the
//! target levels, populated by each party with `gen_share`, summed in any
//! order with `aggregate_shares` (or the [`Aggregate`] trait), and the fully
//! aggregated share is converted into a key or a ciphertext with `finalize`.
//!
//! A protocol instance holds its immutable configuration behind an `Arc` and
//! its own private randomness; [`shallow_copy`](PublicKeyGenProtocol::shallow_copy)
//! returns an instance sharing the configuration, to be used by another
//! worker.

mod circular;
mod circular_gadget;
mod crp;
mod evaluation_key_gen;
mod gadget_ciphertext_gen;
mod galois_key_gen;
mod key_switch;
mod public_key_gen;
mod relinearization_key_gen;
mod shares;
mod threshold;

pub mod noise;

pub use circular::CircularCiphertextProtocol;
pub use circular_gadget::CircularGadgetCiphertextProtocol;
pub use crp::CrpGenerator;
pub use evaluation_key_gen::EvaluationKeyGenProtocol;
pub use gadget_ciphertext_gen::GadgetCiphertextProtocol;
pub use galois_key_gen::GaloisKeyGenProtocol;
pub use key_switch::{KeySwitchProtocol, KeySwitchTarget, KeySwitchTargetKey};
pub use public_key_gen::PublicKeyGenProtocol;
pub use relinearization_key_gen::RelinearizationKeyGenProtocol;
pub use shares::{
    CircularCiphertextShare, CircularGadgetCiphertextShare, EvaluationKeyShare,
    GadgetCiphertextShare, GaloisKeyShare, KeySwitchingShare, RelinearizationKeyShare,
    ShamirPolynomial, ShamirSecretShare, VectorShare,
};
pub use threshold::{
    validate_threshold_config, Combiner, ShamirPublicPoint, Thresholdizer,
};

pub use crate::rlwe::Seed;

use crate::Result;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Aggregate shares in an MPC protocol.
///
/// The aggregation is commutative and associative, so that the shares can be
/// summed in any order, on any number of threads.
pub trait Aggregate<S>: Sized {
    /// Aggregate shares in an MPC protocol.
    fn from_shares<T>(iter: T) -> Result<Self>
    where
        T: IntoIterator<Item = S>;
}

/// Adds an `aggregate` method to iterators of shares.
pub trait AggregateIter<S>: Iterator<Item = S> + Sized {
    /// Aggregate the shares of the iterator.
    fn aggregate<A: Aggregate<S>>(self) -> Result<A> {
        A::from_shares(self)
    }
}

impl<S, I: Iterator<Item = S>> AggregateIter<S> for I {}

/// Mutable state private to one protocol instance.
#[derive(Debug)]
pub(crate) struct Scratch {
    pub(crate) rng: ChaCha20Rng,
}

impl Scratch {
    pub(crate) fn new() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }
}
