//! Collective generation of evaluation keys.

use crate::mhe::{shares::Share, EvaluationKeyShare, GadgetCiphertextProtocol};
use crate::rlwe::{EvaluationKey, GadgetShape, Parameters, SecretKey, Seed};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, trace};

/// The collective evaluation key generation protocol: the parties jointly
/// produce a key switching key from `sum(s_in_i)` to `sum(s_out_i)`.
#[derive(Debug)]
pub struct EvaluationKeyGenProtocol {
    gadget: GadgetCiphertextProtocol,
}

impl EvaluationKeyGenProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self {
            gadget: GadgetCiphertextProtocol::new(par),
        }
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            gadget: self.gadget.shallow_copy(),
        }
    }

    /// A zero share of the given shape.
    pub fn allocate_share(&self, shape: GadgetShape) -> Result<EvaluationKeyShare> {
        Ok(EvaluationKeyShare {
            share: self.gadget.allocate_share(shape)?,
        })
    }

    /// Writes into `share` the gadget encryption of `sk_in` under `sk_out`
    /// of one party, with the uniform rows generated from `seed`.
    pub fn gen_share(
        &mut self,
        sk_in: &SecretKey,
        sk_out: &SecretKey,
        seed: Seed,
        share: &mut EvaluationKeyShare,
    ) -> Result<()> {
        let shape = share.share.shape;
        trace!(
            level_q = shape.level_q,
            level_p = ?shape.level_p,
            base_two = shape.base_two,
            "generating an evaluation key share"
        );
        let m = sk_in.q_at_level(shape.level_q)?;
        self.gadget.gen_share(sk_out, &m, seed, &mut share.share)
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares were generated from
    /// different seeds or for different shapes.
    pub fn aggregate_shares(
        &self,
        a: &EvaluationKeyShare,
        b: &EvaluationKeyShare,
        out: &mut EvaluationKeyShare,
    ) -> Result<()> {
        a.check_aggregable(b)?;
        self.gadget.aggregate_shares(&a.share, &b.share, &mut out.share)?;
        debug!(
            level_q = out.share.shape.level_q,
            level_p = ?out.share.shape.level_p,
            "aggregated evaluation key shares"
        );
        Ok(())
    }

    /// Writes the evaluation key defined by the aggregated `share` into
    /// `key`.
    ///
    /// Returns a `ShapeMismatch` error if `key` has another shape.
    pub fn finalize(&self, share: &EvaluationKeyShare, key: &mut EvaluationKey) -> Result<()> {
        self.gadget.finalize(&share.share, &mut key.gadget)?;
        debug!(
            level_q = share.share.shape.level_q,
            level_p = ?share.share.shape.level_p,
            "finalized the evaluation key"
        );
        Ok(())
    }
}
