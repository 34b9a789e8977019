//! Collective generation of relinearization keys.
//!
//! Unlike the other gadget keys, the relinearization key is generated in a
//! single round from the collective public key: each party publishes public
//! key encryptions of zero with `s_i*g[i][j]` added to their second row, so
//! that the sum is a gadget encryption of `s^2` under `s`. Both rows are
//! exchanged and no seed is involved.

use crate::mhe::{shares::Share, RelinearizationKeyShare, Scratch};
use crate::rlwe::{GadgetShape, Parameters, PublicKey, RelinearizationKey, SecretKey};
use crate::Result;
use mhe_math::rq::Representation;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct RelinearizationKeyGenConfig {
    par: Arc<Parameters>,
}

/// The collective relinearization key generation protocol.
#[derive(Debug)]
pub struct RelinearizationKeyGenProtocol {
    config: Arc<RelinearizationKeyGenConfig>,
    scratch: Scratch,
}

impl RelinearizationKeyGenProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self {
            config: Arc::new(RelinearizationKeyGenConfig { par: par.clone() }),
            scratch: Scratch::new(),
        }
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            scratch: Scratch::new(),
        }
    }

    /// A zero share of the given shape.
    pub fn allocate_share(&self, shape: GadgetShape) -> Result<RelinearizationKeyShare> {
        let par = &self.config.par;
        let decomposer = shape.decomposer(par)?;
        let zero = par
            .ring()
            .zero(shape.level_q, shape.level_p, Representation::Ntt)?;
        let rows = vec![vec![zero; decomposer.digit_count()]; decomposer.rns_count()];
        Ok(RelinearizationKeyShare {
            par: par.clone(),
            b: rows.clone(),
            a: rows,
            shape,
        })
    }

    /// Writes into `share` the rows `(u*pk0 + e0, u*pk1 + e1 + s_i*g[i][j])`
    /// of the party holding `sk`, with a fresh ephemeral `u` per row.
    ///
    /// Returns a `ShapeMismatch` error if the collective public key is at
    /// lower levels than the share.
    pub fn gen_share(
        &mut self,
        sk: &SecretKey,
        pk: &PublicKey,
        share: &mut RelinearizationKeyShare,
    ) -> Result<()> {
        let par = &self.config.par;
        let shape = share.shape;
        trace!(
            level_q = shape.level_q,
            level_p = ?shape.level_p,
            base_two = shape.base_two,
            "generating a relinearization key share"
        );
        let decomposer = shape.decomposer(par)?;
        let s = sk.q_at_level(shape.level_q)?;

        let mut b = Vec::with_capacity(decomposer.rns_count());
        let mut a = Vec::with_capacity(decomposer.rns_count());
        for i in 0..decomposer.rns_count() {
            let mut b_row = Vec::with_capacity(decomposer.digit_count());
            let mut a_row = Vec::with_capacity(decomposer.digit_count());
            for j in 0..decomposer.digit_count() {
                let (mut b_ij, mut a_ij) =
                    pk.encrypt_zero(shape.level_q, shape.level_p, &mut self.scratch.rng)?;
                a_ij.q.fma_scalar_rns(&s, &decomposer.gadget_factor(i, j));
                b_ij.to_montgomery();
                a_ij.to_montgomery();
                b_row.push(b_ij);
                a_row.push(a_ij);
            }
            b.push(b_row);
            a.push(a_row);
        }

        share.b = b;
        share.a = a;
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares have different
    /// shapes.
    pub fn aggregate_shares(
        &self,
        a: &RelinearizationKeyShare,
        b: &RelinearizationKeyShare,
        out: &mut RelinearizationKeyShare,
    ) -> Result<()> {
        RelinearizationKeyShare::aggregate(a, b, out)?;
        debug!(
            level_q = out.shape.level_q,
            level_p = ?out.shape.level_p,
            "aggregated relinearization key shares"
        );
        Ok(())
    }

    /// Writes the relinearization key defined by the aggregated `share` into
    /// `key`.
    ///
    /// Returns a `ShapeMismatch` error if the shape of `key` differs from the
    /// shape of the share.
    pub fn finalize(
        &self,
        share: &RelinearizationKeyShare,
        key: &mut RelinearizationKey,
    ) -> Result<()> {
        key.gadget.shape.check_eq(&share.shape)?;
        key.gadget.b = share.b.clone();
        key.gadget.a = share.a.clone();
        key.gadget.seed = None;
        debug!(
            level_q = share.shape.level_q,
            level_p = ?share.shape.level_p,
            "finalized the relinearization key"
        );
        Ok(())
    }
}
