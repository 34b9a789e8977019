//! Collective generation of gadget ciphertexts.
//!
//! Each party encrypts its message under its secret with the common uniform
//! rows generated from a public seed; only the rows `b[i][j]` are exchanged.

use crate::mhe::{shares::Share, CrpGenerator, GadgetCiphertextShare, Scratch};
use crate::rlwe::{GadgetCiphertext, GadgetShape, Parameters, SecretKey, Seed};
use crate::{Error, Result};
use mhe_math::rq::{Poly, Representation};
use std::sync::Arc;
use tracing::{debug, trace};
use zeroize::Zeroizing;

#[derive(Debug)]
struct GadgetCiphertextConfig {
    par: Arc<Parameters>,
}

/// The collective gadget ciphertext generation protocol: the parties jointly
/// produce a gadget encryption of the sum of their messages under the sum of
/// their secrets.
#[derive(Debug)]
pub struct GadgetCiphertextProtocol {
    config: Arc<GadgetCiphertextConfig>,
    scratch: Scratch,
}

impl GadgetCiphertextProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self {
            config: Arc::new(GadgetCiphertextConfig { par: par.clone() }),
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

    /// The parameters of the protocol.
    pub fn parameters(&self) -> &Arc<Parameters> {
        &self.config.par
    }

    /// A zero share of the given shape.
    pub fn allocate_share(&self, shape: GadgetShape) -> Result<GadgetCiphertextShare> {
        let par = &self.config.par;
        let decomposer = shape.decomposer(par)?;
        let zero = par
            .ring()
            .zero(shape.level_q, shape.level_p, Representation::Ntt)?;
        Ok(GadgetCiphertextShare {
            par: par.clone(),
            seed: None,
            value: vec![vec![zero; decomposer.digit_count()]; decomposer.rns_count()],
            shape,
        })
    }

    /// Writes into `share` the rows `-a[i][j]*s + e[i][j] + m*g[i][j]` of the
    /// party holding `sk` and the message `pt` modulo Q, where the rows
    /// `a[i][j]` are generated from `seed`.
    pub fn gen_share(
        &mut self,
        sk: &SecretKey,
        pt: &Poly,
        seed: Seed,
        share: &mut GadgetCiphertextShare,
    ) -> Result<()> {
        let par = &self.config.par;
        let shape = share.shape;
        trace!(
            level_q = shape.level_q,
            level_p = ?shape.level_p,
            base_two = shape.base_two,
            "generating a gadget ciphertext share"
        );
        if pt.ctx() != par.ctx_q() || pt.level() < shape.level_q {
            return Err(Error::ShapeMismatch(format!(
                "The message at level {} cannot be encrypted at level {}",
                pt.level(),
                shape.level_q
            )));
        }
        let mut m = Zeroizing::new(pt.at_level(shape.level_q)?);
        m.change_representation(Representation::Ntt);

        let decomposer = shape.decomposer(par)?;
        let a = CrpGenerator::new(seed).sample_gadget(par, &shape)?;
        let mut value = Vec::with_capacity(a.len());
        for (i, a_row) in a.iter().enumerate() {
            let mut row = Vec::with_capacity(a_row.len());
            for (j, a_ij) in a_row.iter().enumerate() {
                let mut b_ij = sk.encrypt_zero_with_a(a_ij, &mut self.scratch.rng)?;
                b_ij.q.fma_scalar_rns(&*m, &decomposer.gadget_factor(i, j));
                b_ij.to_montgomery();
                row.push(b_ij);
            }
            value.push(row);
        }

        share.value = value;
        share.seed = Some(seed);
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares were generated from
    /// different seeds or for different shapes.
    pub fn aggregate_shares(
        &self,
        a: &GadgetCiphertextShare,
        b: &GadgetCiphertextShare,
        out: &mut GadgetCiphertextShare,
    ) -> Result<()> {
        GadgetCiphertextShare::aggregate(a, b, out)?;
        debug!(
            level_q = out.shape.level_q,
            level_p = ?out.shape.level_p,
            "aggregated gadget ciphertext shares"
        );
        Ok(())
    }

    /// Writes the gadget ciphertext defined by the aggregated `share` into
    /// `gct`, regenerating the rows `a[i][j]` from the seed.
    ///
    /// Returns a `ShapeMismatch` error if the shape of `gct` differs from the
    /// shape of the share.
    pub fn finalize(
        &self,
        share: &GadgetCiphertextShare,
        gct: &mut GadgetCiphertext,
    ) -> Result<()> {
        gct.shape.check_eq(&share.shape)?;
        let seed = share.seed.ok_or_else(|| {
            Error::InvalidParameter("The share was not generated".to_string())
        })?;
        gct.a =
            CrpGenerator::new(seed).sample_gadget_montgomery(&self.config.par, &share.shape)?;
        gct.b = share.value.clone();
        gct.seed = Some(seed);
        debug!(
            level_q = share.shape.level_q,
            level_p = ?share.shape.level_p,
            "finalized the gadget ciphertext"
        );
        Ok(())
    }
}
