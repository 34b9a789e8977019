//! Collective gadget encryption of the product of two additively shared
//! values, over Q.
//!
//! This is the circular ciphertext construction applied to every row of a
//! gadget matrix: the output is a gadget ciphertext without P encrypting
//! `sum(m_i) * sum(s_i)` under `sum(s_i)`.

use crate::mhe::{
    circular::check_message, shares::Share, CircularCiphertextProtocol,
    CircularGadgetCiphertextShare, CrpGenerator, GadgetCiphertextShare, Scratch,
};
use crate::rlwe::{GadgetCiphertext, GadgetShape, Parameters, SecretKey, Seed};
use crate::{Error, Result};
use mhe_math::rq::{Poly, PolyQP, Representation};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, trace};

/// The collective circular gadget ciphertext protocol.
#[derive(Debug)]
pub struct CircularGadgetCiphertextProtocol {
    circular: CircularCiphertextProtocol,
    par: Arc<Parameters>,
    scratch: Scratch,
}

impl CircularGadgetCiphertextProtocol {
    /// Creates a protocol instance for the given parameters, with the
    /// encryption of the ephemeral secret of shape `helper_shape`.
    pub fn new(par: &Arc<Parameters>, helper_shape: GadgetShape) -> Result<Self> {
        Ok(Self {
            circular: CircularCiphertextProtocol::new(par, helper_shape)?,
            par: par.clone(),
            scratch: Scratch::new(),
        })
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            circular: self.circular.shallow_copy(),
            par: self.par.clone(),
            scratch: Scratch::new(),
        }
    }

    /// See [`CircularCiphertextProtocol::gen_ephemeral_secret`].
    pub fn gen_ephemeral_secret<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        seed: Seed,
        rng: &mut R,
    ) -> Result<(SecretKey, GadgetCiphertextShare)> {
        self.circular.gen_ephemeral_secret(sk, seed, rng)
    }

    /// See [`CircularCiphertextProtocol::aggregate_ephemeral_shares`].
    pub fn aggregate_ephemeral_shares(
        &self,
        a: &GadgetCiphertextShare,
        b: &GadgetCiphertextShare,
        out: &mut GadgetCiphertextShare,
    ) -> Result<()> {
        self.circular.aggregate_ephemeral_shares(a, b, out)
    }

    /// See [`CircularCiphertextProtocol::finalize_ephemeral`].
    pub fn finalize_ephemeral(&self, share: &GadgetCiphertextShare) -> Result<GadgetCiphertext> {
        self.circular.finalize_ephemeral(share)
    }

    /// A zero share of the given shape.
    ///
    /// Returns an `InvalidParameter` error if the shape has a level of P.
    pub fn allocate_share(&self, shape: GadgetShape) -> Result<CircularGadgetCiphertextShare> {
        if shape.level_p.is_some() {
            return Err(Error::InvalidParameter(
                "A circular gadget ciphertext is defined over Q only".to_string(),
            ));
        }
        let decomposer = shape.decomposer(&self.par)?;
        let zero = Poly::zero(self.par.ctx_q(), shape.level_q, Representation::Ntt);
        let rows = vec![vec![zero; decomposer.digit_count()]; decomposer.rns_count()];
        Ok(CircularGadgetCiphertextShare {
            par: self.par.clone(),
            seed: None,
            ct_u: rows.clone(),
            ct_s: rows,
            shape,
        })
    }

    /// Writes into `share` the rows `RLWE_u(m_i * g[i][j])` and
    /// `RLWE_{s_i}(0)` of the party holding `sk` and `u`, with the uniform
    /// rows generated from `seed`, in the Montgomery domain.
    pub fn gen_share(
        &mut self,
        sk: &SecretKey,
        u: &SecretKey,
        m: &Poly,
        seed: Seed,
        share: &mut CircularGadgetCiphertextShare,
    ) -> Result<()> {
        let shape = share.shape;
        trace!(
            level_q = shape.level_q,
            base_two = shape.base_two,
            "generating a circular gadget ciphertext share"
        );
        check_message(&self.par, m, shape.level_q)?;
        let mut m = m.at_level(shape.level_q)?;
        m.change_representation(Representation::Ntt);

        let decomposer = shape.decomposer(&self.par)?;
        let a = CrpGenerator::new(seed).sample_gadget(&self.par, &shape)?;
        let mut ct_u = Vec::with_capacity(a.len());
        let mut ct_s = Vec::with_capacity(a.len());
        for (i, a_row) in a.iter().enumerate() {
            let mut u_row = Vec::with_capacity(a_row.len());
            let mut s_row = Vec::with_capacity(a_row.len());
            for (j, a_ij) in a_row.iter().enumerate() {
                let mut u_ij = u.encrypt_zero_with_a(a_ij, &mut self.scratch.rng)?.q;
                u_ij.fma_scalar_rns(&m, &decomposer.gadget_factor(i, j));
                u_ij.to_montgomery();
                let mut s_ij = sk.encrypt_zero_with_a(a_ij, &mut self.scratch.rng)?.q;
                s_ij.to_montgomery();
                u_row.push(u_ij);
                s_row.push(s_ij);
            }
            ct_u.push(u_row);
            ct_s.push(s_row);
        }

        share.ct_u = ct_u;
        share.ct_s = ct_s;
        share.seed = Some(seed);
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares were generated from
    /// different seeds or for different shapes.
    pub fn aggregate_shares(
        &self,
        a: &CircularGadgetCiphertextShare,
        b: &CircularGadgetCiphertextShare,
        out: &mut CircularGadgetCiphertextShare,
    ) -> Result<()> {
        CircularGadgetCiphertextShare::aggregate(a, b, out)?;
        debug!(
            level_q = out.shape.level_q,
            "aggregated circular gadget ciphertext shares"
        );
        Ok(())
    }

    /// Writes into `gct` the gadget encryption of `m * s` under `s` defined by
    /// the aggregated `share` and the encryption `helper` of `-u`.
    ///
    /// Returns a `ShapeMismatch` error if the shape of `gct` differs from the
    /// shape of the share or if `helper` is at a lower level.
    pub fn finalize(
        &self,
        share: &CircularGadgetCiphertextShare,
        helper: &GadgetCiphertext,
        gct: &mut GadgetCiphertext,
    ) -> Result<()> {
        gct.shape.check_eq(&share.shape)?;
        if helper.level_q() < share.shape.level_q {
            return Err(Error::ShapeMismatch(format!(
                "The helper at level {} cannot finalize a share at level {}",
                helper.level_q(),
                share.shape.level_q
            )));
        }
        if share.seed.is_none() {
            return Err(Error::InvalidParameter(
                "The share was not generated".to_string(),
            ));
        }

        let rows = share
            .ct_u
            .par_iter()
            .zip(share.ct_s.par_iter())
            .map(|(u_row, s_row)| {
                u_row
                    .iter()
                    .zip(s_row.iter())
                    .map(|(ct_u, ct_s)| {
                        // The digit decomposition requires the standard domain.
                        let (mut ct_u, mut ct_s) = (ct_u.clone(), ct_s.clone());
                        ct_u.from_montgomery();
                        ct_s.from_montgomery();
                        let (d0, d1) = self.circular.product(&ct_u, &ct_s, helper)?;
                        let mut b_ij = PolyQP { q: d0, p: None };
                        let mut a_ij = PolyQP { q: d1, p: None };
                        b_ij.to_montgomery();
                        a_ij.to_montgomery();
                        Ok((b_ij, a_ij))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        let (b, a): (Vec<Vec<PolyQP>>, Vec<Vec<PolyQP>>) = rows
            .into_iter()
            .map(|row| row.into_iter().unzip())
            .unzip();

        gct.b = b;
        gct.a = a;
        gct.seed = None;
        debug!(
            level_q = share.shape.level_q,
            "finalized the circular gadget ciphertext"
        );
        Ok(())
    }
}
