//! Collective encryption of the product of two additively shared values.
//!
//! The parties hold shares `m_i` of a message and `s_i` of the secret, and
//! produce an encryption of `sum(m_i) * sum(s_i)` under `sum(s_i)` without
//! reconstructing either sum. The protocol uses an ephemeral secret
//! `u = sum(u_i)`:
//!
//! 1. the parties produce a gadget encryption of `-u` under `s`;
//! 2. each party publishes `RLWE_u(m_i)` and `RLWE_{s_i}(0)`, both with the
//!    uniform polynomial generated from a common seed.
//!
//! The gadget product of the aggregated `RLWE_s(0)` with the encryption of
//! `-u`, plus the aggregated `RLWE_u(m)`, is an encryption of `m * s`.

use crate::mhe::{
    shares::Share, CircularCiphertextShare, GadgetCiphertextProtocol, GadgetCiphertextShare,
    Scratch,
};
use crate::rlwe::{Ciphertext, Evaluator, GadgetCiphertext, GadgetShape, Parameters, SecretKey, Seed};
use crate::{Error, Result};
use mhe_math::rq::{Poly, Representation};
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use tracing::{debug, trace};
use zeroize::Zeroizing;

#[derive(Debug)]
struct CircularCiphertextConfig {
    par: Arc<Parameters>,
    helper_shape: GadgetShape,
    evaluator: Evaluator,
}

/// The collective circular ciphertext protocol, with the encryption of the
/// ephemeral secret of shape `helper_shape`.
#[derive(Debug)]
pub struct CircularCiphertextProtocol {
    config: Arc<CircularCiphertextConfig>,
    gadget: GadgetCiphertextProtocol,
    scratch: Scratch,
}

impl CircularCiphertextProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>, helper_shape: GadgetShape) -> Result<Self> {
        helper_shape.decomposer(par)?;
        Ok(Self {
            config: Arc::new(CircularCiphertextConfig {
                par: par.clone(),
                helper_shape,
                evaluator: Evaluator::new(par),
            }),
            gadget: GadgetCiphertextProtocol::new(par),
            scratch: Scratch::new(),
        })
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            gadget: self.gadget.shallow_copy(),
            scratch: Scratch::new(),
        }
    }

    /// The shape of the encryption of the ephemeral secret.
    pub fn helper_shape(&self) -> &GadgetShape {
        &self.config.helper_shape
    }

    /// Samples the ephemeral secret `u_i` of the party holding `sk`, and
    /// returns it with the party's share of the gadget encryption of `-u`
    /// under `s`, generated from `seed`.
    pub fn gen_ephemeral_secret<R: RngCore + CryptoRng>(
        &mut self,
        sk: &SecretKey,
        seed: Seed,
        rng: &mut R,
    ) -> Result<(SecretKey, GadgetCiphertextShare)> {
        let shape = self.config.helper_shape;
        trace!(
            level_q = shape.level_q,
            level_p = ?shape.level_p,
            "generating an ephemeral secret"
        );
        let u = SecretKey::random(&self.config.par, rng)?;
        let minus_u = Zeroizing::new(-&*u.q_at_level(shape.level_q)?);
        let mut share = self.gadget.allocate_share(shape)?;
        self.gadget.gen_share(sk, &minus_u, seed, &mut share)?;
        Ok((u, share))
    }

    /// Sets `out = a + b` for shares of the encryption of the ephemeral
    /// secret.
    pub fn aggregate_ephemeral_shares(
        &self,
        a: &GadgetCiphertextShare,
        b: &GadgetCiphertextShare,
        out: &mut GadgetCiphertextShare,
    ) -> Result<()> {
        self.gadget.aggregate_shares(a, b, out)
    }

    /// Returns the gadget encryption of `-u` under `s` defined by the
    /// aggregated `share`.
    pub fn finalize_ephemeral(&self, share: &GadgetCiphertextShare) -> Result<GadgetCiphertext> {
        let mut helper = GadgetCiphertext::allocate(&self.config.par, self.config.helper_shape)?;
        self.gadget.finalize(share, &mut helper)?;
        Ok(helper)
    }

    /// A zero share at `level`.
    pub fn allocate_share(&self, level: usize) -> Result<CircularCiphertextShare> {
        let par = &self.config.par;
        par.check_levels(level, None)?;
        let zero = Poly::zero(par.ctx_q(), level, Representation::Ntt);
        Ok(CircularCiphertextShare {
            par: par.clone(),
            seed: None,
            ct_u: zero.clone(),
            ct_s: zero,
            level,
        })
    }

    /// Writes into `share` the first polynomials of `RLWE_u(m_i)` and
    /// `RLWE_{s_i}(0)`, where `u` is the ephemeral secret of the party holding
    /// `sk`, both with the uniform polynomial generated from `seed`.
    pub fn gen_share(
        &mut self,
        sk: &SecretKey,
        u: &SecretKey,
        m: &Poly,
        seed: Seed,
        share: &mut CircularCiphertextShare,
    ) -> Result<()> {
        let level = share.level;
        trace!(level_q = level, "generating a circular ciphertext share");
        check_message(&self.config.par, m, level)?;
        let m = m.at_level(level)?;
        let zero = Poly::zero(self.config.par.ctx_q(), level, Representation::Ntt);
        let ct_u = u.encrypt_with_seed(&m, seed, &mut self.scratch.rng)?;
        let ct_s = sk.encrypt_with_seed(&zero, seed, &mut self.scratch.rng)?;
        share.ct_u = ct_u.c[0].clone();
        share.ct_s = ct_s.c[0].clone();
        share.seed = Some(seed);
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares were generated from
    /// different seeds or at different levels.
    pub fn aggregate_shares(
        &self,
        a: &CircularCiphertextShare,
        b: &CircularCiphertextShare,
        out: &mut CircularCiphertextShare,
    ) -> Result<()> {
        CircularCiphertextShare::aggregate(a, b, out)?;
        debug!(level_q = out.level, "aggregated circular ciphertext shares");
        Ok(())
    }

    /// Returns the encryption of `m * s` under `s` defined by the aggregated
    /// `share` and the encryption `helper` of `-u`, at the lowest level of
    /// `share` and `helper`.
    pub fn finalize(
        &self,
        share: &CircularCiphertextShare,
        helper: &GadgetCiphertext,
    ) -> Result<Ciphertext> {
        self.finalize_at_level(share, helper, share.level.min(helper.level_q()))
    }

    /// Returns the encryption of `m * s` under `s` at `level`.
    ///
    /// Returns a `ShapeMismatch` error if `level` exceeds the level of the
    /// share or of `helper`, and an `InvalidParameter` error if the share was
    /// not generated.
    pub fn finalize_at_level(
        &self,
        share: &CircularCiphertextShare,
        helper: &GadgetCiphertext,
        level: usize,
    ) -> Result<Ciphertext> {
        if level > share.level || level > helper.level_q() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot finalize at level {level} a share at level {} with a helper at level {}",
                share.level,
                helper.level_q()
            )));
        }
        if share.seed.is_none() {
            return Err(Error::InvalidParameter(
                "The share was not generated".to_string(),
            ));
        }
        let (d0, d1) = self.product(
            &share.ct_u.at_level(level)?,
            &share.ct_s.at_level(level)?,
            helper,
        )?;
        debug!(level_q = level, "finalized the circular ciphertext");
        Ciphertext::new(vec![d0, d1], &self.config.par)
    }

    /// The pair `(d0, d1 + ct_u)` where `(d0, d1)` is the gadget product of
    /// `ct_s` with `helper`.
    pub(crate) fn product(
        &self,
        ct_u: &Poly,
        ct_s: &Poly,
        helper: &GadgetCiphertext,
    ) -> Result<(Poly, Poly)> {
        let (d0, mut d1) = self.config.evaluator.gadget_product(ct_s, helper)?;
        d1 += ct_u;
        Ok((d0, d1))
    }
}

/// Returns a `ShapeMismatch` error unless `m` is defined modulo Q at a level
/// at least `level`.
pub(crate) fn check_message(par: &Parameters, m: &Poly, level: usize) -> Result<()> {
    if m.ctx() != par.ctx_q() || m.level() < level {
        Err(Error::ShapeMismatch(format!(
            "The message at level {} cannot be encrypted at level {level}",
            m.level()
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::CircularCiphertextProtocol;
    use crate::mhe::{
        noise::noise_circular_ciphertext,
        test_utils::{random_seed, secret_keys},
        AggregateIter, CircularCiphertextShare, GadgetCiphertextShare,
    };
    use crate::rlwe::{noise::log2_std, GadgetShape, Parameters};
    use crate::Error as MheError;
    use mhe_math::rq::{Poly, Representation};
    use mhe_traits::{DeserializeParametrized, FheDecrypter, Serialize};
    use rand::thread_rng;
    use std::error::Error;

    const NUM_PARTIES: usize = 3;

    #[test]
    fn circular_ciphertext() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, sk) = secret_keys(&par, NUM_PARTIES);

        for helper_shape in [
            GadgetShape::new(2, Some(1), 0),
            GadgetShape::new(2, Some(0), 0),
        ] {
            let mut protocol = CircularCiphertextProtocol::new(&par, helper_shape)?;
            let helper_seed = random_seed();
            let (ephemeral, helper_shares): (Vec<_>, Vec<_>) = keys
                .iter()
                .map(|k| protocol.gen_ephemeral_secret(k, helper_seed, &mut rng))
                .collect::<crate::Result<Vec<_>>>()?
                .into_iter()
                .unzip();
            let helper_share: GadgetCiphertextShare = helper_shares.into_iter().aggregate()?;
            let helper = protocol.finalize_ephemeral(&helper_share)?;

            let seed = random_seed();
            let messages = (0..NUM_PARTIES)
                .map(|_| Poly::random(par.ctx_q(), 2, Representation::Ntt, &mut rng))
                .collect::<Vec<_>>();
            let shares = keys
                .iter()
                .zip(ephemeral.iter())
                .zip(messages.iter())
                .map(|((k, u), m)| {
                    let mut share = protocol.allocate_share(2)?;
                    protocol.gen_share(k, u, m, seed, &mut share)?;
                    Ok(share)
                })
                .collect::<crate::Result<Vec<_>>>()?;
            assert_eq!(
                CircularCiphertextShare::from_bytes(&shares[0].to_bytes(), &par)?,
                shares[0]
            );
            let share: CircularCiphertextShare = shares.into_iter().aggregate()?;

            let mut m = Poly::zero(par.ctx_q(), 2, Representation::Ntt);
            messages.iter().for_each(|mi| m += mi);
            let s = sk.q_at_level(2)?;
            for level in [2, 1] {
                let ct = protocol.finalize_at_level(&share, &helper, level)?;
                let expected = &m.at_level(level)? * &s.at_level(level)?;
                let noise = &sk.try_decrypt(&ct)? - &expected;
                let bound = noise_circular_ciphertext(&par, &helper_shape, level, NUM_PARTIES)?;
                assert!(log2_std(&noise)? <= bound.log2() + 1.0);
            }
            assert_eq!(protocol.finalize(&share, &helper)?.level(), 2);
        }
        Ok(())
    }

    #[test]
    fn mismatches() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, _) = secret_keys(&par, 2);
        let mut protocol = CircularCiphertextProtocol::new(&par, GadgetShape::new(1, Some(1), 0))?;
        let (u, helper_share) = protocol.gen_ephemeral_secret(&keys[0], random_seed(), &mut rng)?;
        let helper = protocol.finalize_ephemeral(&helper_share)?;
        let m = Poly::random(par.ctx_q(), 2, Representation::Ntt, &mut rng);

        let mut a = protocol.allocate_share(2)?;
        protocol.gen_share(&keys[0], &u, &m, random_seed(), &mut a)?;
        let mut b = protocol.allocate_share(2)?;
        protocol.gen_share(&keys[1], &u, &m, random_seed(), &mut b)?;
        let mut out = a.clone();
        assert!(matches!(
            protocol.aggregate_shares(&a, &b, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert_eq!(out, a);

        assert!(matches!(
            protocol.finalize_at_level(&a, &helper, 2),
            Err(MheError::ShapeMismatch(_))
        ));
        assert_eq!(protocol.finalize(&a, &helper)?.level(), 1);
        let empty = protocol.allocate_share(1)?;
        assert!(matches!(
            protocol.finalize(&empty, &helper),
            Err(MheError::InvalidParameter(_))
        ));
        let low = m.at_level(0)?;
        assert!(matches!(
            protocol.gen_share(&keys[0], &u, &low, random_seed(), &mut a),
            Err(MheError::ShapeMismatch(_))
        ));
        Ok(())
    }
}
