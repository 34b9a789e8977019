//! Collective key switching of a ciphertext to a secret key or to a public
//! key.
//!
//! The parties holding additive shares of `s_in` re-encrypt a ciphertext
//! `(c0, c1)` under a target key without decrypting it. For a secret key
//! target, each party holds a share `s_out_i` of the target secret; for a
//! public key target, the target public key is known to every party. The
//! shares are flooded with a smudging noise of configurable standard
//! deviation.

use crate::mhe::{shares::Share, KeySwitchingShare, Scratch};
use crate::rlwe::{Ciphertext, Parameters, PublicKey, SecretKey};
use crate::{Error, Result};
use mhe_math::rq::{Poly, Representation};
use std::sync::Arc;
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// The kind of key a [`KeySwitchProtocol`] switches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySwitchTarget {
    /// An additively shared secret key.
    SecretKey = 0,
    /// A public key.
    PublicKey = 1,
}

impl KeySwitchTarget {
    /// The number of polynomials in a share.
    pub const fn share_size(&self) -> usize {
        match self {
            KeySwitchTarget::SecretKey => 1,
            KeySwitchTarget::PublicKey => 2,
        }
    }
}

impl TryFrom<u32> for KeySwitchTarget {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(KeySwitchTarget::SecretKey),
            1 => Ok(KeySwitchTarget::PublicKey),
            _ => Err(Error::SerializationError),
        }
    }
}

/// The target key of a party: its share of the target secret, or the target
/// public key.
#[derive(Debug, Clone, Copy)]
pub enum KeySwitchTargetKey<'a> {
    /// The share of the target secret held by the party.
    SecretKey(&'a SecretKey),
    /// The target public key.
    PublicKey(&'a PublicKey),
}

impl KeySwitchTargetKey<'_> {
    /// The kind of the target key.
    pub const fn kind(&self) -> KeySwitchTarget {
        match self {
            KeySwitchTargetKey::SecretKey(_) => KeySwitchTarget::SecretKey,
            KeySwitchTargetKey::PublicKey(_) => KeySwitchTarget::PublicKey,
        }
    }
}

#[derive(Debug)]
struct KeySwitchConfig {
    par: Arc<Parameters>,
    target: KeySwitchTarget,
    smudging_std: f64,
}

/// The collective key switching protocol, for a kind of target fixed at
/// construction.
#[derive(Debug)]
pub struct KeySwitchProtocol {
    config: Arc<KeySwitchConfig>,
    scratch: Scratch,
}

impl KeySwitchProtocol {
    /// Creates a protocol instance switching to keys of kind `target`, with
    /// a smudging noise of standard deviation `smudging_std`.
    ///
    /// Returns an `InvalidParameter` error unless `smudging_std` is positive
    /// and finite.
    pub fn new(par: &Arc<Parameters>, target: KeySwitchTarget, smudging_std: f64) -> Result<Self> {
        if !smudging_std.is_finite() || smudging_std <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Invalid smudging standard deviation {smudging_std}"
            )));
        }
        Ok(Self {
            config: Arc::new(KeySwitchConfig {
                par: par.clone(),
                target,
                smudging_std,
            }),
            scratch: Scratch::new(),
        })
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            scratch: Scratch::new(),
        }
    }

    /// The kind of the target keys.
    pub fn target(&self) -> KeySwitchTarget {
        self.config.target
    }

    /// The standard deviation of the smudging noise.
    pub fn smudging_std(&self) -> f64 {
        self.config.smudging_std
    }

    /// A zero share at `level`.
    pub fn allocate_share(&self, level: usize) -> Result<KeySwitchingShare> {
        let par = &self.config.par;
        par.check_levels(level, None)?;
        let zero = Poly::zero(par.ctx_q(), level, Representation::Ntt);
        Ok(KeySwitchingShare {
            par: par.clone(),
            target: self.config.target,
            seed: None,
            value: vec![zero; self.config.target.share_size()],
            level,
        })
    }

    /// Writes into `share` the contribution of the party holding `sk_in` to
    /// the switch of `ct_in` to the target key, at the level of the share.
    ///
    /// For a secret key target the share is `(s_in_i - s_out_i)*c1 + e`; for
    /// a public key target it is `(s_in_i*c1 + u_i*pk0 + e, u_i*pk1 + e')`,
    /// where `e` is the smudging noise.
    pub fn gen_share(
        &mut self,
        sk_in: &SecretKey,
        target: KeySwitchTargetKey,
        ct_in: &Ciphertext,
        share: &mut KeySwitchingShare,
    ) -> Result<()> {
        let par = &self.config.par;
        if target.kind() != self.config.target || share.target != self.config.target {
            return Err(Error::ProtocolMismatch(format!(
                "The protocol switches to a {:?} target",
                self.config.target
            )));
        }
        let level = share.level;
        trace!(level_q = level, kind = ?self.config.target, "generating a key switching share");
        if ct_in.len() != 2 || ct_in.level() < level {
            return Err(Error::ShapeMismatch(format!(
                "Cannot switch a ciphertext of size {} at level {} to level {level}",
                ct_in.len(),
                ct_in.level()
            )));
        }

        let c1 = ct_in.c[1].at_level(level)?;
        let mut h0 = Poly::gaussian(
            par.ctx_q(),
            level,
            Representation::Ntt,
            self.config.smudging_std,
            Parameters::ERROR_BOUND_FACTOR * self.config.smudging_std,
            &mut self.scratch.rng,
        )?;
        match target {
            KeySwitchTargetKey::SecretKey(sk_out) => {
                let mut s = sk_in.q_at_level(level)?;
                *s -= &*sk_out.q_at_level(level)?;
                *s *= &c1;
                h0 += &*s;
                share.value = vec![h0];
                share.seed = None;
            }
            KeySwitchTargetKey::PublicKey(pk) => {
                if pk.level_q() < level {
                    return Err(Error::ShapeMismatch(format!(
                        "The public key at level {} cannot switch at level {level}",
                        pk.level_q()
                    )));
                }
                let s = sk_in.q_at_level(level)?;
                h0 += &(&c1 * &*s);
                let u = Zeroizing::new(Poly::small(
                    par.ctx_q(),
                    level,
                    Representation::Ntt,
                    par.secret_variance(),
                    &mut self.scratch.rng,
                )?);
                h0 += &(&*u * &pk.b().q.at_level(level)?);
                let mut h1 = Poly::gaussian(
                    par.ctx_q(),
                    level,
                    Representation::Ntt,
                    par.error_std(),
                    par.error_bound(),
                    &mut self.scratch.rng,
                )?;
                h1 += &(&*u * &pk.a().q.at_level(level)?);
                share.value = vec![h0, h1];
                share.seed = pk.seed();
            }
        }
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares have different
    /// targets or levels, or, for a public key target, were generated for
    /// different public keys.
    pub fn aggregate_shares(
        &self,
        a: &KeySwitchingShare,
        b: &KeySwitchingShare,
        out: &mut KeySwitchingShare,
    ) -> Result<()> {
        KeySwitchingShare::aggregate(a, b, out)?;
        debug!(level_q = out.level, kind = ?out.target, "aggregated key switching shares");
        Ok(())
    }

    /// Returns `ct_in` switched to the target key with the aggregated
    /// `share`, at the lowest level of `ct_in` and `share`.
    pub fn finalize(&self, ct_in: &Ciphertext, share: &KeySwitchingShare) -> Result<Ciphertext> {
        self.finalize_at_level(ct_in, share, ct_in.level().min(share.level))
    }

    /// Returns `ct_in` switched to the target key with the aggregated
    /// `share`, at `level`.
    ///
    /// Returns a `ShapeMismatch` error if `level` exceeds the level of
    /// `ct_in` or of `share`.
    pub fn finalize_at_level(
        &self,
        ct_in: &Ciphertext,
        share: &KeySwitchingShare,
        level: usize,
    ) -> Result<Ciphertext> {
        if share.target != self.config.target {
            return Err(Error::ProtocolMismatch(format!(
                "The protocol switches to a {:?} target",
                self.config.target
            )));
        }
        if level > ct_in.level() || level > share.level || ct_in.len() != 2 {
            return Err(Error::ShapeMismatch(format!(
                "Cannot switch a ciphertext of size {} at level {} with a share at level {} to level {level}",
                ct_in.len(),
                ct_in.level(),
                share.level
            )));
        }
        let mut c0 = ct_in.c[0].at_level(level)?;
        c0 += &share.value[0].at_level(level)?;
        let c1 = match self.config.target {
            KeySwitchTarget::SecretKey => ct_in.c[1].at_level(level)?,
            KeySwitchTarget::PublicKey => share.value[1].at_level(level)?,
        };
        debug!(level_q = level, kind = ?self.config.target, "finalized the key switch");
        Ciphertext::new(vec![c0, c1], &self.config.par)
    }
}

#[cfg(test)]
mod tests {
    use super::{KeySwitchProtocol, KeySwitchTarget, KeySwitchTargetKey};
    use crate::mhe::{
        noise::noise_key_switch,
        test_utils::{random_seed, secret_keys},
        AggregateIter, KeySwitchingShare, PublicKeyGenProtocol,
    };
    use crate::rlwe::{noise::log2_std, Ciphertext, Parameters, PublicKey};
    use crate::Error as MheError;
    use mhe_math::rq::{Poly, Representation};
    use mhe_traits::{DeserializeParametrized, FheDecrypter, FheEncrypter, Serialize};
    use rand::thread_rng;
    use rayon::prelude::*;
    use std::error::Error;

    const NUM_PARTIES: usize = 4;
    const SMUDGING_STD: f64 = 1024.0;

    #[test]
    fn switch_to_secret_key() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 1, 16);
        let (keys_in, sk_in) = secret_keys(&par, NUM_PARTIES);
        let (keys_out, sk_out) = secret_keys(&par, NUM_PARTIES);
        let protocol = KeySwitchProtocol::new(&par, KeySwitchTarget::SecretKey, SMUDGING_STD)?;

        for level in [2, 1] {
            let m = Poly::random(par.ctx_q(), 2, Representation::Ntt, &mut rng);
            let ct: Ciphertext = sk_in.try_encrypt(&m, &mut rng)?;
            let share = keys_in
                .par_iter()
                .zip(keys_out.par_iter())
                .map(|(k_in, k_out)| {
                    let mut protocol = protocol.shallow_copy();
                    let mut share = protocol.allocate_share(level)?;
                    protocol.gen_share(k_in, KeySwitchTargetKey::SecretKey(k_out), &ct, &mut share)?;
                    assert_eq!(
                        KeySwitchingShare::from_bytes(&share.to_bytes(), &par)?,
                        share
                    );
                    Ok(share)
                })
                .try_reduce_with(|a, b| {
                    let mut out = a.clone();
                    protocol.aggregate_shares(&a, &b, &mut out)?;
                    Ok::<_, crate::Error>(out)
                })
                .ok_or("no shares")??;
            assert_eq!(share.value().len(), 1);

            let ct_out = protocol.finalize(&ct, &share)?;
            assert_eq!(ct_out.level(), level);
            let noise = &sk_out.try_decrypt(&ct_out)? - &m.at_level(level)?;
            let bound = noise_key_switch(
                &par,
                KeySwitchTarget::SecretKey,
                NUM_PARTIES,
                par.error_std(),
                SMUDGING_STD,
            );
            assert!(log2_std(&noise)? <= bound.log2() + 1.0);
        }
        Ok(())
    }

    #[test]
    fn switch_to_public_key() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 1, 16);
        let (keys_in, sk_in) = secret_keys(&par, NUM_PARTIES);
        let (keys_out, sk_out) = secret_keys(&par, NUM_PARTIES);

        let seed = random_seed();
        let mut pk_protocol = PublicKeyGenProtocol::new(&par);
        let pk_shares = keys_out
            .iter()
            .map(|k| {
                let mut share = pk_protocol.allocate_share(par.max_level_q(), None)?;
                pk_protocol.gen_share(k, seed, &mut share)?;
                Ok(share)
            })
            .collect::<crate::Result<Vec<_>>>()?;
        let mut pk = PublicKey::allocate(&par, par.max_level_q(), None)?;
        pk_protocol.finalize(&pk_shares.into_iter().aggregate()?, &mut pk)?;

        let mut protocol = KeySwitchProtocol::new(&par, KeySwitchTarget::PublicKey, SMUDGING_STD)?;
        let m = Poly::random(par.ctx_q(), 2, Representation::Ntt, &mut rng);
        let ct: Ciphertext = sk_in.try_encrypt(&m, &mut rng)?;
        let shares = keys_in
            .iter()
            .map(|k| {
                let mut share = protocol.allocate_share(2)?;
                protocol.gen_share(k, KeySwitchTargetKey::PublicKey(&pk), &ct, &mut share)?;
                Ok(share)
            })
            .collect::<crate::Result<Vec<_>>>()?;
        assert_eq!(
            KeySwitchingShare::from_bytes(&shares[0].to_bytes(), &par)?,
            shares[0]
        );
        let share: KeySwitchingShare = shares.into_iter().aggregate()?;
        assert_eq!(share.seed(), Some(seed));
        assert_eq!(share.value().len(), 2);

        for level in [2, 0] {
            let ct_out = protocol.finalize_at_level(&ct, &share, level)?;
            let noise = &sk_out.try_decrypt(&ct_out)? - &m.at_level(level)?;
            let bound = noise_key_switch(
                &par,
                KeySwitchTarget::PublicKey,
                NUM_PARTIES,
                par.error_std(),
                SMUDGING_STD,
            );
            assert!(log2_std(&noise)? <= bound.log2() + 1.0);
        }
        Ok(())
    }

    #[test]
    fn mismatches() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 1, 16);
        let (keys, sk) = secret_keys(&par, 2);
        let m = Poly::random(par.ctx_q(), 2, Representation::Ntt, &mut rng);
        let ct: Ciphertext = sk.try_encrypt(&m, &mut rng)?;
        let mut sk_protocol = KeySwitchProtocol::new(&par, KeySwitchTarget::SecretKey, 8.0)?;
        let pk_protocol = KeySwitchProtocol::new(&par, KeySwitchTarget::PublicKey, 8.0)?;
        assert!(matches!(
            KeySwitchProtocol::new(&par, KeySwitchTarget::SecretKey, 0.0),
            Err(MheError::InvalidParameter(_))
        ));

        let mut a = sk_protocol.allocate_share(2)?;
        sk_protocol.gen_share(&keys[0], KeySwitchTargetKey::SecretKey(&keys[1]), &ct, &mut a)?;
        let mut b = sk_protocol.allocate_share(1)?;
        sk_protocol.gen_share(&keys[1], KeySwitchTargetKey::SecretKey(&keys[0]), &ct, &mut b)?;
        let mut out = a.clone();
        assert!(matches!(
            sk_protocol.aggregate_shares(&a, &b, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        let c = pk_protocol.allocate_share(2)?;
        assert!(matches!(
            sk_protocol.aggregate_shares(&a, &c, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert_eq!(out, a);

        let pk = PublicKey::allocate(&par, 2, None)?;
        assert!(matches!(
            sk_protocol.gen_share(&keys[0], KeySwitchTargetKey::PublicKey(&pk), &ct, &mut a),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert!(matches!(
            sk_protocol.finalize_at_level(&ct, &b, 2),
            Err(MheError::ShapeMismatch(_))
        ));
        let low = ct.at_level(0)?;
        assert!(matches!(
            sk_protocol.gen_share(&keys[0], KeySwitchTargetKey::SecretKey(&keys[1]), &low, &mut a),
            Err(MheError::ShapeMismatch(_))
        ));
        assert_eq!(KeySwitchTarget::try_from(1u32)?, KeySwitchTarget::PublicKey);
        assert!(KeySwitchTarget::try_from(2u32).is_err());
        Ok(())
    }
}
