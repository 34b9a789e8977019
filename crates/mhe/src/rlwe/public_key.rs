//! Public keys

use crate::proto::{rlwe::PublicKey as PublicKeyProto, seed_from_bytes, seed_to_bytes};
use crate::rlwe::{Ciphertext, Parameters, Seed};
use crate::{mhe::CrpGenerator, Error, Result};
use mhe_math::rq::{Poly, PolyQP, Representation};
use mhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheEncrypter, FheParametrized, Serialize,
};
use prost::Message;
use rand::{CryptoRng, RngCore};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Public key `(b, a)` over QP, with `b = -a*s + e`, in NTT representation.
///
/// When the key was generated from a seed, the seed is kept so that `a` does
/// not need to be transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) par: Arc<Parameters>,
    pub(crate) b: PolyQP,
    pub(crate) a: PolyQP,
    pub(crate) seed: Option<Seed>,
}

impl FheParametrized for PublicKey {
    type Parameters = Parameters;
}

impl PublicKey {
    /// A zero public key at the given levels, to be filled by a protocol.
    pub fn allocate(
        par: &Arc<Parameters>,
        level_q: usize,
        level_p: Option<usize>,
    ) -> Result<Self> {
        par.check_levels(level_q, level_p)?;
        let zero = par.ring.zero(level_q, level_p, Representation::Ntt)?;
        Ok(Self {
            par: par.clone(),
            b: zero.clone(),
            a: zero,
            seed: None,
        })
    }

    /// Level of Q.
    pub fn level_q(&self) -> usize {
        self.b.level_q()
    }

    /// Level of P.
    pub fn level_p(&self) -> Option<usize> {
        self.b.level_p()
    }

    /// The seed of `a`, if any.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The first component, `-a*s + e`.
    pub fn b(&self) -> &PolyQP {
        &self.b
    }

    /// The second component, uniform.
    pub fn a(&self) -> &PolyQP {
        &self.a
    }
}

impl PublicKey {
    /// An encryption of zero `(u*b + e0, u*a + e1)` over QP at the given
    /// levels, for a fresh small `u`.
    pub fn encrypt_zero<R: RngCore + CryptoRng>(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        rng: &mut R,
    ) -> Result<(PolyQP, PolyQP)> {
        if level_q > self.level_q() || level_p > self.level_p() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot encrypt at levels ({level_q}, {level_p:?}) with a public key at levels ({}, {:?})",
                self.level_q(),
                self.level_p()
            )));
        }
        let ring = &self.par.ring;
        let u = Zeroizing::new(ring.small(
            level_q,
            level_p,
            Representation::Ntt,
            self.par.secret_variance(),
            rng,
        )?);
        let mut b = &*u * &self.b.at_level(level_q, level_p)?;
        let mut a = &*u * &self.a.at_level(level_q, level_p)?;
        for c in [&mut b, &mut a] {
            *c += &ring.gaussian(
                level_q,
                level_p,
                Representation::Ntt,
                self.par.error_std(),
                self.par.error_bound(),
                rng,
            )?;
        }
        Ok((b, a))
    }
}

impl FheEncrypter<Poly, Ciphertext> for PublicKey {
    type Error = Error;

    /// Encrypt a polynomial modulo Q as `(u*b + e0 + pt, u*a + e1)` at the
    /// level of `pt`, using the Q part of the key.
    fn try_encrypt<R: RngCore + CryptoRng>(&self, pt: &Poly, rng: &mut R) -> Result<Ciphertext> {
        let level = pt.level();
        if level > self.level_q() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot encrypt at level {level} with a public key at level {}",
                self.level_q()
            )));
        }
        let ctx = self.par.ctx_q();
        let u = Zeroizing::new(Poly::small(
            ctx,
            level,
            Representation::Ntt,
            self.par.secret_variance(),
            rng,
        )?);
        let mut c0 = Poly::gaussian(
            ctx,
            level,
            Representation::Ntt,
            self.par.error_std(),
            self.par.error_bound(),
            rng,
        )?;
        let mut c1 = Poly::gaussian(
            ctx,
            level,
            Representation::Ntt,
            self.par.error_std(),
            self.par.error_bound(),
            rng,
        )?;
        c0 += &(&*u * &self.b.q.at_level(level)?);
        c1 += &(&*u * &self.a.q.at_level(level)?);
        let mut m = pt.clone();
        m.change_representation(Representation::Ntt);
        c0 += &m;
        Ciphertext::new(vec![c0, c1], &self.par)
    }
}

impl From<&PublicKey> for PublicKeyProto {
    fn from(pk: &PublicKey) -> Self {
        PublicKeyProto {
            b: pk.b.to_bytes(),
            a: if pk.seed.is_some() {
                vec![]
            } else {
                pk.a.to_bytes()
            },
            seed: seed_to_bytes(&pk.seed),
            level_q: pk.level_q() as u32,
            level_p: pk.level_p().map(|l| l as u32),
        }
    }
}

impl Serialize for PublicKey {
    fn to_bytes(&self) -> Vec<u8> {
        PublicKeyProto::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for PublicKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = PublicKeyProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let level_q = value.level_q as usize;
        let level_p = value.level_p.map(|l| l as usize);
        par.check_levels(level_q, level_p)
            .map_err(|_| Error::SerializationError)?;

        let b = PolyQP::from_bytes(&value.b, &par.ring).map_err(|_| Error::SerializationError)?;
        let seed = seed_from_bytes(&value.seed)?;
        let a = match seed {
            Some(seed) => CrpGenerator::new(seed).sample_qp(&par.ring, level_q, level_p)?,
            None => PolyQP::from_bytes(&value.a, &par.ring)
                .map_err(|_| Error::SerializationError)?,
        };
        if b.level_q() != level_q
            || b.level_p() != level_p
            || a.level_q() != level_q
            || a.level_p() != level_p
            || *b.representation() != Representation::Ntt
            || *a.representation() != Representation::Ntt
        {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            b,
            a,
            seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKey;
    use crate::mhe::PublicKeyGenProtocol;
    use crate::rlwe::{noise::log2_std, Parameters, SecretKey, Seed};
    use mhe_math::rq::{Poly, Representation};
    use mhe_traits::{DeserializeParametrized, FheDecrypter, FheEncrypter, Serialize};
    use rand::{thread_rng, Rng};
    use std::error::Error;

    #[test]
    fn encrypt_and_serialize() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 1, 16);
        let sk = SecretKey::random(&par, &mut rng)?;
        let mut seed = Seed::default();
        rng.fill(&mut seed);

        let mut protocol = PublicKeyGenProtocol::new(&par);
        let mut share = protocol.allocate_share(2, Some(0))?;
        protocol.gen_share(&sk, seed, &mut share)?;
        let mut pk = PublicKey::allocate(&par, 2, Some(0))?;
        protocol.finalize(&share, &mut pk)?;
        assert_eq!(pk.seed(), Some(seed));

        for level in 0..3 {
            let m = Poly::random(par.ctx_q(), level, Representation::Ntt, &mut rng);
            let ct = pk.try_encrypt(&m, &mut rng)?;
            let noise = &sk.try_decrypt(&ct)? - &m;
            // e0 + u*e + e1*s
            assert!(log2_std(&noise)? <= (3.0 * 16.0f64).sqrt().log2() + par.error_std().log2() + 1.0);
        }

        let bytes = pk.to_bytes();
        assert_eq!(PublicKey::from_bytes(&bytes, &par)?, pk);
        pk.seed = None;
        let unseeded = pk.to_bytes();
        assert!(bytes.len() < unseeded.len());
        assert_eq!(PublicKey::from_bytes(&unseeded, &par)?, pk);

        let (b, a) = pk.encrypt_zero(1, Some(0), &mut rng)?;
        let e = &b + &(&a * &*sk.at_level(1, Some(0))?);
        assert!(log2_std(&e.q)? <= (3.0 * 16.0f64).sqrt().log2() + par.error_std().log2() + 1.0);
        assert!(pk.encrypt_zero(1, Some(1), &mut rng).is_err());
        Ok(())
    }
}
