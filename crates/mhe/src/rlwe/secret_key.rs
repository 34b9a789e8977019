//! Secret keys

use crate::rlwe::{Ciphertext, Parameters, Seed};
use crate::{mhe::CrpGenerator, Error, Result};
use mhe_math::rq::{Poly, PolyQP, Representation};
use mhe_traits::{FheDecrypter, FheEncrypter, FheParametrized};
use rand::{CryptoRng, RngCore};
use std::{ops::AddAssign, sync::Arc};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Secret key: a polynomial over QP at the maximum levels, in NTT
/// representation.
///
/// Freshly sampled keys are small; the keys output by the threshold
/// combination are additive shares of a small key and are not small.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct SecretKey {
    pub(crate) par: Arc<Parameters>,
    pub(crate) value: PolyQP,
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.value.zeroize();
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize()
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl FheParametrized for SecretKey {
    type Parameters = Parameters;
}

impl SecretKey {
    /// Generate a random [`SecretKey`] whose coefficients follow a centered
    /// binomial distribution of the secret variance of the parameters.
    pub fn random<R: RngCore + CryptoRng>(par: &Arc<Parameters>, rng: &mut R) -> Result<Self> {
        let value = par.ring.small(
            par.max_level_q(),
            par.max_level_p(),
            Representation::Ntt,
            par.secret_variance(),
            rng,
        )?;
        Ok(Self {
            par: par.clone(),
            value,
        })
    }

    /// Generate a [`SecretKey`] from its coefficients.
    pub fn new(coeffs: &[i64], par: &Arc<Parameters>) -> Result<Self> {
        let value = par.ring.from_i64(
            coeffs,
            par.max_level_q(),
            par.max_level_p(),
            Representation::Ntt,
        )?;
        Ok(Self {
            par: par.clone(),
            value,
        })
    }

    /// The secret key 0.
    pub fn zero(par: &Arc<Parameters>) -> Result<Self> {
        let value = par
            .ring
            .zero(par.max_level_q(), par.max_level_p(), Representation::Ntt)?;
        Ok(Self {
            par: par.clone(),
            value,
        })
    }

    /// Create a [`SecretKey`] from a polynomial over QP at the maximum levels.
    pub fn from_poly(mut value: PolyQP, par: &Arc<Parameters>) -> Result<Self> {
        if value.level_q() != par.max_level_q() || value.level_p() != par.max_level_p() {
            return Err(Error::ShapeMismatch(format!(
                "A secret key is defined at levels ({}, {:?}), got ({}, {:?})",
                par.max_level_q(),
                par.max_level_p(),
                value.level_q(),
                value.level_p()
            )));
        }
        value.change_representation(Representation::Ntt);
        Ok(Self {
            par: par.clone(),
            value,
        })
    }

    /// The secret polynomial over QP.
    pub fn poly(&self) -> &PolyQP {
        &self.value
    }

    /// The secret restricted to the given levels.
    pub fn at_level(&self, level_q: usize, level_p: Option<usize>) -> Result<Zeroizing<PolyQP>> {
        self.par.check_levels(level_q, level_p)?;
        Ok(Zeroizing::new(self.value.at_level(level_q, level_p)?))
    }

    /// The secret modulo the moduli of Q up to `level`.
    pub fn q_at_level(&self, level: usize) -> Result<Zeroizing<Poly>> {
        Ok(Zeroizing::new(self.value.q.at_level(level)?))
    }

    /// The image of the secret by the automorphism x -> x^galois_element.
    pub fn automorphism(&self, galois_element: usize) -> Result<Self> {
        Ok(Self {
            par: self.par.clone(),
            value: self.value.automorphism(galois_element)?,
        })
    }

    /// Encrypt `pt` with the uniform polynomial generated from `seed`.
    pub fn encrypt_with_seed<R: RngCore + CryptoRng>(
        &self,
        pt: &Poly,
        seed: Seed,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let a = CrpGenerator::new(seed).sample_q(self.par.ctx_q(), pt.level());
        let mut ct = self.encrypt_with_a(pt, a, rng)?;
        ct.seed = Some(seed);
        Ok(ct)
    }

    /// An encryption of zero over QP with the uniform polynomial `a`:
    /// returns `-a*s + e` at the levels of `a`.
    pub fn encrypt_zero_with_a<R: RngCore + CryptoRng>(
        &self,
        a: &PolyQP,
        rng: &mut R,
    ) -> Result<PolyQP> {
        let (level_q, level_p) = (a.level_q(), a.level_p());
        let s = self.at_level(level_q, level_p)?;
        let mut a_s = Zeroizing::new(a.clone());
        a_s.change_representation(Representation::Ntt);
        *a_s *= &*s;
        let mut b = self.par.ring.gaussian(
            level_q,
            level_p,
            Representation::Ntt,
            self.par.error_std(),
            self.par.error_bound(),
            rng,
        )?;
        b -= &*a_s;
        Ok(b)
    }

    /// An encryption of zero `(b, a)` over QP with a fresh uniform `a`.
    pub fn encrypt_zero<R: RngCore + CryptoRng>(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        rng: &mut R,
    ) -> Result<(PolyQP, PolyQP)> {
        let a = self
            .par
            .ring
            .random(level_q, level_p, Representation::Ntt, rng)?;
        Ok((self.encrypt_zero_with_a(&a, rng)?, a))
    }

    /// An encryption of zero `(b, a)` over QP with `a` generated from `seed`.
    pub fn encrypt_zero_with_seed<R: RngCore + CryptoRng>(
        &self,
        seed: Seed,
        level_q: usize,
        level_p: Option<usize>,
        rng: &mut R,
    ) -> Result<(PolyQP, PolyQP)> {
        let a = CrpGenerator::new(seed).sample_qp(&self.par.ring, level_q, level_p)?;
        Ok((self.encrypt_zero_with_a(&a, rng)?, a))
    }

    fn encrypt_with_a<R: RngCore + CryptoRng>(
        &self,
        pt: &Poly,
        a: Poly,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        let level = pt.level();
        let mut m = pt.clone();
        m.change_representation(Representation::Ntt);

        let s = self.q_at_level(level)?;
        let a_s = Zeroizing::new(&a * &*s);
        let mut b = Poly::gaussian(
            self.par.ctx_q(),
            level,
            Representation::Ntt,
            self.par.error_std(),
            self.par.error_bound(),
            rng,
        )?;
        b -= &*a_s;
        b += &m;
        Ciphertext::new(vec![b, a], &self.par)
    }
}

impl AddAssign<&SecretKey> for SecretKey {
    fn add_assign(&mut self, rhs: &SecretKey) {
        self.value += &rhs.value
    }
}

impl FheEncrypter<Poly, Ciphertext> for SecretKey {
    type Error = Error;

    /// Encrypt a polynomial modulo Q as `(-a*s + e + pt, a)` at the level of
    /// `pt`.
    fn try_encrypt<R: RngCore + CryptoRng>(&self, pt: &Poly, rng: &mut R) -> Result<Ciphertext> {
        let a = Poly::random(self.par.ctx_q(), pt.level(), Representation::Ntt, rng);
        self.encrypt_with_a(pt, a, rng)
    }
}

impl FheDecrypter<Poly, Ciphertext> for SecretKey {
    type Error = Error;

    /// Returns `c0 + c1*s + c2*s^2 + ...` in NTT representation.
    fn try_decrypt(&self, ct: &Ciphertext) -> Result<Poly> {
        let s = self.q_at_level(ct.level)?;
        let mut si = s.clone();
        let mut out = ct.c[0].clone();
        for ci in ct.c.iter().skip(1) {
            let mut cis = Zeroizing::new(ci.clone());
            *cis *= &*si;
            out += &*cis;
            *si *= &*s;
        }
        Ok(out)
    }
}
