//! Polynomials over the extended modulus QP, where P is an optional chain of
//! auxiliary moduli used by the hybrid key switching.

use super::{traits::TryConvertFrom, Context, Poly, Representation};
use crate::{proto::RqQp, Error, Result};
use mhe_traits::{DeserializeWithContext, Serialize};
use mhe_util::{sample_vec_cbd, sample_vec_normal};
use prost::Message;
use rand::{CryptoRng, RngCore};
use std::{
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
    sync::Arc,
};
use zeroize::{Zeroize, Zeroizing};

/// The ring R_QP: a context for Q and an optional context for P.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingQP {
    q: Arc<Context>,
    p: Option<Arc<Context>>,
}

impl RingQP {
    /// Creates the ring from the contexts of Q and P.
    ///
    /// Returns an error if the degrees differ or if a modulus appears in both
    /// chains.
    pub fn new(q: Arc<Context>, p: Option<Arc<Context>>) -> Result<Self> {
        if let Some(p) = &p {
            if p.degree != q.degree {
                return Err(Error::Default(
                    "The contexts of Q and P have different degrees".to_string(),
                ));
            }
            if p.moduli.iter().any(|pi| q.moduli.contains(pi)) {
                return Err(Error::Default(
                    "The moduli of Q and P are not distinct".to_string(),
                ));
            }
        }
        Ok(Self { q, p })
    }

    /// Context of the Q moduli.
    pub fn q(&self) -> &Arc<Context> {
        &self.q
    }

    /// Context of the P moduli, if any.
    pub fn p(&self) -> Option<&Arc<Context>> {
        self.p.as_ref()
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.q.degree
    }

    /// Highest level of Q.
    pub fn max_level_q(&self) -> usize {
        self.q.max_level()
    }

    /// Highest level of P, or `None` when there is no P.
    pub fn max_level_p(&self) -> Option<usize> {
        self.p.as_ref().map(|p| p.max_level())
    }

    /// Returns an error if the levels are not supported by the ring.
    pub fn check_levels(&self, level_q: usize, level_p: Option<usize>) -> Result<()> {
        self.q.check_level(level_q)?;
        match (level_p, &self.p) {
            (None, _) => Ok(()),
            (Some(level_p), Some(p)) => p.check_level(level_p),
            (Some(_), None) => Err(Error::Default(
                "A level of P was requested but the ring has no P moduli".to_string(),
            )),
        }
    }

    fn p_context(&self, level_p: Option<usize>) -> Result<Option<&Arc<Context>>> {
        match level_p {
            None => Ok(None),
            Some(_) => self
                .p
                .as_ref()
                .map(Some)
                .ok_or_else(|| Error::Default("The ring has no P moduli".to_string())),
        }
    }

    /// The zero polynomial at the given levels.
    pub fn zero(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        representation: Representation,
    ) -> Result<PolyQP> {
        self.check_levels(level_q, level_p)?;
        let p = match (self.p_context(level_p)?, level_p) {
            (Some(ctx), Some(level)) => Some(Poly::zero(ctx, level, representation)),
            _ => None,
        };
        Ok(PolyQP {
            q: Poly::zero(&self.q, level_q, representation),
            p,
        })
    }

    /// A uniformly random polynomial; the Q part is sampled first, then the
    /// P part, from the same generator.
    pub fn random<R: RngCore + CryptoRng>(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        representation: Representation,
        rng: &mut R,
    ) -> Result<PolyQP> {
        self.check_levels(level_q, level_p)?;
        let q = Poly::random(&self.q, level_q, representation, rng);
        let p = match (self.p_context(level_p)?, level_p) {
            (Some(ctx), Some(level)) => Some(Poly::random(ctx, level, representation, rng)),
            _ => None,
        };
        Ok(PolyQP { q, p })
    }

    /// Lift the same small integer coefficients to both Q and P.
    pub fn from_i64(
        &self,
        coefficients: &[i64],
        level_q: usize,
        level_p: Option<usize>,
        representation: Representation,
    ) -> Result<PolyQP> {
        self.check_levels(level_q, level_p)?;
        let q = Poly::try_convert_from(coefficients, &self.q, level_q, representation)?;
        let p = match (self.p_context(level_p)?, level_p) {
            (Some(ctx), Some(level)) => Some(Poly::try_convert_from(
                coefficients,
                ctx,
                level,
                representation,
            )?),
            _ => None,
        };
        Ok(PolyQP { q, p })
    }

    /// A small polynomial with centered binomial coefficients of variance
    /// `variance`, identical over Q and P.
    pub fn small<R: RngCore + CryptoRng>(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        representation: Representation,
        variance: f32,
        rng: &mut R,
    ) -> Result<PolyQP> {
        let coefficients = Zeroizing::new(
            sample_vec_cbd(self.degree(), variance, rng)
                .map_err(|e| Error::SamplingError(e.to_string()))?,
        );
        self.from_i64(&coefficients, level_q, level_p, representation)
    }

    /// A rounded Gaussian polynomial truncated at `bound`, identical over Q
    /// and P.
    pub fn gaussian<R: RngCore + CryptoRng>(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        representation: Representation,
        std_dev: f64,
        bound: f64,
        rng: &mut R,
    ) -> Result<PolyQP> {
        let coefficients = Zeroizing::new(
            sample_vec_normal(self.degree(), std_dev, bound, rng)
                .map_err(|e| Error::SamplingError(e.to_string()))?,
        );
        self.from_i64(&coefficients, level_q, level_p, representation)
    }
}

/// A polynomial over QP: a polynomial modulo the first moduli of Q and, when
/// present, a polynomial modulo the first moduli of P.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyQP {
    /// Residues modulo Q.
    pub q: Poly,
    /// Residues modulo P.
    pub p: Option<Poly>,
}

impl PolyQP {
    /// Level of the Q part.
    pub fn level_q(&self) -> usize {
        self.q.level()
    }

    /// Level of the P part, `None` when there is no P part.
    pub fn level_p(&self) -> Option<usize> {
        self.p.as_ref().map(|p| p.level())
    }

    /// Representation of the polynomial.
    pub fn representation(&self) -> &Representation {
        self.q.representation()
    }

    /// Change the representation of both parts.
    pub fn change_representation(&mut self, to: Representation) {
        self.q.change_representation(to);
        if let Some(p) = self.p.as_mut() {
            p.change_representation(to)
        }
    }

    /// Convert both parts into the Montgomery domain.
    pub fn to_montgomery(&mut self) {
        self.q.to_montgomery();
        if let Some(p) = self.p.as_mut() {
            p.to_montgomery()
        }
    }

    /// Convert both parts out of the Montgomery domain.
    pub fn from_montgomery(&mut self) {
        self.q.from_montgomery();
        if let Some(p) = self.p.as_mut() {
            p.from_montgomery()
        }
    }

    /// Computes `self += a * b * 2^(-64)` on the rows of `self`.
    ///
    /// Aborts if `a` or `b` lack a P part that `self` has.
    pub fn fma_montgomery(&mut self, a: &PolyQP, b: &PolyQP) {
        self.q.fma_montgomery(&a.q, &b.q);
        if let Some(p) = self.p.as_mut() {
            match (&a.p, &b.p) {
                (Some(ap), Some(bp)) => p.fma_montgomery(ap, bp),
                _ => panic!("Missing P part in the operands"),
            }
        }
    }

    /// Multiply the Q part by one scalar per modulus of Q, and the P part by
    /// one scalar per modulus of P.
    pub fn mul_scalar_rns(&mut self, q_scalars: &[u64], p_scalars: &[u64]) {
        self.q.mul_scalar_rns(q_scalars);
        if let Some(p) = self.p.as_mut() {
            p.mul_scalar_rns(p_scalars)
        }
    }

    /// Montgomery multiplication of the Q part and the P part by one scalar per
    /// modulus.
    pub fn mul_scalar_rns_montgomery(&mut self, q_scalars: &[u64], p_scalars: &[u64]) {
        self.q.mul_scalar_rns_montgomery(q_scalars);
        if let Some(p) = self.p.as_mut() {
            p.mul_scalar_rns_montgomery(p_scalars)
        }
    }

    /// Multiply both parts by a scalar.
    pub fn mul_scalar(&mut self, scalar: u64) {
        self.q.mul_scalar(scalar);
        if let Some(p) = self.p.as_mut() {
            p.mul_scalar(scalar)
        }
    }

    /// Apply the automorphism x -> x^galois_element to both parts.
    pub fn automorphism(&self, galois_element: usize) -> Result<Self> {
        Ok(Self {
            q: self.q.automorphism(galois_element)?,
            p: self
                .p
                .as_ref()
                .map(|p| p.automorphism(galois_element))
                .transpose()?,
        })
    }

    /// Copy of the polynomial restricted to the given levels. The P part is
    /// dropped when `level_p` is `None`.
    pub fn at_level(&self, level_q: usize, level_p: Option<usize>) -> Result<Self> {
        let p = match (&self.p, level_p) {
            (_, None) => None,
            (Some(p), Some(level)) => Some(p.at_level(level)?),
            (None, Some(_)) => {
                return Err(Error::Default(
                    "Cannot restrict to a level of P: the polynomial has no P part".to_string(),
                ))
            }
        };
        Ok(Self {
            q: self.q.at_level(level_q)?,
            p,
        })
    }

    fn check_compatible(&self, other: &Self) {
        assert_eq!(self.level_p(), other.level_p(), "Incompatible levels of P");
    }
}

impl Zeroize for PolyQP {
    fn zeroize(&mut self) {
        self.q.zeroize();
        if let Some(p) = self.p.as_mut() {
            p.zeroize()
        }
    }
}

impl AddAssign<&PolyQP> for PolyQP {
    fn add_assign(&mut self, rhs: &PolyQP) {
        self.check_compatible(rhs);
        self.q += &rhs.q;
        if let (Some(p), Some(rp)) = (self.p.as_mut(), rhs.p.as_ref()) {
            *p += rp
        }
    }
}

impl Add<&PolyQP> for &PolyQP {
    type Output = PolyQP;

    fn add(self, rhs: &PolyQP) -> PolyQP {
        let mut out = self.clone();
        out += rhs;
        out
    }
}

impl SubAssign<&PolyQP> for PolyQP {
    fn sub_assign(&mut self, rhs: &PolyQP) {
        self.check_compatible(rhs);
        self.q -= &rhs.q;
        if let (Some(p), Some(rp)) = (self.p.as_mut(), rhs.p.as_ref()) {
            *p -= rp
        }
    }
}

impl Sub<&PolyQP> for &PolyQP {
    type Output = PolyQP;

    fn sub(self, rhs: &PolyQP) -> PolyQP {
        let mut out = self.clone();
        out -= rhs;
        out
    }
}

impl MulAssign<&PolyQP> for PolyQP {
    fn mul_assign(&mut self, rhs: &PolyQP) {
        self.check_compatible(rhs);
        self.q *= &rhs.q;
        if let (Some(p), Some(rp)) = (self.p.as_mut(), rhs.p.as_ref()) {
            *p *= rp
        }
    }
}

impl Mul<&PolyQP> for &PolyQP {
    type Output = PolyQP;

    fn mul(self, rhs: &PolyQP) -> PolyQP {
        let mut out = self.clone();
        out *= rhs;
        out
    }
}

impl Neg for &PolyQP {
    type Output = PolyQP;

    fn neg(self) -> PolyQP {
        PolyQP {
            q: -&self.q,
            p: self.p.as_ref().map(|p| -p),
        }
    }
}

impl From<&PolyQP> for RqQp {
    fn from(value: &PolyQP) -> Self {
        RqQp {
            q: Some((&value.q).into()),
            p: value.p.as_ref().map(|p| p.into()),
        }
    }
}

impl PolyQP {
    pub(crate) fn try_from_proto(value: &RqQp, ring: &RingQP) -> Result<Self> {
        let q = value.q.as_ref().ok_or(Error::SerializationError)?;
        let q = Poly::try_from_proto(q, &ring.q)?;
        let p = match (&value.p, &ring.p) {
            (None, _) => None,
            (Some(p), Some(ctx)) => Some(Poly::try_from_proto(p, ctx)?),
            (Some(_), None) => return Err(Error::SerializationError),
        };
        if p
            .as_ref()
            .is_some_and(|p| p.representation != q.representation)
        {
            return Err(Error::SerializationError);
        }
        Ok(Self { q, p })
    }
}

impl Serialize for PolyQP {
    fn to_bytes(&self) -> Vec<u8> {
        RqQp::from(self).encode_to_vec()
    }
}

impl DeserializeWithContext for PolyQP {
    type Error = Error;
    type Context = RingQP;

    fn from_bytes(bytes: &[u8], ring: &Arc<RingQP>) -> Result<Self> {
        let value = RqQp::decode(bytes).map_err(|_| Error::SerializationError)?;
        PolyQP::try_from_proto(&value, ring)
    }
}
