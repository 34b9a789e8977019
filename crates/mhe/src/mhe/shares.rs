//! Shares exchanged by the parties of the protocols.
//!
//! A share is one party's additive contribution to a protocol. Shares of the
//! same protocol instance are summed with the `aggregate_shares` method of
//! the protocol, or with the [`Aggregate`] trait, in any order.

use crate::mhe::{Aggregate, KeySwitchTarget};
use crate::proto::{
    mhe::{
        CircularCiphertextShare as CircularCiphertextShareProto,
        CircularGadgetCiphertextShare as CircularGadgetCiphertextShareProto,
        EvaluationKeyShare as EvaluationKeyShareProto,
        GadgetCiphertextShare as GadgetCiphertextShareProto,
        GaloisKeyShare as GaloisKeyShareProto, KeySwitchingShare as KeySwitchingShareProto,
        RelinearizationKeyShare as RelinearizationKeyShareProto,
        ShamirPolynomial as ShamirPolynomialProto, ShamirSecretShare as ShamirSecretShareProto,
        VectorShare as VectorShareProto,
    },
    seed_from_bytes, seed_to_bytes,
};
use crate::rlwe::{
    gadget::{rows_from_bytes, rows_to_bytes},
    GadgetShape, Parameters, Seed,
};
use crate::{Error, Result};
use mhe_math::rq::{Poly, PolyQP, Representation};
use mhe_traits::{DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize};
use prost::Message;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Checked componentwise sum of shares.
pub(crate) trait Share: Clone {
    /// Returns a `ProtocolMismatch` error unless `self` and `other` belong to
    /// the same protocol instance and have the same structure.
    fn check_aggregable(&self, other: &Self) -> Result<()>;

    /// Computes `self += other`, assuming that the shares are aggregable.
    fn add_assign_unchecked(&mut self, other: &Self);

    /// Sets `out = a + b`; `out` is left untouched on error.
    fn aggregate(a: &Self, b: &Self, out: &mut Self) -> Result<()> {
        a.check_aggregable(b)?;
        let mut sum = a.clone();
        sum.add_assign_unchecked(b);
        *out = sum;
        Ok(())
    }
}

macro_rules! impl_aggregate {
    ($($share:ty),+) => {
        $(
            impl Aggregate<$share> for $share {
                fn from_shares<T>(iter: T) -> Result<Self>
                where
                    T: IntoIterator<Item = $share>,
                {
                    let mut shares = iter.into_iter();
                    let mut sum = shares.next().ok_or(Error::InsufficientParties(0, 1))?;
                    for share in shares {
                        sum.check_aggregable(&share)?;
                        sum.add_assign_unchecked(&share);
                    }
                    Ok(sum)
                }
            }
        )+
    };
}

fn check_seeds(a: &Option<Seed>, b: &Option<Seed>) -> Result<()> {
    if a != b {
        Err(Error::ProtocolMismatch(
            "The shares were generated from different seeds".to_string(),
        ))
    } else {
        Ok(())
    }
}

fn check_levels<T: PartialEq + std::fmt::Debug>(a: T, b: T) -> Result<()> {
    if a != b {
        Err(Error::ProtocolMismatch(format!(
            "The shares have different structures: {a:?} and {b:?}"
        )))
    } else {
        Ok(())
    }
}

fn check_shapes(a: &GadgetShape, b: &GadgetShape) -> Result<()> {
    if a != b {
        Err(Error::ProtocolMismatch(format!(
            "The shares have different decompositions: {a:?} and {b:?}"
        )))
    } else {
        Ok(())
    }
}

fn add_rows(rows: &mut [Vec<PolyQP>], other: &[Vec<PolyQP>]) {
    rows.iter_mut()
        .flatten()
        .zip(other.iter().flatten())
        .for_each(|(r, o)| *r += o);
}

fn add_q_rows(rows: &mut [Vec<Poly>], other: &[Vec<Poly>]) {
    rows.iter_mut()
        .flatten()
        .zip(other.iter().flatten())
        .for_each(|(r, o)| *r += o);
}

fn poly_from_bytes(bytes: &[u8], par: &Parameters, level: usize) -> Result<Poly> {
    let p = Poly::from_bytes(bytes, par.ctx_q()).map_err(|_| Error::SerializationError)?;
    if p.level() != level || *p.representation() != Representation::Ntt {
        return Err(Error::SerializationError);
    }
    Ok(p)
}

fn poly_qp_from_bytes(
    bytes: &[u8],
    par: &Parameters,
    level_q: usize,
    level_p: Option<usize>,
) -> Result<PolyQP> {
    let p = PolyQP::from_bytes(bytes, par.ring()).map_err(|_| Error::SerializationError)?;
    if p.level_q() != level_q
        || p.level_p() != level_p
        || *p.representation() != Representation::Ntt
    {
        return Err(Error::SerializationError);
    }
    Ok(p)
}

fn shape_from_proto(
    shape: &Option<crate::proto::rlwe::GadgetShape>,
    par: &Parameters,
) -> Result<GadgetShape> {
    let shape = GadgetShape::from(shape.as_ref().ok_or(Error::SerializationError)?);
    par.check_levels(shape.level_q, shape.level_p)
        .map_err(|_| Error::SerializationError)?;
    Ok(shape)
}

/// Additive contribution to a sum protocol, such as `-a*s_i + e_i` in the
/// collective public key generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) seed: Option<Seed>,
    pub(crate) value: Vec<PolyQP>,
    pub(crate) level_q: usize,
    pub(crate) level_p: Option<usize>,
}

impl VectorShare {
    /// The seed of the public randomness.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The polynomials of the share.
    pub fn value(&self) -> &[PolyQP] {
        &self.value
    }

    /// Level of Q.
    pub fn level_q(&self) -> usize {
        self.level_q
    }

    /// Level of P.
    pub fn level_p(&self) -> Option<usize> {
        self.level_p
    }
}

impl Share for VectorShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_seeds(&self.seed, &other.seed)?;
        check_levels(
            (self.level_q, self.level_p, self.value.len()),
            (other.level_q, other.level_p, other.value.len()),
        )
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.value
            .iter_mut()
            .zip(other.value.iter())
            .for_each(|(v, o)| *v += o);
    }
}

/// A party's share of a gadget ciphertext: the rows `b[i][j]` only, in the
/// Montgomery domain. The rows `a[i][j]` are regenerated from the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetCiphertextShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) seed: Option<Seed>,
    pub(crate) value: Vec<Vec<PolyQP>>,
    pub(crate) shape: GadgetShape,
}

impl GadgetCiphertextShare {
    /// The seed of the rows `a[i][j]`.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The rows `b[i][j]`.
    pub fn value(&self) -> &[Vec<PolyQP>] {
        &self.value
    }

    /// The shape of the gadget ciphertext.
    pub fn shape(&self) -> &GadgetShape {
        &self.shape
    }
}

impl Share for GadgetCiphertextShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_seeds(&self.seed, &other.seed)?;
        check_shapes(&self.shape, &other.shape)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        add_rows(&mut self.value, &other.value)
    }
}

/// A party's share of an evaluation key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationKeyShare {
    pub(crate) share: GadgetCiphertextShare,
}

impl EvaluationKeyShare {
    /// The underlying gadget ciphertext share.
    pub fn gadget(&self) -> &GadgetCiphertextShare {
        &self.share
    }
}

impl Share for EvaluationKeyShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        self.share.check_aggregable(&other.share)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.share.add_assign_unchecked(&other.share)
    }
}

/// A party's share of a Galois key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisKeyShare {
    pub(crate) galois_element: usize,
    pub(crate) share: GadgetCiphertextShare,
}

impl GaloisKeyShare {
    /// The Galois element of the automorphism.
    pub fn galois_element(&self) -> usize {
        self.galois_element
    }

    /// The underlying gadget ciphertext share.
    pub fn gadget(&self) -> &GadgetCiphertextShare {
        &self.share
    }
}

impl Share for GaloisKeyShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        if self.galois_element != other.galois_element {
            return Err(Error::ProtocolMismatch(format!(
                "The shares are for different Galois elements: {} and {}",
                self.galois_element, other.galois_element
            )));
        }
        self.share.check_aggregable(&other.share)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.share.add_assign_unchecked(&other.share)
    }
}

/// A party's share of a relinearization key: both rows of a public key
/// encryption, in the Montgomery domain. There is no seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinearizationKeyShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) b: Vec<Vec<PolyQP>>,
    pub(crate) a: Vec<Vec<PolyQP>>,
    pub(crate) shape: GadgetShape,
}

impl RelinearizationKeyShare {
    /// The rows `b[i][j]`.
    pub fn b(&self) -> &[Vec<PolyQP>] {
        &self.b
    }

    /// The rows `a[i][j]`.
    pub fn a(&self) -> &[Vec<PolyQP>] {
        &self.a
    }

    /// The shape of the key.
    pub fn shape(&self) -> &GadgetShape {
        &self.shape
    }
}

impl Share for RelinearizationKeyShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_shapes(&self.shape, &other.shape)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        add_rows(&mut self.b, &other.b);
        add_rows(&mut self.a, &other.a);
    }
}

/// A party's share of a collective key switch: one polynomial for a secret
/// key target, two for a public key target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySwitchingShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) target: KeySwitchTarget,
    pub(crate) seed: Option<Seed>,
    pub(crate) value: Vec<Poly>,
    pub(crate) level: usize,
}

impl KeySwitchingShare {
    /// The kind of the target key.
    pub fn target(&self) -> KeySwitchTarget {
        self.target
    }

    /// The seed of the target public key, if any.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The polynomials of the share.
    pub fn value(&self) -> &[Poly] {
        &self.value
    }

    /// Level of the share.
    pub fn level(&self) -> usize {
        self.level
    }
}

impl Share for KeySwitchingShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        if self.target != other.target {
            return Err(Error::ProtocolMismatch(format!(
                "The shares switch to different kinds of keys: {:?} and {:?}",
                self.target, other.target
            )));
        }
        if self.target == KeySwitchTarget::PublicKey {
            check_seeds(&self.seed, &other.seed)?;
        }
        check_levels(
            (self.level, self.value.len()),
            (other.level, other.value.len()),
        )
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.value
            .iter_mut()
            .zip(other.value.iter())
            .for_each(|(v, o)| *v += o);
    }
}

/// A party's share of a circular ciphertext: `ct_u = -a*u + m_i + e` and
/// `ct_s = -a*s_i + e'`, for the uniform `a` generated from the seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularCiphertextShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) seed: Option<Seed>,
    pub(crate) ct_u: Poly,
    pub(crate) ct_s: Poly,
    pub(crate) level: usize,
}

impl CircularCiphertextShare {
    /// The seed of the common uniform polynomial.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// Level of the share.
    pub fn level(&self) -> usize {
        self.level
    }
}

impl Share for CircularCiphertextShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_seeds(&self.seed, &other.seed)?;
        check_levels(self.level, other.level)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.ct_u += &other.ct_u;
        self.ct_s += &other.ct_s;
    }
}

/// A party's share of a circular gadget ciphertext: one circular ciphertext
/// share per row of a gadget matrix over Q, in the Montgomery domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularGadgetCiphertextShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) seed: Option<Seed>,
    pub(crate) ct_u: Vec<Vec<Poly>>,
    pub(crate) ct_s: Vec<Vec<Poly>>,
    pub(crate) shape: GadgetShape,
}

impl CircularGadgetCiphertextShare {
    /// The seed of the common uniform polynomials.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The shape of the gadget matrix.
    pub fn shape(&self) -> &GadgetShape {
        &self.shape
    }
}

impl Share for CircularGadgetCiphertextShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_seeds(&self.seed, &other.seed)?;
        check_shapes(&self.shape, &other.shape)
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        add_q_rows(&mut self.ct_u, &other.ct_u);
        add_q_rows(&mut self.ct_s, &other.ct_s);
    }
}

/// A Shamir polynomial over QP: the constant coefficient is the secret of
/// the dealer, the `threshold - 1` other coefficients are uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShamirPolynomial {
    pub(crate) par: Arc<Parameters>,
    pub(crate) coefficients: Vec<PolyQP>,
}

impl ShamirPolynomial {
    /// The threshold of the sharing, i.e. the number of coefficients.
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }
}

impl Zeroize for ShamirPolynomial {
    fn zeroize(&mut self) {
        self.coefficients.iter_mut().for_each(|c| c.zeroize())
    }
}

impl Drop for ShamirPolynomial {
    fn drop(&mut self) {
        self.zeroize()
    }
}

impl ZeroizeOnDrop for ShamirPolynomial {}

/// The evaluation of a Shamir polynomial at the point of a recipient, or the
/// sum of such evaluations from several dealers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShamirSecretShare {
    pub(crate) par: Arc<Parameters>,
    pub(crate) value: PolyQP,
}

impl Zeroize for ShamirSecretShare {
    fn zeroize(&mut self) {
        self.value.zeroize()
    }
}

impl Drop for ShamirSecretShare {
    fn drop(&mut self) {
        self.zeroize()
    }
}

impl ZeroizeOnDrop for ShamirSecretShare {}

impl Share for ShamirSecretShare {
    fn check_aggregable(&self, other: &Self) -> Result<()> {
        check_levels(
            (self.value.level_q(), self.value.level_p()),
            (other.value.level_q(), other.value.level_p()),
        )
    }

    fn add_assign_unchecked(&mut self, other: &Self) {
        self.value += &other.value
    }
}

impl_aggregate!(
    VectorShare,
    GadgetCiphertextShare,
    EvaluationKeyShare,
    GaloisKeyShare,
    RelinearizationKeyShare,
    KeySwitchingShare,
    CircularCiphertextShare,
    CircularGadgetCiphertextShare,
    ShamirSecretShare
);

impl FheParametrized for VectorShare {
    type Parameters = Parameters;
}

impl FheParametrized for GadgetCiphertextShare {
    type Parameters = Parameters;
}

impl FheParametrized for EvaluationKeyShare {
    type Parameters = Parameters;
}

impl FheParametrized for GaloisKeyShare {
    type Parameters = Parameters;
}

impl FheParametrized for RelinearizationKeyShare {
    type Parameters = Parameters;
}

impl FheParametrized for KeySwitchingShare {
    type Parameters = Parameters;
}

impl FheParametrized for CircularCiphertextShare {
    type Parameters = Parameters;
}

impl FheParametrized for CircularGadgetCiphertextShare {
    type Parameters = Parameters;
}

impl FheParametrized for ShamirPolynomial {
    type Parameters = Parameters;
}

impl FheParametrized for ShamirSecretShare {
    type Parameters = Parameters;
}

impl Serialize for VectorShare {
    fn to_bytes(&self) -> Vec<u8> {
        VectorShareProto {
            seed: seed_to_bytes(&self.seed),
            value: self.value.iter().map(|p| p.to_bytes()).collect(),
            level_q: self.level_q as u32,
            level_p: self.level_p.map(|l| l as u32),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for VectorShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = VectorShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let (level_q, level_p) = (
            value.level_q as usize,
            value.level_p.map(|l| l as usize),
        );
        par.check_levels(level_q, level_p)
            .map_err(|_| Error::SerializationError)?;
        Ok(Self {
            par: par.clone(),
            seed: seed_from_bytes(&value.seed)?,
            value: value
                .value
                .iter()
                .map(|b| poly_qp_from_bytes(b, par, level_q, level_p))
                .collect::<Result<_>>()?,
            level_q,
            level_p,
        })
    }
}

impl From<&GadgetCiphertextShare> for GadgetCiphertextShareProto {
    fn from(share: &GadgetCiphertextShare) -> Self {
        GadgetCiphertextShareProto {
            seed: seed_to_bytes(&share.seed),
            value: rows_to_bytes(&share.value),
            shape: Some((&share.shape).into()),
        }
    }
}

impl GadgetCiphertextShare {
    fn try_from_proto(value: &GadgetCiphertextShareProto, par: &Arc<Parameters>) -> Result<Self> {
        let shape = shape_from_proto(&value.shape, par)?;
        let decomposer = shape
            .decomposer(par)
            .map_err(|_| Error::SerializationError)?;
        Ok(Self {
            par: par.clone(),
            seed: seed_from_bytes(&value.seed)?,
            value: rows_from_bytes(&value.value, &decomposer, par, shape.level_p)?,
            shape,
        })
    }
}

impl Serialize for GadgetCiphertextShare {
    fn to_bytes(&self) -> Vec<u8> {
        GadgetCiphertextShareProto::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for GadgetCiphertextShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            GadgetCiphertextShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        Self::try_from_proto(&value, par)
    }
}

impl Serialize for EvaluationKeyShare {
    fn to_bytes(&self) -> Vec<u8> {
        EvaluationKeyShareProto {
            share: Some((&self.share).into()),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for EvaluationKeyShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            EvaluationKeyShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let share = value.share.ok_or(Error::SerializationError)?;
        Ok(Self {
            share: GadgetCiphertextShare::try_from_proto(&share, par)?,
        })
    }
}

impl Serialize for GaloisKeyShare {
    fn to_bytes(&self) -> Vec<u8> {
        GaloisKeyShareProto {
            share: Some((&self.share).into()),
            galois_element: self.galois_element as u32,
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for GaloisKeyShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = GaloisKeyShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let share = value.share.ok_or(Error::SerializationError)?;
        Ok(Self {
            galois_element: value.galois_element as usize,
            share: GadgetCiphertextShare::try_from_proto(&share, par)?,
        })
    }
}

impl Serialize for RelinearizationKeyShare {
    fn to_bytes(&self) -> Vec<u8> {
        RelinearizationKeyShareProto {
            b: rows_to_bytes(&self.b),
            a: rows_to_bytes(&self.a),
            shape: Some((&self.shape).into()),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for RelinearizationKeyShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            RelinearizationKeyShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let shape = shape_from_proto(&value.shape, par)?;
        let decomposer = shape
            .decomposer(par)
            .map_err(|_| Error::SerializationError)?;
        Ok(Self {
            par: par.clone(),
            b: rows_from_bytes(&value.b, &decomposer, par, shape.level_p)?,
            a: rows_from_bytes(&value.a, &decomposer, par, shape.level_p)?,
            shape,
        })
    }
}

impl Serialize for KeySwitchingShare {
    fn to_bytes(&self) -> Vec<u8> {
        KeySwitchingShareProto {
            target: self.target as u32,
            seed: seed_to_bytes(&self.seed),
            value: self.value.iter().map(|p| p.to_bytes()).collect(),
            level: self.level as u32,
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for KeySwitchingShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            KeySwitchingShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let target = KeySwitchTarget::try_from(value.target)?;
        let level = value.level as usize;
        par.check_levels(level, None)
            .map_err(|_| Error::SerializationError)?;
        if value.value.len() != target.share_size() {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            target,
            seed: seed_from_bytes(&value.seed)?,
            value: value
                .value
                .iter()
                .map(|b| poly_from_bytes(b, par, level))
                .collect::<Result<_>>()?,
            level,
        })
    }
}

impl Serialize for CircularCiphertextShare {
    fn to_bytes(&self) -> Vec<u8> {
        CircularCiphertextShareProto {
            seed: seed_to_bytes(&self.seed),
            ct_u: self.ct_u.to_bytes(),
            ct_s: self.ct_s.to_bytes(),
            level: self.level as u32,
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for CircularCiphertextShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            CircularCiphertextShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let level = value.level as usize;
        par.check_levels(level, None)
            .map_err(|_| Error::SerializationError)?;
        Ok(Self {
            par: par.clone(),
            seed: seed_from_bytes(&value.seed)?,
            ct_u: poly_from_bytes(&value.ct_u, par, level)?,
            ct_s: poly_from_bytes(&value.ct_s, par, level)?,
            level,
        })
    }
}

fn q_rows_from_bytes(
    bytes: &[Vec<u8>],
    par: &Parameters,
    shape: &GadgetShape,
) -> Result<Vec<Vec<Poly>>> {
    let decomposer = shape
        .decomposer(par)
        .map_err(|_| Error::SerializationError)?;
    let digits = decomposer.digit_count();
    if bytes.len() != decomposer.rns_count() * digits {
        return Err(Error::SerializationError);
    }
    let values = bytes
        .iter()
        .map(|b| poly_from_bytes(b, par, shape.level_q))
        .collect::<Result<Vec<_>>>()?;
    Ok(values.chunks(digits).map(|row| row.to_vec()).collect())
}

impl Serialize for CircularGadgetCiphertextShare {
    fn to_bytes(&self) -> Vec<u8> {
        CircularGadgetCiphertextShareProto {
            seed: seed_to_bytes(&self.seed),
            ct_u: self.ct_u.iter().flatten().map(|p| p.to_bytes()).collect(),
            ct_s: self.ct_s.iter().flatten().map(|p| p.to_bytes()).collect(),
            shape: Some((&self.shape).into()),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for CircularGadgetCiphertextShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = CircularGadgetCiphertextShareProto::decode(bytes)
            .map_err(|_| Error::SerializationError)?;
        let shape = shape_from_proto(&value.shape, par)?;
        Ok(Self {
            par: par.clone(),
            seed: seed_from_bytes(&value.seed)?,
            ct_u: q_rows_from_bytes(&value.ct_u, par, &shape)?,
            ct_s: q_rows_from_bytes(&value.ct_s, par, &shape)?,
            shape,
        })
    }
}

impl Serialize for ShamirPolynomial {
    fn to_bytes(&self) -> Vec<u8> {
        ShamirPolynomialProto {
            coefficients: self.coefficients.iter().map(|p| p.to_bytes()).collect(),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for ShamirPolynomial {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = ShamirPolynomialProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        if value.coefficients.is_empty() {
            return Err(Error::SerializationError);
        }
        Ok(Self {
            par: par.clone(),
            coefficients: value
                .coefficients
                .iter()
                .map(|b| poly_qp_from_bytes(b, par, par.max_level_q(), par.max_level_p()))
                .collect::<Result<_>>()?,
        })
    }
}

impl Serialize for ShamirSecretShare {
    fn to_bytes(&self) -> Vec<u8> {
        ShamirSecretShareProto {
            value: self.value.to_bytes(),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for ShamirSecretShare {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = ShamirSecretShareProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        Ok(Self {
            par: par.clone(),
            value: poly_qp_from_bytes(&value.value, par, par.max_level_q(), par.max_level_p())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CircularCiphertextShare, CircularGadgetCiphertextShare, EvaluationKeyShare,
        GadgetCiphertextShare, GaloisKeyShare, KeySwitchingShare, RelinearizationKeyShare,
        ShamirPolynomial, ShamirSecretShare, Share, VectorShare,
    };
    use crate::mhe::{Aggregate, AggregateIter, KeySwitchTarget};
    use crate::rlwe::{GadgetShape, Parameters, Seed};
    use crate::Error as MheError;
    use mhe_math::rq::{Poly, PolyQP, Representation};
    use mhe_traits::{DeserializeParametrized, Serialize};
    use rand::{thread_rng, Rng};
    use std::{error::Error, sync::Arc};

    fn random_seed() -> Seed {
        let mut seed = Seed::default();
        thread_rng().fill(&mut seed);
        seed
    }

    fn random_qp(par: &Parameters, level_q: usize, level_p: Option<usize>) -> PolyQP {
        par.ring()
            .random(level_q, level_p, Representation::Ntt, &mut thread_rng())
            .unwrap()
    }

    fn random_q(par: &Parameters, level: usize) -> Poly {
        Poly::random(par.ctx_q(), level, Representation::Ntt, &mut thread_rng())
    }

    fn random_rows(par: &Parameters, shape: &GadgetShape) -> Vec<Vec<PolyQP>> {
        let d = shape.decomposer(par).unwrap();
        (0..d.rns_count())
            .map(|_| {
                (0..d.digit_count())
                    .map(|_| random_qp(par, shape.level_q, shape.level_p))
                    .collect()
            })
            .collect()
    }

    fn random_q_rows(par: &Parameters, shape: &GadgetShape) -> Vec<Vec<Poly>> {
        let d = shape.decomposer(par).unwrap();
        (0..d.rns_count())
            .map(|_| {
                (0..d.digit_count())
                    .map(|_| random_q(par, shape.level_q))
                    .collect()
            })
            .collect()
    }

    fn vector_share(par: &Arc<Parameters>, seed: Seed, level_q: usize, level_p: Option<usize>) -> VectorShare {
        VectorShare {
            par: par.clone(),
            seed: Some(seed),
            value: vec![random_qp(par, level_q, level_p)],
            level_q,
            level_p,
        }
    }

    #[test]
    fn serialize() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        for (level_q, level_p) in [(2, Some(1)), (1, Some(0)), (2, None), (0, None)] {
            let base_two = if level_p == Some(1) { 0 } else { 20 };
            let shape = GadgetShape::new(level_q, level_p, base_two);
            let seed = random_seed();

            let share = vector_share(&par, seed, level_q, level_p);
            assert_eq!(VectorShare::from_bytes(&share.to_bytes(), &par)?, share);

            let gadget = GadgetCiphertextShare {
                par: par.clone(),
                seed: Some(seed),
                value: random_rows(&par, &shape),
                shape,
            };
            assert_eq!(
                GadgetCiphertextShare::from_bytes(&gadget.to_bytes(), &par)?,
                gadget
            );

            let share = EvaluationKeyShare {
                share: gadget.clone(),
            };
            assert_eq!(EvaluationKeyShare::from_bytes(&share.to_bytes(), &par)?, share);

            let share = GaloisKeyShare {
                galois_element: 5,
                share: gadget.clone(),
            };
            assert_eq!(GaloisKeyShare::from_bytes(&share.to_bytes(), &par)?, share);

            let share = RelinearizationKeyShare {
                par: par.clone(),
                b: random_rows(&par, &shape),
                a: random_rows(&par, &shape),
                shape,
            };
            assert_eq!(
                RelinearizationKeyShare::from_bytes(&share.to_bytes(), &par)?,
                share
            );

            for (target, seed) in [
                (KeySwitchTarget::SecretKey, None),
                (KeySwitchTarget::PublicKey, Some(seed)),
            ] {
                let share = KeySwitchingShare {
                    par: par.clone(),
                    target,
                    seed,
                    value: (0..target.share_size())
                        .map(|_| random_q(&par, level_q))
                        .collect(),
                    level: level_q,
                };
                assert_eq!(KeySwitchingShare::from_bytes(&share.to_bytes(), &par)?, share);
            }

            let share = CircularCiphertextShare {
                par: par.clone(),
                seed: Some(seed),
                ct_u: random_q(&par, level_q),
                ct_s: random_q(&par, level_q),
                level: level_q,
            };
            assert_eq!(
                CircularCiphertextShare::from_bytes(&share.to_bytes(), &par)?,
                share
            );

            let q_shape = GadgetShape::new(level_q, None, 20);
            let share = CircularGadgetCiphertextShare {
                par: par.clone(),
                seed: Some(seed),
                ct_u: random_q_rows(&par, &q_shape),
                ct_s: random_q_rows(&par, &q_shape),
                shape: q_shape,
            };
            assert_eq!(
                CircularGadgetCiphertextShare::from_bytes(&share.to_bytes(), &par)?,
                share
            );
        }

        let polynomial = ShamirPolynomial {
            par: par.clone(),
            coefficients: (0..3).map(|_| random_qp(&par, 2, Some(1))).collect(),
        };
        assert_eq!(
            ShamirPolynomial::from_bytes(&polynomial.to_bytes(), &par)?,
            polynomial
        );
        let share = ShamirSecretShare {
            par: par.clone(),
            value: random_qp(&par, 2, Some(1)),
        };
        assert_eq!(ShamirSecretShare::from_bytes(&share.to_bytes(), &par)?, share);

        // Truncated or inconsistent encodings are rejected.
        let bytes = share.to_bytes();
        assert_eq!(
            ShamirSecretShare::from_bytes(&bytes[..bytes.len() / 2], &par),
            Err(MheError::SerializationError)
        );
        let other = Parameters::default_arc(2, 1, 16);
        assert!(ShamirSecretShare::from_bytes(&bytes, &other).is_err());
        Ok(())
    }

    #[test]
    fn aggregate() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(2, 1, 16);
        let seed = random_seed();
        let shares = (0..3)
            .map(|_| vector_share(&par, seed, 1, Some(0)))
            .collect::<Vec<_>>();

        let mut ab = shares[0].clone();
        let mut ba = shares[0].clone();
        Share::aggregate(&shares[0], &shares[1], &mut ab)?;
        Share::aggregate(&shares[1], &shares[0], &mut ba)?;
        assert_eq!(ab, ba);

        let mut ab_c = ab.clone();
        Share::aggregate(&ab, &shares[2], &mut ab_c)?;
        let mut bc = ab.clone();
        Share::aggregate(&shares[1], &shares[2], &mut bc)?;
        let mut a_bc = ab.clone();
        Share::aggregate(&shares[0], &bc, &mut a_bc)?;
        assert_eq!(ab_c, a_bc);

        let sum: VectorShare = shares.clone().into_iter().aggregate()?;
        assert_eq!(sum, ab_c);
        assert_eq!(VectorShare::from_shares(shares.clone())?, ab_c);
        assert_eq!(
            VectorShare::from_shares(Vec::<VectorShare>::new()),
            Err(MheError::InsufficientParties(0, 1))
        );

        // Aggregation checks happen before the output is written.
        let other = vector_share(&par, random_seed(), 1, Some(0));
        let mut out = shares[2].clone();
        assert!(matches!(
            Share::aggregate(&shares[0], &other, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert_eq!(out, shares[2]);
        let other = vector_share(&par, seed, 0, Some(0));
        assert!(matches!(
            Share::aggregate(&shares[0], &other, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert!(matches!(
            VectorShare::from_shares([shares[0].clone(), other]),
            Err(MheError::ProtocolMismatch(_))
        ));
        Ok(())
    }
}
