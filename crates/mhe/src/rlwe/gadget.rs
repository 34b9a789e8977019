//! Gadget ciphertexts: the matrices of RLWE encryptions of `m * g[i][j]`
//! consumed by the gadget product.

use crate::proto::{
    rlwe::{GadgetCiphertext as GadgetCiphertextProto, GadgetShape as GadgetShapeProto},
    seed_from_bytes, seed_to_bytes,
};
use crate::rlwe::{Parameters, Seed};
use crate::{mhe::CrpGenerator, Error, Result};
use mhe_math::{
    rns::Decomposer,
    rq::{PolyQP, Representation},
};
use mhe_traits::{DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize};
use prost::Message;
use std::sync::Arc;

/// The decomposition signature of a gadget ciphertext: the levels of Q and P
/// of its rows, and the number of bits of its digits (0 for none).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GadgetShape {
    /// Level of Q.
    pub level_q: usize,
    /// Level of P, `None` for no P.
    pub level_p: Option<usize>,
    /// Number of bits of the digits, 0 to only use the RNS decomposition.
    pub base_two: usize,
}

impl GadgetShape {
    /// Creates a new shape.
    pub const fn new(level_q: usize, level_p: Option<usize>, base_two: usize) -> Self {
        Self {
            level_q,
            level_p,
            base_two,
        }
    }

    /// The decomposition associated with this shape.
    pub fn decomposer(&self, par: &Parameters) -> Result<Decomposer> {
        par.decomposer(self.level_q, self.level_p, self.base_two)
    }

    /// Returns a `ShapeMismatch` error when `self` and `other` differ.
    pub(crate) fn check_eq(&self, other: &GadgetShape) -> Result<()> {
        if self != other {
            Err(Error::ShapeMismatch(format!(
                "Gadget shapes differ: {self:?} and {other:?}"
            )))
        } else {
            Ok(())
        }
    }
}

impl From<&GadgetShape> for GadgetShapeProto {
    fn from(shape: &GadgetShape) -> Self {
        GadgetShapeProto {
            level_q: shape.level_q as u32,
            level_p: shape.level_p.map(|l| l as u32),
            base_two: shape.base_two as u32,
        }
    }
}

impl From<&GadgetShapeProto> for GadgetShape {
    fn from(value: &GadgetShapeProto) -> Self {
        GadgetShape::new(
            value.level_q as usize,
            value.level_p.map(|l| l as usize),
            value.base_two as usize,
        )
    }
}

/// Flatten a matrix of polynomials row by row into serialized polynomials.
pub(crate) fn rows_to_bytes(rows: &[Vec<PolyQP>]) -> Vec<Vec<u8>> {
    rows.iter().flatten().map(|p| p.to_bytes()).collect()
}

/// Rebuild a matrix of polynomials of the given shape from serialized
/// polynomials, checking the levels of every entry.
pub(crate) fn rows_from_bytes(
    bytes: &[Vec<u8>],
    decomposer: &Decomposer,
    par: &Parameters,
    level_p: Option<usize>,
) -> Result<Vec<Vec<PolyQP>>> {
    let (rns, digits) = (decomposer.rns_count(), decomposer.digit_count());
    if bytes.len() != rns * digits {
        return Err(Error::SerializationError);
    }
    let values = bytes
        .iter()
        .map(|b| PolyQP::from_bytes(b, &par.ring).map_err(|_| Error::SerializationError))
        .collect::<Result<Vec<_>>>()?;
    if values.iter().any(|p| {
        p.level_q() != decomposer.level_q()
            || p.level_p() != level_p
            || *p.representation() != Representation::Ntt
    }) {
        return Err(Error::SerializationError);
    }
    Ok(values.chunks(digits).map(|row| row.to_vec()).collect())
}

/// A gadget ciphertext over QP: for every RNS group `i` and digit `j`, the
/// pair `(b[i][j], a[i][j])` with `b + a*s = e + m * g[i][j]`.
///
/// The polynomials are in NTT representation and in the Montgomery domain,
/// ready for the gadget product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GadgetCiphertext {
    pub(crate) par: Arc<Parameters>,
    pub(crate) shape: GadgetShape,
    pub(crate) decomposer: Decomposer,
    pub(crate) b: Vec<Vec<PolyQP>>,
    pub(crate) a: Vec<Vec<PolyQP>>,
    pub(crate) seed: Option<Seed>,
}

impl FheParametrized for GadgetCiphertext {
    type Parameters = Parameters;
}

impl GadgetCiphertext {
    /// A zero gadget ciphertext of the given shape, to be filled by a
    /// protocol.
    pub fn allocate(par: &Arc<Parameters>, shape: GadgetShape) -> Result<Self> {
        let decomposer = shape.decomposer(par)?;
        let zero = par
            .ring
            .zero(shape.level_q, shape.level_p, Representation::Ntt)?;
        let rows = vec![vec![zero; decomposer.digit_count()]; decomposer.rns_count()];
        Ok(Self {
            par: par.clone(),
            shape,
            decomposer,
            b: rows.clone(),
            a: rows,
            seed: None,
        })
    }

    /// The shape of the gadget ciphertext.
    pub fn shape(&self) -> &GadgetShape {
        &self.shape
    }

    /// The decomposition consumed by the gadget product.
    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// Level of Q.
    pub fn level_q(&self) -> usize {
        self.shape.level_q
    }

    /// Level of P.
    pub fn level_p(&self) -> Option<usize> {
        self.shape.level_p
    }

    /// The seed of the uniform components, if any.
    pub fn seed(&self) -> Option<Seed> {
        self.seed
    }

    /// The first components, `b[i][j]`, in the Montgomery domain.
    pub fn b(&self) -> &[Vec<PolyQP>] {
        &self.b
    }

    /// The second components, `a[i][j]`, in the Montgomery domain.
    pub fn a(&self) -> &[Vec<PolyQP>] {
        &self.a
    }
}

impl From<&GadgetCiphertext> for GadgetCiphertextProto {
    fn from(gct: &GadgetCiphertext) -> Self {
        GadgetCiphertextProto {
            b: rows_to_bytes(&gct.b),
            a: if gct.seed.is_some() {
                vec![]
            } else {
                rows_to_bytes(&gct.a)
            },
            shape: Some((&gct.shape).into()),
            seed: seed_to_bytes(&gct.seed),
        }
    }
}

impl GadgetCiphertext {
    pub(crate) fn try_from_proto(
        value: &GadgetCiphertextProto,
        par: &Arc<Parameters>,
    ) -> Result<Self> {
        let shape = GadgetShape::from(value.shape.as_ref().ok_or(Error::SerializationError)?);
        let decomposer = shape
            .decomposer(par)
            .map_err(|_| Error::SerializationError)?;
        let b = rows_from_bytes(&value.b, &decomposer, par, shape.level_p)?;
        let seed = seed_from_bytes(&value.seed)?;
        let a = match seed {
            Some(seed) => CrpGenerator::new(seed).sample_gadget_montgomery(par, &shape)?,
            None => rows_from_bytes(&value.a, &decomposer, par, shape.level_p)?,
        };
        Ok(Self {
            par: par.clone(),
            shape,
            decomposer,
            b,
            a,
            seed,
        })
    }
}

impl Serialize for GadgetCiphertext {
    fn to_bytes(&self) -> Vec<u8> {
        GadgetCiphertextProto::from(self).encode_to_vec()
    }
}

impl DeserializeParametrized for GadgetCiphertext {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = GadgetCiphertextProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        GadgetCiphertext::try_from_proto(&value, par)
    }
}
