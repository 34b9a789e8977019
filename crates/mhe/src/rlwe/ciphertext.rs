//! Ciphertexts over R_Q

use crate::proto::{rlwe::Ciphertext as CiphertextProto, seed_from_bytes, seed_to_bytes};
use crate::rlwe::{Parameters, Seed};
use crate::{mhe::CrpGenerator, Error, Result};
use mhe_math::rq::{Poly, Representation};
use mhe_traits::{
    DeserializeParametrized, DeserializeWithContext, FheParametrized, Serialize,
};
use prost::Message;
use std::sync::Arc;

/// A ciphertext `(c0, c1, ...)` decrypting to `c0 + c1*s + c2*s^2 + ...`,
/// with polynomials modulo Q in NTT representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ciphertext {
    /// The parameters of the underlying scheme.
    pub(crate) par: Arc<Parameters>,

    /// The seed that generated the polynomial c1 in a fresh ciphertext.
    pub(crate) seed: Option<Seed>,

    /// The ciphertext elements.
    pub c: Vec<Poly>,

    /// The ciphertext level
    pub(crate) level: usize,
}

impl Ciphertext {
    /// Create a ciphertext from a vector of polynomials.
    ///
    /// Returns an error if the polynomials are not at the same level, or are
    /// not defined modulo Q.
    pub fn new(c: Vec<Poly>, par: &Arc<Parameters>) -> Result<Self> {
        if c.len() < 2 {
            return Err(Error::InvalidParameter(
                "A ciphertext has at least two polynomials".to_string(),
            ));
        }
        let level = c[0].level();
        if c.iter().any(|ci| ci.ctx() != par.ctx_q()) {
            return Err(Error::ShapeMismatch(
                "The polynomials are not defined modulo Q".to_string(),
            ));
        }
        if c.iter().any(|ci| ci.level() != level) {
            return Err(Error::ShapeMismatch(
                "The polynomials are not at the same level".to_string(),
            ));
        }
        let mut c = c;
        c.iter_mut()
            .for_each(|ci| ci.change_representation(Representation::Ntt));
        Ok(Self {
            par: par.clone(),
            seed: None,
            c,
            level,
        })
    }

    /// The zero ciphertext with `size` polynomials at `level`.
    pub fn zero(par: &Arc<Parameters>, size: usize, level: usize) -> Result<Self> {
        par.check_levels(level, None)?;
        Self::new(
            (0..size.max(2))
                .map(|_| Poly::zero(par.ctx_q(), level, Representation::Ntt))
                .collect(),
            par,
        )
    }

    /// Returns the level of this ciphertext.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the number of polynomials.
    pub fn len(&self) -> usize {
        self.c.len()
    }

    /// Returns whether the ciphertext has no polynomial, which never holds.
    pub fn is_empty(&self) -> bool {
        self.c.is_empty()
    }

    /// Returns a copy of the ciphertext restricted to the moduli up to
    /// `level`.
    pub fn at_level(&self, level: usize) -> Result<Self> {
        if level > self.level {
            return Err(Error::ShapeMismatch(format!(
                "Cannot raise a ciphertext from level {} to level {level}",
                self.level
            )));
        }
        Ok(Self {
            par: self.par.clone(),
            seed: if level == self.level { self.seed } else { None },
            c: self
                .c
                .iter()
                .map(|ci| ci.at_level(level))
                .collect::<mhe_math::Result<Vec<_>>>()?,
            level,
        })
    }
}

impl FheParametrized for Ciphertext {
    type Parameters = Parameters;
}

impl From<&Ciphertext> for CiphertextProto {
    fn from(ct: &Ciphertext) -> Self {
        let mut proto = CiphertextProto::default();
        for i in 0..ct.c.len() - 1 {
            proto.c.push(ct.c[i].to_bytes())
        }
        if ct.seed.is_none() || ct.c.len() != 2 {
            proto.c.push(ct.c[ct.c.len() - 1].to_bytes())
        }
        proto.seed = seed_to_bytes(&ct.seed);
        proto.level = ct.level as u32;
        proto
    }
}

impl Serialize for Ciphertext {
    fn to_bytes(&self) -> Vec<u8> {
        CiphertextProto::from(self).encode_to_vec()
    }
}

impl Ciphertext {
    pub(crate) fn try_from_proto(value: &CiphertextProto, par: &Arc<Parameters>) -> Result<Self> {
        let level = value.level as usize;
        par.check_levels(level, None)
            .map_err(|_| Error::SerializationError)?;
        let mut c = value
            .c
            .iter()
            .map(|bytes| Poly::from_bytes(bytes, par.ctx_q()))
            .collect::<mhe_math::Result<Vec<_>>>()
            .map_err(|_| Error::SerializationError)?;
        let seed = seed_from_bytes(&value.seed)?;
        if let Some(seed) = seed {
            if c.len() != 1 {
                return Err(Error::SerializationError);
            }
            c.push(CrpGenerator::new(seed).sample_q(par.ctx_q(), level));
        }
        if c.iter().any(|ci| ci.level() != level) {
            return Err(Error::SerializationError);
        }
        let mut ct = Ciphertext::new(c, par).map_err(|_| Error::SerializationError)?;
        ct.seed = seed;
        Ok(ct)
    }
}

impl DeserializeParametrized for Ciphertext {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = CiphertextProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        Ciphertext::try_from_proto(&value, par)
    }
}
