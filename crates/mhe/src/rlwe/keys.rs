//! Evaluation, relinearization and Galois keys: gadget ciphertexts tagged
//! with their role.

use crate::proto::rlwe::{
    EvaluationKey as EvaluationKeyProto, GaloisKey as GaloisKeyProto,
    RelinearizationKey as RelinearizationKeyProto,
};
use crate::rlwe::{GadgetCiphertext, GadgetShape, Parameters};
use crate::{Error, Result};
use mhe_traits::{DeserializeParametrized, FheParametrized, Serialize};
use prost::Message;
use std::sync::Arc;

/// Key switching key from a secret `s_in` to a secret `s_out`: a gadget
/// encryption of `s_in` under `s_out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationKey {
    pub(crate) gadget: GadgetCiphertext,
}

/// Relinearization key: a gadget encryption of `s^2` under `s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelinearizationKey {
    pub(crate) gadget: GadgetCiphertext,
}

/// Galois key for the automorphism `x -> x^galois_element`: a gadget
/// encryption of `s` under the image of `s` by the inverse automorphism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaloisKey {
    pub(crate) galois_element: usize,
    pub(crate) gadget: GadgetCiphertext,
}

impl FheParametrized for EvaluationKey {
    type Parameters = Parameters;
}

impl FheParametrized for RelinearizationKey {
    type Parameters = Parameters;
}

impl FheParametrized for GaloisKey {
    type Parameters = Parameters;
}

impl EvaluationKey {
    /// A zero key of the given shape.
    pub fn allocate(par: &Arc<Parameters>, shape: GadgetShape) -> Result<Self> {
        Ok(Self {
            gadget: GadgetCiphertext::allocate(par, shape)?,
        })
    }

    /// The underlying gadget ciphertext.
    pub fn gadget(&self) -> &GadgetCiphertext {
        &self.gadget
    }
}

impl RelinearizationKey {
    /// A zero key of the given shape.
    pub fn allocate(par: &Arc<Parameters>, shape: GadgetShape) -> Result<Self> {
        Ok(Self {
            gadget: GadgetCiphertext::allocate(par, shape)?,
        })
    }

    /// The underlying gadget ciphertext.
    pub fn gadget(&self) -> &GadgetCiphertext {
        &self.gadget
    }
}

/// Returns an error unless `galois_element` is odd and smaller than twice
/// the degree.
pub(crate) fn check_galois_element(par: &Parameters, galois_element: usize) -> Result<()> {
    if galois_element % 2 == 0 || galois_element >= 2 * par.degree() {
        Err(Error::InvalidParameter(format!(
            "Invalid Galois element {galois_element} for degree {}",
            par.degree()
        )))
    } else {
        Ok(())
    }
}

/// The inverse of `galois_element` modulo twice the degree, computed as
/// `galois_element^(degree - 1)` since the group has order dividing `degree`.
pub(crate) fn inverse_galois_element(par: &Parameters, galois_element: usize) -> usize {
    let modulus = 2 * par.degree() as u64;
    let (mut base, mut exponent, mut result) =
        (galois_element as u64 % modulus, par.degree() as u64 - 1, 1u64);
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = result * base % modulus;
        }
        base = base * base % modulus;
        exponent >>= 1;
    }
    result as usize
}

impl GaloisKey {
    /// A zero key of the given shape for the given Galois element.
    pub fn allocate(
        par: &Arc<Parameters>,
        galois_element: usize,
        shape: GadgetShape,
    ) -> Result<Self> {
        check_galois_element(par, galois_element)?;
        Ok(Self {
            galois_element,
            gadget: GadgetCiphertext::allocate(par, shape)?,
        })
    }

    /// The Galois element of the automorphism.
    pub fn galois_element(&self) -> usize {
        self.galois_element
    }

    /// The underlying gadget ciphertext.
    pub fn gadget(&self) -> &GadgetCiphertext {
        &self.gadget
    }
}

impl Serialize for EvaluationKey {
    fn to_bytes(&self) -> Vec<u8> {
        EvaluationKeyProto {
            gadget: Some((&self.gadget).into()),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for EvaluationKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = EvaluationKeyProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let gadget = value.gadget.ok_or(Error::SerializationError)?;
        Ok(Self {
            gadget: GadgetCiphertext::try_from_proto(&gadget, par)?,
        })
    }
}

impl Serialize for RelinearizationKey {
    fn to_bytes(&self) -> Vec<u8> {
        RelinearizationKeyProto {
            gadget: Some((&self.gadget).into()),
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for RelinearizationKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value =
            RelinearizationKeyProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let gadget = value.gadget.ok_or(Error::SerializationError)?;
        Ok(Self {
            gadget: GadgetCiphertext::try_from_proto(&gadget, par)?,
        })
    }
}

impl Serialize for GaloisKey {
    fn to_bytes(&self) -> Vec<u8> {
        GaloisKeyProto {
            gadget: Some((&self.gadget).into()),
            galois_element: self.galois_element as u32,
        }
        .encode_to_vec()
    }
}

impl DeserializeParametrized for GaloisKey {
    type Error = Error;

    fn from_bytes(bytes: &[u8], par: &Arc<Parameters>) -> Result<Self> {
        let value = GaloisKeyProto::decode(bytes).map_err(|_| Error::SerializationError)?;
        let galois_element = value.galois_element as usize;
        check_galois_element(par, galois_element).map_err(|_| Error::SerializationError)?;
        let gadget = value.gadget.ok_or(Error::SerializationError)?;
        Ok(Self {
            galois_element,
            gadget: GadgetCiphertext::try_from_proto(&gadget, par)?,
        })
    }
}
