//! Collective generation of Galois keys.

use crate::mhe::{shares::Share, GadgetCiphertextProtocol, GaloisKeyShare};
use crate::rlwe::{
    keys::{check_galois_element, inverse_galois_element},
    GadgetShape, GaloisKey, Parameters, SecretKey, Seed,
};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{debug, trace};

/// The collective Galois key generation protocol: the parties jointly
/// produce a key for the automorphism `x -> x^galois_element` of the
/// ciphertexts under `sum(s_i)`.
#[derive(Debug)]
pub struct GaloisKeyGenProtocol {
    gadget: GadgetCiphertextProtocol,
}

impl GaloisKeyGenProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self {
            gadget: GadgetCiphertextProtocol::new(par),
        }
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            gadget: self.gadget.shallow_copy(),
        }
    }

    /// A zero share of the given shape. The Galois element is set by
    /// [`gen_share`](Self::gen_share).
    pub fn allocate_share(&self, shape: GadgetShape) -> Result<GaloisKeyShare> {
        Ok(GaloisKeyShare {
            galois_element: 1,
            share: self.gadget.allocate_share(shape)?,
        })
    }

    /// Writes into `share` the share of the party holding `sk` of the Galois
    /// key for `galois_element`, with the uniform rows generated from `seed`.
    ///
    /// The share encrypts `s_i` under `sigma^(-1)(s_i)`.
    pub fn gen_share(
        &mut self,
        galois_element: usize,
        sk: &SecretKey,
        seed: Seed,
        share: &mut GaloisKeyShare,
    ) -> Result<()> {
        let par = self.gadget.parameters().clone();
        check_galois_element(&par, galois_element)?;
        trace!(galois_element, "generating a Galois key share");
        let sk_out = sk.automorphism(inverse_galois_element(&par, galois_element))?;
        let m = sk.q_at_level(share.share.shape.level_q)?;
        self.gadget.gen_share(&sk_out, &m, seed, &mut share.share)?;
        share.galois_element = galois_element;
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares are for different
    /// Galois elements, seeds or shapes.
    pub fn aggregate_shares(
        &self,
        a: &GaloisKeyShare,
        b: &GaloisKeyShare,
        out: &mut GaloisKeyShare,
    ) -> Result<()> {
        GaloisKeyShare::aggregate(a, b, out)?;
        debug!(
            galois_element = out.galois_element,
            "aggregated Galois key shares"
        );
        Ok(())
    }

    /// Writes the Galois key defined by the aggregated `share` into `key`.
    ///
    /// Returns a `ProtocolMismatch` error if `key` is allocated for another
    /// Galois element.
    pub fn finalize(&self, share: &GaloisKeyShare, key: &mut GaloisKey) -> Result<()> {
        if key.galois_element != share.galois_element {
            return Err(Error::ProtocolMismatch(format!(
                "The key is for the Galois element {}, the share for {}",
                key.galois_element, share.galois_element
            )));
        }
        self.gadget.finalize(&share.share, &mut key.gadget)
    }
}
