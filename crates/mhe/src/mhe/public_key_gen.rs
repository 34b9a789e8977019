//! Collective public key generation.
//!
//! Each party publishes `-a*s_i + e_i` for the common uniform `a` generated
//! from a public seed; the sum of the shares is the first component of a
//! public key for the secret `s = sum(s_i)`.

use crate::mhe::{shares::Share, CrpGenerator, Scratch, VectorShare};
use crate::rlwe::{Parameters, PublicKey, SecretKey, Seed};
use crate::{Error, Result};
use mhe_math::rq::Representation;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug)]
struct PublicKeyGenConfig {
    par: Arc<Parameters>,
}

/// The collective public key generation protocol.
#[derive(Debug)]
pub struct PublicKeyGenProtocol {
    config: Arc<PublicKeyGenConfig>,
    scratch: Scratch,
}

impl PublicKeyGenProtocol {
    /// Creates a protocol instance for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self {
            config: Arc::new(PublicKeyGenConfig { par: par.clone() }),
            scratch: Scratch::new(),
        }
    }

    /// An instance sharing the configuration of `self`, with its own private
    /// randomness.
    pub fn shallow_copy(&self) -> Self {
        Self {
            config: self.config.clone(),
            scratch: Scratch::new(),
        }
    }

    /// A zero share for a public key at the given levels.
    pub fn allocate_share(&self, level_q: usize, level_p: Option<usize>) -> Result<VectorShare> {
        let par = &self.config.par;
        par.check_levels(level_q, level_p)?;
        Ok(VectorShare {
            par: par.clone(),
            seed: None,
            value: vec![par.ring().zero(level_q, level_p, Representation::Ntt)?],
            level_q,
            level_p,
        })
    }

    /// Writes into `share` the share `-a*s_i + e_i` of the party holding
    /// `sk`, where `a` is generated from `seed`.
    pub fn gen_share(
        &mut self,
        sk: &SecretKey,
        seed: Seed,
        share: &mut VectorShare,
    ) -> Result<()> {
        trace!(
            level_q = share.level_q,
            level_p = ?share.level_p,
            "generating a public key share"
        );
        let (b, _) =
            sk.encrypt_zero_with_seed(seed, share.level_q, share.level_p, &mut self.scratch.rng)?;
        share.value = vec![b];
        share.seed = Some(seed);
        Ok(())
    }

    /// Sets `out = a + b`.
    ///
    /// Returns a `ProtocolMismatch` error if the shares were generated from
    /// different seeds or at different levels.
    pub fn aggregate_shares(
        &self,
        a: &VectorShare,
        b: &VectorShare,
        out: &mut VectorShare,
    ) -> Result<()> {
        VectorShare::aggregate(a, b, out)?;
        debug!(
            level_q = out.level_q,
            level_p = ?out.level_p,
            "aggregated public key shares"
        );
        Ok(())
    }

    /// Writes the collective public key defined by the aggregated `share`
    /// into `pk`, regenerating its uniform component from the seed.
    pub fn finalize(&self, share: &VectorShare, pk: &mut PublicKey) -> Result<()> {
        if pk.level_q() != share.level_q || pk.level_p() != share.level_p {
            return Err(Error::ShapeMismatch(format!(
                "The public key is at levels ({}, {:?}), the share at levels ({}, {:?})",
                pk.level_q(),
                pk.level_p(),
                share.level_q,
                share.level_p
            )));
        }
        let (seed, b) = match (share.seed, share.value.as_slice()) {
            (Some(seed), [b]) => (seed, b),
            _ => {
                return Err(Error::InvalidParameter(
                    "The share was not generated".to_string(),
                ))
            }
        };
        pk.a = CrpGenerator::new(seed).sample_qp(
            self.config.par.ring(),
            share.level_q,
            share.level_p,
        )?;
        pk.b = b.clone();
        pk.seed = Some(seed);
        debug!(
            level_q = share.level_q,
            level_p = ?share.level_p,
            "finalized the collective public key"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PublicKeyGenProtocol;
    use crate::mhe::{
        noise::noise_public_key,
        test_utils::{random_seed, secret_keys},
        AggregateIter, VectorShare,
    };
    use crate::rlwe::{noise::log2_std, Parameters, ParametersBuilder, PublicKey};
    use crate::Error as MheError;
    use rayon::prelude::*;
    use std::error::Error;

    const NUM_PARTIES: usize = 5;

    #[test]
    fn collective_public_key_noise() -> Result<(), Box<dyn Error>> {
        let par = ParametersBuilder::new()
            .set_degree(1 << 11)
            .set_moduli_sizes(&[45; 5])
            .set_p_moduli_sizes(&[45])
            .build_arc()?;
        let (keys, sk) = secret_keys(&par, NUM_PARTIES);
        let seed = random_seed();

        for (level_q, level_p) in [(4, Some(0)), (2, None)] {
            let protocol = PublicKeyGenProtocol::new(&par);
            let shares = keys
                .par_iter()
                .map(|k| {
                    let mut protocol = protocol.shallow_copy();
                    let mut share = protocol.allocate_share(level_q, level_p)?;
                    protocol.gen_share(k, seed, &mut share)?;
                    Ok(share)
                })
                .collect::<crate::Result<Vec<_>>>()?;
            let share = shares
                .par_iter()
                .cloned()
                .map(Ok)
                .try_reduce_with(|a, b| {
                    let mut out = a.clone();
                    protocol.aggregate_shares(&a, &b, &mut out)?;
                    Ok::<_, MheError>(out)
                })
                .ok_or("no shares")??;

            let mut pk = PublicKey::allocate(&par, level_q, level_p)?;
            protocol.finalize(&share, &mut pk)?;
            assert_eq!(pk.seed(), Some(seed));

            // b + a*s is the sum of the errors of the parties.
            let e = pk.b() + &(pk.a() * &*sk.at_level(level_q, level_p)?);
            let measured = log2_std(&e.q)?;
            assert!(measured <= noise_public_key(&par, NUM_PARTIES).log2() + 1.0);
            if let Some(ep) = e.p.as_ref() {
                assert!(log2_std(ep)? <= noise_public_key(&par, NUM_PARTIES).log2() + 1.0);
            }
            let sequential: VectorShare = shares.into_iter().aggregate()?;
            assert_eq!(sequential, share);
        }
        Ok(())
    }

    #[test]
    fn aggregation_order() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, _) = secret_keys(&par, 3);
        let seed = random_seed();
        let mut protocol = PublicKeyGenProtocol::new(&par);
        let mut shares = vec![];
        for k in keys.iter() {
            let mut share = protocol.allocate_share(2, Some(1))?;
            protocol.gen_share(k, seed, &mut share)?;
            shares.push(share);
        }
        let mut s01 = protocol.allocate_share(2, Some(1))?;
        let mut s10 = protocol.allocate_share(2, Some(1))?;
        protocol.aggregate_shares(&shares[0], &shares[1], &mut s01)?;
        protocol.aggregate_shares(&shares[1], &shares[0], &mut s10)?;
        assert_eq!(s01, s10);

        let mut s01_2 = s01.clone();
        protocol.aggregate_shares(&s01, &shares[2], &mut s01_2)?;
        let mut s12 = s01.clone();
        protocol.aggregate_shares(&shares[1], &shares[2], &mut s12)?;
        let mut s0_12 = s01.clone();
        protocol.aggregate_shares(&shares[0], &s12, &mut s0_12)?;
        assert_eq!(s01_2, s0_12);
        Ok(())
    }

    #[test]
    fn mismatches() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, _) = secret_keys(&par, 2);
        let mut protocol = PublicKeyGenProtocol::new(&par);
        let mut a = protocol.allocate_share(2, Some(1))?;
        protocol.gen_share(&keys[0], random_seed(), &mut a)?;
        let mut b = protocol.allocate_share(2, Some(1))?;
        protocol.gen_share(&keys[1], random_seed(), &mut b)?;

        let mut out = a.clone();
        assert!(matches!(
            protocol.aggregate_shares(&a, &b, &mut out),
            Err(MheError::ProtocolMismatch(_))
        ));
        assert_eq!(out, a);

        let mut pk = PublicKey::allocate(&par, 1, Some(1))?;
        assert!(matches!(
            protocol.finalize(&a, &mut pk),
            Err(MheError::ShapeMismatch(_))
        ));
        let mut pk = PublicKey::allocate(&par, 2, Some(1))?;
        let empty = protocol.allocate_share(2, Some(1))?;
        assert!(protocol.finalize(&empty, &mut pk).is_err());
        assert!(protocol.allocate_share(3, None).is_err());
        Ok(())
    }
}
