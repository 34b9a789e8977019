use itertools::Itertools;
use num_bigint::BigUint;
use std::{fmt::Debug, sync::Arc};

use crate::{ntt::NttOperator, zq::Modulus, Error, Result};

/// Struct that holds the context associated with elements in rq: a chain of
/// NTT-friendly prime moduli for a fixed polynomial degree.
///
/// A polynomial at level `l` uses the first `l + 1` moduli of the chain.
#[derive(Clone, PartialEq, Eq)]
pub struct Context {
    /// List of prime moduli
    pub(crate) moduli: Box<[u64]>,
    /// Modulus operators for each prime
    pub(crate) q: Box<[Modulus]>,
    /// NTT operators for each prime
    pub(crate) ops: Box<[NttOperator]>,
    /// Polynomial degree (must be power of 2)
    pub(crate) degree: usize,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("moduli", &self.moduli)
            .field("degree", &self.degree)
            .finish()
    }
}

impl Context {
    /// Creates a context from a list of moduli and a polynomial degree.
    ///
    /// Returns an error if the moduli are not distinct primes less than 62
    /// bits which support the NTT of size `degree`.
    pub fn new(moduli: &[u64], degree: usize) -> Result<Self> {
        if !degree.is_power_of_two() || degree < 8 {
            return Err(Error::Default(
                "The degree is not a power of two larger or equal to 8".to_string(),
            ));
        }
        if moduli.is_empty() {
            return Err(Error::Default("The list of moduli is empty".to_string()));
        }
        if !moduli.iter().all_unique() {
            return Err(Error::Default("The moduli are not distinct".to_string()));
        }

        let mut q = Vec::with_capacity(moduli.len());
        let mut ops = Vec::with_capacity(moduli.len());
        for modulus in moduli {
            let qi = Modulus::new(*modulus)?;
            let op = NttOperator::new(&qi, degree).ok_or_else(|| {
                Error::Default(format!(
                    "Impossible to construct a Ntt operator for modulus {modulus}"
                ))
            })?;
            q.push(qi);
            ops.push(op);
        }

        Ok(Self {
            moduli: moduli.to_owned().into_boxed_slice(),
            q: q.into_boxed_slice(),
            ops: ops.into_boxed_slice(),
            degree,
        })
    }

    /// Creates a context in an `Arc`.
    pub fn new_arc(moduli: &[u64], degree: usize) -> Result<Arc<Self>> {
        Self::new(moduli, degree).map(Arc::new)
    }

    /// Returns the product of the moduli up to `level` as a BigUint.
    pub fn modulus(&self, level: usize) -> BigUint {
        self.moduli[..=level.min(self.max_level())]
            .iter()
            .fold(BigUint::from(1u64), |acc, qi| acc * *qi)
    }

    /// Returns a reference to the moduli in this context.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the moduli as Modulus in this context.
    pub fn moduli_operators(&self) -> &[Modulus] {
        &self.q
    }

    /// Returns the degree of the polynomials.
    pub const fn degree(&self) -> usize {
        self.degree
    }

    /// Returns the highest level supported by the context.
    pub fn max_level(&self) -> usize {
        self.moduli.len() - 1
    }

    /// Returns an error if `level` exceeds the highest level of the context.
    pub fn check_level(&self, level: usize) -> Result<()> {
        if level > self.max_level() {
            Err(Error::InvalidLevel(level, self.max_level()))
        } else {
            Ok(())
        }
    }
}
