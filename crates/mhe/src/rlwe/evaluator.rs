//! Key switching, relinearization and automorphisms of ciphertexts.

use crate::rlwe::{
    Ciphertext, EvaluationKey, GadgetCiphertext, GaloisKey, Parameters, RelinearizationKey,
};
use crate::{Error, Result};
use mhe_math::rq::{Poly, Representation};
use std::sync::Arc;

/// Evaluator of the homomorphic operations consuming gadget ciphertexts.
#[derive(Debug, Clone)]
pub struct Evaluator {
    par: Arc<Parameters>,
}

impl Evaluator {
    /// Creates an evaluator for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self { par: par.clone() }
    }

    /// The gadget product of `c` with `key`: a pair `(d0, d1)` modulo Q at
    /// the level of `c` such that `d0 + d1*s_out` is close to `c * m`, where
    /// `key` encrypts `m` under `s_out`.
    pub fn gadget_product(&self, c: &Poly, key: &GadgetCiphertext) -> Result<(Poly, Poly)> {
        let level = c.level();
        if c.ctx() != self.par.ctx_q() {
            return Err(Error::ShapeMismatch(
                "The polynomial is not defined modulo Q".to_string(),
            ));
        }
        if level > key.level_q() {
            return Err(Error::ShapeMismatch(format!(
                "Cannot compute a gadget product at level {level} with a gadget ciphertext at level {}",
                key.level_q()
            )));
        }

        let digits = key.decomposer.decompose(c)?;
        let mut d0 = self
            .par
            .ring
            .zero(level, key.level_p(), Representation::Ntt)?;
        let mut d1 = d0.clone();
        for (row, b_row, a_row) in itertools::izip!(digits.iter(), key.b.iter(), key.a.iter()) {
            for (digit, b, a) in itertools::izip!(row.iter(), b_row.iter(), a_row.iter()) {
                d0.fma_montgomery(digit, b);
                d1.fma_montgomery(digit, a);
            }
        }

        let extender = self.par.extender();
        Ok((extender.mod_down(&d0)?, extender.mod_down(&d1)?))
    }

    /// Switch the key of a ciphertext of two polynomials from `s_in` to
    /// `s_out`.
    pub fn key_switch(&self, ct: &Ciphertext, key: &EvaluationKey) -> Result<Ciphertext> {
        check_size(ct, 2)?;
        let (d0, d1) = self.gadget_product(&ct.c[1], &key.gadget)?;
        Ciphertext::new(vec![&ct.c[0] + &d0, d1], &self.par)
    }

    /// Reduce a ciphertext of three polynomials to a ciphertext of two
    /// polynomials decrypting to the same value.
    pub fn relinearize(&self, ct: &Ciphertext, key: &RelinearizationKey) -> Result<Ciphertext> {
        check_size(ct, 3)?;
        let (d0, d1) = self.gadget_product(&ct.c[2], &key.gadget)?;
        Ciphertext::new(vec![&ct.c[0] + &d0, &ct.c[1] + &d1], &self.par)
    }

    /// Apply the automorphism `x -> x^galois_element` of `key` to the
    /// plaintext of a ciphertext of two polynomials.
    pub fn automorphism(&self, ct: &Ciphertext, key: &GaloisKey) -> Result<Ciphertext> {
        check_size(ct, 2)?;
        let (d0, d1) = self.gadget_product(&ct.c[1], &key.gadget)?;
        let c0 = (&ct.c[0] + &d0).automorphism(key.galois_element)?;
        let c1 = d1.automorphism(key.galois_element)?;
        Ciphertext::new(vec![c0, c1], &self.par)
    }
}

fn check_size(ct: &Ciphertext, size: usize) -> Result<()> {
    if ct.len() != size {
        Err(Error::ShapeMismatch(format!(
            "Expected a ciphertext of {size} polynomials, got {}",
            ct.len()
        )))
    } else {
        Ok(())
    }
}
