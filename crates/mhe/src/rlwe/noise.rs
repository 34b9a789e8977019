//! Measurement and estimation of the noise of RLWE objects.

use crate::rlwe::{GadgetShape, Parameters};
use crate::Result;
use mhe_math::rq::{Poly, Representation};
use mhe_util::log2_std_dev;
use num_traits::ToPrimitive;

/// The log2 of the standard deviation of the centered coefficients of `p`,
/// read from its residues modulo the first modulus.
pub fn log2_std(p: &Poly) -> Result<f64> {
    let mut p = p.clone();
    p.change_representation(Representation::PowerBasis);
    Ok(log2_std_dev(&p.center_row(0)?))
}

/// Variance of the noise added by a gadget product at `level` with a gadget
/// ciphertext of the given shape, whose entries have noise of standard
/// deviation `key_std` under a secret of coefficient variance
/// `secret_variance`.
///
/// The first term accounts for the digits multiplying the key noise, the
/// second for the rounding of the division by P.
pub fn gadget_product_variance(
    par: &Parameters,
    shape: &GadgetShape,
    level: usize,
    key_std: f64,
    secret_variance: f64,
) -> Result<f64> {
    let decomposer = shape.decomposer(par)?;
    let n = par.degree() as f64;
    let moduli = par.moduli();

    let digits_second_moment: f64 = (0..decomposer.rns_count_at(level))
        .map(|i| {
            if decomposer.base_two() > 0 {
                let digit = 2f64.powi(decomposer.base_two() as i32);
                decomposer.digit_count() as f64 * digit * digit / 3.0
            } else {
                let group = decomposer.group(i, level);
                let qi = moduli[group]
                    .iter()
                    .map(|q| *q as f64)
                    .product::<f64>();
                qi * qi / 3.0
            }
        })
        .sum();

    let (p, alpha) = match shape.level_p {
        Some(level_p) => {
            let p = par.ring().p().map_or(1.0, |ctx| {
                ctx.modulus(level_p).to_f64().unwrap_or(f64::INFINITY)
            });
            (p, (level_p + 1) as f64)
        }
        None => (1.0, 0.0),
    };

    Ok(n * digits_second_moment * key_std * key_std / (p * p)
        + alpha / 12.0 * (1.0 + n * secret_variance))
}
