//! Closed-form estimates of the standard deviation of the noise of the
//! objects produced by the protocols, for `n` parties with secrets and
//! errors sampled from the distributions of the parameters.

use crate::mhe::KeySwitchTarget;
use crate::rlwe::{noise::gadget_product_variance, GadgetShape, Parameters};
use crate::Result;

fn secret_variance(par: &Parameters, parties: usize) -> f64 {
    parties as f64 * par.secret_variance() as f64
}

fn error_variance(par: &Parameters, parties: usize) -> f64 {
    parties as f64 * par.error_std() * par.error_std()
}

/// Noise of a collective public key: the sum of the errors of the parties.
pub fn noise_public_key(par: &Parameters, parties: usize) -> f64 {
    error_variance(par, parties).sqrt()
}

/// Noise of the entries of a collective evaluation key.
pub fn noise_evaluation_key(par: &Parameters, parties: usize) -> f64 {
    error_variance(par, parties).sqrt()
}

/// Noise of the entries of a collective Galois key.
pub fn noise_galois_key(par: &Parameters, parties: usize) -> f64 {
    noise_evaluation_key(par, parties)
}

/// Noise of the entries of a collective relinearization key, generated from
/// a collective public key: `u*e_pk + e0 + e1*s`.
pub fn noise_relinearization_key(par: &Parameters, parties: usize) -> f64 {
    let n = par.degree() as f64;
    let e = error_variance(par, parties);
    let s = secret_variance(par, parties);
    (e * (1.0 + 2.0 * n * s)).sqrt()
}

/// Noise added by a gadget product at `level` with a collective key of the
/// given shape whose entries have noise `key_std`.
pub fn noise_gadget_product(
    par: &Parameters,
    shape: &GadgetShape,
    level: usize,
    key_std: f64,
    parties: usize,
) -> Result<f64> {
    Ok(gadget_product_variance(par, shape, level, key_std, secret_variance(par, parties))?.sqrt())
}

/// Noise of a ciphertext of noise `input_std` after a collective key switch
/// to a target of the given kind, with smudging noise `smudging_std`.
pub fn noise_key_switch(
    par: &Parameters,
    target: KeySwitchTarget,
    parties: usize,
    input_std: f64,
    smudging_std: f64,
) -> f64 {
    let smudging = parties as f64 * smudging_std * smudging_std;
    let variance = match target {
        KeySwitchTarget::SecretKey => smudging,
        KeySwitchTarget::PublicKey => {
            // u*e_pk and e1*s_out
            let n = par.degree() as f64;
            smudging + 2.0 * n * secret_variance(par, parties) * error_variance(par, parties)
        }
    };
    (input_std * input_std + variance).sqrt()
}

/// Noise of a collective circular ciphertext at `level`, with an encryption
/// of the ephemeral secret of shape `helper_shape`: `e_u*s - e_s*u` plus the
/// gadget product.
pub fn noise_circular_ciphertext(
    par: &Parameters,
    helper_shape: &GadgetShape,
    level: usize,
    parties: usize,
) -> Result<f64> {
    let n = par.degree() as f64;
    let products = 2.0 * n * secret_variance(par, parties) * error_variance(par, parties);
    let gadget = gadget_product_variance(
        par,
        helper_shape,
        level,
        noise_evaluation_key(par, parties),
        secret_variance(par, parties),
    )?;
    Ok((products + gadget).sqrt())
}

#[cfg(test)]
mod tests {
    use super::{
        noise_circular_ciphertext, noise_evaluation_key, noise_gadget_product,
        noise_key_switch, noise_public_key, noise_relinearization_key,
    };
    use crate::mhe::KeySwitchTarget;
    use crate::rlwe::{GadgetShape, Parameters};
    use std::error::Error;

    #[test]
    fn monotonic_in_parties() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let shape = GadgetShape::new(2, Some(1), 0);
        for parties in 1..8 {
            assert!(noise_public_key(&par, parties) < noise_public_key(&par, parties + 1));
            assert!(
                noise_relinearization_key(&par, parties)
                    < noise_relinearization_key(&par, parties + 1)
            );
            assert!(
                noise_circular_ciphertext(&par, &shape, 2, parties)?
                    < noise_circular_ciphertext(&par, &shape, 2, parties + 1)?
            );
        }
        assert!((noise_public_key(&par, 1) - par.error_std()).abs() < 1e-9);
        assert!((noise_evaluation_key(&par, 4) - 2.0 * par.error_std()).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn key_switch() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let sk = noise_key_switch(&par, KeySwitchTarget::SecretKey, 4, 0.0, 8.0);
        assert!((sk - 16.0).abs() < 1e-9);
        let pk = noise_key_switch(&par, KeySwitchTarget::PublicKey, 4, 0.0, 8.0);
        assert!(pk > sk);

        let fine = GadgetShape::new(2, Some(0), 10);
        let coarse = GadgetShape::new(2, Some(0), 30);
        let std = par.error_std();
        assert!(
            noise_gadget_product(&par, &fine, 2, std, 4)?
                < noise_gadget_product(&par, &coarse, 2, std, 4)?
        );
        Ok(())
    }
}
