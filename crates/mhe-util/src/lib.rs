#![crate_name = "mhe_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the mhe.rs library: samplers, primality and statistics.

use num_bigint_dig::{prime::probably_prime, BigUint};
use num_traits::ToPrimitive;
use rand::{CryptoRng, RngCore};
use rand_distr::{Distribution, Normal};

/// Returns whether the modulus p is prime; this function is 100% accurate.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Sample a vector of independent centered binomial distributions of a given
/// variance. The variance must be a multiple of 1/2 between 1/2 and 16.
pub fn sample_vec_cbd<R: RngCore + CryptoRng>(
    vector_size: usize,
    variance: f32,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if !(0.5..=16.0).contains(&variance) {
        return Err("The variance should be between 1/2 and 16");
    }
    let pairs = 2.0 * variance;
    if pairs.fract() != 0.0 {
        return Err("The variance should be a multiple of 1/2");
    }
    let pairs = pairs as usize;

    let mut out = Vec::with_capacity(vector_size);
    for _ in 0..vector_size {
        let bits = rng.next_u64();
        let mut v = 0i64;
        for i in 0..pairs {
            v += ((bits >> (2 * i)) & 1) as i64;
            v -= ((bits >> (2 * i + 1)) & 1) as i64;
        }
        out.push(v);
    }
    Ok(out)
}

/// Sample a vector of independent rounded Gaussians of standard deviation
/// `std_dev`, rejecting values whose magnitude exceeds `bound`.
pub fn sample_vec_normal<R: RngCore + CryptoRng>(
    vector_size: usize,
    std_dev: f64,
    bound: f64,
    rng: &mut R,
) -> Result<Vec<i64>, &'static str> {
    if std_dev == 0.0 {
        return Ok(vec![0; vector_size]);
    }
    if !std_dev.is_finite() || std_dev < 0.0 || bound < std_dev {
        return Err("Invalid standard deviation or bound");
    }
    if bound >= (1u64 << 62) as f64 {
        return Err("The bound is too large");
    }
    let normal = Normal::new(0.0, std_dev).map_err(|_| "Invalid standard deviation")?;

    let mut out = Vec::with_capacity(vector_size);
    while out.len() < vector_size {
        let x = normal.sample(rng).round();
        if x.abs() <= bound {
            out.push(x as i64);
        }
    }
    Ok(out)
}

/// Compute the sample variance of a list of values.
pub fn variance<T: ToPrimitive>(values: &[T]) -> f64 {
    assert!(values.len() > 1);
    let values = values
        .iter()
        .map(|v| v.to_f64().unwrap_or(f64::NAN))
        .collect::<Vec<_>>();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (values.len() as f64 - 1.0)
}

/// Returns the base-2 logarithm of the standard deviation of the values.
pub fn log2_std_dev<T: ToPrimitive>(values: &[T]) -> f64 {
    variance(values).sqrt().log2()
}

#[cfg(test)]
mod tests {
    use super::{is_prime, sample_vec_cbd, sample_vec_normal, variance};
    use proptest::prelude::*;
    use rand::thread_rng;

    #[test]
    fn prime() {
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(is_prime(5));
        assert!(is_prime(4611686018326724609));

        assert!(!is_prime(0));
        assert!(!is_prime(1));
        assert!(!is_prime(4));
        assert!(!is_prime(1 << 62));
        assert!(!is_prime(65537 * 65539));
    }

    #[test]
    fn cbd() {
        let mut rng = thread_rng();
        assert!(sample_vec_cbd(10, 0.0, &mut rng).is_err());
        assert!(sample_vec_cbd(10, 0.7, &mut rng).is_err());
        assert!(sample_vec_cbd(10, 17.0, &mut rng).is_err());

        for var in [0.5f32, 1.0, 3.5, 10.0, 16.0] {
            let v = sample_vec_cbd(10000, var, &mut rng).unwrap();
            let bound = (2.0 * var) as i64;
            assert!(v.iter().all(|vi| vi.abs() <= bound));
            assert!((variance(&v) - var as f64).abs() < 0.1 * var as f64 + 0.05);
        }
    }

    #[test]
    fn normal() {
        let mut rng = thread_rng();
        assert_eq!(sample_vec_normal(8, 0.0, 0.0, &mut rng).unwrap(), vec![0; 8]);
        assert!(sample_vec_normal(8, 3.2, 1.0, &mut rng).is_err());
        assert!(sample_vec_normal(8, -1.0, 6.0, &mut rng).is_err());

        let v = sample_vec_normal(10000, 3.2, 19.2, &mut rng).unwrap();
        assert!(v.iter().all(|vi| vi.abs() <= 19));
        assert!((variance(&v).sqrt() - 3.2).abs() < 0.2);

        let v = sample_vec_normal(10000, (1u64 << 30) as f64, (1u64 << 35) as f64, &mut rng).unwrap();
        assert!((variance(&v).sqrt().log2() - 30.0).abs() < 0.1);
    }

    proptest! {
        #[test]
        fn prime_matches_trial_division(p in 0u64..100_000) {
            let expected = p >= 2 && (2..).take_while(|d| d * d <= p).all(|d| p % d != 0);
            prop_assert_eq!(is_prime(p), expected);
        }

        #[test]
        fn cbd_is_bounded(size in 1usize..64, pairs in 1usize..=32) {
            let var = pairs as f32 / 2.0;
            let v = sample_vec_cbd(size, var, &mut thread_rng()).unwrap();
            prop_assert_eq!(v.len(), size);
            prop_assert!(v.iter().all(|vi| vi.abs() <= pairs as i64));
        }
    }
}
