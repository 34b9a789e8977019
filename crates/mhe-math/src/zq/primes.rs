//! Generation of NTT-friendly primes.

use mhe_util::is_prime;

/// Returns the largest prime of `num_bits` bits that is congruent to 1 modulo
/// `modulo` and strictly smaller than `upper_bound`.
///
/// Returns `None` when `num_bits` is not in [10, 62], when `upper_bound` does
/// not fit in `num_bits` bits, or when no such prime exists.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    if !(10..=62).contains(&num_bits) || modulo == 0 {
        return None;
    }
    if upper_bound > 1 << num_bits || upper_bound <= 1 << (num_bits - 1) {
        return None;
    }

    let leading_zeros = (64 - num_bits) as u32;

    let mut tentative_prime = upper_bound - 1;
    while tentative_prime % modulo != 1 && tentative_prime.leading_zeros() == leading_zeros {
        tentative_prime -= 1
    }

    while tentative_prime.leading_zeros() == leading_zeros
        && !is_prime(tentative_prime)
        && tentative_prime >= modulo
    {
        tentative_prime -= modulo
    }

    if tentative_prime.leading_zeros() == leading_zeros && is_prime(tentative_prime) {
        Some(tentative_prime)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::generate_prime;
    use mhe_util::is_prime;

    #[test]
    fn prime_generation() {
        assert_eq!(generate_prime(49, 2048, 1 << 49), Some(562949953392641));
        assert_eq!(generate_prime(49, 2048, 562949953392641), Some(562949953361921));
        assert!(generate_prime(9, 2048, 1 << 9).is_none());
        assert!(generate_prime(63, 2048, 1 << 62).is_none());
        assert!(generate_prime(30, 2048, 1 << 31).is_none());

        for bits in [20usize, 45, 61, 62] {
            let p = generate_prime(bits, 4096, 1 << bits).unwrap();
            assert!(is_prime(p));
            assert_eq!(p % 4096, 1);
            assert_eq!(64 - p.leading_zeros() as usize, bits);
        }
    }
}
