use crate::zq::Modulus;
use itertools::{izip, Itertools};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::iter::successors;

/// Negacyclic Number-Theoretic Transform operator for one modulus.
///
/// The twiddle factors are the powers of a 2n-th primitive root of unity in
/// bit-reversed order, so that the forward transform evaluates a polynomial
/// modulo X^n + 1 at the odd powers of the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttOperator {
    p: Modulus,
    p_twice: u64,
    size: usize,
    omegas: Box<[u64]>,
    omegas_shoup: Box<[u64]>,
    zetas_inv: Box<[u64]>,
    zetas_inv_shoup: Box<[u64]>,
    size_inv: u64,
    size_inv_shoup: u64,
}

impl NttOperator {
    /// Create an NTT operator given a modulus for a specific size.
    ///
    /// Returns None if the modulus does not support the NTT for this specific
    /// size.
    pub fn new(p: &Modulus, size: usize) -> Option<Self> {
        if !super::supports_ntt(p.p, size) {
            return None;
        }

        let size_inv = p.inv(size as u64)?;
        let omega = Self::primitive_root(size, p)?;
        let omega_inv = p.inv(omega)?;

        let powers = successors(Some(1u64), |n| Some(p.mul(*n, omega)))
            .take(size)
            .collect_vec();
        let powers_inv = successors(Some(omega_inv), |n| Some(p.mul(*n, omega_inv)))
            .take(size)
            .collect_vec();

        let shift = size.leading_zeros() + 1;
        let (omegas, zetas_inv): (Vec<u64>, Vec<u64>) = (0..size)
            .map(|i| {
                let j = i.reverse_bits() >> shift;
                (powers[j], powers_inv[j])
            })
            .unzip();

        Some(Self {
            p: p.clone(),
            p_twice: p.p * 2,
            size,
            omegas_shoup: p.shoup_vec(&omegas).into_boxed_slice(),
            zetas_inv_shoup: p.shoup_vec(&zetas_inv).into_boxed_slice(),
            omegas: omegas.into_boxed_slice(),
            zetas_inv: zetas_inv.into_boxed_slice(),
            size_inv,
            size_inv_shoup: p.shoup(size_inv),
        })
    }

    /// Returns the size of the transform.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Compute the forward NTT in place.
    ///
    /// Aborts if a is not of the size handled by the operator.
    pub fn forward(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.size);

        let mut l = self.size >> 1;
        let mut k = 1;
        while l > 0 {
            for block in a.chunks_exact_mut(2 * l) {
                let omega = self.omegas[k];
                let omega_shoup = self.omegas_shoup[k];
                k += 1;

                let (lo, hi) = block.split_at_mut(l);
                izip!(lo.iter_mut(), hi.iter_mut())
                    .for_each(|(x, y)| self.butterfly(x, y, omega, omega_shoup));
            }
            l >>= 1;
        }

        a.iter_mut().for_each(|ai| *ai = self.reduce3(*ai));
    }

    /// Compute the backward NTT in place.
    ///
    /// Aborts if a is not of the size handled by the operator.
    pub fn backward(&self, a: &mut [u64]) {
        assert_eq!(a.len(), self.size);

        let mut k = 0;
        let mut l = 1;
        while l < self.size {
            for block in a.chunks_exact_mut(2 * l) {
                let zeta_inv = self.zetas_inv[k];
                let zeta_inv_shoup = self.zetas_inv_shoup[k];
                k += 1;

                let (lo, hi) = block.split_at_mut(l);
                izip!(lo.iter_mut(), hi.iter_mut())
                    .for_each(|(x, y)| self.inv_butterfly(x, y, zeta_inv, zeta_inv_shoup));
            }
            l <<= 1;
        }

        a.iter_mut()
            .for_each(|ai| *ai = self.p.mul_shoup(*ai, self.size_inv, self.size_inv_shoup));
    }

    /// Reduce a modulo p.
    ///
    /// Aborts if a >= 4 * p in debug mode.
    const fn reduce3(&self, a: u64) -> u64 {
        debug_assert!(a < 4 * self.p.p);

        let y = Modulus::reduce1(a, self.p_twice);
        Modulus::reduce1(y, self.p.p)
    }

    /// NTT butterfly; inputs and outputs are in [0, 4p).
    fn butterfly(&self, x: &mut u64, y: &mut u64, w: u64, w_shoup: u64) {
        debug_assert!(*x < 4 * self.p.p);
        debug_assert!(*y < 4 * self.p.p);

        *x = Modulus::reduce1(*x, self.p_twice);
        let t = self.p.lazy_mul_shoup(*y, w, w_shoup);
        *y = *x + self.p_twice - t;
        *x += t;
    }

    /// Inverse NTT butterfly; inputs and outputs are in [0, 2p).
    fn inv_butterfly(&self, x: &mut u64, y: &mut u64, z: u64, z_shoup: u64) {
        debug_assert!(*x < self.p_twice);
        debug_assert!(*y < self.p_twice);

        let t = *x;
        *x = Modulus::reduce1(*y + t, self.p_twice);
        *y = self.p.lazy_mul_shoup(self.p_twice + t - *y, z, z_shoup);
    }

    /// Returns a 2n-th primitive root modulo p.
    ///
    /// The search is seeded so that every party derives the same root.
    fn primitive_root(n: usize, p: &Modulus) -> Option<u64> {
        let lambda = (p.p - 1) / (2 * n as u64);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        (0..100).find_map(|_| {
            let root = p.pow(rng.gen_range(0..p.p), lambda);
            Self::is_primitive_root(root, 2 * n, p).then_some(root)
        })
    }

    /// Returns whether a is a n-th primitive root of unity, n a power of two.
    fn is_primitive_root(a: u64, n: usize, p: &Modulus) -> bool {
        (p.pow(a, n as u64) == 1) && (p.pow(a, (n / 2) as u64) != 1)
    }
}
