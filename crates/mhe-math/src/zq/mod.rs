//! Ring of integers modulo a prime p, with Shoup and Montgomery
//! multiplication.

pub mod primes;

use crate::{Error, Result};
use itertools::izip;
use rand::RngCore;

/// Structure encapsulating an integer modulus up to 62 bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modulus {
    pub(crate) p: u64,
    nbits: usize,
    /// -p^(-1) mod 2^64, used by the Montgomery reduction.
    montgomery_neg_inv: u64,
}

impl Modulus {
    /// Create a modulus from an odd integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 3 || p >> 62 != 0 || p & 1 == 0 {
            return Err(Error::InvalidModulus(p));
        }

        // Newton iteration doubles the number of correct low bits at each step.
        let mut inv = 1u64;
        for _ in 0..6 {
            inv = inv.wrapping_mul(2u64.wrapping_sub(p.wrapping_mul(inv)));
        }
        debug_assert_eq!(p.wrapping_mul(inv), 1);

        Ok(Self {
            p,
            nbits: 64 - p.leading_zeros() as usize,
            montgomery_neg_inv: inv.wrapping_neg(),
        })
    }

    /// Returns the value of the modulus.
    pub const fn modulus(&self) -> u64 {
        self.p
    }

    /// Returns the number of bits of the modulus.
    pub const fn bits(&self) -> usize {
        self.nbits
    }

    /// Modular addition of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Modular subtraction of a and b.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Modular negation of a.
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Modular multiplication of a and b.
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        self.reduce_u128((a as u128) * (b as u128))
    }

    /// Modular exponentiation.
    pub const fn pow(&self, a: u64, n: u64) -> u64 {
        let mut result = 1 % self.p;
        let mut base = a % self.p;
        let mut n = n;
        while n > 0 {
            if n & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            n >>= 1;
        }
        result
    }

    /// Modular inverse of a, which requires p to be prime.
    ///
    /// Returns `None` when a is zero modulo p.
    pub fn inv(&self, a: u64) -> Option<u64> {
        let a = a % self.p;
        if a == 0 {
            None
        } else {
            let r = self.pow(a, self.p - 2);
            debug_assert_eq!(self.mul(a, r), 1);
            Some(r)
        }
    }

    /// Reduce a modulo p.
    pub const fn reduce(&self, a: u64) -> u64 {
        a % self.p
    }

    /// Reduce a 128-bit integer modulo p.
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        (a % (self.p as u128)) as u64
    }

    /// Reduce a signed integer modulo p.
    pub const fn reduce_i64(&self, a: i64) -> u64 {
        let r = a.unsigned_abs() % self.p;
        if a < 0 {
            Self::reduce1(self.p - r, self.p)
        } else {
            r
        }
    }

    /// Returns the representative of a in (-p/2, p/2].
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn center(&self, a: u64) -> i64 {
        debug_assert!(a < self.p);
        if a > self.p >> 1 {
            a as i64 - self.p as i64
        } else {
            a as i64
        }
    }

    /// Shoup representation of a, i.e. floor(a * 2^64 / p).
    ///
    /// Aborts if a >= p in debug mode.
    pub const fn shoup(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        (((a as u128) << 64) / (self.p as u128)) as u64
    }

    /// Shoup multiplication of a and b, with b_shoup the Shoup representation
    /// of b. The output is in [0, 2p).
    pub const fn lazy_mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        let q = (((a as u128) * (b_shoup as u128)) >> 64) as u64;
        let r = a.wrapping_mul(b).wrapping_sub(q.wrapping_mul(self.p));
        debug_assert!(r < 2 * self.p);
        r
    }

    /// Shoup multiplication of a and b, with b_shoup the Shoup representation
    /// of b.
    pub const fn mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        Self::reduce1(self.lazy_mul_shoup(a, b, b_shoup), self.p)
    }

    /// Convert a into the Montgomery domain, i.e. compute a * 2^64 mod p.
    pub const fn to_montgomery(&self, a: u64) -> u64 {
        self.reduce_u128((a as u128) << 64)
    }

    /// Convert a out of the Montgomery domain.
    pub const fn from_montgomery(&self, a: u64) -> u64 {
        self.mul_montgomery(a, 1)
    }

    /// Montgomery multiplication: computes a * b * 2^(-64) mod p. When b is
    /// in Montgomery form, the output is the plain product a * b mod p.
    ///
    /// Aborts if a >= p or b >= p in debug mode.
    pub const fn mul_montgomery(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        let t = (a as u128) * (b as u128);
        let m = (t as u64).wrapping_mul(self.montgomery_neg_inv);
        let u = ((t + (m as u128) * (self.p as u128)) >> 64) as u64;
        Self::reduce1(u, self.p)
    }

    /// Modular addition of vectors in place.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.add(*ai, *bi));
    }

    /// Modular subtraction of vectors in place.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.sub(*ai, *bi));
    }

    /// Modular negation of a vector in place.
    pub fn neg_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.neg(*ai));
    }

    /// Modular multiplication of vectors in place.
    pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.mul(*ai, *bi));
    }

    /// Modular multiplication of a vector by a scalar in place.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        let b = self.reduce(b);
        let b_shoup = self.shoup(b);
        a.iter_mut()
            .for_each(|ai| *ai = self.mul_shoup(*ai, b, b_shoup));
    }

    /// Montgomery multiplication of vectors in place.
    pub fn mul_montgomery_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.mul_montgomery(*ai, *bi));
    }

    /// Computes acc += a * b * 2^(-64) mod p, coefficient-wise.
    pub fn fma_montgomery_vec(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        debug_assert_eq!(acc.len(), a.len());
        debug_assert_eq!(acc.len(), b.len());
        izip!(acc.iter_mut(), a.iter(), b.iter())
            .for_each(|(ci, ai, bi)| *ci = self.add(*ci, self.mul_montgomery(*ai, *bi)));
    }

    /// Convert a vector into the Montgomery domain in place.
    pub fn to_montgomery_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.to_montgomery(*ai));
    }

    /// Convert a vector out of the Montgomery domain in place.
    pub fn from_montgomery_vec(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = self.from_montgomery(*ai));
    }

    /// Shoup representation of a vector.
    pub fn shoup_vec(&self, a: &[u64]) -> Vec<u64> {
        a.iter().map(|ai| self.shoup(*ai)).collect()
    }

    /// Reduce a vector of signed integers modulo p.
    pub fn reduce_vec_i64(&self, a: &[i64]) -> Vec<u64> {
        a.iter().map(|ai| self.reduce_i64(*ai)).collect()
    }

    /// Center a vector in (-p/2, p/2].
    pub fn center_vec(&self, a: &[u64]) -> Vec<i64> {
        a.iter().map(|ai| self.center(*ai)).collect()
    }

    /// Sample a vector of uniformly random values modulo p.
    ///
    /// Rejection sampling consumes the generator deterministically, so two
    /// generators in the same state produce the same vector.
    pub fn random_vec<R: RngCore>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        let mask = u64::MAX >> (64 - self.nbits);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            let v = rng.next_u64() & mask;
            if v < self.p {
                out.push(v);
            }
        }
        out
    }

    /// Returns x - p when x >= p, x otherwise.
    pub(crate) const fn reduce1(x: u64, p: u64) -> u64 {
        let (y, borrow) = x.overflowing_sub(p);
        if borrow {
            x
        } else {
            y
        }
    }
}
