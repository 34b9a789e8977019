//! Polynomials in R_q\[x\] = (ZZ_q1 x ... x ZZ_qn)\[x\] / (x^N + 1), stored in
//! RNS form: one row of coefficients per active modulus.

mod context;
mod ops;
mod qp;
mod serialize;
pub mod traits;

pub use context::Context;
pub use qp::{PolyQP, RingQP};

use crate::{Error, Result};
use itertools::izip;
use mhe_util::{sample_vec_cbd, sample_vec_normal};
use ndarray::{s, Array2, ArrayView2};
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use traits::TryConvertFrom;
use zeroize::{Zeroize, Zeroizing};

/// Possible representations of the underlying polynomial.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// This is the list of coefficients ci, such that the polynomial is c0 + c1
    /// * x + ... + c_(degree - 1) * x^(degree - 1)
    #[default]
    PowerBasis,
    /// This is the NTT representation of the PowerBasis representation.
    Ntt,
}

/// Struct that holds a polynomial for a specific context, at a specific
/// level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly {
    pub(crate) ctx: Arc<Context>,
    pub(crate) representation: Representation,
    pub(crate) coefficients: Array2<u64>,
}

/// Rows of a coefficient matrix. The matrices are always allocated in
/// standard layout, so every row is a contiguous slice.
pub(crate) fn rows(coefficients: &Array2<u64>) -> impl Iterator<Item = &[u64]> + '_ {
    let degree = coefficients.ncols();
    coefficients
        .as_slice()
        .into_iter()
        .flat_map(move |c| c.chunks_exact(degree))
}

/// Mutable rows of a coefficient matrix.
pub(crate) fn rows_mut(coefficients: &mut Array2<u64>) -> impl Iterator<Item = &mut [u64]> + '_ {
    let degree = coefficients.ncols();
    coefficients
        .as_slice_mut()
        .into_iter()
        .flat_map(move |c| c.chunks_exact_mut(degree))
}

impl Poly {
    /// Creates a polynomial holding the constant 0 at `level`.
    ///
    /// Aborts if the level exceeds the levels of the context.
    pub fn zero(ctx: &Arc<Context>, level: usize, representation: Representation) -> Self {
        assert!(level <= ctx.max_level());
        Self {
            ctx: ctx.clone(),
            representation,
            coefficients: Array2::zeros((level + 1, ctx.degree)),
        }
    }

    /// Generate a uniformly random polynomial. The generator is consumed
    /// modulus by modulus, so two generators in the same state produce the
    /// same polynomial.
    pub fn random<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
        rng: &mut R,
    ) -> Self {
        let mut p = Poly::zero(ctx, level, representation);
        izip!(rows_mut(&mut p.coefficients), ctx.q.iter()).for_each(|(row, qi)| {
            row.copy_from_slice(&qi.random_vec(ctx.degree, rng));
        });
        p
    }

    /// Generate a uniformly random polynomial from a seed.
    pub fn random_from_seed(
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
        seed: <ChaCha8Rng as SeedableRng>::Seed,
    ) -> Self {
        let mut rng = ChaCha8Rng::from_seed(seed);
        Self::random(ctx, level, representation, &mut rng)
    }

    /// Generate a small polynomial whose coefficients follow a centered
    /// binomial distribution of the given variance.
    pub fn small<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
        variance: f32,
        rng: &mut R,
    ) -> Result<Self> {
        let coeffs = Zeroizing::new(
            sample_vec_cbd(ctx.degree, variance, rng)
                .map_err(|e| Error::SamplingError(e.to_string()))?,
        );
        Poly::try_convert_from(&coeffs[..], ctx, level, representation)
    }

    /// Generate a polynomial whose coefficients follow a rounded Gaussian of
    /// standard deviation `std_dev`, truncated at `bound`.
    pub fn gaussian<R: RngCore + CryptoRng>(
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
        std_dev: f64,
        bound: f64,
        rng: &mut R,
    ) -> Result<Self> {
        let coeffs = Zeroizing::new(
            sample_vec_normal(ctx.degree, std_dev, bound, rng)
                .map_err(|e| Error::SamplingError(e.to_string()))?,
        );
        Poly::try_convert_from(&coeffs[..], ctx, level, representation)
    }

    /// Access the polynomial context.
    pub fn ctx(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Returns the level of the polynomial, i.e. its number of rows minus one.
    pub fn level(&self) -> usize {
        self.coefficients.nrows() - 1
    }

    /// Current representation of the polynomial.
    pub const fn representation(&self) -> &Representation {
        &self.representation
    }

    /// Get a view on the coefficients, one row per modulus.
    pub fn coefficients(&self) -> ArrayView2<u64> {
        self.coefficients.view()
    }

    /// Change the representation of the underlying polynomial.
    pub fn change_representation(&mut self, to: Representation) {
        match (self.representation, to) {
            (Representation::PowerBasis, Representation::Ntt) => {
                izip!(rows_mut(&mut self.coefficients), self.ctx.ops.iter())
                    .for_each(|(row, op)| op.forward(row));
            }
            (Representation::Ntt, Representation::PowerBasis) => {
                izip!(rows_mut(&mut self.coefficients), self.ctx.ops.iter())
                    .for_each(|(row, op)| op.backward(row));
            }
            _ => {}
        }
        self.representation = to;
    }

    /// Convert the coefficients into the Montgomery domain.
    pub fn to_montgomery(&mut self) {
        izip!(rows_mut(&mut self.coefficients), self.ctx.q.iter())
            .for_each(|(row, qi)| qi.to_montgomery_vec(row));
    }

    /// Convert the coefficients out of the Montgomery domain.
    pub fn from_montgomery(&mut self) {
        izip!(rows_mut(&mut self.coefficients), self.ctx.q.iter())
            .for_each(|(row, qi)| qi.from_montgomery_vec(row));
    }

    /// Montgomery multiplication by `other`; when `other` is in the
    /// Montgomery domain this is the plain product.
    ///
    /// Aborts if the polynomials are not in NTT representation, or if `other`
    /// has fewer rows than `self`.
    pub fn mul_montgomery_assign(&mut self, other: &Poly) {
        assert_eq!(self.representation, Representation::Ntt);
        assert_eq!(other.representation, Representation::Ntt);
        assert!(other.level() >= self.level());
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&other.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(a, b, qi)| qi.mul_montgomery_vec(a, b));
    }

    /// Computes `self += a * b * 2^(-64)` over the rows of `self`.
    ///
    /// Aborts if the polynomials are not in NTT representation, or if `a` or
    /// `b` have fewer rows than `self`.
    pub fn fma_montgomery(&mut self, a: &Poly, b: &Poly) {
        assert_eq!(self.representation, Representation::Ntt);
        assert_eq!(a.representation, Representation::Ntt);
        assert_eq!(b.representation, Representation::Ntt);
        assert!(a.level() >= self.level() && b.level() >= self.level());
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&a.coefficients),
            rows(&b.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(c, a, b, qi)| qi.fma_montgomery_vec(c, a, b));
    }

    /// Computes `self += a * scalars`, where `scalars` holds one value per
    /// modulus.
    ///
    /// Aborts if the representations differ or if `a` has fewer rows than
    /// `self`.
    pub fn fma_scalar_rns(&mut self, a: &Poly, scalars: &[u64]) {
        assert_eq!(self.representation, a.representation);
        assert!(a.level() >= self.level());
        assert!(scalars.len() > self.level());
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&a.coefficients),
            scalars.iter(),
            self.ctx.q.iter()
        )
        .for_each(|(c, a, s, qi)| {
            let s = qi.reduce(*s);
            if s != 0 {
                let s_shoup = qi.shoup(s);
                izip!(c.iter_mut(), a.iter())
                    .for_each(|(ci, ai)| *ci = qi.add(*ci, qi.mul_shoup(*ai, s, s_shoup)));
            }
        });
    }

    /// Multiply the polynomial by one scalar per modulus.
    pub fn mul_scalar_rns(&mut self, scalars: &[u64]) {
        assert!(scalars.len() > self.level());
        izip!(
            rows_mut(&mut self.coefficients),
            scalars.iter(),
            self.ctx.q.iter()
        )
        .for_each(|(row, s, qi)| qi.scalar_mul_vec(row, *s));
    }

    /// Montgomery multiplication by one scalar per modulus; when the scalars
    /// are in the Montgomery domain this is the plain product.
    pub fn mul_scalar_rns_montgomery(&mut self, scalars: &[u64]) {
        assert!(scalars.len() > self.level());
        izip!(
            rows_mut(&mut self.coefficients),
            scalars.iter(),
            self.ctx.q.iter()
        )
        .for_each(|(row, s, qi)| {
            row.iter_mut()
                .for_each(|ri| *ri = qi.mul_montgomery(*ri, *s))
        });
    }

    /// Multiply the polynomial by a scalar.
    pub fn mul_scalar(&mut self, scalar: u64) {
        izip!(rows_mut(&mut self.coefficients), self.ctx.q.iter())
            .for_each(|(row, qi)| qi.scalar_mul_vec(row, scalar));
    }

    /// Apply the automorphism x -> x^galois_element, for an odd
    /// `galois_element` smaller than twice the degree.
    pub fn automorphism(&self, galois_element: usize) -> Result<Self> {
        let degree = self.ctx.degree;
        if galois_element % 2 == 0 || galois_element >= 2 * degree {
            return Err(Error::Default(format!(
                "Invalid Galois element {galois_element} for degree {degree}"
            )));
        }

        let mut input = self.clone();
        input.change_representation(Representation::PowerBasis);
        let mut out = Poly::zero(&self.ctx, self.level(), Representation::PowerBasis);
        izip!(
            rows_mut(&mut out.coefficients),
            rows(&input.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(o, i, qi)| {
            for (k, ik) in i.iter().enumerate() {
                let j = (k * galois_element) % (2 * degree);
                if j < degree {
                    o[j] = *ik;
                } else {
                    o[j - degree] = qi.neg(*ik);
                }
            }
        });
        input.zeroize();

        out.change_representation(self.representation);
        Ok(out)
    }

    /// Drop the rows above `level`.
    pub fn drop_to_level(&mut self, level: usize) -> Result<()> {
        if level > self.level() {
            return Err(Error::InvalidLevel(level, self.level()));
        }
        if level < self.level() {
            self.coefficients = self.coefficients.slice(s![..=level, ..]).to_owned();
        }
        Ok(())
    }

    /// Returns a copy of the polynomial restricted to the rows up to `level`.
    pub fn at_level(&self, level: usize) -> Result<Self> {
        if level > self.level() {
            return Err(Error::InvalidLevel(level, self.level()));
        }
        Ok(Self {
            ctx: self.ctx.clone(),
            representation: self.representation,
            coefficients: self.coefficients.slice(s![..=level, ..]).to_owned(),
        })
    }

    /// Returns the coefficients of the row `row` centered around 0.
    pub fn center_row(&self, row: usize) -> Result<Vec<i64>> {
        if self.representation != Representation::PowerBasis {
            return Err(Error::IncorrectRepresentation(
                self.representation,
                Representation::PowerBasis,
            ));
        }
        let values = rows(&self.coefficients)
            .nth(row)
            .ok_or(Error::InvalidLevel(row, self.level()))?;
        Ok(self.ctx.q[row].center_vec(values))
    }
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        if let Some(coefficients) = self.coefficients.as_slice_mut() {
            coefficients.zeroize()
        }
    }
}

impl TryConvertFrom<&[i64]> for Poly {
    /// The values are the coefficients of the polynomial in power basis; the
    /// output is converted to `representation`.
    fn try_convert_from(
        value: &[i64],
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
    ) -> Result<Self> {
        ctx.check_level(level)?;
        if value.len() > ctx.degree {
            return Err(Error::Default(
                "Converting from a vector larger than the degree".to_string(),
            ));
        }
        let mut p = Poly::zero(ctx, level, Representation::PowerBasis);
        izip!(rows_mut(&mut p.coefficients), ctx.q.iter()).for_each(|(row, qi)| {
            izip!(row.iter_mut(), value.iter()).for_each(|(r, v)| *r = qi.reduce_i64(*v))
        });
        p.change_representation(representation);
        Ok(p)
    }
}

impl TryConvertFrom<Array2<u64>> for Poly {
    /// The rows are the residues modulo the first moduli of the context, in
    /// the given representation.
    fn try_convert_from(
        value: Array2<u64>,
        ctx: &Arc<Context>,
        level: usize,
        representation: Representation,
    ) -> Result<Self> {
        ctx.check_level(level)?;
        if value.nrows() != level + 1 || value.ncols() != ctx.degree {
            return Err(Error::Default(
                "The array of coefficient does not have the correct shape".to_string(),
            ));
        }
        let coefficients = value.as_standard_layout().into_owned();
        if !izip!(rows(&coefficients), ctx.moduli.iter())
            .all(|(row, qi)| row.iter().all(|c| c < qi))
        {
            return Err(Error::Default(
                "The coefficients are not reduced modulo their moduli".to_string(),
            ));
        }
        Ok(Self {
            ctx: ctx.clone(),
            representation,
            coefficients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{traits::TryConvertFrom, Context, Poly, Representation};
    use crate::zq::Modulus;
    use ndarray::Array2;
    use rand::{thread_rng, Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::{error::Error, sync::Arc};
    use zeroize::Zeroize;

    const MODULI: &[u64; 3] = &[1153, 4611686018326724609, 4611686018309947393];

    #[test]
    fn zero() -> Result<(), Box<dyn Error>> {
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        for level in 0..3 {
            let p = Poly::zero(&ctx, level, Representation::Ntt);
            assert_eq!(p.level(), level);
            assert_eq!(p.coefficients(), Array2::<u64>::zeros((level + 1, 16)));
        }
        Ok(())
    }

    #[test]
    fn random_from_seed_is_deterministic() -> Result<(), Box<dyn Error>> {
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        thread_rng().fill(&mut seed);

        let p = Poly::random_from_seed(&ctx, 2, Representation::Ntt, seed);
        let q = Poly::random_from_seed(&ctx, 2, Representation::Ntt, seed);
        assert_eq!(p, q);

        seed[0] ^= 1;
        let r = Poly::random_from_seed(&ctx, 2, Representation::Ntt, seed);
        assert_ne!(p, r);
        Ok(())
    }

    #[test]
    fn representation_round_trip() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let p = Poly::random(&ctx, 2, Representation::PowerBasis, &mut rng);
        let mut q = p.clone();
        q.change_representation(Representation::Ntt);
        assert_ne!(p, q);
        q.change_representation(Representation::PowerBasis);
        assert_eq!(p, q);
        Ok(())
    }

    #[test]
    fn small_is_small() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let p = Poly::small(&ctx, 2, Representation::PowerBasis, 0.5, &mut rng)?;
        for row in 0..3 {
            assert!(p.center_row(row)?.iter().all(|c| c.abs() <= 1));
        }
        assert_eq!(p.center_row(0)?, p.center_row(2)?);
        assert!(p.center_row(3).is_err());

        let e = Poly::gaussian(&ctx, 1, Representation::Ntt, 3.2, 19.2, &mut rng)?;
        assert!(e.center_row(0).is_err());
        Ok(())
    }

    #[test]
    fn montgomery() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let a = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);
        let b = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);

        let mut b_mont = b.clone();
        b_mont.to_montgomery();
        assert_ne!(b, b_mont);

        let mut c = a.clone();
        c.mul_montgomery_assign(&b_mont);
        assert_eq!(c, &a * &b);

        let mut acc = Poly::zero(&ctx, 1, Representation::Ntt);
        acc.fma_montgomery(&a, &b_mont);
        acc.fma_montgomery(&a, &b_mont);
        let expected = (&(&a * &b) + &(&a * &b)).at_level(1)?;
        assert_eq!(acc, expected);

        b_mont.from_montgomery();
        assert_eq!(b, b_mont);
        Ok(())
    }

    #[test]
    fn scalars() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let a = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);

        let mut b = a.clone();
        b.mul_scalar(3);
        assert_eq!(b, &(&a + &a) + &a);

        let mut c = a.clone();
        c.mul_scalar_rns(&[3, 3, 3]);
        assert_eq!(b, c);

        let mont = ctx
            .moduli_operators()
            .iter()
            .map(|qi| qi.to_montgomery(3))
            .collect::<Vec<_>>();
        let mut d = a.clone();
        d.mul_scalar_rns_montgomery(&mont);
        assert_eq!(b, d);

        let mut e = Poly::zero(&ctx, 2, Representation::Ntt);
        e.fma_scalar_rns(&a, &[3, 0, 3]);
        let mut f = b.coefficients().to_owned();
        f.row_mut(1).fill(0);
        assert_eq!(e.coefficients(), f);
        Ok(())
    }

    #[test]
    fn automorphism() -> Result<(), Box<dyn Error>> {
        let ctx = Arc::new(Context::new(MODULI, 8)?);
        let q = Modulus::new(MODULI[0])?;

        // x -> x^3 maps x^3 to x^9 = -x.
        let mut coeffs = [0i64; 8];
        coeffs[3] = 1;
        let p = Poly::try_convert_from(&coeffs as &[i64], &ctx, 2, Representation::Ntt)?;
        let mut r = p.automorphism(3)?;
        r.change_representation(Representation::PowerBasis);
        let mut expected = [0i64; 8];
        expected[1] = -1;
        assert_eq!(r.center_row(0)?, expected.to_vec());
        assert_eq!(q.reduce_i64(-1), r.coefficients()[(0, 1)]);

        assert!(p.automorphism(2).is_err());
        assert!(p.automorphism(16).is_err());

        // The automorphism composes with its inverse to the identity.
        let mut rng = thread_rng();
        let a = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);
        let inv = (1..16).step_by(2).find(|g| (g * 5) % 16 == 1).unwrap_or(1);
        assert_eq!(a.automorphism(5)?.automorphism(inv)?, a);
        Ok(())
    }

    #[test]
    fn levels() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let a = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);
        let b = a.at_level(1)?;
        assert_eq!(b.level(), 1);
        assert_eq!(b.coefficients(), a.coefficients().slice(ndarray::s![..2, ..]));
        assert!(b.at_level(2).is_err());

        let mut c = a.clone();
        c.drop_to_level(0)?;
        assert_eq!(c, a.at_level(0)?);
        Ok(())
    }

    #[test]
    fn convert_from_array() -> Result<(), Box<dyn Error>> {
        let ctx = Arc::new(Context::new(MODULI, 8)?);
        let a = Array2::<u64>::zeros((2, 8));
        assert!(Poly::try_convert_from(a.clone(), &ctx, 1, Representation::Ntt).is_ok());
        assert!(Poly::try_convert_from(a.clone(), &ctx, 2, Representation::Ntt).is_err());
        let mut b = a;
        b[(0, 0)] = MODULI[0];
        assert!(Poly::try_convert_from(b, &ctx, 1, Representation::Ntt).is_err());
        Ok(())
    }

    #[test]
    fn zeroize() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let mut a = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);
        a.zeroize();
        assert_eq!(a, Poly::zero(&ctx, 2, Representation::Ntt));
        Ok(())
    }
}
