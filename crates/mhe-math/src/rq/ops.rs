//! Implementation of operations over polynomials.

use super::{rows, rows_mut, Poly, Representation};
use itertools::izip;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

impl Poly {
    fn check_compatible(&self, p: &Poly) {
        assert_eq!(
            self.representation, p.representation,
            "Incompatible representations"
        );
        assert_eq!(self.level(), p.level(), "Incompatible levels");
        debug_assert_eq!(self.ctx, p.ctx, "Incompatible contexts");
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, p: &Poly) {
        self.check_compatible(p);
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&p.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(a, b, qi)| qi.add_vec(a, b));
    }
}

impl Add<&Poly> for &Poly {
    type Output = Poly;
    fn add(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q += p;
        q
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, p: &Poly) {
        self.check_compatible(p);
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&p.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(a, b, qi)| qi.sub_vec(a, b));
    }
}

impl Sub<&Poly> for &Poly {
    type Output = Poly;
    fn sub(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q -= p;
        q
    }
}

impl MulAssign<&Poly> for Poly {
    fn mul_assign(&mut self, p: &Poly) {
        self.check_compatible(p);
        assert_eq!(
            self.representation,
            Representation::Ntt,
            "Multiplication requires an Ntt representation."
        );
        izip!(
            rows_mut(&mut self.coefficients),
            rows(&p.coefficients),
            self.ctx.q.iter()
        )
        .for_each(|(a, b, qi)| qi.mul_vec(a, b));
    }
}

impl Mul<&Poly> for &Poly {
    type Output = Poly;
    fn mul(self, p: &Poly) -> Poly {
        let mut q = self.clone();
        q *= p;
        q
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Poly {
        -self.clone()
    }
}

impl Neg for Poly {
    type Output = Poly;

    fn neg(mut self) -> Poly {
        izip!(rows_mut(&mut self.coefficients), self.ctx.q.iter())
            .for_each(|(a, qi)| qi.neg_vec(a));
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::rq::{Context, Poly, Representation};
    use crate::zq::Modulus;
    use rand::thread_rng;
    use std::{error::Error, sync::Arc};

    const MODULI: &[u64; 3] = &[1153, 4611686018326724609, 4611686018309947393];

    #[test]
    fn add_sub_neg() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        for _ in 0..20 {
            let p = Poly::random(&ctx, 2, Representation::PowerBasis, &mut rng);
            let q = Poly::random(&ctx, 2, Representation::PowerBasis, &mut rng);
            let r = &p + &q;
            for (i, m) in MODULI.iter().enumerate() {
                let qi = Modulus::new(*m)?;
                for j in 0..16 {
                    assert_eq!(
                        r.coefficients()[(i, j)],
                        qi.add(p.coefficients()[(i, j)], q.coefficients()[(i, j)])
                    );
                }
            }
            assert_eq!(&r - &q, p);
            assert_eq!(&(-&p) + &p, Poly::zero(&ctx, 2, Representation::PowerBasis));
        }
        Ok(())
    }

    #[test]
    fn mul() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let ctx = Arc::new(Context::new(MODULI, 16)?);
        let p = Poly::random(&ctx, 1, Representation::Ntt, &mut rng);
        let q = Poly::random(&ctx, 1, Representation::Ntt, &mut rng);
        let r = Poly::random(&ctx, 1, Representation::Ntt, &mut rng);

        // Distributivity
        assert_eq!(&p * &(&q + &r), &(&p * &q) + &(&p * &r));
        // Commutativity
        assert_eq!(&p * &q, &q * &p);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn mul_requires_ntt() {
        let mut rng = thread_rng();
        if let Ok(ctx) = Context::new_arc(MODULI, 16) {
            let p = Poly::random(&ctx, 1, Representation::PowerBasis, &mut rng);
            let _ = &p * &p;
        }
    }

    #[test]
    #[should_panic]
    fn levels_must_match() {
        let mut rng = thread_rng();
        if let Ok(ctx) = Context::new_arc(MODULI, 16) {
            let p = Poly::random(&ctx, 1, Representation::Ntt, &mut rng);
            let q = Poly::random(&ctx, 2, Representation::Ntt, &mut rng);
            let _ = &p + &q;
        }
    }
}
