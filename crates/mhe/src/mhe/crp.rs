use crate::rlwe::{GadgetShape, Parameters, Seed};
use crate::Result;
use mhe_math::rq::{Context, Poly, PolyQP, Representation, RingQP};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// Generator of the _common random polynomials_ shared by the parties of a
/// protocol, deterministically expanded from a public seed.
///
/// All the polynomials are in NTT representation. Polynomials over QP are
/// sampled on Q first, then on P; the rows of a gadget matrix are sampled
/// row by row.
#[derive(Debug, Clone)]
pub struct CrpGenerator {
    rng: ChaCha8Rng,
}

impl CrpGenerator {
    /// A generator for the given seed.
    pub fn new(seed: Seed) -> Self {
        Self {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }

    /// The next uniform polynomial modulo Q at `level`.
    pub fn sample_q(&mut self, ctx: &Arc<Context>, level: usize) -> Poly {
        Poly::random(ctx, level, Representation::Ntt, &mut self.rng)
    }

    /// The next uniform polynomial over QP at the given levels.
    pub fn sample_qp(
        &mut self,
        ring: &RingQP,
        level_q: usize,
        level_p: Option<usize>,
    ) -> Result<PolyQP> {
        Ok(ring.random(level_q, level_p, Representation::Ntt, &mut self.rng)?)
    }

    /// The next uniform gadget matrix of the given shape.
    pub fn sample_gadget(
        &mut self,
        par: &Parameters,
        shape: &GadgetShape,
    ) -> Result<Vec<Vec<PolyQP>>> {
        let decomposer = shape.decomposer(par)?;
        (0..decomposer.rns_count())
            .map(|_| {
                (0..decomposer.digit_count())
                    .map(|_| self.sample_qp(par.ring(), shape.level_q, shape.level_p))
                    .collect()
            })
            .collect()
    }

    /// The next uniform gadget matrix of the given shape, converted into the
    /// Montgomery domain.
    pub(crate) fn sample_gadget_montgomery(
        &mut self,
        par: &Parameters,
        shape: &GadgetShape,
    ) -> Result<Vec<Vec<PolyQP>>> {
        let mut rows = self.sample_gadget(par, shape)?;
        rows.iter_mut().flatten().for_each(|p| p.to_montgomery());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::CrpGenerator;
    use crate::rlwe::{GadgetShape, Parameters, Seed};
    use rand::{thread_rng, Rng};
    use std::error::Error;

    #[test]
    fn deterministic() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let mut seed = Seed::default();
        thread_rng().fill(&mut seed);

        let shape = GadgetShape::new(2, Some(1), 0);
        let a = CrpGenerator::new(seed).sample_gadget(&par, &shape)?;
        let b = CrpGenerator::new(seed).sample_gadget(&par, &shape)?;
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_ne!(a[0][0], a[1][0]);

        // Sampling over QP starts with the same polynomial over Q.
        let mut crp = CrpGenerator::new(seed);
        let qp = crp.sample_qp(par.ring(), 2, Some(1))?;
        assert_eq!(qp.q, CrpGenerator::new(seed).sample_q(par.ctx_q(), 2));
        assert_ne!(crp.sample_qp(par.ring(), 2, Some(1))?, qp);

        let mut other = Seed::default();
        thread_rng().fill(&mut other);
        assert_ne!(CrpGenerator::new(other).sample_gadget(&par, &shape)?, a);
        Ok(())
    }
}
