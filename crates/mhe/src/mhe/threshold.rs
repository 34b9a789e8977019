//! Threshold access structure over additive shares of the secret.
//!
//! Each party turns its additive share `s_i` into a Shamir polynomial of
//! degree `threshold - 1` with the [`Thresholdizer`], and sends to every
//! other party the evaluation of this polynomial at the party's public
//! point. The sum of the evaluations received by a party is its Shamir share
//! of `s = sum(s_i)`. Any `threshold` parties can then turn their Shamir
//! shares into additive shares of `s` with the [`Combiner`], and run the
//! other protocols as if they were the only parties.

use crate::mhe::{shares::Share, ShamirPolynomial, ShamirSecretShare};
use crate::rlwe::{Parameters, SecretKey};
use crate::{Error, Result};
use itertools::Itertools;
use mhe_math::{rq::Representation, zq::Modulus};
use rand::{CryptoRng, RngCore};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, trace};

/// The public evaluation point of a party in the Shamir sharing.
///
/// The points of the parties are distinct, nonzero, and their differences
/// are invertible modulo every modulus of Q and P.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShamirPublicPoint(pub u64);

impl From<u64> for ShamirPublicPoint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Returns an error unless `threshold` parties among `n` is a valid access
/// structure: `n >= 1` and `1 <= threshold <= n`.
pub fn validate_threshold_config(n: usize, threshold: usize) -> Result<()> {
    if n == 0 {
        return Err(Error::InsufficientParties(0, 1));
    }
    if threshold == 0 {
        return Err(Error::InvalidParameter(
            "The threshold must be at least 1".to_string(),
        ));
    }
    if threshold > n {
        return Err(Error::InvalidParameter(format!(
            "The threshold {threshold} exceeds the number of parties {n}"
        )));
    }
    Ok(())
}

fn moduli(par: &Parameters) -> impl Iterator<Item = &Modulus> + Clone {
    par.ctx_q().moduli_operators().iter().chain(
        par.ring()
            .p()
            .map(|ctx| ctx.moduli_operators())
            .unwrap_or_default()
            .iter(),
    )
}

/// Generation of Shamir polynomials and of the shares of the other parties.
#[derive(Debug, Clone)]
pub struct Thresholdizer {
    par: Arc<Parameters>,
}

impl Thresholdizer {
    /// Creates a thresholdizer for the given parameters.
    pub fn new(par: &Arc<Parameters>) -> Self {
        Self { par: par.clone() }
    }

    /// Returns a Shamir polynomial of degree `threshold - 1` whose constant
    /// coefficient is `secret`.
    ///
    /// Returns an `InvalidParameter` error if `threshold` is 0.
    pub fn gen_shamir_polynomial<R: RngCore + CryptoRng>(
        &self,
        threshold: usize,
        secret: &SecretKey,
        rng: &mut R,
    ) -> Result<ShamirPolynomial> {
        if threshold < 1 {
            return Err(Error::InvalidParameter(
                "The threshold must be at least 1".to_string(),
            ));
        }
        trace!(threshold, "generating a Shamir polynomial");
        let par = &self.par;
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret.poly().clone());
        for _ in 1..threshold {
            coefficients.push(par.ring().random(
                par.max_level_q(),
                par.max_level_p(),
                Representation::Ntt,
                rng,
            )?);
        }
        Ok(ShamirPolynomial {
            par: par.clone(),
            coefficients,
        })
    }

    /// Returns the evaluation of `polynomial` at the point of `recipient`.
    ///
    /// Returns an `InvalidParameter` error if the point is zero modulo one of
    /// the moduli.
    pub fn gen_shamir_secret_share(
        &self,
        recipient: ShamirPublicPoint,
        polynomial: &ShamirPolynomial,
    ) -> Result<ShamirSecretShare> {
        let points = moduli(&self.par)
            .map(|qi| {
                let x = qi.reduce(recipient.0);
                if x == 0 {
                    Err(Error::InvalidParameter(format!(
                        "The point {} is zero modulo {}",
                        recipient.0,
                        qi.modulus()
                    )))
                } else {
                    Ok(x)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let (q_points, p_points) = points.split_at(self.par.moduli().len());

        // Horner evaluation, modulus by modulus.
        let mut coefficients = polynomial.coefficients.iter().rev();
        let mut value = coefficients
            .next()
            .ok_or_else(|| Error::InvalidParameter("The polynomial is empty".to_string()))?
            .clone();
        for c in coefficients {
            value.mul_scalar_rns(q_points, p_points);
            value += c;
        }
        Ok(ShamirSecretShare {
            par: self.par.clone(),
            value,
        })
    }

    /// Sets `out = a + b`, the sum of shares received from different
    /// dealers.
    pub fn aggregate_shares(
        &self,
        a: &ShamirSecretShare,
        b: &ShamirSecretShare,
        out: &mut ShamirSecretShare,
    ) -> Result<()> {
        ShamirSecretShare::aggregate(a, b, out)
    }
}

/// The Lagrange factors of a party, one per modulus of Q and of P, in the
/// Montgomery domain.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LagrangeFactor {
    q: Vec<u64>,
    p: Vec<u64>,
}

/// Conversion of a Shamir share into an additive share of the secret, among
/// a set of active parties.
#[derive(Debug, Clone)]
pub struct Combiner {
    par: Arc<Parameters>,
    own_point: ShamirPublicPoint,
    threshold: usize,
    factors: HashMap<ShamirPublicPoint, LagrangeFactor>,
}

impl Combiner {
    /// Creates the combiner of the party at `own_point`, precomputing the
    /// factors `x_j / (x_j - x_own)` for every other point of `all_points`.
    ///
    /// Returns an `InvalidParameter` error if the threshold is 0 or exceeds
    /// the number of points, if a point is zero or repeated, or if the
    /// difference of two points is not invertible modulo one of the moduli.
    pub fn new(
        par: &Arc<Parameters>,
        own_point: ShamirPublicPoint,
        all_points: &[ShamirPublicPoint],
        threshold: usize,
    ) -> Result<Self> {
        validate_threshold_config(all_points.len(), threshold)?;
        if !all_points.iter().all_unique() {
            return Err(Error::InvalidParameter(
                "The points are not distinct".to_string(),
            ));
        }
        if let Some((point, qi)) = all_points
            .iter()
            .cartesian_product(moduli(par))
            .find(|(point, qi)| qi.reduce(point.0) == 0)
        {
            return Err(Error::InvalidParameter(format!(
                "The point {} is zero modulo {}",
                point.0,
                qi.modulus()
            )));
        }
        if !all_points.contains(&own_point) {
            return Err(Error::InvalidParameter(format!(
                "The own point {} is not among the points",
                own_point.0
            )));
        }

        let num_q = par.moduli().len();
        let mut factors = HashMap::with_capacity(all_points.len() - 1);
        for point in all_points.iter().filter(|p| **p != own_point) {
            let values = moduli(par)
                .map(|qi| {
                    let x = qi.reduce(point.0);
                    let inverse = qi.inv(qi.sub(x, qi.reduce(own_point.0)));
                    match inverse {
                        Some(inverse) if x != 0 => Ok(qi.to_montgomery(qi.mul(x, inverse))),
                        _ => Err(Error::InvalidParameter(format!(
                            "The points {} and {} are not compatible with the modulus {}",
                            point.0,
                            own_point.0,
                            qi.modulus()
                        ))),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            let (q, p) = values.split_at(num_q);
            factors.insert(
                *point,
                LagrangeFactor {
                    q: q.to_vec(),
                    p: p.to_vec(),
                },
            );
        }

        Ok(Self {
            par: par.clone(),
            own_point,
            threshold,
            factors,
        })
    }

    /// The threshold of the access structure.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the additive share of the secret of the party at `own_point`
    /// among the first `threshold` points of `active_points`, which must
    /// include `own_point`.
    ///
    /// Returns an `InsufficientParties` error if there are fewer than
    /// `threshold` active points, and an `InvalidParameter` error if
    /// `own_point` differs from the point of the combiner or is not among
    /// the first `threshold` active points, or if an active point is
    /// unknown or repeated.
    pub fn finalize(
        &self,
        active_points: &[ShamirPublicPoint],
        own_point: ShamirPublicPoint,
        own_share: &ShamirSecretShare,
    ) -> Result<SecretKey> {
        if active_points.len() < self.threshold {
            return Err(Error::InsufficientParties(
                active_points.len(),
                self.threshold,
            ));
        }
        if own_point != self.own_point {
            return Err(Error::InvalidParameter(format!(
                "The combiner is for the point {}, not {}",
                self.own_point.0, own_point.0
            )));
        }
        let active = &active_points[..self.threshold];
        if !active.iter().all_unique() {
            return Err(Error::InvalidParameter(
                "The active points are not distinct".to_string(),
            ));
        }
        if !active.contains(&own_point) {
            return Err(Error::InvalidParameter(format!(
                "The point {} is not among the active points",
                own_point.0
            )));
        }

        let mut value = own_share.value.clone();
        for point in active.iter().filter(|p| **p != own_point) {
            let factor = self.factors.get(point).ok_or_else(|| {
                Error::InvalidParameter(format!("Unknown point {}", point.0))
            })?;
            value.mul_scalar_rns_montgomery(&factor.q, &factor.p);
        }
        debug!(
            parties = self.threshold,
            "combined a threshold share into an additive share"
        );
        SecretKey::from_poly(value, &self.par)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_threshold_config, Combiner, ShamirPublicPoint, Thresholdizer};
    use crate::mhe::{test_utils::secret_keys, AggregateIter, ShamirSecretShare};
    use crate::rlwe::{Parameters, SecretKey};
    use crate::Error as MheError;
    use rand::{seq::SliceRandom, thread_rng};
    use std::error::Error;

    const NUM_PARTIES: usize = 5;

    fn points() -> Vec<ShamirPublicPoint> {
        (1..=NUM_PARTIES as u64).map(ShamirPublicPoint).collect()
    }

    /// The Shamir shares of the sum of the secrets of the parties.
    fn threshold_shares(
        par: &std::sync::Arc<Parameters>,
        keys: &[SecretKey],
        threshold: usize,
    ) -> Result<Vec<ShamirSecretShare>, Box<dyn Error>> {
        let mut rng = thread_rng();
        let thresholdizer = Thresholdizer::new(par);
        let polynomials = keys
            .iter()
            .map(|k| thresholdizer.gen_shamir_polynomial(threshold, k, &mut rng))
            .collect::<crate::Result<Vec<_>>>()?;
        let shares = points()
            .iter()
            .map(|point| {
                polynomials
                    .iter()
                    .map(|poly| thresholdizer.gen_shamir_secret_share(*point, poly))
                    .collect::<crate::Result<Vec<_>>>()?
                    .into_iter()
                    .aggregate()
            })
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(shares)
    }

    #[test]
    fn reconstruction() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, sk) = secret_keys(&par, NUM_PARTIES);
        let points = points();

        for threshold in [1, 2, 4] {
            let shares = threshold_shares(&par, &keys, threshold)?;
            let mut order = (0..NUM_PARTIES).collect::<Vec<_>>();
            order.shuffle(&mut rng);
            let active = order[..threshold]
                .iter()
                .map(|i| points[*i])
                .collect::<Vec<_>>();

            let mut sum = SecretKey::zero(&par)?;
            for i in &order[..threshold] {
                let combiner = Combiner::new(&par, points[*i], &points, threshold)?;
                sum += &combiner.finalize(&active, points[*i], &shares[*i])?;
            }
            assert_eq!(sum.poly(), sk.poly());
        }
        Ok(())
    }

    #[test]
    fn insufficient_parties() -> Result<(), Box<dyn Error>> {
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, _) = secret_keys(&par, NUM_PARTIES);
        let points = points();
        for threshold in 2..=NUM_PARTIES {
            let shares = threshold_shares(&par, &keys, threshold)?;
            let combiner = Combiner::new(&par, points[0], &points, threshold)?;
            assert_eq!(
                combiner
                    .finalize(&points[..threshold - 1], points[0], &shares[0])
                    .err(),
                Some(MheError::InsufficientParties(threshold - 1, threshold))
            );
        }
        Ok(())
    }

    #[test]
    fn invalid_parameters() -> Result<(), Box<dyn Error>> {
        let mut rng = thread_rng();
        let par = Parameters::default_arc(3, 2, 16);
        let (keys, _) = secret_keys(&par, 1);
        let points = points();
        let thresholdizer = Thresholdizer::new(&par);

        assert!(matches!(
            thresholdizer.gen_shamir_polynomial(0, &keys[0], &mut rng),
            Err(MheError::InvalidParameter(_))
        ));
        let polynomial = thresholdizer.gen_shamir_polynomial(3, &keys[0], &mut rng)?;
        assert_eq!(polynomial.threshold(), 3);
        let modulus = ShamirPublicPoint(par.moduli()[1]);
        assert!(matches!(
            thresholdizer.gen_shamir_secret_share(modulus, &polynomial),
            Err(MheError::InvalidParameter(_))
        ));

        let repeated = [points[0], points[1], points[1]];
        assert!(Combiner::new(&par, points[0], &repeated, 2).is_err());
        assert!(Combiner::new(&par, points[0], &points, 0).is_err());
        assert!(Combiner::new(&par, points[0], &points, NUM_PARTIES + 1).is_err());
        assert!(Combiner::new(&par, ShamirPublicPoint(0), &[ShamirPublicPoint(0), points[1]], 2).is_err());
        let shifted = ShamirPublicPoint(points[0].0 + par.moduli()[0]);
        assert!(Combiner::new(&par, points[0], &[points[0], shifted], 2).is_err());

        let combiner = Combiner::new(&par, points[0], &points, 2)?;
        let share = thresholdizer.gen_shamir_secret_share(points[0], &polynomial)?;
        assert!(matches!(
            combiner.finalize(&points[1..], points[0], &share),
            Err(MheError::InvalidParameter(_))
        ));
        assert!(matches!(
            combiner.finalize(&points, points[1], &share),
            Err(MheError::InvalidParameter(_))
        ));
        assert!(matches!(
            combiner.finalize(&[points[0], points[0], points[1]], points[0], &share),
            Err(MheError::InvalidParameter(_))
        ));

        assert!(validate_threshold_config(5, 3).is_ok());
        assert!(validate_threshold_config(5, 5).is_ok());
        assert!(validate_threshold_config(0, 1).is_err());
        assert!(validate_threshold_config(5, 6).is_err());
        assert!(validate_threshold_config(5, 0).is_err());
        Ok(())
    }
}
