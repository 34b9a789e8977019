//! Create parameters for the RLWE objects and the multiparty protocols.

use crate::proto::rlwe::Parameters as ParametersProto;
use crate::{Error, ParametersError, Result};
use itertools::Itertools;
use mhe_math::{
    rns::{BasisExtender, Decomposer},
    rq::{Context, RingQP},
    zq::primes::generate_prime,
};
use mhe_traits::{Deserialize, FheParameters, Serialize};
use prost::Message;
use std::fmt::Debug;
use std::sync::Arc;

/// Parameters shared by all the parties: the polynomial degree, the moduli
/// chains Q and P, and the error and secret distributions.
#[derive(PartialEq)]
pub struct Parameters {
    /// Number of coefficients in a polynomial.
    polynomial_degree: usize,

    /// Vector of coprime moduli q_i for the ciphertexts.
    moduli: Box<[u64]>,

    /// Vector of auxiliary moduli p_j for the key switching; may be empty.
    p_moduli: Box<[u64]>,

    /// Standard deviation of the error distribution.
    error_std: f64,

    /// Variance of the secret distribution.
    secret_variance: f32,

    /// Ring over QP
    pub(crate) ring: Arc<RingQP>,

    /// Division by P
    pub(crate) extender: BasisExtender,
}

impl Debug for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameters")
            .field("polynomial_degree", &self.polynomial_degree)
            .field("moduli", &self.moduli)
            .field("p_moduli", &self.p_moduli)
            .field("error_std", &self.error_std())
            .field("secret_variance", &self.secret_variance())
            .finish()
    }
}

// The distribution parameters are validated to be finite at build time.
impl Eq for Parameters {}

impl FheParameters for Parameters {}

impl Parameters {
    /// Default standard deviation of the error distribution.
    pub const DEFAULT_ERROR_STD: f64 = 3.2;

    /// Default variance of the secret distribution (ternary secrets).
    pub const DEFAULT_SECRET_VARIANCE: f32 = 0.5;

    /// The error distribution is truncated at this many standard deviations.
    pub const ERROR_BOUND_FACTOR: f64 = 6.0;

    /// Returns the underlying polynomial degree
    pub const fn degree(&self) -> usize {
        self.polynomial_degree
    }

    /// Returns a reference to the moduli of Q
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// Returns a reference to the moduli of P
    pub fn p_moduli(&self) -> &[u64] {
        &self.p_moduli
    }

    /// Returns the standard deviation of the error distribution.
    pub fn error_std(&self) -> f64 {
        self.error_std
    }

    /// Returns the bound at which the error distribution is truncated.
    pub fn error_bound(&self) -> f64 {
        Self::ERROR_BOUND_FACTOR * self.error_std()
    }

    /// Returns the variance of the secret distribution.
    pub fn secret_variance(&self) -> f32 {
        self.secret_variance
    }

    /// Returns the ring over QP.
    pub fn ring(&self) -> &Arc<RingQP> {
        &self.ring
    }

    /// Returns the context of Q.
    pub fn ctx_q(&self) -> &Arc<Context> {
        self.ring.q()
    }

    /// Returns the highest level of Q.
    pub fn max_level_q(&self) -> usize {
        self.moduli.len() - 1
    }

    /// Returns the highest level of P, or `None` when there is no P.
    pub fn max_level_p(&self) -> Option<usize> {
        self.p_moduli.len().checked_sub(1)
    }

    /// Returns an error if the levels are not supported by the parameters.
    pub fn check_levels(&self, level_q: usize, level_p: Option<usize>) -> Result<()> {
        self.ring.check_levels(level_q, level_p).map_err(|_| {
            Error::InvalidParameter(format!(
                "Levels ({level_q}, {level_p:?}) exceed the maximum levels ({}, {:?})",
                self.max_level_q(),
                self.max_level_p()
            ))
        })
    }

    /// Returns the division by P.
    pub fn extender(&self) -> &BasisExtender {
        &self.extender
    }

    /// Returns the gadget decomposition for the given levels and digit size.
    pub fn decomposer(
        &self,
        level_q: usize,
        level_p: Option<usize>,
        base_two: usize,
    ) -> Result<Decomposer> {
        self.check_levels(level_q, level_p)?;
        Decomposer::new(&self.ring, level_q, level_p, base_two)
            .map_err(|e| Error::InvalidParameter(e.to_string()))
    }

    /// Parameters with `num_q` moduli of 50 bits for Q and `num_p` moduli of
    /// 55 bits for P, for tests and benchmarks.
    pub fn default_arc(num_q: usize, num_p: usize, degree: usize) -> Arc<Self> {
        ParametersBuilder::new()
            .set_degree(degree)
            .set_moduli_sizes(&vec![50; num_q])
            .set_p_moduli_sizes(&vec![55; num_p])
            .build_arc()
            .unwrap()
    }
}

/// Builder for parameters.
#[derive(Debug)]
pub struct ParametersBuilder {
    degree: usize,
    moduli: Vec<u64>,
    moduli_sizes: Vec<usize>,
    p_moduli: Vec<u64>,
    p_moduli_sizes: Vec<usize>,
    error_std: f64,
    secret_variance: f32,
}

impl ParametersBuilder {
    /// Creates a new instance of the builder
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            degree: Default::default(),
            moduli: Default::default(),
            moduli_sizes: Default::default(),
            p_moduli: Default::default(),
            p_moduli_sizes: Default::default(),
            error_std: Parameters::DEFAULT_ERROR_STD,
            secret_variance: Parameters::DEFAULT_SECRET_VARIANCE,
        }
    }

    /// Sets the polynomial degree. The build fails if the degree is not a
    /// power of two larger or equal to 8.
    pub fn set_degree(&mut self, degree: usize) -> &mut Self {
        self.degree = degree;
        self
    }

    /// Sets the sizes of the moduli of Q.
    /// Only one of `set_moduli_sizes` and `set_moduli` can be specified.
    pub fn set_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        self.moduli_sizes = sizes.to_owned();
        self
    }

    /// Sets the moduli of Q.
    /// Only one of `set_moduli_sizes` and `set_moduli` can be specified.
    pub fn set_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        self.moduli = moduli.to_owned();
        self
    }

    /// Sets the sizes of the moduli of P.
    /// Only one of `set_p_moduli_sizes` and `set_p_moduli` can be specified;
    /// leaving both empty disables P.
    pub fn set_p_moduli_sizes(&mut self, sizes: &[usize]) -> &mut Self {
        self.p_moduli_sizes = sizes.to_owned();
        self
    }

    /// Sets the moduli of P.
    pub fn set_p_moduli(&mut self, moduli: &[u64]) -> &mut Self {
        self.p_moduli = moduli.to_owned();
        self
    }

    /// Sets the standard deviation of the error distribution.
    pub fn set_error_std(&mut self, error_std: f64) -> &mut Self {
        self.error_std = error_std;
        self
    }

    /// Sets the variance of the secret distribution, a multiple of 1/2 between
    /// 1/2 and 16.
    pub fn set_secret_variance(&mut self, variance: f32) -> &mut Self {
        self.secret_variance = variance;
        self
    }

    /// Generate moduli with the specified sizes, distinct from `exclude`.
    fn generate_moduli(
        moduli_sizes: &[usize],
        degree: usize,
        exclude: &[u64],
    ) -> Result<Vec<u64>> {
        let mut moduli = vec![];
        for size in moduli_sizes {
            if *size > 62 || *size < 10 {
                return Err(Error::ParametersError(ParametersError::InvalidModulusSize(
                    *size, 10, 62,
                )));
            }

            let mut upper_bound = 1 << size;
            loop {
                if let Some(prime) = generate_prime(*size, 2 * degree as u64, upper_bound) {
                    if !moduli.contains(&prime) && !exclude.contains(&prime) {
                        moduli.push(prime);
                        break;
                    } else {
                        upper_bound = prime;
                    }
                } else {
                    return Err(Error::ParametersError(ParametersError::NotEnoughPrimes(
                        *size, degree,
                    )));
                }
            }
        }

        Ok(moduli)
    }

    /// Build a new `Parameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<Parameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `Parameters`.
    pub fn build(&self) -> Result<Parameters> {
        // Check that the degree is a power of 2 (and large enough).
        if self.degree < 8 || !self.degree.is_power_of_two() {
            return Err(Error::ParametersError(ParametersError::InvalidDegree(
                self.degree,
            )));
        }

        if !self.moduli.is_empty() && !self.moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooManySpecified(
                "Only one of `moduli` and `moduli_sizes` can be specified".to_string(),
            )));
        } else if self.moduli.is_empty() && self.moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooFewSpecified(
                "One of `moduli` and `moduli_sizes` must be specified".to_string(),
            )));
        }
        if !self.p_moduli.is_empty() && !self.p_moduli_sizes.is_empty() {
            return Err(Error::ParametersError(ParametersError::TooManySpecified(
                "Only one of `p_moduli` and `p_moduli_sizes` can be specified".to_string(),
            )));
        }

        if !self.error_std.is_finite() || self.error_std <= 0.0 || self.error_std > 1024.0 {
            return Err(Error::ParametersError(
                ParametersError::InvalidDistribution(format!(
                    "The error standard deviation {} is not in (0, 1024]",
                    self.error_std
                )),
            ));
        }
        let halves = 2.0 * self.secret_variance;
        if !(1.0..=32.0).contains(&halves) || halves.fract() != 0.0 {
            return Err(Error::ParametersError(
                ParametersError::InvalidDistribution(format!(
                    "The secret variance {} is not a multiple of 1/2 between 1/2 and 16",
                    self.secret_variance
                )),
            ));
        }

        let moduli = if self.moduli_sizes.is_empty() {
            self.moduli.clone()
        } else {
            Self::generate_moduli(&self.moduli_sizes, self.degree, &[])?
        };
        let p_moduli = if self.p_moduli_sizes.is_empty() {
            self.p_moduli.clone()
        } else {
            Self::generate_moduli(&self.p_moduli_sizes, self.degree, &moduli)?
        };
        if !moduli.iter().chain(p_moduli.iter()).all_unique() {
            return Err(Error::ParametersError(ParametersError::TooManySpecified(
                "The moduli of Q and P must be distinct".to_string(),
            )));
        }

        let ctx_q = Context::new_arc(&moduli, self.degree)?;
        let ctx_p = if p_moduli.is_empty() {
            None
        } else {
            Some(Context::new_arc(&p_moduli, self.degree)?)
        };
        let ring = Arc::new(RingQP::new(ctx_q, ctx_p)?);
        let extender = BasisExtender::new(&ring)?;

        Ok(Parameters {
            polynomial_degree: self.degree,
            moduli: moduli.into_boxed_slice(),
            p_moduli: p_moduli.into_boxed_slice(),
            error_std: self.error_std,
            secret_variance: self.secret_variance,
            ring,
            extender,
        })
    }
}

impl Serialize for Parameters {
    fn to_bytes(&self) -> Vec<u8> {
        ParametersProto {
            degree: self.polynomial_degree as u32,
            moduli: self.moduli.to_vec(),
            p_moduli: self.p_moduli.to_vec(),
            error_std: self.error_std(),
            secret_variance: self.secret_variance(),
        }
        .encode_to_vec()
    }
}

impl Deserialize for Parameters {
    type Error = Error;

    fn try_deserialize(bytes: &[u8]) -> Result<Self> {
        let params: ParametersProto =
            Message::decode(bytes).map_err(|_| Error::SerializationError)?;
        ParametersBuilder::new()
            .set_degree(params.degree as usize)
            .set_moduli(&params.moduli)
            .set_p_moduli(&params.p_moduli)
            .set_error_std(params.error_std)
            .set_secret_variance(params.secret_variance)
            .build()
    }
}
