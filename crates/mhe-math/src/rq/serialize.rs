//! Serialization of polynomials.

use super::{rows, rows_mut, Context, Poly, Representation};
use crate::{proto::Rq, Error, Result};
use itertools::izip;
use mhe_traits::{DeserializeWithContext, Serialize};
use prost::Message;
use std::sync::Arc;

/// Number of bytes used to store a coefficient modulo a modulus of `bits` bits.
const fn bytes_per_coefficient(bits: usize) -> usize {
    (bits + 7) / 8
}

impl From<&Poly> for Rq {
    fn from(p: &Poly) -> Self {
        let mut coefficients = vec![];
        for (row, qi) in izip!(rows(&p.coefficients), p.ctx.q.iter()) {
            let nbytes = bytes_per_coefficient(qi.bits());
            for c in row {
                coefficients.extend_from_slice(&c.to_le_bytes()[..nbytes]);
            }
        }
        Rq {
            representation: match p.representation {
                Representation::PowerBasis => 0,
                Representation::Ntt => 1,
            },
            degree: p.ctx.degree as u32,
            level: p.level() as u32,
            coefficients,
        }
    }
}

impl Poly {
    pub(crate) fn try_from_proto(value: &Rq, ctx: &Arc<Context>) -> Result<Self> {
        let representation = match value.representation {
            0 => Representation::PowerBasis,
            1 => Representation::Ntt,
            _ => return Err(Error::SerializationError),
        };
        if value.degree as usize != ctx.degree {
            return Err(Error::SerializationError);
        }
        let level = value.level as usize;
        ctx.check_level(level)
            .map_err(|_| Error::SerializationError)?;

        let expected_len: usize = ctx.q[..=level]
            .iter()
            .map(|qi| bytes_per_coefficient(qi.bits()) * ctx.degree)
            .sum();
        if value.coefficients.len() != expected_len {
            return Err(Error::SerializationError);
        }

        let mut p = Poly::zero(ctx, level, representation);
        let mut offset = 0;
        for (row, qi) in izip!(rows_mut(&mut p.coefficients), ctx.q.iter()) {
            let nbytes = bytes_per_coefficient(qi.bits());
            for c in row.iter_mut() {
                let mut bytes = [0u8; 8];
                bytes[..nbytes].copy_from_slice(&value.coefficients[offset..offset + nbytes]);
                offset += nbytes;
                *c = u64::from_le_bytes(bytes);
                if *c >= qi.modulus() {
                    return Err(Error::SerializationError);
                }
            }
        }
        Ok(p)
    }
}

impl Serialize for Poly {
    fn to_bytes(&self) -> Vec<u8> {
        Rq::from(self).encode_to_vec()
    }
}

impl DeserializeWithContext for Poly {
    type Error = Error;
    type Context = Context;

    fn from_bytes(bytes: &[u8], ctx: &Arc<Context>) -> Result<Self> {
        let rq = Rq::decode(bytes).map_err(|_| Error::SerializationError)?;
        Poly::try_from_proto(&rq, ctx)
    }
}
