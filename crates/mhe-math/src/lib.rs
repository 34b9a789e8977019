#![crate_name = "mhe_math"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Mathematical utilities for the mhe.rs library: modular arithmetic, the
//! negacyclic NTT, RNS polynomials over Q and QP, and gadget decomposition.

mod errors;
mod proto;

pub mod ntt;
pub mod rns;
pub mod rq;
pub mod zq;

pub use errors::{Error, Result};
