//! Protobuf messages for the ring elements.
#![allow(missing_docs)]

/// A polynomial in RNS representation; the coefficients of each modulus are
/// packed on the minimal number of bytes.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Rq {
    #[prost(uint32, tag = "1")]
    pub representation: u32,
    #[prost(uint32, tag = "2")]
    pub degree: u32,
    #[prost(uint32, tag = "3")]
    pub level: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub coefficients: ::prost::alloc::vec::Vec<u8>,
}

/// A polynomial over QP; the P part is absent when the ring has no P moduli.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RqQp {
    #[prost(message, optional, tag = "1")]
    pub q: ::core::option::Option<Rq>,
    #[prost(message, optional, tag = "2")]
    pub p: ::core::option::Option<Rq>,
}
