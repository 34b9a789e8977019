#![allow(missing_docs)]

#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Parameters {
    #[prost(uint32, tag = "1")]
    pub degree: u32,
    #[prost(uint64, repeated, tag = "2")]
    pub moduli: ::prost::alloc::vec::Vec<u64>,
    #[prost(uint64, repeated, tag = "3")]
    pub p_moduli: ::prost::alloc::vec::Vec<u64>,
    #[prost(double, tag = "4")]
    pub error_std: f64,
    #[prost(float, tag = "5")]
    pub secret_variance: f32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Ciphertext {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub c: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub seed: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub level: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PublicKey {
    #[prost(bytes = "vec", tag = "1")]
    pub b: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub a: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub seed: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint32, tag = "4")]
    pub level_q: u32,
    #[prost(uint32, optional, tag = "5")]
    pub level_p: ::core::option::Option<u32>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GadgetShape {
    #[prost(uint32, tag = "1")]
    pub level_q: u32,
    #[prost(uint32, optional, tag = "2")]
    pub level_p: ::core::option::Option<u32>,
    #[prost(uint32, tag = "3")]
    pub base_two: u32,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GadgetCiphertext {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub b: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(bytes = "vec", repeated, tag = "2")]
    pub a: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
    #[prost(message, optional, tag = "3")]
    pub shape: ::core::option::Option<GadgetShape>,
    #[prost(bytes = "vec", tag = "4")]
    pub seed: ::prost::alloc::vec::Vec<u8>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EvaluationKey {
    #[prost(message, optional, tag = "1")]
    pub gadget: ::core::option::Option<GadgetCiphertext>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RelinearizationKey {
    #[prost(message, optional, tag = "1")]
    pub gadget: ::core::option::Option<GadgetCiphertext>,
}
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GaloisKey {
    #[prost(message, optional, tag = "1")]
    pub gadget: ::core::option::Option<GadgetCiphertext>,
    #[prost(uint32, tag = "2")]
    pub galois_element: u32,
}
