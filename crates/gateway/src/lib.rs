//! HTTP adapter for the carrier data service.

pub mod client;
pub mod wire;

pub use client::HttpGateway;
