//! Configuration and shared types for s3relay.
//!
//! This crate holds the values every other s3relay crate is built from: the
//! two credential pairs (client-facing and origin-facing), the origin
//! endpoint, and the process configuration loaded from environment variables.

pub mod config;
mod error;
mod types;

pub use config::ProxyConfig;
pub use error::ConfigError;
pub use types::{CredentialPair, OriginEndpoint, OriginScheme};
