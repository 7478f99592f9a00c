//! Presigned URL verification and re-signing for s3relay.
//!
//! Inbound requests carry a presigned URL made with the client-facing
//! credentials. This crate checks that signature (SigV4 `AWS4-HMAC-SHA256`
//! or legacy SigV2 HMAC-SHA1 query auth) and produces a fresh query string
//! signed with the origin-facing credentials.
//!
//! # Usage
//!
//! ```rust
//! use chrono::Utc;
//! use http::{HeaderMap, Method};
//! use s3relay_auth::{Resigner, SignatureContext, Verifier};
//! use s3relay_core::{CredentialPair, OriginEndpoint};
//!
//! let verifier = Verifier::new(CredentialPair::new("CLIENT", "client-secret"));
//! let resigner = Resigner::new(
//!     CredentialPair::new("ORIGIN", "origin-secret"),
//!     OriginEndpoint::parse("s3.example.com").unwrap(),
//!     "us-east-1",
//! );
//!
//! let context = SignatureContext::new(
//!     Method::GET, "relay.example.com", "/bucket/key", "", HeaderMap::new(),
//! ).unwrap();
//! let verified = verifier.verify(&context, Utc::now()).unwrap();
//! // Unsigned requests keep their original query string.
//! assert!(resigner.resign(&verified, Utc::now()).is_none());
//! ```
//!
//! # Modules
//!
//! - [`query`] - Query-string decoding and canonical encoding
//! - [`canonical`] - SigV4 canonical request construction
//! - [`signing`] - Key derivation and HMAC signatures for both versions
//! - [`scheme`] - Scheme detection and parameter parsing
//! - [`verify`] - Inbound verification
//! - [`presign`] - Presigned URL generation
//! - [`resign`] - Outbound query regeneration

pub mod canonical;
pub mod error;
mod object;
pub mod presign;
pub mod query;
pub mod resign;
pub mod scheme;
pub mod signing;
pub mod verify;

pub use error::{AuthError, ErrorKind};
pub use object::ObjectPath;
pub use presign::{PresignRequest, PresignedUrl, SignatureVersion, presign};
pub use query::QueryParams;
pub use resign::Resigner;
pub use scheme::{AccessKeyMatch, SignatureScheme};
pub use verify::{SignatureContext, Verifier, VerifiedRequest};
