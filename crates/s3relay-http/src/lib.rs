//! HTTP layer of s3relay.
//!
//! [`RelayHttpService`] is a hyper service that verifies presigned requests
//! with the client credentials, re-signs them with the origin credentials and
//! streams them to the origin through an [`OriginClient`].

pub mod body;
pub mod error;
pub mod forward;
pub mod health;
pub mod response;
pub mod service;

pub use body::RelayBody;
pub use error::ForwardError;
pub use forward::{HttpOrigin, OriginClient, OutboundBody};
pub use service::RelayHttpService;
