//! Kestrel common types
//!
//! Wire types for the Concierge credential-issuer and authenticator APIs and
//! for the Supervisor upstream identity provider discovery protocol.

pub mod crd;
pub mod group_suffix;
pub mod idp_discovery;

pub use group_suffix::{GroupSuffixError, DEFAULT_API_GROUP_SUFFIX};
