//! synroute-common: shared error type and the capped outbound HTTP client used across SynRoute crates.

pub mod error;
pub mod sandbox;

pub use error::{Result, SynrouteError};
pub use sandbox::SandboxClient;
