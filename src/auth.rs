//! Credential models: the access/refresh pair and its redacting secret wrapper.

pub mod credential;
pub mod secret;

pub use credential::*;
pub use secret::*;
