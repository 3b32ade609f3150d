//! User identifiers, redacted secrets, and the stored account credential model.

pub mod credential;
pub mod id;
pub mod secret;

pub use credential::*;
pub use id::*;
pub use secret::*;
