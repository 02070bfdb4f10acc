//! Auth-domain models: redacted secrets, access tokens with expiry, and caller credentials.

pub mod credentials;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use secret::*;
pub use token::*;
