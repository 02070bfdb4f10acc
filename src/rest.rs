//! Wire types for the server's REST API and the shared error-envelope decoder.

pub mod gp;
pub mod info;
pub mod search;
pub mod stats;

mod envelope;

pub use envelope::ServerError;
pub use gp::*;
pub use info::*;
pub use search::*;
pub use stats::*;

pub(crate) use envelope::{decode, ensure_success, number_or_string};
