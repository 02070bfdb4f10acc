//! Caller credentials used for token acquisition.

// self
use crate::{_prelude::*, auth::Secret};

/// Username/password pair plus the optional Windows domain and HTTP referer.
///
/// A non-blank domain switches acquisition to the network-credential exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: Secret,
	/// Windows domain for integrated authentication.
	pub domain: Option<String>,
	/// Referer the issued token is bound to.
	pub referer: Option<String>,
}
impl Credentials {
	/// Creates credentials without domain or referer.
	pub fn new(username: impl Into<String>, password: impl Into<Secret>) -> Self {
		Self { username: username.into(), password: password.into(), domain: None, referer: None }
	}

	/// Sets the Windows domain.
	pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
		self.domain = Some(domain.into());

		self
	}

	/// Sets the referer.
	pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
		self.referer = Some(referer.into());

		self
	}

	/// Domain, ignoring blank values.
	pub fn domain(&self) -> Option<&str> {
		non_blank(self.domain.as_deref())
	}

	/// Referer, ignoring blank values.
	pub fn referer(&self) -> Option<&str> {
		non_blank(self.referer.as_deref())
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}
