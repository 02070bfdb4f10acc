//! Secret wrapper that keeps passwords and token values out of logs.

// self
use crate::_prelude::*;

/// Redacted secret string (token values, passwords).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret is empty or whitespace only.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl From<&str> for Secret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for Secret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn secret_formatters_redact() {
		let secret = Secret::new("hunter2");

		assert_eq!(format!("{secret:?}"), "Secret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(secret.expose(), "hunter2");
	}

	#[test]
	fn blank_detection_ignores_whitespace() {
		assert!(Secret::new("").is_blank());
		assert!(Secret::new(" \t").is_blank());
		assert!(!Secret::new("x").is_blank());
	}

	#[test]
	fn deserializes_from_plain_string() {
		let secret: Secret =
			serde_json::from_str("\"p@ss\"").expect("Secret should deserialize from a string.");

		assert_eq!(secret.expose(), "p@ss");
	}
}
