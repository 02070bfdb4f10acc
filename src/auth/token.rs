//! Access tokens issued by the server and the validity rule shared by every cache check.

// self
use crate::{_prelude::*, auth::Secret};

/// Minimum remaining lifetime a token needs before it is considered usable.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::minutes(5);

/// Bearer token paired with its absolute expiry instant.
///
/// Tokens are immutable; renewal replaces the whole value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	value: Secret,
	expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token from its secret value and absolute expiry.
	pub fn new(value: impl Into<Secret>, expires_at: OffsetDateTime) -> Self {
		Self { value: value.into(), expires_at }
	}

	/// Creates a token whose expiry is expressed as Unix epoch milliseconds (UTC).
	///
	/// Returns `None` when the instant is outside the representable range.
	pub fn from_epoch_millis(value: impl Into<Secret>, expires_millis: i64) -> Option<Self> {
		expiry_from_epoch_millis(expires_millis).map(|expires_at| Self::new(value, expires_at))
	}

	/// Token secret; callers must avoid logging it.
	pub fn secret(&self) -> &Secret {
		&self.value
	}

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Lifetime left at `now` (negative once expired).
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at - now
	}

	/// Returns `true` when the secret is non-blank and more than `margin` of lifetime remains.
	pub fn is_valid_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		!self.value.is_blank() && self.remaining_at(now) > margin
	}
}

/// Validity check over an optional cached token.
pub fn is_valid(token: Option<&AccessToken>, now: OffsetDateTime, margin: Duration) -> bool {
	token.is_some_and(|token| token.is_valid_at(now, margin))
}

/// Converts Unix epoch milliseconds into an absolute UTC instant.
pub fn expiry_from_epoch_millis(millis: i64) -> Option<OffsetDateTime> {
	OffsetDateTime::UNIX_EPOCH.checked_add(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn validity_requires_strictly_more_than_the_margin() {
		let now = macros::datetime!(2025-03-01 12:00 UTC);
		let margin = Duration::minutes(5);
		let exact = AccessToken::new("abc", now + margin);
		let one_more = AccessToken::new("abc", now + margin + Duration::seconds(1));
		let expired = AccessToken::new("abc", now - Duration::seconds(1));

		assert!(!exact.is_valid_at(now, margin));
		assert!(one_more.is_valid_at(now, margin));
		assert!(!expired.is_valid_at(now, margin));
	}

	#[test]
	fn blank_or_missing_tokens_are_invalid() {
		let now = macros::datetime!(2025-03-01 12:00 UTC);
		let blank = AccessToken::new("  ", now + Duration::hours(1));

		assert!(!is_valid(Some(&blank), now, DEFAULT_SAFETY_MARGIN));
		assert!(!is_valid(None, now, DEFAULT_SAFETY_MARGIN));
		assert!(is_valid(
			Some(&AccessToken::new("abc", now + Duration::hours(1))),
			now,
			DEFAULT_SAFETY_MARGIN
		));
	}

	#[test]
	fn epoch_millis_convert_in_utc() {
		let token = AccessToken::from_epoch_millis("abc", 1_740_830_400_000)
			.expect("Epoch fixture should be in range.");

		assert_eq!(token.expires_at(), macros::datetime!(2025-03-01 12:00 UTC));
		assert!(AccessToken::from_epoch_millis("abc", i64::MAX).is_none());
	}

	#[test]
	fn debug_output_redacts_the_value() {
		let token = AccessToken::new("very-secret", macros::datetime!(2025-03-01 12:00 UTC));

		assert!(!format!("{token:?}").contains("very-secret"));
	}
}
