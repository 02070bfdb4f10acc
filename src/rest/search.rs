//! Portal item search payload.

// self
use crate::_prelude::*;

/// Page of results returned by `{portal}/search`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItemResult {
	/// Query echoed by the portal.
	#[serde(default)]
	pub query: String,
	/// Total number of matches.
	#[serde(default)]
	pub total: i64,
	/// 1-based index of the first item on this page.
	#[serde(default)]
	pub start: i64,
	/// Page size.
	#[serde(default)]
	pub num: i64,
	/// Start index of the next page, `-1` when there is none.
	#[serde(default)]
	pub next_start: i64,
	/// Item documents.
	#[serde(default)]
	pub results: Vec<serde_json::Value>,
}
impl SearchItemResult {
	/// Returns `true` when another page exists.
	pub fn has_more(&self) -> bool {
		self.next_start > 0
	}
}
