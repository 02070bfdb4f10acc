//! `rest/info` payload.

// self
use crate::{_prelude::*, rest::number_or_string};

/// Server metadata returned by `{base}/rest/info`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
	/// Major/minor version, e.g. `10.91`.
	#[serde(default, deserialize_with = "number_or_string")]
	pub current_version: Option<String>,
	/// Full version string.
	#[serde(default)]
	pub full_version: Option<String>,
	/// Portal the server is federated with.
	#[serde(default)]
	pub owning_system_url: Option<String>,
	/// Token-security settings.
	#[serde(default)]
	pub auth_info: Option<AuthInfo>,
}
impl ServerInfo {
	/// Token service endpoint, ignoring blank values.
	pub fn token_services_url(&self) -> Option<&str> {
		self.auth_info
			.as_ref()
			.and_then(|info| info.token_services_url.as_deref())
			.map(str::trim)
			.filter(|url| !url.is_empty())
	}
}

/// `authInfo` section of [`ServerInfo`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthInfo {
	/// Whether the server requires tokens.
	#[serde(default)]
	pub is_token_based_security: bool,
	/// Endpoint that issues tokens.
	#[serde(default)]
	pub token_services_url: Option<String>,
}
