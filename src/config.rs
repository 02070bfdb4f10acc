//! Server settings loaded from a JSON file.
//!
//! Keys are PascalCase (`Scheme`, `Host`, `Port`, `Instance`, `Username`, `Password`,
//! `Domain`, `Referer`, `ProxyUrl`, `TimeoutSeconds`) and may sit at the top level or under
//! an `ArcGisServer` section.

// std
use std::path::Path;
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{Credentials, Secret},
	error::ConfigError,
	rest::number_or_string,
};

/// Section name the settings may be nested under.
pub const SETTINGS_SECTION: &str = "ArcGisServer";

/// Connection settings for one server.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
	/// URL scheme, `https` unless configured.
	#[serde(default = "default_scheme")]
	pub scheme: String,
	/// Host name.
	pub host: String,
	/// Port, as a number or a numeric string.
	#[serde(default, deserialize_with = "number_or_string")]
	pub port: Option<String>,
	/// Web adaptor or site instance, e.g. `arcgis`.
	#[serde(default)]
	pub instance: Option<String>,
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: Secret,
	/// Windows domain for integrated authentication.
	#[serde(default)]
	pub domain: Option<String>,
	/// Referer tokens are bound to.
	#[serde(default)]
	pub referer: Option<String>,
	/// Forwarding proxy.
	#[serde(default)]
	pub proxy_url: Option<String>,
	/// HTTP timeout in seconds.
	#[serde(default = "default_timeout_seconds")]
	pub timeout_seconds: u64,
}
impl ServerConfig {
	/// Parses settings from JSON text.
	pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_str(raw);
		let root: serde_json::Value = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::ParseSettings { source })?;

		Self::from_value(root)
	}

	/// Reads and parses a settings file.
	pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let raw = tokio::fs::read_to_string(path)
			.await
			.map_err(|source| ConfigError::ReadSettings { path: path.to_path_buf(), source })?;

		Self::from_json_str(&raw)
	}

	fn from_value(mut root: serde_json::Value) -> Result<Self, ConfigError> {
		let nested = root
			.as_object_mut()
			.ok_or(ConfigError::MissingSection { section: SETTINGS_SECTION })?
			.remove(SETTINGS_SECTION);
		let section = nested.unwrap_or(root);

		serde_path_to_error::deserialize(section).map_err(|source| ConfigError::ParseSettings { source })
	}

	/// `{scheme}://{host}[:{port}][/{instance}]`.
	pub fn base_url(&self) -> Result<Url, ConfigError> {
		let host = self.host.trim();

		if host.is_empty() {
			return Err(ConfigError::InvalidSetting { field: "Host", reason: "must not be blank" });
		}

		let mut raw = format!("{}://{host}", self.scheme.trim());

		if let Some(port) = self.port.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
			let port = port.parse::<u16>().map_err(|_| ConfigError::InvalidSetting {
				field: "Port",
				reason: "must be a number between 0 and 65535",
			})?;

			raw.push_str(&format!(":{port}"));
		}
		if let Some(instance) =
			self.instance.as_deref().map(|i| i.trim().trim_matches('/')).filter(|i| !i.is_empty())
		{
			raw.push('/');
			raw.push_str(instance);
		}

		Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e))
	}

	/// Credentials carrying the configured domain and referer.
	pub fn credentials(&self) -> Credentials {
		let mut credentials = Credentials::new(self.username.clone(), self.password.clone());

		credentials.domain = self.domain.clone();
		credentials.referer = self.referer.clone();

		credentials
	}

	/// Parsed forwarding proxy, ignoring blank values.
	pub fn proxy(&self) -> Result<Option<Url>, ConfigError> {
		self.proxy_url
			.as_deref()
			.map(str::trim)
			.filter(|p| !p.is_empty())
			.map(|p| Url::parse(p).map_err(|e| ConfigError::invalid_url(p, e)))
			.transpose()
	}

	/// HTTP timeout.
	pub fn timeout(&self) -> StdDuration {
		StdDuration::from_secs(self.timeout_seconds)
	}

	/// Builds a reqwest transport honoring the configured timeout.
	#[cfg(feature = "reqwest")]
	pub fn http_client(&self) -> Result<ReqwestHttpClient, ConfigError> {
		ReqwestHttpClient::with_timeout(self.timeout())
	}
}

fn default_scheme() -> String {
	"https".into()
}

fn default_timeout_seconds() -> u64 {
	3600
}
