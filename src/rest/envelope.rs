//! Error envelope handling shared by every JSON endpoint.

// crates.io
use serde::Deserializer;
// self
use crate::{_prelude::*, error::RemoteError, http::RestResponse};

/// `error` object the server embeds in otherwise successful (HTTP 200) responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ServerError {
	/// Numeric or textual error code.
	#[serde(default, deserialize_with = "number_or_string")]
	pub code: Option<String>,
	/// Primary message.
	#[serde(default)]
	pub message: Option<String>,
	/// Extra detail lines.
	#[serde(default)]
	pub details: Vec<String>,
	/// Longer description.
	#[serde(default)]
	pub description: Option<String>,
}
impl ServerError {
	/// Message, description, and every detail joined by newlines.
	pub fn full_description(&self) -> String {
		self.message
			.iter()
			.chain(self.description.iter())
			.chain(self.details.iter())
			.map(|s| s.as_str())
			.filter(|s| !s.trim().is_empty())
			.collect::<Vec<_>>()
			.join("\n")
	}
}

#[derive(Deserialize)]
struct Envelope {
	error: Option<ServerError>,
}

/// Fails on non-2xx statuses.
pub(crate) fn ensure_success(url: &Url, response: &RestResponse) -> Result<()> {
	if response.is_success() {
		Ok(())
	} else {
		Err(RemoteError::Status { status: response.status, url: url.to_string() }.into())
	}
}

/// Checks the status and the error envelope, then decodes the body as `T`.
pub(crate) fn decode<T>(url: &Url, response: RestResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	ensure_success(url, &response)?;

	if let Ok(Envelope { error: Some(error) }) = serde_json::from_slice::<Envelope>(&response.body) {
		return Err(RemoteError::Server {
			description: error.full_description(),
			code: error.code,
			url: url.to_string(),
		}
		.into());
	}

	let mut deserializer = serde_json::Deserializer::from_slice(&response.body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| RemoteError::MalformedResponse { url: url.to_string(), source }.into())
}

/// Accepts either a JSON number or a JSON string and keeps it as text.
pub(crate) fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Integer(i64),
		Float(f64),
		Text(String),
	}

	Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
		Raw::Integer(n) => n.to_string(),
		Raw::Float(n) => n.to_string(),
		Raw::Text(s) => s,
	}))
}
