//! Transport primitives for the server's REST endpoints.
//!
//! The module exposes [`RestHttpClient`] alongside the owned [`RestRequest`] and
//! [`RestResponse`] values so downstream crates can plug in custom HTTP stacks (for
//! example one that speaks NTLM) without touching token or job logic. Everything above
//! this module only ever sees a status code and a body.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::multipart::{Form, Part};
// self
use crate::{
	_prelude::*,
	auth::Secret,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`RestHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<RestResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports able to run a single REST request.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// acquirer, the coordinator, and every client built on top of them. Failure statuses are
/// returned as ordinary [`RestResponse`] values; only transport problems map to
/// [`TransportError`].
pub trait RestHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and buffers the full response body.
	fn execute(&self, request: RestRequest) -> HttpFuture<'_>;
}

/// HTTP verb used by a [`RestRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestMethod {
	/// Parameters travel in the query string.
	Get,
	/// Parameters travel as a form body (multipart when an attachment is present).
	Post,
}

/// Owned description of one REST call.
#[derive(Clone, Debug)]
pub struct RestRequest {
	/// HTTP verb.
	pub method: RestMethod,
	/// Target URL, already routed through the forwarding proxy when one is configured.
	pub url: Url,
	/// Query or form parameters in insertion order.
	pub params: Vec<(String, String)>,
	/// File part for multipart uploads.
	pub attachment: Option<Attachment>,
	/// Transport-level credentials for integrated authentication.
	pub credentials: Option<NetworkCredential>,
}
impl RestRequest {
	/// Creates a GET request.
	pub fn get(url: Url) -> Self {
		Self::new(RestMethod::Get, url)
	}

	/// Creates a POST request.
	pub fn post(url: Url) -> Self {
		Self::new(RestMethod::Post, url)
	}

	fn new(method: RestMethod, url: Url) -> Self {
		Self { method, url, params: Vec::new(), attachment: None, credentials: None }
	}

	/// Appends one parameter.
	pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.push((key.into(), value.into()));

		self
	}

	/// Appends every parameter yielded by `params`.
	pub fn params<I, K, V>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		self.params.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));

		self
	}

	/// Attaches a file part, turning a POST into a multipart upload.
	pub fn with_attachment(mut self, attachment: Attachment) -> Self {
		self.attachment = Some(attachment);

		self
	}

	/// Sends transport-level credentials with the request.
	pub fn with_credentials(mut self, credentials: NetworkCredential) -> Self {
		self.credentials = Some(credentials);

		self
	}

	/// Returns the first value recorded for `key`.
	pub fn param_value(&self, key: &str) -> Option<&str> {
		self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	/// URL with every parameter appended to the query string.
	pub fn query_url(&self) -> Url {
		let mut url = self.url.clone();

		if !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(self.params.iter());
		}

		url
	}
}

/// File part sent with a multipart upload.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
	/// Multipart field name.
	pub field: String,
	/// File name reported in the content disposition.
	pub file_name: String,
	/// MIME type of the payload.
	pub content_type: String,
	/// Raw file content.
	pub bytes: Vec<u8>,
}
impl Attachment {
	/// Fallback MIME type when none is known.
	pub const OCTET_STREAM: &'static str = "application/octet-stream";

	/// Creates an `attachment` field part with the generic binary MIME type.
	pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
		Self {
			field: "attachment".into(),
			file_name: file_name.into(),
			content_type: Self::OCTET_STREAM.into(),
			bytes,
		}
	}

	/// Overrides the MIME type.
	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = content_type.into();

		self
	}
}
impl Debug for Attachment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Attachment")
			.field("field", &self.field)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Windows-style credentials the transport presents on behalf of the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkCredential {
	/// Account name.
	pub username: String,
	/// Account password.
	pub password: Secret,
	/// Windows domain.
	pub domain: Option<String>,
}
impl NetworkCredential {
	/// `DOMAIN\user` when a domain is present, otherwise the bare username.
	pub fn qualified_username(&self) -> String {
		match self.domain.as_deref().filter(|d| !d.trim().is_empty()) {
			Some(domain) => format!("{domain}\\{}", self.username),
			None => self.username.clone(),
		}
	}
}

/// Buffered HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw body.
	pub body: Vec<u8>,
}
impl RestResponse {
	/// Creates a response from a status and body.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Joins `path` onto `base`, tolerating slashes on either side.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, ConfigError> {
	let raw = format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'));

	Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e))
}

/// Routes `target` through a forwarding proxy (`{proxy}?{target}`) when one is configured.
pub fn route(target: Url, proxy: Option<&Url>) -> Result<Url, ConfigError> {
	let Some(proxy) = proxy else { return Ok(target) };
	let raw = format!("{proxy}?{target}");

	Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw, e))
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Network credentials are sent as HTTP Basic with a `DOMAIN\user` name; reqwest has no
/// NTLM or Negotiate support, so servers that insist on those need a custom
/// [`RestHttpClient`].
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests time out after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		Ok(Self(ReqwestClient::builder().timeout(timeout).build()?))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl RestHttpClient for ReqwestHttpClient {
	fn execute(&self, request: RestRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let RestRequest { method, url, params, attachment, credentials } = request;
			let mut builder = match (method, attachment) {
				(RestMethod::Get, _) => self.0.get(url).query(&params),
				(RestMethod::Post, Some(attachment)) => {
					let part = Part::bytes(attachment.bytes)
						.file_name(attachment.file_name)
						.mime_str(&attachment.content_type)?;
					let form = params
						.into_iter()
						.fold(Form::new().part(attachment.field, part), |form, (k, v)| form.text(k, v));

					self.0.post(url).multipart(form)
				},
				(RestMethod::Post, None) => self.0.post(url).form(&params),
			};

			if let Some(credentials) = credentials {
				builder = builder
					.basic_auth(credentials.qualified_username(), Some(credentials.password.expose()));
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.bytes().await?.to_vec();

			Ok::<_, TransportError>(RestResponse { status, body })
		})
	}
}
