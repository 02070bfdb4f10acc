//! Authenticated REST client built on a shared [`AuthCoordinator`].
//!
//! Every request made through [`AgsClient`] asks the coordinator for a valid token first,
//! appends it as the `token` parameter, and decodes the response through the shared error
//! envelope. Job execution lives in [`crate::jobs`] and statistics in [`stats`].

pub mod stats;

pub use stats::InstanceWait;

// std
use std::path::Path;
// self
#[cfg(feature = "reqwest")] use crate::{config::ServerConfig, http::ReqwestHttpClient};
use crate::{
	_prelude::*,
	acquire::TokenAcquirer,
	auth::{AccessToken, Credentials},
	coordinator::AuthCoordinator,
	error::TransportError,
	http::{self, Attachment, RestHttpClient, RestRequest},
	jobs::DEFAULT_JOB_POLL_INTERVAL,
	rest::{self, SearchItemResult, ServerInfo},
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAgsClient = AgsClient<ReqwestHttpClient>;

/// Entry point for authenticated calls against one server.
pub struct AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	coordinator: Arc<AuthCoordinator<C>>,
	pub(crate) job_poll_interval: StdDuration,
}
impl<C> AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	/// Creates a client (and its coordinator) over a caller-provided transport.
	pub fn with_http_client(
		base_url: Url,
		credentials: Credentials,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let acquirer = TokenAcquirer::new(base_url, http_client);

		Self::from_coordinator(Arc::new(AuthCoordinator::new(acquirer, credentials)))
	}

	/// Creates a client sharing an existing coordinator.
	pub fn from_coordinator(coordinator: Arc<AuthCoordinator<C>>) -> Self {
		Self { coordinator, job_poll_interval: DEFAULT_JOB_POLL_INTERVAL }
	}

	/// Overrides the delay between job status polls.
	pub fn with_job_poll_interval(mut self, interval: StdDuration) -> Self {
		self.job_poll_interval = interval;

		self
	}

	/// Shared coordinator.
	pub fn coordinator(&self) -> &Arc<AuthCoordinator<C>> {
		&self.coordinator
	}

	/// Server root URL.
	pub fn base_url(&self) -> &Url {
		self.coordinator.acquirer().base_url()
	}

	/// Delay between job status polls.
	pub fn job_poll_interval(&self) -> StdDuration {
		self.job_poll_interval
	}

	/// Valid token from the coordinator.
	pub async fn token(&self) -> Result<AccessToken> {
		self.coordinator.access_token().await
	}

	/// Reads `{base}/rest/info` (no token required).
	pub async fn server_info(&self) -> Result<ServerInfo> {
		self.coordinator.acquirer().server_info().await
	}

	/// Authenticated GET with `f=json`.
	pub async fn get<T, I, K, V>(&self, url: Url, params: I) -> Result<T>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let request = RestRequest::get(self.route(url)?).params(params).param("f", "json");

		self.send(request).await
	}

	/// Authenticated form POST with `f=json`.
	pub async fn post<T, I, K, V>(&self, url: Url, params: I) -> Result<T>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let request = RestRequest::post(self.route(url)?).params(params).param("f", "json");

		self.send(request).await
	}

	/// Authenticated GET returning the raw body.
	pub async fn download<I, K, V>(&self, url: Url, params: I) -> Result<Vec<u8>>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let request = self.authorize(RestRequest::get(self.route(url)?).params(params)).await?;
		let target = request.url.clone();
		let response = self.coordinator.acquirer().http_client().execute(request).await?;

		rest::ensure_success(&target, &response)?;

		Ok(response.body)
	}

	/// Authenticated GET written to `path`; returns the number of bytes written.
	pub async fn download_to<I, K, V>(&self, url: Url, params: I, path: impl AsRef<Path>) -> Result<u64>
	where
		I: IntoIterator<Item = (K, V)>,
		K: Into<String>,
		V: Into<String>,
	{
		let bytes = self.download(url, params).await?;

		tokio::fs::write(path, &bytes).await.map_err(TransportError::Io)?;

		Ok(bytes.len() as u64)
	}

	/// Authenticated multipart upload with the `attachment`, `gdbVersion`, `f`, and `token`
	/// parts.
	pub async fn upload<T>(&self, url: Url, attachment: Attachment) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = RestRequest::post(self.route(url)?)
			.with_attachment(attachment)
			.param("gdbVersion", "")
			.param("f", "json");

		self.send(request).await
	}

	/// Reads `path` and uploads it under its file name, with the MIME type guessed from the
	/// extension.
	pub async fn upload_file<T>(&self, url: Url, path: impl AsRef<Path>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let path = path.as_ref();
		let bytes = tokio::fs::read(path).await.map_err(TransportError::Io)?;
		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| "attachment".into());
		let content_type = mime_guess::from_path(path).first_or_octet_stream();
		let attachment =
			Attachment::new(file_name, bytes).with_content_type(content_type.essence_str());

		self.upload(url, attachment).await
	}

	/// Searches portal items via `GET {portal_root}/search?q={query}`.
	pub async fn search_items(&self, portal_root: &Url, query: &str) -> Result<SearchItemResult> {
		self.get(http::endpoint(portal_root, "search")?, [("q", query)]).await
	}

	/// `{base}/{path}`.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		Ok(http::endpoint(self.base_url(), path)?)
	}

	pub(crate) fn route(&self, url: Url) -> Result<Url> {
		Ok(http::route(url, self.coordinator.acquirer().proxy())?)
	}

	pub(crate) async fn send<T>(&self, request: RestRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = self.authorize(request).await?;
		let target = request.url.clone();
		let response = self.coordinator.acquirer().http_client().execute(request).await?;

		rest::decode(&target, response).inspect_err(|e| {
			if matches!(e, Error::Remote(remote) if remote.is_token_rejected()) {
				tracing::debug!(url = %target, "Server rejected the cached token.");

				self.coordinator.invalidate();
			}
		})
	}

	async fn authorize(&self, request: RestRequest) -> Result<RestRequest> {
		let token = self.token().await?;

		Ok(request.param("token", token.secret().expose()))
	}
}
#[cfg(feature = "reqwest")]
impl AgsClient<ReqwestHttpClient> {
	/// Creates a client with a default reqwest transport.
	pub fn new(base_url: Url, credentials: Credentials) -> Self {
		Self::with_http_client(base_url, credentials, ReqwestHttpClient::default())
	}

	/// Creates a client from loaded settings (base URL, credentials, proxy, timeout).
	pub fn from_config(config: &ServerConfig) -> Result<Self> {
		let mut acquirer =
			TokenAcquirer::<ReqwestHttpClient>::new(config.base_url()?, config.http_client()?);

		if let Some(proxy) = config.proxy()? {
			acquirer = acquirer.with_proxy(proxy);
		}

		Ok(Self::from_coordinator(Arc::new(AuthCoordinator::new(acquirer, config.credentials()))))
	}
}
impl<C> Clone for AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	fn clone(&self) -> Self {
		Self { coordinator: Arc::clone(&self.coordinator), job_poll_interval: self.job_poll_interval }
	}
}
impl<C> Debug for AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AgsClient")
			.field("base_url", &self.base_url().as_str())
			.field("job_poll_interval", &self.job_poll_interval)
			.finish()
	}
}
