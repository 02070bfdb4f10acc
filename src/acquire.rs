//! Token acquisition against the server: admin endpoint, token-service discovery, and the
//! two exchange strategies.
//!
//! [`TokenAcquirer::generate_token`] tries `{base}/admin/generateToken` first and falls back
//! to discovery plus exchange when the admin endpoint fails or hands out a token that is too
//! close to expiry. [`TokenAcquirer::acquire`] runs discovery plus exchange directly. The
//! exchange is a form POST unless the credentials carry a domain, in which case the
//! transport presents network credentials on a GET instead.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credentials, DEFAULT_SAFETY_MARGIN},
	error::{AuthError, ConfigError},
	http::{self, NetworkCredential, RestHttpClient, RestRequest},
	obs::{self, OperationKind, OperationSpan, Outcome},
	rest::{self, ServerInfo},
};

/// Which acquisition sequence a coordinator runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AcquisitionStrategy {
	/// Admin `generateToken` first, discovery plus exchange as fallback.
	#[default]
	AdminFirst,
	/// Discovery plus exchange only.
	Discovery,
}

/// Issues tokens for one server.
pub struct TokenAcquirer<C>
where
	C: ?Sized + RestHttpClient,
{
	http_client: Arc<C>,
	base_url: Url,
	proxy: Option<Url>,
	safety_margin: Duration,
}
impl<C> TokenAcquirer<C>
where
	C: ?Sized + RestHttpClient,
{
	/// Creates an acquirer for the server rooted at `base_url` (e.g. `https://host/arcgis`).
	pub fn new(base_url: Url, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			base_url,
			proxy: None,
			safety_margin: DEFAULT_SAFETY_MARGIN,
		}
	}

	/// Overrides the minimum remaining lifetime a token needs to count as valid.
	pub fn with_safety_margin(mut self, margin: Duration) -> Self {
		self.safety_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Routes every request through a forwarding proxy.
	pub fn with_proxy(mut self, proxy: Url) -> Self {
		self.proxy = Some(proxy);

		self
	}

	/// Server root URL.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Forwarding proxy, when configured.
	pub fn proxy(&self) -> Option<&Url> {
		self.proxy.as_ref()
	}

	/// Safety margin applied to every validity check.
	pub fn safety_margin(&self) -> Duration {
		self.safety_margin
	}

	/// Shared transport.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Runs the sequence selected by `strategy`.
	pub async fn fetch(
		&self,
		strategy: AcquisitionStrategy,
		credentials: &Credentials,
	) -> Result<AccessToken> {
		match strategy {
			AcquisitionStrategy::AdminFirst => self.generate_token(credentials).await,
			AcquisitionStrategy::Discovery => self.acquire(credentials).await,
		}
	}

	/// Discovers the token service and exchanges `credentials` for a token.
	///
	/// Every failure surfaces as [`Error::Auth`].
	pub async fn acquire(&self, credentials: &Credentials) -> Result<AccessToken> {
		observed("acquire", self.discover_and_exchange(credentials)).await
	}

	/// Admin endpoint first, discovery plus exchange as fallback.
	///
	/// When the credentials carry no referer, the fallback binds the token to the server's
	/// base URL. Only the fallback's error is reported when both attempts fail.
	pub async fn generate_token(&self, credentials: &Credentials) -> Result<AccessToken> {
		observed("generate_token", async move {
			match self.admin_generate_token(credentials).await {
				Ok(token) if token.is_valid_at(OffsetDateTime::now_utc(), self.safety_margin) => {
					tracing::info!(expires_at = %token.expires_at(), "Admin endpoint issued a token.");

					return Ok(token);
				},
				Ok(token) => tracing::debug!(
					expires_at = %token.expires_at(),
					"Admin token is too close to expiry, falling back to discovery."
				),
				Err(e) => {
					tracing::debug!(error = %e, "Admin token request failed, falling back to discovery.")
				},
			}

			let fallback = if credentials.referer().is_some() {
				credentials.clone()
			} else {
				credentials.clone().with_referer(self.base_url.as_str().trim_end_matches('/'))
			};

			self.discover_and_exchange(&fallback).await
		})
		.await
	}

	/// `POST {base}/admin/generateToken` with `client=requestip` and `f=pjson`.
	///
	/// The token is returned as issued; validity is the caller's concern.
	pub async fn admin_generate_token(&self, credentials: &Credentials) -> Result<AccessToken> {
		let request = RestRequest::post(self.endpoint("admin/generateToken")?)
			.param("username", credentials.username.as_str())
			.param("password", credentials.password.expose())
			.param("client", "requestip")
			.param("f", "pjson");

		self.exchange(request).await
	}

	/// Reads `{base}/rest/info`.
	pub async fn server_info(&self) -> Result<ServerInfo> {
		let request = RestRequest::get(self.endpoint("rest/info")?).param("f", "json");

		self.send(request).await
	}

	/// Resolves `authInfo.tokenServicesUrl` from `{base}/rest/info`.
	pub async fn discover_token_service(&self) -> Result<Url> {
		let info = self
			.server_info()
			.await
			.map_err(|e| AuthError::discovery_caused_by("rest/info request failed", e))?;
		let raw = info
			.token_services_url()
			.ok_or_else(|| AuthError::discovery("server does not advertise a token service"))?;
		let url = Url::parse(raw).map_err(|e| {
			AuthError::discovery_caused_by(
				format!("token service URL `{raw}` is invalid"),
				ConfigError::invalid_url(raw, e).into(),
			)
		})?;

		tracing::debug!(token_service = %url, "Discovered token service.");

		Ok(url)
	}

	/// Form exchange: `POST {token_service}` with username, password, and client binding.
	pub async fn exchange_with_form(
		&self,
		token_service: &Url,
		credentials: &Credentials,
	) -> Result<AccessToken> {
		let mut request = RestRequest::post(self.route(token_service.clone())?)
			.param("username", credentials.username.as_str())
			.param("password", credentials.password.expose());

		request = match credentials.referer() {
			Some(referer) => request.param("client", "referer").param("referer", referer),
			None => request.param("client", "requestip"),
		};

		self.exchange(request.param("f", "json")).await
	}

	/// Network-credential exchange: `GET {token_service}?request=getToken` with the caller's
	/// credentials presented by the transport.
	pub async fn exchange_with_network_credentials(
		&self,
		token_service: &Url,
		credentials: &Credentials,
	) -> Result<AccessToken> {
		let server_url = http::endpoint(&self.base_url, "rest/services")?;
		let request = RestRequest::get(self.route(token_service.clone())?)
			.param("request", "getToken")
			.param("serverUrl", server_url.as_str())
			.param("referer", authority(token_service))
			.param("f", "json")
			.with_credentials(NetworkCredential {
				username: credentials.username.clone(),
				password: credentials.password.clone(),
				domain: credentials.domain().map(ToOwned::to_owned),
			});

		self.exchange(request).await
	}

	async fn discover_and_exchange(&self, credentials: &Credentials) -> Result<AccessToken> {
		let token_service = self.discover_token_service().await?;
		let result = match credentials.domain() {
			Some(_) => self.exchange_with_network_credentials(&token_service, credentials).await,
			None => self.exchange_with_form(&token_service, credentials).await,
		};
		let token = result.map_err(|e| AuthError::from_acquisition("token exchange failed", e))?;

		tracing::info!(expires_at = %token.expires_at(), "Token service issued a token.");

		Ok(token)
	}

	async fn exchange(&self, request: RestRequest) -> Result<AccessToken> {
		let response: TokenResponse = self.send(request).await?;

		Ok(response.into_token()?)
	}

	async fn send<T>(&self, request: RestRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let url = request.url.clone();
		let response = self.http_client.execute(request).await?;

		rest::decode(&url, response)
	}

	fn endpoint(&self, path: &str) -> Result<Url> {
		self.route(http::endpoint(&self.base_url, path)?)
	}

	fn route(&self, url: Url) -> Result<Url> {
		Ok(http::route(url, self.proxy.as_ref())?)
	}
}
impl<C> Clone for TokenAcquirer<C>
where
	C: ?Sized + RestHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: Arc::clone(&self.http_client),
			base_url: self.base_url.clone(),
			proxy: self.proxy.clone(),
			safety_margin: self.safety_margin,
		}
	}
}
impl<C> Debug for TokenAcquirer<C>
where
	C: ?Sized + RestHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenAcquirer")
			.field("base_url", &self.base_url.as_str())
			.field("proxy", &self.proxy.as_ref().map(Url::as_str))
			.field("safety_margin", &self.safety_margin)
			.finish()
	}
}

#[derive(Deserialize)]
struct TokenResponse {
	#[serde(default)]
	token: Option<String>,
	#[serde(default)]
	expires: Option<i64>,
}
impl TokenResponse {
	fn into_token(self) -> Result<AccessToken, AuthError> {
		let token = self
			.token
			.filter(|t| !t.trim().is_empty())
			.ok_or_else(|| AuthError::acquisition("token response carried no token"))?;
		let expires =
			self.expires.ok_or_else(|| AuthError::acquisition("token response carried no expiry"))?;

		AccessToken::from_epoch_millis(token, expires)
			.ok_or_else(|| AuthError::acquisition(format!("token expiry `{expires}` is out of range")))
	}
}

async fn observed<Fut>(stage: &'static str, fut: Fut) -> Result<AccessToken>
where
	Fut: Future<Output = Result<AccessToken>>,
{
	const KIND: OperationKind = OperationKind::TokenAcquisition;

	let span = OperationSpan::new(KIND, stage);

	obs::record_outcome(KIND, Outcome::Attempt);

	let result = span
		.instrument(fut)
		.await
		.map_err(|e| Error::from(AuthError::from_acquisition("token acquisition failed", e)));

	obs::record_outcome(KIND, Outcome::of(&result));

	result
}

/// `host[:port]` of `url`, the form the token service expects as referer.
fn authority(url: &Url) -> String {
	let host = url.host_str().unwrap_or_default();

	match url.port() {
		Some(port) => format!("{host}:{port}"),
		None => host.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_response_requires_value_and_expiry() {
		let missing_token = TokenResponse { token: Some(" ".into()), expires: Some(1) };
		let missing_expiry = TokenResponse { token: Some("abc".into()), expires: None };
		let out_of_range = TokenResponse { token: Some("abc".into()), expires: Some(i64::MAX) };

		assert!(missing_token.into_token().is_err());
		assert!(missing_expiry.into_token().is_err());
		assert!(out_of_range.into_token().unwrap_err().to_string().contains("out of range"));

		let token = TokenResponse { token: Some("abc".into()), expires: Some(0) }
			.into_token()
			.expect("Epoch expiry should convert.");

		assert_eq!(token.expires_at(), OffsetDateTime::UNIX_EPOCH);
	}

	#[test]
	fn authority_keeps_explicit_ports_only() {
		let explicit = Url::parse("https://gis.example.com:6443/arcgis/tokens/")
			.expect("Test URL should parse.");
		let default = Url::parse("https://gis.example.com/arcgis/tokens/")
			.expect("Test URL should parse.");

		assert_eq!(authority(&explicit), "gis.example.com:6443");
		assert_eq!(authority(&default), "gis.example.com");
	}
}
