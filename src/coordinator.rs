//! Shared token cache with coalesced renewal.
//!
//! [`AuthCoordinator::access_token`] serves the cached token from a read lock while it is
//! valid. Once it is not, callers serialize on one async mutex and re-check under it, so
//! at most one acquisition is in flight per coordinator. Callers that queued behind an
//! acquisition take its outcome: the fresh token, or a clone of the same [`AuthError`].

mod metrics;

pub use metrics::AcquisitionMetrics;

// self
use crate::{
	_prelude::*,
	acquire::{AcquisitionStrategy, TokenAcquirer},
	auth::{AccessToken, Credentials},
	error::AuthError,
	http::RestHttpClient,
};

#[derive(Debug, Default)]
struct TokenState {
	token: Option<AccessToken>,
	/// Bumped every time an acquisition finishes.
	generation: u64,
	/// Error of the most recent acquisition, if it failed.
	failure: Option<AuthError>,
}
impl TokenState {
	fn valid_token(&self, now: OffsetDateTime, margin: Duration) -> Option<&AccessToken> {
		self.token.as_ref().filter(|token| token.is_valid_at(now, margin))
	}
}

/// Owns the cached token for one set of credentials.
///
/// Share it behind an [`Arc`]; every method takes `&self`.
pub struct AuthCoordinator<C>
where
	C: ?Sized + RestHttpClient,
{
	acquirer: TokenAcquirer<C>,
	credentials: Credentials,
	strategy: AcquisitionStrategy,
	state: RwLock<TokenState>,
	acquisition: AsyncMutex<()>,
	metrics: AcquisitionMetrics,
}
impl<C> AuthCoordinator<C>
where
	C: ?Sized + RestHttpClient,
{
	/// Creates a coordinator using [`AcquisitionStrategy::AdminFirst`].
	pub fn new(acquirer: TokenAcquirer<C>, credentials: Credentials) -> Self {
		Self {
			acquirer,
			credentials,
			strategy: AcquisitionStrategy::default(),
			state: RwLock::new(TokenState::default()),
			acquisition: AsyncMutex::new(()),
			metrics: AcquisitionMetrics::default(),
		}
	}

	/// Selects the acquisition sequence.
	pub fn with_strategy(mut self, strategy: AcquisitionStrategy) -> Self {
		self.strategy = strategy;

		self
	}

	/// Acquirer used for renewals.
	pub fn acquirer(&self) -> &TokenAcquirer<C> {
		&self.acquirer
	}

	/// Acquisition counters.
	pub fn metrics(&self) -> &AcquisitionMetrics {
		&self.metrics
	}

	/// Cached token, valid or not.
	pub fn cached_token(&self) -> Option<AccessToken> {
		self.state.read().token.clone()
	}

	/// Drops the cached token so the next call acquires a new one.
	pub fn invalidate(&self) {
		self.state.write().token = None;
	}

	/// Returns a token that is valid under the acquirer's safety margin, acquiring one when
	/// needed.
	///
	/// Callers queued behind an acquisition take its outcome, token or error. A failed
	/// acquisition leaves the cache empty. A freshly issued token that is already inside the
	/// safety margin counts as a failure, so an expired token is never returned.
	pub async fn access_token(&self) -> Result<AccessToken> {
		let margin = self.acquirer.safety_margin();
		let observed = {
			let state = self.state.read();

			if let Some(token) = state.valid_token(OffsetDateTime::now_utc(), margin) {
				return Ok(token.clone());
			}

			state.generation
		};
		let _acquisition = self.acquisition.lock().await;

		{
			let state = self.state.read();
			let now = OffsetDateTime::now_utc();

			if let Some(token) = state.valid_token(now, margin) {
				self.metrics.record_coalesced();

				return Ok(token.clone());
			}
			if state.generation != observed {
				// Fresh from the acquisition this caller queued behind; it only has to be unexpired.
				if let Some(token) = state.valid_token(now, Duration::ZERO) {
					self.metrics.record_coalesced();

					return Ok(token.clone());
				}
				if let Some(failure) = state.failure.as_ref() {
					self.metrics.record_coalesced();

					return Err(failure.clone().into());
				}
			}
		}

		self.state.write().token = None;
		self.metrics.record_attempt();

		let result = self.acquirer.fetch(self.strategy, &self.credentials).await.and_then(|token| {
			if token.is_valid_at(OffsetDateTime::now_utc(), margin) {
				Ok(token)
			} else {
				tracing::warn!(
					expires_at = %token.expires_at(),
					"Server issued a token inside the safety margin."
				);

				Err(AuthError::acquisition("server issued a token inside the safety margin").into())
			}
		});
		let mut state = self.state.write();

		state.generation = state.generation.wrapping_add(1);

		match result {
			Ok(token) => {
				self.metrics.record_success();

				state.token = Some(token.clone());
				state.failure = None;

				Ok(token)
			},
			Err(e) => {
				self.metrics.record_failure();

				let failure = AuthError::from_acquisition("token acquisition failed", e);

				state.failure = Some(failure.clone());

				Err(failure.into())
			},
		}
	}
}
impl<C> Debug for AuthCoordinator<C>
where
	C: ?Sized + RestHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.state.read();

		f.debug_struct("AuthCoordinator")
			.field("acquirer", &self.acquirer)
			.field("username", &self.credentials.username)
			.field("strategy", &self.strategy)
			.field("token", &state.token)
			.field("generation", &state.generation)
			.finish()
	}
}
