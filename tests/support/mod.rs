//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

// std
use std::{collections::VecDeque, sync::Arc, time::Duration};
// crates.io
use parking_lot::Mutex;
use time::OffsetDateTime;
use url::Url;
// self
use ags_broker::{
	acquire::TokenAcquirer,
	auth::Credentials,
	client::AgsClient,
	error::TransportError,
	http::{HttpFuture, RestHttpClient, RestMethod, RestRequest, RestResponse},
};

pub const BASE_URL: &str = "https://gis.example.com/arcgis";

type Hook = Box<dyn Fn(&RestRequest) + Send + Sync>;

struct Route {
	method: RestMethod,
	path: String,
	responses: VecDeque<RestResponse>,
	stalled: bool,
}

/// Answers requests from per-path response queues; the last queued response repeats.
#[derive(Default)]
pub struct ScriptedHttpClient {
	routes: Mutex<Vec<Route>>,
	requests: Mutex<Vec<RestRequest>>,
	hook: Mutex<Option<Hook>>,
	latency: Option<Duration>,
}
impl ScriptedHttpClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delays every response by `latency` (tokio time).
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);

		self
	}

	pub fn respond(&self, method: RestMethod, path: &str, responses: Vec<RestResponse>) {
		self.routes.lock().push(Route {
			method,
			path: path.to_owned(),
			responses: responses.into(),
			stalled: false,
		});
	}

	/// Requests to this route never complete.
	pub fn stall(&self, method: RestMethod, path: &str) {
		self.routes.lock().push(Route {
			method,
			path: path.to_owned(),
			responses: VecDeque::new(),
			stalled: true,
		});
	}

	pub fn respond_json(&self, method: RestMethod, path: &str, bodies: &[&str]) {
		self.respond(method, path, bodies.iter().map(|body| RestResponse::new(200, *body)).collect());
	}

	pub fn on_request(&self, hook: impl Fn(&RestRequest) + Send + Sync + 'static) {
		*self.hook.lock() = Some(Box::new(hook));
	}

	pub fn requests(&self) -> Vec<RestRequest> {
		self.requests.lock().clone()
	}

	pub fn requests_to(&self, path_suffix: &str) -> Vec<RestRequest> {
		self.requests().into_iter().filter(|r| r.url.path().ends_with(path_suffix)).collect()
	}

	/// Next scripted response, or `None` when the route stalls.
	fn next_response(&self, request: &RestRequest) -> Option<RestResponse> {
		let mut routes = self.routes.lock();
		let Some(route) = routes
			.iter_mut()
			.find(|route| route.method == request.method && route.path == request.url.path())
		else {
			return Some(RestResponse::new(404, "Not Found"));
		};

		if route.stalled {
			None
		} else if route.responses.len() > 1 {
			route.responses.pop_front()
		} else {
			Some(route.responses.front().cloned().unwrap_or_else(|| RestResponse::new(500, "{}")))
		}
	}
}
impl RestHttpClient for ScriptedHttpClient {
	fn execute(&self, request: RestRequest) -> HttpFuture<'_> {
		if let Some(hook) = self.hook.lock().as_ref() {
			hook(&request);
		}

		let response = self.next_response(&request);
		let latency = self.latency;

		self.requests.lock().push(request);

		Box::pin(async move {
			if let Some(latency) = latency {
				tokio::time::sleep(latency).await;
			}

			let Some(response) = response else {
				return std::future::pending().await;
			};

			Ok::<_, TransportError>(response)
		})
	}
}

pub fn base_url() -> Url {
	Url::parse(BASE_URL).expect("Base URL fixture should parse.")
}

pub fn path(tail: &str) -> String {
	format!("/arcgis/{}", tail.trim_start_matches('/'))
}

/// `{token, expires}` body expiring `lifetime` from now.
pub fn token_body(token: &str, lifetime: time::Duration) -> String {
	let expires = (OffsetDateTime::now_utc() + lifetime).unix_timestamp_nanos() / 1_000_000;

	format!("{{\"token\":\"{token}\",\"expires\":{expires}}}")
}

pub fn scripted_acquirer(http: &Arc<ScriptedHttpClient>) -> TokenAcquirer<ScriptedHttpClient> {
	TokenAcquirer::new(base_url(), Arc::clone(http))
}

/// Client over `http` whose admin endpoint issues `token` for an hour.
pub fn scripted_client(http: &Arc<ScriptedHttpClient>, token: &str) -> AgsClient<ScriptedHttpClient> {
	http.respond_json(
		RestMethod::Post,
		&path("admin/generateToken"),
		&[&token_body(token, time::Duration::hours(1))],
	);

	AgsClient::with_http_client(base_url(), Credentials::new("gis", "pw"), Arc::clone(http))
}
