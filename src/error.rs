//! Crate-level error types shared by token acquisition, job execution, and REST calls.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	rest::{JobResult, JobStatus},
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, I/O).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The server answered, but with a failure status, an error envelope, or unreadable JSON.
	#[error(transparent)]
	Remote(#[from] RemoteError),
	/// No usable token could be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Geoprocessing service or job failure.
	#[error(transparent)]
	Job(#[from] JobError),
	/// The caller cancelled the operation.
	#[error("Operation was cancelled.")]
	Cancelled,
}
impl Error {
	/// Returns `true` when the error represents caller-initiated cancellation.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A configured or derived URL cannot be parsed.
	#[error("URL `{value}` is invalid.")]
	InvalidUrl {
		/// Offending input.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A settings value is present but unusable.
	#[error("Setting `{field}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting key.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
	/// Settings file could not be read.
	#[error("Settings file `{}` could not be read.", .path.display())]
	ReadSettings {
		/// Settings file path.
		path: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// Settings JSON has no usable server section.
	#[error("Settings do not contain a `{section}` section.")]
	MissingSection {
		/// Expected section name.
		section: &'static str,
	},
	/// Settings JSON could not be decoded.
	#[error("Settings JSON is malformed.")]
	ParseSettings {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	pub(crate) fn invalid_url(value: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { value: value.into(), source }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e.without_url())
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the server.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
/// Drops the request URL, which may carry a `token` query parameter.
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e.without_url())
	}
}

/// Failures reported by the remote server.
#[derive(Debug, ThisError)]
pub enum RemoteError {
	/// Non-success HTTP status.
	#[error("Server returned HTTP {status} for {url}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Requested URL (without credentials).
		url: String,
	},
	/// The response body carried an `error` envelope.
	#[error("Server reported an error for {url}: {description}")]
	Server {
		/// Server-supplied error code, when present.
		code: Option<String>,
		/// Message, description, and details joined by newlines.
		description: String,
		/// Requested URL (without credentials).
		url: String,
	},
	/// Response body could not be decoded into the expected shape.
	#[error("Server returned malformed JSON for {url}.")]
	MalformedResponse {
		/// Requested URL (without credentials).
		url: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl RemoteError {
	/// Returns `true` when the server reported the resource as missing.
	pub fn is_not_found(&self) -> bool {
		match self {
			Self::Status { status, .. } => *status == 404,
			Self::Server { code, .. } => code.as_deref() == Some("404"),
			Self::MalformedResponse { .. } => false,
		}
	}

	/// Returns `true` when the server rejected the token (codes 498 and 499).
	pub fn is_token_rejected(&self) -> bool {
		match self {
			Self::Status { status, .. } => matches!(status, 498 | 499),
			Self::Server { code, .. } => matches!(code.as_deref(), Some("498" | "499")),
			Self::MalformedResponse { .. } => false,
		}
	}
}

/// Token acquisition failures.
///
/// The type is cheap to clone so one failed acquisition can be handed to every
/// caller that was queued behind it.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// The token service endpoint could not be discovered.
	#[error("Token service discovery failed: {reason}.")]
	DiscoveryFailed {
		/// Human-readable reason.
		reason: String,
		/// Underlying failure, when one exists.
		#[source]
		source: Option<SharedError>,
	},
	/// The token exchange failed or returned an unusable token.
	#[error("Token acquisition failed: {reason}.")]
	AcquisitionFailed {
		/// Human-readable reason.
		reason: String,
		/// Underlying failure, when one exists.
		#[source]
		source: Option<SharedError>,
	},
}
impl AuthError {
	pub(crate) fn discovery(reason: impl Into<String>) -> Self {
		Self::DiscoveryFailed { reason: reason.into(), source: None }
	}

	pub(crate) fn discovery_caused_by(reason: impl Into<String>, source: Error) -> Self {
		Self::DiscoveryFailed { reason: reason.into(), source: Some(Arc::new(source)) }
	}

	pub(crate) fn acquisition(reason: impl Into<String>) -> Self {
		Self::AcquisitionFailed { reason: reason.into(), source: None }
	}

	/// Normalizes any crate error into an [`AuthError`], keeping typed auth failures as-is.
	pub(crate) fn from_acquisition(reason: impl Into<String>, err: Error) -> Self {
		match err {
			Error::Auth(auth) => auth,
			other => Self::AcquisitionFailed { reason: reason.into(), source: Some(Arc::new(other)) },
		}
	}
}

/// Geoprocessing service and job failures.
#[derive(Debug, ThisError)]
pub enum JobError {
	/// The geoprocessing service does not exist.
	#[error("Service `{service}` was not found.")]
	ServiceNotFound {
		/// Requested service name (folder-qualified).
		service: String,
	},
	/// The service exists but does not expose the task.
	#[error("Service `{service}` has no task `{task}`. Possible tasks are: [{}].", .available.join(", "))]
	TaskNotFound {
		/// Requested service name.
		service: String,
		/// Requested task name.
		task: String,
		/// Task names the service does expose.
		available: Vec<String>,
	},
	/// The server reported a status the state machine does not accept at this step.
	#[error("{}", unexpected_status_report(.expected, .job))]
	UnexpectedStatus {
		/// Status required at this step.
		expected: JobStatus,
		/// Job payload as returned by the server.
		job: JobResult,
	},
	/// The server accepted a job without assigning it an id.
	#[error("{}", .job.report(Some("Server accepted the job but returned no job id")))]
	MissingJobId {
		/// Submission payload as returned by the server.
		job: JobResult,
	},
	/// The job reached a non-success terminal state.
	#[error("{}", .job.report(None))]
	Terminal {
		/// Final job payload, including status and messages.
		job: JobResult,
	},
}
impl JobError {
	/// Returns the job payload attached to the error, if any.
	pub fn job(&self) -> Option<&JobResult> {
		match self {
			Self::UnexpectedStatus { job, .. } | Self::MissingJobId { job } | Self::Terminal { job } =>
				Some(job),
			Self::ServiceNotFound { .. } | Self::TaskNotFound { .. } => None,
		}
	}
}

fn unexpected_status_report(expected: &JobStatus, job: &JobResult) -> String {
	let actual = job.job_status.map(JobStatus::as_str).unwrap_or("<missing>");

	job.report(Some(&format!("Expected job status `{expected}`, but was `{actual}`")))
}
