//! Geoprocessing task execution and the asynchronous job polling loop.
//!
//! [`AgsClient::execute_task`] re-reads the service descriptor on every call, runs
//! synchronous tasks inline, and drives asynchronous ones through `submitJob` plus polling.
//! Cancellation is observed before submission, before and during every poll, and before
//! and during every sleep. Once a job exists, cancelling sends one best-effort remote cancel
//! (bounded by [`REMOTE_CANCEL_TIMEOUT`]) before [`Error::Cancelled`] is returned.

// self
use crate::{
	_prelude::*,
	client::AgsClient,
	error::JobError,
	http::RestHttpClient,
	obs::{self, OperationKind, OperationSpan, Outcome},
	rest::{ExecutionType, GpServer, JobResult, JobStatus},
};

/// Delay between job status polls unless overridden.
pub const DEFAULT_JOB_POLL_INTERVAL: StdDuration = StdDuration::from_secs(3);
/// Upper bound on the best-effort remote cancel sent after the caller cancels a job.
pub const REMOTE_CANCEL_TIMEOUT: StdDuration = StdDuration::from_secs(10);

impl<C> AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	/// Reads the descriptor at `{base}/rest/services/{service}/GPServer`.
	pub async fn gp_server(&self, service: &str) -> Result<GpServer> {
		let not_found = || Error::from(JobError::ServiceNotFound { service: service.to_owned() });

		match self.get::<Option<GpServer>, _, _, _>(self.gp_url(service, "")?, no_params()).await {
			Ok(Some(gp)) => Ok(gp),
			Ok(None) => Err(not_found()),
			Err(Error::Remote(remote)) if remote.is_not_found() => Err(not_found()),
			Err(e) => Err(e),
		}
	}

	/// Runs `task` of the geoprocessing `service` and returns its result.
	///
	/// Unknown services and tasks fail before anything is executed. `cancel` only affects
	/// asynchronous services.
	pub async fn execute_task(
		&self,
		service: &str,
		task: &str,
		parameters: &BTreeMap<String, String>,
		cancel: &CancellationToken,
	) -> Result<JobResult> {
		const KIND: OperationKind = OperationKind::JobExecution;

		let span = OperationSpan::new(KIND, "execute_task");

		obs::record_outcome(KIND, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let gp = self.gp_server(service).await?;

				if !gp.has_task(task) {
					return Err(JobError::TaskNotFound {
						service: service.to_owned(),
						task: task.to_owned(),
						available: gp.tasks,
					}
					.into());
				}

				match gp.execution_type {
					ExecutionType::Synchronous => {
						self.post(self.gp_url(service, &format!("/{task}/execute"))?, form(parameters))
							.await
					},
					ExecutionType::Asynchronous =>
						self.execute_job(service, task, parameters, cancel).await,
				}
			})
			.await;

		obs::record_outcome(KIND, Outcome::of(&result));

		result
	}

	/// Reads the current state of a job.
	pub async fn job_status(&self, service: &str, task: &str, job_id: &str) -> Result<JobResult> {
		self.get(self.gp_url(service, &format!("/{task}/jobs/{job_id}"))?, no_params()).await
	}

	/// Asks the server to cancel a job.
	pub async fn cancel_job(&self, service: &str, task: &str, job_id: &str) -> Result<JobResult> {
		self.post(self.gp_url(service, &format!("/{task}/jobs/{job_id}/cancel"))?, no_params()).await
	}

	async fn execute_job(
		&self,
		service: &str,
		task: &str,
		parameters: &BTreeMap<String, String>,
		cancel: &CancellationToken,
	) -> Result<JobResult> {
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let submitted: JobResult =
			self.post(self.gp_url(service, &format!("/{task}/submitJob"))?, form(parameters)).await?;

		if submitted.job_status != Some(JobStatus::Submitted) {
			return Err(JobError::UnexpectedStatus { expected: JobStatus::Submitted, job: submitted }
				.into());
		}

		let Some(job_id) = submitted.job_id.clone().filter(|id| !id.trim().is_empty()) else {
			return Err(JobError::MissingJobId { job: submitted }.into());
		};

		tracing::info!(service, task, job_id = %job_id, "Job submitted.");

		match self.await_job(service, task, &job_id, cancel).await {
			Err(Error::Cancelled) => {
				let remote_cancel = self.cancel_job(service, task, &job_id);

				match tokio::time::timeout(REMOTE_CANCEL_TIMEOUT, remote_cancel).await {
					Ok(Ok(_)) => tracing::debug!(service, task, job_id = %job_id, "Remote job cancel sent."),
					Ok(Err(e)) => tracing::warn!(
						service,
						task,
						job_id = %job_id,
						error = %e,
						"Remote job cancel failed."
					),
					Err(_) => tracing::warn!(
						service,
						task,
						job_id = %job_id,
						"Remote job cancel timed out."
					),
				}

				Err(Error::Cancelled)
			},
			other => other,
		}
	}

	async fn await_job(
		&self,
		service: &str,
		task: &str,
		job_id: &str,
		cancel: &CancellationToken,
	) -> Result<JobResult> {
		loop {
			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			let job = tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				job = self.job_status(service, task, job_id) => job?,
			};

			match job.job_status {
				Some(JobStatus::Succeeded) => {
					tracing::info!(service, task, job_id, "Job succeeded.");

					return Ok(job);
				},
				Some(status) if status.is_failure() => return Err(JobError::Terminal { job }.into()),
				Some(status) => tracing::debug!(service, task, job_id, %status, "Job still running."),
				None =>
					return Err(
						JobError::UnexpectedStatus { expected: JobStatus::Succeeded, job }.into()
					),
			}

			if cancel.is_cancelled() {
				return Err(Error::Cancelled);
			}

			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				_ = tokio::time::sleep(self.job_poll_interval) => {},
			}
		}
	}

	fn gp_url(&self, service: &str, tail: &str) -> Result<Url> {
		self.endpoint(&format!("rest/services/{}/GPServer{tail}", service.trim_matches('/')))
	}
}

fn form(parameters: &BTreeMap<String, String>) -> impl Iterator<Item = (&str, &str)> {
	parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
}

fn no_params() -> std::iter::Empty<(String, String)> {
	std::iter::empty()
}
