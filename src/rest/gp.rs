//! Geoprocessing service descriptors and job payloads.

// std
use std::fmt::Write;
// self
use crate::_prelude::*;

/// Descriptor returned by `{base}/rest/services/{service}/GPServer`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpServer {
	/// Free-form service description.
	#[serde(default)]
	pub service_description: Option<String>,
	/// Task names exposed by the service.
	#[serde(default)]
	pub tasks: Vec<String>,
	/// Whether tasks run inline or as polled jobs.
	pub execution_type: ExecutionType,
}
impl GpServer {
	/// Returns `true` when the service exposes `task`.
	pub fn has_task(&self, task: &str) -> bool {
		self.tasks.iter().any(|t| t == task)
	}
}

/// Execution mode declared by a geoprocessing service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionType {
	/// `execute` returns the result inline.
	#[serde(rename = "esriExecutionTypeSynchronous")]
	Synchronous,
	/// `submitJob` returns a job id that must be polled.
	#[serde(rename = "esriExecutionTypeAsynchronous")]
	Asynchronous,
}

/// Server-side job lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
	/// Created, not yet queued.
	#[serde(rename = "esriJobNew")]
	New,
	/// Accepted by `submitJob`.
	#[serde(rename = "esriJobSubmitted")]
	Submitted,
	/// Queued.
	#[serde(rename = "esriJobWaiting")]
	Waiting,
	/// Running.
	#[serde(rename = "esriJobExecuting")]
	Executing,
	/// Finished successfully.
	#[serde(rename = "esriJobSucceeded")]
	Succeeded,
	/// Finished with an error.
	#[serde(rename = "esriJobFailed")]
	Failed,
	/// Exceeded the server's time limit.
	#[serde(rename = "esriJobTimedOut")]
	TimedOut,
	/// Cancellation in progress.
	#[serde(rename = "esriJobCancelling")]
	Cancelling,
	/// Cancelled.
	#[serde(rename = "esriJobCancelled")]
	Cancelled,
	/// Deletion in progress.
	#[serde(rename = "esriJobDeleting")]
	Deleting,
	/// Deleted.
	#[serde(rename = "esriJobDeleted")]
	Deleted,
}
impl JobStatus {
	/// Short, human-readable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			JobStatus::New => "New",
			JobStatus::Submitted => "Submitted",
			JobStatus::Waiting => "Waiting",
			JobStatus::Executing => "Executing",
			JobStatus::Succeeded => "Succeeded",
			JobStatus::Failed => "Failed",
			JobStatus::TimedOut => "TimedOut",
			JobStatus::Cancelling => "Cancelling",
			JobStatus::Cancelled => "Cancelled",
			JobStatus::Deleting => "Deleting",
			JobStatus::Deleted => "Deleted",
		}
	}

	/// Returns `true` while the job may still change state on its own.
	pub const fn is_pending(self) -> bool {
		matches!(self, Self::New | Self::Submitted | Self::Waiting | Self::Executing)
	}

	/// Returns `true` for every state polling stops at.
	pub const fn is_terminal(self) -> bool {
		!self.is_pending()
	}

	/// Returns `true` for terminal states other than [`JobStatus::Succeeded`].
	pub const fn is_failure(self) -> bool {
		self.is_terminal() && !matches!(self, Self::Succeeded)
	}
}
impl Display for JobStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Severity of a [`JobMessage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobMessageType {
	/// Progress information.
	#[serde(rename = "esriJobMessageTypeInformative")]
	Informative,
	/// Warning.
	#[serde(rename = "esriJobMessageTypeWarning")]
	Warning,
	/// Error.
	#[serde(rename = "esriJobMessageTypeError")]
	Error,
	/// Empty message.
	#[serde(rename = "esriJobMessageTypeEmpty")]
	Empty,
	/// Abort notice.
	#[serde(rename = "esriJobMessageTypeAbort")]
	Abort,
}
impl JobMessageType {
	/// Short, human-readable label.
	pub const fn as_str(self) -> &'static str {
		match self {
			JobMessageType::Informative => "Informative",
			JobMessageType::Warning => "Warning",
			JobMessageType::Error => "Error",
			JobMessageType::Empty => "Empty",
			JobMessageType::Abort => "Abort",
		}
	}
}
impl Display for JobMessageType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Message attached to a job or a synchronous execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
	/// Message text.
	#[serde(default)]
	pub description: String,
	/// Severity.
	#[serde(rename = "type")]
	pub kind: JobMessageType,
}

/// Job handle and result payload.
///
/// Synchronous executions only fill `messages` and `results`; asynchronous jobs also carry
/// the id and status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
	/// Server-assigned job id.
	#[serde(default)]
	pub job_id: Option<String>,
	/// Last reported status.
	#[serde(default)]
	pub job_status: Option<JobStatus>,
	/// Messages collected so far.
	#[serde(default)]
	pub messages: Vec<JobMessage>,
	/// Output parameters as returned by the server.
	#[serde(default)]
	pub results: Option<serde_json::Value>,
}
impl JobResult {
	/// Renders a multi-line report: `headline` (or a default one) followed by every message.
	pub fn report(&self, headline: Option<&str>) -> String {
		let mut out = match headline {
			Some(headline) => headline.to_owned(),
			None => format!(
				"Job '{}' encountered an error with job status '{}'",
				self.job_id.as_deref().unwrap_or_default(),
				self.job_status.map(JobStatus::as_str).unwrap_or("<missing>")
			),
		};

		if !self.messages.is_empty() {
			out.push_str("\n---- Job messages start ----\n");

			for message in &self.messages {
				let _ = writeln!(out, "{}: {}", message.kind, message.description);
			}

			out.push_str("---- Job messages end ----");
		}

		out
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn job_status_groups() {
		assert!(JobStatus::Executing.is_pending());
		assert!(JobStatus::Succeeded.is_terminal());
		assert!(!JobStatus::Succeeded.is_failure());

		for status in [
			JobStatus::Failed,
			JobStatus::TimedOut,
			JobStatus::Cancelling,
			JobStatus::Cancelled,
			JobStatus::Deleting,
			JobStatus::Deleted,
		] {
			assert!(status.is_failure(), "{status} should be a failure.");
		}
	}

	#[test]
	fn job_payload_uses_wire_names() {
		let body = r#"{
			"jobId": "j1",
			"jobStatus": "esriJobFailed",
			"messages": [{"type": "esriJobMessageTypeError", "description": "Boom"}]
		}"#;
		let job: JobResult = serde_json::from_str(body).expect("Job payload should decode.");

		assert_eq!(job.job_status, Some(JobStatus::Failed));
		assert_eq!(job.messages[0].kind, JobMessageType::Error);
		assert!(job.results.is_none());
	}

	#[test]
	fn report_lists_messages_between_markers() {
		let job = JobResult {
			job_id: Some("j1".into()),
			job_status: Some(JobStatus::TimedOut),
			messages: vec![
				JobMessage { description: "Started".into(), kind: JobMessageType::Informative },
				JobMessage { description: "Too slow".into(), kind: JobMessageType::Error },
			],
			results: None,
		};

		assert_eq!(
			job.report(None),
			"Job 'j1' encountered an error with job status 'TimedOut'\n\
			 ---- Job messages start ----\n\
			 Informative: Started\n\
			 Error: Too slow\n\
			 ---- Job messages end ----"
		);
		assert_eq!(JobResult::default().report(Some("Custom")), "Custom");
	}

	#[test]
	fn descriptor_lookup() {
		let gp: GpServer = serde_json::from_str(
			r#"{"serviceDescription":"","tasks":["Buffer"],"executionType":"esriExecutionTypeAsynchronous"}"#,
		)
		.expect("Descriptor should decode.");

		assert_eq!(gp.execution_type, ExecutionType::Asynchronous);
		assert!(gp.has_task("Buffer"));
		assert!(!gp.has_task("Clip"));
	}
}
