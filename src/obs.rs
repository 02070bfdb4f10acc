//! Observability helpers for broker operations.
//!
//! # Feature Flags
//!
//! - Spans named `ags_broker.operation` carry the `operation` and `stage` fields.
//! - Enable `metrics` to increment the `ags_broker_operation_total` counter for every
//!   attempt/success/failure/cancellation, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Operation kinds observed by the broker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Token acquisition (admin endpoint, discovery, exchange).
	TokenAcquisition,
	/// Geoprocessing task execution.
	JobExecution,
	/// Service statistics reads and instance waiting.
	ServiceStatistics,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::TokenAcquisition => "token_acquisition",
			OperationKind::JobExecution => "job_execution",
			OperationKind::ServiceStatistics => "service_statistics",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// The caller cancelled the operation.
	Cancelled,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Cancelled => "cancelled",
		}
	}

	/// Classifies a finished operation.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => Outcome::Success,
			Err(e) if e.is_cancelled() => Outcome::Cancelled,
			Err(_) => Outcome::Failure,
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn outcome_classification() {
		assert_eq!(Outcome::of(&Ok::<_, Error>(())), Outcome::Success);
		assert_eq!(Outcome::of::<()>(&Err(Error::Cancelled)), Outcome::Cancelled);
		assert_eq!(
			Outcome::of::<()>(&Err(crate::error::AuthError::acquisition("x").into())),
			Outcome::Failure
		);
	}
}
