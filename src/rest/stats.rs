//! Service statistics payload from the admin API.

// self
use crate::_prelude::*;

/// Result of `{base}/admin/services/.../statistics`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatistics {
	/// Aggregate over every machine.
	#[serde(default, alias = "Summary")]
	pub summary: Option<StatisticsSummary>,
	/// One entry per machine in the site.
	#[serde(default, alias = "PerMachineSummary", alias = "perMachine")]
	pub per_machine_summary: Vec<StatisticsSummary>,
}

/// Instance counters for one service (site-wide or per machine).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatisticsSummary {
	/// Service folder.
	pub folder_name: Option<String>,
	/// Service name.
	pub service_name: Option<String>,
	/// Service type, e.g. `MapServer`.
	#[serde(rename = "type")]
	pub service_type: Option<String>,
	/// Configured maximum instances.
	pub max: i64,
	/// Instances currently serving requests.
	pub busy: i64,
	/// Idle instances already created.
	pub free: i64,
	/// Instances starting up.
	pub initializing: i64,
	/// Instances not yet created.
	pub not_created: i64,
	/// Requests served.
	pub transactions: i64,
	/// Accumulated busy time in milliseconds.
	pub total_busy_time: i64,
	/// Machine the entry belongs to.
	pub machine_name: Option<String>,
	/// Whether the machine reported statistics.
	pub is_statistics_available: bool,
}
impl StatisticsSummary {
	/// Instances that could take a request now: `max - busy`.
	pub fn available(&self) -> i64 {
		self.max.saturating_sub(self.busy)
	}
}
