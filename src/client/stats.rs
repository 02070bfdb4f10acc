//! Service statistics from the admin API and waiting for free service instances.

// self
use crate::{
	_prelude::*,
	client::AgsClient,
	http::RestHttpClient,
	obs::{self, OperationKind, OperationSpan, Outcome},
	rest::ServiceStatistics,
};

/// Outcome of [`AgsClient::wait_for_free_instances`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceWait {
	/// At least one instance is available; carries `max - busy`.
	Available(i64),
	/// Statistics could not be read (bad URL, missing privileges, no summary).
	Unavailable,
}

impl<C> AgsClient<C>
where
	C: ?Sized + RestHttpClient,
{
	/// Reads `{base}/admin/services[/{folder}]/{name}.{service_type}/statistics`.
	pub async fn service_statistics(
		&self,
		folder: Option<&str>,
		name: &str,
		service_type: &str,
	) -> Result<ServiceStatistics> {
		let path = match folder.map(str::trim).filter(|f| !f.is_empty()) {
			Some(folder) => format!("admin/services/{folder}/{name}.{service_type}/statistics"),
			None => format!("admin/services/{name}.{service_type}/statistics"),
		};

		self.get(self.endpoint(&path)?, std::iter::empty::<(String, String)>()).await
	}

	/// Polls the `MapServer` statistics behind `layer_url` until an instance is available.
	///
	/// Never fails: any error stops waiting and yields [`InstanceWait::Unavailable`].
	pub async fn wait_for_free_instances(
		&self,
		layer_url: &str,
		poll_interval: StdDuration,
	) -> InstanceWait {
		const KIND: OperationKind = OperationKind::ServiceStatistics;

		let span = OperationSpan::new(KIND, "wait_for_free_instances");

		obs::record_outcome(KIND, Outcome::Attempt);

		let outcome = span
			.instrument(async move {
				let Some((folder, name)) = parse_layer_service(layer_url) else {
					tracing::warn!(layer_url, "Layer URL does not name a service.");

					return InstanceWait::Unavailable;
				};

				loop {
					match self.service_statistics(folder.as_deref(), &name, "MapServer").await {
						Ok(ServiceStatistics { summary: Some(summary), .. }) => {
							let available = summary.available();

							if available > 0 {
								return InstanceWait::Available(available);
							}

							tracing::debug!(service = %name, busy = summary.busy, "No free instances yet.");
						},
						Ok(_) => {
							tracing::warn!(service = %name, "Statistics carried no summary.");

							return InstanceWait::Unavailable;
						},
						Err(e) => {
							tracing::warn!(service = %name, error = %e, "Statistics are unavailable.");

							return InstanceWait::Unavailable;
						},
					}

					tokio::time::sleep(poll_interval).await;
				}
			})
			.await;

		obs::record_outcome(KIND, match outcome {
			InstanceWait::Available(_) => Outcome::Success,
			InstanceWait::Unavailable => Outcome::Failure,
		});

		outcome
	}
}

/// Extracts `(folder, service)` from a layer URL such as
/// `https://host/arcgis/rest/services/Folder/Name/FeatureServer/0`.
pub fn parse_layer_service(layer_url: &str) -> Option<(Option<String>, String)> {
	let url = Url::parse(layer_url).ok()?;
	let segments = url.path_segments()?.filter(|s| !s.is_empty()).collect::<Vec<_>>();
	let services = segments.iter().position(|s| s.eq_ignore_ascii_case("services"))?;
	let service = segments.get(services + 1..segments.len().checked_sub(2)?)?;

	match service {
		[] => None,
		[name] => Some((None, (*name).to_owned())),
		[folder, .., name] => Some((Some((*folder).to_owned()), (*name).to_owned())),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn layer_urls_resolve_to_folder_and_service() {
		assert_eq!(
			parse_layer_service("https://gis.example.com/arcgis/rest/services/Utilities/Water/FeatureServer/0"),
			Some((Some("Utilities".into()), "Water".into()))
		);
		assert_eq!(
			parse_layer_service("https://gis.example.com/arcgis/rest/services/Parcels/MapServer/3"),
			Some((None, "Parcels".into()))
		);
	}

	#[test]
	fn unusable_layer_urls_are_rejected() {
		assert_eq!(parse_layer_service("not a url"), None);
		assert_eq!(parse_layer_service("https://gis.example.com/arcgis/rest/info"), None);
		assert_eq!(parse_layer_service("https://gis.example.com/arcgis/rest/services/MapServer/0"), None);
	}
}
