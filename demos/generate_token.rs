//! Loads server settings (default `appsettings.json`, or the path given as the first
//! argument) and prints a freshly generated token.

// std
use std::env;
// crates.io
use color_eyre::Result;
use tracing_subscriber::EnvFilter;
// self
use ags_broker::{client::AgsClient, config::ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let path = env::args().nth(1).unwrap_or_else(|| "appsettings.json".into());
	let config = ServerConfig::load(&path).await?;
	let client = AgsClient::from_config(&config)?;
	let token = client.token().await?;

	println!("token:  {}", token.secret().expose());
	println!("expires: {}", token.expires_at());

	Ok(())
}
