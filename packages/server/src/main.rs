#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the HPD alerts server.

use clap::Parser;
use hpd_alerts_geocoder::{ProviderKind, ProviderSelection};
use hpd_alerts_pipeline::{ConfigError, DEFAULT_INTERVAL_SECS, PipelineConfig};
use hpd_alerts_server::{ServerConfig, run_server};

#[derive(Parser)]
#[command(
    name = "hpd_alerts_server",
    about = "Maps active Henrico County police calls"
)]
struct Cli {
    /// Geocoding provider: `nominatim`, or `google` (reads the API key from
    /// `MAPS_TOKEN`)
    #[arg(long)]
    provider: ProviderKind,

    /// Seconds between scrapes of the county's active calls page (minimum 10)
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    interval: u64,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let provider = ProviderSelection::from_kind(cli.provider, std::env::var("MAPS_TOKEN").ok())
        .map_err(ConfigError::from)?;
    let config = PipelineConfig::new(provider, cli.interval)?;

    log::info!(
        "Using {} geocoding, polling every {}s",
        config.provider().kind(),
        config.interval().as_secs()
    );

    run_server(config, ServerConfig::from_env()).await?;
    Ok(())
}
