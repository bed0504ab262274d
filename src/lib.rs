pub mod config;
pub mod hosting;
pub mod http;
pub mod manifest;
pub mod pipeline;
pub mod runtime;

use anyhow::{Context, Result};

use config::Config;
use hosting::build_hosting_service;
use pipeline::{RunOutcome, UpdatePipeline};
use runtime::Runtime;

/// Load configuration, build the Bitbucket client and run the pipeline once.
///
/// Configuration is validated before any remote call is made.
#[tracing::instrument(skip(runtime, api_url))]
pub async fn run<R: Runtime>(runtime: &R, api_url: Option<String>) -> Result<RunOutcome> {
    let config = Config::from_runtime(runtime, api_url).context("Invalid configuration")?;
    let hosting = build_hosting_service(&config)?;

    let mut pipeline = UpdatePipeline::new(&hosting, &config);
    let outcome = pipeline.run().await?;
    Ok(outcome)
}
