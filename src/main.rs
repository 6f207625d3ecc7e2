use anyhow::Result;
use semsim_kp::config::{Config, RuntimeConfig};
use semsim_kp::http::{AppState, start_http_server};
use semsim_kp::logging::{self, QueryLog};
use semsim_kp::metadata::GraphMetadata;
use semsim_kp::pipeline::QueryService;
use semsim_kp::similarity::SemsimianClient;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    semsim_kp::load_env();

    let runtime = RuntimeConfig::load_from_env();
    let _log_guard = logging::init(&runtime)?;

    let config = Arc::new(Config::load()?);
    info!(
        "Starting {} v{} (provenance {})",
        config.service.title, config.service.version, config.service.provenance
    );

    let similarity = Arc::new(SemsimianClient::new(
        config.similarity.endpoint(),
        config.similarity.timeout_ms,
    )?);
    info!("SemSimian endpoint: {}", similarity.endpoint());

    let service = Arc::new(QueryService::new(
        similarity,
        Arc::new(QueryLog::new()),
        config.service.provenance.clone(),
        config.similarity.default_result_limit,
    ));
    let metadata = Arc::new(GraphMetadata::load(&config));

    start_http_server(AppState {
        config,
        service,
        metadata,
    })
    .await
}
