use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;

use bloodwork::cli::{Cli, Command};
use bloodwork::config::AppConfig;
use bloodwork::extract::PdfExtractor;
use bloodwork::llm::GroqClient;
use bloodwork::logging;
use bloodwork::orchestrator::Orchestrator;
use bloodwork::pipeline::{GatePolicy, Pipeline, PipelineSettings, medical_stages};
use bloodwork::server;
use bloodwork::store::JobStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_subscriber();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(Path::new(path))?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Command::Serve { port } => serve(config, port).await,
    }
}

async fn serve(config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if config.api_key.is_empty() {
        bail!("GROQ_API_KEY must be set (environment variable or bloodwork.toml)");
    }

    let client = match &config.base_url {
        Some(url) => GroqClient::with_base_url(config.api_key.clone(), url.clone()),
        None => GroqClient::new(config.api_key.clone()),
    };

    let settings = PipelineSettings {
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        gate_policy: if config.halt_on_invalid {
            GatePolicy::Halt
        } else {
            GatePolicy::Continue
        },
    };
    let pipeline = Pipeline::new(Arc::new(client), medical_stages(), settings);

    let store = JobStore::open(Path::new(&config.data_dir).join("analysis_db.json"))?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(store),
        Arc::new(pipeline),
        Arc::new(PdfExtractor),
        config.max_concurrent_jobs,
        config.max_report_chars,
    ));

    let app = server::router(orchestrator);
    let port = port_override.unwrap_or(config.port);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!(port, model = %config.model, "bloodwork API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
