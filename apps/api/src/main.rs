mod cli;
mod config;
mod errors;
mod llm_client;
mod prompt;
mod returns;
mod routes;
mod schema;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{read_email, Cli, Commands};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::returns::pipeline::ReturnsPipeline;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging. Logs go to stderr so `process` can print the
    // reply alone on stdout.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Initialize the generation client and the pipeline around it
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.generator_config())
        .context("Failed to build HTTP client for the generation service")?;
    info!("LLM client initialized (model: {})", config.model);

    let pipeline = ReturnsPipeline::new(Arc::new(llm), config.pipeline_config()?)
        .context("Invalid pipeline configuration")?;
    let pipeline = Arc::new(pipeline);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config, pipeline).await,
        Commands::Process { input, json } => {
            let email = read_email(&input)?;
            let run = pipeline.run(&email).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&run)?);
            } else {
                println!("{}", run.reply);
            }
            Ok(())
        }
    }
}

async fn serve(config: &Config, pipeline: Arc<ReturnsPipeline>) -> Result<()> {
    info!("Starting Returns API v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState { pipeline };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
