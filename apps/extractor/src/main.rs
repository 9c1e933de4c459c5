mod config;
mod cost;
mod errors;
mod extraction;
mod llm_client;
mod models;
mod pipeline;
mod renderer;
mod routes;
mod sanitizer;
mod state;
mod storage;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::cost::{CostEstimator, ModelId, PricingTable};
use crate::extraction::ExtractionClient;
use crate::llm_client::LlmClient;
use crate::pipeline::{parse_url_list, Pipeline};
use crate::renderer::{ChromeRenderer, ChromeRendererConfig};
use crate::routes::build_router;
use crate::sanitizer::Sanitizer;
use crate::state::AppState;
use crate::storage::ArtifactStore;

#[derive(Parser)]
#[command(name = "extractor", version, about = "Extract structured job postings from web pages")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape a batch of URLs and write the artifacts to OUTPUT_DIR
    Run {
        /// Model id; must be present in the pricing table
        #[arg(short, long)]
        model: Option<String>,

        /// File with one URL per line (blank lines and # comments are skipped)
        #[arg(short = 'f', long)]
        urls_file: Option<PathBuf>,

        urls: Vec<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the pricing table
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pricing = Arc::new(PricingTable::load(config.pricing_file.as_deref())?);

    match cli.command {
        Command::Run {
            model,
            urls_file,
            urls,
        } => run(&config, pricing, model, urls_file, urls).await,
        Command::Serve { port } => serve(config, pricing, port).await,
        Command::Models => {
            for (model, p) in pricing.models() {
                let marker = if *model == config.default_model { "*" } else { " " };
                println!(
                    "{marker} {model:<28} in ${}/token  out ${}/token",
                    p.input_price_per_token, p.output_price_per_token
                );
            }
            Ok(())
        }
    }
}

async fn run(
    config: &Config,
    pricing: Arc<PricingTable>,
    model: Option<String>,
    urls_file: Option<PathBuf>,
    mut urls: Vec<String>,
) -> Result<()> {
    if let Some(path) = urls_file {
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read URL file {}", path.display()))?;
        urls.extend(parse_url_list(&text));
    }
    anyhow::ensure!(!urls.is_empty(), "No URLs given; pass URLs or --urls-file");

    let model = model
        .map(ModelId::new)
        .unwrap_or_else(|| config.default_model.clone());
    let pipeline = build_pipeline(config, pricing)?;

    let report = pipeline.run_batch(&urls, &model).await?;
    for result in &report.results {
        println!("{result}");
    }
    println!(
        "Total: {} input tokens, {} output tokens, ${}",
        report.total_input_tokens, report.total_output_tokens, report.total_cost
    );
    Ok(())
}

async fn serve(config: Config, pricing: Arc<PricingTable>, port: Option<u16>) -> Result<()> {
    info!("Starting extractor API v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = build_pipeline(&config, pricing.clone())?;
    let port = port.unwrap_or(config.port);
    let state = AppState {
        pipeline: Arc::new(Mutex::new(pipeline)),
        pricing,
        config,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_pipeline(config: &Config, pricing: Arc<PricingTable>) -> Result<Pipeline> {
    let llm = LlmClient::new(
        config.require_api_key()?,
        config.openai_base_url.clone(),
        config.llm_timeout,
    )?;
    info!("LLM client initialized ({})", config.openai_base_url);

    let renderer = ChromeRenderer::new(ChromeRendererConfig {
        chrome_executable: config.chrome_executable.clone(),
        scroll_delay: config.scroll_delay,
        navigation_timeout: config.navigation_timeout,
    });

    let store = ArtifactStore::new(&config.output_dir);
    info!("Writing artifacts to {}", store.output_dir().display());

    Ok(Pipeline::new(
        Arc::new(renderer),
        Sanitizer::new(config.related_section_keywords.clone()),
        ExtractionClient::new(Arc::new(llm), pricing.clone()),
        CostEstimator::new(pricing),
        store,
        config.settle_delay,
    ))
}
