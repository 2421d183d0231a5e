use anyhow::Result;
use seo_rewriter::config::Config;
use seo_rewriter::job;
use seo_rewriter::llm::{openai::OpenAiClient, TextGenerator};
use seo_rewriter::pipeline::PipelineRunner;
use seo_rewriter::rewrite::RowTransformer;
use seo_rewriter::tui::{self, state::AppState};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("seo-rewriter.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("seo_rewriter=info")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let config = Config::load_or_default(Path::new("config.toml"))?;

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    println!();
    println!("  SEO Description Optimizer v0.1.0");
    println!("  ================================");
    println!();

    let api_key = Config::openai_api_key()?;

    let generator: Arc<dyn TextGenerator> = Arc::new(OpenAiClient::new(
        api_key,
        &config.generation.api_base,
        &config.generation.model,
    ));
    let transformer = Arc::new(RowTransformer::new(generator, &config.generation));
    let runner = Arc::new(PipelineRunner::new(transformer));

    tracing::info!(model = %config.generation.model, "starting");

    let state = AppState::new(job::default_output_path(&config.output));
    tui::run_tui(state, runner).await?;

    tracing::debug!("shutting down");
    Ok(())
}
