mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use extract::{ExtractorKind, build_extractor};
use graph::{GraphBuilder, PlottersRenderer};
use ingest::{DirectorySource, DocumentScope};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "kg", version, about = "Build knowledge graphs from text documents")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "KG_CONFIG")]
    config: Option<PathBuf>,

    /// Start from a preset instead of the defaults: fast or accurate
    #[arg(long, global = true, env = "KG_MODE")]
    mode: Option<String>,

    /// Extraction strategy: rule or model
    #[arg(long, global = true, env = "KG_EXTRACTOR")]
    extractor: Option<String>,

    #[arg(long, global = true, env = "KG_MODEL")]
    model: Option<String>,

    #[arg(long, global = true, env = "KG_MODEL_URL")]
    model_url: Option<String>,

    #[arg(long, global = true, env = "KG_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum extractions in flight
    #[arg(long, global = true, env = "KG_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "KG_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the graph as JSON
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Print build statistics to stderr
        #[arg(long)]
        stats: bool,
    },
    /// Render the graph to a PNG
    Visualize {
        #[command(flatten)]
        input: InputArgs,

        /// Write the PNG here instead of printing base64 JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Directory of .txt and .md documents
    #[arg(long, env = "KG_DOCS", default_value = ".")]
    docs: PathBuf,

    /// Restrict the build to one document
    #[arg(long)]
    document_id: Option<String>,
}

impl InputArgs {
    fn scope(&self) -> DocumentScope {
        match &self.document_id {
            Some(id) => DocumentScope::Single(id.clone()),
            None => DocumentScope::All,
        }
    }
}

impl Cli {
    /// A config file replaces the preset; flags and environment apply last.
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => match self.mode.as_deref() {
                Some("fast") => AppConfig::fast_mode(),
                Some("accurate") => AppConfig::accurate_mode(),
                Some(other) => anyhow::bail!("Unknown mode: {}", other),
                None => AppConfig::default(),
            },
        };

        if let Some(kind) = &self.extractor {
            config.extractor = kind.parse::<ExtractorKind>()?;
        }
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(url) = &self.model_url {
            config.model.base_url = url.clone();
        }
        if let Some(key) = &self.api_key {
            config.model.api_key = Some(key.clone());
        }
        if let Some(concurrency) = self.concurrency {
            config.build.scheduler.concurrency = concurrency.max(1);
        }

        Ok(config)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = cli.resolve_config()?;
    info!(extractor = ?config.extractor, model = %config.model.model, "Configuration loaded");

    let extractor = build_extractor(config.extractor, &config.model, &config.cache);

    match &cli.command {
        Command::Build { input, stats } => {
            let builder = GraphBuilder::new(
                Arc::new(DirectorySource::new(input.docs.clone())),
                extractor,
                config.build.clone(),
            );
            let (view, build_stats) = builder.build_with_stats(&input.scope()).await?;

            if *stats {
                eprintln!("{}", serde_json::to_string_pretty(&build_stats)?);
            }
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Visualize { input, out } => {
            let builder = GraphBuilder::new(
                Arc::new(DirectorySource::new(input.docs.clone())),
                extractor,
                config.build.clone(),
            );
            let renderer = Arc::new(PlottersRenderer::new(config.render.clone()));
            let image = builder.visualize(&input.scope(), renderer).await?;

            match (out, &image.graph_image) {
                (Some(path), Some(bytes)) => {
                    std::fs::write(path, bytes)
                        .context(format!("Failed to write image: {:?}", path))?;
                    info!(path = ?path, bytes = bytes.len(), "Graph image written");
                }
                (Some(_), None) => {
                    info!("Nothing to render, no image written");
                }
                (None, _) => println!("{}", serde_json::to_string(&image)?),
            }
        }
    }

    Ok(())
}
