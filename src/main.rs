use anyhow::{anyhow, Context, Result};
use clap::Parser;
use dataset_multiplier::app::DatasetMultiplierApp;
use dataset_multiplier::config::{Config, Environment, DEFAULT_CONFIG_FILE};
use dataset_multiplier::upload::{HttpProcessApi, JobClient, PollPolicy};
use eframe::CreationContext;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "dataset-multiplier")]
#[command(about = "Upload a ZIP of images, classify them and download a synthetic expansion")]
struct Args {
    /// Path to config TOML. If omitted, uses ./dataset-multiplier.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Which configured backend to talk to.
    #[arg(long, value_enum)]
    env: Option<Environment>,

    /// Use this API base URL instead of the configured ones.
    #[arg(long)]
    api_url: Option<String>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging(&args, &config)?;

    let api = HttpProcessApi::new(&config.api)
        .context("building API client")?
        .with_upload_limit(config.limits.max_upload_bytes);
    info!("Using API at {}", api.base_url());
    let client = JobClient::new(api, PollPolicy::from(&config.polling));

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 720.0])
            .with_min_inner_size([420.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Dataset Multiplier",
        options,
        Box::new(move |cc: &CreationContext| Box::new(DatasetMultiplierApp::new(cc, &config, client))),
    )
    .map_err(|e| anyhow!("window failed: {e}"))
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    if let Some(env) = args.env {
        config.api.environment = env;
    }
    if let Some(url) = &args.api_url {
        config.api.base_url_override = Some(url.clone());
    }
    config.validate()?;
    Ok(config)
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config) -> Result<()> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))
}
