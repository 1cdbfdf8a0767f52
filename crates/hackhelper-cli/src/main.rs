use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::HackHelperConfig;
use hackhelper_core::{
    EvaluationEngine, FallbackClient, IdeaEngine, ProjectSubmission, Questionnaire,
};
use hackhelper_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "hackhelper")]
#[command(version)]
#[command(about = "HackHelper: AI project scoring and idea generation for hackathons")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration (secrets masked)
    Config,

    /// Run the REST gateway
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Score a project described by a JSON file
    Evaluate {
        /// JSON file with name, description and optional details
        file: PathBuf,
    },

    /// Generate ranked project ideas from a questionnaire JSON file
    Ideas {
        /// JSON file with the questionnaire answers
        file: PathBuf,
    },

    /// Check which AI providers answer
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Serve { port } => cmd_serve(&cli.config, port).await,
        Commands::Evaluate { file } => cmd_evaluate(&cli.config, &file).await,
        Commands::Ideas { file } => cmd_ideas(&cli.config, &file).await,
        Commands::Providers => cmd_providers(&cli.config).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        restrict_permissions(&config_path).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("HackHelper initialized at {}", config_dir.display());
    println!(
        "Export GOOGLE_API_KEY, ANTHROPIC_API_KEY or OPENAI_API_KEY, or edit {}.",
        config_path.display()
    );
    Ok(())
}

/// The loader refuses group/other-readable files, so new configs start at 0600
async fn restrict_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HackHelperConfig::load(config_path)?;
    println!("{:#?}", cfg);
    let active = cfg.ai.active_providers();
    if active.is_empty() {
        println!("\nNo AI providers configured.");
    } else {
        println!("\nActive providers (in order): {}", active.join(", "));
    }
    Ok(())
}

fn build_client(cfg: &HackHelperConfig) -> Result<Arc<FallbackClient>> {
    let client = FallbackClient::from_config(&cfg.ai).context(
        "Set at least one of GOOGLE_API_KEY, ANTHROPIC_API_KEY or OPENAI_API_KEY",
    )?;
    Ok(Arc::new(client))
}

async fn cmd_serve(config_path: &Option<PathBuf>, port: Option<u16>) -> Result<()> {
    let mut cfg = HackHelperConfig::load(config_path)?;
    if let Some(port) = port {
        cfg.gateway.port = port;
    }
    let client = build_client(&cfg)?;

    if cfg.gateway.auth_token.is_empty() {
        warn!("Gateway auth token not set, /api routes are open");
    }

    let server = GatewayServer::new(
        cfg.gateway.socket_addr()?,
        client,
        cfg.gateway.auth_token.clone(),
    )?
    .with_max_upload_bytes(cfg.gateway.max_upload_bytes());

    server
        .run_until(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await
}

async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

async fn cmd_evaluate(config_path: &Option<PathBuf>, file: &Path) -> Result<()> {
    let cfg = HackHelperConfig::load(config_path)?;
    let project: ProjectSubmission = read_json_file(file).await?;
    let engine = EvaluationEngine::new(build_client(&cfg)?);

    let report = engine.evaluate(&project).await?;
    info!(
        "{} scored {} ({}) via {}",
        project.name, report.overall_score, report.readiness_level, report.provider
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_ideas(config_path: &Option<PathBuf>, file: &Path) -> Result<()> {
    let cfg = HackHelperConfig::load(config_path)?;
    let questionnaire: Questionnaire = read_json_file(file).await?;
    let engine = IdeaEngine::new(build_client(&cfg)?);

    let batch = engine.generate(&questionnaire).await?;
    println!("{}", serde_json::to_string_pretty(&batch)?);
    Ok(())
}

async fn cmd_providers(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = HackHelperConfig::load(config_path)?;
    let client = build_client(&cfg)?;

    let results = client.probe().await;
    let mut healthy = 0;
    for result in &results {
        match &result.outcome {
            Ok(_) => {
                healthy += 1;
                println!("  ok      {} ({})", result.provider, result.model);
            }
            Err(e) => println!("  failed  {} ({}): {}", result.provider, result.model, e),
        }
    }
    println!("{}/{} providers responding", healthy, results.len());
    Ok(())
}
