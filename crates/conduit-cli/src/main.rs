//! CLI binary for serving, probing and validating the stores operation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde_json::Value;

use conduit_pipeline::{
    comply_with, execute_with_retry, interface_violations, run_operation, stores_pipeline,
    BackoffPolicy, InterfaceModel,
};
use conduit_server::AppState;
use conduit_types::{Restriction, ServiceConfig};
use conduit_upstream::{DynUpstream, HttpUpstream};

#[derive(Parser)]
#[command(name = "conduit", version, about = "Contract-mapped store proxy")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GET /stores
    Serve {
        /// JSON service configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on (overrides config and CONDUIT_LISTEN)
        #[arg(short, long)]
        listen: Option<String>,

        /// Upstream base URL (overrides config and CONDUIT_UPSTREAM_HOST)
        #[arg(short, long)]
        upstream: Option<String>,
    },

    /// Serve the stub upstream store records
    Stub {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:8081")]
        listen: String,
    },

    /// Run the stores operation once and print the result
    Fetch {
        /// JSON service configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Upstream base URL
        #[arg(short, long)]
        upstream: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// JSON service configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Validate a JSON document against an interface model and restrictions
    Check {
        /// JSON record or array of records
        #[arg(short, long)]
        input: PathBuf,

        /// JSON object mapping field names to type tags
        #[arg(short, long)]
        model: PathBuf,

        /// JSON array of { property, operator, value }
        #[arg(short, long)]
        restrictions: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            config,
            listen,
            upstream,
        } => {
            cmd_serve(load_config(config.as_deref(), listen, upstream)?).await?;
        }
        Commands::Stub { listen } => {
            conduit_server::serve(&listen, conduit_server::stub_router()).await?;
        }
        Commands::Fetch { config, upstream } => {
            cmd_fetch(load_config(config.as_deref(), None, upstream)?).await?;
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref(), None, None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Check {
            input,
            model,
            restrictions,
        } => {
            if !cmd_check(&input, &model, restrictions.as_deref())? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Defaults, then the config file, then environment, then CLI flags.
fn load_config(
    path: Option<&Path>,
    listen: Option<String>,
    upstream: Option<String>,
) -> anyhow::Result<ServiceConfig> {
    let config = match path {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    Ok(apply_overrides(config.apply_env(), listen, upstream))
}

fn apply_overrides(
    mut config: ServiceConfig,
    listen: Option<String>,
    upstream: Option<String>,
) -> ServiceConfig {
    if let Some(listen) = listen {
        config.listen = listen;
    }
    if let Some(host) = upstream {
        config.operation.host = host;
    }
    config
}

fn http_upstream(config: &ServiceConfig) -> DynUpstream {
    DynUpstream::new(HttpUpstream::new(Duration::from_millis(config.timeout_ms)))
}

async fn cmd_serve(config: ServiceConfig) -> anyhow::Result<()> {
    tracing::info!(
        upstream = %config.operation.uri(),
        max_retries = config.max_retries,
        "Starting stores service"
    );
    let listen = config.listen.clone();
    let upstream = http_upstream(&config);
    let app = conduit_server::router(AppState::new(config, upstream));
    conduit_server::serve(&listen, app).await?;
    Ok(())
}

async fn cmd_fetch(config: ServiceConfig) -> anyhow::Result<()> {
    let pipeline = stores_pipeline(http_upstream(&config));
    let policy = BackoffPolicy::from_millis(config.backoff_ms);
    let result = execute_with_retry(
        || run_operation(&pipeline, &config.operation, Value::Null),
        config.max_retries,
        &policy,
        "stores",
    )
    .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Print every violation and return whether `input` passed all checks.
fn cmd_check(input: &Path, model: &Path, restrictions: Option<&Path>) -> anyhow::Result<bool> {
    let document = read_json(input)?;
    let model: InterfaceModel = serde_json::from_value(read_json(model)?)
        .with_context(|| format!("{} is not an interface model", model.display()))?;

    let violations = interface_violations(&document, &model);
    for violation in &violations {
        println!("[INTERFACE] {violation}");
    }
    let mut ok = violations.is_empty();

    if let Some(path) = restrictions {
        let restrictions: Vec<Restriction> = serde_json::from_value(read_json(path)?)
            .with_context(|| format!("{} is not a restriction list", path.display()))?;
        if !comply_with(&document, &restrictions)? {
            println!("[RESTRICTION] input does not satisfy every restriction");
            ok = false;
        }
    }

    if ok {
        println!("Input is valid");
    }
    Ok(ok)
}
