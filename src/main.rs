use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use taskbridge::cli::{Cli, Commands};
use taskbridge::{build_executor, load_registry, utils, MCPServer, Settings, ToolRegistry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new().context("Failed to load settings")?;
    init_logging(&settings);

    let cli = Cli::parse();

    let registry = Arc::new(load_registry(&settings)?);

    match cli.command {
        Commands::Serve => handle_serve(&settings, registry).await,
        Commands::List => handle_list(registry).await,
        Commands::Validate => handle_validate(registry).await,
        Commands::Call { tool, input } => handle_call(&settings, registry, tool, input).await,
    }
}

// stdout carries the MCP transport, so logs go to stderr.
fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn handle_serve(settings: &Settings, registry: Arc<ToolRegistry>) -> Result<()> {
    let credentials = settings.credentials()?;
    let executor = Arc::new(build_executor(registry, &credentials));

    tracing::info!(
        "Registered {} tools: {}",
        executor.registry().names().await.len(),
        executor.registry().names().await.join(", ")
    );

    MCPServer::new(executor).serve_stdio().await
}

async fn handle_list(registry: Arc<ToolRegistry>) -> Result<()> {
    utils::print_header("Configured tools");
    for definition in registry.definitions().await {
        utils::print_tool(&definition);
    }
    Ok(())
}

async fn handle_validate(registry: Arc<ToolRegistry>) -> Result<()> {
    match registry.validate_all().await {
        Ok(()) => {
            utils::print_success(&format!(
                "{} tool descriptors are valid",
                registry.names().await.len()
            ));
            Ok(())
        }
        Err(e) => {
            utils::print_error(&e.to_string());
            Err(e.into())
        }
    }
}

async fn handle_call(
    settings: &Settings,
    registry: Arc<ToolRegistry>,
    tool: String,
    input: String,
) -> Result<()> {
    let credentials = settings.credentials()?;
    let input: serde_json::Value =
        serde_json::from_str(&input).context("--input must be valid JSON")?;

    let executor = build_executor(registry, &credentials);
    utils::print_info(&format!("Invoking {}...", tool));

    let result = executor.execute(&tool, input).await;
    if result.is_error {
        utils::print_error(&result.text());
        anyhow::bail!("{} invocation failed", tool);
    }

    utils::print_success(&result.text());
    Ok(())
}
