mod chat;
mod cli;
mod config;
mod providers;
mod registry;
mod relay;
mod utils;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cli::{list::list_cmd, resolve::resolve_cmd, serve::serve_cmd, ColorMode};
use providers::providers::ProviderIdentifier;

#[derive(
    Parser, Default, Clone, Copy, ValueEnum, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum RequestedColorMode {
    #[default]
    Auto,
    On,
    Off,
}

#[derive(Parser)]
#[command(name = "modelrelay")]
#[command(
    about = "Routes chat requests to a local Ollama or LM Studio model, or to a hosted API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Read the configuration from this file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = RequestedColorMode::default())]
    color: RequestedColorMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (the default)
    Serve(ServeArgs),
    /// Show where a model would be routed
    Resolve(ResolveArgs),
    /// List the models the providers currently serve
    List(ListArgs),
}

/// Output formats
#[derive(
    Parser, ValueEnum, Default, Clone, Copy, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum ListingFormat {
    /// Format the output as a table
    #[default]
    Table,
    /// Format the output as JSON
    Json,
    /// Format the output as a table without a header
    HeaderlessTable,
}

#[derive(Args, Default)]
pub(crate) struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// The requested model, e.g. "llama3.2" or "gpt-4o"
    model: String,
    /// Base URL used when no local provider serves the model
    #[arg(long)]
    base_url: Option<String>,
    /// API key used when no local provider serves the model
    #[arg(long)]
    api_key: Option<String>,
    /// Output the route with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
}

#[derive(Args)]
pub(crate) struct ListArgs {
    /// Output the listing with the specified format
    #[arg(short, long, default_value_t = ListingFormat::default())]
    format: ListingFormat,
    /// Limit listing to the specified provider
    #[arg(short, long)]
    provider: Option<ProviderIdentifier>,
}

/// Reports the outcome of loading `.env`. Runs once logging is up, since the
/// file itself may set `RUST_LOG`.
fn report_dotenv(loaded: Result<PathBuf, dotenvy::Error>) {
    match loaded {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => tracing::warn!(error = %err, "failed to load .env file"),
    }
}

/// `RUST_LOG` takes precedence over `default_directive`.
fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn init_tracing(default_directive: &str) {
    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = init_result {
        eprintln!("failed to initialize logging: {}", err);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    utils::errors::configure_color(ColorMode::resolve_auto(cli.color));

    let dotenv = dotenvy::dotenv();

    init_tracing(match cli.command {
        None | Some(Commands::Serve(_)) => "info",
        Some(_) => "warn",
    });

    report_dotenv(dotenv);

    let config = match config::read_config(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => die!("{}", err),
    };

    match &cli.command {
        Some(Commands::Serve(args)) => serve_cmd(&config, args).await,
        Some(Commands::Resolve(args)) => resolve_cmd(&config, args).await,
        Some(Commands::List(args)) => list_cmd(&config, args).await,
        None => serve_cmd(&config, &ServeArgs::default()).await,
    }
}
