use clap::{Parser, Subcommand};
use driver_snippets::config::Config;
use driver_snippets::core::Result;
use driver_snippets::logging::init_tracing;
use driver_snippets::output::OutputFormat;
use driver_snippets::snippets::{catalogue, Snippet, SnippetContext};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info};

/// Runnable MongoDB driver usage examples.
#[derive(Debug, Parser)]
#[command(name = "driver-snippets", version, about)]
struct Cli {
    /// Configuration file (defaults to <config dir>/driver-snippets/config.toml)
    #[arg(long, global = true, env = "DRIVER_SNIPPETS_CONFIG")]
    config: Option<PathBuf>,

    /// Connection string; overrides the configured environment variable
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Log level for this crate's own events (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the snippet catalogue
    List {
        /// table, csv, json or markdown
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Run one snippet against the deployment
    Run {
        #[arg(value_enum)]
        snippet: Snippet,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.log_level.as_deref())?;
    debug!(config = ?cli.config, "configuration loaded");

    match cli.command {
        Command::List { format } => {
            let grid = catalogue();
            match format {
                OutputFormat::Table => print!("{}", grid.render()),
                other => println!("{}", grid.export(other)?),
            }
            Ok(())
        }
        Command::Run { snippet } => {
            let uri = config.resolve_uri(cli.uri.as_deref())?;
            let ctx = SnippetContext::new(config, uri);
            snippet.run(&ctx).await?;
            info!(snippet = %snippet.name(), "snippet finished");
            Ok(())
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
