//! # docq CLI
//!
//! ```bash
//! docq serve                         # start the HTTP server
//! docq ask "Who is Nelson Mandela?"  # stream a one-shot completion to stdout
//! ```
//!
//! All commands accept `--config <path>` pointing to a TOML file; without it,
//! documented defaults plus environment overrides apply (see the `config`
//! module docs).

use anyhow::Result;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::path::PathBuf;

use docq::config::load_config;
use docq::registry::ProviderRegistry;
use docq::server;

/// docq — a document question-answering server with streamed answers over
/// local LLM backends.
#[derive(Parser)]
#[command(
    name = "docq",
    about = "Document question-answering with streamed answers over local LLM backends",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Optional; defaults apply without it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Override the bind address from the config.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Stream a completion for a prompt straight from a provider, no session
    /// or document involved. Useful for checking backend connectivity.
    Ask {
        /// The prompt to complete.
        prompt: String,

        /// Backend to use.
        #[arg(long, default_value = "ollama")]
        provider: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::run_server(&config).await
        }
        Commands::Ask { prompt, provider } => {
            let registry = ProviderRegistry::with_builtins();
            let provider = registry.create(&provider, &config)?;

            let mut stream = provider.stream_complete(&prompt).await?;
            let mut stdout = std::io::stdout();
            while let Some(item) = stream.next().await {
                let fragment = item?;
                stdout.write_all(fragment.as_bytes())?;
                stdout.flush()?;
            }
            println!();
            Ok(())
        }
    }
}
