// SPDX-FileCopyrightText: 2026 StroiNadzor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! StroiNadzor - a Telegram assistant for construction-supervision engineers.
//!
//! This is the binary entry point for the nadzor agent.

mod serve;
mod shutdown;

use clap::{Parser, Subcommand};

/// StroiNadzor - a Telegram assistant for construction-supervision engineers.
#[derive(Parser, Debug)]
#[command(name = "nadzor", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the nadzor agent.
    Serve,
    /// Validate the configuration and print a summary.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match nadzor_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            nadzor_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("nadzor serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            println!("configuration is valid");
            println!("  agent.name        = {}", config.agent.name);
            println!("  telegram          = {}", configured(config.telegram.bot_token.as_deref()));
            println!("  claude            = {}", configured(config.claude.api_key.as_deref()));
            println!("  grok              = {}", configured(config.grok.api_key.as_deref()));
            println!("  gemini            = {}", configured(config.gemini.api_key.as_deref()));
            println!("  retrieval.enabled = {}", config.retrieval.enabled);
            println!("  storage.path      = {}", config.storage.database_path);
        }
        None => {
            println!("nadzor: use --help for available commands");
        }
    }
}

fn configured(value: Option<&str>) -> &'static str {
    match value {
        Some(v) if !v.is_empty() => "configured",
        _ => "not configured",
    }
}
