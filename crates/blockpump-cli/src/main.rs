// Blockpump - Block Migration for Content-Addressed Stores
// Copyright (C) 2026 Blockpump Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

mod commands;
mod output;
mod progress;

use anyhow::Result;
use blockpump_observability::{init_tracing, LogFormat};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::{PinCmd, RunCmd};
use std::io;

#[derive(Parser)]
#[command(name = "blockpump")]
#[command(version, about = "Move content-addressed blocks between datastores and nodes")]
#[command(
    long_about = "blockpump copies blocks from a source to a destination in parallel.
An enumerator lists the keys, a collector fetches each payload and a drain writes,
verifies or pins it. Blocks that fail are written to a key file that can seed a retry."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress logs and progress
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format (pretty|compact|json)
    #[arg(long, global = true, value_name = "FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    /// Colored output (always|auto|never)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate blocks from an enumerator/collector pair into a drain
    Run(RunCmd),

    /// Pin the CIDs named by a file of pin-index keys
    Pin(PinCmd),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        let level = if cli.verbose { "debug" } else { "info" };
        init_tracing(cli.log_format, Some(level)).ok();
    }

    match cli.color.as_str() {
        "never" => console::set_colors_enabled(false),
        "always" => console::set_colors_enabled(true),
        "auto" => {}
        _ => {
            output::error(&format!("Invalid color option: {}", cli.color));
            std::process::exit(2);
        }
    }

    let result = match cli.command {
        Commands::Run(cmd) => cmd.execute(cli.quiet).await,
        Commands::Pin(cmd) => cmd.execute(cli.quiet).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "blockpump", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

fn print_version() {
    println!("blockpump {}", env!("CARGO_PKG_VERSION"));
    println!("rust-version: {}", env!("CARGO_PKG_RUST_VERSION"));
    println!("license: {}", env!("CARGO_PKG_LICENSE"));
}
