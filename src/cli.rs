//! Command-line interface, clap based.

use clap::{Parser, Subcommand};

/// Bloodwork — asynchronous blood-test report analysis service.
#[derive(Debug, Parser)]
#[command(name = "bloodwork", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (defaults to ./bloodwork.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API server.
    Serve {
        /// Override the configured listen port.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_serve_subcommand() {
        let cli = Cli::parse_from(["bloodwork", "serve"]);
        match cli.command {
            Command::Serve { port } => assert!(port.is_none()),
        }
    }

    #[test]
    fn cli_parses_port_and_config_flags() {
        let cli = Cli::parse_from(["bloodwork", "--config", "custom.toml", "serve", "--port", "9001"]);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        match cli.command {
            Command::Serve { port } => assert_eq!(port, Some(9001)),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
