//! CLI commands for nfl-tracking-api.

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::storage::Database;

#[derive(Parser)]
#[command(name = "nfl-tracking-api")]
#[command(version, about = "NFL player-tracking and play data API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The requested command; no subcommand means `serve`.
    pub fn into_command(self) -> Commands {
        self.command.unwrap_or(Commands::Serve {
            host: None,
            port: None,
        })
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to (defaults to configuration)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (defaults to configuration, then PORT, then 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that the database is reachable with the current configuration
    Ping,
}

/// Open one connection, run a trivial query and close it.
pub async fn run_ping() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let db = Database::new(&config.database);

    eprintln!(
        "Connecting to {}:{} (sslmode {:?})",
        config.database.host,
        config.database.port,
        db.ssl_mode()
    );
    db.ping().await?;
    println!("ok");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_overrides() {
        let cli = Cli::parse_from(["nfl-tracking-api", "serve", "--port", "8080"]);
        match cli.into_command() {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(8080));
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_ping() {
        let cli = Cli::parse_from(["nfl-tracking-api", "ping"]);
        assert!(matches!(cli.into_command(), Commands::Ping));
    }

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::parse_from(["nfl-tracking-api"]);
        match cli.into_command() {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, None);
            }
            _ => panic!("expected serve"),
        }
    }
}
