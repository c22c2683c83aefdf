//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use calagent_server::Transport;

/// calagent - calendar availability tools for LLMs
#[derive(Debug, Parser)]
#[command(name = "calagent")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALAGENT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize read-only access to your Google calendars
    Auth {
        /// Run the browser flow even if a usable credential exists
        #[arg(long)]
        force: bool,
    },

    /// Run the MCP tool server in the foreground
    Serve {
        /// Transport to serve on: stdio or http
        #[arg(long, short)]
        transport: Option<Transport>,

        /// HTTP bind host
        #[arg(long)]
        host: Option<String>,

        /// HTTP bind port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ask Gemini a question about your schedule
    Ask {
        /// The question; a sample question is used when omitted
        query: Option<String>,

        /// Gemini model name
        #[arg(long)]
        model: Option<String>,
    },

    /// List conflicting events between two times
    Check {
        /// Start time, ISO 8601 (no offset means UTC)
        start: String,

        /// End time, ISO 8601 (no offset means UTC)
        end: String,
    },

    /// List free slots on a day of the primary calendar
    Free {
        /// Day to inspect, YYYY-MM-DD
        date: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_flags() {
        let cli =
            Cli::try_parse_from(["calagent", "serve", "--transport", "http", "--port", "9000"])
                .unwrap();
        match cli.command {
            Command::Serve {
                transport, port, ..
            } => {
                assert_eq!(transport, Some(Transport::Http));
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["calagent", "serve", "--transport", "sse"]).is_err());
    }

    #[test]
    fn ask_query_is_optional() {
        let cli = Cli::try_parse_from(["calagent", "ask"]).unwrap();
        assert!(matches!(cli.command, Command::Ask { query: None, .. }));

        let cli = Cli::try_parse_from(["calagent", "--debug", "ask", "Am I free?"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Ask { query: Some(ref q), .. } if q == "Am I free?"));
    }

    #[test]
    fn check_needs_two_times() {
        assert!(Cli::try_parse_from(["calagent", "check", "2026-01-26T20:00:00"]).is_err());

        let cli = Cli::try_parse_from([
            "calagent",
            "check",
            "2026-01-26T20:00:00",
            "2026-01-26T21:00:00",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["calagent"]).is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["calagent", "free", "2026-01-26", "--config", "/tmp/c.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
