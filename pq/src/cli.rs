//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pipeq - pipelined command client
#[derive(Parser)]
#[command(
    name = "pq",
    about = "Pipeline JSON commands over one connection and pair every reply with its command",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/pipeq/logs/pq.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Send commands without waiting between them, print replies in order
    Send {
        /// Remote address (overrides config)
        #[arg(short, long)]
        addr: Option<String>,

        /// Read commands from a file, one per line ("-" for stdin)
        #[arg(short, long, value_name = "PATH")]
        file: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Commands as JSON values (bare words are sent as strings)
        values: Vec<String>,
    },

    /// Run a loopback peer that echoes commands back
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Print the effective configuration
    Config,
}

/// Output format for replies
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Parse a command argument: JSON if it parses, otherwise a plain string
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_send() {
        let cli = Cli::parse_from(["pq", "-v", "send", "--addr", "127.0.0.1:1", "1", "hello"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Send {
                addr, values, format, ..
            } => {
                assert_eq!(addr.as_deref(), Some("127.0.0.1:1"));
                assert_eq!(values, vec!["1", "hello"]);
                assert_eq!(format, OutputFormat::Text);
            }
            _ => panic!("Expected Send"),
        }
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("plain".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("table".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"fail":"x"}"#), json!({"fail": "x"}));
        assert_eq!(parse_value("PING"), json!("PING"));
    }
}
