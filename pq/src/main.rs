//! pipeq - pipelined command client
//!
//! CLI entry point for sending pipelined commands and running the loopback peer.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tokio::net::TcpListener;
use tracing::info;

use pipeq::cli::{Cli, Command, OutputFormat, parse_value};
use pipeq::codec::{Encoder, JsonLineCodec, WireReply};
use pipeq::config::Config;
use pipeq::connection::Connection;
use pipeq::error::CommandError;
use pipeq::peer;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pipeq")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("pq.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(address = %config.connection.address, "pq loaded config");

    match cli.command {
        Command::Send {
            addr,
            file,
            format,
            values,
        } => cmd_send(&config, addr, file, format, values).await,
        Command::Serve { addr } => cmd_serve(&config, addr).await,
        Command::Config => cmd_config(&config),
    }
}

/// Pipeline every command, then print replies in submission order
async fn cmd_send(
    config: &Config,
    addr: Option<String>,
    file: Option<PathBuf>,
    format: OutputFormat,
    mut values: Vec<String>,
) -> Result<()> {
    match file.as_deref() {
        Some(path) if path == Path::new("-") => values.extend(read_lines(std::io::stdin().lock())?),
        Some(path) => {
            let reader = fs::File::open(path).context(format!("Failed to open {}", path.display()))?;
            values.extend(read_lines(BufReader::new(reader))?);
        }
        None if values.is_empty() => values.extend(read_lines(std::io::stdin().lock())?),
        None => {}
    }
    if values.is_empty() {
        return Err(eyre!("No commands to send"));
    }

    let mut conn_config = config.connection.clone();
    if let Some(addr) = addr {
        conn_config.address = addr;
    }

    let conn = Connection::open(&conn_config, &config.coordinator)
        .await
        .context(format!("Failed to connect to {}", conn_config.address))?;
    let handle = conn.handle();
    let codec = JsonLineCodec::new(conn_config.max_frame_size);

    // Submit everything before awaiting anything
    let mut submissions = Vec::with_capacity(values.len());
    for raw in &values {
        let command = codec
            .encode(&parse_value(raw))
            .context(format!("Failed to encode command: {}", raw))?;
        submissions.push(handle.submit(command).await);
    }
    info!(count = submissions.len(), "Submitted commands");

    let mut connection_failed = false;
    for (index, submission) in submissions.into_iter().enumerate() {
        let outcome = match submission {
            Ok(submitted) => submitted.reply.await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome
            && !e.is_recoverable()
        {
            connection_failed = true;
        }
        print_outcome(index + 1, &outcome, &format)?;
    }

    if let Err(e) = conn.close().await {
        tracing::warn!("Failed to close connection cleanly: {}", e);
    }

    if connection_failed {
        return Err(eyre!("Connection failed before every reply arrived"));
    }
    Ok(())
}

fn read_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read command line")?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn print_outcome(index: usize, outcome: &Result<WireReply, CommandError>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let line = match outcome {
                Ok(WireReply::Ok { value }) => serde_json::json!({"index": index, "status": "ok", "value": value}),
                Ok(WireReply::Error { message }) => {
                    serde_json::json!({"index": index, "status": "error", "message": message})
                }
                Err(CommandError::Application(e)) => {
                    serde_json::json!({"index": index, "status": "error", "message": e.message})
                }
                Err(e) => serde_json::json!({"index": index, "status": "failed", "message": e.to_string()}),
            };
            println!("{}", serde_json::to_string(&line)?);
        }
        OutputFormat::Text => match outcome {
            Ok(reply) => {
                let value = reply.clone().into_value().unwrap_or_default();
                println!("{:>4}  {}  {}", index, "ok".green(), value);
            }
            Err(CommandError::Application(e)) => println!("{:>4}  {}  {}", index, "error".yellow(), e),
            Err(e) => println!("{:>4}  {}  {}", index, "failed".red(), e),
        },
    }
    Ok(())
}

/// Run the loopback peer until interrupted
async fn cmd_serve(config: &Config, addr: Option<String>) -> Result<()> {
    let addr = addr.unwrap_or_else(|| config.connection.address.clone());
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;

    println!("Listening on {}", listener.local_addr()?);
    tokio::select! {
        result = peer::serve(listener) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping peer");
            Ok(())
        }
    }
}

fn cmd_config(config: &Config) -> Result<()> {
    print!("{}", config.to_yaml()?);
    Ok(())
}
