// src/main.rs
// editbridge - native messaging host entry point.
//
// The browser launches this binary and owns both ends of stdio, so the
// protocol frames are the only bytes that may ever reach stdout;
// everything diagnostic goes to stderr or the configured log file.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use editbridge::config::CONFIG;
use editbridge::session::{Session, SessionOptions};
use editbridge::{editor, protocol};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "editbridge")]
#[command(about = "Native messaging host that hands browser text to an external editor")]
#[command(before_help = concat!("editbridge ", env!("CARGO_PKG_VERSION")))]
#[command(after_help = "License: MIT")]
struct Cli {
    /// Browsers pass the extension origin (and more) as positional
    /// arguments; none of it matters here.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    _ignored: Vec<String>,
}

fn init_logging() -> Result<()> {
    let level = Level::from_str(&CONFIG.log_level).unwrap_or(Level::WARN);

    match CONFIG.log_file() {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

async fn run() -> Result<()> {
    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();

    // Decoding happens before any file I/O; a malformed request must not
    // leave a scratch file behind.
    let request = protocol::read_request(&mut stdin)
        .await
        .context("failed to read browser request")?;

    let program = editor::resolve(request.editor.as_deref())?;
    let command = editor::build_command(program, &request.args);

    let session = Session::new(
        command,
        &request.text,
        request.ext.as_deref(),
        SessionOptions::from_config(&CONFIG),
    )?;

    session.run(&mut stdout).await?;
    info!("session complete");
    Ok(())
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _cli = Cli::parse();

    if let Err(e) = init_logging() {
        eprintln!("editbridge: {e:#}");
        return std::process::ExitCode::FAILURE;
    }

    match run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            // Fatal diagnostics belong on stderr, never on the protocol
            // channel.
            error!("{e:#}");
            eprintln!("editbridge: {e:#}");
            std::process::ExitCode::FAILURE
        }
    }
}
