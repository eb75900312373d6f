use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chatbot_core::{ChatClient, ChatWidget, Config, SubmitOutcome};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "chatbot=info,chatbot_core=info";
const LOG_FILE_NAME: &str = "chatbot.log";

#[derive(Parser)]
#[command(name = "chatbot")]
#[command(about = "Chat bubble widget for a JSON chat backend", version)]
struct Cli {
    /// Chat endpoint URL (overrides the saved configuration)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask {
        /// Message to send
        message: String,
    },
    /// Save the chat endpoint URL as the default
    SetUrl {
        /// Endpoint URL, e.g. http://localhost:8001/chat
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::SetUrl { url }) => {
            init_stderr_logging();
            let path = Config::save_backend_url(&url)?;
            println!("Saved backend URL to {}", path.display());
            Ok(())
        }
        Some(Commands::Ask { message }) => {
            init_stderr_logging();
            let endpoint = resolve_endpoint(cli.backend_url.as_deref())?;
            ask(endpoint, &message).await
        }
        None => {
            let endpoint = resolve_endpoint(cli.backend_url.as_deref())?;
            // Guard flushes buffered log lines when the session ends
            let (log_path, _log_guard) = init_file_logging()?;
            tracing::info!(endpoint = %endpoint, log = %log_path.display(), "starting chat widget");
            run_tui(endpoint).await
        }
    }
}

fn resolve_endpoint(cli_override: Option<&str>) -> Result<String> {
    let config = Config::load().context("Failed to read configuration")?;
    Ok(config.resolve_backend_url(cli_override))
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Non-blocking writer appending to `<log_dir>/chatbot.log`.
fn file_writer(log_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(log_dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// The widget owns the terminal, so interactive sessions log to a file.
fn init_file_logging() -> Result<(PathBuf, WorkerGuard)> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("chatbot-widget");
    let (writer, guard) = file_writer(&log_dir)?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok((log_dir.join(LOG_FILE_NAME), guard))
}

/// One-shot exchange with empty history, printing what the widget would show.
async fn ask(endpoint: String, message: &str) -> Result<()> {
    let mut widget = ChatWidget::new(Some(endpoint));
    let client = ChatClient::new(widget.endpoint());
    widget.set_input(message);

    let Some(outcome) = widget.submit(&client).await else {
        bail!("Message is empty");
    };

    let rendered = widget
        .log()
        .last()
        .map(|msg| msg.content.clone())
        .unwrap_or_default();

    match outcome {
        SubmitOutcome::Replied | SubmitOutcome::NoReply => {
            println!("{}", rendered);
            Ok(())
        }
        SubmitOutcome::Errored => Err(anyhow!("{}", rendered.trim_start_matches("Error: "))),
    }
}

async fn run_tui(endpoint: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(endpoint, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }

    tracing::info!("chat widget closed");
    Ok(())
}
