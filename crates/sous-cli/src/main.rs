//! sous - terminal client for the recipe assistant

mod config;
mod render;
mod utils;

use clap::Parser;
use futures::StreamExt;
use sous_chat::{Attachment, HttpTransport, StreamEvent, StreamingResponseClient, Turn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use render::Output;

/// sous - talk to your recipe assistant
#[derive(Parser, Debug)]
#[command(name = "sous")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Send a single message and exit
    #[arg(short, long)]
    message: Option<String>,

    /// Attach a file (usually a photo) to the first message
    #[arg(long)]
    attach: Option<PathBuf>,

    /// Continue an existing conversation
    #[arg(long)]
    thread: Option<String>,

    /// Server base URL (overrides config)
    #[arg(long)]
    server: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Print every event as one JSON line
    #[arg(long)]
    json: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Conversation state owned by the terminal session
struct Session {
    client: StreamingResponseClient,
    conversation_id: Option<String>,
    json: bool,
}

impl Session {
    /// Send one turn and print its events as they arrive
    async fn send(&mut self, text: &str, attachment: Option<Attachment>) -> anyhow::Result<()> {
        let mut turn = Turn::new(text).in_conversation(self.conversation_id.clone());
        if let Some(attachment) = attachment {
            turn = turn.with_attachment(attachment);
        }

        let cancel = CancellationToken::new();
        let mut events = self.client.send_turn_cancellable(turn, cancel.clone())?;

        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(event) = event else { break };
                    self.handle(&event)?;
                }
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    eprintln!("[cancelled]");
                    break;
                }
            }
        }
        Ok(())
    }

    fn handle(&mut self, event: &StreamEvent) -> anyhow::Result<()> {
        if let Some(id) = event.conversation_id() {
            self.conversation_id = Some(id.to_string());
        }

        if self.json {
            println!("{}", render::render_json(event)?);
            return Ok(());
        }

        match render::render(event) {
            Some(Output::Stdout(line)) => println!("{}", line),
            Some(Output::Stderr(line)) => eprintln!("{}", line),
            None => {}
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let filter = if args.verbose {
        EnvFilter::new("sous=debug,sous_chat=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();
    let endpoints = cfg.endpoints(args.server.as_deref());
    tracing::debug!("Using stream endpoint {}", endpoints.stream_url());

    let mut transport = HttpTransport::new(endpoints);
    if let Some(cookie) = &cfg.session_cookie {
        transport = transport.with_header("cookie", cookie)?;
    }

    let mut session = Session {
        client: StreamingResponseClient::new(Arc::new(transport)),
        conversation_id: args.thread,
        json: args.json,
    };

    let mut attachment = match &args.attach {
        Some(path) => Some(utils::load_attachment(path).await?),
        None => None,
    };

    // Non-interactive mode
    if let Some(message) = args.message {
        return session.send(&message, attachment).await;
    }

    run_interactive(&mut session, &mut attachment).await
}

async fn run_interactive(
    session: &mut Session,
    attachment: &mut Option<Attachment>,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if !session.json {
            print!("sous> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input == "/quit" || input == "/exit" {
            break;
        }
        if input.is_empty() && attachment.is_none() {
            continue;
        }

        // The attachment rides along with the first turn only
        if let Err(e) = session.send(input, attachment.take()).await {
            eprintln!("Error: {}", e);
        }
    }
    Ok(())
}
