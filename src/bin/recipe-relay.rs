#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for running the recipe relay and talking to it

use clap::{Parser, Subcommand};
use recipe_relay::{Config, Dispatcher, Server, send_request};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recipe-relay")]
#[command(
    about = "Relay that mails recipe ingredients and reports recent email"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server
    Serve {
        /// Address to listen on (overrides RELAY_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides RELAY_PORT)
        #[arg(long)]
        port: Option<u16>,

        /// Connections handled at once (overrides RELAY_MAX_CONNECTIONS)
        #[arg(long)]
        max_connections: Option<usize>,
    },

    /// Send one request to a running relay and print the reply
    Request {
        /// Relay host
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Relay port
        #[arg(long, default_value = "65432")]
        port: u16,

        #[command(subcommand)]
        kind: RequestKind,
    },
}

#[derive(Subcommand)]
enum RequestKind {
    /// Mail the ingredients of a recipe to someone
    Recipe {
        /// What to cook (e.g. "pasta")
        food_type: String,

        /// Who receives the ingredient list
        recipient_email: String,
    },

    /// List recent emails from the relay's inbox
    FetchEmails {
        /// IMAP search criterion (server default: UNSEEN)
        #[arg(long)]
        criterion: Option<String>,

        /// Maximum number of emails (server default: 5)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Send a JSON payload exactly as given
    Raw {
        /// Request body
        payload: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Command::Serve {
            host,
            port,
            max_connections,
        } => {
            cmd_serve(host, port, max_connections).await?;
        }
        Command::Request { host, port, kind } => {
            cmd_request(&host, port, &kind).await?;
        }
    }

    Ok(())
}

async fn cmd_serve(
    host: Option<String>,
    port: Option<u16>,
    max_connections: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = Config::from_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(max) = max_connections {
        config.server.max_connections = max;
    }

    let dispatcher = Dispatcher::from_config(&config)?;
    let server = Server::bind(config.server.clone(), dispatcher).await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            trigger.cancel();
        }
    });

    server.run(shutdown).await?;
    Ok(())
}

async fn cmd_request(host: &str, port: u16, kind: &RequestKind) -> anyhow::Result<()> {
    let payload = match kind {
        RequestKind::Recipe {
            food_type,
            recipient_email,
        } => serde_json::to_vec(&json!({
            "type": "recipe",
            "food_type": food_type,
            "recipient_email": recipient_email,
        }))?,
        RequestKind::FetchEmails { criterion, limit } => {
            serde_json::to_vec(&fetch_payload(criterion.as_deref(), *limit))?
        }
        RequestKind::Raw { payload } => payload.clone().into_bytes(),
    };

    let reply = send_request((host, port), &payload).await?;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn fetch_payload(criterion: Option<&str>, limit: Option<usize>) -> Value {
    let mut body = Map::new();
    body.insert("type".to_string(), json!("fetch_emails"));
    if let Some(criterion) = criterion {
        body.insert("criterion".to_string(), json!(criterion));
    }
    if let Some(limit) = limit {
        body.insert("limit".to_string(), json!(limit));
    }
    Value::Object(body)
}
