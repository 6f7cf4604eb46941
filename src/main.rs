//! Command-line front end for the resilient client.
//!
//! Sends one request through the full pipeline (retry, offline queue) and
//! prints the response envelope, or inspects and replays the persisted queue.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use resilient_client::config::{load_config, ClientConfig};
use resilient_client::observability::logging::init_logging;
use resilient_client::{JsonEnvelope, Method, RequestDescriptor};

#[derive(Parser)]
#[command(name = "resilient-client")]
#[command(about = "Send API requests with retry and an offline queue", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override api.base_url
    #[arg(short, long)]
    base_url: Option<String>,

    /// Bearer token sent as the Authorization header
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET an endpoint
    Get {
        endpoint: String,
        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
    },
    /// POST a JSON body
    Post {
        endpoint: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// PUT a JSON body
    Put {
        endpoint: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// PATCH a JSON body
    Patch {
        endpoint: String,
        #[arg(long)]
        body: Option<String>,
    },
    /// DELETE an endpoint
    Delete { endpoint: String },
    /// Print the persisted offline queue
    Queue,
    /// Replay the offline queue now
    Drain,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

fn body_request(
    method: Method,
    endpoint: String,
    body: Option<String>,
) -> Result<RequestDescriptor, Box<dyn std::error::Error>> {
    let request = RequestDescriptor::new(method, endpoint);
    match body {
        Some(raw) => Ok(request.with_body(serde_json::from_str::<Value>(&raw)?)),
        None => Ok(request),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    // One-shot invocations replay only on an explicit `drain`.
    config.queue.drain_on_startup = false;

    init_logging(&config.observability);
    tracing::debug!(base_url = %config.api.base_url, "Configuration loaded");

    let runtime = resilient_client::start(&config)?;
    let client = runtime.client.clone();
    if let Some(token) = &cli.token {
        client.set_auth_token(token);
    }

    let request = match cli.command {
        Commands::Get { endpoint, query } => RequestDescriptor::get(endpoint).with_params(query),
        Commands::Post { endpoint, body } => body_request(Method::Post, endpoint, body)?,
        Commands::Put { endpoint, body } => body_request(Method::Put, endpoint, body)?,
        Commands::Patch { endpoint, body } => body_request(Method::Patch, endpoint, body)?,
        Commands::Delete { endpoint } => RequestDescriptor::delete(endpoint),
        Commands::Queue => {
            let entries = client.queue().snapshot();
            println!("{}", serde_json::to_string_pretty(&entries)?);
            runtime.shutdown().await;
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Drain => {
            let report = client.drain().await;
            println!(
                "delivered={} rejected={} requeued={} dropped={} remaining={}",
                report.delivered,
                report.rejected,
                report.requeued,
                report.dropped,
                client.queue().len()
            );
            runtime.shutdown().await;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let envelope: JsonEnvelope = client.request(request).await;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    runtime.shutdown().await;

    Ok(if envelope.is_success() || envelope.is_queued() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
