//! AuthLatch CLI - run the server or talk to a running one

use anyhow::{bail, Context, Result};
use authlatch_core::{ExpiryMode, LatchConfig};
use authlatch_server::{ClaimRequest, ErrorResponse, MessageResponse};
use clap::{Parser, Subcommand};
use colored::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_URL: &str = "http://localhost:3000/auth";

#[derive(Parser)]
#[command(name = "authlatch")]
#[command(about = "AuthLatch - a shared authorization claim that expires on its own")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the AuthLatch server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides HOST)
        #[arg(long)]
        host: Option<String>,

        /// Claim lifetime in milliseconds (overrides AUTH_TIMEOUT_MS)
        #[arg(long)]
        expiry_ms: Option<u64>,

        /// latest or uncancelled (overrides EXPIRY_MODE)
        #[arg(long)]
        expiry_mode: Option<ExpiryMode>,
    },

    /// Claim authorization under a name
    Claim {
        /// Claimant name
        #[arg(short, long)]
        name: String,

        /// Authorization endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,
    },

    /// Check whether a claim is active
    Status {
        /// Authorization endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Output format (json, text)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Poll until a claim is active
    Wait {
        /// Authorization endpoint
        #[arg(long, default_value = DEFAULT_URL)]
        url: String,

        /// Delay between polls in milliseconds
        #[arg(long, default_value = "1000")]
        interval_ms: u64,

        /// Give up after this many milliseconds (waits forever when omitted)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

/// Body returned by either route
#[derive(Deserialize)]
#[serde(untagged)]
enum Reply {
    Message(MessageResponse),
    Error(ErrorResponse),
}

/// Outcome of a single `GET /auth`
#[derive(Debug, Serialize)]
struct StatusReport {
    authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `serve` installs its own subscriber
    if cli.verbose && !matches!(cli.command, Commands::Serve { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter("authlatch=debug")
            .init();
    }

    let client = reqwest::Client::new();

    let ok = match cli.command {
        Commands::Serve {
            port,
            host,
            expiry_ms,
            expiry_mode,
        } => {
            return serve_command(port, host, expiry_ms, expiry_mode, cli.verbose).await;
        }
        Commands::Claim { name, url } => claim_command(&client, &url, &name).await?,
        Commands::Status { url, format } => status_command(&client, &url, &format).await?,
        Commands::Wait {
            url,
            interval_ms,
            timeout_ms,
        } => wait_command(&client, &url, interval_ms, timeout_ms).await?,
    };

    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

async fn serve_command(
    port: Option<u16>,
    host: Option<String>,
    expiry_ms: Option<u64>,
    expiry_mode: Option<ExpiryMode>,
    verbose: bool,
) -> Result<()> {
    let mut config = LatchConfig::from_env()?;

    if let Some(port) = port {
        config.port = port;
    }
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(ms) = expiry_ms {
        if ms == 0 {
            bail!("--expiry-ms must be greater than zero");
        }
        config.auth_timeout = Duration::from_millis(ms);
    }
    if let Some(mode) = expiry_mode {
        config.expiry_mode = mode;
    }
    config.debug |= verbose;

    authlatch_server::tracing::init_logging(&config)?;
    authlatch_server::run(config).await
}

async fn claim_command(client: &reqwest::Client, url: &str, name: &str) -> Result<bool> {
    println!("{} Claiming authorization as {}...", "→".blue(), name);

    let response = client
        .post(url)
        .json(&ClaimRequest::new(name))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = response.status();
    let message = read_message(response).await;

    if status.is_success() {
        println!("{} {} (expires automatically)", "✓".green(), message);
        Ok(true)
    } else {
        println!("{} Claim failed ({}): {}", "✗".red(), status.as_u16(), message);
        Ok(false)
    }
}

async fn status_command(client: &reqwest::Client, url: &str, format: &str) -> Result<bool> {
    let report = fetch_status(client, url).await;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            if report.authorized {
                println!("{} {}", "✓".green(), "AUTHORIZED".green());
            } else {
                println!("{} {}", "✗".red(), "NOT AUTHORIZED".red());
            }
            println!("{} Endpoint: {}", "▸".blue(), url);
            if let Some(status) = report.status {
                println!("{} HTTP status: {}", "▸".blue(), status);
            }
            println!("{} Message: {}", "▸".blue(), report.message);
        }
    }

    Ok(report.authorized)
}

async fn wait_command(
    client: &reqwest::Client,
    url: &str,
    interval_ms: u64,
    timeout_ms: Option<u64>,
) -> Result<bool> {
    let interval = Duration::from_millis(interval_ms.max(1));
    let timeout = timeout_ms.map(Duration::from_millis);
    let start = Instant::now();

    println!("{} Waiting for authorization at {}...", "→".blue(), url);

    loop {
        let report = fetch_status(client, url).await;
        if report.authorized {
            println!(
                "{} Authorized after {:.1}s",
                "✓".green(),
                start.elapsed().as_secs_f64()
            );
            return Ok(true);
        }
        debug!(status = ?report.status, message = %report.message, "Not authorized yet");

        if let Some(timeout) = timeout {
            if start.elapsed() >= timeout {
                println!(
                    "{} Timed out after {:.1}s: {}",
                    "✗".red(),
                    start.elapsed().as_secs_f64(),
                    report.message
                );
                return Ok(false);
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Only HTTP 200 counts as authorized; transport errors count as not
/// authorized.
async fn fetch_status(client: &reqwest::Client, url: &str) -> StatusReport {
    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            StatusReport {
                authorized: status == reqwest::StatusCode::OK,
                status: Some(status.as_u16()),
                message: read_message(response).await,
            }
        }
        Err(e) => StatusReport {
            authorized: false,
            status: None,
            message: format!("request failed: {}", e),
        },
    }
}

async fn read_message(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<Reply>().await {
        Ok(Reply::Message(body)) => body.message,
        Ok(Reply::Error(body)) => body.error,
        Err(_) => status.to_string(),
    }
}
