//! Command-line client for the backend.
//!
//! Builds the full transport stack on top of reqwest and issues one call.
//! Ctrl+C cancels the call through a `CancelToken`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use backend_transport::config::{load_config, TransportConfig};
use backend_transport::http::Method;
use backend_transport::observability::{init_logging, TracingObserver};
use backend_transport::{
    CancelToken, ReqwestTransport, RequestOptions, StaticToken, TransportBuilder,
    TransportError,
};
use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Parser)]
#[command(name = "backend-transport")]
#[command(about = "Talk to the backend through the transport stack", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override backend.base_url.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Bearer token sent with every request.
    #[arg(short, long, env = "BACKEND_TOKEN")]
    token: Option<String>,

    /// Override timeouts.request_secs.
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path and print the JSON response
    Get { path: String },
    /// POST a path with an optional JSON body
    Post {
        path: String,
        #[arg(long)]
        json: Option<String>,
    },
    /// DELETE a path
    Delete { path: String },
    /// GET a path as a stream and print bytes as they arrive
    Stream { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TransportConfig::default(),
    };
    if let Some(base_url) = &cli.base_url {
        config.backend.base_url = base_url.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeouts.request_secs = timeout;
    }

    init_logging(&config.observability);
    tracing::debug!(
        base_url = %config.backend.base_url,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let raw = Arc::new(ReqwestTransport::new(&config.backend.user_agent)?);
    let token = Arc::new(StaticToken::new(cli.token.clone()));
    let transport = TransportBuilder::from_config(raw, &config)?
        .observer(Arc::new(TracingObserver))
        .token_provider(token.clone())
        .refresher(token)
        .build();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, cancelling");
                cancel.cancel(Some("interrupted"));
            }
        });
    }
    let options = RequestOptions::new()
        .timeout(Duration::from_secs(config.timeouts.request_secs))
        .cancel_token(cancel);

    let outcome = match cli.command {
        Commands::Get { path } => transport.get(&path, options).await.map(print_json),
        Commands::Post { path, json } => {
            let options = match json {
                Some(text) => options.json(serde_json::from_str(&text)?),
                None => options,
            };
            transport.post(&path, options).await.map(print_json)
        }
        Commands::Delete { path } => transport.delete(&path, options).await.map(print_json),
        Commands::Stream { path } => stream_to_stdout(&transport, &path, options).await,
    };

    transport.close();

    if let Err(err) = outcome {
        report(&err);
        std::process::exit(1);
    }
    Ok(())
}

fn print_json(value: serde_json::Value) {
    match value {
        serde_json::Value::Null => {}
        serde_json::Value::String(text) => println!("{}", text),
        other => println!(
            "{}",
            serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

async fn stream_to_stdout(
    transport: &backend_transport::Transport,
    path: &str,
    options: RequestOptions,
) -> Result<(), TransportError> {
    let stream = transport.request_stream(Method::GET, path, options).await?;
    let mut stdout = tokio::io::stdout();
    copy_stream(stream, &mut stdout).await
}

/// Write chunks as they arrive. A closed output ends the copy quietly.
async fn copy_stream<S, W>(mut stream: S, out: &mut W) -> Result<(), TransportError>
where
    S: futures_util::Stream<Item = Result<bytes::Bytes, TransportError>> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if let Err(e) = out.write_all(&chunk).await {
            tracing::debug!(error = %e, "Output closed, stopping stream");
            break;
        }
        if let Err(e) = out.flush().await {
            tracing::debug!(error = %e, "Output flush failed, stopping stream");
            break;
        }
    }
    Ok(())
}

fn report(err: &TransportError) {
    match err {
        TransportError::Auth { status_code, .. } => {
            eprintln!("Authentication failed ({}): {}", status_code, err)
        }
        TransportError::NotFound { resource, .. } => eprintln!("Not found: {} ({})", resource, err),
        TransportError::Api {
            status_code, body, ..
        } => {
            eprintln!("Backend error {}: {}", status_code, err);
            if let Some(body) = body {
                eprintln!("Response: {}", body);
            }
        }
        TransportError::Network { is_timeout, .. } => {
            if *is_timeout {
                eprintln!("Timed out: {}", err)
            } else {
                eprintln!("Network error: {}", err)
            }
        }
        TransportError::Cancelled { .. } => eprintln!("{}", err),
    }
}
