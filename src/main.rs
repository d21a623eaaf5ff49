//! Protocol server binary.
//!
//! Serves the in-process sandbox engine on `PORT` (default 8080) until
//! ctrl-c. Log verbosity follows `RUST_LOG`.

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bidi_server::{Result, SandboxEngine, Server, ServerOptions};

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "bidi_server=info";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let options = ServerOptions::from_env()?;

    let server = Server::builder()
        .engine(SandboxEngine::new().with_builtin_scripts())
        .options(options)
        .bind()
        .await?;

    info!("Server is listening on port {}", server.port());

    server
        .serve_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
