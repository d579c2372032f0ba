mod db;
mod feed;
mod ipc;

use std::env;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Logs go to stderr; stdout carries the protocol.
fn initialise_logging() {
    let filter = env::var("RUST_LOG")
        .ok()
        .and_then(|targets| targets.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::default().with_default(LevelFilter::INFO));

    Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_filter(filter),
        )
        .init();
}

/// Sole writer of stdout, so responses and pushed events never interleave
/// mid-line.
async fn write_lines(mut lines: UnboundedReceiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.recv().await {
        let written = async {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await
        };
        if let Err(e) = written.await {
            tracing::error!(error = %e, "stdout closed");
            break;
        }
    }
}

#[tokio::main]
async fn main() {
    initialise_logging();

    let (out, lines) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(lines));
    let mut state = ipc::AppState::new(out.clone());

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "schoolhubd ready");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match stdin.next_line().await {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let reply = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = out.send(reply.to_string());
                continue;
            }
        };

        tracing::debug!(id = %req.id, method = %req.method, "request");
        let resp = ipc::handle_request(&mut state, req).await;
        let _ = out.send(
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string()),
        );
    }

    drop(state);
    drop(out);
    let _ = writer.await;
}
