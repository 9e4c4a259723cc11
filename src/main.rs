//! routeman demo server.
//!
//! Loads an optional TOML config, installs logging, registers a handful of
//! example routes and serves until Ctrl+C or SIGTERM.
//!
//! ```text
//! GET  /                   → greeting
//! GET  /echo/@message      → the message, as text
//! GET  /users/@id/@field   → {"id": .., "field": ..}
//! POST /echo               → parsed fields and upload metadata, as JSON
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use routeman::config::{load_config, RouterConfig};
use routeman::http::UploadedFile;
use routeman::lifecycle::shutdown_signal;
use routeman::observability::logging;
use routeman::{HandlerResult, RouteData, RouteError, Router, Routes};

#[derive(Parser)]
#[command(name = "routeman")]
#[command(about = "Demo server for the routeman HTTP router", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen on 0.0.0.0:<PORT> instead of the configured bind address.
    #[arg(short, long)]
    port: Option<u16>,

    /// Log registrations, resolutions and parsed payloads.
    #[arg(short, long)]
    verbose: bool,
}

struct DemoRoutes;

impl Routes for DemoRoutes {
    fn register(self, router: &mut Router) -> Result<(), RouteError> {
        router
            .get("/", index)?
            .get("/echo/@message", echo_message)?
            .get("/users/@id/@field", user_field)?
            .post("/echo", echo_body)?;
        Ok(())
    }
}

async fn index(data: RouteData) -> HandlerResult {
    data.response.send("routeman is running");
    Ok(())
}

async fn echo_message(data: RouteData) -> HandlerResult {
    let message = data.fields.get("message").unwrap_or_default().to_string();
    data.response.send(message);
    Ok(())
}

async fn user_field(data: RouteData) -> HandlerResult {
    let body = json!({
        "id": data.fields.get("id"),
        "field": data.fields.get("field"),
    });
    data.response.send(body);
    Ok(())
}

async fn echo_body(data: RouteData) -> HandlerResult {
    let files: Vec<serde_json::Value> = data
        .files
        .iter()
        .flatten()
        .map(|file: &UploadedFile| {
            json!({
                "field": file.field_name,
                "name": file.file_name,
                "content_type": file.content_type,
                "size": file.size(),
            })
        })
        .collect();

    data.response.send_json(&json!({
        "request_id": data.request_id,
        "fields": data.fields,
        "files": files,
    }))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };
    config.verbose |= cli.verbose;

    logging::init(&config.logging.level)?;

    tracing::info!("routeman v{} starting", env!("CARGO_PKG_VERSION"));

    let addr: SocketAddr = match cli.port {
        Some(port) => SocketAddr::from(([0, 0, 0, 0], port)),
        None => config.listener.bind_address.parse()?,
    };

    tracing::info!(
        bind_address = %addr,
        verbose = config.verbose,
        on_conflict = ?config.on_conflict,
        max_body_bytes = config.body.max_bytes,
        headers = config.headers.len(),
        "Configuration loaded"
    );

    let mut router = Router::from_config(&config)?;
    router.mount(DemoRoutes)?;

    let listener = TcpListener::bind(addr).await?;
    router.serve(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
