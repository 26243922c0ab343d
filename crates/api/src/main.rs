use std::env;

use aegis_api::build_app;
use aegis_observability::init_tracing;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("aegis_api");

    let kb_root = env::var("TRIAGE_KB_ROOT").unwrap_or_else(|_| "kb".to_string());
    let bind = env::var("TRIAGE_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = build_app(&kb_root).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, kb_root = %kb_root, "aegis triage api started");

    axum::serve(listener, app).await?;
    Ok(())
}
