//! HTTP server assembly.

use anyhow::Result;

use crate::api::{AppState, router};

/// Serve the authentication API on the given bind address,
/// e.g. `127.0.0.1:8080` or `0.0.0.0:8080`.
pub async fn start_http(state: AppState, bind: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;

    tracing::info!("gateward listening on http://{}", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
