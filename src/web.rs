use std::net::SocketAddr;
use std::sync::Arc;

use crate::authz::engine::AccessEngine;
use crate::errors::GuardError;
use crate::settings::Settings;

/// Serve the decision API until the process is stopped.
pub async fn serve(settings: &Settings, engine: Arc<AccessEngine>) -> Result<(), GuardError> {
    let addr: SocketAddr = settings
        .listen_addr()
        .parse()
        .map_err(|e| GuardError::Other(format!("bad listen addr: {e}")))?;

    let router = crate::authz::web::router(engine);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Authorization decision API listening");
    tracing::warn!("Rate limiting should be configured at the reverse proxy level for production");

    axum::serve(listener, router).await?;
    Ok(())
}
