//! API server lifecycle — bind, spawn, graceful shutdown.
//!
//! The service binds to loopback only; exposing it further is a deployment
//! concern (as is authentication).

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ApiServer {
    /// Signal the server to shut down gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }
}

/// Bind the API server on loopback and spawn it in a background task.
/// Port 0 picks an ephemeral port.
pub async fn start_server(ctx: ApiContext, port: u16) -> Result<ApiServer, String> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Cannot bind {addr}: {e}"))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Cannot resolve local address: {e}"))?;

    let router = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!("API server error: {e}");
        }
    });

    tracing::info!(addr = %local_addr, "API server listening");
    Ok(ApiServer {
        local_addr,
        shutdown_tx: Some(shutdown_tx),
        handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::producer::UnconfiguredProducer;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn starts_on_ephemeral_port_and_shuts_down() {
        let conn = open_memory_database().unwrap();
        let ctx = ApiContext::new(Arc::new(Mutex::new(conn)), Arc::new(UnconfiguredProducer));

        let mut server = start_server(ctx, 0).await.unwrap();
        assert_ne!(server.local_addr.port(), 0);
        assert!(server.local_addr.ip().is_loopback());

        server.shutdown();
        server.wait().await;
    }
}
