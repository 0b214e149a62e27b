/// HTTP server: spawns axum on a background tokio task.
use std::net::SocketAddr;

use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::api_router;
use crate::state::AppState;

/// Handle to a server started by `spawn_server`.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl RunningServer {
    /// Base URL of the API, e.g. `http://127.0.0.1:5000/api`.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.handle.await {
            log::error!("HTTP server task failed: {}", e);
        }
    }

    /// Wait until the server exits on its own.
    pub async fn wait(self) {
        if let Err(e) = self.handle.await {
            log::error!("HTTP server task failed: {}", e);
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring invalid CORS origin {:?} ({})", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::PUT, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    Router::new()
        .nest("/api", api_router(&state))
        .layer(cors)
        .with_state(state)
}

pub async fn spawn_server(state: AppState) -> Result<RunningServer, std::io::Error> {
    let bind_addr = format!("{}:{}", state.config.bind_address, state.config.port);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let addr = listener.local_addr()?;

    log::info!("HTTP server listening on http://{}", addr);
    log::info!("API ready at http://{}/api", addr);

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.await;
        })
        .await;
        match result {
            Ok(()) => log::info!("HTTP server stopped"),
            Err(e) => log::error!("HTTP server exited with error: {}", e),
        }
    });

    Ok(RunningServer {
        addr,
        shutdown: Some(tx),
        handle,
    })
}
