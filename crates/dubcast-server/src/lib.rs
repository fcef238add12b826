//! HTTP surface of dubcast

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod cors;
mod error;
mod health;
mod origin;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use dubcast_config::Config;
use dubcast_pipeline::Pipeline;
use tower_http::trace::TraceLayer;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the pipeline and its collaborators from configuration
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let pipeline = Pipeline::from_config(config)?;
        Ok(Self::with_pipeline(pipeline))
    }

    /// Serve an already assembled pipeline
    pub fn with_pipeline(pipeline: Arc<Pipeline>) -> Self {
        let config = pipeline.config();
        let listen_address = config
            .server
            .listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let mut app = Router::new();

        if config.server.health.enabled {
            app = app.route(&config.server.health.path, get(health::health_handler));
        }

        let api = Router::new()
            .route("/api/playlist", get(routes::playlist))
            .route("/api/process", post(routes::process))
            .route("/api/process/next-segments", post(routes::next_segments))
            .route("/api/audio-proxy", get(routes::audio_proxy))
            .route("/api/segments/available", post(routes::available))
            .route("/api/segments/{id}/requeue", post(routes::requeue))
            .route("/api/videos/{video}/status", get(routes::status))
            .with_state(Arc::clone(&pipeline));

        app = app.merge(api);
        app = app.layer(TraceLayer::new_for_http());

        if let Some(ref cors_config) = config.server.cors {
            app = app.layer(cors::cors_layer(cors_config));
        }

        Self {
            router: app,
            listen_address,
        }
    }

    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}
