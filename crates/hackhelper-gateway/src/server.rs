//! Gateway HTTP server: Axum router, shared state and lifecycle

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tracing::info;

use hackhelper_core::{EvaluationEngine, FallbackClient, GithubClient, IdeaEngine};

use crate::auth::require_token;
use crate::routes;

/// Default upload cap (25 MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<FallbackClient>,
    pub evaluator: EvaluationEngine,
    pub ideas: IdeaEngine,
    pub github: GithubClient,
    pub auth_token: String,
    pub max_upload_bytes: usize,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: AppState,
    bind: SocketAddr,
}

impl GatewayServer {
    /// Create a new gateway server backed by one fallback client
    pub fn new(
        bind: SocketAddr,
        client: Arc<FallbackClient>,
        auth_token: String,
    ) -> anyhow::Result<Self> {
        let state = AppState {
            evaluator: EvaluationEngine::new(client.clone()),
            ideas: IdeaEngine::new(client.clone()),
            client,
            github: GithubClient::new()?,
            auth_token,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            start_time: std::time::Instant::now(),
        };
        Ok(Self { state, bind })
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.state.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_github_client(mut self, github: GithubClient) -> Self {
        self.state.github = github;
        self
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/api/status", get(status_handler))
            .route("/api/evaluate", post(routes::evaluate))
            .route("/api/generate-ideas", post(routes::generate_ideas))
            .route("/api/upload", post(routes::upload))
            .route("/api/github-fetch", post(routes::github_fetch))
            .route_layer(middleware::from_fn_with_state(
                self.state.clone(),
                require_token,
            ));

        // Leave room for multipart framing so oversized files reach the handler's 413
        let body_limit = self.state.max_upload_bytes.saturating_add(64 * 1024);

        Router::new()
            .route("/health", get(routes::health))
            .merge(api)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Start the server (blocks until shutdown)
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Start the server and stop gracefully once `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!(
            "Gateway listening on {} ({} providers)",
            self.bind,
            self.state.client.provider_count()
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Gateway stopped");
        Ok(())
    }

    /// Start the server in the background, returning a handle
    pub fn spawn(self) -> tokio::task::JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    axum::Json(serde_json::json!({
        "status": "ok",
        "providers": state.client.provider_names(),
        "retry_budget": state.client.retry_budget(),
        "uptime_secs": uptime,
    }))
}
