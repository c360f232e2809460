//! Gateway HTTP server: LINE webhook and liveness probe on a single port.

use crate::channels::{
    verify_line_signature, ChannelSecret, LineClient, ReplyClient, ReplyResponse, WebhookPayload,
};
use crate::config::Settings;
use crate::llm::{GeminiClient, TextGenerator};
use crate::relay;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::future::join_all;
use std::sync::Arc;

pub const WEBHOOK_PATH: &str = "/api/webhook";
pub const HEALTH_TEXT: &str = "LINE BOT is running!";

/// Shared state for request handlers. Everything here is read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub generator: Arc<dyn TextGenerator>,
    pub replier: Arc<dyn ReplyClient>,
}

impl GatewayState {
    pub fn new(
        settings: Settings,
        generator: Arc<dyn TextGenerator>,
        replier: Arc<dyn ReplyClient>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            generator,
            replier,
        }
    }

    /// State backed by the real Gemini and LINE clients.
    pub fn from_settings(settings: Settings) -> Self {
        let gemini = GeminiClient::new(
            settings.gemini_api_key.clone(),
            &settings.gemini_model,
            settings.gemini_base_url.clone(),
        );
        let line = LineClient::new(
            settings.line_access_token.clone(),
            settings.line_api_base.clone(),
        );
        Self::new(settings, Arc::new(gemini), Arc::new(line))
    }
}

/// Routes: `GET /` (liveness) and `POST /api/webhook` (signature-checked).
pub fn router(state: GatewayState) -> Router {
    let secret = ChannelSecret(Arc::from(state.settings.line_channel_secret.as_str()));
    let webhook_routes = Router::new()
        .route(WEBHOOK_PATH, post(line_webhook))
        .route_layer(middleware::from_fn_with_state(secret, verify_line_signature));
    Router::new()
        .route("/", get(health_http))
        .merge(webhook_routes)
        .with_state(state)
}

pub async fn run_gateway(settings: Settings) -> Result<()> {
    let bind_addr = settings.bind_addr();
    log::info!(
        "relaying LINE text messages to gemini model {}",
        settings.gemini_model
    );
    let app = router(GatewayState::from_settings(settings));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Completes on SIGINT or SIGTERM. In-flight webhook requests are drained by axum.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /api/webhook — body already signature-checked. Handles all events concurrently and
/// answers with one entry per event: null when ignored, the reply acknowledgement otherwise.
/// Any failed reply turns the whole response into an empty 500.
async fn line_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("webhook: invalid JSON body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    log::debug!(
        "webhook: {} event(s) for {}",
        payload.events.len(),
        payload.destination.as_deref().unwrap_or("-")
    );

    let generator = state.generator.as_ref();
    let replier = state.replier.as_ref();
    let error_message = state.settings.error_message.as_str();
    let outcomes = join_all(
        payload
            .events
            .iter()
            .map(|raw| relay::handle_raw_event(generator, replier, error_message, raw)),
    )
    .await;

    let mut results: Vec<Option<ReplyResponse>> = Vec::with_capacity(outcomes.len());
    let mut failed = false;
    for outcome in outcomes {
        match outcome {
            Ok(r) => results.push(r),
            Err(e) => {
                log::error!("webhook: reply failed: {}", e);
                failed = true;
            }
        }
    }
    if failed {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(results).into_response()
}

/// GET / — liveness probe; does not touch configuration or upstreams.
async fn health_http() -> &'static str {
    HEALTH_TEXT
}
