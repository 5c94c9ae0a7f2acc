use std::net::SocketAddr;

use {
    axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{Method, StatusCode, header},
        response::{IntoResponse, Response},
        routing::{any, get, post},
    },
    tower_http::trace::TraceLayer,
    tracing::{error, info, warn},
};

use {
    unfurler_callback::{CallbackRequest, Dispatcher, ResponseRecorder},
    unfurler_config::{ServerConfig, UnfurlerConfig},
    unfurler_worker::{UnfurlWorker, adapters::pubsub::PushEnvelope},
};

use crate::consumer::spawn_consumer;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub worker: UnfurlWorker,
    /// Queue backend name reported by `/health`.
    pub backend: &'static str,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the router (shared between production startup and tests).
pub fn build_app(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(&server.callback_path, any(callback_handler))
        .route(&server.push_path, post(push_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build every component from `config` and serve until the listener fails.
pub async fn start_gateway(config: UnfurlerConfig) -> anyhow::Result<()> {
    let http = reqwest::Client::new();
    let queue = unfurler_queue::from_config(&config.queue, http.clone())?;
    let backend = queue.publisher.backend();

    let dispatcher = Dispatcher::new(
        config.slack.verification_token.clone(),
        queue.publisher,
    );
    let worker = UnfurlWorker::from_config(&config, http);

    if let Some(consumer) = queue.consumer {
        spawn_consumer(consumer, worker.clone());
    }

    let state = AppState {
        dispatcher,
        worker,
        backend,
    };
    let app = build_app(state, &config.server);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        backend,
        callback_path = %config.server.callback_path,
        push_path = %config.server.push_path,
        "gateway listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "queue": state.backend,
    }))
}

/// Direct-invocation adapter: the request's own method and body go straight
/// to the dispatcher.
async fn callback_handler(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Response {
    let request = CallbackRequest::from_bytes(method.as_str(), &body);
    let mut recorder = ResponseRecorder::new();
    match state.dispatcher.handle(&request, &mut recorder).await {
        Ok(()) => recorder_response(recorder),
        Err(e) => {
            error!(error = %e, "callback failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string(), "code": 500 })),
            )
                .into_response()
        },
    }
}

fn recorder_response(recorder: ResponseRecorder) -> Response {
    let (status, body) = recorder.into_parts();
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let content_type = if body.is_json() {
        "application/json"
    } else {
        "text/plain; charset=utf-8"
    };
    (status, [(header::CONTENT_TYPE, content_type)], body.render()).into_response()
}

/// Pub/Sub push delivery. Any non-2xx answer makes the broker redeliver, so
/// an undecodable body is acknowledged as an empty envelope.
async fn push_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let envelope = serde_json::from_slice::<PushEnvelope>(&body).unwrap_or_else(|e| {
        warn!(error = %e, "undecodable push body, treating as empty");
        PushEnvelope::default()
    });
    let request = unfurler_worker::adapters::pubsub::from_push(&envelope);
    match state.worker.unfurl(&request).await {
        Ok(_) => StatusCode::NO_CONTENT,
        Err(e) => {
            error!(
                message_id = request.message_id_or_unknown(),
                subscription = envelope.subscription.as_deref().unwrap_or_default(),
                error = %e,
                "push delivery failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}
