//! Turn and metrics endpoints.
//!
//! - `POST /answer`  - run one turn through the agent runtime
//! - `GET  /metrics` - process-wide counters snapshot
//! - `GET  /health`  - database readiness (see `health`)

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use supportdesk_agent::runtime::{AgentRuntime, TurnResponse};
use supportdesk_core::domain::turn::Turn;
use supportdesk_core::errors::InterfaceError;
use supportdesk_core::metrics::MetricsSnapshot;
use supportdesk_db::DbPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::health;

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

pub fn router(runtime: Arc<AgentRuntime>, db_pool: DbPool, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/answer", post(answer))
        .route("/metrics", get(metrics))
        .with_state(ApiState { runtime })
        .merge(health::router(db_pool))
        .layer(cors_layer(allowed_origins))
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "skipping allowed origin that is not a valid header value");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub async fn answer(
    State(state): State<ApiState>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<TurnResponse> {
    let correlation_id = Uuid::new_v4().to_string();

    if request.session_id.trim().is_empty() {
        return Err(interface_error(InterfaceError::BadRequest {
            message: "session_id must not be blank".to_string(),
            correlation_id,
        }));
    }

    info!(
        event_name = "api.answer.received",
        correlation_id = %correlation_id,
        session_id = %request.session_id,
        "answer request received"
    );

    let turn = Turn::new(request.session_id, request.message);
    match state.runtime.handle_turn(&turn, &correlation_id).await {
        Ok(response) => Ok(Json(response)),
        Err(turn_error) => {
            error!(
                event_name = "api.answer.failed",
                correlation_id = %correlation_id,
                session_id = %turn.session_id,
                error = %turn_error,
                "turn failed on infrastructure error"
            );
            Err(interface_error(turn_error.into_application().into_interface(correlation_id)))
        }
    }
}

pub async fn metrics(State(state): State<ApiState>) -> Json<MetricsSnapshot> {
    Json(state.runtime.metrics().snapshot())
}

fn interface_error(error: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let (status, error_message) = match &error {
        InterfaceError::BadRequest { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
        InterfaceError::ServiceUnavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, error.user_message().to_string())
        }
    };

    (
        status,
        Json(ApiError { error: error_message, correlation_id: error.correlation_id().to_string() }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{header, Request, StatusCode},
        Json,
    };
    use serde_json::Value;
    use supportdesk_agent::escalation::WebhookEscalator;
    use supportdesk_agent::runtime::{AgentRuntime, ResponseIntent, RetrievalSettings};
    use supportdesk_agent::tools::{AtomicTicketSequence, ToolDispatcher};
    use supportdesk_core::metrics::MetricsRegistry;
    use supportdesk_db::{
        connect_with_settings, migrations, DbPool, InMemoryOrderRepository, SqlDocumentStore,
    };
    use tower::ServiceExt;

    use super::{answer, metrics, router, AnswerRequest, ApiState};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn runtime_for(pool: DbPool) -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime::new(
            Arc::new(SqlDocumentStore::new(pool)),
            ToolDispatcher::new(
                Arc::new(InMemoryOrderRepository::with_fixtures()),
                Arc::new(AtomicTicketSequence::default()),
            ),
            Arc::new(WebhookEscalator::new(None, Duration::from_secs(5)).expect("client")),
            Arc::new(MetricsRegistry::new()),
            RetrievalSettings::default(),
        ))
    }

    fn request(session_id: &str, message: &str) -> Json<AnswerRequest> {
        Json(AnswerRequest { session_id: session_id.to_string(), message: message.to_string() })
    }

    #[tokio::test]
    async fn answer_returns_order_status() {
        let state = ApiState { runtime: runtime_for(setup_pool().await) };

        let Json(response) = answer(State(state.clone()), request("s-1", "What's my order A-123 status?"))
            .await
            .expect("answer should succeed");

        assert_eq!(response.intent, ResponseIntent::OrderStatus);
        assert!(response.text.contains("Shipped"));
        assert!(response.text.contains('2'));

        let Json(snapshot) = metrics(State(state)).await;
        assert_eq!(snapshot.calls_total, 1);
        assert_eq!(snapshot.tool.success, 1);
    }

    #[tokio::test]
    async fn blank_session_is_a_bad_request() {
        let state = ApiState { runtime: runtime_for(setup_pool().await) };

        let (status, Json(error)) =
            answer(State(state), request("  ", "hello")).await.expect_err("blank session");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!error.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn knowledge_base_outage_maps_to_service_unavailable() {
        let pool = setup_pool().await;
        let state = ApiState { runtime: runtime_for(pool.clone()) };
        pool.close().await;

        let (status, Json(error)) = answer(State(state), request("s-1", "what is your refund policy"))
            .await
            .expect_err("closed pool should fail the turn");

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.error, "The service is temporarily unavailable. Please retry shortly.");
        assert_eq!(error.correlation_id.len(), 36);
    }

    #[tokio::test]
    async fn router_serves_answer_with_cors_for_allowed_origin() {
        let pool = setup_pool().await;
        let app = router(runtime_for(pool.clone()), pool, &["http://localhost:5173".to_string()]);

        let response = app
            .oneshot(
                Request::post("/answer")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::from(r#"{"session_id":"s-9","message":"tell me a joke"}"#))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|value| value.as_bytes()),
            Some(&b"http://localhost:5173"[..])
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["intent"], "out_of_scope");
        assert!(payload["tool_result"].is_null());
        assert_eq!(payload["sources"], Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn router_exposes_metrics_and_health() {
        let pool = setup_pool().await;
        let app = router(runtime_for(pool.clone()), pool, &[]);

        let metrics_response = app
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("metrics response");
        assert_eq!(metrics_response.status(), StatusCode::OK);
        let body = to_bytes(metrics_response.into_body(), usize::MAX).await.expect("body");
        let payload: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["calls_total"], 0);
        assert!(payload["latency_ms"]["rag"].is_object());

        let health_response = app
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(health_response.status(), StatusCode::OK);
    }
}
