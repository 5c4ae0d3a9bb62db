use crate::domain::payment::ReceivedPayment;
use crate::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

/// Intake is fire-and-forget: the payment is recorded and queued, and the
/// settlement outcome is only ever observable via the record store or the
/// audit stream.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(payment): Json<ReceivedPayment>,
) -> impl IntoResponse {
    match state.enqueuer.enqueue(payment).await {
        Ok(id) => (
            axum::http::StatusCode::ACCEPTED,
            Json(serde_json::json!({ "id": id })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!("enqueue failed: {err:#}");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "enqueue failed" })),
            )
                .into_response()
        }
    }
}

pub async fn payments_summary(State(state): State<AppState>) -> impl IntoResponse {
    match state.records.summarize().await {
        Ok(summary) => (axum::http::StatusCode::OK, Json(summary)).into_response(),
        Err(err) => {
            tracing::error!("summary failed: {err:#}");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "summary failed" })),
            )
                .into_response()
        }
    }
}

/// Liveness for the external supervisor; `failing: true` would be read as
/// an unhealthy signal.
pub async fn service_health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true, "failing": false }))
}
