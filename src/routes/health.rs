use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.otel_service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "notify_targets": state.notifier.targets(),
    }))
}
