use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;

pub async fn active_rates(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "rates": state.rates,
        "currency": state.config.report.currency_symbol,
    }))
}
