use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Quote, QuoteRequest};
use crate::notify::NotifyReport;
use crate::pipeline::{QuoteOutcome, generate_quote, quote_document};
use crate::report::DocumentInfo;
use crate::telemetry::metrics::QUOTES_REJECTED;

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote: Quote,
    pub document: Option<DocumentInfo>,
    pub render_error: Option<String>,
    pub notifications: NotifyReport,
}

impl From<QuoteOutcome> for QuoteResponse {
    fn from(outcome: QuoteOutcome) -> Self {
        Self {
            document: outcome.document.as_ref().map(DocumentInfo::from),
            quote: outcome.quote,
            render_error: outcome.render_error,
            notifications: outcome.notifications,
        }
    }
}

fn request_body(payload: Result<Json<QuoteRequest>, JsonRejection>) -> AppResult<QuoteRequest> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            QUOTES_REJECTED.add(1, &[]);
            Err(AppError::from(rejection))
        }
    }
}

pub async fn create_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> AppResult<Json<QuoteResponse>> {
    let request = request_body(payload)?;
    let outcome = generate_quote(
        &state.rates,
        &state.config.report,
        &state.notifier,
        &request,
    )
    .await?;

    Ok(Json(QuoteResponse::from(outcome)))
}

/// Renders the PDF for download. Sales is not notified from here.
pub async fn download_quote_document(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> AppResult<Response> {
    let request = request_body(payload)?;
    let (quote, document) = quote_document(&state.rates, &state.config.report, &request)?;

    tracing::info!(
        quote.id = %quote.id,
        filename = %document.filename,
        size_bytes = document.bytes.len(),
        "Quote document downloaded"
    );

    let disposition = content_disposition(&document.filename);
    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

fn content_disposition(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("Cloud_Quote_Acme_Mining.pdf"),
            "attachment; filename=\"Cloud_Quote_Acme_Mining.pdf\""
        );
    }
}
