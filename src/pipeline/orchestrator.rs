use chrono::Utc;
use opentelemetry::KeyValue;
use uuid::Uuid;

use crate::config::ReportConfig;
use crate::error::AppError;
use crate::models::{Quote, QuoteRequest};
use crate::notify::{Notifier, NotifyReport};
use crate::pricing::{self, RateCard};
use crate::report::{RenderedDocument, render_quote};
use crate::telemetry::metrics::{QUOTE_ESTIMATED_COST, QUOTES_GENERATED, QUOTES_REJECTED};

#[derive(Debug)]
pub struct QuoteOutcome {
    pub quote: Quote,
    pub document: Option<RenderedDocument>,
    pub render_error: Option<String>,
    pub notifications: NotifyReport,
}

/// Validates the submission and prices it. Nothing downstream runs on error.
#[tracing::instrument(
    name = "pipeline_stage validate",
    skip(request, rates),
    fields(pipeline.stage = "validate", quote.id)
)]
pub fn price_quote(
    request: &QuoteRequest,
    rates: &RateCard,
    currency: &str,
) -> Result<Quote, AppError> {
    let problems = request.problems();
    if !problems.is_empty() {
        QUOTES_REJECTED.add(1, &[]);
        return Err(AppError::InvalidInput(problems.join("; ")));
    }

    let usage = request.usage();
    let estimate = pricing::estimate(rates, &usage)?;

    let quote = Quote {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        contact: request.contact.trimmed(),
        usage,
        rates: *rates,
        currency: currency.to_string(),
        estimate,
    };

    tracing::Span::current().record("quote.id", quote.id.to_string());
    QUOTES_GENERATED.add(
        1,
        &[KeyValue::new("quote.outcome", quote.estimate.outcome.as_str())],
    );
    QUOTE_ESTIMATED_COST.record(quote.estimate.estimated_cost, &[]);

    Ok(quote)
}

/// Full submission: price, render, then notify sales.
///
/// A render failure is reported in the outcome rather than returned, so the
/// computed figures still reach the caller and the lead is still forwarded.
#[tracing::instrument(
    name = "pipeline quote",
    skip(rates, report_config, notifier, request),
    fields(
        quote.id,
        quote.rendered,
        quote.notify_warnings,
    )
)]
pub async fn generate_quote(
    rates: &RateCard,
    report_config: &ReportConfig,
    notifier: &Notifier,
    request: &QuoteRequest,
) -> Result<QuoteOutcome, AppError> {
    let quote = price_quote(request, rates, &report_config.currency_symbol)?;

    let span = tracing::Span::current();
    span.record("quote.id", quote.id.to_string());

    let (document, render_error) = match render_quote(&quote, report_config) {
        Ok(document) => (Some(document), None),
        Err(err) => {
            tracing::warn!(quote.id = %quote.id, error = %err, "Quote document not rendered");
            (None, Some(err.to_string()))
        }
    };
    span.record("quote.rendered", document.is_some());

    let notifications = notifier.dispatch(&quote, document.as_ref()).await;
    span.record("quote.notify_warnings", notifications.warnings.len());

    tracing::info!(
        quote.id = %quote.id,
        estimated_cost = quote.estimate.estimated_cost,
        monthly_savings = quote.estimate.monthly_savings,
        notified = notifications.sent.len(),
        "Quote generated"
    );

    Ok(QuoteOutcome {
        quote,
        document,
        render_error,
        notifications,
    })
}

/// Download path: price and render only, never notifies.
pub fn quote_document(
    rates: &RateCard,
    report_config: &ReportConfig,
    request: &QuoteRequest,
) -> Result<(Quote, RenderedDocument), AppError> {
    let quote = price_quote(request, rates, &report_config.currency_symbol)?;
    let document = render_quote(&quote, report_config)?;
    Ok((quote, document))
}
