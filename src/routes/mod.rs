pub mod health;
pub mod quotes;
pub mod rates;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/rates", get(rates::active_rates))
        .route("/api/quotes", post(quotes::create_quote))
        .route("/api/quotes/document", post(quotes::download_quote_document))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::notify::dispatch::tests::RecordingChannel;
    use crate::notify::{NotifyChannel, NotifyTarget, Notifier};
    use crate::pricing::RateCard;

    fn app(rates: RateCard, channels: Vec<Arc<dyn NotifyChannel>>) -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        create_router(AppState {
            config,
            rates,
            notifier: Notifier::new(channels, Duration::from_secs(5)),
        })
    }

    fn reference_request() -> Value {
        json!({
            "vm_count": 10,
            "storage_gb": 500,
            "bandwidth_gb": 1000,
            "current_monthly_spend": 2000,
            "company_name": "Acme Mining",
            "contact_name": "Thandi Nkosi",
            "job_title": "CTO",
            "email": "thandi@acme.example",
            "phone": "+27 11 555 0100"
        })
    }

    async fn post_json(app: Router, uri: &str, body: &Value) -> Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn get_request(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_lists_notify_targets() {
        let email = RecordingChannel::ok(NotifyTarget::Email);
        let response = get_request(app(RateCard::default(), vec![email]), "/api/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "cloud-cost-quote");
        assert_eq!(body["notify_targets"], json!(["email"]));
    }

    #[tokio::test]
    async fn test_rates_reports_active_card() {
        let response = get_request(app(RateCard::default(), Vec::new()), "/api/rates").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["rates"]["rate_per_vm"], 20.0);
        assert_eq!(body["rates"]["rate_per_gb_storage"], 0.05);
        assert_eq!(body["currency"], "R");
    }

    #[tokio::test]
    async fn test_create_quote_reference_figures() {
        let email = RecordingChannel::ok(NotifyTarget::Email);
        let webhook = RecordingChannel::ok(NotifyTarget::CrmWebhook);
        let app = app(RateCard::default(), vec![email.clone(), webhook.clone()]);

        let response = post_json(app, "/api/quotes", &reference_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let estimate = &body["quote"]["estimate"];
        assert!((estimate["estimated_cost"].as_f64().unwrap() - 245.0).abs() < 1e-9);
        assert!((estimate["monthly_savings"].as_f64().unwrap() - 1755.0).abs() < 1e-9);
        assert!((estimate["savings_percent"].as_f64().unwrap() - 0.8775).abs() < 1e-9);
        assert_eq!(estimate["outcome"], "savings");
        assert_eq!(body["document"]["filename"], "Cloud_Quote_Acme_Mining.pdf");
        assert_eq!(body["document"]["content_type"], "application/pdf");
        assert!(body["render_error"].is_null());
        assert_eq!(body["notifications"]["sent"], json!(["email", "crm_webhook"]));
        assert!(email.received.lock().unwrap()[0].1);
        assert_eq!(webhook.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_spend_has_no_savings_percent() {
        let mut request = reference_request();
        request["current_monthly_spend"] = json!(0);

        let app = app(RateCard::default(), Vec::new());
        let response = post_json(app, "/api/quotes", &request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["quote"]["estimate"]["savings_percent"].is_null());
        assert_eq!(body["quote"]["estimate"]["outcome"], "increase");
    }

    #[tokio::test]
    async fn test_negative_input_is_rejected_without_notifying() {
        let email = RecordingChannel::ok(NotifyTarget::Email);
        let webhook = RecordingChannel::ok(NotifyTarget::CrmWebhook);
        let app = app(RateCard::default(), vec![email.clone(), webhook.clone()]);
        let mut request = reference_request();
        request["vm_count"] = json!(-1);
        request["bandwidth_gb"] = json!(-20);

        let response = post_json(app, "/api/quotes", &request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("vm_count"));
        assert!(error.contains("bandwidth_gb"));
        assert_eq!(body["status"], 400);
        assert_eq!(email.calls(), 0);
        assert_eq!(webhook.calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_quantity_is_invalid_input() {
        let email = RecordingChannel::ok(NotifyTarget::Email);
        let mut request = reference_request();
        request["vm_count"] = json!(2.5);

        for uri in ["/api/quotes", "/api/quotes/document"] {
            let app = app(RateCard::default(), vec![email.clone()]);
            let response = post_json(app, uri, &request).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
            let body = json_body(response).await;
            assert_eq!(body["status"], 400);
            assert!(body["error"].as_str().unwrap().contains("expected i64"));
        }
        assert_eq!(email.calls(), 0);
    }

    #[tokio::test]
    async fn test_document_download_rejects_negative_input() {
        let mut request = reference_request();
        request["storage_gb"] = json!(-500);

        let response = post_json(
            app(RateCard::default(), Vec::new()),
            "/api/quotes/document",
            &request,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_ne!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let body = json_body(response).await;
        assert_eq!(body["status"], 400);
        assert!(body["error"].as_str().unwrap().contains("storage_gb"));
    }

    #[tokio::test]
    async fn test_failed_notification_is_a_warning() {
        let webhook = RecordingChannel::failing(NotifyTarget::CrmWebhook, "HTTP 503");
        let app = app(RateCard::default(), vec![webhook]);

        let response = post_json(app, "/api/quotes", &reference_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["document"].is_object());
        assert_eq!(body["notifications"]["sent"], json!([]));
        assert_eq!(body["notifications"]["warnings"][0]["target"], "crm_webhook");
    }

    #[tokio::test]
    async fn test_document_download_is_a_pdf_and_does_not_notify() {
        let email = RecordingChannel::failing(NotifyTarget::Email, "relay down");
        let app = app(RateCard::default(), vec![email.clone()]);

        let response = post_json(app, "/api/quotes/document", &reference_request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Cloud_Quote_Acme_Mining.pdf\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert_eq!(email.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrenderable_figures() {
        let rates = RateCard {
            rate_per_vm: 20.0,
            rate_per_gb_storage: 10.0,
            rate_per_gb_bandwidth: 0.02,
        };
        let mut request = reference_request();
        request["storage_gb"] = json!(1e308);

        let response = post_json(app(rates, Vec::new()), "/api/quotes/document", &request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("not finite"));

        let email = RecordingChannel::ok(NotifyTarget::Email);
        let response = post_json(app(rates, vec![email.clone()]), "/api/quotes", &request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["document"].is_null());
        assert!(body["render_error"].as_str().unwrap().contains("not finite"));
        assert!(!email.received.lock().unwrap()[0].1);
    }
}
