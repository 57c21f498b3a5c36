use std::time::Duration;

use anyhow::Context;

use super::lead::LeadRecord;
use super::{NotifyChannel, NotifyTarget};
use crate::config::WebhookConfig;
use crate::models::Quote;
use crate::report::RenderedDocument;

/// Posts the lead record to a CRM webhook. Only the status code is checked.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build webhook HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait::async_trait]
impl NotifyChannel for WebhookChannel {
    fn target(&self) -> NotifyTarget {
        NotifyTarget::CrmWebhook
    }

    async fn send(
        &self,
        quote: &Quote,
        _document: Option<&RenderedDocument>,
    ) -> anyhow::Result<()> {
        let mut request = self.client.post(&self.url).json(&LeadRecord::from(quote));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.context("webhook request failed")?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("webhook responded with HTTP {}", status.as_u16());
        }

        tracing::debug!(status = status.as_u16(), "Lead accepted by CRM webhook");
        Ok(())
    }
}
