use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use opentelemetry::KeyValue;
use serde::Serialize;
use tracing::Instrument;

use super::{NotifyChannel, NotifyError, NotifyTarget, NotifyWarning};
use crate::models::Quote;
use crate::report::RenderedDocument;
use crate::telemetry::metrics::{NOTIFICATION_FAILURES, NOTIFICATIONS_SENT};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotifyReport {
    pub sent: Vec<NotifyTarget>,
    pub warnings: Vec<NotifyWarning>,
}

impl NotifyReport {
    pub fn all_sent(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Fans a quote out to every configured channel, one attempt each.
#[derive(Clone)]
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(channels: Vec<Arc<dyn NotifyChannel>>, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    pub fn targets(&self) -> Vec<NotifyTarget> {
        self.channels.iter().map(|channel| channel.target()).collect()
    }

    #[tracing::instrument(
        name = "pipeline_stage notify",
        skip(self, quote, document),
        fields(
            pipeline.stage = "notify",
            quote.id = %quote.id,
            notify.channels = self.channels.len(),
            notify.failures,
        )
    )]
    pub async fn dispatch(
        &self,
        quote: &Quote,
        document: Option<&RenderedDocument>,
    ) -> NotifyReport {
        let sends = self.channels.iter().map(|channel| {
            let target = channel.target();
            let span = tracing::info_span!("notify.send", notify.target = %target);
            async move { (target, self.send_one(channel.as_ref(), quote, document).await) }
                .instrument(span)
        });

        let mut report = NotifyReport::default();
        for (target, result) in join_all(sends).await {
            let target_kv = KeyValue::new("notify.target", target.as_str());
            match result {
                Ok(()) => {
                    tracing::info!(%target, "Lead notification sent");
                    NOTIFICATIONS_SENT.add(1, &[target_kv]);
                    report.sent.push(target);
                }
                Err(err) => {
                    tracing::warn!(%target, error = %err, "Lead notification failed");
                    NOTIFICATION_FAILURES.add(1, &[target_kv]);
                    report.warnings.push(NotifyWarning::from(&err));
                }
            }
        }

        tracing::Span::current().record("notify.failures", report.warnings.len());
        report
    }

    async fn send_one(
        &self,
        channel: &dyn NotifyChannel,
        quote: &Quote,
        document: Option<&RenderedDocument>,
    ) -> Result<(), NotifyError> {
        let target = channel.target();
        match tokio::time::timeout(self.timeout, channel.send(quote, document)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(NotifyError::Failed {
                target,
                message: format!("{err:#}"),
            }),
            Err(_) => Err(NotifyError::Timeout {
                target,
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}
