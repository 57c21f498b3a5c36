pub mod dispatch;
pub mod email;
pub mod lead;
pub mod webhook;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::Quote;
use crate::report::RenderedDocument;

pub use dispatch::{Notifier, NotifyReport};
pub use email::EmailChannel;
pub use webhook::WebhookChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyTarget {
    Email,
    CrmWebhook,
}

impl NotifyTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyTarget::Email => "email",
            NotifyTarget::CrmWebhook => "crm_webhook",
        }
    }
}

impl fmt::Display for NotifyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed delivery. Never fatal to the request that triggered it.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{target} notification timed out after {timeout_secs}s")]
    Timeout { target: NotifyTarget, timeout_secs: u64 },

    #[error("{target} notification failed: {message}")]
    Failed {
        target: NotifyTarget,
        message: String,
    },
}

impl NotifyError {
    pub fn target(&self) -> NotifyTarget {
        match self {
            NotifyError::Timeout { target, .. } | NotifyError::Failed { target, .. } => *target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotifyWarning {
    pub target: NotifyTarget,
    pub message: String,
}

impl From<&NotifyError> for NotifyWarning {
    fn from(err: &NotifyError) -> Self {
        Self {
            target: err.target(),
            message: err.to_string(),
        }
    }
}

/// One outbound destination for a lead.
#[async_trait::async_trait]
pub trait NotifyChannel: Send + Sync {
    fn target(&self) -> NotifyTarget;

    /// `document` is `None` when rendering failed; the lead is still sent.
    async fn send(
        &self,
        quote: &Quote,
        document: Option<&RenderedDocument>,
    ) -> anyhow::Result<()>;
}
