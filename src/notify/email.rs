use std::time::Duration;

use anyhow::Context;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::lead::{email_body, email_subject};
use super::{NotifyChannel, NotifyTarget};
use crate::config::{EmailConfig, SmtpSecurity};
use crate::models::Quote;
use crate::report::RenderedDocument;

/// Sales inbox notification over SMTP, with the quote PDF attached.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    cc: Vec<Mailbox>,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig, timeout: Duration) -> anyhow::Result<Self> {
        let builder = match config.security {
            SmtpSecurity::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .with_context(|| format!("invalid SMTP relay {}", config.host))?
            }
            SmtpSecurity::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .with_context(|| format!("invalid SMTP relay {}", config.host))?,
            SmtpSecurity::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        let mut builder = builder.port(config.port).timeout(Some(timeout));
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&config.from, "MAIL_FROM")?,
            to: parse_mailbox(&config.to, "MAIL_TO")?,
            cc: config
                .cc
                .iter()
                .map(|address| parse_mailbox(address, "MAIL_CC"))
                .collect::<anyhow::Result<_>>()?,
        })
    }

    pub fn build_message(
        &self,
        quote: &Quote,
        document: Option<&RenderedDocument>,
    ) -> anyhow::Result<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(email_subject(quote));
        for cc in &self.cc {
            builder = builder.cc(cc.clone());
        }

        let text = SinglePart::plain(email_body(quote, document.is_some()));
        let message = match document {
            Some(document) => {
                let content_type = ContentType::parse(document.content_type)
                    .context("invalid attachment content type")?;
                let attachment = Attachment::new(document.filename.clone())
                    .body(document.bytes.clone(), content_type);
                builder.multipart(MultiPart::mixed().singlepart(text).singlepart(attachment))
            }
            None => builder.singlepart(text),
        };

        message.context("failed to build lead email")
    }
}

#[async_trait::async_trait]
impl NotifyChannel for EmailChannel {
    fn target(&self) -> NotifyTarget {
        NotifyTarget::Email
    }

    async fn send(
        &self,
        quote: &Quote,
        document: Option<&RenderedDocument>,
    ) -> anyhow::Result<()> {
        let message = self.build_message(quote, document)?;
        self.transport
            .send(message)
            .await
            .context("SMTP send failed")?;

        tracing::debug!(
            to = %self.to,
            cc_count = self.cc.len(),
            attachment = document.is_some(),
            "Lead email accepted by relay"
        );

        Ok(())
    }
}

fn parse_mailbox(raw: &str, setting: &str) -> anyhow::Result<Mailbox> {
    raw.parse::<Mailbox>()
        .with_context(|| format!("{setting} is not a valid address: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::dispatch::tests::sample_quote;
    use crate::report::PDF_CONTENT_TYPE;

    fn email_config() -> EmailConfig {
        EmailConfig {
            host: "localhost".to_string(),
            port: 2525,
            username: None,
            password: None,
            security: SmtpSecurity::None,
            from: "Quote Calculator <calculator@cloud.example>".to_string(),
            to: "sales@cloud.example".to_string(),
            cc: vec!["sarah@cloud.example".to_string()],
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    #[tokio::test]
    async fn test_message_headers_and_attachment() {
        let channel = EmailChannel::new(&email_config(), Duration::from_secs(5)).unwrap();
        let document = RenderedDocument {
            filename: "Cloud_Quote_Acme_Mining.pdf".to_string(),
            content_type: PDF_CONTENT_TYPE,
            bytes: b"%PDF-1.4 test".to_vec(),
        };

        let message = channel
            .build_message(&sample_quote(), Some(&document))
            .unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("Subject: New Calculator Lead: Acme Mining"));
        assert!(raw.contains("To: sales@cloud.example"));
        assert!(raw.contains("Cc: sarah@cloud.example"));
        assert!(raw.contains("Cloud_Quote_Acme_Mining.pdf"));
        assert!(raw.contains("application/pdf"));

        let recipients = message.envelope().to();
        assert_eq!(recipients.len(), 2);
    }

    #[tokio::test]
    async fn test_message_without_document_is_plain_text() {
        let channel = EmailChannel::new(&email_config(), Duration::from_secs(5)).unwrap();

        let message = channel.build_message(&sample_quote(), None).unwrap();
        let raw = formatted(&message);

        assert!(!raw.contains("application/pdf"));
        assert!(raw.contains("text/plain"));
    }

    #[tokio::test]
    async fn test_invalid_address_is_rejected() {
        let config = EmailConfig {
            to: "not an address".to_string(),
            ..email_config()
        };

        let err = EmailChannel::new(&config, Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(err.to_string().contains("MAIL_TO"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = EmailConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..email_config()
        };
        let channel = EmailChannel::new(&config, Duration::from_secs(2)).unwrap();

        let result = channel.send(&sample_quote(), None).await;

        assert!(result.is_err());
    }
}
