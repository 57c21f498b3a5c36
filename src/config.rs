use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::pricing::RateCard;

/// Floor for the whole-request HTTP timeout.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Headroom left for pricing and rendering once notifications have timed out.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
    pub rates: RateCard,
    pub price_sheet_path: Option<PathBuf>,
    pub report: ReportConfig,
    pub email: Option<EmailConfig>,
    pub webhook: Option<WebhookConfig>,
    pub notify_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub title: String,
    pub currency_symbol: String,
    pub footer_lines: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpSecurity {
    StartTls,
    Tls,
    None,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "starttls" => Ok(SmtpSecurity::StartTls),
            "tls" => Ok(SmtpSecurity::Tls),
            "none" => Ok(SmtpSecurity::None),
            other => Err(format!("expected starttls, tls or none, got {other:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
    pub from: String,
    pub to: String,
    pub cc: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub token: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = RateCard::default();

        let rates = RateCard {
            rate_per_vm: parse_or(&get, "RATE_PER_VM", defaults.rate_per_vm)?,
            rate_per_gb_storage: parse_or(
                &get,
                "RATE_PER_GB_STORAGE",
                defaults.rate_per_gb_storage,
            )?,
            rate_per_gb_bandwidth: parse_or(
                &get,
                "RATE_PER_GB_BANDWIDTH",
                defaults.rate_per_gb_bandwidth,
            )?,
        };
        rates
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid rate configuration: {msg}"))?;

        let email = match get("SMTP_HOST") {
            Some(host) => Some(EmailConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", 587)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                security: parse_or(&get, "SMTP_TLS", SmtpSecurity::StartTls)?,
                from: get("MAIL_FROM").context("MAIL_FROM must be set when SMTP_HOST is set")?,
                to: get("MAIL_TO").context("MAIL_TO must be set when SMTP_HOST is set")?,
                cc: split_list(get("MAIL_CC"), ','),
            }),
            None => None,
        };

        let notify_timeout_secs: u64 = parse_or(&get, "NOTIFY_TIMEOUT_SECS", 10)?;
        if notify_timeout_secs == 0 {
            anyhow::bail!("NOTIFY_TIMEOUT_SECS must be at least 1");
        }

        let webhook = get("CRM_WEBHOOK_URL").map(|url| WebhookConfig {
            url,
            token: get("CRM_WEBHOOK_TOKEN"),
        });

        Ok(Self {
            port: parse_or(&get, "APP_PORT", 8080)?,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            otel_service_name: get("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "cloud-cost-quote".to_string()),
            otel_exporter_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".to_string()),
            rates,
            price_sheet_path: get("PRICE_SHEET_PATH").map(PathBuf::from),
            report: ReportConfig {
                title: get("REPORT_TITLE").unwrap_or_else(|| "Cloud Cost Quote".to_string()),
                currency_symbol: get("CURRENCY_SYMBOL").unwrap_or_else(|| "R".to_string()),
                footer_lines: split_list(get("REPORT_FOOTER"), '|'),
            },
            email,
            webhook,
            notify_timeout: Duration::from_secs(notify_timeout_secs),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// HTTP timeout for a whole request, always longer than a notification attempt.
    pub fn request_timeout(&self) -> Duration {
        (self.notify_timeout + REQUEST_TIMEOUT_MARGIN).max(MIN_REQUEST_TIMEOUT)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid ({raw:?}): {e}")),
        None => Ok(default),
    }
}

fn split_list(raw: Option<String>, separator: char) -> Vec<String> {
    raw.map(|value| {
        value
            .split(separator)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
