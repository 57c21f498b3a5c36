use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Quote;
use crate::pricing::SavingsOutcome;
use crate::report::money::{format_money, format_percent};

pub const LEAD_SOURCE: &str = "cloud-cost-calculator";

/// Lead as posted to the CRM webhook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadRecord {
    pub lead_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub source: &'static str,
    pub company_name: String,
    pub contact_name: String,
    pub job_title: String,
    pub email: String,
    pub phone: String,
    pub vm_count: i64,
    pub storage_gb: f64,
    pub bandwidth_gb: f64,
    pub current_monthly_spend: f64,
    pub estimated_cost: f64,
    pub monthly_savings: f64,
    pub savings_percent: Option<f64>,
    pub outcome: SavingsOutcome,
    pub currency: String,
}

impl From<&Quote> for LeadRecord {
    fn from(quote: &Quote) -> Self {
        Self {
            lead_id: quote.id,
            submitted_at: quote.created_at,
            source: LEAD_SOURCE,
            company_name: quote.contact.company_name.clone(),
            contact_name: quote.contact.contact_name.clone(),
            job_title: quote.contact.job_title.clone(),
            email: quote.contact.email.clone(),
            phone: quote.contact.phone.clone(),
            vm_count: quote.usage.vm_count,
            storage_gb: quote.usage.storage_gb,
            bandwidth_gb: quote.usage.bandwidth_gb,
            current_monthly_spend: quote.usage.current_monthly_spend,
            estimated_cost: quote.estimate.estimated_cost,
            monthly_savings: quote.estimate.monthly_savings,
            savings_percent: quote.estimate.savings_percent,
            outcome: quote.estimate.outcome,
            currency: quote.currency.clone(),
        }
    }
}

pub fn email_subject(quote: &Quote) -> String {
    format!("New Calculator Lead: {}", quote.contact.company_name)
}

/// Plain-text body of the sales notification email.
pub fn email_body(quote: &Quote, has_attachment: bool) -> String {
    let contact = &quote.contact;
    let usage = &quote.usage;
    let estimate = &quote.estimate;
    let currency = quote.currency.as_str();

    let (amount_label, percent_label) = match estimate.outcome {
        SavingsOutcome::Savings => ("Monthly Savings", "Percentage Savings"),
        SavingsOutcome::Increase => ("Monthly Increase", "Percentage Increase"),
    };
    let percent = estimate
        .savings_percent
        .map(|fraction| format_percent(fraction.abs()))
        .unwrap_or_else(|| "N/A (no current spend provided)".to_string());

    let attachment_note = if has_attachment {
        "The customer's quote PDF is attached to this email."
    } else {
        "The quote PDF could not be generated, figures are listed above."
    };

    let lines = [
        "NEW CALCULATOR LEAD GENERATED".to_string(),
        "=============================".to_string(),
        String::new(),
        "COMPANY INFORMATION:".to_string(),
        format!("Company: {}", contact.company_name),
        format!("Contact: {}", contact.contact_name),
        format!("Job Title: {}", contact.job_title),
        format!("Email: {}", contact.email),
        format!("Phone: {}", contact.phone),
        String::new(),
        "CURRENT INFRASTRUCTURE:".to_string(),
        format!("Virtual Machines: {}", usage.vm_count),
        format!("Storage: {} GB", usage.storage_gb),
        format!("Bandwidth: {} GB", usage.bandwidth_gb),
        format!(
            "Current Monthly Cost: {}",
            format_money(usage.current_monthly_spend, currency)
        ),
        String::new(),
        "ESTIMATE:".to_string(),
        format!(
            "Estimated Monthly Cost: {}",
            format_money(estimate.estimated_cost, currency)
        ),
        format!(
            "{amount_label}: {}",
            format_money(estimate.monthly_savings.abs(), currency)
        ),
        format!("{percent_label}: {percent}"),
        String::new(),
        "FOLLOW-UP ACTION REQUIRED:".to_string(),
        format!(
            "Contact {} at {} within 24 hours.",
            contact.contact_name, contact.email
        ),
        String::new(),
        format!(
            "Generated: {}",
            quote.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!("Quote ID: {}", quote.id),
        String::new(),
        attachment_note.to_string(),
    ];

    let mut body = lines.join("\n");
    body.push('\n');
    body
}
