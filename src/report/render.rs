use serde::Serialize;

use crate::config::ReportConfig;
use crate::error::AppError;
use crate::models::Quote;
use crate::pricing::SavingsOutcome;
use crate::telemetry::metrics::{DOCUMENTS_RENDERED, RENDER_FAILURES};

use super::money::{format_money, format_percent};
use super::pdf::{Font, PdfDocument, Rgb};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const HEADING: Rgb = Rgb(0.3176, 0.0706, 0.5059);
const SAVINGS: Rgb = Rgb(0.08, 0.64, 0.29);
const INCREASE: Rgb = Rgb(0.91, 0.30, 0.24);

const TITLE_SIZE: f64 = 24.0;
const HEADING_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 12.0;

#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub content_type: &'static str,
    pub size_bytes: usize,
}

impl From<&RenderedDocument> for DocumentInfo {
    fn from(document: &RenderedDocument) -> Self {
        Self {
            filename: document.filename.clone(),
            content_type: document.content_type,
            size_bytes: document.bytes.len(),
        }
    }
}

/// `Cloud_Quote_Acme_Mining.pdf`; anything unsafe in a header value is dropped.
pub fn document_filename(company_name: &str) -> String {
    let stem: String = company_name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' => Some(c),
            _ => None,
        })
        .collect();

    format!("Cloud_Quote_{stem}.pdf")
}

#[tracing::instrument(
    name = "pipeline_stage render",
    skip(quote, config),
    fields(
        pipeline.stage = "render",
        quote.id = %quote.id,
        document.size_bytes,
    )
)]
pub fn render_quote(quote: &Quote, config: &ReportConfig) -> Result<RenderedDocument, AppError> {
    if let Err(err) = check_renderable(quote) {
        RENDER_FAILURES.add(1, &[]);
        return Err(err);
    }

    let bytes = layout(quote, config).to_bytes();

    tracing::Span::current().record("document.size_bytes", bytes.len());
    DOCUMENTS_RENDERED.add(1, &[]);

    Ok(RenderedDocument {
        filename: document_filename(&quote.contact.company_name),
        content_type: PDF_CONTENT_TYPE,
        bytes,
    })
}

fn check_renderable(quote: &Quote) -> Result<(), AppError> {
    let mut missing = Vec::new();
    if quote.contact.company_name.trim().is_empty() {
        missing.push("company_name");
    }
    if quote.contact.contact_name.trim().is_empty() {
        missing.push("contact_name");
    }
    if !missing.is_empty() {
        return Err(AppError::Render(format!(
            "quote is missing required fields: {}",
            missing.join(", ")
        )));
    }

    if !quote.estimate.is_finite() {
        return Err(AppError::Render(
            "quote figures are not finite numbers".to_string(),
        ));
    }

    Ok(())
}

fn layout(quote: &Quote, config: &ReportConfig) -> PdfDocument {
    let currency = quote.currency.as_str();
    let contact = &quote.contact;
    let estimate = &quote.estimate;
    let mut doc = PdfDocument::new();

    doc.line(&config.title, Font::Bold, TITLE_SIZE, HEADING, 36.0);
    doc.line(
        &format!(
            "Quote {} - {}",
            quote.id,
            quote.created_at.format("%Y-%m-%d")
        ),
        Font::Regular,
        10.0,
        Rgb::BLACK,
        14.0,
    );
    doc.gap(18.0);

    heading(&mut doc, "Client Information:");
    body(&mut doc, &format!("Company: {}", contact.company_name));
    if contact.job_title.is_empty() {
        body(&mut doc, &format!("Contact: {}", contact.contact_name));
    } else {
        body(
            &mut doc,
            &format!("Contact: {} ({})", contact.contact_name, contact.job_title),
        );
    }
    body(&mut doc, &format!("Email: {}", contact.email));
    body(&mut doc, &format!("Phone: {}", contact.phone));
    doc.gap(18.0);

    heading(&mut doc, "Current Cloud Costs:");
    body(
        &mut doc,
        &format!(
            "Monthly Cost: {}",
            format_money(quote.usage.current_monthly_spend, currency)
        ),
    );
    doc.gap(18.0);

    heading(&mut doc, "Estimated Costs:");
    for item in &estimate.line_items {
        body(
            &mut doc,
            &format!(
                "{}: {} {} x {} = {}",
                item.kind.label(),
                format_quantity(item.quantity),
                item.kind.unit(),
                format_money(item.unit_rate, currency),
                format_money(item.amount, currency)
            ),
        );
    }
    doc.line(
        &format!(
            "Total Estimated Cost: {}",
            format_money(estimate.estimated_cost, currency)
        ),
        Font::Bold,
        BODY_SIZE,
        Rgb::BLACK,
        18.0,
    );
    doc.gap(18.0);

    heading(&mut doc, "Potential Savings:");
    let (color, amount_label, percent_label) = match estimate.outcome {
        SavingsOutcome::Savings => (SAVINGS, "Monthly Savings", "Percentage Savings"),
        SavingsOutcome::Increase => (INCREASE, "Monthly Increase", "Percentage Increase"),
    };
    let percent = match estimate.savings_percent {
        Some(fraction) => format_percent(fraction.abs()),
        None => "N/A (no current spend provided)".to_string(),
    };
    doc.line(
        &format!(
            "{amount_label}: {}",
            format_money(estimate.monthly_savings.abs(), currency)
        ),
        Font::Regular,
        BODY_SIZE,
        color,
        18.0,
    );
    doc.line(
        &format!("{percent_label}: {percent}"),
        Font::Regular,
        BODY_SIZE,
        color,
        18.0,
    );
    doc.gap(18.0);

    heading(&mut doc, "Next Steps:");
    body(
        &mut doc,
        "Our sales team will contact you within 24 hours to discuss your requirements.",
    );
    doc.gap(6.0);
    for line in &config.footer_lines {
        doc.line(line, Font::Regular, 10.0, Rgb::BLACK, 14.0);
    }

    doc
}

fn heading(doc: &mut PdfDocument, text: &str) {
    doc.line(text, Font::Bold, HEADING_SIZE, HEADING, 22.0);
}

fn body(doc: &mut PdfDocument, text: &str) {
    doc.line(text, Font::Regular, BODY_SIZE, Rgb::BLACK, 18.0);
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{quantity:.0}")
    } else {
        format!("{quantity:.2}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::models::ContactDetails;
    use crate::pricing::{RateCard, Usage, estimate};

    fn report_config() -> ReportConfig {
        ReportConfig {
            title: "Cloud Cost Quote".to_string(),
            currency_symbol: "R".to_string(),
            footer_lines: vec!["sales@cloud.example".to_string()],
        }
    }

    fn quote_for(usage: Usage) -> Quote {
        let rates = RateCard::default();
        Quote {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            contact: ContactDetails {
                company_name: "Acme Mining".to_string(),
                contact_name: "Thandi Nkosi".to_string(),
                job_title: "CTO".to_string(),
                email: "thandi@acme.example".to_string(),
                phone: "+27 11 555 0100".to_string(),
            },
            usage,
            rates,
            currency: "R".to_string(),
            estimate: estimate(&rates, &usage).unwrap(),
        }
    }

    fn reference_quote() -> Quote {
        quote_for(Usage {
            vm_count: 10,
            storage_gb: 500.0,
            bandwidth_gb: 1000.0,
            current_monthly_spend: 2000.0,
        })
    }

    fn rendered_text(quote: &Quote) -> String {
        let document = render_quote(quote, &report_config()).unwrap();
        String::from_utf8_lossy(&document.bytes).into_owned()
    }

    #[test]
    fn test_render_contains_summary_breakdown_and_savings() {
        let text = rendered_text(&reference_quote());

        assert!(text.contains("(Cloud Cost Quote) Tj"));
        assert!(text.contains("(Company: Acme Mining) Tj"));
        assert!(text.contains("(Contact: Thandi Nkosi \\(CTO\\)) Tj"));
        assert!(text.contains("(Monthly Cost: R2,000.00) Tj"));
        assert!(text.contains("(Virtual Machines: 10 VM x R20.00 = R200.00) Tj"));
        assert!(text.contains("(Storage: 500 GB x R0.05 = R25.00) Tj"));
        assert!(text.contains("(Bandwidth: 1000 GB x R0.02 = R20.00) Tj"));
        assert!(text.contains("(Total Estimated Cost: R245.00) Tj"));
        assert!(text.contains("(Monthly Savings: R1,755.00) Tj"));
        assert!(text.contains("(Percentage Savings: 87.75%) Tj"));
        assert!(text.contains("(sales@cloud.example) Tj"));
    }

    #[test]
    fn test_render_labels_increase() {
        let text = rendered_text(&quote_for(Usage {
            vm_count: 10,
            storage_gb: 500.0,
            bandwidth_gb: 1000.0,
            current_monthly_spend: 200.0,
        }));

        assert!(text.contains("(Monthly Increase: R45.00) Tj"));
        assert!(text.contains("(Percentage Increase: 22.50%) Tj"));
        assert!(!text.contains("Monthly Savings"));
    }

    #[test]
    fn test_render_zero_spend_percentage() {
        let text = rendered_text(&quote_for(Usage {
            vm_count: 0,
            storage_gb: 0.0,
            bandwidth_gb: 0.0,
            current_monthly_spend: 0.0,
        }));

        assert!(text.contains("(Percentage Savings: N/A \\(no current spend provided\\)) Tj"));
    }

    #[test]
    fn test_render_document_metadata() {
        let document = render_quote(&reference_quote(), &report_config()).unwrap();

        assert_eq!(document.filename, "Cloud_Quote_Acme_Mining.pdf");
        assert_eq!(document.content_type, "application/pdf");
        assert!(document.bytes.starts_with(b"%PDF-"));

        let info = DocumentInfo::from(&document);
        assert_eq!(info.size_bytes, document.bytes.len());
    }

    #[test]
    fn test_render_missing_fields_is_render_error() {
        let mut quote = reference_quote();
        quote.contact.company_name = " ".to_string();
        quote.contact.contact_name = String::new();

        match render_quote(&quote, &report_config()) {
            Err(AppError::Render(msg)) => {
                assert!(msg.contains("company_name"));
                assert!(msg.contains("contact_name"));
            }
            other => panic!("expected render error, got {other:?}"),
        }
    }

    #[test]
    fn test_render_non_finite_figures_is_render_error() {
        let mut quote = reference_quote();
        quote.estimate.estimated_cost = f64::NAN;

        assert!(matches!(
            render_quote(&quote, &report_config()),
            Err(AppError::Render(_))
        ));
    }

    #[test]
    fn test_document_filename() {
        assert_eq!(document_filename("Acme Mining"), "Cloud_Quote_Acme_Mining.pdf");
        assert_eq!(
            document_filename(" Smith & Sons (Pty) Ltd "),
            "Cloud_Quote_Smith__Sons_Pty_Ltd.pdf"
        );
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(10.0), "10");
        assert_eq!(format_quantity(12.5), "12.50");
    }
}
