use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{Estimate, RateCard, Usage};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContactDetails {
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub job_title: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl ContactDetails {
    pub fn trimmed(&self) -> Self {
        Self {
            company_name: self.company_name.trim().to_string(),
            contact_name: self.contact_name.trim().to_string(),
            job_title: self.job_title.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }

    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let required = [
            ("company_name", &self.company_name),
            ("contact_name", &self.contact_name),
            ("job_title", &self.job_title),
            ("email", &self.email),
            ("phone", &self.phone),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                problems.push(format!("{name} is required"));
            }
        }

        let email = self.email.trim();
        if !email.is_empty() && !email.contains('@') {
            problems.push("email must be a valid email address".to_string());
        }

        problems
    }
}

/// Calculator form submission.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub vm_count: i64,
    #[serde(default)]
    pub storage_gb: f64,
    #[serde(default)]
    pub bandwidth_gb: f64,
    #[serde(default)]
    pub current_monthly_spend: f64,
    #[serde(flatten)]
    pub contact: ContactDetails,
}

impl QuoteRequest {
    pub fn usage(&self) -> Usage {
        Usage {
            vm_count: self.vm_count,
            storage_gb: self.storage_gb,
            bandwidth_gb: self.bandwidth_gb,
            current_monthly_spend: self.current_monthly_spend,
        }
    }

    /// Quantity and contact problems together, so the caller sees them all at once.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = self.usage().problems();
        problems.extend(self.contact.problems());
        problems
    }
}

/// A priced submission. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub contact: ContactDetails,
    pub usage: Usage,
    pub rates: RateCard,
    pub currency: String,
    pub estimate: Estimate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_contact() -> ContactDetails {
        ContactDetails {
            company_name: "Acme Mining".to_string(),
            contact_name: "Thandi Nkosi".to_string(),
            job_title: "CTO".to_string(),
            email: "thandi@acme.example".to_string(),
            phone: "+27 11 555 0100".to_string(),
        }
    }

    #[test]
    fn test_quote_request_deserialize_flat_contact() {
        let request: QuoteRequest = serde_json::from_str(
            r#"{
                "vm_count": 10,
                "storage_gb": 500,
                "bandwidth_gb": 1000.5,
                "current_monthly_spend": 2000,
                "company_name": "Acme Mining",
                "contact_name": "Thandi Nkosi",
                "job_title": "CTO",
                "email": "thandi@acme.example",
                "phone": "+27 11 555 0100"
            }"#,
        )
        .unwrap();

        assert_eq!(request.vm_count, 10);
        assert_eq!(request.storage_gb, 500.0);
        assert_eq!(request.bandwidth_gb, 1000.5);
        assert_eq!(request.contact, valid_contact());
        assert!(request.problems().is_empty());
    }

    #[test]
    fn test_quote_request_missing_fields_default() {
        let request: QuoteRequest = serde_json::from_str("{}").unwrap();

        assert_eq!(request.vm_count, 0);
        assert_eq!(request.current_monthly_spend, 0.0);
        assert_eq!(request.problems().len(), 5);
    }

    #[test]
    fn test_contact_problems() {
        let contact = ContactDetails {
            email: "not-an-email".to_string(),
            phone: "   ".to_string(),
            ..valid_contact()
        };

        assert_eq!(
            contact.problems(),
            vec![
                "phone is required".to_string(),
                "email must be a valid email address".to_string(),
            ]
        );
    }

    #[test]
    fn test_contact_trimmed() {
        let contact = ContactDetails {
            company_name: "  Acme Mining ".to_string(),
            ..valid_contact()
        };

        assert_eq!(contact.trimmed(), valid_contact());
    }

    #[test]
    fn test_request_problems_cover_usage_and_contact() {
        let request = QuoteRequest {
            vm_count: -2,
            storage_gb: 0.0,
            bandwidth_gb: 0.0,
            current_monthly_spend: 0.0,
            contact: ContactDetails {
                company_name: String::new(),
                ..valid_contact()
            },
        };

        let problems = request.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("vm_count"));
        assert_eq!(problems[1], "company_name is required");
    }
}
