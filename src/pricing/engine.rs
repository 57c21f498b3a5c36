use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Per-unit monthly rates the estimate is priced with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateCard {
    pub rate_per_vm: f64,
    pub rate_per_gb_storage: f64,
    pub rate_per_gb_bandwidth: f64,
}

impl RateCard {
    pub fn validate(&self) -> Result<(), String> {
        let rates = [
            ("rate_per_vm", self.rate_per_vm),
            ("rate_per_gb_storage", self.rate_per_gb_storage),
            ("rate_per_gb_bandwidth", self.rate_per_gb_bandwidth),
        ];

        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(format!(
                    "{name} must be a non-negative number, got {value}"
                ));
            }
        }

        Ok(())
    }
}

impl Default for RateCard {
    fn default() -> Self {
        Self {
            rate_per_vm: 20.0,
            rate_per_gb_storage: 0.05,
            rate_per_gb_bandwidth: 0.02,
        }
    }
}

/// Resource quantities and current spend as submitted by the prospect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub vm_count: i64,
    pub storage_gb: f64,
    pub bandwidth_gb: f64,
    pub current_monthly_spend: f64,
}

impl Usage {
    /// Every problem with the quantities, in field order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.vm_count < 0 {
            problems.push(format!(
                "vm_count must not be negative, got {}",
                self.vm_count
            ));
        }

        let amounts = [
            ("storage_gb", self.storage_gb),
            ("bandwidth_gb", self.bandwidth_gb),
            ("current_monthly_spend", self.current_monthly_spend),
        ];
        for (name, value) in amounts {
            if !value.is_finite() {
                problems.push(format!("{name} must be a finite number"));
            } else if value < 0.0 {
                problems.push(format!("{name} must not be negative, got {value}"));
            }
        }

        problems
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemKind {
    VirtualMachines,
    Storage,
    Bandwidth,
}

impl LineItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            LineItemKind::VirtualMachines => "Virtual Machines",
            LineItemKind::Storage => "Storage",
            LineItemKind::Bandwidth => "Bandwidth",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            LineItemKind::VirtualMachines => "VM",
            LineItemKind::Storage => "GB",
            LineItemKind::Bandwidth => "GB",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub kind: LineItemKind,
    pub quantity: f64,
    pub unit_rate: f64,
    pub amount: f64,
}

impl LineItem {
    fn new(kind: LineItemKind, quantity: f64, unit_rate: f64) -> Self {
        Self {
            kind,
            quantity,
            unit_rate,
            amount: quantity * unit_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsOutcome {
    Savings,
    Increase,
}

impl SavingsOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingsOutcome::Savings => "savings",
            SavingsOutcome::Increase => "increase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub line_items: Vec<LineItem>,
    pub estimated_cost: f64,
    /// Negative when the estimate exceeds current spend.
    pub monthly_savings: f64,
    /// Fraction of current spend saved; `None` when current spend is zero.
    pub savings_percent: Option<f64>,
    pub outcome: SavingsOutcome,
}

impl Estimate {
    pub fn line_item(&self, kind: LineItemKind) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.kind == kind)
    }

    pub fn is_finite(&self) -> bool {
        self.estimated_cost.is_finite()
            && self.monthly_savings.is_finite()
            && self.savings_percent.is_none_or(f64::is_finite)
            && self.line_items.iter().all(|item| item.amount.is_finite())
    }
}

#[tracing::instrument(
    name = "pipeline_stage pricing",
    skip(rates, usage),
    fields(
        pipeline.stage = "pricing",
        quote.estimated_cost,
        quote.outcome,
    )
)]
pub fn estimate(rates: &RateCard, usage: &Usage) -> Result<Estimate, AppError> {
    let problems = usage.problems();
    if !problems.is_empty() {
        return Err(AppError::InvalidInput(problems.join("; ")));
    }
    rates.validate().map_err(AppError::Internal)?;

    let line_items = vec![
        LineItem::new(
            LineItemKind::VirtualMachines,
            usage.vm_count as f64,
            rates.rate_per_vm,
        ),
        LineItem::new(
            LineItemKind::Storage,
            usage.storage_gb,
            rates.rate_per_gb_storage,
        ),
        LineItem::new(
            LineItemKind::Bandwidth,
            usage.bandwidth_gb,
            rates.rate_per_gb_bandwidth,
        ),
    ];

    let estimated_cost: f64 = line_items.iter().map(|item| item.amount).sum();
    let monthly_savings = usage.current_monthly_spend - estimated_cost;
    let savings_percent = if usage.current_monthly_spend > 0.0 {
        Some(monthly_savings / usage.current_monthly_spend)
    } else {
        None
    };
    let outcome = if monthly_savings >= 0.0 {
        SavingsOutcome::Savings
    } else {
        SavingsOutcome::Increase
    };

    let span = tracing::Span::current();
    span.record("quote.estimated_cost", estimated_cost);
    span.record("quote.outcome", outcome.as_str());

    Ok(Estimate {
        line_items,
        estimated_cost,
        monthly_savings,
        savings_percent,
        outcome,
    })
}
