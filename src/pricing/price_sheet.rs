//! Rate card loading from a channel-partner price sheet exported as CSV.
//!
//! The export carries a few preamble rows before the real header, so the
//! header is located by looking for the `Description` and `Unit Monthly`
//! columns rather than assumed to be on the first line.

use std::path::Path;

use anyhow::Context;

use super::engine::RateCard;

const DESCRIPTION_COLUMN: &str = "Description";
const UNIT_MONTHLY_COLUMN: &str = "Unit Monthly";

const VM_KEYWORDS: &[&str] = &[
    "virtual",
    "data centre",
    "vdc",
    "vm",
    "resource pool",
    "allocation",
];
const STORAGE_KEYWORDS: &[&str] = &["storage", "nvme", "ssd", "vstorage"];
const BANDWIDTH_KEYWORDS: &[&str] = &[
    "bandwidth",
    "internet",
    "connectivity",
    "mbps",
    "network",
];

const GB_PER_TB: f64 = 1024.0;
/// A GB-labelled storage price at or above this is still a per-TB price.
const MAX_PER_GB_PRICE: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
struct PriceRow {
    description: String,
    unit_monthly: f64,
}

/// Which sheet row, if any, each rate was taken from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMatches {
    pub vm: Option<String>,
    pub storage: Option<String>,
    pub bandwidth: Option<String>,
}

pub fn load_rate_card(path: &Path, defaults: &RateCard) -> anyhow::Result<RateCard> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read price sheet {}", path.display()))?;

    let (rates, matches) = parse_rate_card(&decode_latin1(&raw), defaults)?;

    tracing::info!(
        path = %path.display(),
        rate_per_vm = rates.rate_per_vm,
        rate_per_gb_storage = rates.rate_per_gb_storage,
        rate_per_gb_bandwidth = rates.rate_per_gb_bandwidth,
        vm_row = ?matches.vm,
        storage_row = ?matches.storage,
        bandwidth_row = ?matches.bandwidth,
        "Loaded rate card from price sheet"
    );

    Ok(rates)
}

/// Sheet rates when a readable sheet is configured, `defaults` otherwise.
pub fn resolve_rate_card(path: Option<&Path>, defaults: &RateCard) -> RateCard {
    let Some(path) = path else {
        return *defaults;
    };

    match load_rate_card(path, defaults) {
        Ok(rates) => rates,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %format!("{err:#}"),
                "Price sheet unusable, using configured rates"
            );
            *defaults
        }
    }
}

/// Resolve a rate card from sheet contents, keeping `defaults` for any rate
/// the sheet doesn't price.
pub fn parse_rate_card(
    contents: &str,
    defaults: &RateCard,
) -> anyhow::Result<(RateCard, SheetMatches)> {
    let rows = read_price_rows(contents)?;
    let mut matches = SheetMatches::default();

    let rate_per_vm = match find_row(&rows, VM_KEYWORDS) {
        Some(row) => {
            matches.vm = Some(row.description.clone());
            coerce_rate(row.unit_monthly, defaults.rate_per_vm)
        }
        None => {
            tracing::warn!("No VM pricing in price sheet, using default rate");
            defaults.rate_per_vm
        }
    };

    let rate_per_gb_storage = match find_row(&rows, STORAGE_KEYWORDS) {
        Some(row) => {
            matches.storage = Some(row.description.clone());
            let price = if prices_per_gigabyte(&row.description, row.unit_monthly) {
                row.unit_monthly
            } else {
                row.unit_monthly / GB_PER_TB
            };
            coerce_rate(price, defaults.rate_per_gb_storage)
        }
        None => {
            tracing::warn!("No storage pricing in price sheet, using default rate");
            defaults.rate_per_gb_storage
        }
    };

    let rate_per_gb_bandwidth = match find_row(&rows, BANDWIDTH_KEYWORDS) {
        Some(row) => {
            matches.bandwidth = Some(row.description.clone());
            coerce_rate(row.unit_monthly, defaults.rate_per_gb_bandwidth)
        }
        None => {
            tracing::warn!("No bandwidth pricing in price sheet, using default rate");
            defaults.rate_per_gb_bandwidth
        }
    };

    Ok((
        RateCard {
            rate_per_vm,
            rate_per_gb_storage,
            rate_per_gb_bandwidth,
        },
        matches,
    ))
}

fn read_price_rows(contents: &str) -> anyhow::Result<Vec<PriceRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(contents.as_bytes());

    let mut columns: Option<(usize, usize)> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        // Malformed lines are skipped, the export is hand-edited.
        let Ok(record) = record else {
            continue;
        };

        let Some((description_idx, unit_idx)) = columns else {
            let position = |name: &str| record.iter().position(|field| field.trim() == name);
            if let (Some(description_idx), Some(unit_idx)) =
                (position(DESCRIPTION_COLUMN), position(UNIT_MONTHLY_COLUMN))
            {
                columns = Some((description_idx, unit_idx));
            }
            continue;
        };

        let description = record.get(description_idx).map(str::trim).unwrap_or("");
        if description.is_empty() {
            continue;
        }
        let Some(unit_monthly) = record.get(unit_idx).and_then(parse_amount) else {
            continue;
        };

        rows.push(PriceRow {
            description: description.to_string(),
            unit_monthly,
        });
    }

    if columns.is_none() {
        anyhow::bail!(
            "price sheet has no header row with '{DESCRIPTION_COLUMN}' and '{UNIT_MONTHLY_COLUMN}' columns"
        );
    }

    Ok(rows)
}

fn find_row<'a>(rows: &'a [PriceRow], keywords: &[&str]) -> Option<&'a PriceRow> {
    rows.iter().find(|row| {
        let description = row.description.to_lowercase();
        keywords.iter().any(|keyword| description.contains(keyword))
    })
}

/// Storage is priced per TB unless the row says GB and the price is per-GB sized.
fn prices_per_gigabyte(description: &str, price: f64) -> bool {
    description.to_uppercase().contains("GB") && price < MAX_PER_GB_PRICE
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches(['R', '$'])
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();

    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn coerce_rate(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        tracing::warn!(value, default, "Unusable rate in price sheet, using default");
        default
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}
