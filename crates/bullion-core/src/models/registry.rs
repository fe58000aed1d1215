//! Registry and statement rows with client-side running balances.
//!
//! The API returns ledger rows in arbitrary order with only debit and credit
//! amounts. Statements show them newest first next to the balance as it
//! stood after each row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    #[serde(alias = "transactionDate", alias = "createdAt")]
    pub date: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "voucherNo", alias = "reference_no")]
    pub reference: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub debit: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub credit: f64,
}

impl RegistryEntry {
    /// Parsed timestamp used for chronological ordering.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_entry_date(&self.date)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancedEntry {
    #[serde(flatten)]
    pub entry: RegistryEntry,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatementTotals {
    pub debit: f64,
    pub credit: f64,
    pub balance: f64,
}

/// Sort chronologically, accumulate `debit - credit`, then reverse so the
/// newest row comes first.
///
/// The sort is stable, so rows sharing a timestamp keep their API order.
/// Rows with an unparseable date sort before every dated row.
pub fn running_balances(entries: &[RegistryEntry]) -> Vec<BalancedEntry> {
    let mut sorted: Vec<&RegistryEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.timestamp());

    let mut balance = 0.0;
    let mut balanced: Vec<BalancedEntry> = sorted
        .into_iter()
        .map(|entry| {
            balance += entry.debit - entry.credit;
            BalancedEntry {
                entry: entry.clone(),
                balance,
            }
        })
        .collect();

    balanced.reverse();
    balanced
}

pub fn totals(entries: &[RegistryEntry]) -> StatementTotals {
    let (debit, credit) = entries
        .iter()
        .fold((0.0, 0.0), |(d, c), e| (d + e.debit, c + e.credit));
    StatementTotals {
        debit,
        credit,
        balance: debit - credit,
    }
}

fn parse_entry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Amounts arrive as numbers, numeric strings, or null.
fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Number(f64),
        Text(String),
    }

    match Option::<Amount>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Amount::Number(n)) => Ok(n),
        Some(Amount::Text(s)) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned.parse::<f64>().map_err(serde::de::Error::custom)
        }
    }
}
