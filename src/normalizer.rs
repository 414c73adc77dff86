//! Input validation and cleaning (spec §4.1).
//!
//! Takes a batch of loosely-typed rows and emits a canonical, cleaned
//! transaction stream. Per-row defects never fail the batch: amount
//! parse failures become `0.0` (then get dropped by the `amount > 0`
//! rule below), negative amounts are taken as their absolute value, and
//! an unparseable timestamp drops only the timestamp field, not the
//! row — mirrors the teacher's `validate_amount`/`validate_accounts`
//! field-level checks, but as silent row filtering rather than
//! `Result::Err` accumulation, per spec §7.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// One row as received at the core's input boundary — already
/// column-mapped to the canonical schema by an external caller (spec
/// §6); this module only validates and cleans, it never renames
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTransaction {
    pub source: String,
    pub target: String,
    /// Amount as received — may carry currency punctuation (`$1,000.00`).
    pub amount: String,
    pub timestamp: Option<String>,
}

/// A cleaned transaction: `source != target`, `amount > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanTransaction {
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

fn currency_punctuation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[$,\s]").expect("static pattern is valid"))
}

/// Coerce a raw amount string to a non-negative real. Parse failures
/// become `0.0`; negative values are reflected to their absolute value.
fn parse_amount(raw: &str) -> f64 {
    let stripped = currency_punctuation().replace_all(raw, "");
    let value: f64 = stripped.parse().unwrap_or(0.0);
    value.abs()
}

/// Parse a timestamp leniently; returns `None` (not an error) on any
/// failure, since the row is retained regardless — timestamp is
/// optional per spec §3.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"];
    for fmt in FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(
                date.and_hms_opt(0, 0, 0).expect("midnight is always valid"),
                Utc,
            ));
        }
    }
    None
}

/// Clean a batch of raw rows per spec §4.1. An empty or fully-filtered
/// input yields an empty output — never an error.
pub fn normalize(rows: &[RawTransaction]) -> Vec<CleanTransaction> {
    rows.iter()
        .filter_map(|row| {
            let source = row.source.trim().to_string();
            let target = row.target.trim().to_string();
            let amount = parse_amount(&row.amount);
            if source.is_empty() || target.is_empty() || source == target || amount <= 0.0 {
                return None;
            }
            let timestamp = row.timestamp.as_deref().and_then(parse_timestamp);
            Some(CleanTransaction {
                source,
                target,
                amount,
                timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(source: &str, target: &str, amount: &str, timestamp: Option<&str>) -> RawTransaction {
        RawTransaction {
            source: source.to_string(),
            target: target.to_string(),
            amount: amount.to_string(),
            timestamp: timestamp.map(str::to_string),
        }
    }

    #[test]
    fn trims_whitespace_and_strips_currency_punctuation() {
        let rows = vec![raw("  A ", " B  ", "$1,000.50", None)];
        let cleaned = normalize(&rows);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].source, "A");
        assert_eq!(cleaned[0].target, "B");
        assert_eq!(cleaned[0].amount, 1000.50);
    }

    #[test]
    fn drops_self_loops() {
        let rows = vec![raw("A", "A", "100", None)];
        assert!(normalize(&rows).is_empty());
    }

    #[test]
    fn drops_non_positive_amounts() {
        let rows = vec![raw("A", "B", "0", None), raw("C", "D", "-5", None)];
        // -5 becomes abs(-5) = 5, which is kept; 0 is dropped.
        let cleaned = normalize(&rows);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].source, "C");
        assert_eq!(cleaned[0].amount, 5.0);
    }

    #[test]
    fn unparseable_amount_becomes_zero_and_is_dropped() {
        let rows = vec![raw("A", "B", "not-a-number", None)];
        assert!(normalize(&rows).is_empty());
    }

    #[test]
    fn unparseable_timestamp_drops_field_not_row() {
        let rows = vec![raw("A", "B", "100", Some("not-a-date"))];
        let cleaned = normalize(&rows);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].timestamp, None);
    }

    #[test]
    fn empty_batch_yields_empty_output() {
        assert!(normalize(&[]).is_empty());
    }
}
