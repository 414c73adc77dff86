//! Dataset Statistics (spec §4.7): Benford's Law deviation and the
//! structuring percentage, both computed once over the whole cleaned
//! transaction stream rather than per account.
//!
//! Grounded on `examples/original_source/backend/logic.py`'s Benford
//! block (leading-digit histogram gated on `len(first_digits) > 100`),
//! generalized from that source's simplified single-digit check to the
//! full nine-digit chi-square-style deviation statistic spec.md §4.7
//! specifies.

use crate::normalizer::CleanTransaction;

const BENFORD_MIN_SAMPLE: usize = 100;
const STRUCTURING_LOW: f64 = 8_000.0;
const STRUCTURING_HIGH: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenfordStatus {
    Suspicious,
    SlightDeviation,
    Normal,
}

impl BenfordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BenfordStatus::Suspicious => "Suspicious",
            BenfordStatus::SlightDeviation => "Slight deviation",
            BenfordStatus::Normal => "Normal",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStatistics {
    /// `0.0` when the sample is too small to be defined (spec §4.7).
    pub benford_deviation: f64,
    pub benford_status: BenfordStatus,
    pub structuring_pct: f64,
    pub structured_txn_count: u64,
}

/// Expected Benford frequency for leading digit `d` (1..=9).
fn benford_expected(d: u32) -> f64 {
    (1.0 + 1.0 / d as f64).log10()
}

fn leading_digit(amount: f64) -> Option<u32> {
    let truncated = amount.floor();
    if truncated < 1.0 {
        return None;
    }
    let mut n = truncated as u64;
    while n >= 10 {
        n /= 10;
    }
    if n == 0 {
        None
    } else {
        Some(n as u32)
    }
}

fn benford_deviation(transactions: &[CleanTransaction]) -> (f64, BenfordStatus) {
    let eligible: Vec<u32> = transactions
        .iter()
        .filter(|t| t.amount >= 1.0)
        .filter_map(|t| leading_digit(t.amount))
        .collect();

    if eligible.len() < BENFORD_MIN_SAMPLE {
        return (0.0, BenfordStatus::Normal);
    }

    let total = eligible.len() as f64;
    let mut counts = [0u64; 10];
    for digit in &eligible {
        counts[*digit as usize] += 1;
    }

    let chi_square: f64 = (1..=9)
        .map(|d| {
            let empirical = counts[d as usize] as f64 / total;
            let expected = benford_expected(d);
            (empirical - expected).powi(2) / expected
        })
        .sum();

    let rounded = (chi_square * 10_000.0).round() / 10_000.0;
    let status = if rounded > 0.05 {
        BenfordStatus::Suspicious
    } else if rounded > 0.02 {
        BenfordStatus::SlightDeviation
    } else {
        BenfordStatus::Normal
    };
    (rounded, status)
}

fn structuring(transactions: &[CleanTransaction]) -> (f64, u64) {
    if transactions.is_empty() {
        return (0.0, 0);
    }
    let count = transactions
        .iter()
        .filter(|t| t.amount >= STRUCTURING_LOW && t.amount < STRUCTURING_HIGH)
        .count() as u64;
    let pct = count as f64 / transactions.len() as f64 * 100.0;
    let rounded = (pct * 10.0).round() / 10.0;
    (rounded, count)
}

/// Compute both dataset-wide statistics over the cleaned stream (spec
/// §4.7). Called once per batch, after normalization and before result
/// assembly.
pub fn compute(transactions: &[CleanTransaction]) -> DatasetStatistics {
    let (benford_deviation, benford_status) = benford_deviation(transactions);
    let (structuring_pct, structured_txn_count) = structuring(transactions);
    DatasetStatistics {
        benford_deviation,
        benford_status,
        structuring_pct,
        structured_txn_count,
    }
}
