//! Crate-level error type.
//!
//! Per-row defects (bad amount, self-loop, unparseable timestamp) and
//! per-detector failures are not represented here — they are absorbed
//! silently by the stage that owns them. `AnalysisError` only covers
//! the batch being rejected before the core ever runs, and the one
//! fatal internal-invariant case that aborts a batch in progress.

use thiserror::Error;

/// Errors that can surface from [`crate::AnalysisEngine::analyze`].
///
/// The core takes already-structured [`crate::normalizer::RawTransaction`]
/// records, not tabular text, so "missing column" rejection happens one
/// layer up (the CLI's CSV deserialization, or any other caller that
/// turns tabular input into `RawTransaction`s) and never reaches here.
/// The only way the core itself refuses to return a result is a fatal
/// internal-invariant violation (§7): everything else — bad amounts,
/// self-loops, PageRank non-convergence, Louvain failure, oversized
/// SCCs — is absorbed by the stage that owns it and never escapes as
/// an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}
