//! Determinism checking for propagation.
//!
//! A pass carries no state between calls, so computing flows twice over the
//! same inputs must produce byte-identical reports.

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::graph::GraphSnapshot;
use crate::propagate::compute_flows;
use crate::report::{FlowReport, ReportError};

/// Run propagation twice and compare the encoded reports. Returns the first
/// report when they match.
pub fn validate_idempotence(
    catalog: &Catalog,
    snapshot: &GraphSnapshot,
    config: &EngineConfig,
) -> Result<FlowReport, IdempotenceError> {
    let first = compute_flows(catalog, snapshot, config);
    let second = compute_flows(catalog, snapshot, config);
    let (a, b) = (first.to_bytes()?, second.to_bytes()?);

    if a != b {
        let offset = a
            .iter()
            .zip(&b)
            .position(|(x, y)| x != y)
            .unwrap_or(a.len().min(b.len()));
        return Err(IdempotenceError::Diverged {
            offset,
            first_len: a.len(),
            second_len: b.len(),
        });
    }
    Ok(first)
}

#[derive(Debug, thiserror::Error)]
pub enum IdempotenceError {
    #[error(transparent)]
    Encode(#[from] ReportError),
    #[error("reports differ at byte {offset} ({first_len} vs {second_len} bytes)")]
    Diverged {
        offset: usize,
        first_len: usize,
        second_len: usize,
    },
}
