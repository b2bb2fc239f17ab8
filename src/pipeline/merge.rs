//! Master report merge.

use std::collections::HashSet;

use crate::models::ReportRow;

/// Append `new` to `existing` and drop duplicate natural keys, keeping the
/// last occurrence. Surviving rows keep their relative order.
pub fn merge_report(existing: Vec<ReportRow>, new: Vec<ReportRow>) -> Vec<ReportRow> {
    let rows: Vec<ReportRow> = existing.into_iter().chain(new).collect();

    let keep_reversed: Vec<bool> = {
        let mut seen = HashSet::new();
        rows.iter().rev().map(|row| seen.insert(row.natural_key())).collect()
    };

    let before = rows.len();
    let merged: Vec<ReportRow> = rows
        .into_iter()
        .zip(keep_reversed.into_iter().rev())
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect();

    if merged.len() < before {
        log::debug!("Dropped {} superseded report rows", before - merged.len());
    }
    merged
}
