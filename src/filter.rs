// Filter engine: conjunctive exact-match selection over a canonical table.
use crate::types::{CanonicalTable, FilterSelection, InspectionRecord};
use serde::Serialize;
use std::collections::BTreeSet;

/// Whether one record passes every set field of the selection.
pub fn matches(record: &InspectionRecord, selection: &FilterSelection) -> bool {
    if let Some(subcon) = &selection.subcontractor {
        if &record.subcontractor != subcon {
            return false;
        }
    }
    if selection.year.is_some_and(|y| record.year != y) {
        return false;
    }
    if selection.week.is_some_and(|w| record.week != w) {
        return false;
    }
    if selection.date_from.is_some() || selection.date_to.is_some() {
        let Some(date) = record.date else {
            return false;
        };
        if selection.date_from.is_some_and(|from| date < from) {
            return false;
        }
        if selection.date_to.is_some_and(|to| date > to) {
            return false;
        }
    }
    true
}

/// Rows of `table` that pass `selection`, in their original order.
///
/// An empty result is a valid table with the same defect columns.
pub fn apply_filter(table: &CanonicalTable, selection: &FilterSelection) -> CanonicalTable {
    let records = table
        .records
        .iter()
        .filter(|r| matches(r, selection))
        .cloned()
        .collect();
    table.with_records(records)
}

/// Distinct values offered for selection, sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub subcontractors: Vec<String>,
    pub years: Vec<i64>,
    pub weeks: Vec<i64>,
}

impl FilterOptions {
    pub fn from_table(table: &CanonicalTable) -> Self {
        let subcontractors: BTreeSet<&str> =
            table.records.iter().map(|r| r.subcontractor.as_str()).collect();
        let years: BTreeSet<i64> = table.records.iter().map(|r| r.year).collect();
        let weeks: BTreeSet<i64> = table.records.iter().map(|r| r.week).collect();
        Self {
            subcontractors: subcontractors.into_iter().map(str::to_string).collect(),
            years: years.into_iter().collect(),
            weeks: weeks.into_iter().collect(),
        }
    }
}
