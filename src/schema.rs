// Schema adapter: maps each production category's column naming convention
// onto the canonical inspection fields.
//
// Column names are the external compatibility surface. They must match the
// source headers exactly after whitespace trimming.
use crate::error::{QualityError, Result};
use crate::types::{CanonicalTable, InspectionRecord};
use crate::util::{coerce_int, parse_date_safe};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Upper,
    Bottom,
    Outsourcing,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Upper, Category::Bottom, Category::Outsourcing];

    pub fn schema(self) -> &'static CategorySchema {
        match self {
            Category::Upper => &UPPER,
            Category::Bottom => &BOTTOM,
            Category::Outsourcing => &OUTSOURCING,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Upper => "Upper",
            Category::Bottom => "Bottom",
            Category::Outsourcing => "Outsourcing",
        }
    }

    /// Case-insensitive lookup used by the menu and config file.
    pub fn parse(s: &str) -> Option<Category> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s) || (s.eq_ignore_ascii_case("osc") && *c == Category::Outsourcing))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field-name table for one category.
#[derive(Debug)]
pub struct CategorySchema {
    pub category: Category,
    pub subcontractor: &'static str,
    pub year: &'static str,
    pub month: &'static str,
    pub week: &'static str,
    pub model: &'static str,
    pub inspected_qty: &'static str,
    pub reject_qty: &'static str,
    pub return_qty: Option<&'static str>,
    pub target_qty: Option<&'static str>,
    pub date: Option<&'static str>,
    /// Informational columns that are neither mapped nor defect types.
    pub informational: &'static [&'static str],
}

impl CategorySchema {
    /// Columns that must be present in the raw table.
    pub fn required_columns(&self) -> [&'static str; 7] {
        [
            self.subcontractor,
            self.year,
            self.month,
            self.week,
            self.model,
            self.inspected_qty,
            self.reject_qty,
        ]
    }

    /// Declared optional columns, in export order.
    pub fn optional_columns(&self) -> Vec<&'static str> {
        [self.return_qty, self.target_qty, self.date]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Every column that is not a defect type for this category.
    pub fn exclusions(&self) -> &'static HashSet<&'static str> {
        // Every category has an entry; built once for all three.
        &EXCLUSIONS[&self.category]
    }

    pub fn has_returns(&self) -> bool {
        self.return_qty.is_some() && self.target_qty.is_some()
    }
}

static UPPER: CategorySchema = CategorySchema {
    category: Category::Upper,
    subcontractor: "SUBCON",
    year: "YEAR",
    month: "MONTH",
    week: "WEEK",
    model: "MODEL",
    inspected_qty: "RANDOM INSPECTION QTY",
    reject_qty: "REJECT QTY",
    return_qty: None,
    target_qty: Some("INPUT QTY"),
    date: Some("DATE"),
    informational: &["PGSC", "PO", "PASS QTY", "% REJECT", "RESULT", "REMARK"],
};

static BOTTOM: CategorySchema = CategorySchema {
    category: Category::Bottom,
    subcontractor: "Supplier",
    year: "Year",
    month: "Month",
    week: "Weekly",
    model: "Model",
    inspected_qty: "Inspection Qty",
    reject_qty: "Reject Qty",
    return_qty: Some("Return Qty"),
    target_qty: Some("Input Qty"),
    date: Some("Date"),
    informational: &["PO", "Pass Qty", "% Reject", "% Return", "Result", "Remark"],
};

static OUTSOURCING: CategorySchema = CategorySchema {
    category: Category::Outsourcing,
    subcontractor: "Supplier",
    year: "Year",
    month: "Month",
    week: "Week",
    model: "Model",
    inspected_qty: "Inspection Q'ty",
    reject_qty: "Reject Q'ty",
    return_qty: Some("Return Q'ty"),
    target_qty: Some("Target Q'ty"),
    date: Some("Date"),
    informational: &["PO", "Pass Q'ty", "% Reject", "% Return", "Result", "Remark"],
};

static EXCLUSIONS: Lazy<HashMap<Category, HashSet<&'static str>>> = Lazy::new(|| {
    Category::ALL
        .into_iter()
        .map(|c| {
            let s = c.schema();
            let set: HashSet<&'static str> = s
                .required_columns()
                .into_iter()
                .chain(s.optional_columns())
                .chain(s.informational.iter().copied())
                .collect();
            (c, set)
        })
        .collect()
});

/// Headers plus string cells, exactly as read from the source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }
}

/// Map a raw table onto the canonical fields of `schema`.
///
/// Fails only when a required column is absent. Cells are coerced, never
/// validated: unparseable numbers become 0 and negatives pass through.
pub fn canonicalize(raw: &RawTable, schema: &CategorySchema) -> Result<CanonicalTable> {
    let headers: Vec<String> = raw.headers.iter().map(|h| h.trim().to_string()).collect();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let require = |name: &'static str| {
        find(name).ok_or_else(|| QualityError::Schema {
            category: schema.category,
            column: name.to_string(),
        })
    };
    let subcon_idx = require(schema.subcontractor)?;
    let year_idx = require(schema.year)?;
    let month_idx = require(schema.month)?;
    let week_idx = require(schema.week)?;
    let model_idx = require(schema.model)?;
    let inspected_idx = require(schema.inspected_qty)?;
    let reject_idx = require(schema.reject_qty)?;

    let optional = |name: Option<&'static str>| {
        let name = name?;
        let idx = find(name);
        if idx.is_none() {
            warn!(category = %schema.category, column = name, "optional column missing, defaulting to empty");
        }
        idx
    };
    let return_idx = optional(schema.return_qty);
    let target_idx = optional(schema.target_qty);
    let date_idx = optional(schema.date);

    let exclusions = schema.exclusions();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut defect_idx: Vec<usize> = Vec::new();
    let mut defect_columns: Vec<String> = Vec::new();
    for (idx, h) in headers.iter().enumerate() {
        if h.is_empty() || exclusions.contains(h.as_str()) {
            continue;
        }
        if !seen.insert(h.as_str()) {
            debug!(column = %h, "duplicate defect column ignored");
            continue;
        }
        defect_idx.push(idx);
        defect_columns.push(h.clone());
    }

    let mut table = CanonicalTable::new(schema.category, defect_columns);
    table.records.reserve(raw.rows.len());
    for row in &raw.rows {
        let cell = |idx: usize| row.get(idx).map(String::as_str);
        let text = |idx: usize| cell(idx).map(str::trim).unwrap_or("").to_string();
        let num = |idx: Option<usize>| idx.map(|i| coerce_int(cell(i))).unwrap_or(0);

        table.records.push(InspectionRecord {
            subcontractor: text(subcon_idx),
            year: coerce_int(cell(year_idx)),
            month: coerce_int(cell(month_idx)),
            week: coerce_int(cell(week_idx)),
            model: text(model_idx),
            inspected_qty: coerce_int(cell(inspected_idx)),
            reject_qty: coerce_int(cell(reject_idx)),
            return_qty: num(return_idx),
            target_qty: num(target_idx),
            date: date_idx.and_then(|i| parse_date_safe(cell(i))),
            defects: defect_idx.iter().map(|&i| coerce_int(cell(i))).collect(),
        });
    }

    debug!(
        category = %schema.category,
        rows = table.len(),
        defect_types = table.defect_columns.len(),
        "canonicalized table"
    );
    Ok(table)
}
