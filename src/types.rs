use crate::schema::Category;
use crate::util::rate_percent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One inspection row after its category-specific column names have been
/// mapped onto the canonical field set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionRecord {
    pub subcontractor: String,
    pub year: i64,
    pub month: i64,
    pub week: i64,
    pub model: String,
    pub inspected_qty: i64,
    pub reject_qty: i64,
    /// 0 when the category has no return column.
    pub return_qty: i64,
    /// Target / input quantity, 0 when the category has no such column.
    pub target_qty: i64,
    pub date: Option<NaiveDate>,
    /// Defect counts, positionally aligned with `CanonicalTable::defect_columns`.
    pub defects: Vec<i64>,
}

impl InspectionRecord {
    pub fn period(&self, field: PeriodField) -> i64 {
        match field {
            PeriodField::Month => self.month,
            PeriodField::Week => self.week,
        }
    }

    pub fn qty(&self, field: QtyField) -> i64 {
        match field {
            QtyField::Inspected => self.inspected_qty,
            QtyField::Reject => self.reject_qty,
            QtyField::Return => self.return_qty,
            QtyField::Target => self.target_qty,
        }
    }

    pub fn entity(&self, field: EntityField) -> &str {
        match field {
            EntityField::Model => &self.model,
            EntityField::Subcontractor => &self.subcontractor,
        }
    }
}

/// Ordered rows of one category, all sharing the same defect-type columns.
///
/// Tables are never mutated once built; filtering produces a new table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    pub category: Category,
    pub defect_columns: Vec<String>,
    pub records: Vec<InspectionRecord>,
}

impl CanonicalTable {
    pub fn new(category: Category, defect_columns: Vec<String>) -> Self {
        Self {
            category,
            defect_columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Same schema, different rows.
    pub fn with_records(&self, records: Vec<InspectionRecord>) -> Self {
        Self {
            category: self.category,
            defect_columns: self.defect_columns.clone(),
            records,
        }
    }
}

/// Subcontractor / year / week selection. `None` on a field means no filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub subcontractor: Option<String>,
    pub year: Option<i64>,
    pub week: Option<i64>,
    /// Inclusive lower bound on the inspection date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the inspection date.
    pub date_to: Option<NaiveDate>,
}

impl FilterSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn subcontractor(mut self, subcontractor: impl Into<String>) -> Self {
        self.subcontractor = Some(subcontractor.into());
        self
    }

    pub fn year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn week(mut self, week: i64) -> Self {
        self.week = Some(week);
        self
    }

    pub fn date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// The selection with the week cleared, as used by the trend charts.
    pub fn without_week(&self) -> Self {
        Self {
            week: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PeriodField {
    Month,
    Week,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QtyField {
    Inspected,
    Reject,
    Return,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityField {
    Model,
    Subcontractor,
}

/// A numerator / denominator pair with its rounded percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateMetric {
    pub numerator: i64,
    pub denominator: i64,
    pub rate: f64,
}

impl RateMetric {
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            numerator,
            denominator,
            rate: rate_percent(numerator, denominator),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodRate {
    pub period: i64,
    pub metric: RateMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRate {
    pub entity: String,
    pub metric: RateMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoRow {
    pub defect_type: String,
    pub count: i64,
    pub cumulative_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub defect_type: String,
    pub count: i64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub model: String,
    pub defect_type: String,
    pub rate: f64,
}

// Console preview rows. Values are pre-formatted strings, like the CSV
// reports they sit next to.

#[derive(Debug, Tabled, Clone)]
pub struct PeriodPreviewRow {
    #[tabled(rename = "Period")]
    pub period: i64,
    #[tabled(rename = "Numerator")]
    pub numerator: String,
    #[tabled(rename = "Denominator")]
    pub denominator: String,
    #[tabled(rename = "Rate")]
    pub rate: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct EntityPreviewRow {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "Model")]
    pub entity: String,
    #[tabled(rename = "Reject")]
    pub numerator: String,
    #[tabled(rename = "Inspected")]
    pub denominator: String,
    #[tabled(rename = "DefectRate")]
    pub rate: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ParetoPreviewRow {
    #[tabled(rename = "DefectType")]
    pub defect_type: String,
    #[tabled(rename = "Count")]
    pub count: String,
    #[tabled(rename = "Share")]
    pub share: String,
    #[tabled(rename = "Cumulative")]
    pub cumulative: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct HeatmapPreviewRow {
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "DefectType")]
    pub defect_type: String,
    #[tabled(rename = "DefectRate")]
    pub rate: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ScorecardPreviewRow {
    #[tabled(rename = "Subcon")]
    pub subcontractor: String,
    #[tabled(rename = "Input")]
    pub target: String,
    #[tabled(rename = "Reject")]
    pub reject: String,
    #[tabled(rename = "Actual")]
    pub actual: String,
    #[tabled(rename = "Status")]
    pub status: String,
}
