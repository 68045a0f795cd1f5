// One recomputation pass: filter, then every summary the dashboard shows.
//
// Nothing here is cached. Each call takes the canonical table and the
// caller's selection and returns fresh values, so separate sessions can
// share a table without sharing any aggregation state.
use crate::engine::{
    defect_share, group_rate_by_entity, group_rate_by_period, heatmap_matrix, overall_rate,
    pareto_distribution, top_entities, DEFAULT_TOP_LIMIT,
};
use crate::filter::{apply_filter, FilterOptions};
use crate::schema::Category;
use crate::types::{
    CanonicalTable, EntityField, EntityRate, FilterSelection, HeatmapCell, ParetoRow, PeriodField,
    PeriodRate, QtyField, RateMetric, ShareRow,
};
use serde::Serialize;
use tracing::debug;

/// Reject percentage a subcontractor must stay at or below.
pub const DEFAULT_TARGET_PERCENT: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardOptions {
    pub top_limit: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            top_limit: DEFAULT_TOP_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub category: Category,
    pub selection: FilterSelection,
    pub options: FilterOptions,
    pub row_count: usize,
    pub totals: RateMetric,
    pub monthly_defect: Vec<PeriodRate>,
    pub weekly_defect: Vec<PeriodRate>,
    /// `None` when the category records no returns.
    pub monthly_return: Option<Vec<PeriodRate>>,
    pub weekly_return: Option<Vec<PeriodRate>>,
    pub top_models: Vec<EntityRate>,
    pub pareto: Vec<ParetoRow>,
    pub defect_share: Vec<ShareRow>,
    pub heatmap: Vec<HeatmapCell>,
}

impl Dashboard {
    /// True when the selection matched no rows at all.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }
}

/// Trend series ignore the week filter; a selected week narrows the weekly
/// series to that single entry.
fn trend(
    trend_rows: &CanonicalTable,
    selected_week: Option<i64>,
    numerator: QtyField,
    denominator: QtyField,
) -> (Vec<PeriodRate>, Vec<PeriodRate>) {
    let monthly = group_rate_by_period(trend_rows, PeriodField::Month, numerator, denominator);
    let mut weekly = group_rate_by_period(trend_rows, PeriodField::Week, numerator, denominator);
    if let Some(week) = selected_week {
        weekly.retain(|p| p.period == week);
    }
    (monthly, weekly)
}

pub fn build_dashboard(
    table: &CanonicalTable,
    selection: &FilterSelection,
    options: DashboardOptions,
) -> Dashboard {
    let rows = apply_filter(table, selection);
    let trend_rows = apply_filter(table, &selection.without_week());
    let defect_columns = &rows.defect_columns;

    let (monthly_defect, weekly_defect) =
        trend(&trend_rows, selection.week, QtyField::Reject, QtyField::Inspected);
    let (monthly_return, weekly_return) = if table.category.schema().has_returns() {
        let (m, w) = trend(&trend_rows, selection.week, QtyField::Return, QtyField::Target);
        (Some(m), Some(w))
    } else {
        (None, None)
    };

    let dashboard = Dashboard {
        category: table.category,
        selection: selection.clone(),
        options: FilterOptions::from_table(table),
        row_count: rows.len(),
        totals: overall_rate(&rows, QtyField::Reject, QtyField::Inspected),
        monthly_defect,
        weekly_defect,
        monthly_return,
        weekly_return,
        top_models: top_entities(
            &rows,
            EntityField::Model,
            QtyField::Reject,
            QtyField::Inspected,
            options.top_limit,
        ),
        pareto: pareto_distribution(&rows, defect_columns),
        defect_share: defect_share(&rows, defect_columns),
        heatmap: heatmap_matrix(&rows, defect_columns, QtyField::Inspected),
    };
    debug!(
        category = %dashboard.category,
        rows = dashboard.row_count,
        trend_rows = trend_rows.len(),
        heatmap_cells = dashboard.heatmap.len(),
        "dashboard recomputed"
    );
    dashboard
}

/// Input and reject totals for one production category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: Category,
    pub input_qty: i64,
    pub reject_qty: i64,
    pub reject: RateMetric,
}

/// Totals per category over the rows each table has after `selection`,
/// in the order the tables are given.
pub fn category_overview(tables: &[CanonicalTable], selection: &FilterSelection) -> Vec<CategoryTotals> {
    tables
        .iter()
        .map(|t| {
            let rows = apply_filter(t, selection);
            let reject = overall_rate(&rows, QtyField::Reject, QtyField::Target);
            CategoryTotals {
                category: t.category,
                input_qty: reject.denominator,
                reject_qty: reject.numerator,
                reject,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorecardRow {
    pub subcontractor: String,
    pub reject: RateMetric,
    pub within_target: bool,
}

/// Reject rate against input quantity for every subcontractor in the rows
/// `selection` keeps, in ascending name order, flagged against
/// `target_percent`.
pub fn subcontractor_scorecard(
    table: &CanonicalTable,
    selection: &FilterSelection,
    target_percent: f64,
) -> Vec<ScorecardRow> {
    let rows = apply_filter(table, selection);
    group_rate_by_entity(&rows, EntityField::Subcontractor, QtyField::Reject, QtyField::Target)
        .into_iter()
        .map(|e| ScorecardRow {
            subcontractor: e.entity,
            within_target: e.metric.rate <= target_percent,
            reject: e.metric,
        })
        .collect()
}
