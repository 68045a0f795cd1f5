use crate::dashboard::ScorecardRow;
use crate::error::Result;
use crate::schema::Category;
use crate::types::{
    CanonicalTable, EntityPreviewRow, EntityRate, HeatmapCell, HeatmapPreviewRow, ParetoPreviewRow,
    ParetoRow, PeriodPreviewRow, PeriodRate, ScorecardPreviewRow, ShareRow,
};
use crate::util::{format_int, format_percent};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Header row of an exported workbook: the category's own column names for
/// the mapped fields, then the defect columns.
pub fn export_headers(table: &CanonicalTable) -> Vec<String> {
    let s = table.category.schema();
    let mut headers: Vec<&str> = vec![s.subcontractor, s.year, s.month, s.week];
    headers.extend(s.date);
    headers.extend([s.model, s.inspected_qty, s.reject_qty]);
    headers.extend(s.return_qty);
    headers.extend(s.target_qty);
    headers
        .into_iter()
        .map(str::to_string)
        .chain(table.defect_columns.iter().cloned())
        .collect()
}

/// Serialize the table as a single-sheet workbook.
///
/// The workbook format is UTF-8 CSV, not xlsx: nothing in the dependency
/// stack writes xlsx, and a CSV sheet opens directly in Excel. The exported
/// file name carries a `.csv` extension to match.
///
/// Values are written as stored; reading the bytes back with the same
/// category gives the same rows and defect columns.
pub fn to_workbook_bytes(table: &CanonicalTable) -> Result<Vec<u8>> {
    let s = table.category.schema();
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(export_headers(table))?;
    for r in &table.records {
        let mut row: Vec<String> = vec![
            r.subcontractor.clone(),
            r.year.to_string(),
            r.month.to_string(),
            r.week.to_string(),
        ];
        if s.date.is_some() {
            row.push(r.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default());
        }
        row.extend([r.model.clone(), r.inspected_qty.to_string(), r.reject_qty.to_string()]);
        if s.return_qty.is_some() {
            row.push(r.return_qty.to_string());
        }
        if s.target_qty.is_some() {
            row.push(r.target_qty.to_string());
        }
        row.extend(r.defects.iter().map(i64::to_string));
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| e.into_error().into())
}

/// File name for an export taken at `now`, e.g. `upper_filtered_20240305_141500.csv`.
pub fn export_file_name(category: Category, now: NaiveDateTime) -> String {
    format!(
        "{}_filtered_{}.csv",
        category.name().to_lowercase(),
        now.format("%Y%m%d_%H%M%S")
    )
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn period_preview(rows: &[PeriodRate]) -> Vec<PeriodPreviewRow> {
    rows.iter()
        .map(|p| PeriodPreviewRow {
            period: p.period,
            numerator: format_int(p.metric.numerator),
            denominator: format_int(p.metric.denominator),
            rate: format_percent(p.metric.rate),
        })
        .collect()
}

pub fn entity_preview(rows: &[EntityRate]) -> Vec<EntityPreviewRow> {
    rows.iter()
        .enumerate()
        .map(|(idx, e)| EntityPreviewRow {
            rank: idx + 1,
            entity: e.entity.clone(),
            numerator: format_int(e.metric.numerator),
            denominator: format_int(e.metric.denominator),
            rate: format_percent(e.metric.rate),
        })
        .collect()
}

/// Pareto rows with each type's own share alongside the running total.
pub fn pareto_preview(pareto: &[ParetoRow], share: &[ShareRow]) -> Vec<ParetoPreviewRow> {
    pareto
        .iter()
        .map(|p| {
            let own = share
                .iter()
                .find(|s| s.defect_type == p.defect_type)
                .map(|s| format_percent(s.percent))
                .unwrap_or_default();
            ParetoPreviewRow {
                defect_type: p.defect_type.clone(),
                count: format_int(p.count),
                share: own,
                cumulative: format_percent(p.cumulative_percent),
            }
        })
        .collect()
}

pub fn heatmap_preview(cells: &[HeatmapCell]) -> Vec<HeatmapPreviewRow> {
    cells
        .iter()
        .map(|c| HeatmapPreviewRow {
            model: c.model.clone(),
            defect_type: c.defect_type.clone(),
            rate: format_percent(c.rate),
        })
        .collect()
}

pub fn scorecard_preview(rows: &[ScorecardRow]) -> Vec<ScorecardPreviewRow> {
    rows.iter()
        .map(|r| ScorecardPreviewRow {
            subcontractor: r.subcontractor.clone(),
            target: format_int(r.reject.denominator),
            reject: format_int(r.reject.numerator),
            actual: format_percent(r.reject.rate),
            status: if r.within_target { "OK".to_string() } else { "Over target".to_string() },
        })
        .collect()
}

/// Markdown table of the first `max_rows` rows, or `(no rows)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::read_raw;
    use crate::schema::{canonicalize, RawTable};
    use crate::types::{InspectionRecord, RateMetric};
    use chrono::NaiveDate;

    fn bottom_table() -> CanonicalTable {
        let mut t = CanonicalTable::new(Category::Bottom, vec!["Dent".into(), "Stain".into()]);
        t.records = vec![InspectionRecord {
            subcontractor: "B, Ltd".into(),
            year: 2024,
            month: 2,
            week: 7,
            model: "X1".into(),
            inspected_qty: 40,
            reject_qty: 3,
            return_qty: 1,
            target_qty: 400,
            date: NaiveDate::from_ymd_opt(2024, 2, 12),
            defects: vec![2, 1],
        }];
        t
    }

    #[test]
    fn headers_use_category_column_names() {
        assert_eq!(
            export_headers(&bottom_table()),
            vec![
                "Supplier", "Year", "Month", "Weekly", "Date", "Model", "Inspection Qty",
                "Reject Qty", "Return Qty", "Input Qty", "Dent", "Stain",
            ]
        );
    }

    #[test]
    fn workbook_reads_back_to_the_same_table() {
        let table = bottom_table();
        let bytes = to_workbook_bytes(&table).unwrap();
        let (raw, blank): (RawTable, usize) = read_raw(bytes.as_slice()).unwrap();
        assert_eq!(blank, 0);
        let back = canonicalize(&raw, Category::Bottom.schema()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn empty_table_exports_header_only() {
        let table = bottom_table().with_records(Vec::new());
        let bytes = to_workbook_bytes(&table).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn export_file_name_is_timestamped() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(14, 15, 0).unwrap();
        assert_eq!(export_file_name(Category::Upper, now), "upper_filtered_20240305_141500.csv");
    }

    #[test]
    fn scorecard_preview_formats_status() {
        let rows = vec![ScorecardRow {
            subcontractor: "S".into(),
            reject: RateMetric::new(50, 1000),
            within_target: false,
        }];
        let preview = scorecard_preview(&rows);
        assert_eq!(preview[0].actual, "5.00%");
        assert_eq!(preview[0].target, "1,000");
        assert_eq!(preview[0].status, "Over target");
    }

    #[test]
    fn render_table_handles_empty_input() {
        let rows: Vec<HeatmapPreviewRow> = Vec::new();
        assert_eq!(render_table(&rows, 5), "(no rows)");
        let rows = heatmap_preview(&[HeatmapCell { model: "M".into(), defect_type: "D".into(), rate: 1.5 }]);
        assert!(render_table(&rows, 5).contains("1.50%"));
    }
}
