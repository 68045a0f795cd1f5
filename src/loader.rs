use crate::error::Result;
use crate::schema::{canonicalize, Category, RawTable};
use crate::types::CanonicalTable;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub category: Category,
    pub total_rows: usize,
    pub blank_rows: usize,
    pub loaded_rows: usize,
    pub defect_types: usize,
}

/// Read a CSV source wholesale into a `RawTable`.
///
/// Rows may be ragged; short rows read as missing cells. Rows whose cells
/// are all blank are dropped and counted in the returned value.
pub fn read_raw<R: Read>(source: R) -> Result<(RawTable, usize)> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    let mut blank_rows = 0usize;
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|v| v.trim().is_empty()) {
            blank_rows += 1;
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((RawTable::new(headers, rows), blank_rows))
}

/// Read and canonicalize one category's inspection data.
pub fn load_from_reader<R: Read>(
    source: R,
    category: Category,
) -> Result<(CanonicalTable, LoadReport)> {
    let (raw, blank_rows) = read_raw(source)?;
    let table = canonicalize(&raw, category.schema())?;
    let report = LoadReport {
        category,
        total_rows: raw.rows.len() + blank_rows,
        blank_rows,
        loaded_rows: table.len(),
        defect_types: table.defect_columns.len(),
    };
    Ok((table, report))
}

pub fn load_category(path: &Path, category: Category) -> Result<(CanonicalTable, LoadReport)> {
    let file = std::fs::File::open(path)?;
    let (table, report) = load_from_reader(file, category)?;
    info!(
        category = %category,
        path = %path.display(),
        rows = report.loaded_rows,
        defect_types = report.defect_types,
        "loaded inspection data"
    );
    Ok((table, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QualityError;
    use std::io::Write;

    const OUTSOURCING_CSV: &str = "\
Supplier,Year,Month,Week,Date,Model,Inspection Q'ty,Reject Q'ty,Return Q'ty,Target Q'ty,Burr,Crack
O1,2024,5,19,2024-05-06,K1,50,2,1,200,2,0
,,,,,,,,,,,
O2,2024,5,20,2024-05-13,K2,80,0,0,300,0,0
O2,2024,5,20
";

    #[test]
    fn reads_ragged_rows_and_skips_blank_lines() {
        let (table, report) = load_from_reader(OUTSOURCING_CSV.as_bytes(), Category::Outsourcing).unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.blank_rows, 1);
        assert_eq!(report.loaded_rows, 3);
        assert_eq!(table.defect_columns, vec!["Burr", "Crack"]);
        assert_eq!(table.records[0].return_qty, 1);
        assert_eq!(table.records[0].target_qty, 200);
        assert_eq!(table.records[2].model, "");
        assert_eq!(table.records[2].defects, vec![0, 0]);
    }

    #[test]
    fn load_category_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(OUTSOURCING_CSV.as_bytes()).unwrap();
        let (table, report) = load_category(file.path(), Category::Outsourcing).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(report.category, Category::Outsourcing);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_category(Path::new("does/not/exist.csv"), Category::Upper).unwrap_err();
        assert!(matches!(err, QualityError::Io(_)));
    }
}
