use std::io::Write;
use subcon_quality::export::{export_headers, to_workbook_bytes, write_bytes};
use subcon_quality::filter::apply_filter;
use subcon_quality::loader::{load_category, load_from_reader};
use subcon_quality::types::FilterSelection;
use subcon_quality::Category;

const UPPER_CSV: &str = "\
SUBCON,YEAR,MONTH,WEEK,DATE,MODEL,PO,INPUT QTY,RANDOM INSPECTION QTY,REJECT QTY,Scratch,Stain,REMARK
Alpha,2024,1,1,2024-01-02,M-100,PO1,1000,100,5,3,2,
Alpha,2024,1,2,,M-200,PO2,500,50,2,0,2,late
Beta,2024,1,1,2024-01-03,M-100,PO3,900,90,9.7,0,9,
";

#[test]
fn filtered_export_reads_back_with_same_rows_and_columns() {
    let mut source = tempfile::NamedTempFile::new().unwrap();
    source.write_all(UPPER_CSV.as_bytes()).unwrap();
    let (table, _) = load_category(source.path(), Category::Upper).unwrap();

    let filtered = apply_filter(&table, &FilterSelection::all().subcontractor("Alpha"));
    assert_eq!(filtered.len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("upper_export.csv");
    write_bytes(&out, &to_workbook_bytes(&filtered).unwrap()).unwrap();

    let (back, report) = load_category(&out, Category::Upper).unwrap();
    assert_eq!(report.loaded_rows, filtered.len());
    assert_eq!(back.defect_columns, filtered.defect_columns);
    assert_eq!(back, filtered);
}

#[test]
fn export_keeps_only_canonical_columns() {
    let (table, _) = load_from_reader(UPPER_CSV.as_bytes(), Category::Upper).unwrap();
    let bytes = to_workbook_bytes(&table).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "SUBCON,YEAR,MONTH,WEEK,DATE,MODEL,RANDOM INSPECTION QTY,REJECT QTY,INPUT QTY,Scratch,Stain"
    );
    assert_eq!(export_headers(&table).len(), 11);
    // coerced values are written as stored
    assert!(text.contains("Beta,2024,1,1,2024-01-03,M-100,90,9,900,0,9"));
}
