// Entry point and interactive menu.
//
// - Option [1] loads one production category's inspection file.
// - Option [2] sets the subcontractor / year / week selection.
// - Option [3] recomputes the dashboard, prints previews and writes JSON.
// - Option [4] exports the filtered rows.
// - Option [5] shows the all-category overview and subcontractor scorecard
//   for an optional date range.
//
// End of input on stdin ends the session like option [0].
use chrono::{Local, NaiveDate};
use std::io::{self, Write};
use subcon_quality::config::{DashboardConfig, CONFIG_FILE};
use subcon_quality::dashboard::{build_dashboard, category_overview, subcontractor_scorecard};
use subcon_quality::export::{
    entity_preview, export_file_name, heatmap_preview, pareto_preview, period_preview,
    render_table, scorecard_preview, to_workbook_bytes, write_bytes, write_json,
};
use subcon_quality::filter::{apply_filter, FilterOptions};
use subcon_quality::types::{CanonicalTable, FilterSelection};
use subcon_quality::util::{format_int, format_percent, parse_date_safe, read_trimmed_line};
use subcon_quality::{loader, logging, Category};
use tracing::{error, info};

/// Per-session state: the loaded table and the current selection.
struct Session {
    config: DashboardConfig,
    table: Option<CanonicalTable>,
    selection: FilterSelection,
}

/// `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_trimmed_line(&mut io::stdin().lock())
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Ask for an optional integer; blank, `All` or end of input means no filter.
fn prompt_optional_int(label: &str, options: &[i64]) -> Option<i64> {
    loop {
        let resp = prompt(label)?;
        if resp.is_empty() || resp.eq_ignore_ascii_case("all") {
            return None;
        }
        match resp.parse::<i64>() {
            Ok(v) if options.contains(&v) => return Some(v),
            Ok(_) => println!("Value not present in the data. Options: {:?}", options),
            Err(_) => println!("Please enter a number, or leave blank for All."),
        }
    }
}

/// Ask for an optional date bound; blank or end of input means open-ended.
fn prompt_optional_date(label: &str) -> Option<NaiveDate> {
    loop {
        let resp = prompt(label)?;
        if resp.is_empty() {
            return None;
        }
        match parse_date_safe(Some(&resp)) {
            Some(date) => return Some(date),
            None => println!("Please enter a date like 2024-03-07, or leave blank."),
        }
    }
}

fn handle_load(session: &mut Session) {
    let names: Vec<&str> = Category::ALL.iter().map(|c| c.name()).collect();
    let Some(resp) = prompt(&format!("Production type ({}): ", names.join("/"))) else {
        return;
    };
    let Some(category) = Category::parse(&resp) else {
        println!("Unknown production type.\n");
        return;
    };
    let path = session.config.data_path(category);
    match loader::load_category(&path, category) {
        Ok((table, report)) => {
            println!(
                "Loaded {} ({} rows, {} blank rows skipped, {} defect types)\n",
                category,
                format_int(report.loaded_rows),
                format_int(report.blank_rows),
                report.defect_types
            );
            session.table = Some(table);
            session.selection = FilterSelection::all();
        }
        Err(e) => {
            error!(category = %category, error = %e, "load failed");
            eprintln!("Failed to load {}: {}\n", path.display(), e);
        }
    }
}

fn handle_filter(session: &mut Session) {
    let Some(table) = &session.table else {
        println!("Error: No data loaded. Please load a production type first (option 1).\n");
        return;
    };
    let opts = FilterOptions::from_table(table);
    println!("Subcons: {}", opts.subcontractors.join(", "));
    let subcontractor = loop {
        let Some(resp) = prompt("Subcon (blank = All): ") else {
            break None;
        };
        if resp.is_empty() || resp.eq_ignore_ascii_case("all") {
            break None;
        }
        if opts.subcontractors.contains(&resp) {
            break Some(resp);
        }
        println!("Unknown subcon.");
    };
    let year = prompt_optional_int("Year (blank = All): ", &opts.years);
    let week = prompt_optional_int("Week (blank = All): ", &opts.weeks);

    session.selection = FilterSelection {
        subcontractor,
        year,
        week,
        ..FilterSelection::default()
    };
    let matched = apply_filter(table, &session.selection).len();
    info!(selection = ?session.selection, rows = matched, "selection changed");
    println!("{} rows match the selection.\n", format_int(matched));
}

fn handle_dashboard(session: &Session) {
    let Some(table) = &session.table else {
        println!("Error: No data loaded. Please load a production type first (option 1).\n");
        return;
    };
    let d = build_dashboard(table, &session.selection, session.config.dashboard_options());
    if d.is_empty() {
        println!("Warning: no rows match this selection.\n");
    }

    println!("{} - Subcon Tracking", d.category);
    println!(
        "Inspected {}, rejected {} ({})\n",
        format_int(d.totals.denominator),
        format_int(d.totals.numerator),
        format_percent(d.totals.rate)
    );
    println!("1. Monthly Defect Rate\n{}\n", render_table(&period_preview(&d.monthly_defect), 12));
    println!("2. Weekly Defect Rate\n{}\n", render_table(&period_preview(&d.weekly_defect), 53));
    if let (Some(monthly), Some(weekly)) = (&d.monthly_return, &d.weekly_return) {
        println!("Monthly Return Rate\n{}\n", render_table(&period_preview(monthly), 12));
        println!("Weekly Return Rate\n{}\n", render_table(&period_preview(weekly), 53));
    }
    println!(
        "3. Top {} Defective Models\n{}\n",
        session.config.top_limit,
        render_table(&entity_preview(&d.top_models), session.config.top_limit)
    );
    println!(
        "4-5. Pareto / Defect Distribution\n{}\n",
        render_table(&pareto_preview(&d.pareto, &d.defect_share), usize::MAX)
    );
    println!("6. Defect Heatmap by Model\n{}\n", render_table(&heatmap_preview(&d.heatmap), 20));

    let path = session
        .config
        .output_dir
        .join(format!("dashboard_{}.json", d.category.name().to_lowercase()));
    match write_json(&path, &d) {
        Ok(()) => println!("(Full dashboard exported to {})\n", path.display()),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn handle_export(session: &Session) {
    let Some(table) = &session.table else {
        println!("Error: No data loaded. Please load a production type first (option 1).\n");
        return;
    };
    let filtered = apply_filter(table, &session.selection);
    let path = session
        .config
        .output_dir
        .join(export_file_name(table.category, Local::now().naive_local()));
    let result = to_workbook_bytes(&filtered).and_then(|bytes| write_bytes(&path, &bytes));
    match result {
        Ok(()) => {
            info!(path = %path.display(), rows = filtered.len(), "exported filtered rows");
            println!("Exported {} rows to {}\n", format_int(filtered.len()), path.display());
        }
        Err(e) => eprintln!("Export failed: {}\n", e),
    }
}

fn handle_overview(session: &Session) {
    let from = prompt_optional_date("Start date (YYYY-MM-DD, blank = none): ");
    let to = prompt_optional_date("End date (YYYY-MM-DD, blank = none): ");
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            println!("Start date is after end date; nothing will match.");
        }
    }
    let selection = FilterSelection::all().date_range(from, to);

    // A broken category file must not hide the others.
    let mut tables = Vec::new();
    for category in Category::ALL {
        match loader::load_category(&session.config.data_path(category), category) {
            Ok((table, _)) => tables.push(table),
            Err(e) => eprintln!("Skipping {}: {}", category, e),
        }
    }
    println!("Subcon Quality Tracking - Overview\n");
    for totals in category_overview(&tables, &selection) {
        println!(
            "{:<12} input {:>10}  reject {:>8}  {:>8}",
            totals.category.name(),
            format_int(totals.input_qty),
            format_int(totals.reject_qty),
            format_percent(totals.reject.rate)
        );
    }
    println!();
    for table in &tables {
        let rows = subcontractor_scorecard(table, &selection, session.config.target_reject_percent);
        println!(
            "{} (target {})\n{}\n",
            table.category,
            format_percent(session.config.target_reject_percent),
            render_table(&scorecard_preview(&rows), usize::MAX)
        );
    }
}

fn main() {
    logging::init();
    let config = match DashboardConfig::load(std::path::Path::new(CONFIG_FILE)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid {}: {}", CONFIG_FILE, e);
            std::process::exit(1);
        }
    };
    let mut session = Session {
        config,
        table: None,
        selection: FilterSelection::all(),
    };

    loop {
        println!("Subcon Quality Tracking:");
        println!("[1] Load production type");
        println!("[2] Select subcon / year / week");
        println!("[3] Generate dashboard");
        println!("[4] Export filtered rows");
        println!("[5] Overview of all production types");
        println!("[0] Exit\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_filter(&mut session),
            "3" => handle_dashboard(&session),
            "4" => handle_export(&session),
            "5" => handle_overview(&session),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
}
