use std::time::UNIX_EPOCH;

use chrono::{DateTime, Local};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use lis_cli::pipeline::ExtractionResult;
use lis_map::{ProfileMetadata, TestFrequency};
use lis_model::ValueFlag;
use lis_transform::{DETECTED_FORMATS, FormatSummary, SpecialValuePatterns};

pub fn print_extraction_summary(result: &ExtractionResult) {
    println!("Profile: {}", result.profile_id);
    println!("Run: {}", result.run_id);
    match &result.outputs {
        Some(outputs) => {
            println!("labs_long: {}", outputs.labs_long.display());
            if let Some(path) = &outputs.qc_report {
                println!("QC report: {}", path.display());
            }
        }
        None => println!("Dry run: no files written"),
    }

    let mut files = Table::new();
    files.set_header(vec![header_cell("File"), header_cell("Rows"), header_cell("Status")]);
    apply_table_style(&mut files);
    align_column(&mut files, 1, CellAlignment::Right);
    for file in &result.loaded_files {
        files.add_row(vec![
            Cell::new(file.path.display()),
            Cell::new(file.rows),
            Cell::new("loaded").fg(Color::Green),
        ]);
    }
    for file in &result.skipped_files {
        files.add_row(vec![
            Cell::new(file.path.display()),
            dim_cell("-"),
            Cell::new(format!("skipped: {}", file.reason)).fg(Color::Yellow),
        ]);
    }
    println!("{files}");

    let mut rows = Table::new();
    rows.set_header(vec![header_cell("Stage"), header_cell("Rows")]);
    apply_table_style(&mut rows);
    align_column(&mut rows, 1, CellAlignment::Right);
    rows.add_row(vec![Cell::new("Raw"), Cell::new(result.raw_rows)]);
    rows.add_row(vec![
        Cell::new("Dropped: unselected tests"),
        count_cell(result.dropped_unknown_rows, Color::Yellow),
    ]);
    rows.add_row(vec![
        Cell::new("Dropped: no numeric value"),
        count_cell(result.dropped_failed_rows, Color::Yellow),
    ]);
    if let Some(datetime) = &result.datetime {
        rows.add_row(vec![
            Cell::new("Unparsed datetimes"),
            count_cell(datetime.failed(), Color::Yellow),
        ]);
    }
    rows.add_row(vec![
        Cell::new("labs_long").add_attribute(Attribute::Bold),
        Cell::new(result.labs_long.height()).add_attribute(Attribute::Bold),
    ]);
    println!("{rows}");

    let mut flags = Table::new();
    flags.set_header(vec![header_cell("Flag"), header_cell("Count")]);
    apply_table_style(&mut flags);
    align_column(&mut flags, 1, CellAlignment::Right);
    for (flag, count) in &result.parse.flags {
        flags.add_row(vec![flag_cell(*flag), Cell::new(count)]);
    }
    if result.parse.blank > 0 {
        flags.add_row(vec![dim_cell("(blank)"), dim_cell(result.parse.blank)]);
    }
    println!("{flags}");

    println!("{}", result.report.summary_text());
}

pub fn print_format_summary(column: &str, summary: &FormatSummary, patterns: &SpecialValuePatterns) {
    println!("Column: {column} ({} distinct values surveyed)", summary.total);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Format"),
        header_cell("Count"),
        header_cell("Examples"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for flag in DETECTED_FORMATS {
        let count = summary.count(flag);
        if count == 0 {
            continue;
        }
        table.add_row(vec![
            flag_cell(flag),
            Cell::new(count),
            Cell::new(summary.samples(flag).join(", ")),
        ]);
    }
    println!("{table}");

    let groups = [
        ("less_than", &patterns.less_than),
        ("greater_than", &patterns.greater_than),
        ("positive", &patterns.positive),
        ("negative", &patterns.negative),
        ("invalid", &patterns.invalid),
    ];
    if groups.iter().all(|(_, values)| values.is_empty()) {
        return;
    }
    let mut special = Table::new();
    special.set_header(vec![header_cell("Special values"), header_cell("Distinct values")]);
    apply_table_style(&mut special);
    for (label, values) in groups {
        if values.is_empty() {
            continue;
        }
        special.add_row(vec![Cell::new(label), Cell::new(values.join(", "))]);
    }
    println!("{special}");
}

pub fn print_test_statistics(stats: &[TestFrequency], is_selected: impl Fn(&str) -> bool) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Test name"),
        header_cell("Count"),
        header_cell("Test code"),
        header_cell("Selected"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for stat in stats {
        let selected = if is_selected(&stat.test_code) {
            Cell::new("✓").fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            dim_cell("-")
        };
        table.add_row(vec![
            Cell::new(&stat.test_name),
            Cell::new(stat.count),
            Cell::new(&stat.test_code).fg(Color::Blue),
            selected,
        ]);
    }
    println!("{table}");
}

pub fn print_profiles(profiles: &[ProfileMetadata]) {
    if profiles.is_empty() {
        println!("No profiles found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Description"),
        header_cell("Tests"),
        header_cell("Modified"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for profile in profiles {
        table.add_row(vec![
            Cell::new(&profile.id).fg(Color::Blue).add_attribute(Attribute::Bold),
            Cell::new(&profile.description),
            Cell::new(profile.test_count),
            Cell::new(modified_label(profile)),
        ]);
    }
    println!("{table}");
}

fn modified_label(profile: &ProfileMetadata) -> String {
    if profile.modified < UNIX_EPOCH {
        return "-".to_string();
    }
    let modified: DateTime<Local> = profile.modified.into();
    modified.format("%Y-%m-%d %H:%M").to_string()
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn flag_cell(flag: ValueFlag) -> Cell {
    let cell = Cell::new(flag.as_str());
    match flag {
        ValueFlag::Invalid => cell.fg(Color::Red),
        ValueFlag::ExtremeValue => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        _ if flag.is_censored() => cell.fg(Color::Yellow),
        _ if flag.is_text() => cell.fg(Color::Magenta),
        _ => cell,
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
