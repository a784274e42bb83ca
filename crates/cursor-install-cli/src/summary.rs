use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use cursor_install::{InstallOutcome, InstallReport, InstallWarning};

pub fn print_summary(report: &InstallReport) {
    let mut table = Table::new();
    apply_table_style(&mut table);
    table.add_row(vec![
        label_cell("Platform"),
        Cell::new(format!(
            "{} ({})",
            report.platform.os.display_name(),
            report.platform.arch.as_str()
        )),
    ]);
    table.add_row(vec![
        label_cell("Source"),
        Cell::new(report.target.tier.to_string()),
    ]);
    table.add_row(vec![label_cell("URL"), Cell::new(&report.target.url)]);
    table.add_row(vec![label_cell("Result"), outcome_cell(&report.outcome)]);
    println!("{table}");

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings:");
        println!("{}", warning_table(&report.warnings));
    }
}

fn warning_table(warnings: &[InstallWarning]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![label_cell("Step"), label_cell("Problem")]);
    apply_table_style(&mut table);
    for warning in warnings {
        table.add_row(vec![
            Cell::new(warning.category()).fg(Color::Yellow),
            Cell::new(warning.detail()),
        ]);
    }
    table
}

fn outcome_cell(outcome: &InstallOutcome) -> Cell {
    let color = match outcome {
        InstallOutcome::Installed { .. } | InstallOutcome::PackageInstalled { .. } => Color::Green,
        InstallOutcome::ManualActionRequired { .. } => Color::Yellow,
    };
    Cell::new(outcome.to_string())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn label_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}
