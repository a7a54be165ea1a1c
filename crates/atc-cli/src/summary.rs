use std::path::Path;

use atc_build::{AssemblyReport, PipelineReport, ProfileName};
use atc_provision::{ArtifactState, SetupOutcome, UpdateOutcome};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::commands::StatusReport;

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn print_hint(hint: &str) {
    eprintln!("hint: {hint}");
}

pub fn print_setup(outcome: &SetupOutcome) {
    println!("Setup: {outcome}");
}

pub fn print_update(outcome: &UpdateOutcome) {
    println!("Update: {outcome}");
}

pub fn print_build(report: &PipelineReport) {
    println!("Profile: {}", report.outputs.profile);
    println!("Module: {}", report.outputs.bindings_wasm.display());
    println!("Loader: {}", report.outputs.loader.display());
    if let Some(assembly) = &report.assembly {
        print_assembly(assembly);
    }
    if let Some(path) = &report.bridge {
        print_bridge(path);
    }
}

pub fn print_assembly(report: &AssemblyReport) {
    println!(
        "Assembled: {} files ({} overwritten)",
        report.file_count(),
        report.overwritten.len()
    );
}

pub fn print_bridge(path: &Path) {
    println!("Bridge config: {}", path.display());
}

pub fn profiles_table(default: ProfileName) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Profile"),
        header_cell("RUSTFLAGS"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    for name in ProfileName::ALL {
        let label = if name == default {
            Cell::new(format!("{name} (default)")).add_attribute(Attribute::Bold)
        } else {
            Cell::new(name)
        };
        let flags = match name.profile().rustflags_env() {
            Some(flags) => Cell::new(flags),
            None => dim_cell("-"),
        };
        table.add_row(vec![label, flags, Cell::new(name.description())]);
    }
    table
}

pub fn status_table(report: &StatusReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Value")]);
    apply_table_style(&mut table);
    let rows: [(&str, Cell); 10] = [
        ("Project root", path_cell(&report.root)),
        ("Model", path_cell(&report.artifact)),
        ("Model state", state_cell(report.state)),
        ("Validator", Cell::new(&report.validator)),
        ("Remote", Cell::new(&report.remote)),
        ("Profile", Cell::new(report.profile)),
        ("Output", path_cell(&report.out_dir)),
        ("Assets", path_cell(&report.assets_dir)),
        ("Public", path_cell(&report.public_dir)),
        ("Bridge config", path_cell(&report.bridge_config)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    table
}

fn state_cell(state: Option<ArtifactState>) -> Cell {
    match state {
        Some(ArtifactState::Valid) => Cell::new("valid").fg(Color::Green),
        Some(state) => Cell::new(state).fg(Color::Yellow),
        None => Cell::new("submodule not initialized").fg(Color::Red),
    }
}

fn path_cell(path: &Path) -> Cell {
    Cell::new(path.display())
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
