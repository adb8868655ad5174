//! CLI logic for the Flowsync diagram tool.
//!
//! Each subcommand opens a session over a file on disk, runs one operation
//! and writes the result.

pub mod error_adapter;

mod args;
mod config;

pub use args::{Args, Command};

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};

use flowsync::{FlowsyncError, config::AppConfig, session::Session};

use error_adapter::{diagnostics_to_reportables, render};

/// Run the Flowsync CLI application
///
/// # Errors
///
/// Returns `FlowsyncError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Documents that cannot be loaded
/// - Realignment, save or export failures
pub fn run(args: &Args) -> Result<(), FlowsyncError> {
    let app_config = config::load_config(args.config.as_ref())?;

    match &args.command {
        Command::Realign { input, output } => realign(&app_config, input, output.as_deref()),
        Command::Export { input, output } => export(&app_config, input, output.as_deref()),
        Command::Check { input } => check(input),
    }
}

fn open(app_config: &AppConfig, input: &str) -> Result<Session, FlowsyncError> {
    // A missing input would be seeded with a new diagram; the CLI only edits existing files.
    fs::metadata(input)?;
    Session::open_file(input, app_config).into_ready()
}

fn realign(app_config: &AppConfig, input: &str, output: Option<&str>) -> Result<(), FlowsyncError> {
    info!(input_path = input; "Realigning diagram");
    let mut session = open(app_config, input)?;
    let report = session.realign()?;

    match output {
        Some(output) => fs::write(output, session.content())?,
        None if report.is_empty() => {}
        None => session.save()?,
    }

    info!(
        resized = report.resized.len(),
        rerouted = report.rerouted.len(),
        output_path = output.unwrap_or(input);
        "Realignment finished"
    );
    Ok(())
}

fn export(app_config: &AppConfig, input: &str, output: Option<&str>) -> Result<(), FlowsyncError> {
    info!(input_path = input; "Exporting diagram");
    let session = open(app_config, input)?;
    let image = session.export_image()?;

    let output = output.map_or_else(
        || default_export_path(Path::new(input), &image.file_name),
        PathBuf::from,
    );
    fs::write(&output, &image.svg)?;

    info!(output_file:? = output; "SVG exported successfully");
    Ok(())
}

fn check(input: &str) -> Result<(), FlowsyncError> {
    let source = fs::read_to_string(input)?;
    let imported = flowsync_bpmn::read(&source)
        .map_err(|err| FlowsyncError::new_load_error(err, source.as_str()))?;

    for rendered in render(&diagnostics_to_reportables(&imported.warnings, &source)) {
        warn!("{rendered}");
    }
    info!(
        input_path = input,
        shapes = imported.graph.shapes_count(),
        connections = imported.graph.connections_count(),
        warnings = imported.warnings.len();
        "Diagram is valid"
    );
    Ok(())
}

/// `file_name` placed next to `input`.
fn default_export_path(input: &Path, file_name: &str) -> PathBuf {
    input.with_file_name(file_name)
}
