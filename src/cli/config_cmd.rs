//! Project and configuration commands

use anyhow::Result;
use serde::Serialize;

use super::output::Output;
use super::panel_cmd::Sources;
use crate::storage::{Project, DIAGRAM_FILE, PANEL_CONFIG_FILE, PROJECT_FILE};

/// Initializes a project with the built-in configuration and a sample diagram
pub fn init(output: &Output, path: &str) -> Result<()> {
    let project = Project::init(path)?;

    output.verbose_ctx(
        "init",
        &format!("Wrote {}, {} and {}", PROJECT_FILE, PANEL_CONFIG_FILE, DIAGRAM_FILE),
    );
    output.success(&format!(
        "Initialized bpmn-panel project at {}",
        project.root().display()
    ));
    Ok(())
}

#[derive(Serialize)]
struct LocationRow {
    name: String,
    steps: String,
    attribute: bool,
}

/// Lists the compiled locations of the panel configuration
pub fn locations(output: &Output, sources: &Sources) -> Result<()> {
    let config = sources.panel_config(output)?;

    let rows: Vec<LocationRow> = config
        .locations()
        .iter()
        .map(|descriptor| LocationRow {
            name: descriptor.name().to_string(),
            steps: descriptor.to_string(),
            attribute: descriptor.is_attribute(),
        })
        .collect();

    if output.is_json() {
        output.data(&rows);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No locations configured.");
        return Ok(());
    }

    for row in &rows {
        output.row(&[&row.name, &row.steps]);
    }
    for warning in config.warnings() {
        output.error(&warning.to_string());
    }

    Ok(())
}
