//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::panel_cmd::Sources;
use super::{config_cmd, panel_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "bpmn-panel")]
#[command(author, version, about = "Configuration-driven property panel for BPMN diagrams")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the user setting, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Panel configuration file (JSON or YAML)
    #[arg(long, short = 'c', global = true, env = "BPMN_PANEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Diagram document to edit
    #[arg(long, short = 'd', global = true, env = "BPMN_PANEL_DIAGRAM")]
    pub diagram: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bpmn-panel project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Render the property panel of an element
    Show {
        /// Element ID
        element: String,
    },

    /// Print the value of one field
    Get {
        /// Element ID
        element: String,

        /// Field ID
        field: String,
    },

    /// Edit fields and save them to the diagram
    Set {
        /// Element ID
        element: String,

        /// Assignments as FIELD=VALUE (an empty value clears the field)
        #[arg(required = true, value_parser = parse_assignment)]
        assignments: Vec<(String, String)>,
    },

    /// Show or switch the subtype of an element
    Type {
        /// Element ID
        element: String,

        /// Subtype to switch to
        subtype: Option<String>,
    },

    /// List the locations of the panel configuration
    Locations,
}

/// Parses a `FIELD=VALUE` assignment
fn parse_assignment(raw: &str) -> Result<(String, String)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("Expected FIELD=VALUE, got '{}'", raw);
    };
    if field.is_empty() {
        bail!("Missing field name in '{}'", raw);
    }
    Ok((field.to_string(), value.to_string()))
}

/// Falls back to the user's default format when `--format` is not given
fn resolve_format(format: Option<OutputFormat>) -> OutputFormat {
    format.unwrap_or_else(|| {
        Config::load()
            .map(|config| config.global.default_format.into())
            .unwrap_or_default()
    })
}

/// Main entry point for the CLI
pub fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_format(cli.format), cli.verbose);
    let sources = Sources {
        config: cli.config,
        diagram: cli.diagram,
    };

    output.verbose("bpmn-panel starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            config_cmd::init(&output, &path)?
        }

        Commands::Show { element } => panel_cmd::show(&output, &sources, &element)?,
        Commands::Get { element, field } => panel_cmd::get(&output, &sources, &element, &field)?,
        Commands::Set {
            element,
            assignments,
        } => {
            output.verbose_ctx("set", &format!("{} assignment(s) for {}", assignments.len(), element));
            panel_cmd::set(&output, &sources, &element, &assignments)?
        }
        Commands::Type { element, subtype } => {
            panel_cmd::subtype(&output, &sources, &element, subtype.as_deref())?
        }

        Commands::Locations => config_cmd::locations(&output, &sources)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_assignments() {
        assert_eq!(
            parse_assignment("flowable:priority=50").unwrap(),
            ("flowable:priority".to_string(), "50".to_string())
        );
        assert_eq!(
            parse_assignment("requestUrl=http://x?a=b").unwrap(),
            ("requestUrl".to_string(), "http://x?a=b".to_string())
        );
        assert_eq!(parse_assignment("name=").unwrap().1, "");
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("=value").is_err());
    }

    #[test]
    fn parses_set_command() {
        let cli = Cli::try_parse_from([
            "bpmn-panel",
            "--diagram",
            "d.json",
            "set",
            "task1",
            "name=Review",
            "flowable:priority=5",
        ])
        .unwrap();

        assert_eq!(cli.diagram, Some(PathBuf::from("d.json")));
        match cli.command {
            Commands::Set { element, assignments } => {
                assert_eq!(element, "task1");
                assert_eq!(assignments.len(), 2);
            }
            _ => panic!("expected set"),
        }
    }
}
