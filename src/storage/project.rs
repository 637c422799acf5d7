//! Project management
//!
//! Handles project initialization and resolves the panel configuration and
//! diagram files a project refers to.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{load_panel_config, Config, ProjectConfig, PROJECT_FILE};
use super::diagram::{DiagramStore, SAMPLE_DIAGRAM};
use crate::domain::{PanelConfig, BUILTIN_CONFIG};

/// Panel configuration file written by `init`
pub const PANEL_CONFIG_FILE: &str = "panel.json";

/// Diagram file written by `init`
pub const DIAGRAM_FILE: &str = "diagram.json";

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Not in a bpmn-panel project. Run 'bpmn-panel init' first.")]
    NotInProject,

    #[error("Project does not name a diagram. Set 'diagram' in {}", PROJECT_FILE)]
    NoDiagram,
}

/// A bpmn-panel project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_FILE).is_file() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Initializes a new project at the given path
    ///
    /// Writes the project settings, a copy of the built-in panel
    /// configuration and a sample diagram. Existing panel and diagram files
    /// are left alone.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if root.join(PROJECT_FILE).exists() {
            return Err(ProjectError::AlreadyExists(root).into());
        }

        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create project directory: {}", root.display()))?;

        let config = Config {
            project: ProjectConfig {
                panel_config: Some(PathBuf::from(PANEL_CONFIG_FILE)),
                diagram: Some(PathBuf::from(DIAGRAM_FILE)),
                pretty: true,
            },
            global: Config::for_project(&root)?.global,
            project_root: Some(root.clone()),
        };
        config.save_project()?;

        write_if_missing(&root.join(PANEL_CONFIG_FILE), BUILTIN_CONFIG)?;
        write_if_missing(&root.join(DIAGRAM_FILE), SAMPLE_DIAGRAM)?;

        Ok(Self { root, config })
    }

    /// Returns the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the project configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Loads the panel configuration, falling back to the built-in one
    pub fn panel_config(&self) -> Result<PanelConfig> {
        match self.config.panel_config_path() {
            Some(path) => load_panel_config(&path),
            None => PanelConfig::builtin().context("Failed to load built-in panel config"),
        }
    }

    /// Returns the store for the project's diagram
    pub fn diagram_store(&self) -> Result<DiagramStore> {
        let path = self.config.diagram_path().ok_or(ProjectError::NoDiagram)?;
        Ok(DiagramStore::new(path))
    }
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}
