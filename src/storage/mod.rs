//! # Storage Layer
//!
//! File plumbing for the CLI: project settings, panel configurations and
//! diagram documents.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Project settings | TOML | `bpmn-panel.toml` |
//! | User settings | TOML | `~/.config/bpmn-panel/config.toml` |
//! | Panel configuration | JSON or YAML | `panel.json` (configurable) |
//! | Diagram | JSON | `diagram.json` (configurable) |
//!
//! ## Concurrency Safety
//!
//! - [`DiagramStore`] uses file locking (`fs2`) for concurrent access
//! - Diagram writes are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! process/
//! ├── bpmn-panel.toml    # Project settings
//! ├── panel.json         # Panel configuration (locations, fields)
//! └── diagram.json       # Diagram document
//! ```
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a bpmn-panel project
//! - [`DiagramStore`] - Read/write diagram documents
//! - [`Config`] - Project and global configuration

mod config;
mod diagram;
mod project;

pub use config::{load_panel_config, Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PROJECT_FILE};
pub use diagram::{DiagramStore, SAMPLE_DIAGRAM};
pub use project::{Project, ProjectError, DIAGRAM_FILE, PANEL_CONFIG_FILE};
