//! # Command-Line Interface
//!
//! Drives the property panel from the shell against a diagram file.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `init` | Create `bpmn-panel.toml`, `panel.json` and a sample `diagram.json` |
//! | `show <element>` | Render the panel of an element |
//! | `get <element> <field>` | Print one field value |
//! | `set <element> FIELD=VALUE...` | Edit fields and save the diagram |
//! | `type <element> [subtype]` | Show or switch the element's subtype |
//! | `locations` | List the compiled locations of the configuration |
//!
//! ## Inputs
//!
//! `--config` and `--diagram` (or `BPMN_PANEL_CONFIG` / `BPMN_PANEL_DIAGRAM`)
//! override the paths named in the project settings. Without a project the
//! built-in Flowable configuration is used.
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! bpmn-panel --verbose show serviceTask
//! ```
//!
//! ## Entry Point
//!
//! Parse [`Cli`] and call [`run()`].

mod app;
mod config_cmd;
mod output;
mod panel_cmd;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
pub use panel_cmd::Sources;
