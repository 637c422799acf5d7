//! JSON storage for diagram documents
//!
//! A diagram is stored as one JSON document holding the known node types and
//! every element with its business object. Uses file locking for concurrent
//! access safety and writes atomically.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::host::DiagramDocument;

/// Sample diagram written by `bpmn-panel init`
pub const SAMPLE_DIAGRAM: &str = include_str!("../../assets/sample-diagram.json");

/// Store for a diagram document
pub struct DiagramStore {
    path: PathBuf,
}

impl DiagramStore {
    /// Creates a new diagram store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document
    pub fn load(&self) -> Result<DiagramDocument> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open diagram: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on diagram")?;

        let document = serde_json::from_reader(BufReader::new(&file))
            .with_context(|| format!("Failed to parse diagram: {}", self.path.display()))?;

        // Lock is released when file is dropped
        Ok(document)
    }

    /// Writes the document (full rewrite)
    pub fn save(&self, document: &DiagramDocument, pretty: bool) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("json.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on diagram")?;

            let mut writer = BufWriter::new(&file);
            let written = if pretty {
                serde_json::to_writer_pretty(&mut writer, document)
            } else {
                serde_json::to_writer(&mut writer, document)
            };
            written.context("Failed to serialize diagram")?;
            writeln!(writer).context("Failed to write diagram")?;

            writer.flush().context("Failed to flush diagram")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        log::debug!(path = self.path.display().to_string(); "Diagram saved");
        Ok(())
    }
}
