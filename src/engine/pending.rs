//! Pending-change buffer
//!
//! Holds the latest draft per (element, field) until it is flushed into the
//! model. Failed changes are put back so a later flush retries them.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::domain::{ElementId, FieldDescriptor, Scalar};

/// Identity of a draft
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeKey {
    pub element: ElementId,
    pub field: String,
}

/// A staged, not yet applied field value
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub element: ElementId,
    pub field: String,
    pub descriptor: FieldDescriptor,

    /// `None` clears the field
    pub value: Option<Scalar>,
}

impl PendingChange {
    pub fn key(&self) -> ChangeKey {
        ChangeKey {
            element: self.element.clone(),
            field: self.field.clone(),
        }
    }
}

/// Outcome of a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStatus {
    /// The buffer was empty
    NothingToDo,

    AllSucceeded { applied: usize },

    /// At least one change failed and is pending again
    SomeFailed { applied: usize, failed: usize },
}

impl fmt::Display for FlushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushStatus::NothingToDo => f.write_str("nothing to save"),
            FlushStatus::AllSucceeded { applied } => write!(f, "{} applied", applied),
            FlushStatus::SomeFailed { applied, failed } => {
                write!(f, "{} applied, {} failed", applied, failed)
            }
        }
    }
}

/// Insertion-ordered drafts, one per (element, field)
#[derive(Debug, Clone, Default)]
pub struct PendingChanges {
    changes: IndexMap<ChangeKey, PendingChange>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a draft, replacing any earlier draft for the same field
    pub fn stage(&mut self, change: PendingChange) {
        let key = change.key();
        debug!(element = change.element.as_str(), field = change.field.as_str(); "Staged change");
        // Replacing keeps the position of the first draft
        self.changes.insert(key, change);
    }

    /// Applies every draft through `apply`
    ///
    /// The buffer is emptied before the first apply; changes whose apply
    /// fails are staged again, in their original order.
    pub fn flush<E, F>(&mut self, mut apply: F) -> FlushStatus
    where
        E: fmt::Display,
        F: FnMut(&PendingChange) -> Result<(), E>,
    {
        if self.changes.is_empty() {
            return FlushStatus::NothingToDo;
        }

        let snapshot = std::mem::take(&mut self.changes);
        let mut applied = 0;
        let mut failed = Vec::new();

        for (key, change) in snapshot {
            match apply(&change) {
                Ok(()) => applied += 1,
                Err(e) => {
                    warn!(
                        element = change.element.as_str(),
                        field = change.field.as_str(),
                        error = e.to_string();
                        "Failed to apply change"
                    );
                    failed.push((key, change));
                }
            }
        }

        if failed.is_empty() {
            return FlushStatus::AllSucceeded { applied };
        }

        let count = failed.len();
        for (key, change) in failed {
            self.changes.insert(key, change);
        }
        FlushStatus::SomeFailed {
            applied,
            failed: count,
        }
    }

    /// Returns the draft for a field, if any
    pub fn get(&self, element: &ElementId, field: &str) -> Option<&PendingChange> {
        self.changes.get(&ChangeKey {
            element: element.clone(),
            field: field.to_string(),
        })
    }

    /// Drops every draft of an element; returns how many were dropped
    pub fn discard_element(&mut self, element: &ElementId) -> usize {
        let before = self.changes.len();
        self.changes.retain(|key, _| key.element != *element);
        before - self.changes.len()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(element: &str, field: &str, value: &str) -> PendingChange {
        PendingChange {
            element: ElementId::from(element),
            field: field.to_string(),
            descriptor: FieldDescriptor::new("attribute"),
            value: Some(Scalar::text(value)),
        }
    }

    #[test]
    fn last_write_wins() {
        let mut pending = PendingChanges::new();
        pending.stage(change("task1", "name", "A"));
        pending.stage(change("task1", "name", "B"));

        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending.get(&ElementId::from("task1"), "name").and_then(|c| c.value.clone()),
            Some(Scalar::text("B"))
        );
    }

    #[test]
    fn empty_flush_does_nothing() {
        let mut pending = PendingChanges::new();
        let mut calls = 0;

        let status = pending.flush(|_| -> Result<(), String> {
            calls += 1;
            Ok(())
        });

        assert_eq!(status, FlushStatus::NothingToDo);
        assert_eq!(calls, 0);
    }

    #[test]
    fn successful_flush_empties_buffer() {
        let mut pending = PendingChanges::new();
        pending.stage(change("task1", "name", "A"));
        pending.stage(change("task2", "name", "B"));

        let mut seen = Vec::new();
        let status = pending.flush(|c| -> Result<(), String> {
            seen.push(c.element.to_string());
            Ok(())
        });

        assert_eq!(status, FlushStatus::AllSucceeded { applied: 2 });
        assert_eq!(seen, vec!["task1", "task2"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn failed_changes_are_retained() {
        let mut pending = PendingChanges::new();
        pending.stage(change("task1", "name", "A"));
        pending.stage(change("task1", "script", "B"));
        pending.stage(change("task2", "name", "C"));

        let status = pending.flush(|c| {
            if c.field == "script" {
                Err("rejected")
            } else {
                Ok(())
            }
        });

        assert_eq!(status, FlushStatus::SomeFailed { applied: 2, failed: 1 });
        assert_eq!(pending.len(), 1);
        assert!(pending.get(&ElementId::from("task1"), "script").is_some());

        // A retry that succeeds drains the buffer
        let status = pending.flush(|_| -> Result<(), String> { Ok(()) });
        assert_eq!(status, FlushStatus::AllSucceeded { applied: 1 });
        assert!(pending.is_empty());
    }

    #[test]
    fn discard_element_drops_only_its_drafts() {
        let mut pending = PendingChanges::new();
        pending.stage(change("task1", "name", "A"));
        pending.stage(change("task1", "script", "B"));
        pending.stage(change("task2", "name", "C"));

        assert_eq!(pending.discard_element(&ElementId::from("task1")), 2);
        assert_eq!(pending.len(), 1);
        assert!(pending.get(&ElementId::from("task2"), "name").is_some());
    }
}
