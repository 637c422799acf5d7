//! # Resolution Engine
//!
//! Interprets the panel configuration against business-object trees.
//!
//! ## Components
//!
//! | Component | Purpose | Operations |
//! |-----------|---------|------------|
//! | [`Resolver`] | Location interpreter | `read`, `write`, `matches`, `prune` |
//! | [`Disambiguator`] | Subtype selection | `determine`, `switch_to` |
//! | [`PendingChanges`] | Draft buffer | `stage`, `flush`, `discard_element` |
//!
//! ## Failure Model
//!
//! Unknown locations are logged and degrade to an absent read or a no-op
//! write. Host rejections surface as [`ApplyError`](crate::host::ApplyError)
//! and keep the affected draft pending.

mod disambiguate;
mod pending;
mod resolver;

pub use disambiguate::Disambiguator;
pub use pending::{ChangeKey, FlushStatus, PendingChange, PendingChanges};
pub use resolver::{Resolver, LEAF_SEPARATOR};
