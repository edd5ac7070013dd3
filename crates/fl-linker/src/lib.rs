//! Reference linking: extract forge references from text, resolve them, and
//! keep the rendered summary of each text unit in step with its edits.

pub mod error;
pub mod extract;
pub mod features;
pub mod organisation;
pub mod reconcile;
pub mod render;
pub mod service;
pub mod toggle;

pub use error::LinkError;
pub use service::{Draft, Linker, ToggleOutcome};
