//! score-capsule: music notation interchange and export pipeline
//!
//! One pipeline from plain-text notation to delivered artifacts:
//!
//! - [`parse`] turns ABC-style notation text into a [`models::MusicDocument`]
//! - [`sync`] debounces live edits into fresh previews and timelines
//! - [`renderers`] encode a document as MIDI, PDF, or MEI XML
//! - [`archive`] bundles a whole [`models::Capsule`] into one ZIP blob
//! - [`store`] holds Capsules in memory behind a shared handle
//!
//! Exports are pure functions of a document snapshot, so any of them can
//! run while the editor keeps typing.

pub mod archive;
pub mod models;
pub mod parse;
pub mod renderers;
pub mod store;
pub mod sync;

pub use models::{Capsule, CapsuleError, CapsuleMeta, MusicDocument, Part};
pub use parse::ParseError;
pub use store::{CapsuleStore, StoreError};
pub use sync::{Preview, RenderSync};
