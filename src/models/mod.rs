//! Data models for the capsule export pipeline
//!
//! This module contains the persistent-side Capsule model and the derived
//! MusicDocument intermediate representation consumed by every encoder.

pub mod capsule;
pub mod document;
pub mod pitch;

// Re-export commonly used types
pub use capsule::{Capsule, CapsuleError, CapsuleMeta, Part, SourceFile, SourceKind};
pub use document::{
    Dur, Event, EventKind, Measure, MusicDocument, ScoreAttributes, TimeSignature, Voice,
};
pub use pitch::{Key, Mode, Pitch, Step};
