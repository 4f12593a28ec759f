//! Export encoders
//!
//! Every encoder consumes a MusicDocument snapshot and produces a byte
//! artifact (or a typed error). Encoders are independent: none mutates
//! shared state except the MEI engine singleton, which guards itself.

pub mod mei;
pub mod midi;
pub mod pdf;

// Re-export commonly used types
pub use mei::MeiError;
pub use midi::{Timeline, TimelineError, TimelineEvent};
pub use pdf::{LayoutError, Orientation, PaperSize, PdfOptions, ScoreLayout};
