//! PDF export: vector score layout embedded in a paginated document
//!
//! Two stages: [`layout`] positions staves, barlines, and glyphs on a
//! virtual canvas; [`render`] scales that canvas into the requested paper
//! size (minus fixed margins) and serializes a PDF. Layout failures abort
//! before any bytes exist, so a failed export never delivers a file.

mod layout;
mod writer;

pub use layout::{layout, DrawOp, ScoreLayout};
pub use writer::render;

use thiserror::Error;

/// Margin on every page side, in points
pub const PAGE_MARGIN: f64 = 20.0;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("cannot lay out an empty document")]
    EmptyDocument,
}

/// Supported paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaperSize {
    #[default]
    Letter,
    A4,
}

impl PaperSize {
    /// Portrait (width, height) in points (72 pt = 1 inch)
    pub fn dimensions(self) -> (f64, f64) {
        match self {
            PaperSize::Letter => (612.0, 792.0), // 8.5" x 11"
            PaperSize::A4 => (595.0, 842.0),     // 210mm x 297mm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfOptions {
    pub paper_size: PaperSize,
    pub orientation: Orientation,
}

impl PdfOptions {
    /// Page (width, height) after orientation is applied
    pub fn page_dimensions(&self) -> (f64, f64) {
        let (w, h) = self.paper_size.dimensions();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

/// Lay out and render in one call
pub fn export(
    doc: &crate::models::MusicDocument,
    opts: &PdfOptions,
) -> Result<Vec<u8>, LayoutError> {
    let score_layout = layout(doc)?;
    log::info!(
        "pdf export: {} draw op(s) onto {:?} {:?}",
        score_layout.ops.len(),
        opts.paper_size,
        opts.orientation
    );
    Ok(render(&score_layout, opts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_dimensions() {
        let letter_portrait = PdfOptions { paper_size: PaperSize::Letter, orientation: Orientation::Portrait };
        assert_eq!(letter_portrait.page_dimensions(), (612.0, 792.0));

        let a4_landscape = PdfOptions { paper_size: PaperSize::A4, orientation: Orientation::Landscape };
        assert_eq!(a4_landscape.page_dimensions(), (842.0, 595.0));
    }
}
