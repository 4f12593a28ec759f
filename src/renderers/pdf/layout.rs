//! Stage 1: score layout on a virtual canvas
//!
//! One five-line staff per voice; horizontal position is proportional to
//! musical time, vertical position follows treble-clef staff placement
//! (bottom line = E4). The canvas uses a top-left origin; the writer maps
//! it into PDF page space.

use num_rational::Ratio;

use super::LayoutError;
use crate::models::{Dur, EventKind, MusicDocument, Pitch};

/// Canvas width in layout units
const CANVAS_WIDTH: f64 = 1000.0;
/// Vertical gap between adjacent staff lines
const STAFF_LINE_GAP: f64 = 8.0;
/// Height reserved per voice (staff + breathing room)
const SYSTEM_HEIGHT: f64 = 90.0;
/// Space above the first staff for the title
const TITLE_BLOCK: f64 = 50.0;
/// Horizontal inset before the first event
const STAFF_INSET: f64 = 30.0;

/// A primitive vector drawing operation
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// Straight stroke from (x1, y1) to (x2, y2)
    Line { x1: f64, y1: f64, x2: f64, y2: f64, width: f64 },
    /// Filled note head
    Ellipse { cx: f64, cy: f64, rx: f64, ry: f64 },
    /// Filled rectangle (rest glyphs)
    Rect { x: f64, y: f64, w: f64, h: f64 },
    /// Text anchored at its baseline start
    Text { x: f64, y: f64, size: f64, text: String },
}

/// Vector description of the whole score on a virtual canvas
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLayout {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}

/// Lay the document out as vector operations
///
/// Fails with [`LayoutError::EmptyDocument`] when there is nothing to
/// draw; callers must not turn that into a blank page.
pub fn layout(doc: &MusicDocument) -> Result<ScoreLayout, LayoutError> {
    if doc.is_empty() {
        return Err(LayoutError::EmptyDocument);
    }

    let total = doc.total_duration();
    let mut ops = Vec::new();
    let height = TITLE_BLOCK + doc.voices.len() as f64 * SYSTEM_HEIGHT;

    if let Some(title) = &doc.attributes.title {
        if !title.is_empty() {
            ops.push(DrawOp::Text {
                x: CANVAS_WIDTH / 2.0 - title.len() as f64 * 4.0,
                y: 24.0,
                size: 16.0,
                text: title.clone(),
            });
        }
    }

    for (voice_idx, voice) in doc.voices.iter().enumerate() {
        let staff_top = TITLE_BLOCK + voice_idx as f64 * SYSTEM_HEIGHT;
        draw_staff(&mut ops, staff_top, voice.label.as_deref());

        let bottom_line = staff_top + 4.0 * STAFF_LINE_GAP;
        let mut cursor: Dur = Ratio::new(0, 1);

        for measure in &voice.measures {
            for event in &measure.events {
                let x = time_to_x(cursor, total);
                match event.kind {
                    EventKind::Note(pitch) => draw_note(&mut ops, x, bottom_line, pitch),
                    EventKind::Rest => draw_rest(&mut ops, x, staff_top),
                }
                cursor += event.duration;
            }
            // Barline at the measure's right edge
            let bx = time_to_x(cursor, total);
            ops.push(DrawOp::Line {
                x1: bx,
                y1: staff_top,
                x2: bx,
                y2: bottom_line,
                width: 1.0,
            });
        }
    }

    Ok(ScoreLayout { width: CANVAS_WIDTH, height, ops })
}

fn time_to_x(at: Dur, total: Dur) -> f64 {
    let usable = CANVAS_WIDTH - 2.0 * STAFF_INSET;
    let fraction = if *total.numer() == 0 {
        0.0
    } else {
        (*at.numer() as f64 / *at.denom() as f64) / (*total.numer() as f64 / *total.denom() as f64)
    };
    STAFF_INSET + usable * fraction
}

fn draw_staff(ops: &mut Vec<DrawOp>, top: f64, label: Option<&str>) {
    for line in 0..5 {
        let y = top + line as f64 * STAFF_LINE_GAP;
        ops.push(DrawOp::Line {
            x1: STAFF_INSET,
            y1: y,
            x2: CANVAS_WIDTH - STAFF_INSET,
            y2: y,
            width: 0.5,
        });
    }
    if let Some(label) = label {
        ops.push(DrawOp::Text {
            x: STAFF_INSET,
            y: top - 8.0,
            size: 8.0,
            text: label.to_string(),
        });
    }
}

/// Treble-clef note placement: bottom staff line is E4
fn draw_note(ops: &mut Vec<DrawOp>, x: f64, bottom_line: f64, pitch: Pitch) {
    const E4_STAFF_INDEX: i16 = 4 * 7 + 2;
    let steps_above_e4 = pitch.staff_index() - E4_STAFF_INDEX;
    let y = bottom_line - steps_above_e4 as f64 * (STAFF_LINE_GAP / 2.0);

    ops.push(DrawOp::Ellipse { cx: x, cy: y, rx: 4.5, ry: 3.2 });
    // Stem: up for low notes, down for high ones
    let stem_len = 3.5 * STAFF_LINE_GAP;
    if steps_above_e4 < 4 {
        ops.push(DrawOp::Line { x1: x + 4.5, y1: y, x2: x + 4.5, y2: y - stem_len, width: 0.8 });
    } else {
        ops.push(DrawOp::Line { x1: x - 4.5, y1: y, x2: x - 4.5, y2: y + stem_len, width: 0.8 });
    }
}

/// Rests render as a small block hanging from the middle line
fn draw_rest(ops: &mut Vec<DrawOp>, x: f64, staff_top: f64) {
    let middle = staff_top + 2.0 * STAFF_LINE_GAP;
    ops.push(DrawOp::Rect { x: x - 3.0, y: middle - 3.0, w: 6.0, h: 3.0 });
}
