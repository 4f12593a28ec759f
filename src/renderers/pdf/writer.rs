//! Stage 2: PDF serialization
//!
//! Hand-built PDF 1.4 writer: catalog, page tree, one content stream, one
//! standard Type1 font, and a classic xref table. The layout canvas is
//! scaled uniformly to fit the page inside the fixed margins and flipped
//! from top-left into PDF's bottom-left coordinate space.

use std::fmt::Write as _;

use super::layout::{DrawOp, ScoreLayout};
use super::{PdfOptions, PAGE_MARGIN};

/// Magic constant for approximating quarter circles with cubic beziers
const BEZIER_K: f64 = 0.5523;

/// Render a laid-out score into PDF bytes
pub fn render(layout: &ScoreLayout, opts: &PdfOptions) -> Vec<u8> {
    let (page_w, page_h) = opts.page_dimensions();
    let sx = (page_w - 2.0 * PAGE_MARGIN) / layout.width;
    let sy = (page_h - 2.0 * PAGE_MARGIN) / layout.height;
    let scale = sx.min(sy);

    let to_x = |x: f64| PAGE_MARGIN + x * scale;
    let to_y = |y: f64| page_h - PAGE_MARGIN - y * scale;

    let mut content = String::new();
    for op in &layout.ops {
        match op {
            DrawOp::Line { x1, y1, x2, y2, width } => {
                let _ = writeln!(
                    content,
                    "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S",
                    width * scale,
                    to_x(*x1),
                    to_y(*y1),
                    to_x(*x2),
                    to_y(*y2),
                );
            }
            DrawOp::Rect { x, y, w, h } => {
                let _ = writeln!(
                    content,
                    "{:.2} {:.2} {:.2} {:.2} re f",
                    to_x(*x),
                    to_y(y + h), // lower-left corner in page space
                    w * scale,
                    h * scale,
                );
            }
            DrawOp::Ellipse { cx, cy, rx, ry } => {
                push_ellipse(&mut content, to_x(*cx), to_y(*cy), rx * scale, ry * scale);
            }
            DrawOp::Text { x, y, size, text } => {
                let _ = writeln!(
                    content,
                    "BT /F1 {:.2} Tf {:.2} {:.2} Td ({}) Tj ET",
                    size * scale,
                    to_x(*x),
                    to_y(*y),
                    escape_pdf_string(text),
                );
            }
        }
    }

    assemble(&content, page_w, page_h)
}

/// Filled ellipse from four bezier quarter-arcs
fn push_ellipse(content: &mut String, cx: f64, cy: f64, rx: f64, ry: f64) {
    let kx = rx * BEZIER_K;
    let ky = ry * BEZIER_K;
    let _ = writeln!(content, "{:.2} {:.2} m", cx + rx, cy);
    let _ = writeln!(
        content,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry
    );
    let _ = writeln!(
        content,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy
    );
    let _ = writeln!(
        content,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
        cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry
    );
    let _ = writeln!(
        content,
        "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c f",
        cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy
    );
}

/// Escape (, ), and \ inside a PDF literal string
fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Assemble objects, xref table, and trailer
fn assemble(content: &str, page_w: f64, page_h: f64) -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>",
            page_w as u32, page_h as u32
        ),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        let _ = writeln!(out, "{} 0 obj\n{}\nendobj", i + 1, body);
    }

    let xref_offset = out.len();
    let _ = writeln!(out, "xref\n0 {}", objects.len() + 1);
    out.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        let _ = writeln!(out, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        out,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );

    out.into_bytes()
}
