//! Header field parsing (X:, T:, C:, M:, L:, Q:, K:, V:)
//!
//! Each ABC header line is `<letter>:<body>`. Unknown field letters are
//! accepted and ignored so real-world tunes (R:, O:, Z:, ...) still parse.

use num_rational::Ratio;
use std::str::FromStr;

use super::ParseError;
use crate::models::{Dur, Key, TimeSignature};

/// A recognized header field
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderField {
    Index(u32),
    Title(String),
    Composer(String),
    Meter(TimeSignature),
    UnitLength(Dur),
    /// Beats per minute from Q:
    Tempo(u16),
    Key(Key),
    Voice { id: String, name: Option<String> },
    /// A well-formed field this pipeline has no use for
    Ignored,
}

/// Parse one line as a header field
///
/// Returns `Ok(None)` when the line is not of `<letter>:` shape at all,
/// so callers can fall through to event parsing in the tune body.
pub fn parse_header_line(line: &str, line_no: usize) -> Result<Option<HeaderField>, ParseError> {
    let trimmed = line.trim_start();
    let indent = line.len() - trimmed.len();
    let mut chars = trimmed.chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(l), Some(':')) if l.is_ascii_alphabetic() => l,
        _ => return Ok(None),
    };
    let body = trimmed[2..].trim();
    let body_col = indent + 3;

    let field = match letter {
        'X' => HeaderField::Index(body.parse::<u32>().map_err(|_| {
            ParseError::new(line_no, body_col, format!("invalid tune index: {:?}", body))
        })?),
        'T' => HeaderField::Title(body.to_string()),
        'C' => HeaderField::Composer(body.to_string()),
        'M' => HeaderField::Meter(TimeSignature::from_str(body).map_err(|e| {
            ParseError::new(line_no, body_col, e.to_string())
        })?),
        'L' => HeaderField::UnitLength(parse_fraction(body).ok_or_else(|| {
            ParseError::new(line_no, body_col, format!("invalid unit note length: {:?}", body))
        })?),
        'Q' => HeaderField::Tempo(parse_tempo(body).ok_or_else(|| {
            ParseError::new(line_no, body_col, format!("invalid tempo: {:?}", body))
        })?),
        'K' => HeaderField::Key(Key::parse(body).ok_or_else(|| {
            ParseError::new(line_no, body_col, format!("unknown key: {:?}", body))
        })?),
        'V' => {
            let (id, name) = parse_voice_body(body);
            if id.is_empty() {
                return Err(ParseError::new(line_no, body_col, "missing voice id"));
            }
            HeaderField::Voice { id, name }
        }
        _ => HeaderField::Ignored,
    };
    Ok(Some(field))
}

/// "1/8" → 1/8; "1/4" → 1/4
fn parse_fraction(s: &str) -> Option<Dur> {
    let (num, den) = s.split_once('/')?;
    let num: u32 = num.trim().parse().ok()?;
    let den: u32 = den.trim().parse().ok()?;
    if num == 0 || den == 0 {
        return None;
    }
    Some(Ratio::new(num, den))
}

/// "Q:120" or "Q:1/4=120" → 120 BPM
fn parse_tempo(s: &str) -> Option<u16> {
    let bpm_part = match s.split_once('=') {
        Some((_, bpm)) => bpm,
        None => s,
    };
    let bpm: u16 = bpm_part.trim().parse().ok()?;
    if bpm == 0 {
        return None;
    }
    Some(bpm)
}

/// Split a V: body into id and optional name="..." attribute
fn parse_voice_body(body: &str) -> (String, Option<String>) {
    let mut parts = body.splitn(2, char::is_whitespace);
    let id = parts.next().unwrap_or("").to_string();
    let rest = parts.next().unwrap_or("");

    let name = rest.find("name=\"").and_then(|start| {
        let after = &rest[start + 6..];
        after.find('"').map(|end| after[..end].to_string())
    });

    (id, name)
}
