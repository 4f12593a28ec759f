//! ABC notation parser
//!
//! Turns notation text into a [`MusicDocument`] or a typed [`ParseError`].
//! The grammar is the ABC subset the pipeline exchanges: a header block
//! (X/T/C/M/L/Q/K fields and V: voice declarations) followed by
//! voice-prefixed event lines of bar-separated notes and rests.
//!
//! Parsing is side-effect-free and never panics on any input; every
//! failure carries a line/column position and a human-readable reason.

pub mod events;
pub mod header;

use crate::models::{MusicDocument, ScoreAttributes, Voice};
use header::HeaderField;

/// Malformed notation, with the position that stopped the parser
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}, column {column}: {reason}")]
pub struct ParseError {
    /// 1-based source line
    pub line: usize,
    /// 1-based source column
    pub column: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, reason: impl Into<String>) -> Self {
        ParseError { line, column, reason: reason.into() }
    }
}

/// Parse notation text into a MusicDocument
///
/// Header fields are read until the `K:` key field, which opens the tune
/// body. Body lines may select their voice inline (`[V:1] ...`), switch
/// the current voice (`V:2`), or continue the current voice. A document
/// with no body lines parses to an empty score.
pub fn parse(text: &str) -> Result<MusicDocument, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::new(1, 1, "empty notation source"));
    }

    let mut attrs = ScoreAttributes::default();
    let mut voices: Vec<Voice> = Vec::new();
    let mut in_header = true;
    let mut current_voice: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end();
        if line.trim().is_empty() || line.trim_start().starts_with('%') {
            continue;
        }

        if in_header {
            match header::parse_header_line(line, line_no)? {
                Some(HeaderField::Index(_)) => {}
                Some(HeaderField::Title(t)) => attrs.title = Some(t),
                Some(HeaderField::Composer(c)) => attrs.composer = Some(c),
                Some(HeaderField::Meter(m)) => attrs.meter = m,
                Some(HeaderField::UnitLength(l)) => attrs.unit_note_length = l,
                Some(HeaderField::Tempo(t)) => attrs.tempo = t,
                Some(HeaderField::Key(k)) => {
                    attrs.key = k;
                    // K: is the last header field; the body starts here
                    in_header = false;
                }
                Some(HeaderField::Voice { id, name }) => {
                    let v = ensure_voice(&mut voices, &id);
                    if name.is_some() {
                        voices[v].label = name;
                    }
                    current_voice = Some(v);
                }
                Some(HeaderField::Ignored) => {}
                None => {
                    return Err(ParseError::new(
                        line_no,
                        1,
                        format!("expected a header field before K:, found {:?}", line.trim()),
                    ));
                }
            }
            continue;
        }

        // Tune body
        if let Some((voice_id, rest, col)) = inline_voice_prefix(line, line_no)? {
            let v = ensure_voice(&mut voices, &voice_id);
            current_voice = Some(v);
            let measures =
                events::parse_event_line(rest, line_no, col, &attrs.key, attrs.unit_note_length)?;
            voices[v].measures.extend(measures);
            continue;
        }

        if let Some(field) = header::parse_header_line(line, line_no)? {
            match field {
                HeaderField::Voice { id, name } => {
                    let v = ensure_voice(&mut voices, &id);
                    if name.is_some() {
                        voices[v].label = name;
                    }
                    current_voice = Some(v);
                }
                other => {
                    // Mid-tune info fields (T:, Q:, ...) carry no events
                    log::debug!("ignoring mid-tune field at line {}: {:?}", line_no, other);
                }
            }
            continue;
        }

        let v = match current_voice {
            Some(v) => v,
            None => {
                // Single-voice tunes need no V: declaration
                let v = ensure_voice(&mut voices, "1");
                current_voice = Some(v);
                v
            }
        };
        let measures =
            events::parse_event_line(line, line_no, 1, &attrs.key, attrs.unit_note_length)?;
        voices[v].measures.extend(measures);
    }

    let doc = MusicDocument { attributes: attrs, voices };
    log::debug!(
        "parsed document: {} voice(s), {} measure(s)",
        doc.voices.len(),
        doc.measure_count()
    );
    Ok(doc)
}

/// Find or create a voice, preserving first-appearance order
fn ensure_voice(voices: &mut Vec<Voice>, id: &str) -> usize {
    if let Some(pos) = voices.iter().position(|v| v.id == id) {
        return pos;
    }
    voices.push(Voice::new(id));
    voices.len() - 1
}

/// Split an inline `[V:id]` prefix off a body line
///
/// Returns (voice id, remainder, 1-based column where the remainder starts).
fn inline_voice_prefix<'a>(
    line: &'a str,
    line_no: usize,
) -> Result<Option<(String, &'a str, usize)>, ParseError> {
    let trimmed = line.trim_start();
    let lead = line.len() - trimmed.len();
    let Some(rest) = trimmed.strip_prefix("[V:") else {
        return Ok(None);
    };
    let Some(close) = rest.find(']') else {
        return Err(ParseError::new(line_no, lead + 1, "unterminated [V: voice prefix"));
    };
    let id = rest[..close].trim().to_string();
    if id.is_empty() {
        return Err(ParseError::new(line_no, lead + 4, "empty voice id in [V:] prefix"));
    }
    let consumed = lead + 3 + close + 1;
    Ok(Some((id, &line[consumed..], consumed + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, Mode, Step, TimeSignature};
    use num_rational::Ratio;

    const ROUND: &str = "X: 1\n\
T: Zocharti Loch\n\
C: Jewish Folk Song\n\
M: 4/4\n\
L: 1/8\n\
K: Dm\n\
V:1 name=\"Voice 1\"\n\
V:2 name=\"Voice 2\"\n\
V:3 name=\"Voice 3\"\n\
[V:1] z8 | z8 | z8 | D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 |\n\
[V:2] z8 | D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 | z8 | z8 |\n\
[V:3] D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 | z8 | z8 | z8 |\n";

    #[test]
    fn test_parse_three_voice_round() {
        let doc = parse(ROUND).unwrap();
        assert_eq!(doc.attributes.title.as_deref(), Some("Zocharti Loch"));
        assert_eq!(doc.attributes.meter, TimeSignature::FourFour);
        assert_eq!(doc.attributes.key.mode, Mode::Minor);
        assert_eq!(doc.voices.len(), 3);
        assert_eq!(doc.voices[0].label.as_deref(), Some("Voice 1"));
        for voice in &doc.voices {
            assert_eq!(voice.measures.len(), 7);
            // Every measure fills the 4/4 bar exactly
            for measure in &voice.measures {
                assert_eq!(measure.duration(), Ratio::new(1, 1));
            }
        }
        // Voice 3 opens with the theme, voice 1 with three bars of rest
        assert!(matches!(doc.voices[2].measures[0].events[0].kind, EventKind::Note(_)));
        assert!(doc.voices[0].measures[0].events[0].is_rest());
    }

    #[test]
    fn test_voice_order_is_declaration_order() {
        let doc = parse(ROUND).unwrap();
        let ids: Vec<&str> = doc.voices.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_implicit_single_voice() {
        let doc = parse("X:1\nT:Scale\nM:4/4\nL:1/4\nK:C\nC D E F | G A B c |\n").unwrap();
        assert_eq!(doc.voices.len(), 1);
        assert_eq!(doc.voices[0].id, "1");
        assert_eq!(doc.voices[0].event_count(), 8);
        let last = doc.voices[0].measures[1].events[3];
        match last.kind {
            EventKind::Note(p) => {
                assert_eq!(p.step, Step::C);
                assert_eq!(p.octave, 5); // lowercase c = octave up
            }
            EventKind::Rest => panic!("expected a note"),
        }
    }

    #[test]
    fn test_key_signature_applied() {
        // D major: F and C are sharp by signature
        let doc = parse("X:1\nK:D\nL:1/4\nF C |\n").unwrap();
        let events: Vec<_> = doc.voices[0].events().collect();
        match (events[0].kind, events[1].kind) {
            (EventKind::Note(f), EventKind::Note(c)) => {
                assert_eq!(f.alter, 1);
                assert_eq!(c.alter, 1);
            }
            _ => panic!("expected two notes"),
        }
    }

    #[test]
    fn test_error_carries_position() {
        let err = parse("X:1\nK:C\nC D ? E |\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 5);
        assert!(err.reason.contains('?'));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse("").is_err());
        assert!(parse("   \n\n  ").is_err());
    }

    #[test]
    fn test_garbage_header_is_an_error() {
        let err = parse("this is not abc\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_header_only_is_empty_score() {
        let doc = parse("X:1\nT:Nothing Yet\nM:3/4\nK:G\n").unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.attributes.meter, TimeSignature::ThreeFour);
    }

    #[test]
    fn test_unterminated_voice_prefix() {
        let err = parse("X:1\nK:C\n[V:1 C D |\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.reason.contains("unterminated"));
    }
}
