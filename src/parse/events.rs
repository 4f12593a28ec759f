//! Event-line parsing: notes, rests, durations, barlines
//!
//! One body line holds bar-separated event sequences for a single voice.
//! Explicit accidentals override the key signature and persist for the
//! same letter-and-octave until the next barline.

use num_rational::Ratio;
use std::collections::HashMap;

use super::ParseError;
use crate::models::{Dur, Event, Key, Measure, Pitch, Step};

/// Character scanner with 1-based column tracking
struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col_offset: usize,
    src: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, line: usize, col_offset: usize) -> Self {
        Scanner { chars: src.chars().collect(), pos: 0, line, col_offset, src }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, at: usize, reason: impl Into<String>) -> ParseError {
        ParseError::new(self.line, self.col_offset + at, reason)
    }
}

/// Parse one voice line into measures
///
/// `col_offset` is the 1-based column at which `src` starts in the
/// original line, so error positions stay meaningful after an inline
/// `[V:n]` prefix has been stripped.
pub fn parse_event_line(
    src: &str,
    line: usize,
    col_offset: usize,
    key: &Key,
    unit: Dur,
) -> Result<Vec<Measure>, ParseError> {
    let mut scanner = Scanner::new(src, line, col_offset - 1);
    let mut measures: Vec<Measure> = Vec::new();
    let mut current = Measure::default();
    // Explicit accidentals active for the rest of the measure
    let mut overrides: HashMap<(Step, i8), i8> = HashMap::new();
    let mut last_was_note = false;

    while let Some(c) = scanner.peek() {
        let at = scanner.pos;

        if c.is_whitespace() {
            scanner.bump();
            continue;
        }

        if c == '|' {
            scanner.bump();
            // Multi-char barlines: "||", "|:", "|]"
            let _ = scanner.eat('|') || scanner.eat(':') || scanner.eat(']');
            close_measure(&mut measures, &mut current, &mut overrides);
            last_was_note = false;
            continue;
        }

        if c == ':' {
            scanner.bump();
            if !scanner.eat('|') {
                return Err(scanner.error(at + 1, "expected '|' after ':'"));
            }
            close_measure(&mut measures, &mut current, &mut overrides);
            last_was_note = false;
            continue;
        }

        if c == '-' {
            // Tie; playback joins abutting equal pitches, so the marker
            // itself carries no event
            if !last_was_note {
                return Err(scanner.error(at + 1, "tie '-' must follow a note"));
            }
            scanner.bump();
            continue;
        }

        if c == 'z' || c == 'x' {
            scanner.bump();
            let duration = unit * parse_multiplier(&mut scanner);
            current.events.push(Event::rest(duration));
            last_was_note = false;
            continue;
        }

        // Accidental prefix, if any, must be followed by a pitch letter
        let explicit_alter = parse_accidental(&mut scanner);
        let c = match scanner.peek() {
            Some(c) => c,
            None => return Err(scanner.error(at + 1, "accidental without a following note")),
        };

        if let Some(step) = Step::from_letter(c) {
            scanner.bump();
            // Uppercase letters sit in octave 4, lowercase one octave up
            let mut octave: i8 = if c.is_ascii_uppercase() { 4 } else { 5 };
            loop {
                if scanner.eat('\'') {
                    octave += 1;
                } else if scanner.eat(',') {
                    octave -= 1;
                } else {
                    break;
                }
            }

            let alter = match explicit_alter {
                Some(a) => {
                    overrides.insert((step, octave), a);
                    a
                }
                None => overrides
                    .get(&(step, octave))
                    .copied()
                    .unwrap_or_else(|| key.alteration_for(step)),
            };

            let duration = unit * parse_multiplier(&mut scanner);
            current.events.push(Event::note(Pitch::new(step, alter, octave), duration));
            last_was_note = true;
            continue;
        }

        if explicit_alter.is_some() {
            return Err(scanner.error(scanner.pos + 1, format!("expected a note after accidental, found {:?}", c)));
        }

        return Err(scanner.error(at + 1, format!("unexpected character {:?}", c)));
    }

    close_measure(&mut measures, &mut current, &mut overrides);
    log::trace!("line {}: {} measure(s) from {:?}", line, measures.len(), scanner.src);
    Ok(measures)
}

fn close_measure(
    measures: &mut Vec<Measure>,
    current: &mut Measure,
    overrides: &mut HashMap<(Step, i8), i8>,
) {
    overrides.clear();
    if !current.events.is_empty() {
        measures.push(std::mem::take(current));
    }
}

/// `^` sharp, `^^` double sharp, `_` flat, `__` double flat, `=` natural
fn parse_accidental(scanner: &mut Scanner<'_>) -> Option<i8> {
    match scanner.peek() {
        Some('^') => {
            scanner.bump();
            Some(if scanner.eat('^') { 2 } else { 1 })
        }
        Some('_') => {
            scanner.bump();
            Some(if scanner.eat('_') { -2 } else { -1 })
        }
        Some('=') => {
            scanner.bump();
            Some(0)
        }
        _ => None,
    }
}

/// Duration multiplier suffix: "2", "3/2", "/2", "/" (= /2), "//" (= /4)
fn parse_multiplier(scanner: &mut Scanner<'_>) -> Dur {
    let mut numerator: u32 = match parse_digits(scanner) {
        Some(n) => n,
        None => 1,
    };
    let mut denominator: u32 = 1;
    while scanner.eat('/') {
        match parse_digits(scanner) {
            Some(d) if d > 0 => denominator = denominator.saturating_mul(d),
            _ => denominator = denominator.saturating_mul(2),
        }
    }
    if numerator == 0 {
        numerator = 1;
    }
    Ratio::new(numerator, denominator)
}

fn parse_digits(scanner: &mut Scanner<'_>) -> Option<u32> {
    let mut value: Option<u32> = None;
    while let Some(c) = scanner.peek() {
        let Some(d) = c.to_digit(10) else { break };
        scanner.bump();
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(d));
    }
    value
}
