//! Pitch and key representation
//!
//! Pitches are stored as (step, alteration, octave) in scientific pitch
//! notation (C4 = middle C). Keys carry a tonic and mode and expose the
//! circle-of-fifths signature used to resolve unmarked notes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diatonic step letter (C..B)
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Step {
    /// Chromatic offset from C in semitones
    pub fn semitones(self) -> i16 {
        match self {
            Step::C => 0,
            Step::D => 2,
            Step::E => 4,
            Step::F => 5,
            Step::G => 7,
            Step::A => 9,
            Step::B => 11,
        }
    }

    /// Diatonic index from C (C=0 .. B=6), used for staff positioning
    pub fn diatonic_index(self) -> i16 {
        match self {
            Step::C => 0,
            Step::D => 1,
            Step::E => 2,
            Step::F => 3,
            Step::G => 4,
            Step::A => 5,
            Step::B => 6,
        }
    }

    /// Position on the line of fifths (F=-1, C=0, G=1, D=2, A=3, E=4, B=5)
    fn fifths_index(self) -> i8 {
        match self {
            Step::F => -1,
            Step::C => 0,
            Step::G => 1,
            Step::D => 2,
            Step::A => 3,
            Step::E => 4,
            Step::B => 5,
        }
    }

    pub fn from_letter(c: char) -> Option<Step> {
        match c.to_ascii_uppercase() {
            'A' => Some(Step::A),
            'B' => Some(Step::B),
            'C' => Some(Step::C),
            'D' => Some(Step::D),
            'E' => Some(Step::E),
            'F' => Some(Step::F),
            'G' => Some(Step::G),
            _ => None,
        }
    }

    /// Lowercase letter for MEI @pname
    pub fn pname(self) -> char {
        match self {
            Step::C => 'c',
            Step::D => 'd',
            Step::E => 'e',
            Step::F => 'f',
            Step::G => 'g',
            Step::A => 'a',
            Step::B => 'b',
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pname().to_ascii_uppercase())
    }
}

/// A concrete sounding pitch: step + chromatic alteration + octave
///
/// `alter` is in semitones (-2 = double flat .. 2 = double sharp).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub step: Step,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    pub fn new(step: Step, alter: i8, octave: i8) -> Self {
        Pitch { step, alter, octave }
    }

    /// MIDI note number (0-127, C4 = 60)
    ///
    /// Out-of-range pitches are clamped rather than rejected; MIDI has no
    /// way to express them.
    pub fn midi_number(&self) -> u8 {
        // MIDI note 0 = C-1, so C4 (middle C) = 60
        let semi = self.step.semitones() + self.alter as i16 + (self.octave as i16 + 1) * 12;
        semi.clamp(0, 127) as u8
    }

    /// Diatonic staff position: octave * 7 + step index
    pub fn staff_index(&self) -> i16 {
        self.octave as i16 * 7 + self.step.diatonic_index()
    }
}

/// Major or minor mode; ABC key fields like "Dm" select minor
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Major,
    Minor,
}

/// A key signature: tonic step + tonic alteration + mode
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Key {
    pub tonic: Step,
    pub tonic_alter: i8,
    pub mode: Mode,
}

/// Order in which sharps appear in a signature
const SHARP_ORDER: [Step; 7] = [
    Step::F,
    Step::C,
    Step::G,
    Step::D,
    Step::A,
    Step::E,
    Step::B,
];

/// Order in which flats appear in a signature
const FLAT_ORDER: [Step; 7] = [
    Step::B,
    Step::E,
    Step::A,
    Step::D,
    Step::G,
    Step::C,
    Step::F,
];

impl Key {
    pub fn new(tonic: Step, tonic_alter: i8, mode: Mode) -> Self {
        Key { tonic, tonic_alter, mode }
    }

    /// Parse an ABC key field body: "C", "Dm", "Bb", "F#m", "Amaj", "Emin"
    pub fn parse(s: &str) -> Option<Key> {
        let s = s.trim();
        let mut chars = s.chars();
        let tonic = Step::from_letter(chars.next()?)?;
        let rest: String = chars.collect();
        let mut rest = rest.as_str();

        let tonic_alter = if let Some(r) = rest.strip_prefix('#') {
            rest = r;
            1
        } else if let Some(r) = rest.strip_prefix('b') {
            rest = r;
            -1
        } else {
            0
        };

        let mode = match rest.trim().to_ascii_lowercase().as_str() {
            "" | "maj" | "major" => Mode::Major,
            "m" | "min" | "minor" => Mode::Minor,
            _ => return None,
        };

        Some(Key::new(tonic, tonic_alter, mode))
    }

    /// Signed count of sharps (positive) or flats (negative) in the signature
    pub fn fifths(&self) -> i8 {
        let major_fifths = self.tonic.fifths_index() + 7 * self.tonic_alter;
        match self.mode {
            Mode::Major => major_fifths,
            // Minor key signature = relative major, three fifths down
            Mode::Minor => major_fifths - 3,
        }
    }

    /// Alteration the signature applies to an unmarked note of this step
    pub fn alteration_for(&self, step: Step) -> i8 {
        let fifths = self.fifths();
        if fifths > 0 {
            let n = fifths.min(7) as usize;
            if SHARP_ORDER[..n].contains(&step) {
                return 1;
            }
        } else if fifths < 0 {
            let n = (-fifths).min(7) as usize;
            if FLAT_ORDER[..n].contains(&step) {
                return -1;
            }
        }
        0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tonic)?;
        match self.tonic_alter {
            1 => write!(f, "#")?,
            -1 => write!(f, "b")?,
            _ => {}
        }
        if self.mode == Mode::Minor {
            write!(f, "m")?;
        }
        Ok(())
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::new(Step::C, 0, Mode::Major)
    }
}
