//! The MusicDocument intermediate representation
//!
//! Every encoder (MIDI, PDF, MEI) consumes this structure and nothing else.
//! A document is rebuilt wholesale from a Part's notation text on every
//! successful parse; it is never patched incrementally and never persisted.
//!
//! Durations are exact fractions of a whole note, so `1/8` is an eighth
//! note regardless of meter and a dotted quarter is `3/8`.

use num_rational::Ratio;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::pitch::{Key, Pitch};

/// Duration as a fraction of a whole note
pub type Dur = Ratio<u32>;

/// The closed set of time signatures the pipeline accepts
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeSignature {
    TwoFour,
    ThreeFour,
    FourFour,
    TwoTwo,
    ThreeEight,
    SixEight,
    NineEight,
    TwelveEight,
}

static SUPPORTED_METERS: Lazy<BTreeMap<&'static str, TimeSignature>> = Lazy::new(|| {
    BTreeMap::from([
        ("2/4", TimeSignature::TwoFour),
        ("3/4", TimeSignature::ThreeFour),
        ("4/4", TimeSignature::FourFour),
        ("2/2", TimeSignature::TwoTwo),
        ("3/8", TimeSignature::ThreeEight),
        ("6/8", TimeSignature::SixEight),
        ("9/8", TimeSignature::NineEight),
        ("12/8", TimeSignature::TwelveEight),
    ])
});

impl TimeSignature {
    pub fn numerator(self) -> u8 {
        match self {
            TimeSignature::TwoFour | TimeSignature::TwoTwo => 2,
            TimeSignature::ThreeFour | TimeSignature::ThreeEight => 3,
            TimeSignature::FourFour => 4,
            TimeSignature::SixEight => 6,
            TimeSignature::NineEight => 9,
            TimeSignature::TwelveEight => 12,
        }
    }

    pub fn denominator(self) -> u8 {
        match self {
            TimeSignature::TwoTwo => 2,
            TimeSignature::TwoFour | TimeSignature::ThreeFour | TimeSignature::FourFour => 4,
            TimeSignature::ThreeEight
            | TimeSignature::SixEight
            | TimeSignature::NineEight
            | TimeSignature::TwelveEight => 8,
        }
    }

    /// Nominal measure length as a fraction of a whole note
    pub fn measure_duration(self) -> Dur {
        Ratio::new(self.numerator() as u32, self.denominator() as u32)
    }

    /// The meter strings accepted by [`TimeSignature::from_str`]
    pub fn supported() -> impl Iterator<Item = &'static str> {
        SUPPORTED_METERS.keys().copied()
    }
}

impl FromStr for TimeSignature {
    type Err = UnsupportedMeter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_METERS
            .get(s.trim())
            .copied()
            .ok_or_else(|| UnsupportedMeter(s.trim().to_string()))
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator(), self.denominator())
    }
}

/// Meter string outside the supported set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported time signature: {0}")]
pub struct UnsupportedMeter(pub String);

/// Score-level attributes shared by all voices
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ScoreAttributes {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub key: Key,
    pub meter: TimeSignature,
    /// Beats per minute
    pub tempo: u16,
    /// Pickup (anacrusis) beat count, carried through from the Capsule
    pub pickup: u8,
    /// ABC L: field; the duration one bare note letter stands for
    pub unit_note_length: Dur,
}

impl Default for ScoreAttributes {
    fn default() -> Self {
        ScoreAttributes {
            title: None,
            composer: None,
            key: Key::default(),
            meter: TimeSignature::FourFour,
            tempo: 120,
            pickup: 0,
            unit_note_length: Ratio::new(1, 8),
        }
    }
}

/// One musical event in a voice: a pitched note or a rest
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum EventKind {
    Note(Pitch),
    Rest,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub duration: Dur,
}

impl Event {
    pub fn note(pitch: Pitch, duration: Dur) -> Self {
        Event { kind: EventKind::Note(pitch), duration }
    }

    pub fn rest(duration: Dur) -> Self {
        Event { kind: EventKind::Rest, duration }
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.kind, EventKind::Rest)
    }
}

/// Events between two barlines
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Measure {
    pub events: Vec<Event>,
}

impl Measure {
    pub fn duration(&self) -> Dur {
        self.events.iter().map(|e| e.duration).sum()
    }
}

/// One voice: an ordered sequence of events, grouped into measures
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Voice {
    /// Voice id from the V: declaration (e.g., "1", "2")
    pub id: String,
    /// Optional display name (V:1 name="Voice 1")
    pub label: Option<String>,
    pub measures: Vec<Measure>,
}

impl Voice {
    pub fn new(id: impl Into<String>) -> Self {
        Voice { id: id.into(), label: None, measures: Vec::new() }
    }

    /// Flat, ordered view over all events of the voice
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.measures.iter().flat_map(|m| m.events.iter())
    }

    pub fn event_count(&self) -> usize {
        self.measures.iter().map(|m| m.events.len()).sum()
    }

    /// Total notated duration in whole notes
    pub fn total_duration(&self) -> Dur {
        self.measures.iter().map(|m| m.duration()).sum()
    }
}

/// The parsed in-memory score all encoders agree on
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MusicDocument {
    pub attributes: ScoreAttributes,
    /// Presentation order; all voices share tick origin 0
    pub voices: Vec<Voice>,
}

impl MusicDocument {
    /// True when no voice carries any event
    pub fn is_empty(&self) -> bool {
        self.voices.iter().all(|v| v.event_count() == 0)
    }

    /// Largest measure count across voices; shorter voices pad with
    /// empty measures during encoding
    pub fn measure_count(&self) -> usize {
        self.voices.iter().map(|v| v.measures.len()).max().unwrap_or(0)
    }

    /// Longest voice duration in whole notes
    pub fn total_duration(&self) -> Dur {
        self.voices
            .iter()
            .map(|v| v.total_duration())
            .max()
            .unwrap_or_else(|| Ratio::new(0, 1))
    }
}
