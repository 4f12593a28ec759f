//! MusicDocument → timed event timeline
//!
//! Pure function of the document and its metadata. Each voice is walked
//! in order with its own tick cursor; rests advance the cursor without
//! emitting events, so all voices stay aligned to the common origin 0.

use num_rational::Ratio;

use super::{Result, TimelineError};
use crate::models::{EventKind, MusicDocument, TimeSignature};

/// One playable event: (voice, start tick, duration ticks, pitch)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    /// Index of the owning voice in document order
    pub voice: usize,
    pub start_tick: u64,
    pub dur_ticks: u64,
    /// MIDI note number 0-127
    pub pitch: u8,
}

/// The ordered playback timeline backing both the player and the SMF
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    /// Ticks per quarter note
    pub ppq: u16,
    /// Beats per minute
    pub tempo: u16,
    pub meter: TimeSignature,
    /// Sorted by (start_tick, voice); within one voice, notated order
    pub events: Vec<TimelineEvent>,
    /// One label per voice, parallel to voice indices
    pub voice_labels: Vec<String>,
}

impl Timeline {
    /// Events of a single voice, in playback order
    pub fn voice_events(&self, voice: usize) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter().filter(move |e| e.voice == voice)
    }

    /// Tick at which the last event ends
    pub fn duration_ticks(&self) -> u64 {
        self.events
            .iter()
            .map(|e| e.start_tick + e.dur_ticks)
            .max()
            .unwrap_or(0)
    }
}

/// Encode a document into a timeline at the given resolution
///
/// Durations are exact whole-note fractions; a quarter note is `ppq`
/// ticks, so an event of duration `n/d` whole notes spans
/// `n * 4 * ppq / d` ticks.
pub fn encode(doc: &MusicDocument, ppq: u16) -> Result<Timeline> {
    if ppq == 0 {
        return Err(TimelineError::MalformedDocument(
            "ticks-per-quarter-note must be positive".to_string(),
        ));
    }

    let mut events = Vec::new();
    for (voice_idx, voice) in doc.voices.iter().enumerate() {
        let mut current_tick = 0u64;
        for event in voice.events() {
            let dur_ticks = duration_to_ticks(event.duration, ppq)?;
            match event.kind {
                EventKind::Rest => {
                    current_tick += dur_ticks;
                }
                EventKind::Note(pitch) => {
                    events.push(TimelineEvent {
                        voice: voice_idx,
                        start_tick: current_tick,
                        dur_ticks,
                        pitch: pitch.midi_number(),
                    });
                    current_tick += dur_ticks;
                }
            }
        }
    }

    consolidate_ties(&mut events);
    events.sort_by_key(|e| (e.start_tick, e.voice));

    let voice_labels = doc
        .voices
        .iter()
        .enumerate()
        .map(|(i, v)| v.label.clone().unwrap_or_else(|| format!("Voice {}", i + 1)))
        .collect();

    log::debug!(
        "timeline: {} event(s) across {} voice(s) at ppq {}",
        events.len(),
        doc.voices.len(),
        ppq
    );

    Ok(Timeline {
        ppq,
        tempo: doc.attributes.tempo,
        meter: doc.attributes.meter,
        events,
        voice_labels,
    })
}

/// Whole-note fraction → ticks at ppq resolution
fn duration_to_ticks(duration: Ratio<u32>, ppq: u16) -> Result<u64> {
    if *duration.numer() == 0 {
        return Err(TimelineError::MalformedDocument(
            "event with zero duration".to_string(),
        ));
    }
    let num = *duration.numer() as u64 * 4 * ppq as u64;
    let den = *duration.denom() as u64;
    // Round to nearest tick
    Ok((num + den / 2) / den)
}

/// Merge abutting equal-pitch notes of the same voice into one long note
///
/// MIDI has no tie concept; tied notes are a single note-on/note-off pair.
fn consolidate_ties(events: &mut Vec<TimelineEvent>) {
    let mut i = 0;
    while i < events.len() {
        let mut j = i + 1;
        while j < events.len() {
            if events[j].voice == events[i].voice
                && events[j].pitch == events[i].pitch
                && events[j].start_tick == events[i].start_tick + events[i].dur_ticks
            {
                events[i].dur_ticks += events[j].dur_ticks;
                events.remove(j);
            } else {
                break;
            }
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Event, Measure, Pitch, Step, Voice};

    fn doc_with_voice(events: Vec<Event>) -> MusicDocument {
        let mut voice = Voice::new("1");
        voice.measures.push(Measure { events });
        MusicDocument { attributes: Default::default(), voices: vec![voice] }
    }

    #[test]
    fn test_duration_to_ticks() {
        let ppq = 480;
        assert_eq!(duration_to_ticks(Ratio::new(1, 4), ppq).unwrap(), 480); // quarter
        assert_eq!(duration_to_ticks(Ratio::new(1, 8), ppq).unwrap(), 240); // eighth
        assert_eq!(duration_to_ticks(Ratio::new(1, 1), ppq).unwrap(), 1920); // whole
        assert_eq!(duration_to_ticks(Ratio::new(3, 8), ppq).unwrap(), 720); // dotted quarter
    }

    #[test]
    fn test_zero_duration_rejected() {
        let doc = doc_with_voice(vec![Event::note(
            Pitch::new(Step::C, 0, 4),
            Ratio::new(0, 1),
        )]);
        assert!(matches!(
            encode(&doc, 480),
            Err(TimelineError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_rests_advance_without_events() {
        let doc = doc_with_voice(vec![
            Event::rest(Ratio::new(1, 4)),
            Event::note(Pitch::new(Step::E, 0, 4), Ratio::new(1, 4)),
        ]);
        let timeline = encode(&doc, 480).unwrap();
        assert_eq!(timeline.events.len(), 1);
        assert_eq!(timeline.events[0].start_tick, 480);
        assert_eq!(timeline.events[0].pitch, 64);
    }

    #[test]
    fn test_consolidate_ties() {
        let mut events = vec![
            TimelineEvent { voice: 0, start_tick: 0, dur_ticks: 480, pitch: 62 },
            TimelineEvent { voice: 0, start_tick: 480, dur_ticks: 240, pitch: 62 },
            TimelineEvent { voice: 0, start_tick: 720, dur_ticks: 480, pitch: 64 },
        ];
        consolidate_ties(&mut events);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].dur_ticks, 720);
    }

    #[test]
    fn test_ties_not_merged_across_voices() {
        let mut events = vec![
            TimelineEvent { voice: 0, start_tick: 0, dur_ticks: 480, pitch: 62 },
            TimelineEvent { voice: 1, start_tick: 480, dur_ticks: 240, pitch: 62 },
        ];
        consolidate_ties(&mut events);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_voices_share_origin() {
        let mut v1 = Voice::new("1");
        v1.measures.push(Measure {
            events: vec![Event::note(Pitch::new(Step::C, 0, 4), Ratio::new(1, 4))],
        });
        let mut v2 = Voice::new("2");
        v2.measures.push(Measure {
            events: vec![Event::note(Pitch::new(Step::G, 0, 4), Ratio::new(1, 4))],
        });
        let doc = MusicDocument { attributes: Default::default(), voices: vec![v1, v2] };
        let timeline = encode(&doc, 480).unwrap();
        assert!(timeline.events.iter().all(|e| e.start_tick == 0));
        assert_eq!(timeline.voice_events(0).count(), 1);
        assert_eq!(timeline.voice_events(1).count(), 1);
    }
}
