//! Timeline → Standard MIDI File (SMF) Format 1
//!
//! Track 0 carries the tempo and time-signature map; every voice gets its
//! own track. Events are assembled at absolute ticks, sorted, then
//! rewritten as delta times.

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use super::{assign_channel, Result, Timeline, TimelineError, DEFAULT_PROGRAM, DEFAULT_VELOCITY};

/// Serialize a timeline as SMF bytes into `out`
pub fn write_smf(timeline: &Timeline, out: &mut Vec<u8>) -> Result<()> {
    let mut tracks: Vec<Track> = Vec::new();
    tracks.push(build_conductor_track(timeline));
    for voice in 0..timeline.voice_labels.len() {
        tracks.push(build_voice_track(timeline, voice));
    }

    let smf = Smf {
        header: Header {
            format: Format::Parallel,
            timing: Timing::Metrical(timeline.ppq.into()),
        },
        tracks,
    };

    smf.write(out)
        .map_err(|e| TimelineError::Write(e.to_string()))?;
    Ok(())
}

fn build_conductor_track<'a>(timeline: &Timeline) -> Track<'a> {
    let mut events = Vec::new();

    let microseconds_per_quarter = 60_000_000 / timeline.tempo.max(1) as u32;
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(microseconds_per_quarter.into())),
    });

    // Denominator as a power of two (4 -> 2, 8 -> 3)
    let denominator_power = (timeline.meter.denominator() as f32).log2() as u8;
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
            timeline.meter.numerator(),
            denominator_power,
            24, // MIDI clocks per metronome click
            8,  // 32nd notes per quarter note
        )),
    });

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

fn build_voice_track<'a>(timeline: &'a Timeline, voice: usize) -> Track<'a> {
    let mut events = Vec::new();
    let channel = assign_channel(voice);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(
            timeline.voice_labels[voice].as_bytes(),
        )),
    });
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Midi {
            channel: channel.into(),
            message: MidiMessage::ProgramChange { program: DEFAULT_PROGRAM.into() },
        },
    });

    // Note events at absolute ticks first
    for event in timeline.voice_events(voice) {
        events.push(TrackEvent {
            delta: (event.start_tick as u32).into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: event.pitch.into(),
                    vel: DEFAULT_VELOCITY.into(),
                },
            },
        });
        events.push(TrackEvent {
            delta: ((event.start_tick + event.dur_ticks) as u32).into(),
            kind: TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff { key: event.pitch.into(), vel: 0.into() },
            },
        });
    }

    events.sort_by_key(|e| e.delta.as_int());
    convert_to_delta_times(&mut events);

    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

/// Rewrite absolute tick times as deltas from the previous event
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        event.delta = current_tick.saturating_sub(prev_tick).into();
        prev_tick = current_tick;
    }
}
