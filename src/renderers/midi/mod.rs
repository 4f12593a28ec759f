//! MIDI encoding: MusicDocument → event timeline → Standard MIDI File
//!
//! The timeline is the single source of truth for playback: the same
//! ordered event list drives an interactive player and serializes to the
//! downloadable SMF, so what is heard always matches what is downloaded.

mod smf;
mod timeline;

pub use smf::write_smf;
pub use timeline::{encode, Timeline, TimelineEvent};

use thiserror::Error;

/// Default MIDI velocity (1-127, where 64 is "normal")
pub const DEFAULT_VELOCITY: u8 = 64;

/// Default MIDI program (0 = Acoustic Grand Piano in General MIDI)
pub const DEFAULT_PROGRAM: u8 = 0;

/// Default ticks per quarter note
pub const DEFAULT_PPQ: u16 = 480;

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("malformed document: {0}")]
    MalformedDocument(String),
    #[error("midi write error: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, TimelineError>;

/// Encode a document straight to SMF bytes
pub fn to_smf(doc: &crate::models::MusicDocument, ppq: u16) -> Result<Vec<u8>> {
    let timeline = encode(doc, ppq)?;
    let mut out = Vec::new();
    write_smf(&timeline, &mut out)?;
    Ok(out)
}

/// Assign a MIDI channel from a voice index, skipping the drum channel 9
pub fn assign_channel(voice_index: usize) -> u8 {
    let channel = voice_index % 16;
    if channel >= 9 {
        ((channel + 1) % 16) as u8
    } else {
        channel as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_channel() {
        assert_eq!(assign_channel(0), 0);
        assert_eq!(assign_channel(8), 8);
        assert_eq!(assign_channel(9), 10);
        assert_eq!(assign_channel(15), 0);
    }
}
