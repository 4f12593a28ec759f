//! The MEI conversion engine
//!
//! Construction precomputes the duration and accidental tables the
//! converter consults per event; that bootstrap is the expensive step, so
//! the engine lives behind the process-wide owner in the parent module
//! and is built at most once. The engine keeps internal conversion state
//! (id counters, run statistics) and is not reentrant: callers go through
//! the mutex-guarded accessor, never a raw static.

use num_rational::Ratio;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};
use quick_xml::Writer;
use std::collections::HashMap;

use super::MeiError;
use crate::models::{Dur, EventKind, Measure, MusicDocument, Pitch};

const MEI_NS: &str = "http://www.music-encoding.org/ns/mei";

/// MEI @dur base value plus augmentation dots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeiDuration {
    pub base: u8,
    pub dots: u8,
}

pub struct MeiEngine {
    /// Whole-note fraction → (@dur, @dots), precomputed at bootstrap
    duration_table: HashMap<Dur, MeiDuration>,
    /// Total conversions performed by this engine instance
    conversions: u64,
}

impl MeiEngine {
    /// Bootstrap the engine
    ///
    /// Builds every representable (base, dots) duration up to two dots
    /// and checks the table for collisions; a collision means the tables
    /// are unusable and surfaces as [`MeiError::Init`].
    pub fn new() -> Result<Self, MeiError> {
        let mut duration_table = HashMap::new();
        for power in 0..=5u32 {
            let base = 2u32.pow(power) as u8;
            for dots in 0..=2u32 {
                // base note * (2 - 1/2^dots) = base * (2^(dots+1) - 1) / 2^(dots+1)...
                // expressed against the whole note:
                let plain = Ratio::new(1u32, 2u32.pow(power));
                let dotted = plain * Ratio::new(2u32.pow(dots + 1) - 1, 2u32.pow(dots));
                let entry = MeiDuration { base, dots: dots as u8 };
                if let Some(previous) = duration_table.insert(dotted, entry) {
                    return Err(MeiError::Init(format!(
                        "duration table collision: {:?} vs {:?}",
                        previous, entry
                    )));
                }
            }
        }
        log::info!("MEI engine bootstrapped ({} durations)", duration_table.len());
        Ok(MeiEngine { duration_table, conversions: 0 })
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    /// Convert a document to an MEI XML string
    ///
    /// Ids restart per conversion so identical input yields structurally
    /// identical output.
    pub fn convert(&mut self, doc: &MusicDocument) -> Result<String, MeiError> {
        self.conversions += 1;
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer.write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut mei = BytesStart::new("mei");
        mei.push_attribute(("xmlns", MEI_NS));
        mei.push_attribute(("meiversion", "4.0.1"));
        writer.write_event(XmlEvent::Start(mei))?;

        self.write_header(&mut writer, doc)?;
        self.write_music(&mut writer, doc)?;

        writer.write_event(XmlEvent::End(BytesEnd::new("mei")))?;

        // The writer only ever receives valid UTF-8
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write_header(
        &self,
        writer: &mut Writer<Vec<u8>>,
        doc: &MusicDocument,
    ) -> Result<(), MeiError> {
        writer.write_event(XmlEvent::Start(BytesStart::new("meiHead")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("fileDesc")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("titleStmt")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("title")))?;
        if let Some(title) = &doc.attributes.title {
            writer.write_event(XmlEvent::Text(BytesText::new(title)))?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("title")))?;
        if let Some(composer) = &doc.attributes.composer {
            writer.write_event(XmlEvent::Start(BytesStart::new("composer")))?;
            writer.write_event(XmlEvent::Text(BytesText::new(composer)))?;
            writer.write_event(XmlEvent::End(BytesEnd::new("composer")))?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("titleStmt")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("fileDesc")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("meiHead")))?;
        Ok(())
    }

    fn write_music(
        &self,
        writer: &mut Writer<Vec<u8>>,
        doc: &MusicDocument,
    ) -> Result<(), MeiError> {
        writer.write_event(XmlEvent::Start(BytesStart::new("music")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("body")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("mdiv")))?;
        writer.write_event(XmlEvent::Start(BytesStart::new("score")))?;

        self.write_score_def(writer, doc)?;

        writer.write_event(XmlEvent::Start(BytesStart::new("section")))?;
        for measure_idx in 0..doc.measure_count() {
            let mut measure_el = BytesStart::new("measure");
            measure_el.push_attribute(("n", (measure_idx + 1).to_string().as_str()));
            writer.write_event(XmlEvent::Start(measure_el))?;

            for (voice_idx, voice) in doc.voices.iter().enumerate() {
                let mut staff = BytesStart::new("staff");
                staff.push_attribute(("n", (voice_idx + 1).to_string().as_str()));
                writer.write_event(XmlEvent::Start(staff))?;

                let mut layer = BytesStart::new("layer");
                layer.push_attribute(("n", "1"));
                writer.write_event(XmlEvent::Start(layer))?;

                if let Some(measure) = voice.measures.get(measure_idx) {
                    self.write_layer_events(writer, measure)?;
                }

                writer.write_event(XmlEvent::End(BytesEnd::new("layer")))?;
                writer.write_event(XmlEvent::End(BytesEnd::new("staff")))?;
            }

            writer.write_event(XmlEvent::End(BytesEnd::new("measure")))?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("section")))?;

        writer.write_event(XmlEvent::End(BytesEnd::new("score")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("mdiv")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("body")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("music")))?;
        Ok(())
    }

    fn write_score_def(
        &self,
        writer: &mut Writer<Vec<u8>>,
        doc: &MusicDocument,
    ) -> Result<(), MeiError> {
        let attrs = &doc.attributes;
        let mut score_def = BytesStart::new("scoreDef");
        let fifths = attrs.key.fifths();
        let keysig = match fifths.cmp(&0) {
            std::cmp::Ordering::Greater => format!("{}s", fifths),
            std::cmp::Ordering::Less => format!("{}f", -fifths),
            std::cmp::Ordering::Equal => "0".to_string(),
        };
        score_def.push_attribute(("key.sig", keysig.as_str()));
        score_def.push_attribute(("meter.count", attrs.meter.numerator().to_string().as_str()));
        score_def.push_attribute(("meter.unit", attrs.meter.denominator().to_string().as_str()));
        writer.write_event(XmlEvent::Start(score_def))?;

        writer.write_event(XmlEvent::Start(BytesStart::new("staffGrp")))?;
        for (voice_idx, voice) in doc.voices.iter().enumerate() {
            let mut staff_def = BytesStart::new("staffDef");
            staff_def.push_attribute(("n", (voice_idx + 1).to_string().as_str()));
            staff_def.push_attribute(("lines", "5"));
            if let Some(label) = &voice.label {
                staff_def.push_attribute(("label", label.as_str()));
            }
            writer.write_event(XmlEvent::Empty(staff_def))?;
        }
        writer.write_event(XmlEvent::End(BytesEnd::new("staffGrp")))?;
        writer.write_event(XmlEvent::End(BytesEnd::new("scoreDef")))?;
        Ok(())
    }

    fn write_layer_events(
        &self,
        writer: &mut Writer<Vec<u8>>,
        measure: &Measure,
    ) -> Result<(), MeiError> {
        for event in &measure.events {
            let mei_dur = self.mei_duration(event.duration);
            match event.kind {
                EventKind::Note(pitch) => {
                    let mut note = BytesStart::new("note");
                    note.push_attribute(("pname", pitch.step.pname().to_string().as_str()));
                    note.push_attribute(("oct", pitch.octave.to_string().as_str()));
                    note.push_attribute(("dur", mei_dur.base.to_string().as_str()));
                    if mei_dur.dots > 0 {
                        note.push_attribute(("dots", mei_dur.dots.to_string().as_str()));
                    }
                    if let Some(accid) = accid_attr(pitch) {
                        note.push_attribute(("accid", accid));
                    }
                    writer.write_event(XmlEvent::Empty(note))?;
                }
                EventKind::Rest => {
                    let mut rest = BytesStart::new("rest");
                    rest.push_attribute(("dur", mei_dur.base.to_string().as_str()));
                    if mei_dur.dots > 0 {
                        rest.push_attribute(("dots", mei_dur.dots.to_string().as_str()));
                    }
                    writer.write_event(XmlEvent::Empty(rest))?;
                }
            }
        }
        Ok(())
    }

    /// Look up the MEI @dur/@dots pair for a duration
    ///
    /// Durations outside the dotted-binary set (tuplets are out of scope)
    /// fall back to the nearest shorter base value.
    pub fn mei_duration(&self, duration: Dur) -> MeiDuration {
        if let Some(found) = self.duration_table.get(&duration) {
            return *found;
        }
        let value = *duration.numer() as f64 / *duration.denom() as f64;
        let mut best = MeiDuration { base: 4, dots: 0 };
        let mut best_gap = f64::MAX;
        for (dur, entry) in &self.duration_table {
            let entry_value = *dur.numer() as f64 / *dur.denom() as f64;
            let gap = (value - entry_value).abs();
            if gap < best_gap || (gap == best_gap && entry.dots < best.dots) {
                best_gap = gap;
                best = *entry;
            }
        }
        log::warn!("no exact MEI duration for {}; using dur={} dots={}", duration, best.base, best.dots);
        best
    }
}

/// MEI @accid value for an explicit alteration
fn accid_attr(pitch: Pitch) -> Option<&'static str> {
    match pitch.alter {
        2 => Some("ss"),
        1 => Some("s"),
        -1 => Some("f"),
        -2 => Some("ff"),
        _ => None,
    }
}
