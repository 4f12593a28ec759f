//! Capsule data model
//!
//! A Capsule is one musical work: metadata, an ordered list of notation
//! Parts, and source media references. Metadata field names serialize to
//! the French keys the `capsule.json` archive contract requires.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::document::TimeSignature;
use super::pitch::Key;

/// Validation and mutation errors on the Capsule model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapsuleError {
    #[error("tempo {0} outside supported range 40-240 BPM")]
    TempoOutOfRange(u16),
    #[error("unsupported time signature: {0}")]
    UnsupportedMeter(String),
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error("ticks-per-quarter-note must be positive")]
    InvalidPpq,
    #[error("part file name already exists: {0}")]
    DuplicatePart(String),
    #[error("no such part: {0}")]
    UnknownPart(String),
}

/// Capsule metadata; serialized keys match the archive's capsule.json
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CapsuleMeta {
    #[serde(rename = "titre")]
    pub title: String,
    pub tempo: u16,
    #[serde(rename = "mesure")]
    pub meter: String,
    #[serde(rename = "tonalite")]
    pub key: String,
    pub ppq: u16,
    pub pickup: u8,
    pub version: String,
}

impl CapsuleMeta {
    /// Check the invariants every Capsule must satisfy
    pub fn validate(&self) -> Result<(), CapsuleError> {
        if !(40..=240).contains(&self.tempo) {
            return Err(CapsuleError::TempoOutOfRange(self.tempo));
        }
        TimeSignature::from_str(&self.meter)
            .map_err(|_| CapsuleError::UnsupportedMeter(self.meter.clone()))?;
        Key::parse(&self.key).ok_or_else(|| CapsuleError::UnknownKey(self.key.clone()))?;
        if self.ppq == 0 {
            return Err(CapsuleError::InvalidPpq);
        }
        Ok(())
    }

    /// Title lowercased with whitespace runs collapsed to hyphens
    pub fn slug(&self) -> String {
        self.title
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }
}

/// Kind of attached source media
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Audio,
    Image,
    Text,
    GarageBand,
    Other,
}

/// Reference to a source media file attached to a Capsule
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub content: Option<String>,
}

/// One notation document within a Capsule
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Part {
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub content: String,
}

/// A musical work: metadata + ordered Parts + source references
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Capsule {
    pub id: String,
    pub meta: CapsuleMeta,
    pub parts: Vec<Part>,
    pub sources: Vec<SourceFile>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl Capsule {
    /// Create a capsule with a seeded main part
    ///
    /// The seed content is an ABC header skeleton built from the metadata,
    /// so the part parses (to an empty score) from the first keystroke.
    pub fn new(meta: CapsuleMeta) -> Result<Self, CapsuleError> {
        meta.validate()?;
        let id = format!("{}-{}", meta.slug(), Uuid::new_v4().simple());
        let seed = Part {
            file_name: "part-main-v01.abc".to_string(),
            content: header_skeleton(1, &meta.title, &meta.meter, &meta.key),
        };
        Ok(Capsule {
            id,
            meta,
            parts: vec![seed],
            sources: Vec::new(),
            is_favorite: false,
        })
    }

    pub fn part(&self, file_name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.file_name == file_name)
    }

    /// Add a new part with a header skeleton; file names are unique
    pub fn add_part(&mut self, file_name: impl Into<String>) -> Result<&Part, CapsuleError> {
        let file_name = file_name.into();
        if self.part(&file_name).is_some() {
            return Err(CapsuleError::DuplicatePart(file_name));
        }
        let index = self.parts.len() as u32 + 1;
        let title = format!("{} (Part {})", self.meta.title, index);
        let content = header_skeleton(index, &title, &self.meta.meter, &self.meta.key);
        self.parts.push(Part { file_name, content });
        Ok(self.parts.last().expect("part just pushed"))
    }

    /// Replace a part's notation text
    pub fn set_part_content(
        &mut self,
        file_name: &str,
        content: impl Into<String>,
    ) -> Result<(), CapsuleError> {
        match self.parts.iter_mut().find(|p| p.file_name == file_name) {
            Some(part) => {
                part.content = content.into();
                Ok(())
            }
            None => Err(CapsuleError::UnknownPart(file_name.to_string())),
        }
    }
}

fn header_skeleton(index: u32, title: &str, meter: &str, key: &str) -> String {
    format!("X:{index}\nT:{title}\nM:{meter}\nK:{key}\nL:1/8\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> CapsuleMeta {
        CapsuleMeta {
            title: "My Song".to_string(),
            tempo: 100,
            meter: "4/4".to_string(),
            key: "Dm".to_string(),
            ppq: 480,
            pickup: 0,
            version: "v01".to_string(),
        }
    }

    #[test]
    fn test_validate_ranges() {
        assert!(meta().validate().is_ok());

        let mut m = meta();
        m.tempo = 39;
        assert_eq!(m.validate(), Err(CapsuleError::TempoOutOfRange(39)));
        m.tempo = 241;
        assert_eq!(m.validate(), Err(CapsuleError::TempoOutOfRange(241)));
        m.tempo = 40;
        assert!(m.validate().is_ok());

        let mut m = meta();
        m.meter = "7/8".to_string();
        assert!(matches!(m.validate(), Err(CapsuleError::UnsupportedMeter(_))));

        let mut m = meta();
        m.key = "Hb".to_string();
        assert!(matches!(m.validate(), Err(CapsuleError::UnknownKey(_))));

        let mut m = meta();
        m.ppq = 0;
        assert_eq!(m.validate(), Err(CapsuleError::InvalidPpq));
    }

    #[test]
    fn test_slug() {
        assert_eq!(meta().slug(), "my-song");
        let mut m = meta();
        m.title = "  Zocharti   Loch (Cosmic Echo) ".to_string();
        assert_eq!(m.slug(), "zocharti-loch-(cosmic-echo)");
    }

    #[test]
    fn test_new_seeds_main_part() {
        let capsule = Capsule::new(meta()).unwrap();
        assert!(capsule.id.starts_with("my-song-"));
        assert_eq!(capsule.parts.len(), 1);
        let part = &capsule.parts[0];
        assert_eq!(part.file_name, "part-main-v01.abc");
        assert!(part.content.contains("T:My Song"));
        assert!(part.content.contains("K:Dm"));
    }

    #[test]
    fn test_unique_part_names() {
        let mut capsule = Capsule::new(meta()).unwrap();
        capsule.add_part("part-harmony-v01.abc").unwrap();
        let err = capsule.add_part("part-harmony-v01.abc").unwrap_err();
        assert_eq!(
            err,
            CapsuleError::DuplicatePart("part-harmony-v01.abc".to_string())
        );
    }

    #[test]
    fn test_meta_serializes_french_keys() {
        let json = serde_json::to_value(meta()).unwrap();
        assert!(json.get("titre").is_some());
        assert!(json.get("mesure").is_some());
        assert!(json.get("tonalite").is_some());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_set_part_content() {
        let mut capsule = Capsule::new(meta()).unwrap();
        capsule
            .set_part_content("part-main-v01.abc", "X:1\nK:C\nCDEF|\n")
            .unwrap();
        assert!(capsule.part("part-main-v01.abc").unwrap().content.contains("CDEF"));
        assert!(capsule.set_part_content("nope.abc", "x").is_err());
    }
}
