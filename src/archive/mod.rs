//! Capsule archive bundling
//!
//! Packages a Capsule's metadata, raw part text, and placeholder output
//! folders into one ZIP blob with a fixed, deterministic layout:
//!
//! ```text
//! <slug>/capsule.json
//! <slug>/parts/<fileName>
//! <slug>/sources/.gitkeep
//! <slug>/rendus/{midi,musicxml,wav}/
//! <slug>/scripts/README.md
//! ```
//!
//! Building is all-or-nothing: any failure aborts with an error and no
//! partial archive is delivered.

use serde::Serialize;
use std::io::{Cursor, Write};
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{Capsule, CapsuleMeta};

const SCRIPTS_README: &str = "Automated conversion scripts can be placed here.\n";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot build archive: {0}")]
    Packaging(String),
    #[error("failed to serialize capsule.json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("zip write error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The capsule.json shape: metadata plus the ordered part file names
#[derive(Serialize)]
struct CapsuleManifest<'a> {
    #[serde(flatten)]
    meta: &'a CapsuleMeta,
    parts: Vec<&'a str>,
}

/// Build the archive as a single downloadable blob
pub fn build(capsule: &Capsule) -> Result<Vec<u8>, ArchiveError> {
    let slug = capsule.meta.slug();
    if slug.is_empty() {
        return Err(ArchiveError::Packaging(
            "capsule title produces an empty slug".to_string(),
        ));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = CapsuleManifest {
        meta: &capsule.meta,
        parts: capsule.parts.iter().map(|p| p.file_name.as_str()).collect(),
    };
    zip.start_file(format!("{slug}/capsule.json"), options)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)?;

    for part in &capsule.parts {
        zip.start_file(format!("{slug}/parts/{}", part.file_name), options)?;
        zip.write_all(part.content.as_bytes())?;
    }

    zip.start_file(format!("{slug}/sources/.gitkeep"), options)?;
    for rendu in ["midi", "musicxml", "wav"] {
        zip.add_directory(format!("{slug}/rendus/{rendu}"), options)?;
    }

    zip.start_file(format!("{slug}/scripts/README.md"), options)?;
    zip.write_all(SCRIPTS_README.as_bytes())?;

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    log::info!("archive built for '{}': {} bytes", slug, bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capsule;

    fn capsule() -> Capsule {
        let meta = CapsuleMeta {
            title: "My Song".to_string(),
            tempo: 100,
            meter: "4/4".to_string(),
            key: "Dm".to_string(),
            ppq: 480,
            pickup: 0,
            version: "v01".to_string(),
        };
        Capsule::new(meta).unwrap()
    }

    #[test]
    fn test_build_produces_zip_magic() {
        let bytes = build(&capsule()).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn test_empty_title_fails_whole_build() {
        let mut c = capsule();
        c.meta.title = "   ".to_string();
        assert!(matches!(build(&c), Err(ArchiveError::Packaging(_))));
    }

    #[test]
    fn test_manifest_shape() {
        let manifest = CapsuleManifest {
            meta: &capsule().meta,
            parts: vec!["a.abc", "b.abc"],
        };
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["titre"], "My Song");
        assert_eq!(json["parts"][0], "a.abc");
        assert_eq!(json["parts"][1], "b.abc");
    }
}
