//! MEI export: notation text → scholarly XML encoding
//!
//! The conversion engine's bootstrap is expensive, so one engine instance
//! serves the whole process. It lives behind a lazily-initialized,
//! mutex-guarded owner: first use builds it, later calls reuse it, and
//! access is serialized because the engine mutates internal state during
//! a conversion. The engine is never exposed as ambient global state;
//! everything goes through [`with_engine`].

mod engine;

pub use engine::{MeiDuration, MeiEngine};

use lazy_static::lazy_static;
use std::sync::Mutex;
use thiserror::Error;

use crate::parse::{self, ParseError};

#[derive(Debug, Error)]
pub enum MeiError {
    /// The engine failed to bootstrap; nothing was converted
    #[error("MEI engine failed to initialize: {0}")]
    Init(String),
    /// The engine ran but produced no usable document
    #[error("MEI conversion produced no output")]
    EmptyOutput,
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("xml write error: {0}")]
    Xml(#[from] quick_xml::Error),
}

lazy_static! {
    static ref ENGINE: Mutex<Option<MeiEngine>> = Mutex::new(None);
}

/// Run `f` against the process-wide engine, bootstrapping it on first use
pub fn with_engine<T>(f: impl FnOnce(&mut MeiEngine) -> Result<T, MeiError>) -> Result<T, MeiError> {
    let mut guard = ENGINE
        .lock()
        .map_err(|_| MeiError::Init("engine lock poisoned".to_string()))?;
    if guard.is_none() {
        log::info!("bootstrapping MEI engine");
        *guard = Some(MeiEngine::new()?);
    }
    let engine = guard.as_mut().ok_or_else(|| {
        MeiError::Init("engine missing after initialization".to_string())
    })?;
    f(engine)
}

/// Encode notation text as an MEI XML document
///
/// Distinguishes bootstrap failure ([`MeiError::Init`]) from a
/// conversion that ran but yielded nothing ([`MeiError::EmptyOutput`]);
/// an empty or partial document is never returned as success.
pub fn encode(text: &str) -> Result<String, MeiError> {
    let doc = parse::parse(text)?;
    if doc.is_empty() {
        return Err(MeiError::EmptyOutput);
    }
    let xml = with_engine(|engine| engine.convert(&doc))?;
    if !xml.contains("<note") && !xml.contains("<rest") {
        return Err(MeiError::EmptyOutput);
    }
    Ok(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNE: &str = "X:1\nT:Test\nM:4/4\nL:1/4\nK:D\nD E F G | A2 z2 |\n";

    #[test]
    fn test_encode_basic() {
        let xml = encode(TUNE).unwrap();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<mei"));
        assert!(xml.contains("meter.count=\"4\""));
        assert!(xml.contains("key.sig=\"2s\"")); // D major
        assert!(xml.contains("pname=\"d\""));
        assert!(xml.contains("<rest"));
    }

    #[test]
    fn test_deterministic_output() {
        assert_eq!(encode(TUNE).unwrap(), encode(TUNE).unwrap());
    }

    #[test]
    fn test_empty_score_is_empty_output() {
        let err = encode("X:1\nT:Nothing\nK:C\n").unwrap_err();
        assert!(matches!(err, MeiError::EmptyOutput));
    }

    #[test]
    fn test_parse_error_propagates() {
        let err = encode("X:1\nK:C\n???\n").unwrap_err();
        assert!(matches!(err, MeiError::Parse(_)));
    }

    #[test]
    fn test_engine_reused_across_calls() {
        encode(TUNE).unwrap();
        let first = with_engine(|e| Ok(e.conversions())).unwrap();
        encode(TUNE).unwrap();
        let second = with_engine(|e| Ok(e.conversions())).unwrap();
        assert!(second > first);
    }
}
