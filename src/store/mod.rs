//! In-memory capsule store
//!
//! The minimal persistence collaborator the pipeline talks to: get,
//! create, update, and delete Capsules by id, behind an internal mutex so
//! one store can be shared across the sync worker and export callers.
//! Reads hand out clones; exports therefore always operate on a snapshot.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use crate::models::{Capsule, CapsuleError, CapsuleMeta};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such capsule: {0}")]
    UnknownCapsule(String),
    #[error(transparent)]
    Capsule(#[from] CapsuleError),
    #[error("store lock poisoned")]
    Poisoned,
}

#[derive(Default)]
pub struct CapsuleStore {
    capsules: Mutex<HashMap<String, Capsule>>,
}

impl CapsuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-planted with the three-voice demo round
    pub fn seeded() -> Self {
        let store = Self::new();
        let meta = CapsuleMeta {
            title: "Zocharti Loch (Cosmic Echo)".to_string(),
            tempo: 100,
            meter: "4/4".to_string(),
            key: "Dm".to_string(),
            ppq: 480,
            pickup: 0,
            version: "v01".to_string(),
        };
        let mut capsule = Capsule::new(meta).expect("seed meta is valid");
        capsule.parts.clear();
        capsule.parts.push(crate::models::Part {
            file_name: "zocharti-loch-round-v01.abc".to_string(),
            content: SEED_ROUND.to_string(),
        });
        store.insert(capsule).expect("fresh store accepts the seed");
        store
    }

    /// Create a capsule from metadata and return a snapshot of it
    pub fn add(&self, meta: CapsuleMeta) -> Result<Capsule, StoreError> {
        let capsule = Capsule::new(meta)?;
        self.insert(capsule.clone())?;
        Ok(capsule)
    }

    /// Insert an existing capsule
    pub fn insert(&self, capsule: Capsule) -> Result<(), StoreError> {
        let mut capsules = self.capsules.lock().map_err(|_| StoreError::Poisoned)?;
        capsules.insert(capsule.id.clone(), capsule);
        Ok(())
    }

    /// Snapshot of a capsule by id
    pub fn get(&self, id: &str) -> Option<Capsule> {
        self.capsules.lock().ok()?.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<String> {
        match self.capsules.lock() {
            Ok(capsules) => capsules.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn update_meta(&self, id: &str, meta: CapsuleMeta) -> Result<(), StoreError> {
        meta.validate()?;
        let mut capsules = self.capsules.lock().map_err(|_| StoreError::Poisoned)?;
        let capsule = capsules
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownCapsule(id.to_string()))?;
        capsule.meta = meta;
        Ok(())
    }

    pub fn update_part_content(
        &self,
        id: &str,
        file_name: &str,
        content: &str,
    ) -> Result<(), StoreError> {
        let mut capsules = self.capsules.lock().map_err(|_| StoreError::Poisoned)?;
        let capsule = capsules
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownCapsule(id.to_string()))?;
        capsule.set_part_content(file_name, content)?;
        Ok(())
    }

    pub fn add_part(&self, id: &str, file_name: &str) -> Result<(), StoreError> {
        let mut capsules = self.capsules.lock().map_err(|_| StoreError::Poisoned)?;
        let capsule = capsules
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownCapsule(id.to_string()))?;
        capsule.add_part(file_name)?;
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let mut capsules = self.capsules.lock().map_err(|_| StoreError::Poisoned)?;
        capsules
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownCapsule(id.to_string()))
    }
}

/// The demo round from the original collection
pub const SEED_ROUND: &str = "X: 1\n\
T: Zocharti Loch\n\
C: Jewish Folk Song\n\
M: 4/4\n\
L: 1/8\n\
K: Dm\n\
V:1 name=\"Voice 1\"\n\
V:2 name=\"Voice 2\"\n\
V:3 name=\"Voice 3\"\n\
[V:1] z8 | z8 | z8 | D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 |\n\
[V:2] z8 | D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 | z8 | z8 |\n\
[V:3] D2 E2 F2 G2 | A2 G2 F2 E2 | D4 D4 | z8 | z8 | z8 | z8 |\n";
