//! RenderSync: debounced preview/playback synchronization
//!
//! Consumes a live stream of content-changed notifications (one per
//! keystroke). Each notification cancels the previous pending recompute
//! and schedules a new one after the quiescence window; only the most
//! recently scheduled task runs. When the window elapses the task
//! persists the text to the Part, re-parses it, and on success swaps the
//! cached preview wholesale. On a parse failure the previous valid
//! preview stays untouched, so transient invalid input never blanks the
//! display.
//!
//! Cancellation is a generation counter checked under the state mutex:
//! every edit (and every focus change) bumps the generation, turning any
//! sleeping timer thread into a no-op. A canceled task never leaves a
//! half-applied document or half-persisted Part.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::models::MusicDocument;
use crate::parse::{self, ParseError};
use crate::renderers::midi::{self, Timeline, DEFAULT_PPQ};
use crate::renderers::pdf::{self, ScoreLayout};
use crate::store::CapsuleStore;

/// Quiescence window after the last edit before reprocessing
pub const QUIESCENCE: Duration = Duration::from_millis(500);

/// The cached render state behind the live preview
#[derive(Debug, Clone)]
pub struct Preview {
    pub document: MusicDocument,
    /// None when the document parses but cannot be laid out (empty score)
    pub layout: Option<ScoreLayout>,
    pub timeline: Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Focus {
    capsule_id: String,
    file_name: String,
}

#[derive(Default)]
struct SyncState {
    focus: Option<Focus>,
    /// Bumped on every edit and focus change; stale timers check and bail
    generation: u64,
    preview: Option<Preview>,
    last_error: Option<ParseError>,
    recompute_count: u64,
}

/// Debounced edit-to-preview synchronizer for one editing surface
pub struct RenderSync {
    store: Arc<CapsuleStore>,
    state: Arc<Mutex<SyncState>>,
    quiescence: Duration,
}

impl RenderSync {
    pub fn new(store: Arc<CapsuleStore>) -> Self {
        Self::with_quiescence(store, QUIESCENCE)
    }

    /// Override the quiescence window (tests shrink it)
    pub fn with_quiescence(store: Arc<CapsuleStore>, quiescence: Duration) -> Self {
        RenderSync {
            store,
            state: Arc::new(Mutex::new(SyncState::default())),
            quiescence,
        }
    }

    /// Start editing a Part: cancels pending work for the previous Part
    /// and computes an immediate preview from the stored content
    pub fn focus(&self, capsule_id: &str, file_name: &str) {
        let text = self
            .store
            .get(capsule_id)
            .and_then(|c| c.part(file_name).map(|p| p.content.clone()));

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generation += 1;
        state.focus = Some(Focus {
            capsule_id: capsule_id.to_string(),
            file_name: file_name.to_string(),
        });
        state.preview = None;
        state.last_error = None;
        if let Some(text) = text {
            apply_text(&mut state, &text, self.ppq_for(capsule_id));
        }
    }

    /// Stop editing: cancels any pending task, persists nothing
    pub fn blur(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generation += 1;
        state.focus = None;
    }

    /// One keystroke's worth of new content for the focused Part
    ///
    /// Schedules the recompute; returns immediately.
    pub fn notify_edit(&self, text: &str) {
        let (generation, focus) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            let Some(focus) = state.focus.clone() else {
                log::warn!("edit notification with no focused part; ignoring");
                return;
            };
            state.generation += 1;
            (state.generation, focus)
        };

        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let text = text.to_string();
        let quiescence = self.quiescence;
        let ppq = self.ppq_for(&focus.capsule_id);

        thread::spawn(move || {
            thread::sleep(quiescence);
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            // A newer edit or a focus change superseded this task
            if state.generation != generation || state.focus.as_ref() != Some(&focus) {
                log::trace!("debounce task superseded; dropping");
                return;
            }
            if let Err(e) = store.update_part_content(&focus.capsule_id, &focus.file_name, &text) {
                log::warn!("failed to persist part content: {}", e);
                return;
            }
            apply_text(&mut state, &text, ppq);
        });
    }

    /// Current preview snapshot, if any valid parse has happened
    pub fn preview(&self) -> Option<Preview> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .preview
            .clone()
    }

    /// The parse error from the most recent recompute, if it failed
    pub fn last_error(&self) -> Option<ParseError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_error
            .clone()
    }

    /// How many recomputes have actually run (debounced edits excluded)
    pub fn recompute_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recompute_count
    }

    fn ppq_for(&self, capsule_id: &str) -> u16 {
        self.store
            .get(capsule_id)
            .map(|c| c.meta.ppq)
            .unwrap_or(DEFAULT_PPQ)
    }
}

/// Re-parse and, on success, swap the cached preview wholesale
fn apply_text(state: &mut SyncState, text: &str, ppq: u16) {
    state.recompute_count += 1;
    match parse::parse(text) {
        Ok(document) => {
            let timeline = match midi::encode(&document, ppq) {
                Ok(t) => t,
                Err(e) => {
                    // Keep the stale preview rather than show a broken one
                    log::warn!("timeline regeneration failed: {}", e);
                    return;
                }
            };
            let layout = pdf::layout(&document).ok();
            state.preview = Some(Preview { document, layout, timeline });
            state.last_error = None;
        }
        Err(e) => {
            log::debug!("parse failed during live edit, preview retained: {}", e);
            state.last_error = Some(e);
        }
    }
}
