use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::OverlaySettings;
use crate::state::{CaptureFrame, OverlayEffect, OverlaySession, StateResult};

/// Owns one overlay session per captured display.
#[derive(Debug)]
pub struct SessionCoordinator {
    settings: Arc<OverlaySettings>,
    sessions: BTreeMap<u32, OverlaySession>,
}

impl SessionCoordinator {
    pub fn new(settings: Arc<OverlaySettings>) -> Self {
        Self {
            settings,
            sessions: BTreeMap::new(),
        }
    }

    /// Opens (or replaces) the overlay for `frame.display_id`.
    pub fn open(&mut self, frame: CaptureFrame) -> StateResult<()> {
        let display_id = frame.display_id;
        let session = OverlaySession::new(frame, Arc::clone(&self.settings))?;
        if self.sessions.insert(display_id, session).is_some() {
            tracing::debug!(display_id, "replaced existing overlay session");
        }
        Ok(())
    }

    pub fn session(&self, display_id: u32) -> Option<&OverlaySession> {
        self.sessions.get(&display_id)
    }

    pub fn session_mut(&mut self, display_id: u32) -> Option<&mut OverlaySession> {
        self.sessions.get_mut(&display_id)
    }

    pub fn display_ids(&self) -> Vec<u32> {
        self.sessions.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops selection state on every overlay except `origin`.
    pub fn clear_others(&mut self, origin: u32) -> Vec<(u32, Vec<OverlayEffect>)> {
        self.sessions
            .iter_mut()
            .filter(|(display_id, _)| **display_id != origin)
            .map(|(display_id, session)| (*display_id, session.clear_selection()))
            .filter(|(_, effects)| !effects.is_empty())
            .collect()
    }

    pub fn close_all(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        tracing::info!(count = self.sessions.len(), "closing all overlay sessions");
        self.sessions.clear();
    }
}
