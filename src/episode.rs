// src/episode.rs
use std::collections::HashMap;

use crate::context::inject_episode_depth;
use crate::error::{invalid_argument, RlResult};

/// Event-id → depth map for one episode. Entries are never evicted, so a
/// very long-lived episode grows linearly with its length; that is the
/// caller's tradeoff to manage, not something the library trims behind
/// their back.
#[derive(Debug, Default)]
pub struct EpisodeHistory {
    depths: HashMap<String, u32>,
}

impl EpisodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Depth of an event, 0 for unknown ids and for the episode root.
    pub fn get_depth(&self, event_id: Option<&str>) -> u32 {
        event_id
            .and_then(|id| self.depths.get(id))
            .copied()
            .unwrap_or(0)
    }

    pub fn update(&mut self, event_id: &str, previous_event_id: Option<&str>) {
        let depth = self.get_depth(previous_event_id) + 1;
        self.depths.insert(event_id.to_string(), depth);
    }

    /// Context for the next step, with this event's depth injected.
    pub fn get_context(&self, previous_event_id: Option<&str>, context: &str) -> RlResult<String> {
        inject_episode_depth(context, self.get_depth(previous_event_id) + 1)
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }

    pub fn dump_to_json(&self) -> String {
        serde_json::to_string(&self.depths).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn init_from_json(&mut self, history_json: &str) -> RlResult<()> {
        let depths: HashMap<String, u32> = serde_json::from_str(history_json)?;
        self.depths = depths;
        Ok(())
    }
}

/// Caller-owned state for one multi-step session. Intentionally not
/// shared-state safe: one episode is driven by one logical session at a
/// time, and concurrent steps on the same episode are the caller's
/// responsibility to serialize.
#[derive(Debug)]
pub struct EpisodeState {
    episode_id: String,
    history: EpisodeHistory,
}

impl EpisodeState {
    pub fn new(episode_id: &str) -> RlResult<Self> {
        if episode_id.is_empty() {
            return Err(invalid_argument("episode id must not be empty"));
        }
        Ok(Self { episode_id: episode_id.to_string(), history: EpisodeHistory::new() })
    }

    pub fn episode_id(&self) -> &str {
        &self.episode_id
    }

    pub fn history(&self) -> &EpisodeHistory {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn update(&mut self, event_id: &str, previous_event_id: Option<&str>) {
        self.history.update(event_id, previous_event_id);
    }

    pub fn dump_history_to_json(&self) -> String {
        self.history.dump_to_json()
    }

    pub fn init_history_from_json(&mut self, history_json: &str) -> RlResult<()> {
        self.history.init_from_json(history_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depths_chain_from_previous_ids() {
        let mut ep = EpisodeState::new("ep1").unwrap();
        ep.update("e1", None);
        assert_eq!(ep.history().get_depth(Some("e1")), 1);
        ep.update("e2", Some("e1"));
        assert_eq!(ep.history().get_depth(Some("e2")), 2);
        // unknown previous id restarts from the root
        ep.update("e3", Some("missing"));
        assert_eq!(ep.history().get_depth(Some("e3")), 1);
        assert_eq!(ep.len(), 3);
    }

    #[test]
    fn history_json_round_trip() {
        let mut ep = EpisodeState::new("ep1").unwrap();
        ep.update("e1", None);
        ep.update("e2", Some("e1"));
        let dump = ep.dump_history_to_json();

        let mut restored = EpisodeState::new("ep1").unwrap();
        restored.init_history_from_json(&dump).unwrap();
        assert_eq!(restored.history().get_depth(Some("e2")), 2);
    }

    #[test]
    fn empty_episode_id_rejected() {
        assert!(EpisodeState::new("").is_err());
    }
}
