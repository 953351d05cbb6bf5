// src/logger/dedup.rs
use std::collections::HashMap;

use serde_json::{json, Value};

use crate::error::RlResult;
use crate::explore::seed::uniform_hash_bytes;

pub type ActionId = u64;

struct DictEntry {
    count: usize,
    content: Vec<u8>,
}

/// Content-addressed dictionary over action payloads. A payload is keyed by
/// the 64-bit hash of its serialized bytes; repeated payloads are replaced
/// in the outgoing record by a back-reference to the entry.
#[derive(Default)]
pub struct DedupDict {
    entries: HashMap<ActionId, DictEntry>,
}

impl DedupDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one payload, returning its id and whether this was the
    /// first time it was seen.
    pub fn add_action(&mut self, content: &[u8]) -> (ActionId, bool) {
        let id = uniform_hash_bytes(content);
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.count += 1;
                (id, false)
            }
            None => {
                self.entries.insert(id, DictEntry { count: 1, content: content.to_vec() });
                (id, true)
            }
        }
    }

    /// Drop one reference; the entry goes away when the count hits zero.
    pub fn remove_action(&mut self, id: ActionId) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.count -= 1;
                if entry.count == 0 {
                    self.entries.remove(&id);
                }
                true
            }
            None => false,
        }
    }

    pub fn get_action(&self, id: ActionId) -> Option<&[u8]> {
        self.entries.get(&id).map(|e| e.content.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite a context payload so every entry of `_multi` becomes a
    /// dictionary reference. First occurrences carry their definition
    /// inline (`__adef`) so the receiver can populate its own dictionary;
    /// repeats are pure back-references. Contexts without a `_multi` list
    /// (continuous-action requests) pass through unchanged.
    pub fn transform_payload(&mut self, payload: &str) -> RlResult<(String, Vec<ActionId>)> {
        let mut doc: Value = serde_json::from_str(payload)?;
        let actions = match doc.get_mut("_multi").and_then(Value::as_array_mut) {
            Some(actions) => actions,
            None => return Ok((payload.to_string(), Vec::new())),
        };

        let mut action_ids = Vec::with_capacity(actions.len());
        for action in actions.iter_mut() {
            let serialized = serde_json::to_vec(action)?;
            let (id, first_seen) = self.add_action(&serialized);
            action_ids.push(id);
            *action = if first_seen {
                json!({ "__aid": id, "__adef": action.clone() })
            } else {
                json!({ "__aid": id })
            };
        }
        Ok((doc.to_string(), action_ids))
    }
}
