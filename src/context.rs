// src/context.rs
//
// Minimal JSON context inspection. The library does not define a context
// grammar; it only reads the handful of fields the orchestrator needs:
// the `_multi` action list, the `_slots` list and per-slot `_id`s.
use serde_json::Value;

use crate::error::{invalid_argument, RlResult};

fn parse(context: &str) -> RlResult<Value> {
    let doc: Value = serde_json::from_str(context)?;
    if !doc.is_object() {
        return Err(invalid_argument("context must be a JSON object"));
    }
    Ok(doc)
}

/// Number of candidate actions in the `_multi` list.
pub fn get_action_count(context: &str) -> RlResult<usize> {
    let doc = parse(context)?;
    Ok(doc.get("_multi").and_then(Value::as_array).map_or(0, Vec::len))
}

/// Number of slots in the `_slots` list.
pub fn get_slot_count(context: &str) -> RlResult<usize> {
    let doc = parse(context)?;
    Ok(doc.get("_slots").and_then(Value::as_array).map_or(0, Vec::len))
}

/// Explicit slot ids from the context, positionally. Slots without an
/// `_id` field yield None and get an auto-generated id later.
pub fn get_slot_ids(context: &str) -> RlResult<Vec<Option<String>>> {
    let doc = parse(context)?;
    let slots = doc.get("_slots").and_then(Value::as_array);
    Ok(slots.map_or_else(Vec::new, |slots| {
        slots
            .iter()
            .map(|slot| {
                slot.get("_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect()
    }))
}

/// Prefix the context with the episode depth, preserving the original byte
/// order of the caller's payload:
/// `{"episode":{"depth":"<n>"}, <original fields...>}`.
pub fn inject_episode_depth(context: &str, depth: u32) -> RlResult<String> {
    let trimmed = context.trim_start();
    if !trimmed.starts_with('{') {
        return Err(invalid_argument("context must be a JSON object"));
    }
    Ok(format!(
        "{{\"episode\":{{\"depth\":\"{depth}\"}},{}",
        &trimmed[1..]
    ))
}
