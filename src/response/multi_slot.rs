// src/response/multi_slot.rs
use std::collections::HashSet;

use crate::error::{invalid_argument, RlResult};
use crate::response::ranking::ActionProb;

/// One slot of a per-slot decision: the slot, the action assigned to it and
/// the probability that assignment was sampled with.
#[derive(Clone, Debug)]
pub struct SlotEntry {
    pub slot_id: String,
    pub action_id: usize,
    pub probability: f32,
}

/// Per-slot decision (CCB/slates). Slot order is population order.
#[derive(Debug, Default)]
pub struct MultiSlotResponse {
    event_id: String,
    model_id: String,
    slots: Vec<SlotEntry>,
}

impl MultiSlotResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_event_id(&mut self, event_id: impl Into<String>) {
        self.event_id = event_id.into();
    }

    pub fn set_model_id(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
    }

    pub fn push(&mut self, entry: SlotEntry) -> RlResult<()> {
        if self.slots.iter().any(|s| s.slot_id == entry.slot_id) {
            return Err(invalid_argument(format!(
                "slot id '{}' appears twice in one response",
                entry.slot_id
            )));
        }
        self.slots.push(entry);
        Ok(())
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlotEntry> {
        self.slots.iter()
    }
}

impl<'a> IntoIterator for &'a MultiSlotResponse {
    type Item = &'a SlotEntry;
    type IntoIter = std::slice::Iter<'a, SlotEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

/// A full ranked distribution for one slot of a detailed response.
#[derive(Debug)]
pub struct SlotRanking {
    pub slot_id: String,
    pub chosen_action_id: usize,
    pub entries: Vec<ActionProb>,
}

/// Per-slot decision where each slot keeps its whole ranked distribution.
#[derive(Debug, Default)]
pub struct MultiSlotResponseDetailed {
    event_id: String,
    model_id: String,
    slots: Vec<SlotRanking>,
}

impl MultiSlotResponseDetailed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_event_id(&mut self, event_id: impl Into<String>) {
        self.event_id = event_id.into();
    }

    pub fn set_model_id(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
    }

    pub fn push(&mut self, slot: SlotRanking) -> RlResult<()> {
        if self.slots.iter().any(|s| s.slot_id == slot.slot_id) {
            return Err(invalid_argument(format!(
                "slot id '{}' appears twice in one response",
                slot.slot_id
            )));
        }
        self.slots.push(slot);
        Ok(())
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SlotRanking> {
        self.slots.iter()
    }
}

impl<'a> IntoIterator for &'a MultiSlotResponseDetailed {
    type Item = &'a SlotRanking;
    type IntoIter = std::slice::Iter<'a, SlotRanking>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}

fn validate_parallel_slots(
    action_ids: &[Vec<usize>],
    pdfs: &[Vec<f32>],
    slot_ids: &[String],
) -> RlResult<()> {
    if action_ids.len() != pdfs.len() || action_ids.len() != slot_ids.len() {
        return Err(invalid_argument(format!(
            "per-slot arrays disagree in length: {} action lists, {} pdfs, {} slot ids",
            action_ids.len(),
            pdfs.len(),
            slot_ids.len()
        )));
    }
    for (i, (ids, pdf)) in action_ids.iter().zip(pdfs.iter()).enumerate() {
        if ids.len() != pdf.len() {
            // A structurally corrupt predictor response; truncating it
            // silently would log a decision that never happened.
            return Err(invalid_argument(format!(
                "slot {i}: {} action ids but {} probabilities",
                ids.len(),
                pdf.len()
            )));
        }
    }
    let unique: HashSet<&str> = slot_ids.iter().map(String::as_str).collect();
    if unique.len() != slot_ids.len() {
        return Err(invalid_argument("slot ids must be unique within a response"));
    }
    Ok(())
}

/// Build a per-slot response from parallel predictor output. Each slot's
/// chosen action is the first entry of its (already sampled/ranked) list.
pub fn populate_multi_slot(
    action_ids: &[Vec<usize>],
    pdfs: &[Vec<f32>],
    slot_ids: &[String],
    event_id: &str,
    model_id: &str,
) -> RlResult<MultiSlotResponse> {
    validate_parallel_slots(action_ids, pdfs, slot_ids)?;
    let mut resp = MultiSlotResponse::new();
    resp.set_event_id(event_id);
    resp.set_model_id(model_id);
    for ((ids, pdf), slot_id) in action_ids.iter().zip(pdfs.iter()).zip(slot_ids.iter()) {
        let (&action_id, &probability) = match (ids.first(), pdf.first()) {
            (Some(a), Some(p)) => (a, p),
            _ => {
                return Err(invalid_argument(format!(
                    "slot '{slot_id}' has no candidate actions"
                )))
            }
        };
        resp.push(SlotEntry { slot_id: slot_id.clone(), action_id, probability })?;
    }
    Ok(resp)
}

/// Detailed variant: same validation, but every slot keeps its full ranked
/// distribution.
pub fn populate_multi_slot_detailed(
    action_ids: &[Vec<usize>],
    pdfs: &[Vec<f32>],
    slot_ids: &[String],
    event_id: &str,
    model_id: &str,
) -> RlResult<MultiSlotResponseDetailed> {
    validate_parallel_slots(action_ids, pdfs, slot_ids)?;
    let mut resp = MultiSlotResponseDetailed::new();
    resp.set_event_id(event_id);
    resp.set_model_id(model_id);
    for ((ids, pdf), slot_id) in action_ids.iter().zip(pdfs.iter()).zip(slot_ids.iter()) {
        let chosen_action_id = *ids.first().ok_or_else(|| {
            invalid_argument(format!("slot '{slot_id}' has no candidate actions"))
        })?;
        let entries = ids
            .iter()
            .zip(pdf.iter())
            .map(|(&action_id, &probability)| ActionProb { action_id, probability })
            .collect();
        resp.push(SlotRanking { slot_id: slot_id.clone(), chosen_action_id, entries })?;
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("slot_{i}")).collect()
    }

    #[test]
    fn outer_length_mismatch_is_rejected() {
        let err = populate_multi_slot(
            &[vec![0], vec![1]],
            &[vec![1.0]],
            &slot_ids(2),
            "e",
            "m",
        )
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn inner_length_mismatch_is_rejected() {
        let err = populate_multi_slot(
            &[vec![0, 1], vec![1]],
            &[vec![0.5], vec![1.0]],
            &slot_ids(2),
            "e",
            "m",
        )
        .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn duplicate_slot_ids_rejected() {
        let ids = vec!["a".to_string(), "a".to_string()];
        assert!(populate_multi_slot(
            &[vec![0], vec![1]],
            &[vec![1.0], vec![1.0]],
            &ids,
            "e",
            "m"
        )
        .is_err());
    }

    #[test]
    fn detailed_keeps_full_distribution() {
        let resp = populate_multi_slot_detailed(
            &[vec![2, 0, 1]],
            &[vec![0.8, 0.1, 0.1]],
            &slot_ids(1),
            "e",
            "m",
        )
        .unwrap();
        let slot = resp.iter().next().unwrap();
        assert_eq!(slot.chosen_action_id, 2);
        assert_eq!(slot.entries.len(), 3);
    }
}
