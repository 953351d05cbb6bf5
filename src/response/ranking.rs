// src/response/ranking.rs
use crate::error::{invalid_argument, RlResult};
use crate::explore::sampling::{sample_after_normalizing, swap_chosen};

/// One ranked entry: an action and the probability it was chosen with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionProb {
    pub action_id: usize,
    pub probability: f32,
}

/// Ranked-list decision for a single CB request. The chosen action is always
/// the first entry. Deliberately not Clone: responses are caller-owned,
/// move-only value objects.
#[derive(Debug, Default)]
pub struct RankingResponse {
    event_id: String,
    model_id: String,
    chosen_action_id: usize,
    entries: Vec<ActionProb>,
}

impl RankingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action_id: usize, probability: f32) {
        self.entries.push(ActionProb { action_id, probability });
    }

    pub fn set_event_id(&mut self, event_id: impl Into<String>) {
        self.event_id = event_id.into();
    }

    pub fn set_model_id(&mut self, model_id: impl Into<String>) {
        self.model_id = model_id.into();
    }

    pub fn set_chosen_action_id(&mut self, action_id: usize) -> RlResult<()> {
        if !self.entries.iter().any(|e| e.action_id == action_id) {
            return Err(invalid_argument(format!(
                "chosen action {action_id} is not part of the response"
            )));
        }
        self.chosen_action_id = action_id;
        Ok(())
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn chosen_action_id(&self) -> usize {
        self.chosen_action_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActionProb> {
        self.entries.iter()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [ActionProb] {
        &mut self.entries
    }

    /// Reorder the entries to ascending action id and make the first entry
    /// the chosen one. Used by the Apprentice/LoggingOnly reset, where the
    /// caller-facing ranking must reflect "no real ranking happened".
    pub(crate) fn reset_to_ascending(&mut self) {
        self.entries.sort_by_key(|e| e.action_id);
        if let Some(first) = self.entries.first() {
            self.chosen_action_id = first.action_id;
        }
    }
}

impl<'a> IntoIterator for &'a RankingResponse {
    type Item = &'a ActionProb;
    type IntoIter = std::slice::Iter<'a, ActionProb>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Build a ranking response from parallel predictor output arrays. The
/// chosen action is whatever sits at `chosen_index` before the swap.
pub fn populate_ranking(
    chosen_index: usize,
    action_ids: &[usize],
    pdf: &[f32],
    event_id: &str,
    model_id: &str,
) -> RlResult<RankingResponse> {
    if action_ids.len() != pdf.len() {
        return Err(invalid_argument(format!(
            "action ids ({}) and pdf ({}) disagree in length",
            action_ids.len(),
            pdf.len()
        )));
    }
    let mut response = RankingResponse::new();
    for (id, p) in action_ids.iter().zip(pdf.iter()) {
        response.push(*id, *p);
    }
    response.set_chosen_action_id(action_ids[chosen_index])?;
    response.set_event_id(event_id);
    response.set_model_id(model_id);
    Ok(response)
}

/// Sample from the pdf with the given seed, build the response, and move the
/// chosen entry to the front.
pub fn sample_and_populate_ranking(
    seed: u64,
    action_ids: &[usize],
    pdf: &mut [f32],
    event_id: &str,
    model_id: &str,
) -> RlResult<RankingResponse> {
    let chosen_index = sample_after_normalizing(seed, pdf)?;
    let mut response = populate_ranking(chosen_index, action_ids, pdf, event_id, model_id)?;
    swap_chosen(response.entries_mut(), chosen_index)?;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populate_rejects_length_mismatch() {
        let err = populate_ranking(0, &[1, 2, 3], &[0.5, 0.5], "e", "m").unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn chosen_entry_lands_first() {
        let mut pdf = vec![0.0, 0.0, 1.0];
        let resp = sample_and_populate_ranking(9, &[5, 6, 7], &mut pdf, "evt", "mdl").unwrap();
        assert_eq!(resp.chosen_action_id(), 7);
        assert_eq!(resp.iter().next().unwrap().action_id, 7);
        assert_eq!(resp.len(), 3);
    }

    #[test]
    fn chosen_action_must_exist() {
        let mut resp = RankingResponse::new();
        resp.push(1, 1.0);
        assert!(resp.set_chosen_action_id(2).is_err());
        assert!(resp.set_chosen_action_id(1).is_ok());
    }
}
