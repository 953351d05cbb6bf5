// src/response/continuous.rs

/// Continuous-action decision: a scalar action plus the density the model
/// assigned to it. Move-only like the other response types.
#[derive(Debug, Default)]
pub struct ContinuousActionResponse {
    event_id: String,
    model_id: String,
    chosen_action: f32,
    pdf_value: f32,
}

impl ContinuousActionResponse {
    pub fn new(
        event_id: impl Into<String>,
        model_id: impl Into<String>,
        chosen_action: f32,
        pdf_value: f32,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            model_id: model_id.into(),
            chosen_action,
            pdf_value,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn chosen_action(&self) -> f32 {
        self.chosen_action
    }

    pub fn pdf_value(&self) -> f32 {
        self.pdf_value
    }
}
