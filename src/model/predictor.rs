// src/model/predictor.rs
use crate::error::{model_update_error, RlResult};

/// Raw model bytes plus a monotonically increasing refresh counter. A
/// refresh count of zero means "nothing new since the last poll".
#[derive(Clone, Debug, Default)]
pub struct ModelData {
    pub data: Vec<u8>,
    pub refresh_count: u64,
}

impl ModelData {
    pub fn new(data: Vec<u8>, refresh_count: u64) -> Self {
        Self { data, refresh_count }
    }
}

/// Opaque transport collaborator used for both startup load and background
/// refresh polling.
pub trait ModelTransport: Send + Sync {
    fn get_data(&self) -> RlResult<ModelData>;
}

/// Transport that never has model data. Keeps a freshly configured client
/// in explore-only mode until a real transport is wired up.
pub struct NoModelTransport;

impl ModelTransport for NoModelTransport {
    fn get_data(&self) -> RlResult<ModelData> {
        Ok(ModelData::default())
    }
}

/// Opaque prediction collaborator. One instance serves one request at a
/// time; concurrency comes from pooling instances, not from sharing one.
pub trait Predictor: Send {
    /// Ranked candidate actions for a CB request:
    /// (action ids, pdf, model version).
    fn choose_rank(&mut self, seed: u64, context: &str)
        -> RlResult<(Vec<usize>, Vec<f32>, String)>;

    /// Continuous action: (chosen value, pdf at that point, model version).
    fn choose_continuous_action(&mut self, context: &str) -> RlResult<(f32, f32, String)>;

    /// Per-slot candidates: (action ids per slot, pdfs per slot, model
    /// version). Outer order matches `slot_ids`.
    fn request_multi_slot(
        &mut self,
        event_id: &str,
        slot_ids: &[String],
        context: &str,
    ) -> RlResult<(Vec<Vec<usize>>, Vec<Vec<f32>>, String)>;
}

/// Builds predictor instances from raw model bytes. The pool calls this
/// once per pooled instance, so implementations should keep a parsed form
/// of the bytes around rather than reparsing per call.
pub trait PredictorFactory: Send + Sync {
    fn create(&self, model: &[u8]) -> RlResult<Box<dyn Predictor>>;
}

/// Placeholder factory bound when no predictor implementation was
/// configured. Model updates fail loudly instead of silently serving
/// garbage.
pub struct UnconfiguredPredictorFactory;

impl PredictorFactory for UnconfiguredPredictorFactory {
    fn create(&self, _model: &[u8]) -> RlResult<Box<dyn Predictor>> {
        Err(model_update_error(
            "no predictor implementation registered for this client",
        ))
    }
}
