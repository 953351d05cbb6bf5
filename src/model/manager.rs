// src/model/manager.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{model_rank_error, RlResult};
use crate::model::pool::{PoolFactory, VersionedObjectPool};
use crate::model::predictor::{ModelData, Predictor, PredictorFactory};
use crate::trace::TraceLogger;

/// Owns the versioned predictor pool and the "is a model loaded yet" state.
/// Predict calls borrow an instance and run on the caller's thread; the
/// pool mutex is only held for the borrow/return bookkeeping.
pub struct PredictorManager {
    factory: Arc<dyn PredictorFactory>,
    pool: Arc<VersionedObjectPool<Box<dyn Predictor>>>,
    model_ready: AtomicBool,
}

fn pool_factory(
    factory: Arc<dyn PredictorFactory>,
    model: Arc<Vec<u8>>,
) -> PoolFactory<Box<dyn Predictor>> {
    Arc::new(move || factory.create(&model))
}

impl PredictorManager {
    pub fn new(factory: Arc<dyn PredictorFactory>, trace: Arc<dyn TraceLogger>) -> Self {
        // Until the first update there is nothing to build predictors from.
        let empty = pool_factory(Arc::clone(&factory), Arc::new(Vec::new()));
        Self {
            factory,
            pool: Arc::new(VersionedObjectPool::new(empty, trace)),
            model_ready: AtomicBool::new(false),
        }
    }

    /// Rebuild the pool factory from fresh model bytes. Consumes the buffer.
    /// Returns the ready flag: true once a predictor can actually be built
    /// from these bytes.
    pub fn update(&self, data: ModelData) -> RlResult<bool> {
        let model = Arc::new(data.data);
        // Validate the bytes by building one instance before swapping the
        // factory in; a bad model must not poison the live pool.
        let candidate_factory = pool_factory(Arc::clone(&self.factory), Arc::clone(&model));
        let _probe = candidate_factory()?;
        self.pool.update_factory(candidate_factory)?;
        self.model_ready.store(true, Ordering::Release);
        Ok(true)
    }

    pub fn model_ready(&self) -> bool {
        self.model_ready.load(Ordering::Acquire)
    }

    pub fn pool_version(&self) -> u64 {
        self.pool.version()
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    pub fn choose_rank(
        &self,
        seed: u64,
        context: &str,
    ) -> RlResult<(Vec<usize>, Vec<f32>, String)> {
        let mut predictor = self.pool.get_or_create()?;
        predictor
            .choose_rank(seed, context)
            .map_err(|e| model_rank_error(format!("predictor rank failed: {e}")))
    }

    pub fn choose_continuous_action(&self, context: &str) -> RlResult<(f32, f32, String)> {
        let mut predictor = self.pool.get_or_create()?;
        predictor
            .choose_continuous_action(context)
            .map_err(|e| model_rank_error(format!("predictor continuous action failed: {e}")))
    }

    pub fn request_multi_slot(
        &self,
        event_id: &str,
        slot_ids: &[String],
        context: &str,
    ) -> RlResult<(Vec<Vec<usize>>, Vec<Vec<f32>>, String)> {
        let mut predictor = self.pool.get_or_create()?;
        predictor
            .request_multi_slot(event_id, slot_ids, context)
            .map_err(|e| model_rank_error(format!("predictor multi-slot failed: {e}")))
    }
}
