// src/factory.rs
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{names, values, Configuration};
use crate::error::{invalid_argument, RlResult};
use crate::logger::encoding::QueueSection;
use crate::logger::sender::{EventSender, FileSender, MockSender};
use crate::model::predictor::{
    ModelTransport, NoModelTransport, PredictorFactory, UnconfiguredPredictorFactory,
};

pub type SenderFactoryFn =
    Box<dyn Fn(&Configuration, QueueSection) -> RlResult<Box<dyn EventSender>> + Send + Sync>;
pub type TransportFactoryFn =
    Box<dyn Fn(&Configuration) -> RlResult<Arc<dyn ModelTransport>> + Send + Sync>;

/// Explicit constructor registry for the pluggable collaborators: senders,
/// model transports and predictor factories. Owned by whoever bootstraps
/// the client; nothing here is process-global.
pub struct FactoryRegistry {
    senders: HashMap<String, SenderFactoryFn>,
    transports: HashMap<String, TransportFactoryFn>,
    predictors: HashMap<String, Arc<dyn PredictorFactory>>,
}

impl FactoryRegistry {
    /// Empty registry, no implementations at all.
    pub fn empty() -> Self {
        Self {
            senders: HashMap::new(),
            transports: HashMap::new(),
            predictors: HashMap::new(),
        }
    }

    pub fn register_sender(&mut self, name: &str, factory: SenderFactoryFn) {
        self.senders.insert(name.to_string(), factory);
    }

    pub fn register_transport(&mut self, name: &str, factory: TransportFactoryFn) {
        self.transports.insert(name.to_string(), factory);
    }

    pub fn register_predictor_factory(&mut self, name: &str, factory: Arc<dyn PredictorFactory>) {
        self.predictors.insert(name.to_string(), factory);
    }

    pub fn create_sender(
        &self,
        name: &str,
        cfg: &Configuration,
        section: QueueSection,
    ) -> RlResult<Box<dyn EventSender>> {
        let factory = self
            .senders
            .get(name)
            .ok_or_else(|| invalid_argument(format!("unknown sender implementation '{name}'")))?;
        factory(cfg, section)
    }

    pub fn create_transport(
        &self,
        name: &str,
        cfg: &Configuration,
    ) -> RlResult<Arc<dyn ModelTransport>> {
        let factory = self
            .transports
            .get(name)
            .ok_or_else(|| invalid_argument(format!("unknown transport implementation '{name}'")))?;
        factory(cfg)
    }

    pub fn create_predictor_factory(&self, name: &str) -> RlResult<Arc<dyn PredictorFactory>> {
        self.predictors
            .get(name)
            .cloned()
            .ok_or_else(|| invalid_argument(format!("unknown model implementation '{name}'")))
    }
}

impl Default for FactoryRegistry {
    /// Registry with the built-in implementations: file and mock senders,
    /// the no-data transport, and the unconfigured predictor placeholder.
    fn default() -> Self {
        let mut registry = Self::empty();

        registry.register_sender(
            values::FILE_SENDER,
            Box::new(|cfg, section| {
                let path = match section {
                    QueueSection::Interaction => cfg.get(
                        names::INTERACTION_FILE_NAME,
                        values::DEFAULT_INTERACTION_FILE_NAME,
                    ),
                    QueueSection::Observation => cfg.get(
                        names::OBSERVATION_FILE_NAME,
                        values::DEFAULT_OBSERVATION_FILE_NAME,
                    ),
                };
                Ok(Box::new(FileSender::new(path)) as Box<dyn EventSender>)
            }),
        );
        registry.register_sender(
            values::MOCK_SENDER,
            Box::new(|_cfg, _section| {
                let (sender, _state) = MockSender::new();
                Ok(Box::new(sender) as Box<dyn EventSender>)
            }),
        );

        registry.register_transport(
            values::NO_MODEL_DATA,
            Box::new(|_cfg| Ok(Arc::new(NoModelTransport) as Arc<dyn ModelTransport>)),
        );

        registry
            .register_predictor_factory(values::NO_MODEL, Arc::new(UnconfiguredPredictorFactory));

        registry
    }
}
