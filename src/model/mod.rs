pub mod downloader;
pub mod manager;
pub mod pool;
pub mod predictor;
pub mod watchdog;

pub use downloader::ModelDownloader;
pub use manager::PredictorManager;
pub use pool::{PooledObject, VersionedObjectPool};
pub use predictor::{ModelData, ModelTransport, NoModelTransport, Predictor, PredictorFactory};
pub use watchdog::{ErrorCallback, ErrorHandler, Watchdog};
