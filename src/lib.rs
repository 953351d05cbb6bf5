// src/lib.rs
//! Client library for serving contextual-bandit decisions against a
//! continuously retrained model. Decisions are sampled deterministically
//! from the current model's distribution, every decision and outcome is
//! shipped to the training pipeline as a framed event, and the model is
//! swapped in the background without blocking callers.

pub mod background;
pub mod config;
pub mod context;
pub mod episode;
pub mod error;
pub mod explore;
pub mod factory;
pub mod live;
pub mod logger;
pub mod model;
pub mod response;
pub mod trace;

pub use crate::config::{Configuration, LearningMode};
pub use crate::episode::EpisodeState;
pub use crate::error::{ErrorCode, RlError, RlResult};
pub use crate::factory::FactoryRegistry;
pub use crate::live::{CaLoop, CbLoop, CcbLoop, EpisodicLoop, LiveModel, SlatesLoop};
pub use crate::logger::event::{event_flags, OutcomeValue};
pub use crate::response::continuous::ContinuousActionResponse;
pub use crate::response::multi_slot::{MultiSlotResponse, MultiSlotResponseDetailed};
pub use crate::response::ranking::{ActionProb, RankingResponse};
