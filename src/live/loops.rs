// src/live/loops.rs
//
// Caller-facing entry points. `LiveModel` exposes the whole surface; the
// typed loops wrap the same core and narrow it to one decision family so
// a CB caller cannot accidentally issue a slates request.

use crate::config::{Configuration, LearningMode};
use crate::episode::EpisodeState;
use crate::error::RlResult;
use crate::factory::FactoryRegistry;
use crate::logger::event::OutcomeValue;
use crate::model::watchdog::ErrorCallback;
use crate::response::continuous::ContinuousActionResponse;
use crate::response::multi_slot::{MultiSlotResponse, MultiSlotResponseDetailed};
use crate::response::ranking::RankingResponse;

use super::core::{LiveModelCore, MultiSlotKind};

macro_rules! loop_outcome_api {
    () => {
        pub fn report_outcome(&self, event_id: &str, outcome: OutcomeValue) -> RlResult<()> {
            self.core.report_outcome(event_id, outcome)
        }

        pub fn report_action_taken(&self, event_id: &str) -> RlResult<()> {
            self.core.report_action_taken(event_id)
        }
    };
}

macro_rules! loop_common_api {
    () => {
        pub fn init(&mut self) -> RlResult<()> {
            self.core.init()
        }

        pub fn refresh_model(&self) -> RlResult<()> {
            self.core.refresh_model()
        }

        pub fn model_ready(&self) -> bool {
            self.core.model_ready()
        }
    };
}

/// The all-surface client. Prefer a typed loop unless one process genuinely
/// mixes decision families.
pub struct LiveModel {
    core: LiveModelCore,
}

impl LiveModel {
    pub fn new(config: Configuration) -> Self {
        Self { core: LiveModelCore::new(config, FactoryRegistry::default()) }
    }

    pub fn with_registry(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    pub fn with_error_callback(
        config: Configuration,
        registry: FactoryRegistry,
        callback: ErrorCallback,
    ) -> Self {
        Self { core: LiveModelCore::with_error_callback(config, registry, Some(callback)) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn learning_mode(&self) -> LearningMode {
        self.core.learning_mode()
    }

    pub fn choose_rank(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<RankingResponse> {
        self.core.choose_rank(event_id, context, flags)
    }

    pub fn choose_rank_auto(&self, context: &str, flags: u32) -> RlResult<RankingResponse> {
        self.core.choose_rank_auto(context, flags)
    }

    pub fn request_decision(&self, context: &str, flags: u32) -> RlResult<MultiSlotResponse> {
        self.core.request_decision(context, flags)
    }

    pub fn request_multi_slot_decision(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponse> {
        self.core
            .request_multi_slot_decision(event_id, context, flags, MultiSlotKind::Ccb)
    }

    pub fn request_multi_slot_decision_detailed(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponseDetailed> {
        self.core
            .request_multi_slot_decision_detailed(event_id, context, flags, MultiSlotKind::Ccb)
    }

    pub fn request_continuous_action(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<ContinuousActionResponse> {
        self.core.request_continuous_action(event_id, context, flags)
    }

    pub fn request_episodic_decision(
        &self,
        event_id: &str,
        previous_event_id: Option<&str>,
        context: &str,
        episode: &mut EpisodeState,
    ) -> RlResult<RankingResponse> {
        self.core
            .request_episodic_decision(event_id, previous_event_id, context, episode)
    }

    pub fn report_outcome_per_slot(
        &self,
        primary_id: &str,
        secondary_id: &str,
        outcome: OutcomeValue,
    ) -> RlResult<()> {
        self.core.report_outcome_per_slot(primary_id, secondary_id, outcome)
    }
}

/// Single ranked-list decisions.
pub struct CbLoop {
    core: LiveModelCore,
}

impl CbLoop {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn choose_rank(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<RankingResponse> {
        self.core.choose_rank(event_id, context, flags)
    }

    pub fn choose_rank_auto(&self, context: &str, flags: u32) -> RlResult<RankingResponse> {
        self.core.choose_rank_auto(context, flags)
    }
}

/// Per-slot decisions over a shared action pool.
pub struct CcbLoop {
    core: LiveModelCore,
}

impl CcbLoop {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn request_multi_slot_decision(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponse> {
        self.core
            .request_multi_slot_decision(event_id, context, flags, MultiSlotKind::Ccb)
    }

    pub fn request_multi_slot_decision_detailed(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponseDetailed> {
        self.core
            .request_multi_slot_decision_detailed(event_id, context, flags, MultiSlotKind::Ccb)
    }

    pub fn report_outcome_per_slot(
        &self,
        primary_id: &str,
        secondary_id: &str,
        outcome: OutcomeValue,
    ) -> RlResult<()> {
        self.core.report_outcome_per_slot(primary_id, secondary_id, outcome)
    }
}

/// Per-slot decisions where each slot brings its own candidate actions.
pub struct SlatesLoop {
    core: LiveModelCore,
}

impl SlatesLoop {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn request_multi_slot_decision(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponse> {
        self.core
            .request_multi_slot_decision(event_id, context, flags, MultiSlotKind::Slates)
    }

    pub fn request_multi_slot_decision_detailed(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<MultiSlotResponseDetailed> {
        self.core
            .request_multi_slot_decision_detailed(event_id, context, flags, MultiSlotKind::Slates)
    }
}

/// Continuous-range decisions.
pub struct CaLoop {
    core: LiveModelCore,
}

impl CaLoop {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn request_continuous_action(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<ContinuousActionResponse> {
        self.core.request_continuous_action(event_id, context, flags)
    }
}

/// Chained decisions within caller-managed episodes.
pub struct EpisodicLoop {
    core: LiveModelCore,
}

impl EpisodicLoop {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self { core: LiveModelCore::new(config, registry) }
    }

    loop_common_api!();
    loop_outcome_api!();

    pub fn request_episodic_decision(
        &self,
        event_id: &str,
        previous_event_id: Option<&str>,
        context: &str,
        episode: &mut EpisodeState,
    ) -> RlResult<RankingResponse> {
        self.core
            .request_episodic_decision(event_id, previous_event_id, context, episode)
    }
}
