// src/live/core.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::background::PeriodicWorker;
use crate::config::{names, values, Configuration, LearningMode};
use crate::context::{get_action_count, get_slot_count, get_slot_ids};
use crate::episode::EpisodeState;
use crate::error::{
    invalid_argument, model_rank_error, model_update_error, protocol_not_supported, ErrorCode,
    RlError, RlResult,
};
use crate::explore::sampling::{epsilon_greedy, sample_after_normalizing, swap_chosen};
use crate::explore::seed::{event_seed, slot_seed, uniform_hash};
use crate::factory::FactoryRegistry;
use crate::logger::encoding::QueueSection;
use crate::logger::event::{event_flags, DecisionEvent, OutcomeEvent, OutcomeValue, SlotRecord};
use crate::logger::pipeline::EventLogger;
use crate::model::downloader::ModelDownloader;
use crate::model::manager::PredictorManager;
use crate::model::predictor::ModelTransport;
use crate::model::watchdog::{ErrorCallback, ErrorHandler, Watchdog};
use crate::response::multi_slot::{
    populate_multi_slot, populate_multi_slot_detailed, MultiSlotResponse,
    MultiSlotResponseDetailed,
};
use crate::response::ranking::{
    populate_ranking, sample_and_populate_ranking, RankingResponse,
};
use crate::response::continuous::ContinuousActionResponse;
use crate::trace::{create_trace_logger, trace_info, NullTraceLogger, TraceLogger};

const EXPLORE_ONLY_MODEL_ID: &str = "N/A";

fn learning_mode_name(mode: LearningMode) -> &'static str {
    match mode {
        LearningMode::Online => values::LEARNING_MODE_ONLINE,
        LearningMode::Apprentice => values::LEARNING_MODE_APPRENTICE,
        LearningMode::LoggingOnly => values::LEARNING_MODE_LOGGINGONLY,
    }
}

fn check_not_empty(value: &str, what: &str) -> RlResult<()> {
    if value.is_empty() {
        return Err(invalid_argument(format!("{what} must not be empty")));
    }
    Ok(())
}

/// Shared orchestrator behind every loop facade. One instance serves many
/// caller threads after `init()`; mutability past init lives behind the
/// pool mutex, the queue locks and the watchdog atomics.
pub struct LiveModelCore {
    config: Configuration,
    registry: FactoryRegistry,
    trace: Arc<dyn TraceLogger>,
    learning_mode: LearningMode,
    protocol_version: i64,
    background_refresh: bool,
    initial_epsilon: f32,
    seed_shift: u64,
    initialized: bool,
    watchdog: Arc<Watchdog>,
    errors: ErrorHandler,
    manager: Option<Arc<PredictorManager>>,
    transport: Option<Arc<dyn ModelTransport>>,
    refresh_worker: Option<PeriodicWorker>,
    interaction_logger: Option<EventLogger>,
    observation_logger: Option<EventLogger>,
}

impl LiveModelCore {
    pub fn new(config: Configuration, registry: FactoryRegistry) -> Self {
        Self::with_error_callback(config, registry, None)
    }

    pub fn with_error_callback(
        config: Configuration,
        registry: FactoryRegistry,
        callback: Option<ErrorCallback>,
    ) -> Self {
        let watchdog = Arc::new(Watchdog::new());
        let errors = ErrorHandler::new(Arc::clone(&watchdog), callback);
        let learning_mode = LearningMode::from_config(&config);
        let protocol_version =
            config.get_int(names::PROTOCOL_VERSION, values::DEFAULT_PROTOCOL_VERSION);
        let background_refresh = config.get_bool(
            names::MODEL_BACKGROUND_REFRESH,
            values::DEFAULT_MODEL_BACKGROUND_REFRESH,
        );
        let initial_epsilon =
            config.get_float(names::INITIAL_EPSILON, values::DEFAULT_INITIAL_EPSILON);
        let seed_shift = uniform_hash(config.get(names::APP_ID, ""));
        Self {
            config,
            registry,
            trace: Arc::new(NullTraceLogger),
            learning_mode,
            protocol_version,
            background_refresh,
            initial_epsilon,
            seed_shift,
            initialized: false,
            watchdog,
            errors,
            manager: None,
            transport: None,
            refresh_worker: None,
            interaction_logger: None,
            observation_logger: None,
        }
    }

    /// Idempotent: a second call after success is a no-op. The four
    /// sub-initializations run in order and short-circuit on failure.
    pub fn init(&mut self) -> RlResult<()> {
        if self.initialized {
            return Ok(());
        }
        self.init_trace()?;
        self.init_model()?;
        self.init_model_mgmt()?;
        self.init_loggers()?;
        self.initialized = true;
        Ok(())
    }

    fn init_trace(&mut self) -> RlResult<()> {
        self.trace = create_trace_logger(&self.config)?;
        trace_info(self.trace.as_ref(), "API tracing initialized");
        Ok(())
    }

    fn init_model(&mut self) -> RlResult<()> {
        let impl_name = self
            .config
            .get(names::MODEL_IMPLEMENTATION, values::NO_MODEL)
            .to_string();
        let factory = self.registry.create_predictor_factory(&impl_name)?;
        self.manager = Some(Arc::new(PredictorManager::new(factory, Arc::clone(&self.trace))));
        Ok(())
    }

    fn init_model_mgmt(&mut self) -> RlResult<()> {
        let transport_name = self
            .config
            .get(names::MODEL_SRC, values::NO_MODEL_DATA)
            .to_string();
        let transport = self.registry.create_transport(&transport_name, &self.config)?;
        self.transport = Some(Arc::clone(&transport));

        if self.background_refresh {
            let interval = Duration::from_millis(
                self.config
                    .get_int(
                        names::MODEL_REFRESH_INTERVAL_MS,
                        values::DEFAULT_MODEL_REFRESH_INTERVAL_MS,
                    )
                    .max(1) as u64,
            );
            let manager = Arc::clone(self.manager.as_ref().expect("manager initialized"));
            let mut downloader = ModelDownloader::new(
                transport,
                Arc::clone(&self.trace),
                Box::new(move |data| {
                    manager.update(data)?;
                    Ok(())
                }),
            );
            self.refresh_worker = Some(PeriodicWorker::start(
                "model downloader",
                interval,
                self.errors.clone(),
                move || downloader.run_once(),
            ));
            return Ok(());
        }

        self.refresh_model_internal()
    }

    fn init_loggers(&mut self) -> RlResult<()> {
        let interaction_impl = self
            .config
            .get(names::INTERACTION_SENDER_IMPLEMENTATION, values::FILE_SENDER)
            .to_string();
        let interaction_sender = self.registry.create_sender(
            &interaction_impl,
            &self.config,
            QueueSection::Interaction,
        )?;
        self.interaction_logger = Some(EventLogger::build(
            &self.config,
            QueueSection::Interaction,
            self.protocol_version,
            interaction_sender,
            self.errors.clone(),
        )?);

        let observation_impl = self
            .config
            .get(names::OBSERVATION_SENDER_IMPLEMENTATION, values::FILE_SENDER)
            .to_string();
        let observation_sender = self.registry.create_sender(
            &observation_impl,
            &self.config,
            QueueSection::Observation,
        )?;
        self.observation_logger = Some(EventLogger::build(
            &self.config,
            QueueSection::Observation,
            self.protocol_version,
            observation_sender,
            self.errors.clone(),
        )?);
        Ok(())
    }

    fn ensure_initialized(&self) -> RlResult<()> {
        if !self.initialized {
            return Err(RlError::new(
                ErrorCode::NotInitialized,
                "init() must succeed before this call",
            ));
        }
        Ok(())
    }

    fn manager(&self) -> &Arc<PredictorManager> {
        self.manager.as_ref().expect("checked by ensure_initialized")
    }

    fn interaction_logger(&self) -> &EventLogger {
        self.interaction_logger
            .as_ref()
            .expect("checked by ensure_initialized")
    }

    fn observation_logger(&self) -> &EventLogger {
        self.observation_logger
            .as_ref()
            .expect("checked by ensure_initialized")
    }

    /// Background errors are surfaced on the next foreground call, after
    /// the call's own work (including logging) has already completed.
    fn check_watchdog(&self) -> RlResult<()> {
        if self.watchdog.take_background_error_report() {
            let detail = self
                .watchdog
                .last_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown background failure".to_string());
            return Err(RlError::new(
                ErrorCode::UnhandledBackgroundErrorOccurred,
                format!("a background thread reported an error: {detail}"),
            ));
        }
        Ok(())
    }

    pub fn model_ready(&self) -> bool {
        self.manager.as_ref().is_some_and(|m| m.model_ready())
    }

    pub fn learning_mode(&self) -> LearningMode {
        self.learning_mode
    }

    pub fn protocol_version(&self) -> i64 {
        self.protocol_version
    }

    // ---- CB ----------------------------------------------------------

    pub fn choose_rank(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<RankingResponse> {
        self.choose_rank_impl(event_id, context, flags, None, None)
    }

    /// Same as `choose_rank` with an auto-generated event id.
    pub fn choose_rank_auto(&self, context: &str, flags: u32) -> RlResult<RankingResponse> {
        let event_id = Uuid::new_v4().to_string();
        self.choose_rank(&event_id, context, flags)
    }

    fn choose_rank_impl(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
        episode_id: Option<&str>,
        previous_event_id: Option<&str>,
    ) -> RlResult<RankingResponse> {
        self.ensure_initialized()?;
        check_not_empty(event_id, "event id")?;
        check_not_empty(context, "context")?;

        let mut response = if self.manager().model_ready() {
            self.explore_exploit(event_id, context)?
        } else {
            self.explore_only(event_id, context)?
        };
        response.set_event_id(event_id);

        // LoggingOnly resets the ranking before logging so the record
        // reflects that no real ranking happened; Apprentice resets after,
        // keeping the ranked order in the record but returning the
        // baseline order to the caller. Online does neither.
        if self.learning_mode == LearningMode::LoggingOnly {
            response.reset_to_ascending();
        }
        self.log_ranking(context, flags, &response, episode_id, previous_event_id)?;
        if self.learning_mode == LearningMode::Apprentice {
            response.reset_to_ascending();
        }

        self.check_watchdog()?;
        Ok(response)
    }

    fn explore_only(&self, event_id: &str, context: &str) -> RlResult<RankingResponse> {
        let action_count = get_action_count(context)?;
        if action_count == 0 && self.learning_mode != LearningMode::Online {
            // Apprentice/LoggingOnly need a caller-supplied baseline to
            // fall back on before a model is ready.
            return Err(RlError::new(
                ErrorCode::BaselineActionsNotDefined,
                "learning mode requires baseline actions in the context",
            ));
        }
        // No ranking has happened yet, so the caller's first action is the
        // presumed top pick and the action id equals its index.
        let mut pdf = epsilon_greedy(self.initial_epsilon, 0, action_count)?;
        let seed = event_seed(self.seed_shift, event_id);
        let chosen = sample_after_normalizing(seed, &mut pdf)?;
        let ids: Vec<usize> = (0..action_count).collect();
        let mut response = populate_ranking(chosen, &ids, &pdf, event_id, EXPLORE_ONLY_MODEL_ID)?;
        swap_chosen(response.entries_mut(), chosen)?;
        Ok(response)
    }

    fn explore_exploit(&self, event_id: &str, context: &str) -> RlResult<RankingResponse> {
        let seed = event_seed(self.seed_shift, event_id);
        let (action_ids, mut pdf, model_id) = self.manager().choose_rank(seed, context)?;
        sample_and_populate_ranking(seed, &action_ids, &mut pdf, event_id, &model_id)
    }

    fn log_ranking(
        &self,
        context: &str,
        flags: u32,
        response: &RankingResponse,
        episode_id: Option<&str>,
        previous_event_id: Option<&str>,
    ) -> RlResult<()> {
        let event = DecisionEvent {
            event_id: response.event_id().to_string(),
            kind: if episode_id.is_some() { "multistep" } else { "cb" }.to_string(),
            context: context.to_string(),
            model_id: response.model_id().to_string(),
            learning_mode: learning_mode_name(self.learning_mode).to_string(),
            deferred: flags & event_flags::DEFERRED_ACTION != 0,
            episode_id: episode_id.map(str::to_string),
            previous_event_id: previous_event_id.map(str::to_string),
            action_ids: response.iter().map(|e| e.action_id).collect(),
            probabilities: response.iter().map(|e| e.probability).collect(),
            slots: None,
            action_value: None,
            pdf_value: None,
            ts: Utc::now(),
        };
        self.interaction_logger().log_decision(event)
    }

    // ---- CCB / slates ------------------------------------------------

    /// Multi-slot decision under one event id. Protocol version >= 2.
    pub fn request_multi_slot_decision(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
        kind: MultiSlotKind,
    ) -> RlResult<MultiSlotResponse> {
        let (ids, pdfs, slot_ids, model_id) =
            self.multi_slot_prepare(event_id, context, RequiredVersion::AtLeastV2)?;
        let response = populate_multi_slot(&ids, &pdfs, &slot_ids, event_id, &model_id)?;
        self.log_multi_slot(event_id, context, flags, &ids, &pdfs, &slot_ids, &model_id, kind)?;
        self.check_watchdog()?;
        Ok(response)
    }

    /// Detailed variant: every slot keeps its full ranked distribution.
    pub fn request_multi_slot_decision_detailed(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
        kind: MultiSlotKind,
    ) -> RlResult<MultiSlotResponseDetailed> {
        let (ids, pdfs, slot_ids, model_id) =
            self.multi_slot_prepare(event_id, context, RequiredVersion::AtLeastV2)?;
        let response = populate_multi_slot_detailed(&ids, &pdfs, &slot_ids, event_id, &model_id)?;
        self.log_multi_slot(event_id, context, flags, &ids, &pdfs, &slot_ids, &model_id, kind)?;
        self.check_watchdog()?;
        Ok(response)
    }

    /// Legacy per-event CCB call: each slot carries its own event id. Only
    /// legal under protocol version 1.
    pub fn request_decision(&self, context: &str, flags: u32) -> RlResult<MultiSlotResponse> {
        let event_id = Uuid::new_v4().to_string();
        let (ids, pdfs, slot_ids, model_id) =
            self.multi_slot_prepare(&event_id, context, RequiredVersion::ExactlyV1)?;
        let response = populate_multi_slot(&ids, &pdfs, &slot_ids, &event_id, &model_id)?;
        self.log_multi_slot(
            &event_id,
            context,
            flags,
            &ids,
            &pdfs,
            &slot_ids,
            &model_id,
            MultiSlotKind::Ccb,
        )?;
        self.check_watchdog()?;
        Ok(response)
    }

    #[allow(clippy::type_complexity)]
    fn multi_slot_prepare(
        &self,
        event_id: &str,
        context: &str,
        required: RequiredVersion,
    ) -> RlResult<(Vec<Vec<usize>>, Vec<Vec<f32>>, Vec<String>, String)> {
        self.ensure_initialized()?;
        match required {
            RequiredVersion::AtLeastV2 if self.protocol_version < 2 => {
                return Err(protocol_not_supported(
                    "multi-slot decisions require protocol version >= 2",
                ));
            }
            RequiredVersion::ExactlyV1 if self.protocol_version >= 2 => {
                return Err(protocol_not_supported(
                    "the legacy per-event decision call is not supported under protocol version >= 2",
                ));
            }
            _ => {}
        }
        if self.learning_mode != LearningMode::Online {
            return Err(protocol_not_supported(
                "multi-slot decisions are only supported in Online learning mode",
            ));
        }
        check_not_empty(event_id, "event id")?;
        check_not_empty(context, "context")?;

        let slot_count = get_slot_count(context)?;
        if slot_count == 0 {
            return Err(invalid_argument("context has no slots"));
        }
        // Auto-generate ids only for slots without an explicit one.
        let slot_ids: Vec<String> = get_slot_ids(context)?
            .into_iter()
            .map(|id| id.unwrap_or_else(|| format!("{}{}", Uuid::new_v4(), self.seed_shift)))
            .collect();

        let base_seed = event_seed(self.seed_shift, event_id);
        let (mut ids, mut pdfs, model_id) = if self.manager().model_ready() {
            self.manager().request_multi_slot(event_id, &slot_ids, context)?
        } else {
            let action_count = get_action_count(context)?;
            if action_count == 0 {
                return Err(invalid_argument("context has no actions"));
            }
            let pdf = epsilon_greedy(self.initial_epsilon, 0, action_count)?;
            let actions: Vec<usize> = (0..action_count).collect();
            (
                vec![actions; slot_count],
                vec![pdf; slot_count],
                EXPLORE_ONLY_MODEL_ID.to_string(),
            )
        };

        // Each slot draws independently: the slot index is mixed into the
        // event seed even though all slots share one predictor call.
        for (slot_index, (slot_actions, slot_pdf)) in
            ids.iter_mut().zip(pdfs.iter_mut()).enumerate()
        {
            if slot_actions.len() != slot_pdf.len() {
                return Err(invalid_argument(format!(
                    "slot {slot_index}: {} action ids but {} probabilities",
                    slot_actions.len(),
                    slot_pdf.len()
                )));
            }
            let chosen = sample_after_normalizing(slot_seed(base_seed, slot_index), slot_pdf)?;
            slot_actions.swap(0, chosen);
            slot_pdf.swap(0, chosen);
        }

        Ok((ids, pdfs, slot_ids, model_id))
    }

    #[allow(clippy::too_many_arguments)]
    fn log_multi_slot(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
        ids: &[Vec<usize>],
        pdfs: &[Vec<f32>],
        slot_ids: &[String],
        model_id: &str,
        kind: MultiSlotKind,
    ) -> RlResult<()> {
        let slots = slot_ids
            .iter()
            .zip(ids.iter().zip(pdfs.iter()))
            .map(|(slot_id, (actions, pdf))| SlotRecord {
                slot_id: slot_id.clone(),
                action_id: actions[0],
                probability: pdf[0],
            })
            .collect();
        let event = DecisionEvent {
            event_id: event_id.to_string(),
            kind: kind.name().to_string(),
            context: context.to_string(),
            model_id: model_id.to_string(),
            learning_mode: learning_mode_name(self.learning_mode).to_string(),
            deferred: flags & event_flags::DEFERRED_ACTION != 0,
            episode_id: None,
            previous_event_id: None,
            action_ids: Vec::new(),
            probabilities: Vec::new(),
            slots: Some(slots),
            action_value: None,
            pdf_value: None,
            ts: Utc::now(),
        };
        self.interaction_logger().log_decision(event)
    }

    // ---- CA ----------------------------------------------------------

    pub fn request_continuous_action(
        &self,
        event_id: &str,
        context: &str,
        flags: u32,
    ) -> RlResult<ContinuousActionResponse> {
        self.ensure_initialized()?;
        check_not_empty(event_id, "event id")?;
        check_not_empty(context, "context")?;
        if !self.manager().model_ready() {
            return Err(model_rank_error(
                "no predictor is available for continuous-action decisions",
            ));
        }
        let (value, pdf_value, model_id) = self.manager().choose_continuous_action(context)?;
        let response = ContinuousActionResponse::new(event_id, &model_id, value, pdf_value);

        let event = DecisionEvent {
            event_id: event_id.to_string(),
            kind: "ca".to_string(),
            context: context.to_string(),
            model_id,
            learning_mode: learning_mode_name(self.learning_mode).to_string(),
            deferred: flags & event_flags::DEFERRED_ACTION != 0,
            episode_id: None,
            previous_event_id: None,
            action_ids: Vec::new(),
            probabilities: Vec::new(),
            slots: None,
            action_value: Some(value),
            pdf_value: Some(pdf_value),
            ts: Utc::now(),
        };
        self.interaction_logger().log_decision(event)?;
        self.check_watchdog()?;
        Ok(response)
    }

    // ---- multi-step --------------------------------------------------

    pub fn request_episodic_decision(
        &self,
        event_id: &str,
        previous_event_id: Option<&str>,
        context: &str,
        episode: &mut EpisodeState,
    ) -> RlResult<RankingResponse> {
        self.ensure_initialized()?;
        check_not_empty(event_id, "event id")?;
        check_not_empty(context, "context")?;

        let depth_context = episode.history().get_context(previous_event_id, context)?;
        let response = self.choose_rank_impl(
            event_id,
            &depth_context,
            event_flags::DEFAULT,
            Some(episode.episode_id()),
            previous_event_id,
        )?;
        episode.update(event_id, previous_event_id);
        Ok(response)
    }

    // ---- outcomes ----------------------------------------------------

    pub fn report_outcome(&self, event_id: &str, outcome: OutcomeValue) -> RlResult<()> {
        self.ensure_initialized()?;
        check_not_empty(event_id, "event id")?;
        if let OutcomeValue::Json(payload) = &outcome {
            check_not_empty(payload, "outcome")?;
        }
        self.observation_logger().log_outcome(OutcomeEvent {
            event_id: event_id.to_string(),
            secondary_id: None,
            outcome: Some(outcome),
            action_taken: false,
            ts: Utc::now(),
        })
    }

    /// Slot-level outcome for CCB: keyed by (primary, secondary) id pair.
    pub fn report_outcome_per_slot(
        &self,
        primary_id: &str,
        secondary_id: &str,
        outcome: OutcomeValue,
    ) -> RlResult<()> {
        self.ensure_initialized()?;
        if self.protocol_version < 2 {
            return Err(protocol_not_supported(
                "slot-level outcomes require protocol version >= 2",
            ));
        }
        check_not_empty(primary_id, "primary id")?;
        check_not_empty(secondary_id, "secondary id")?;
        if let OutcomeValue::Json(payload) = &outcome {
            check_not_empty(payload, "outcome")?;
        }
        self.observation_logger().log_outcome(OutcomeEvent {
            event_id: primary_id.to_string(),
            secondary_id: Some(secondary_id.to_string()),
            outcome: Some(outcome),
            action_taken: false,
            ts: Utc::now(),
        })
    }

    /// Activate a previously deferred event.
    pub fn report_action_taken(&self, event_id: &str) -> RlResult<()> {
        self.ensure_initialized()?;
        check_not_empty(event_id, "event id")?;
        self.observation_logger().log_outcome(OutcomeEvent {
            event_id: event_id.to_string(),
            secondary_id: None,
            outcome: None,
            action_taken: true,
            ts: Utc::now(),
        })
    }

    // ---- model refresh ----------------------------------------------

    /// Synchronous model pull. Only legal when background refresh is off;
    /// the two would race on the same factory slot otherwise.
    pub fn refresh_model(&self) -> RlResult<()> {
        self.ensure_initialized()?;
        if self.background_refresh {
            return Err(model_update_error(
                "cannot manually refresh the model while background refresh is enabled",
            ));
        }
        self.refresh_model_internal()
    }

    fn refresh_model_internal(&self) -> RlResult<()> {
        let transport = self
            .transport
            .as_ref()
            .expect("transport initialized before refresh");
        let data = transport.get_data()?;
        if data.refresh_count == 0 {
            trace_info(self.trace.as_ref(), "no model data available yet");
            return Ok(());
        }
        self.manager
            .as_ref()
            .expect("manager initialized before refresh")
            .update(data)?;
        Ok(())
    }
}

/// Which multi-slot flavor a request is logged as. Slates partition the
/// action pool per slot up front; CCB shares one pool across slots. The
/// decision plumbing is identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultiSlotKind {
    Ccb,
    Slates,
}

impl MultiSlotKind {
    fn name(self) -> &'static str {
        match self {
            MultiSlotKind::Ccb => "ccb",
            MultiSlotKind::Slates => "slates",
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum RequiredVersion {
    ExactlyV1,
    AtLeastV2,
}
