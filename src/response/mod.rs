pub mod continuous;
pub mod multi_slot;
pub mod ranking;

pub use continuous::ContinuousActionResponse;
pub use multi_slot::{
    populate_multi_slot, populate_multi_slot_detailed, MultiSlotResponse,
    MultiSlotResponseDetailed, SlotEntry, SlotRanking,
};
pub use ranking::{populate_ranking, sample_and_populate_ranking, ActionProb, RankingResponse};
