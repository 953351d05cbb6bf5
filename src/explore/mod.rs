pub mod sampling;
pub mod seed;

pub use sampling::{epsilon_greedy, sample_after_normalizing, swap_chosen};
pub use seed::{event_seed, slot_seed, uniform_hash};
