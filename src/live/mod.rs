// src/live/mod.rs
pub mod core;
pub mod loops;

pub use self::core::{LiveModelCore, MultiSlotKind};
pub use loops::{CaLoop, CbLoop, CcbLoop, EpisodicLoop, LiveModel, SlatesLoop};
