pub mod batcher;
pub mod dedup;
pub mod encoding;
pub mod event;
pub mod pipeline;
pub mod preamble;
pub mod queue;
pub mod sender;

pub use batcher::{BatcherConfig, EventBatcher};
pub use dedup::DedupDict;
pub use encoding::{ContentEncoding, QueueSection};
pub use event::{event_flags, DecisionEvent, OutcomeEvent, OutcomeValue, SlotRecord};
pub use pipeline::EventLogger;
pub use preamble::{frame_message, message_type, Preamble};
pub use queue::{EventQueue, QueueMode};
pub use sender::{EventSender, FileSender, MockSender, MockSenderState};
