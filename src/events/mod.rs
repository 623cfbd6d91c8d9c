// Events module - THE OUTBOX
// One immutable, ordered event per state transition

mod event;
mod log;

pub use event::{EventEnvelope, PacketEvent};
pub use log::EventLog;
