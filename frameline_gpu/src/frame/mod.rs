/// Frame counting, frame-age based retirement and command stream bracketing

mod frame_clock;
mod deferred_destruction;
mod command_stream;

pub use frame_clock::FrameClock;
pub use deferred_destruction::{DeferredDestructionQueue, ResourceToDelete};
pub use command_stream::CommandStreamOrchestrator;
