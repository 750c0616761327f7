//! Task spawning and generation primitives.
//!
//! * [`spawn`]: run work on the ambient tokio runtime inside a span naming its class.
//! * [`TaskClass`]: classification attached to every spawn for trace output.
//! * [`GenerationClock`]: monotonic ids for container handles and pending tickets.

mod class;
mod generation;
mod spawn;

pub use class::TaskClass;
pub use generation::GenerationClock;
pub use spawn::spawn;
