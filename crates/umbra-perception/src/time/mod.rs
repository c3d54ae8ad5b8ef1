//! Frame timing, debounced mutation, and timed value transitions.

mod debounce;
mod frame_clock;
mod transition;

pub use debounce::DebounceQueue;
pub use frame_clock::{FrameClock, FrameTime};
pub use transition::{TransitionOutcome, Transitions};
