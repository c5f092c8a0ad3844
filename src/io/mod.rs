//! Input adapters.
//!
//! - [`replay`]: JSON-lines recordings of matcher output, used to drive a
//!   recognition run without a camera or a matcher

pub mod replay;

pub use replay::{Observation, Recording, ReplayFrames};
