//! Misc utilities.

mod progress;
mod rate_counter;

pub use progress::*;
pub use rate_counter::*;
