//! Real-time executor for a planned performance.
//!
//! A [`PlayerBuilder`] takes a [`lyre_plan::Plan`] and a key backend and runs
//! the plan on a dedicated thread. The returned [`Player`] (or any cloned
//! [`PlayerControl`]) can stop, pause at the next bar and resume it.

mod control;
pub mod error;
mod executor;
mod keys;
pub mod observer;
pub mod options;
mod player;
pub mod report;
pub mod state;

pub use control::PlayerControl;
pub use error::PlayerError;
pub use executor::{MAX_BATCH, PROGRESS_INTERVAL_US, TAP_HOLD_US};
pub use observer::{ChannelObserver, PlaybackObserver, PlayerEvent};
pub use options::PlayerOptions;
pub use player::{Player, PlayerBuilder};
pub use report::{ErrorStats, Outcome, PerformanceReport};
pub use state::PlayerState;
