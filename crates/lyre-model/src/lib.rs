// Score, note and keyboard layout types shared by the planner and the player.

pub mod error;
pub mod layout;
pub mod note;
pub mod score;
pub mod timing;

pub use error::ModelError;
pub use layout::{AvailableNotes, Layout, LayoutKind};
pub use note::NoteEvent;
pub use score::Score;
pub use timing::{BarTiming, DEFAULT_TEMPO_US, resolve_bar_beat};
