use std::fmt;

/// Lifecycle of one performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PlayerState {
    Idle = 0,
    Countdown = 1,
    Playing = 2,
    /// A pause was requested and waits for the next bar marker.
    Pausing = 3,
    Paused = 4,
    Stopping = 5,
    Stopped = 6,
    Finished = 7,
}

impl PlayerState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Countdown,
            2 => Self::Playing,
            3 => Self::Pausing,
            4 => Self::Paused,
            5 => Self::Stopping,
            6 => Self::Stopped,
            7 => Self::Finished,
            _ => Self::Idle,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Finished)
    }

    /// Whether the worker is between countdown and its terminal state.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Countdown | Self::Playing | Self::Pausing | Self::Paused | Self::Stopping
        )
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Countdown => "countdown",
            Self::Playing => "playing",
            Self::Pausing => "pausing",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}
