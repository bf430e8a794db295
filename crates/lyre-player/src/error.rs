use lyre_input::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("backend rejected the performance: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to spawn the player thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("player thread panicked")]
    WorkerPanicked,

    #[error("player already joined")]
    AlreadyJoined,
}
