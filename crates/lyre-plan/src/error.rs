use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("speed must be a positive number, got {0}")]
    InvalidSpeed(f64),

    #[error("layout has no playable keys at root pitch {0}")]
    EmptyLayout(i32),
}
