use thiserror::Error;

use crate::backend::WindowHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("key injection backend unavailable: {0}")]
    Unavailable(String),

    #[error("target window {0} is not a valid window")]
    InvalidTarget(WindowHandle),

    #[error("no scan code for key {0:?}")]
    UnknownKey(char),

    #[error("key {0:?} released while not held")]
    NotHeld(char),

    #[error("injecting {op} for key {key:?} failed")]
    Injection { key: char, op: &'static str },
}
