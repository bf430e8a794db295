use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("cannot replace built-in style: {0}")]
    BuiltinOverride(String),

    #[error("style name must not be empty")]
    EmptyStyleName,

    #[error("invalid octave range: {0}")]
    InvalidOctaveRange(String),
}
