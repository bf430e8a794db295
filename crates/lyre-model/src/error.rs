use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("tempo must be positive, got {0} us per quarter")]
    InvalidTempo(u32),

    #[error("invalid time signature {numerator}/{denominator}")]
    InvalidTimeSignature { numerator: u8, denominator: u8 },

    #[error("unknown layout: {0}")]
    UnknownLayout(String),
}
