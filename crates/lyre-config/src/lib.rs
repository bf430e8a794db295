// Configuration structs (performance, input styles, eight-bar style, error simulation)

pub mod config;
pub mod eight_bar;
pub mod error;
pub mod error_sim;
pub mod style;

pub use config::{AccidentalPolicy, CONFIG_VERSION, Config, OctaveRange};
pub use eight_bar::{EightBarMode, EightBarStyle, SegmentPattern};
pub use error::ConfigError;
pub use error_sim::{ErrorConfig, SimErrorKind};
pub use style::{InputStyle, StyleRegistry};
