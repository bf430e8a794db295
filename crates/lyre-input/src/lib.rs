//! Key injection for the lyre player: the backend contract, diagnostics,
//! focus probes, clocks and an optional MIDI mirror.

pub mod backend;
pub mod clock;
pub mod diagnostics;
pub mod error;
pub mod focus;
pub mod log_backend;
pub mod mirror;
pub mod recording;
pub mod scancode;
#[cfg(target_os = "windows")]
pub mod win32;

pub use backend::{KeyBackend, WindowHandle};
pub use clock::{Clock, ManualClock, SystemClock};
pub use diagnostics::{Diagnostics, DiagnosticsRecorder, LATENCY_BUCKETS_MS, LatencyStats};
pub use error::BackendError;
pub use focus::{AlwaysFocused, FocusProbe, ScriptedFocus};
pub use log_backend::LogBackend;
pub use mirror::{MidiMirror, NoteMirror, NullMirror, open_mirror};
pub use recording::{Injection, InjectionKind, RecordingBackend};
#[cfg(target_os = "windows")]
pub use win32::{ForegroundFocus, SendInputBackend, foreground_window};
