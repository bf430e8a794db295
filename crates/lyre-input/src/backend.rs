use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::error::BackendError;

/// Opaque, platform-neutral window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Low-level key injection into the target application.
///
/// Implementations: `RecordingBackend` (tests, dry runs), `LogBackend`, and
/// `SendInputBackend` on Windows. The player calls a backend from its worker
/// thread only, never re-entrantly.
pub trait KeyBackend: Send {
    /// Key-down for `key`. Must return quickly.
    fn press(&mut self, key: char, pitch: u8) -> Result<(), BackendError>;

    /// Key-up for `key`. Fails if the backend does not believe the key is down.
    fn release(&mut self, key: char, pitch: u8) -> Result<(), BackendError>;

    /// Best-effort release of every key the backend believes is held.
    /// Returns how many keys were released.
    fn release_all(&mut self) -> usize;

    /// Bind subsequent injections to a window. `None` means whatever has focus.
    fn set_target(&mut self, target: Option<WindowHandle>) -> Result<(), BackendError>;

    fn diagnostics(&self) -> Diagnostics;
}

impl<B: KeyBackend + ?Sized> KeyBackend for Box<B> {
    fn press(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        (**self).press(key, pitch)
    }

    fn release(&mut self, key: char, pitch: u8) -> Result<(), BackendError> {
        (**self).release(key, pitch)
    }

    fn release_all(&mut self) -> usize {
        (**self).release_all()
    }

    fn set_target(&mut self, target: Option<WindowHandle>) -> Result<(), BackendError> {
        (**self).set_target(target)
    }

    fn diagnostics(&self) -> Diagnostics {
        (**self).diagnostics()
    }
}
