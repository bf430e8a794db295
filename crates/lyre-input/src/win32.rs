//! Scan-code injection through `SendInput`.

use std::collections::BTreeMap;
use std::mem::size_of;

use tracing::{debug, warn};
use windows::Win32::Foundation::HWND;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
    KEYEVENTF_SCANCODE, SendInput, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, IsWindow};

use crate::backend::{KeyBackend, WindowHandle};
use crate::diagnostics::{Diagnostics, DiagnosticsRecorder};
use crate::error::BackendError;
use crate::focus::FocusProbe;
use crate::scancode::scan_code;

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut _)
}

/// The window currently in the foreground, if any.
pub fn foreground_window() -> Option<WindowHandle> {
    // SAFETY: GetForegroundWindow has no preconditions.
    let window = unsafe { GetForegroundWindow() };
    (!window.0.is_null()).then(|| WindowHandle(window.0 as isize))
}

fn send_scan(scan: u16, up: bool) -> bool {
    let mut flags: KEYBD_EVENT_FLAGS = KEYEVENTF_SCANCODE;
    if up {
        flags |= KEYEVENTF_KEYUP;
    }
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: one fully initialized INPUT with its matching size.
    let sent = unsafe { SendInput(&[input], size_of::<INPUT>() as i32) };
    sent == 1
}

/// Injects key events at the scan-code level.
#[derive(Default)]
pub struct SendInputBackend {
    depth: BTreeMap<char, u32>,
    recorder: DiagnosticsRecorder,
    target: Option<WindowHandle>,
}

impl SendInputBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn inject(&mut self, key: char, up: bool) -> Result<(), BackendError> {
        let scan = scan_code(key).ok_or(BackendError::UnknownKey(key))?;
        let op = if up { "release" } else { "press" };
        let (result, _) = self.recorder.time(|| {
            if send_scan(scan, up) {
                Ok(())
            } else {
                Err(BackendError::Injection { key, op })
            }
        });
        result
    }
}

impl KeyBackend for SendInputBackend {
    fn press(&mut self, key: char, _pitch: u8) -> Result<(), BackendError> {
        let result = self.inject(key, false);
        self.recorder.record_press(result.is_ok());
        if result.is_ok() {
            *self.depth.entry(key).or_insert(0) += 1;
        }
        result
    }

    fn release(&mut self, key: char, _pitch: u8) -> Result<(), BackendError> {
        if self.depth.get(&key).copied().unwrap_or(0) == 0 {
            self.recorder.record_release(false);
            return Err(BackendError::NotHeld(key));
        }
        let result = self.inject(key, true);
        self.recorder.record_release(result.is_ok());
        if result.is_ok() {
            if let Some(depth) = self.depth.get_mut(&key) {
                *depth -= 1;
            }
        }
        result
    }

    fn release_all(&mut self) -> usize {
        let held: Vec<char> = self
            .depth
            .iter()
            .filter(|&(_, &d)| d > 0)
            .map(|(&k, _)| k)
            .collect();
        let mut released = 0;
        for key in held {
            match self.inject(key, true) {
                Ok(()) => {
                    self.recorder.record_release(true);
                    released += 1;
                }
                Err(e) => {
                    self.recorder.record_release(false);
                    warn!("release of {key:?} failed: {e}");
                }
            }
            self.depth.insert(key, 0);
        }
        released
    }

    fn set_target(&mut self, target: Option<WindowHandle>) -> Result<(), BackendError> {
        if let Some(handle) = target {
            // SAFETY: IsWindow accepts any handle value.
            if !unsafe { IsWindow(hwnd(handle)) }.as_bool() {
                return Err(BackendError::InvalidTarget(handle));
            }
            debug!("bound to window {handle}");
        }
        self.target = target;
        Ok(())
    }

    fn diagnostics(&self) -> Diagnostics {
        self.recorder.snapshot()
    }
}

/// Focused while the bound window is the foreground window.
pub struct ForegroundFocus {
    target: WindowHandle,
}

impl ForegroundFocus {
    pub fn new(target: WindowHandle) -> Self {
        Self { target }
    }
}

impl FocusProbe for ForegroundFocus {
    fn is_focused(&mut self) -> bool {
        foreground_window() == Some(self.target)
    }
}
