//! Optional MIDI side channel that mirrors injected keys as notes.

use tracing::{info, warn};

const CHANNEL: u8 = 0;
const VELOCITY: u8 = 96;
const ALL_NOTES_OFF: u8 = 123;

pub trait NoteMirror: Send {
    fn note_on(&mut self, pitch: u8);
    fn note_off(&mut self, pitch: u8);
    /// Silence everything, sent once when playback ends.
    fn all_notes_off(&mut self);
}

/// Mirror that drops every message.
pub struct NullMirror;

impl NoteMirror for NullMirror {
    fn note_on(&mut self, _pitch: u8) {}
    fn note_off(&mut self, _pitch: u8) {}
    fn all_notes_off(&mut self) {}
}

/// Mirror writing to a `midir` output port.
pub struct MidiMirror {
    conn: midir::MidiOutputConnection,
}

impl MidiMirror {
    fn send(&mut self, message: &[u8]) {
        if let Err(e) = self.conn.send(message) {
            warn!("MIDI mirror send failed: {e}");
        }
    }
}

impl NoteMirror for MidiMirror {
    fn note_on(&mut self, pitch: u8) {
        self.send(&[0x90 | CHANNEL, pitch & 0x7F, VELOCITY]);
    }

    fn note_off(&mut self, pitch: u8) {
        self.send(&[0x80 | CHANNEL, pitch & 0x7F, 0]);
    }

    fn all_notes_off(&mut self) {
        self.send(&[0xB0 | CHANNEL, ALL_NOTES_OFF, 0]);
    }
}

/// Open a MIDI output for mirroring.
///
/// Picks the first port whose name contains `hint` (case-insensitive), or the
/// first port when no hint is given. Falls back to [`NullMirror`] when no port
/// can be opened.
pub fn open_mirror(hint: Option<&str>) -> Box<dyn NoteMirror> {
    let midi_out = match midir::MidiOutput::new("lyre-mirror") {
        Ok(m) => m,
        Err(e) => {
            warn!("MIDI init error: {e}, mirroring disabled");
            return Box::new(NullMirror);
        }
    };

    let ports = midi_out.ports();
    let chosen = match hint {
        Some(hint) => {
            let hint = hint.to_lowercase();
            ports.iter().find(|p| {
                midi_out
                    .port_name(p)
                    .map(|n| n.to_lowercase().contains(&hint))
                    .unwrap_or(false)
            })
        }
        None => ports.first(),
    };
    let Some(port) = chosen else {
        warn!("no MIDI output port found, mirroring disabled");
        return Box::new(NullMirror);
    };

    let name = midi_out
        .port_name(port)
        .unwrap_or_else(|_| "unknown".to_string());
    match midi_out.connect(port, "lyre-mirror") {
        Ok(conn) => {
            info!("mirroring notes to MIDI port {name}");
            Box::new(MidiMirror { conn })
        }
        Err(e) => {
            warn!("failed to connect MIDI port {name}: {e}");
            Box::new(NullMirror)
        }
    }
}
