use std::sync::mpsc::{self, Receiver, Sender};

use crate::state::PlayerState;

/// Callbacks from the player thread. All methods run on that thread and
/// must return quickly.
pub trait PlaybackObserver: Send {
    /// Performance time and total length, in seconds.
    fn on_progress(&mut self, _current: f64, _total: f64) {}

    /// A bar marker was consumed.
    fn on_bar(&mut self, _bar: u32) {}

    fn on_state(&mut self, _state: PlayerState) {}

    /// Human-readable log line.
    fn on_log(&mut self, _message: &str) {}
}

/// Event forwarded by [`ChannelObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Progress { current: f64, total: f64 },
    Bar(u32),
    State(PlayerState),
    Log(String),
}

/// Forwards callbacks over a channel, for consumers on another thread.
pub struct ChannelObserver {
    tx: Sender<PlayerEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: PlayerEvent) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl PlaybackObserver for ChannelObserver {
    fn on_progress(&mut self, current: f64, total: f64) {
        self.send(PlayerEvent::Progress { current, total });
    }

    fn on_bar(&mut self, bar: u32) {
        self.send(PlayerEvent::Bar(bar));
    }

    fn on_state(&mut self, state: PlayerState) {
        self.send(PlayerEvent::State(state));
    }

    fn on_log(&mut self, message: &str) {
        self.send(PlayerEvent::Log(message.to_string()));
    }
}

/// Fan-out to every registered observer.
#[derive(Default)]
pub(crate) struct Observers {
    list: Vec<Box<dyn PlaybackObserver>>,
}

impl Observers {
    pub(crate) fn new(list: Vec<Box<dyn PlaybackObserver>>) -> Self {
        Self { list }
    }

    pub(crate) fn progress(&mut self, current: f64, total: f64) {
        for o in &mut self.list {
            o.on_progress(current, total);
        }
    }

    pub(crate) fn bar(&mut self, bar: u32) {
        for o in &mut self.list {
            o.on_bar(bar);
        }
    }

    pub(crate) fn state(&mut self, state: PlayerState) {
        for o in &mut self.list {
            o.on_state(state);
        }
    }

    pub(crate) fn log(&mut self, message: &str) {
        for o in &mut self.list {
            o.on_log(message);
        }
    }
}
