use std::sync::Arc;
use std::thread::JoinHandle;

use lyre_input::{
    AlwaysFocused, Clock, FocusProbe, KeyBackend, NoteMirror, NullMirror, SystemClock,
    WindowHandle,
};
use lyre_plan::Plan;
use tracing::{info, warn};

use crate::control::{PlayerControl, Shared};
use crate::error::PlayerError;
use crate::executor::Executor;
use crate::keys::KeyDriver;
use crate::observer::{Observers, PlaybackObserver};
use crate::options::PlayerOptions;
use crate::report::PerformanceReport;
use crate::state::PlayerState;

/// Collects everything a performance needs before the worker starts.
pub struct PlayerBuilder {
    plan: Plan,
    backend: Box<dyn KeyBackend>,
    options: PlayerOptions,
    clock: Arc<dyn Clock>,
    focus: Box<dyn FocusProbe>,
    mirror: Box<dyn NoteMirror>,
    observers: Vec<Box<dyn PlaybackObserver>>,
    target: Option<WindowHandle>,
    shared: Arc<Shared>,
}

impl PlayerBuilder {
    pub fn new(plan: Plan, backend: Box<dyn KeyBackend>) -> Self {
        Self {
            plan,
            backend,
            options: PlayerOptions::default(),
            clock: Arc::new(SystemClock::new()),
            focus: Box::new(AlwaysFocused),
            mirror: Box::new(NullMirror),
            observers: Vec::new(),
            target: None,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Control handle for the performance this builder will start.
    pub fn control(&self) -> PlayerControl {
        PlayerControl::new(self.shared.clone())
    }

    pub fn options(mut self, options: PlayerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn focus(mut self, focus: Box<dyn FocusProbe>) -> Self {
        self.focus = focus;
        self
    }

    pub fn mirror(mut self, mirror: Box<dyn NoteMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn observer(mut self, observer: Box<dyn PlaybackObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Window that receives keystrokes. `None` means whatever has focus.
    pub fn target(mut self, target: Option<WindowHandle>) -> Self {
        self.target = target;
        self
    }

    /// Bind the backend to the target and spawn the worker thread.
    ///
    /// A rejected target fails here, before any key is touched.
    pub fn start(mut self) -> Result<Player, PlayerError> {
        self.backend.set_target(self.target)?;

        let control = self.control();
        let events = self.plan.queue.len();
        let total = self.plan.total_duration;
        let executor = Executor::new(
            self.plan,
            self.options,
            self.clock,
            self.focus,
            KeyDriver::new(self.backend, self.mirror),
            Observers::new(self.observers),
            self.shared,
        );

        let handle = std::thread::Builder::new()
            .name("lyre-player".to_string())
            .spawn(move || executor.run())?;
        info!(events, total, "performance started");

        Ok(Player {
            control,
            handle: Some(handle),
        })
    }
}

/// A running performance. Dropping it stops the worker and waits for it.
pub struct Player {
    control: PlayerControl,
    handle: Option<JoinHandle<PerformanceReport>>,
}

impl Player {
    pub fn control(&self) -> PlayerControl {
        self.control.clone()
    }

    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn state(&self) -> PlayerState {
        self.control.state()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the performance to end and collect its report.
    pub fn join(mut self) -> Result<PerformanceReport, PlayerError> {
        self.join_worker()
    }

    fn join_worker(&mut self) -> Result<PerformanceReport, PlayerError> {
        let handle = self.handle.take().ok_or(PlayerError::AlreadyJoined)?;
        handle.join().map_err(|_| PlayerError::WorkerPanicked)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        self.control.stop();
        if let Err(e) = self.join_worker() {
            warn!("player shutdown: {e}");
        }
    }
}
