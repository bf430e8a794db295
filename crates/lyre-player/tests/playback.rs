use std::sync::Arc;
use std::time::{Duration, Instant};

use lyre_config::SimErrorKind;
use lyre_input::{Clock, ManualClock, RecordingBackend, ScriptedFocus, WindowHandle};
use lyre_model::{NoteEvent, Score};
use lyre_plan::{ErrorPlan, Plan, PlanSettings, PlannedError, Planner};
use lyre_player::{
    ChannelObserver, Outcome, PlaybackObserver, PlayerBuilder, PlayerControl, PlayerError,
    PlayerEvent, PlayerOptions, PlayerState,
};

const SCALE: [i32; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

fn plan(notes: Vec<NoteEvent>) -> Plan {
    Planner::new(PlanSettings::default())
        .unwrap()
        .plan(&Score::new(notes), 7)
}

/// Quarter notes at 120 BPM cycling through the scale.
fn quarter_notes(count: usize) -> Vec<NoteEvent> {
    (0..count)
        .map(|i| NoteEvent::new(i as f64 * 0.5, SCALE[i % SCALE.len()], 0.4))
        .collect()
}

fn builder(plan: Plan, clock: &Arc<ManualClock>, recording: &RecordingBackend) -> PlayerBuilder {
    PlayerBuilder::new(plan, Box::new(recording.clone()))
        .clock(clock.clone())
        .options(PlayerOptions::default().with_countdown_us(0))
}

fn setup() -> (Arc<ManualClock>, RecordingBackend) {
    let clock = Arc::new(ManualClock::new());
    let recording = RecordingBackend::new(clock.clone());
    (clock, recording)
}

struct PauseAt {
    control: PlayerControl,
    at: f64,
    sent: bool,
}

impl PlaybackObserver for PauseAt {
    fn on_progress(&mut self, current: f64, _total: f64) {
        if !self.sent && current >= self.at {
            self.sent = true;
            self.control.pause();
        }
    }
}

struct StopOnCountdown(PlayerControl);

impl PlaybackObserver for StopOnCountdown {
    fn on_state(&mut self, state: PlayerState) {
        if state == PlayerState::Countdown {
            self.0.stop();
        }
    }
}

struct StopAt {
    control: PlayerControl,
    at: f64,
}

impl PlaybackObserver for StopAt {
    fn on_progress(&mut self, current: f64, _total: f64) {
        if current >= self.at {
            self.control.stop();
        }
    }
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn test_single_note_press_and_release() {
    let (clock, recording) = setup();
    let (observer, events) = ChannelObserver::channel();
    let player = builder(plan(vec![NoteEvent::new(0.0, 60, 0.3)]), &clock, &recording)
        .observer(Box::new(observer))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.outcome, Outcome::Finished);
    assert_eq!(recording.presses().len(), 1);
    assert_eq!(recording.releases().len(), 1);
    assert_eq!(recording.releases()[0].at_us, 300_000);
    assert_eq!(report.presses, 1);
    assert_eq!(report.releases, 1);

    let progress: Vec<(f64, f64)> = events
        .try_iter()
        .filter_map(|e| match e {
            PlayerEvent::Progress { current, total } => Some((current, total)),
            _ => None,
        })
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.iter().all(|&(_, total)| total > 0.0));
}

#[test]
fn test_empty_score_finishes_immediately() {
    let (clock, recording) = setup();
    let (observer, events) = ChannelObserver::channel();
    let player = builder(plan(Vec::new()), &clock, &recording)
        .options(PlayerOptions::default())
        .observer(Box::new(observer))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.outcome, Outcome::Finished);
    assert_eq!(report.diagnostics.total_calls(), 0);
    assert_eq!(clock.now_us(), 0, "no countdown for an empty performance");
    let states: Vec<PlayerState> = events
        .try_iter()
        .filter_map(|e| match e {
            PlayerEvent::State(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![PlayerState::Finished]);
}

#[test]
fn test_stop_during_countdown_presses_nothing() {
    let (clock, recording) = setup();
    let builder = builder(plan(quarter_notes(8)), &clock, &recording)
        .options(PlayerOptions::default().with_countdown_us(3_000_000));
    let control = builder.control();
    let player = builder
        .observer(Box::new(StopOnCountdown(control)))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.outcome, Outcome::Stopped);
    assert!(recording.log().is_empty());
    assert_eq!(report.presses, 0);
}

#[test]
fn test_stop_mid_note_releases_held_key() {
    let (clock, recording) = setup();
    let builder = builder(
        plan(vec![NoteEvent::new(0.0, 60, 2.0), NoteEvent::new(2.5, 62, 0.2)]),
        &clock,
        &recording,
    );
    let control = builder.control();
    let report = builder
        .observer(Box::new(StopAt { control, at: 0.5 }))
        .start()
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(report.outcome, Outcome::Stopped);
    assert!(recording.held().is_empty());
    let releases = recording.releases();
    assert_eq!(releases.len(), 1);
    assert_eq!(releases[0].key, 'a');
    assert!(releases[0].at_us < 2_000_000);
    assert_eq!(report.presses, 1);
}

#[test]
fn test_pause_waits_for_bar_and_loses_nothing() {
    let (clock, recording) = setup();
    let plan = plan(quarter_notes(64));
    assert_eq!(plan.press_count(), 64);

    let builder = builder(plan, &clock, &recording);
    let control = builder.control();
    let player = builder
        .observer(Box::new(PauseAt {
            control: control.clone(),
            at: 3.1,
            sent: false,
        }))
        .start()
        .unwrap();

    wait_until(|| control.is_paused());
    assert!(recording.held().is_empty());
    let presses = recording.presses();
    assert_eq!(presses.len(), 8);
    assert_eq!(presses.last().unwrap().at_us, 3_500_000);
    assert_eq!(player.state(), PlayerState::Paused);

    control.resume();
    let report = player.join().unwrap();
    assert_eq!(report.outcome, Outcome::Finished);
    assert_eq!(recording.presses().len(), 64);
    assert_eq!(report.presses, 64);
    assert_eq!(recording.presses()[8].at_us, 4_000_000);
}

#[test]
fn test_pause_with_no_marker_ahead_is_ignored() {
    let (clock, recording) = setup();
    let builder = builder(plan(quarter_notes(3)), &clock, &recording);
    let control = builder.control();
    let player = builder
        .observer(Box::new(PauseAt {
            control,
            at: 0.2,
            sent: false,
        }))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.outcome, Outcome::Finished);
    assert_eq!(report.presses, 3);
    assert_eq!(report.paused, 0.0);
}

#[test]
fn test_focus_loss_releases_held_key_once() {
    let (clock, recording) = setup();
    let notes = vec![NoteEvent::new(0.0, 60, 1.0), NoteEvent::new(1.5, 62, 0.2)];
    let focus = ScriptedFocus::new(clock.clone(), vec![300_000..700_000]);
    let player = builder(plan(notes), &clock, &recording)
        .focus(Box::new(focus))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    let releases = recording.releases();
    assert_eq!(releases.len(), 2);
    assert_eq!(releases[0].key, 'a');
    assert_eq!(releases[0].at_us, 300_000);
    assert_eq!(report.skipped_releases, 1);
    assert_eq!(report.diagnostics.focus_lost_releases, 1);

    let presses = recording.presses();
    assert_eq!(presses.len(), 2);
    assert_eq!(presses[1].key, 's');
    assert_eq!(presses[1].at_us, 1_500_000);
}

#[test]
fn test_presses_while_unfocused_are_missed() {
    let (clock, recording) = setup();
    let focus = ScriptedFocus::new(clock.clone(), vec![900_000..1_600_000]);
    let player = builder(plan(quarter_notes(4)), &clock, &recording)
        .focus(Box::new(focus))
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.missed, 2);
    assert_eq!(report.presses, 2);
    assert!(recording.held().is_empty());
}

#[test]
fn test_stuck_key_is_force_released() {
    let (clock, recording) = setup();
    recording.fail_next_release('a');
    let options = PlayerOptions {
        max_hold_us: 500_000,
        ..PlayerOptions::default().with_countdown_us(0)
    };
    let notes = vec![NoteEvent::new(0.0, 60, 0.2), NoteEvent::new(1.0, 62, 0.2)];
    let player = builder(plan(notes), &clock, &recording)
        .options(options)
        .start()
        .unwrap();
    let report = player.join().unwrap();

    assert_eq!(report.diagnostics.stuck_recoveries, 1);
    assert_eq!(report.diagnostics.failed_release, 1);
    let first = recording.releases()[0];
    assert_eq!(first.key, 'a');
    assert!(first.at_us >= 500_000 && first.at_us < 1_000_000);
    assert!(recording.held().is_empty());
}

#[test]
fn test_long_note_outlasts_hold_limit() {
    let (clock, recording) = setup();
    let options = PlayerOptions {
        max_hold_us: 500_000,
        ..PlayerOptions::default().with_countdown_us(0)
    };
    let notes = vec![NoteEvent::new(0.0, 60, 5.0), NoteEvent::new(6.0, 62, 0.2)];
    let report = builder(plan(notes), &clock, &recording)
        .options(options)
        .start()
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(report.diagnostics.stuck_recoveries, 0);
    let first = recording.releases()[0];
    assert_eq!(first.key, 'a');
    assert_eq!(first.at_us, 5_000_000);
    assert_eq!(report.releases, 2);
}

#[test]
fn test_rejected_target_never_plays() {
    let (clock, recording) = setup();
    recording.reject_target(WindowHandle(0x1234));
    let result = builder(plan(quarter_notes(4)), &clock, &recording)
        .target(Some(WindowHandle(0x1234)))
        .start();
    assert!(matches!(result, Err(PlayerError::Backend(_))));
    assert!(recording.log().is_empty());
}

#[test]
fn test_progress_is_monotonic() {
    let (clock, recording) = setup();
    let (observer, events) = ChannelObserver::channel();
    let player = builder(plan(quarter_notes(16)), &clock, &recording)
        .observer(Box::new(observer))
        .start()
        .unwrap();
    player.join().unwrap();

    let progress: Vec<(f64, f64)> = events
        .try_iter()
        .filter_map(|e| match e {
            PlayerEvent::Progress { current, total } => Some((current, total)),
            _ => None,
        })
        .collect();
    assert!(progress.len() > 2);
    assert!(progress.windows(2).all(|w| w[0].0 <= w[1].0));
    assert!(progress.iter().all(|&(current, total)| current <= total));
}

fn planned(kind: SimErrorKind, position: f64) -> PlannedError {
    PlannedError {
        kind,
        position,
        direction: 1,
        pause_ms: 0,
    }
}

#[test]
fn test_errors_on_same_press_are_displaced() {
    let (clock, recording) = setup();
    let mut plan = plan(quarter_notes(8));
    plan.errors = ErrorPlan::from_groups(vec![vec![
        planned(SimErrorKind::MissNote, 0.0),
        planned(SimErrorKind::WrongNote, 0.0),
    ]]);
    let report = builder(plan, &clock, &recording)
        .start()
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(report.errors.fired(), 1);
    assert_eq!(report.errors.miss_note, 1);
    assert_eq!(report.errors.displaced, 1);
    assert_eq!(report.presses, 7);
    assert!(recording.presses().iter().all(|p| p.at_us != 0));
}

#[test]
fn test_wrong_note_taps_neighbour() {
    let (clock, recording) = setup();
    let mut plan = plan(quarter_notes(8));
    plan.errors = ErrorPlan::from_groups(vec![vec![planned(SimErrorKind::WrongNote, 0.1)]]);
    let report = builder(plan, &clock, &recording)
        .start()
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(report.errors.wrong_note, 1);
    assert_eq!(report.presses, 7);
    assert_eq!(report.skipped_releases, 1);
    let at_two: Vec<char> = recording
        .presses()
        .iter()
        .filter(|p| p.at_us == 2_000_000)
        .map(|p| p.key)
        .collect();
    assert_eq!(at_two, vec!['h']);
    assert!(recording.presses().iter().all(|p| p.key != 'g'));
    assert!(recording.held().is_empty());
}

#[test]
fn test_dropping_player_stops_worker() {
    let clock = Arc::new(ManualClock::new());
    let recording = RecordingBackend::new(clock.clone());
    let player = PlayerBuilder::new(plan(quarter_notes(8)), Box::new(recording.clone()))
        .options(PlayerOptions::default())
        .start()
        .unwrap();
    drop(player);
    assert!(recording.log().is_empty());
}

#[test]
fn test_progress_continues_through_pause_error() {
    let (clock, recording) = setup();
    let (observer, events) = ChannelObserver::channel();
    let mut plan = plan(quarter_notes(8));
    plan.errors = ErrorPlan::from_groups(vec![vec![PlannedError {
        pause_ms: 2_000,
        ..planned(SimErrorKind::Pause, 0.0)
    }]]);
    let report = builder(plan, &clock, &recording)
        .observer(Box::new(observer))
        .start()
        .unwrap()
        .join()
        .unwrap();

    assert_eq!(report.errors.pause, 1);
    assert_eq!(recording.presses()[0].at_us, 2_000_000);
    let progress: Vec<f64> = events
        .try_iter()
        .filter_map(|e| match e {
            PlayerEvent::Progress { current, .. } => Some(current),
            _ => None,
        })
        .collect();
    assert!(progress.iter().any(|&c| c > 0.5 && c < 2.0));
    let widest = progress
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(0.0, f64::max);
    assert!(widest <= 0.1, "progress jumped {widest} s");
}
