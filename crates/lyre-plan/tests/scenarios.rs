use lyre_config::{
    AccidentalPolicy, EightBarMode, EightBarStyle, InputStyle, OctaveRange, SegmentPattern,
    StyleRegistry,
};
use lyre_model::{Layout, LayoutKind, NoteEvent, Score};
use lyre_plan::{EventKind, KeyEvent, PlanSettings, Planner, Quantizer};

fn presses(events: &[KeyEvent]) -> Vec<&KeyEvent> {
    events.iter().filter(|e| e.kind == EventKind::Press).collect()
}

fn releases(events: &[KeyEvent]) -> Vec<&KeyEvent> {
    events.iter().filter(|e| e.kind == EventKind::Release).collect()
}

const SCALE: [i32; 8] = [60, 62, 64, 65, 67, 69, 71, 72];

#[test]
fn test_monophonic_scale_mechanical() {
    let notes = SCALE
        .iter()
        .enumerate()
        .map(|(i, &p)| NoteEvent::new(i as f64 * 0.5, p, 0.4))
        .collect();
    let planner = Planner::new(PlanSettings::default()).unwrap();
    let plan = planner.plan(&Score::new(notes), 42);
    let events = plan.events();

    let keys: String = presses(&events).iter().filter_map(|e| e.key).collect();
    assert_eq!(keys, "asdfghjq");
    for (i, press) in presses(&events).iter().enumerate() {
        assert!((press.time - i as f64 * 0.5).abs() < 1e-12, "press {i} at {}", press.time);
    }
    for (i, release) in releases(&events).iter().enumerate() {
        assert!(
            (release.time - (i as f64 * 0.5 + 0.4)).abs() < 1e-12,
            "release {i} at {}",
            release.time
        );
    }
    assert_eq!(plan.report.dropped, 0);
    assert_eq!(plan.report.scheduled, 8);
}

#[test]
fn test_out_of_range_note_folds_down() {
    let settings = PlanSettings {
        root_pitch: 72,
        octave_range: OctaveRange::Explicit { min: 36, max: 84 },
        accidental_policy: AccidentalPolicy::Octave,
        ..Default::default()
    };
    let plan = Planner::new(settings)
        .unwrap()
        .plan(&Score::new(vec![NoteEvent::new(0.0, 96, 0.2)]), 1);
    let events = plan.events();
    assert_eq!(presses(&events).len(), 1);
    assert_eq!(releases(&events).len(), 1);
    assert_eq!(events[0].pitch, 84);
    assert_eq!(plan.report.dropped, 0);
    assert_eq!(plan.report.octave_shifted, 1);
}

#[test]
fn test_chord_key_collision_keeps_unshifted() {
    let settings = PlanSettings {
        octave_range: OctaveRange::Explicit { min: 60, max: 71 },
        ..Default::default()
    };
    let score = Score::new(vec![
        NoteEvent::new(1.0, 48, 0.3),
        NoteEvent::new(1.0, 60, 0.3),
        NoteEvent::new(1.0, 84, 0.3),
    ]);
    let plan = Planner::new(settings).unwrap().plan(&score, 1);
    let events = plan.events();
    let pressed = presses(&events);
    assert_eq!(pressed.len(), 1);
    assert_eq!(pressed[0].key, Some('a'));
    assert_eq!(pressed[0].time, 1.0);
    assert_eq!(plan.report.dropped, 2);
    assert_eq!(plan.report.suppressed, 2);
}

#[test]
fn test_chord_key_collision_all_shifted_keeps_longest() {
    let settings = PlanSettings {
        octave_range: OctaveRange::Explicit { min: 60, max: 71 },
        ..Default::default()
    };
    let score = Score::new(vec![
        NoteEvent::new(1.0, 48, 0.3),
        NoteEvent::new(1.0, 84, 0.7),
        NoteEvent::new(1.0, 96, 0.7),
    ]);
    let plan = Planner::new(settings).unwrap().plan(&score, 1);
    let events = plan.events();
    assert_eq!(presses(&events).len(), 1);
    let release = releases(&events)[0];
    assert!((release.time - 1.7).abs() < 1e-12);
    assert_eq!(plan.report.suppressed, 2);
}

fn sixteen_bar_scale() -> Score {
    let notes = (0..64)
        .map(|i| NoteEvent::new(i as f64 * 0.5, SCALE[i % SCALE.len()], 0.4))
        .collect();
    Score::new(notes)
}

#[test]
fn test_eight_bar_warp_every_second_segment() {
    let settings = PlanSettings {
        eight_bar: EightBarStyle {
            enabled: true,
            mode: EightBarMode::Warp,
            pattern: SegmentPattern::EverySecond,
            speed_range: (2.0, 2.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let plan = Planner::new(settings).unwrap().plan(&sixteen_bar_scale(), 3);
    let bar = plan.timing.bar;
    assert!((plan.total_duration - 12.0 * bar).abs() < 1e-9);

    let events = plan.events();
    let pressed = presses(&events);
    assert_eq!(pressed.len(), 64);
    // first segment at base rate, second at double rate
    assert!((pressed[31].time - 15.5).abs() < 1e-9);
    assert!((pressed[32].time - 16.0).abs() < 1e-9);
    assert!((pressed[33].time - 16.25).abs() < 1e-9);
    assert!((pressed[63].time - 23.75).abs() < 1e-9);
}

#[test]
fn test_disabled_eight_bar_is_bitwise_speed_only_path() {
    let style = StyleRegistry::new().resolve("expressive");
    let base = PlanSettings {
        speed: 1.5,
        style,
        ..Default::default()
    };
    let disabled_but_configured = PlanSettings {
        eight_bar: EightBarStyle {
            enabled: false,
            mode: EightBarMode::BeatLock,
            speed_range: (0.5, 2.0),
            timing_range: (0.8, 1.2),
            ..Default::default()
        },
        ..base.clone()
    };
    let score = sixteen_bar_scale();
    let a = Planner::new(base).unwrap().plan(&score, 77).events();
    let b = Planner::new(disabled_but_configured).unwrap().plan(&score, 77).events();
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.time.to_bits(), y.time.to_bits());
        assert_eq!((x.kind, x.key, x.pitch, x.bar), (y.kind, y.key, y.pitch, y.bar));
    }
}

#[test]
fn test_same_seed_same_plan() {
    let settings = PlanSettings {
        style: StyleRegistry::new().resolve("casual"),
        eight_bar: EightBarStyle::preset("rubato").unwrap(),
        ..Default::default()
    };
    let planner = Planner::new(settings).unwrap();
    let a = planner.plan(&sixteen_bar_scale(), 9);
    let b = planner.plan(&sixteen_bar_scale(), 9);
    let c = planner.plan(&sixteen_bar_scale(), 10);
    let times = |p: &lyre_plan::Plan| p.events().iter().map(|e| e.time.to_bits()).collect::<Vec<_>>();
    assert_eq!(times(&a), times(&b));
    assert_ne!(times(&a), times(&c));
    assert_eq!(a.errors, b.errors);
}

#[test]
fn test_mechanical_style_keeps_times() {
    let settings = PlanSettings {
        style: InputStyle::mechanical(),
        ..Default::default()
    };
    let score = sixteen_bar_scale();
    let plan = Planner::new(settings).unwrap().plan(&score, 5);
    let events = plan.events();
    for (note, press) in score.notes.iter().zip(presses(&events)) {
        assert_eq!(press.time, note.time);
    }
}

#[test]
fn test_drop_policy_is_idempotent() {
    let available = Layout::new(LayoutKind::Diatonic21).available(60);
    let q = Quantizer::new(available, AccidentalPolicy::Drop, OctaveRange::Auto, 0, 0, 0.5);
    let notes: Vec<NoteEvent> = (30..100)
        .map(|p| NoteEvent::new((p - 30) as f64 * 0.1, p, 0.1))
        .collect();
    let (first, _) = q.quantize(&notes);
    let again: Vec<NoteEvent> = first
        .iter()
        .map(|n| NoteEvent::new(n.time, n.pitch, n.duration))
        .collect();
    let (second, report) = q.quantize(&again);
    let pitches = |v: &[lyre_plan::QuantizedNote]| v.iter().map(|n| (n.pitch, n.key)).collect::<Vec<_>>();
    assert_eq!(pitches(&first), pitches(&second));
    assert_eq!(report.dropped, 0);
}

#[test]
fn test_short_performance_has_no_markers() {
    let plan = Planner::new(PlanSettings::default())
        .unwrap()
        .plan(&Score::new(vec![NoteEvent::new(0.0, 60, 0.5)]), 1);
    assert_eq!(plan.queue.count(EventKind::PauseMarker), 0);
}

#[test]
fn test_error_plan_covers_every_group() {
    let mut settings = PlanSettings::default();
    settings.errors.enabled = true;
    settings.errors.errors_per_8bars = 2;
    let plan = Planner::new(settings).unwrap().plan(&sixteen_bar_scale(), 4);
    assert_eq!(plan.errors.group_count(), 2);
    assert_eq!(plan.errors.total(), 4);
}

#[test]
fn test_malformed_notes_rejected() {
    let score = Score {
        notes: vec![
            NoteEvent::new(-1.0, 60, 0.2),
            NoteEvent::new(0.0, 200, 0.2),
            NoteEvent::new(0.5, 60, 0.2),
        ],
        ..Default::default()
    };
    let plan = Planner::new(PlanSettings::default()).unwrap().plan(&score, 1);
    assert_eq!(plan.report.rejected, 2);
    assert_eq!(plan.report.scheduled, 1);
}
