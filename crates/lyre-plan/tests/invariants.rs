use std::collections::HashMap;

use lyre_config::{AccidentalPolicy, StyleRegistry};
use lyre_model::{Layout, LayoutKind, NoteEvent, Score};
use lyre_plan::{EventKind, KeyEvent, POST_RELEASE_GAP, PlanSettings, Planner};
use proptest::prelude::*;

const EPS: f64 = 1e-9;

fn note_list() -> impl Strategy<Value = Vec<NoteEvent>> {
    prop::collection::vec((0.0f64..20.0, 30i32..100, 0.0f64..1.5), 0..80).prop_map(|raw| {
        let mut notes: Vec<NoteEvent> = raw
            .into_iter()
            .map(|(time, pitch, duration)| NoteEvent::new(time, pitch, duration))
            .collect();
        notes.sort_by(|a, b| a.time.total_cmp(&b.time));
        notes
    })
}

fn style_name() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["mechanical", "natural", "expressive", "aggressive", "casual"])
}

fn per_key(events: &[KeyEvent]) -> HashMap<char, Vec<&KeyEvent>> {
    let mut map: HashMap<char, Vec<&KeyEvent>> = HashMap::new();
    for event in events {
        if let Some(key) = event.key {
            map.entry(key).or_default().push(event);
        }
    }
    map
}

proptest! {
    #[test]
    fn proptest_keys_alternate_with_gap_and_min_hold(
        notes in note_list(),
        style in style_name(),
        speed in 0.25f64..4.0,
        seed in any::<u64>(),
    ) {
        let settings = PlanSettings {
            style: StyleRegistry::new().resolve(style),
            speed,
            ..Default::default()
        };
        let min_hold = settings.min_hold;
        let plan = Planner::new(settings).unwrap().plan(&Score::new(notes.clone()), seed);
        let events = plan.events();

        for (key, ops) in per_key(&events) {
            let mut depth = 0i32;
            let mut last_press: Option<f64> = None;
            let mut last_release: Option<f64> = None;
            for op in ops {
                match op.kind {
                    EventKind::Press => {
                        depth += 1;
                        prop_assert_eq!(depth, 1, "key {} pressed while held", key);
                        if let Some(release) = last_release {
                            prop_assert!(op.time - release >= POST_RELEASE_GAP - EPS);
                        }
                        last_press = Some(op.time);
                    }
                    EventKind::Release => {
                        depth -= 1;
                        prop_assert_eq!(depth, 0, "key {} released while up", key);
                        let press = last_press.unwrap();
                        prop_assert!(op.time - press >= min_hold - EPS);
                        last_release = Some(op.time);
                    }
                    EventKind::PauseMarker => unreachable!(),
                }
            }
            prop_assert_eq!(depth, 0);
        }

        let report = &plan.report;
        prop_assert_eq!(report.scheduled, plan.press_count());
        prop_assert_eq!(report.scheduled + report.dropped + report.rejected, notes.len());
        prop_assert!(plan.total_duration >= plan.queue.last_time());
    }

    #[test]
    fn proptest_mechanical_chords_press_together(
        chords in prop::collection::vec(
            (
                0.02f64..0.6,
                prop::collection::btree_set(0usize..21, 1..4),
                0.05f64..0.8,
                prop::collection::vec(0.0f64..0.004, 4),
            ),
            1..30,
        ),
    ) {
        let pitches: Vec<i32> = Layout::new(LayoutKind::Diatonic21)
            .available(60)
            .iter()
            .map(|(p, _)| p)
            .collect();
        let settings = PlanSettings {
            accidental_policy: AccidentalPolicy::Drop,
            ..Default::default()
        };

        let mut notes = Vec::new();
        let mut members: Vec<Vec<i32>> = Vec::new();
        let mut time = 0.0;
        for (gap, indices, duration, jitter) in &chords {
            time += gap;
            let chord: Vec<i32> = indices.iter().map(|&i| pitches[i]).collect();
            // Members land anywhere inside the chord window.
            for (&pitch, offset) in chord.iter().zip(jitter) {
                notes.push(NoteEvent::new(time + offset, pitch, *duration));
            }
            members.push(chord);
        }

        let plan = Planner::new(settings).unwrap().plan(&Score::new(notes), 0);
        let events = plan.events();
        let mut press_times: HashMap<u8, Vec<f64>> = HashMap::new();
        for e in events.iter().filter(|e| e.kind == EventKind::Press) {
            press_times.entry(e.pitch).or_default().push(e.time);
        }

        let mut used: HashMap<i32, usize> = HashMap::new();
        for chord in members {
            let times: Vec<f64> = chord
                .iter()
                .map(|&pitch| {
                    let n = used.entry(pitch).or_insert(0);
                    let t = press_times[&(pitch as u8)][*n];
                    *n += 1;
                    t
                })
                .collect();
            let first = times[0];
            for t in &times {
                prop_assert!((t - first).abs() <= EPS, "chord pressed at {:?}", times);
            }
        }
    }
}
