use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// What a queued event does. Declaration order is the tie-break priority:
/// releases dispatch before markers, markers before presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Release,
    PauseMarker,
    Press,
}

/// One scheduled key operation.
#[derive(Debug, Clone, Copy)]
pub struct KeyEvent {
    /// Performance time in seconds.
    pub time: f64,
    pub kind: EventKind,
    /// `None` for pause markers.
    pub key: Option<char>,
    pub pitch: u8,
    /// Source bar index (for markers, the bar that starts here).
    pub bar: u32,
    /// Position of the source note inside its eight-bar group, in `[0, 1)`.
    pub group_position: f64,
    seq: u64,
}

impl KeyEvent {
    pub fn press(time: f64, key: char, pitch: u8, bar: u32, group_position: f64) -> Self {
        Self {
            time,
            kind: EventKind::Press,
            key: Some(key),
            pitch,
            bar,
            group_position,
            seq: 0,
        }
    }

    pub fn release(time: f64, key: char, pitch: u8, bar: u32, group_position: f64) -> Self {
        Self {
            time,
            kind: EventKind::Release,
            key: Some(key),
            pitch,
            bar,
            group_position,
            seq: 0,
        }
    }

    pub fn pause_marker(time: f64, bar: u32) -> Self {
        Self {
            time,
            kind: EventKind::PauseMarker,
            key: None,
            pitch: 0,
            bar,
            group_position: 0.0,
            seq: 0,
        }
    }

    /// Insertion sequence number, assigned by [`EventQueue::push`].
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Eight-bar group this event's source note belongs to.
    pub fn group(&self) -> usize {
        (self.bar / 8) as usize
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyEvent {}

impl PartialOrd for KeyEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.kind.cmp(&other.kind))
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of key events keyed by `(time, priority, insertion order)`.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<KeyEvent>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut event: KeyEvent) {
        event.seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(event));
    }

    pub fn pop(&mut self) -> Option<KeyEvent> {
        self.heap.pop().map(|Reverse(e)| e)
    }

    pub fn peek(&self) -> Option<&KeyEvent> {
        self.heap.peek().map(|Reverse(e)| e)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Events in dispatch order, without consuming the queue.
    pub fn to_sorted_vec(&self) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = self.heap.iter().map(|Reverse(e)| *e).collect();
        events.sort();
        events
    }

    pub fn into_sorted_vec(self) -> Vec<KeyEvent> {
        let mut events: Vec<KeyEvent> = self.heap.into_iter().map(|Reverse(e)| e).collect();
        events.sort();
        events
    }

    /// Time of the last event, or 0 for an empty queue.
    pub fn last_time(&self) -> f64 {
        self.heap
            .iter()
            .map(|Reverse(e)| e.time)
            .fold(0.0, f64::max)
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.heap.iter().filter(|Reverse(e)| e.kind == kind).count()
    }
}
