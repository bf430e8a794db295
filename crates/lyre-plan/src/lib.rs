//! Turns parsed note events into a time-ordered stream of key presses,
//! releases and bar markers.
//!
//! The pipeline runs leaves-first: [`Quantizer`] places pitches on the
//! layout, [`Humanizer`] perturbs timing and length, [`SectionModulator`]
//! retimes eight-bar segments, and [`Planner`] serializes everything into an
//! [`EventQueue`] that respects per-key recovery and chord simultaneity.

pub mod error;
pub mod error_plan;
pub mod event;
pub mod humanize;
pub mod planner;
pub mod quantize;
pub mod section;

pub use error::PlanError;
pub use error_plan::{ErrorPlan, PlannedError};
pub use event::{EventKind, EventQueue, KeyEvent};
pub use humanize::Humanizer;
pub use planner::{MIN_SPEED, POST_RELEASE_GAP, Plan, PlanReport, PlanSettings, Planner};
pub use quantize::{CHORD_WINDOW, QuantizeReport, QuantizedNote, Quantizer};
pub use section::{SectionModulator, SegmentMultipliers};
