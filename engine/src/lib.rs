//! Mimic engine - turns per-frame facial blend-shape intensities into
//! debounced action commands behind a global on/off gate.
//!
//! Smoothing and triggers run per camera frame, dwell clicks per cursor
//! sample, and the toggle arbiter per key event or external command.  All
//! timing uses caller-supplied monotonic milliseconds.

pub mod action;
pub mod config;
pub mod dwell;
pub mod executor;
pub mod head_mouse;
pub mod hysteresis;
pub mod ipc;
pub mod mode;
pub mod pipeline;
pub mod replay;
pub mod smoothing;
pub mod toggle;
pub mod trigger;

pub use action::{ActionCategory, ActionCommand};
pub use config::{EngineConfig, Profile};
pub use dwell::{DwellClickEngine, DwellConfig, DwellStep};
pub use executor::{ActionExecutor, LoggingExecutor};
pub use hysteresis::{HoldOutcome, HysteresisTimer};
pub use mode::InteractionMode;
pub use pipeline::{EngineStatus, MimicEngine};
pub use smoothing::{ChannelValues, SmoothingConfig, SmoothingFilter};
pub use toggle::{KeyAction, ToggleArbiter, ToggleConfig, ToggleEvent, ToggleFeedback, ToggleSource};
pub use trigger::{TriggerEngine, TriggerRule};
