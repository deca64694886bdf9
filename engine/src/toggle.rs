//! Global on/off arbitration fed by three input channels.
//!
//! - key combo: two keys held together for `key_hold_ms`
//! - gesture: both eyes closed (smoothed `eyeBlinkLeft` and `eyeBlinkRight`
//!   at or above 0.7) for `gesture_hold_ms`
//! - external: toggle/enable/disable commands from another process
//!
//! Every channel emits a `ToggleEvent` into `apply`, which owns the single
//! active flag and invokes the feedback callback once per accepted event.

use tracing::{debug, info};

use crate::hysteresis::{HoldOutcome, HysteresisTimer};
use crate::smoothing::ChannelValues;

/// Channels that must both be closed for the gesture toggle.
pub const GESTURE_CHANNELS: (&str, &str) = ("eyeBlinkLeft", "eyeBlinkRight");

/// Fixed intensity threshold for the gesture toggle.
pub const GESTURE_THRESHOLD: f32 = 0.7;

// ── Events ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleEvent {
    Toggle,
    Enable,
    Disable,
}

impl ToggleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// Which channel produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleSource {
    KeyCombo,
    Gesture,
    External,
    /// A `MimicPause` action from a trigger rule.
    Action,
}

impl ToggleSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyCombo => "key-combo",
            Self::Gesture => "gesture",
            Self::External => "external",
            Self::Action => "action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
}

impl KeyAction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "down" => Some(Self::Down),
            "up" => Some(Self::Up),
            _ => None,
        }
    }
}

// ── Feedback ────────────────────────────────────────────────

/// Description of the state after an accepted toggle event.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleFeedback {
    pub active: bool,
    pub event: ToggleEvent,
    pub source: ToggleSource,
}

impl ToggleFeedback {
    /// Spoken confirmation.
    pub fn announcement(&self) -> &'static str {
        if self.active {
            "MimicEase active"
        } else {
            "MimicEase paused"
        }
    }

    /// Vibration waveform as alternating off/on durations in milliseconds.
    /// One long pulse when active, two short pulses when paused.
    pub fn vibration_pattern(&self) -> &'static [u64] {
        if self.active {
            &[0, 300]
        } else {
            &[0, 100, 100, 100]
        }
    }
}

/// Callback invoked with every accepted event.
pub type FeedbackFn = Box<dyn FnMut(&ToggleFeedback) + Send>;

// ── Config ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ToggleConfig {
    pub key_combo_enabled: bool,
    /// The two keys of the combo.
    pub combo_keys: (String, String),
    pub key_hold_ms: u64,
    pub gesture_enabled: bool,
    pub gesture_hold_ms: u64,
    pub external_enabled: bool,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            key_combo_enabled: true,
            combo_keys: ("volume-up".to_string(), "volume-down".to_string()),
            key_hold_ms: 2000,
            gesture_enabled: false,
            gesture_hold_ms: 3000,
            external_enabled: true,
        }
    }
}

// ── Arbiter ─────────────────────────────────────────────────

pub struct ToggleArbiter {
    config: ToggleConfig,
    active: bool,
    keys_down: [bool; 2],
    combo_start: Option<u64>,
    /// Set after a combo fire until one of the keys is released.
    combo_latched: bool,
    gesture: HysteresisTimer,
    feedback: Option<FeedbackFn>,
    /// Accepted events since creation.
    pub events: u64,
}

impl std::fmt::Debug for ToggleArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToggleArbiter")
            .field("config", &self.config)
            .field("active", &self.active)
            .field("keys_down", &self.keys_down)
            .field("combo_start", &self.combo_start)
            .field("combo_latched", &self.combo_latched)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl Default for ToggleArbiter {
    fn default() -> Self {
        Self::new(ToggleConfig::default())
    }
}

impl ToggleArbiter {
    /// New arbiter in the active state.
    pub fn new(config: ToggleConfig) -> Self {
        let gesture = HysteresisTimer::new(config.gesture_hold_ms, 0, 0);
        Self {
            config,
            active: true,
            keys_down: [false; 2],
            combo_start: None,
            combo_latched: false,
            gesture,
            feedback: None,
            events: 0,
        }
    }

    pub fn set_feedback(&mut self, feedback: FeedbackFn) {
        self.feedback = Some(feedback);
    }

    pub fn config(&self) -> &ToggleConfig {
        &self.config
    }

    /// Replace the configuration, dropping any in-progress combo or gesture.
    pub fn set_config(&mut self, config: ToggleConfig) {
        self.gesture = HysteresisTimer::new(config.gesture_hold_ms, 0, 0);
        self.keys_down = [false; 2];
        self.combo_start = None;
        self.combo_latched = false;
        self.config = config;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // ── Key-combo channel ──

    /// Feed a key event.  Returns true when the event belongs to an
    /// in-progress combo and must not reach the default handler.
    pub fn handle_key(&mut self, key: &str, action: KeyAction, now_ms: u64) -> bool {
        if !self.config.key_combo_enabled {
            return false;
        }
        let idx = if key == self.config.combo_keys.0 {
            0
        } else if key == self.config.combo_keys.1 {
            1
        } else {
            return false;
        };
        self.keys_down[idx] = action == KeyAction::Down;

        if !self.keys_down.iter().all(|&d| d) {
            if self.combo_start.take().is_some() {
                debug!("Key combo released before hold completed");
            }
            self.combo_latched = false;
            return false;
        }
        if self.combo_start.is_none() && !self.combo_latched {
            debug!("Key combo started at {}ms", now_ms);
            self.combo_start = Some(now_ms);
        }
        self.check_combo(now_ms);
        true
    }

    /// Re-check combo progress without a key event.  Returns true if the
    /// combo fired.
    pub fn poll_key_combo(&mut self, now_ms: u64) -> bool {
        if !self.config.key_combo_enabled || !self.keys_down.iter().all(|&d| d) {
            return false;
        }
        self.check_combo(now_ms)
    }

    fn check_combo(&mut self, now_ms: u64) -> bool {
        let Some(start) = self.combo_start else {
            return false;
        };
        if now_ms.saturating_sub(start) < self.config.key_hold_ms {
            return false;
        }
        self.combo_start = None;
        self.combo_latched = true;
        self.apply(ToggleEvent::Toggle, ToggleSource::KeyCombo);
        true
    }

    // ── Gesture channel ──

    /// Feed a smoothed frame.  Returns true if the gesture toggle fired.
    pub fn check_gesture(&mut self, smoothed: &ChannelValues, now_ms: u64) -> bool {
        if !self.config.gesture_enabled {
            return false;
        }
        let left = smoothed.get(GESTURE_CHANNELS.0).copied().unwrap_or(0.0);
        let right = smoothed.get(GESTURE_CHANNELS.1).copied().unwrap_or(0.0);
        let closed = left >= GESTURE_THRESHOLD && right >= GESTURE_THRESHOLD;

        match self.gesture.sample(closed, now_ms) {
            HoldOutcome::Fired => {
                self.apply(ToggleEvent::Toggle, ToggleSource::Gesture);
                true
            }
            HoldOutcome::Armed => {
                debug!("Gesture toggle hold started at {}ms", now_ms);
                false
            }
            _ => false,
        }
    }

    // ── External channel ──

    /// Apply an external command.  Returns false when the channel is off.
    pub fn handle_external(&mut self, event: ToggleEvent) -> bool {
        if !self.config.external_enabled {
            debug!("External {} ignored, channel disabled", event.as_str());
            return false;
        }
        self.apply(event, ToggleSource::External);
        true
    }

    // ── Arbitration ──

    /// Apply an event, notify feedback and return the new state.
    pub fn apply(&mut self, event: ToggleEvent, source: ToggleSource) -> bool {
        self.active = match event {
            ToggleEvent::Toggle => !self.active,
            ToggleEvent::Enable => true,
            ToggleEvent::Disable => false,
        };
        self.events += 1;
        info!(
            "Engine {} by {} {}",
            if self.active { "active" } else { "paused" },
            source.as_str(),
            event.as_str()
        );
        let feedback = ToggleFeedback {
            active: self.active,
            event,
            source,
        };
        if let Some(cb) = self.feedback.as_mut() {
            cb(&feedback);
        }
        self.active
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let flag = |b: bool| if b { "t" } else { "nil" };
        format!(
            "(:active {} :key-combo {} :gesture {} :external {} :combo-holding {} :gesture-holding {} :events {})",
            flag(self.active),
            flag(self.config.key_combo_enabled),
            flag(self.config.gesture_enabled),
            flag(self.config.external_enabled),
            flag(self.combo_start.is_some()),
            flag(self.gesture.is_holding()),
            self.events,
        )
    }
}
