//! Dwell click: issue a click when the cursor stays inside a small radius
//! for long enough, then hold off for a fixed post-click window.
//!
//! Moving outside the radius re-anchors at the new position and restarts
//! the dwell.  Progress is 1.0 both on the completing sample and for the
//! whole post-click window.

use tracing::{debug, info, warn};

use crate::action::ActionCommand;
use crate::hysteresis::{HoldOutcome, HysteresisTimer};

/// Lockout after a dwell click, in milliseconds.
pub const POST_CLICK_COOLDOWN_MS: u64 = 1000;

// ── Config ──────────────────────────────────────────────────

/// Dwell click configuration.
#[derive(Debug, Clone)]
pub struct DwellConfig {
    pub enabled: bool,
    /// Movement radius (pixels) that keeps the dwell alive.
    pub radius_px: f32,
    /// Time inside the radius before clicking.
    pub dwell_ms: u64,
    /// Action issued on completion.
    pub click_action: ActionCommand,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            radius_px: 30.0,
            dwell_ms: 1000,
            click_action: ActionCommand::TapAtCursor,
        }
    }
}

/// Output of one dwell update.
#[derive(Debug, Clone, PartialEq)]
pub struct DwellStep {
    /// Completion in [0, 1].
    pub progress: f32,
    /// Click to dispatch, set only on the completing sample.
    pub click: Option<ActionCommand>,
}

impl DwellStep {
    fn idle(progress: f32) -> Self {
        Self {
            progress,
            click: None,
        }
    }
}

// ── Engine ──────────────────────────────────────────────────

#[derive(Debug)]
pub struct DwellClickEngine {
    config: DwellConfig,
    anchor: Option<(f32, f32)>,
    timer: HysteresisTimer,
    /// Total clicks issued.
    pub clicks: u64,
}

impl Default for DwellClickEngine {
    fn default() -> Self {
        Self::new(DwellConfig::default())
    }
}

impl DwellClickEngine {
    pub fn new(config: DwellConfig) -> Self {
        let timer = HysteresisTimer::new(config.dwell_ms, 0, POST_CLICK_COOLDOWN_MS);
        Self {
            config,
            anchor: None,
            timer,
            clicks: 0,
        }
    }

    pub fn config(&self) -> &DwellConfig {
        &self.config
    }

    /// Apply a new configuration.  Anchor and lockout are kept.
    pub fn set_config(&mut self, config: DwellConfig) {
        self.timer.hold_ms = config.dwell_ms;
        self.config = config;
    }

    pub fn anchor(&self) -> Option<(f32, f32)> {
        self.anchor
    }

    /// Whether the post-click window is still running at `now_ms`.
    pub fn in_cooldown(&mut self, now_ms: u64) -> bool {
        self.timer.lockout_remaining(now_ms).is_some()
    }

    /// Feed the current cursor position.
    pub fn update(&mut self, x: f32, y: f32, now_ms: u64) -> DwellStep {
        if !self.config.enabled {
            return DwellStep::idle(0.0);
        }
        if !x.is_finite() || !y.is_finite() {
            warn!("Dwell: ignoring non-finite position ({}, {})", x, y);
            return DwellStep::idle(0.0);
        }
        if self.timer.lockout_remaining(now_ms).is_some() {
            return DwellStep::idle(1.0);
        }

        let anchor = match self.anchor {
            Some(anchor) if self.timer.is_holding() => anchor,
            _ => {
                self.set_anchor(x, y, now_ms);
                return DwellStep::idle(0.0);
            }
        };

        let (dx, dy) = (x - anchor.0, y - anchor.1);
        let radius = self.config.radius_px;
        if dx * dx + dy * dy > radius * radius {
            debug!(
                "Dwell: moved {:.0}px from anchor, re-anchoring",
                (dx * dx + dy * dy).sqrt()
            );
            self.set_anchor(x, y, now_ms);
            return DwellStep::idle(0.0);
        }

        match self.timer.sample(true, now_ms) {
            HoldOutcome::Fired => {
                self.clicks += 1;
                info!(
                    "Dwell click at ({:.0}, {:.0}) -> {}",
                    x,
                    y,
                    self.config.click_action.as_str()
                );
                DwellStep {
                    progress: 1.0,
                    click: Some(self.config.click_action.clone()),
                }
            }
            HoldOutcome::Holding { elapsed_ms } => {
                let progress = if self.config.dwell_ms == 0 {
                    1.0
                } else {
                    (elapsed_ms as f32 / self.config.dwell_ms as f32).clamp(0.0, 1.0)
                };
                DwellStep::idle(progress)
            }
            HoldOutcome::Locked { .. } => DwellStep::idle(1.0),
            _ => DwellStep::idle(0.0),
        }
    }

    /// Clear the post-click window and restart the dwell at `now_ms`
    /// without moving the anchor.
    pub fn reset(&mut self, now_ms: u64) {
        self.timer.clear_lockout();
        self.timer.restart(now_ms);
    }

    /// Abandon the dwell in progress.  The next sample re-anchors; a running
    /// post-click window is kept.
    pub fn release(&mut self) {
        self.anchor = None;
        self.timer.release();
    }

    fn set_anchor(&mut self, x: f32, y: f32, now_ms: u64) {
        self.anchor = Some((x, y));
        self.timer.restart(now_ms);
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:enabled {} :radius-px {:.0} :dwell-ms {} :click {})",
            if self.config.enabled { "t" } else { "nil" },
            self.config.radius_px,
            self.config.dwell_ms,
            self.config.click_action.to_sexp(),
        )
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let anchor = match self.anchor {
            Some((x, y)) => format!("({:.0} {:.0})", x, y),
            None => "nil".to_string(),
        };
        format!(
            "(:anchor {} :dwelling {} :clicks {})",
            anchor,
            if self.timer.is_holding() { "t" } else { "nil" },
            self.clicks,
        )
    }
}
