//! Frame-level coordinator. Wires smoothing, triggers, dwell, head mouse
//! and the toggle arbiter to one executor, and keeps status counters.
//!
//! Per frame: smooth → gesture toggle (a fire consumes the frame) → stop if
//! paused → triggers → mode filter → executor.  Executor errors are logged
//! and counted per action; they never stop the rest of the frame.
//!
//! Every pause/resume transition drops trigger holds and the dwell in
//! progress, so nothing completes on stale hold time after a resume.

use tracing::{debug, info, warn};

use crate::action::{escape_string, ActionCommand};
use crate::config::{EngineConfig, Profile};
use crate::dwell::{DwellClickEngine, DwellConfig};
use crate::executor::ActionExecutor;
use crate::head_mouse::HeadMouse;
use crate::mode::InteractionMode;
use crate::smoothing::{ChannelValues, SmoothingFilter};
use crate::toggle::{FeedbackFn, KeyAction, ToggleArbiter, ToggleEvent, ToggleSource};
use crate::trigger::TriggerEngine;

// ── Status ──────────────────────────────────────────────────

/// Observable counters for the status command.
#[derive(Debug, Clone, Default)]
pub struct EngineStatus {
    pub frames: u64,
    /// Frames dropped because the engine was paused.
    pub frames_paused: u64,
    pub actions_dispatched: u64,
    pub actions_failed: u64,
    /// Actions dropped by the interaction-mode filter.
    pub actions_blocked: u64,
    pub gesture_toggles: u64,
    pub dwell_clicks: u64,
    pub last_frame_ms: Option<u64>,
}

impl EngineStatus {
    pub fn status_sexp(&self) -> String {
        format!(
            "(:frames {} :frames-paused {} :dispatched {} :failed {} :blocked {} :gesture-toggles {} :dwell-clicks {} :last-frame-ms {})",
            self.frames,
            self.frames_paused,
            self.actions_dispatched,
            self.actions_failed,
            self.actions_blocked,
            self.gesture_toggles,
            self.dwell_clicks,
            self.last_frame_ms
                .map(|t| t.to_string())
                .unwrap_or_else(|| "nil".to_string()),
        )
    }
}

/// Cursor position and dwell progress after a head-pose sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorUpdate {
    pub x: f32,
    pub y: f32,
    pub progress: f32,
}

// ── Engine ──────────────────────────────────────────────────

pub struct MimicEngine {
    mode: InteractionMode,
    profile_id: String,
    smoothing: SmoothingFilter,
    triggers: TriggerEngine,
    dwell: DwellClickEngine,
    head_mouse: HeadMouse,
    arbiter: ToggleArbiter,
    /// Arbiter state seen at the last transition check.
    was_active: bool,
    executor: Box<dyn ActionExecutor>,
    status: EngineStatus,
}

impl MimicEngine {
    pub fn new(config: EngineConfig, executor: Box<dyn ActionExecutor>) -> Self {
        let (width, height) = config.screen_size;
        info!(
            "Engine starting: mode={} profile={} rules={}",
            config.mode.as_str(),
            config.profile.id,
            config.profile.rules.len()
        );
        Self {
            mode: config.mode,
            profile_id: config.profile.id,
            smoothing: SmoothingFilter::new(config.smoothing),
            triggers: TriggerEngine::new(config.profile.rules, config.profile.global_cooldown_ms),
            dwell: DwellClickEngine::new(config.dwell),
            head_mouse: HeadMouse::new(config.head_mouse, width, height),
            arbiter: ToggleArbiter::new(config.toggle),
            was_active: true,
            executor,
            status: EngineStatus::default(),
        }
    }

    /// Route toggle feedback (announcement, vibration) to the host.
    pub fn set_feedback(&mut self, feedback: FeedbackFn) {
        self.arbiter.set_feedback(feedback);
    }

    pub fn is_active(&self) -> bool {
        self.arbiter.is_active()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        if mode != self.mode {
            info!("Interaction mode: {} -> {}", self.mode.as_str(), mode.as_str());
            self.mode = mode;
            self.head_mouse.recenter();
        }
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn smoothing(&self) -> &SmoothingFilter {
        &self.smoothing
    }

    pub fn smoothing_mut(&mut self) -> &mut SmoothingFilter {
        &mut self.smoothing
    }

    pub fn triggers(&self) -> &TriggerEngine {
        &self.triggers
    }

    pub fn dwell(&self) -> &DwellClickEngine {
        &self.dwell
    }

    pub fn set_dwell_config(&mut self, config: DwellConfig) {
        self.dwell.set_config(config);
    }

    pub fn head_mouse_mut(&mut self) -> &mut HeadMouse {
        &mut self.head_mouse
    }

    pub fn arbiter(&self) -> &ToggleArbiter {
        &self.arbiter
    }

    pub fn arbiter_mut(&mut self) -> &mut ToggleArbiter {
        &mut self.arbiter
    }

    // ── Inputs ──

    /// Process one frame of raw intensities.  Returns the actions that
    /// reached the executor successfully.
    pub fn process_frame(&mut self, raw: &ChannelValues, now_ms: u64) -> Vec<ActionCommand> {
        self.status.frames += 1;
        self.status.last_frame_ms = Some(now_ms);
        let smoothed = self.smoothing.process(raw);
        self.sync_active();

        if self.arbiter.check_gesture(&smoothed, now_ms) {
            self.status.gesture_toggles += 1;
            self.sync_active();
            return Vec::new();
        }
        if !self.arbiter.is_active() {
            self.status.frames_paused += 1;
            return Vec::new();
        }

        let mut dispatched = Vec::new();
        for action in self.triggers.evaluate(&smoothed, now_ms) {
            if self.dispatch(&action) {
                dispatched.push(action);
            }
        }
        if !dispatched.is_empty() {
            debug!("Dwell reset after {} trigger action(s)", dispatched.len());
            self.dwell.reset(now_ms);
        }
        dispatched
    }

    /// Feed an externally driven cursor position.  Returns dwell progress.
    pub fn process_cursor(&mut self, x: f32, y: f32, now_ms: u64) -> f32 {
        self.sync_active();
        if !self.arbiter.is_active() {
            return 0.0;
        }
        let step = self.dwell.update(x, y, now_ms);
        if let Some(click) = step.click {
            self.status.dwell_clicks += 1;
            self.dispatch(&click);
        }
        step.progress
    }

    /// Feed a head pose (radians).  Ignored outside head-mouse mode.
    pub fn process_head_pose(&mut self, yaw: f32, pitch: f32, now_ms: u64) -> Option<CursorUpdate> {
        if self.mode != InteractionMode::HeadMouse {
            return None;
        }
        let (x, y) = self.head_mouse.update(yaw, pitch);
        let progress = self.process_cursor(x, y, now_ms);
        Some(CursorUpdate { x, y, progress })
    }

    /// Key event from the host.  Returns true when the event is consumed.
    pub fn handle_key(&mut self, key: &str, action: KeyAction, now_ms: u64) -> bool {
        let consumed = self.arbiter.handle_key(key, action, now_ms);
        self.sync_active();
        consumed
    }

    /// Periodic tick for hosts without key auto-repeat.
    pub fn poll(&mut self, now_ms: u64) {
        self.arbiter.poll_key_combo(now_ms);
        self.sync_active();
    }

    /// External toggle/enable/disable.  Returns false if the channel is off.
    pub fn handle_command(&mut self, event: ToggleEvent) -> bool {
        let accepted = self.arbiter.handle_external(event);
        self.sync_active();
        accepted
    }

    // ── Configuration ──

    /// Swap the rule set.  Smoothing, trigger and dwell state start fresh.
    pub fn load_profile(&mut self, profile: Profile) {
        info!("Loading profile {} ({} rules)", profile.id, profile.rules.len());
        self.profile_id = profile.id;
        self.triggers.load_rules(profile.rules, profile.global_cooldown_ms);
        self.smoothing.reset();
        self.dwell = DwellClickEngine::new(self.dwell.config().clone());
    }

    /// Clear all runtime state while keeping configuration.
    pub fn reset(&mut self) {
        self.smoothing.reset();
        self.triggers.reset();
        self.dwell = DwellClickEngine::new(self.dwell.config().clone());
        self.head_mouse.recenter();
        info!("Engine state reset");
    }

    /// Drop trigger holds and the dwell in progress when the arbiter has
    /// flipped since the last check.
    fn sync_active(&mut self) {
        let active = self.arbiter.is_active();
        if active == self.was_active {
            return;
        }
        self.was_active = active;
        self.triggers.clear_holds();
        self.dwell.release();
        debug!(
            "Engine {}: trigger holds and dwell cleared",
            if active { "resumed" } else { "paused" }
        );
    }

    // ── Dispatch ──

    /// Run one action.  `MimicPause` goes to the arbiter instead of the
    /// executor.  Returns true if the action was carried out.
    fn dispatch(&mut self, action: &ActionCommand) -> bool {
        if *action == ActionCommand::MimicPause {
            self.arbiter.apply(ToggleEvent::Toggle, ToggleSource::Action);
            self.sync_active();
            return true;
        }
        if !self.arbiter.is_active() {
            debug!("Dropping {} while paused", action.as_str());
            return false;
        }
        if !self.mode.is_action_allowed(action) {
            debug!(
                "Mode {} blocks {} ({})",
                self.mode.as_str(),
                action.as_str(),
                action.category().as_str()
            );
            self.status.actions_blocked += 1;
            return false;
        }
        match self.executor.execute(action) {
            Ok(()) => {
                self.status.actions_dispatched += 1;
                true
            }
            Err(e) => {
                warn!("Action {} failed: {:#}", action.as_str(), e);
                self.status.actions_failed += 1;
                false
            }
        }
    }

    // ── Reporting ──

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:active {} :mode :{} :profile \"{}\" :engine {} :triggers {} :toggle {} :dwell {})",
            if self.is_active() { "t" } else { "nil" },
            self.mode.as_str(),
            escape_string(&self.profile_id),
            self.status.status_sexp(),
            self.triggers.status_sexp(),
            self.arbiter.status_sexp(),
            self.dwell.status_sexp(),
        )
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        let rules: Vec<String> = self.triggers.rules().iter().map(|r| r.to_sexp()).collect();
        format!(
            "(:mode :{} :smoothing {} :global-cooldown-ms {} :dwell {} :head-mouse {} :rules ({}))",
            self.mode.as_str(),
            self.smoothing.config_sexp(),
            self.triggers.global_cooldown_ms(),
            self.dwell.config_sexp(),
            self.head_mouse.config_sexp(),
            rules.join(" "),
        )
    }
}
