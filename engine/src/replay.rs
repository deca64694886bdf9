//! Script replay: drive the engine from recorded s-expression lines.
//!
//! One form per line, timestamps in `:t` (milliseconds):
//!
//! ```text
//! (:type :config :alpha 0.4 :global-cooldown-ms 0 :gesture-toggle t)
//! (:type :rule :id "blink" :channel "eyeBlinkRight" :threshold 0.6 :action :global-back)
//! (:type :frame :t 0 :eyeBlinkRight 0.8)
//! (:type :cursor :t 40 :x 200 :y 310)
//! (:type :head :t 80 :yaw 0.1 :pitch -0.02)
//! (:type :key :t 120 :key "volume-up" :action :down)
//! (:type :tick :t 2200)
//! (:type :status :id 1)
//! ```
//!
//! Any other `:type` is handed to the command dispatcher.  Dispatched
//! actions and toggle feedback come back as event lines.

use anyhow::Context;
use lexpr::Value;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::action::ActionCommand;
use crate::config::{EngineConfig, Profile};
use crate::ipc::dispatch::handle_message;
use crate::ipc::sexp::{
    format_event, get_bool, get_float, get_int, get_keyword, get_ms, get_string,
    numeric_entries, parse_rule,
};
use crate::mode::InteractionMode;
use crate::pipeline::MimicEngine;
use crate::toggle::{KeyAction, ToggleFeedback};
use crate::trigger::TriggerRule;

/// Profile id used for rules loaded from a script.
pub const REPLAY_PROFILE: &str = "replay";

enum Emitted {
    Action(ActionCommand),
    Feedback(ToggleFeedback),
}

type Sink = Arc<Mutex<Vec<Emitted>>>;

pub struct Replay {
    engine: MimicEngine,
    rules: Vec<TriggerRule>,
    global_cooldown_ms: u64,
    sink: Sink,
    /// Also emit dwell progress and key consumption events.
    pub trace: bool,
}

impl Replay {
    pub fn new(config: EngineConfig, trace: bool) -> Self {
        let sink: Sink = Arc::new(Mutex::new(Vec::new()));
        let rules = config.profile.rules.clone();
        let global_cooldown_ms = config.profile.global_cooldown_ms;

        let action_sink = Arc::clone(&sink);
        let executor = move |action: &ActionCommand| -> anyhow::Result<()> {
            action_sink
                .lock()
                .map_err(|_| anyhow::anyhow!("replay sink poisoned"))?
                .push(Emitted::Action(action.clone()));
            Ok(())
        };
        let mut engine = MimicEngine::new(config, Box::new(executor));

        let feedback_sink = Arc::clone(&sink);
        engine.set_feedback(Box::new(move |fb| {
            if let Ok(mut out) = feedback_sink.lock() {
                out.push(Emitted::Feedback(fb.clone()));
            }
        }));

        Self {
            engine,
            rules,
            global_cooldown_ms,
            sink,
            trace,
        }
    }

    pub fn engine(&self) -> &MimicEngine {
        &self.engine
    }

    /// Apply one script line and return the output lines it produced.
    pub fn apply_line(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            return Ok(Vec::new());
        }
        let value = lexpr::from_str(line).context("malformed s-expression")?;
        let msg_type = get_keyword(&value, "type").context("missing :type")?;
        debug!("replay {}", line);

        let mut out = Vec::new();
        let t = get_ms(&value, "t");
        match msg_type.as_str() {
            "config" => self.apply_config(&value)?,
            "rule" => {
                let rule = parse_rule(&value)?;
                self.rules.retain(|r| r.id != rule.id);
                self.rules.push(rule);
                self.reload_rules();
            }
            "frame" => {
                let t = require_t(t)?;
                let raw = numeric_entries(&value, &["type", "t"]);
                self.engine.process_frame(&raw, t);
            }
            "cursor" => {
                let t = require_t(t)?;
                let x = get_float(&value, "x").context(":cursor requires :x")? as f32;
                let y = get_float(&value, "y").context(":cursor requires :y")? as f32;
                let progress = self.engine.process_cursor(x, y, t);
                if self.trace {
                    out.push(dwell_event(t, x, y, progress));
                }
            }
            "head" => {
                let t = require_t(t)?;
                let yaw = get_float(&value, "yaw").unwrap_or(0.0) as f32;
                let pitch = get_float(&value, "pitch").unwrap_or(0.0) as f32;
                if let Some(update) = self.engine.process_head_pose(yaw, pitch, t) {
                    if self.trace {
                        out.push(dwell_event(t, update.x, update.y, update.progress));
                    }
                }
            }
            "key" => {
                let t = require_t(t)?;
                let key = get_string(&value, "key").context(":key requires :key")?;
                let action_name = get_keyword(&value, "action").unwrap_or_default();
                let action = KeyAction::from_str(&action_name)
                    .with_context(|| format!("unknown key action: {action_name}"))?;
                let consumed = self.engine.handle_key(&key, action, t);
                if self.trace {
                    out.push(format_event(
                        "key",
                        &[
                            ("t", &t.to_string()),
                            ("key", &format!("\"{}\"", key)),
                            ("consumed", if consumed { "t" } else { "nil" }),
                        ],
                    ));
                }
            }
            "tick" => self.engine.poll(require_t(t)?),
            _ => out.extend(handle_message(&mut self.engine, line)),
        }

        let t_field = t.map(|t| t.to_string()).unwrap_or_else(|| "nil".to_string());
        let emitted = match self.sink.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => anyhow::bail!("replay sink poisoned"),
        };
        for item in emitted {
            out.push(match item {
                Emitted::Action(action) => {
                    format_event("action", &[("t", &t_field), ("action", &action.to_sexp())])
                }
                Emitted::Feedback(fb) => format_event(
                    "toggled",
                    &[
                        ("t", &t_field),
                        ("active", if fb.active { "t" } else { "nil" }),
                        ("command", &format!(":{}", fb.event.as_str())),
                        ("source", &format!(":{}", fb.source.as_str())),
                        ("announcement", &format!("\"{}\"", fb.announcement())),
                    ],
                ),
            });
        }
        Ok(out)
    }

    fn apply_config(&mut self, value: &Value) -> anyhow::Result<()> {
        if let Some(alpha) = get_float(value, "alpha") {
            let frames = get_int(value, "consecutive-frames")
                .map(|n| n.clamp(0, u32::MAX as i64) as u32)
                .unwrap_or_else(|| self.engine.smoothing().consecutive_frames());
            self.engine.smoothing_mut().update_settings(alpha as f32, frames);
        }
        if let Some(mode) = get_keyword(value, "mode") {
            let mode = InteractionMode::from_str(&mode)
                .with_context(|| format!("unknown mode: {mode}"))?;
            self.engine.set_mode(mode);
        }
        if let Some(ms) = get_ms(value, "global-cooldown-ms") {
            self.global_cooldown_ms = ms;
            self.reload_rules();
        }

        let mut dwell = self.engine.dwell().config().clone();
        if let Some(enabled) = get_bool(value, "dwell") {
            dwell.enabled = enabled;
        }
        if let Some(ms) = get_ms(value, "dwell-ms") {
            dwell.dwell_ms = ms;
        }
        if let Some(radius) = get_float(value, "dwell-radius") {
            dwell.radius_px = radius as f32;
        }
        self.engine.set_dwell_config(dwell);

        let mut toggle = self.engine.arbiter().config().clone();
        let mut toggle_changed = false;
        if let Some(on) = get_bool(value, "key-combo") {
            toggle.key_combo_enabled = on;
            toggle_changed = true;
        }
        if let Some(ms) = get_ms(value, "key-hold-ms") {
            toggle.key_hold_ms = ms;
            toggle_changed = true;
        }
        if let Some(on) = get_bool(value, "gesture-toggle") {
            toggle.gesture_enabled = on;
            toggle_changed = true;
        }
        if let Some(ms) = get_ms(value, "gesture-hold-ms") {
            toggle.gesture_hold_ms = ms;
            toggle_changed = true;
        }
        if let Some(on) = get_bool(value, "external-toggle") {
            toggle.external_enabled = on;
            toggle_changed = true;
        }
        if toggle_changed {
            self.engine.arbiter_mut().set_config(toggle);
        }

        if let (Some(w), Some(h)) = (get_float(value, "screen-width"), get_float(value, "screen-height")) {
            self.engine.head_mouse_mut().set_screen_size(w as f32, h as f32);
        }
        Ok(())
    }

    fn reload_rules(&mut self) {
        let profile = Profile::new(REPLAY_PROFILE, self.rules.clone())
            .with_global_cooldown(self.global_cooldown_ms);
        self.engine.load_profile(profile);
    }
}

fn require_t(t: Option<u64>) -> anyhow::Result<u64> {
    t.context("missing :t timestamp")
}

fn dwell_event(t: u64, x: f32, y: f32, progress: f32) -> String {
    format_event(
        "dwell",
        &[
            ("t", &t.to_string()),
            ("x", &format!("{:.0}", x)),
            ("y", &format!("{:.0}", y)),
            ("progress", &format!("{:.2}", progress)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(replay: &mut Replay, script: &str) -> Vec<String> {
        let mut out = Vec::new();
        for line in script.lines() {
            out.extend(replay.apply_line(line).unwrap());
        }
        out
    }

    #[test]
    fn test_hold_then_fire() {
        let mut replay = Replay::new(EngineConfig::default(), false);
        let out = run(
            &mut replay,
            r#"
            ; one rule, no global cooldown
            (:type :config :global-cooldown-ms 0)
            (:type :rule :id "A" :channel "A" :threshold 0.5 :hold-ms 200 :cooldown-ms 1000 :action :global-back)
            (:type :frame :t 0 :A 0.8)
            (:type :frame :t 50 :A 0.8)
            (:type :frame :t 100 :A 0.8)
            (:type :frame :t 150 :A 0.8)
            (:type :frame :t 200 :A 0.8)
            (:type :frame :t 250 :A 0.8)
            "#,
        );
        assert_eq!(
            out,
            vec!["(:type :event :event :action :t 200 :action (:action :global-back))".to_string()]
        );
    }

    #[test]
    fn test_key_combo_and_commands() {
        let mut replay = Replay::new(EngineConfig::default(), true);
        let out = run(
            &mut replay,
            r#"
            (:type :key :t 0 :key "volume-up" :action :down)
            (:type :key :t 10 :key "volume-down" :action :down)
            (:type :tick :t 2010)
            "#,
        );
        assert!(out[1].contains(":consumed t"), "got {:?}", out);
        assert!(out[2].contains(":event :toggled"), "got {:?}", out);
        assert!(out[2].contains(":source :key-combo"));
        assert!(out[2].contains("\"MimicEase paused\""));
        assert!(!replay.engine().is_active());

        let out = run(&mut replay, "(:type :enable :id 7)");
        assert_eq!(out.len(), 2, "got {:?}", out);
        assert!(out[0].contains(":type :response :id 7"));
        assert!(out[1].contains(":active t"));
    }

    #[test]
    fn test_cursor_dwell_click() {
        let mut replay = Replay::new(EngineConfig::default(), false);
        let out = run(
            &mut replay,
            r#"
            (:type :config :mode :cursor-click :dwell-ms 300)
            (:type :cursor :t 0 :x 100 :y 100)
            (:type :cursor :t 300 :x 102 :y 101)
            "#,
        );
        assert_eq!(out.len(), 1, "got {:?}", out);
        assert!(out[0].contains(":action (:action :tap-at-cursor)"));
    }

    #[test]
    fn test_gesture_toggle_config() {
        let mut replay = Replay::new(EngineConfig::default(), false);
        let out = run(
            &mut replay,
            r#"
            (:type :config :gesture-toggle t :gesture-hold-ms 1000)
            (:type :frame :t 0 :eyeBlinkLeft 0.9 :eyeBlinkRight 0.9)
            (:type :frame :t 1000 :eyeBlinkLeft 0.9 :eyeBlinkRight 0.9)
            "#,
        );
        assert_eq!(out.len(), 1, "got {:?}", out);
        assert!(out[0].contains(":source :gesture"));
    }

    #[test]
    fn test_rule_replaced_by_id() {
        let mut replay = Replay::new(EngineConfig::default(), false);
        run(
            &mut replay,
            r#"
            (:type :rule :id "r" :channel "x" :threshold 0.5 :action :scroll-up)
            (:type :rule :id "r" :channel "x" :threshold 0.5 :action :scroll-down)
            "#,
        );
        let rules = replay.engine().triggers().rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, ActionCommand::ScrollDown);
    }

    #[test]
    fn test_errors() {
        let mut replay = Replay::new(EngineConfig::default(), false);
        assert!(replay.apply_line("(:type :frame :A 0.3)").is_err(), "missing :t");
        assert!(replay.apply_line("(:type :frame").is_err());
        assert!(replay.apply_line("(:t 4)").is_err());
        assert!(replay.apply_line("(:type :config :mode :psychic)").is_err());
        assert!(replay
            .apply_line("(:type :key :t 0 :key \"volume-up\" :action :sideways)")
            .is_err());
    }
}
