//! Expression trigger rules with per-rule hold and cooldown, priority order,
//! and a global cooldown gate across all rules.
//!
//! `evaluate` runs once per frame over the smoothed snapshot.  Each rule
//! owns a `HysteresisTimer` (hold = rule hold, re-arm = rule cooldown)
//! created lazily and kept across fires.  The global cooldown is checked
//! once per call, so rules evaluated in the same call as a fire can fire
//! too.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::action::ActionCommand;
use crate::hysteresis::{HoldOutcome, HysteresisTimer};
use crate::smoothing::ChannelValues;

/// Default per-rule cooldown in milliseconds.
pub const DEFAULT_RULE_COOLDOWN_MS: u64 = 300;

/// Default global cooldown in milliseconds.
pub const DEFAULT_GLOBAL_COOLDOWN_MS: u64 = 300;

// ── Rule ────────────────────────────────────────────────────

/// One channel-threshold → action mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerRule {
    pub id: String,
    pub name: String,
    /// Blend-shape channel this rule watches.
    pub channel: String,
    /// Minimum smoothed intensity (inclusive).
    pub threshold: f32,
    /// Continuous time at or above threshold before firing.
    pub hold_ms: u64,
    /// Minimum time between fires of this rule.
    pub cooldown_ms: u64,
    /// Lower values are evaluated first.
    pub priority: i32,
    pub enabled: bool,
    pub action: ActionCommand,
}

impl TriggerRule {
    /// Enabled rule with zero hold, default cooldown and priority 0.
    pub fn new(
        id: impl Into<String>,
        channel: impl Into<String>,
        threshold: f32,
        action: ActionCommand,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            channel: channel.into(),
            threshold,
            hold_ms: 0,
            cooldown_ms: DEFAULT_RULE_COOLDOWN_MS,
            priority: 0,
            enabled: true,
            action,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_hold(mut self, hold_ms: u64) -> Self {
        self.hold_ms = hold_ms;
        self
    }

    pub fn with_cooldown(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Generate s-expression for IPC.
    pub fn to_sexp(&self) -> String {
        format!(
            "(:id \"{}\" :channel \"{}\" :threshold {:.2} :hold-ms {} :cooldown-ms {} :priority {} :enabled {} :action {})",
            crate::action::escape_string(&self.id),
            crate::action::escape_string(&self.channel),
            self.threshold,
            self.hold_ms,
            self.cooldown_ms,
            self.priority,
            if self.enabled { "t" } else { "nil" },
            self.action.to_sexp(),
        )
    }
}

// ── Engine ──────────────────────────────────────────────────

/// Prioritised rule matcher with per-rule and global cooldowns.
#[derive(Debug, Default)]
pub struct TriggerEngine {
    /// Rules sorted by ascending priority (stable for ties).
    rules: Vec<TriggerRule>,
    global_cooldown_ms: u64,
    /// Per-rule timers keyed by rule id.
    timers: HashMap<String, HysteresisTimer>,
    last_any_fired: Option<u64>,
    /// Calls rejected by the global cooldown.
    pub global_blocks: u64,
    /// Total actions emitted.
    pub fires: u64,
}

impl TriggerEngine {
    pub fn new(rules: Vec<TriggerRule>, global_cooldown_ms: u64) -> Self {
        let mut engine = Self::default();
        engine.load_rules(rules, global_cooldown_ms);
        engine
    }

    /// Replace the rule set and discard all runtime state.
    pub fn load_rules(&mut self, mut rules: Vec<TriggerRule>, global_cooldown_ms: u64) {
        rules.sort_by_key(|r| r.priority);
        info!(
            "Trigger rules loaded: {} rules ({} enabled), global cooldown {}ms",
            rules.len(),
            rules.iter().filter(|r| r.enabled).count(),
            global_cooldown_ms
        );
        self.rules = rules;
        self.global_cooldown_ms = global_cooldown_ms;
        self.timers.clear();
        self.last_any_fired = None;
    }

    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    pub fn global_cooldown_ms(&self) -> u64 {
        self.global_cooldown_ms
    }

    pub fn last_any_fired(&self) -> Option<u64> {
        self.last_any_fired
    }

    /// Evaluate all enabled rules against one smoothed frame.
    pub fn evaluate(&mut self, smoothed: &ChannelValues, now_ms: u64) -> Vec<ActionCommand> {
        if let Some(last) = self.last_any_fired {
            if now_ms.saturating_sub(last) < self.global_cooldown_ms {
                self.global_blocks += 1;
                return Vec::new();
            }
        }

        let mut actions = Vec::new();
        for rule in self.rules.iter().filter(|r| r.enabled) {
            let value = smoothed.get(&rule.channel).copied().unwrap_or(0.0);
            let timer = self
                .timers
                .entry(rule.id.clone())
                .or_insert_with(|| HysteresisTimer::new(rule.hold_ms, rule.cooldown_ms, 0));

            match timer.sample(value >= rule.threshold, now_ms) {
                HoldOutcome::Fired => {
                    info!(
                        "Trigger fired: {} ({} = {:.2}) -> {}",
                        rule.id,
                        rule.channel,
                        value,
                        rule.action.as_str()
                    );
                    actions.push(rule.action.clone());
                    self.last_any_fired = Some(now_ms);
                    self.fires += 1;
                }
                HoldOutcome::Armed => {
                    debug!("Trigger {} hold started at {}ms", rule.id, now_ms);
                }
                HoldOutcome::Rearming { remaining_ms } => {
                    debug!("Trigger {} cooling down, {}ms left", rule.id, remaining_ms);
                }
                _ => {}
            }
        }
        actions
    }

    /// Clear hold and cooldown state while keeping the rules.
    pub fn reset(&mut self) {
        self.timers.clear();
        self.last_any_fired = None;
    }

    /// Drop every hold in progress.  Cooldowns keep running.
    pub fn clear_holds(&mut self) {
        for timer in self.timers.values_mut() {
            timer.release();
        }
    }

    /// Generate s-expression for IPC status.
    pub fn status_sexp(&self) -> String {
        let holding: Vec<&str> = self
            .rules
            .iter()
            .filter(|r| self.timers.get(&r.id).is_some_and(|t| t.is_holding()))
            .map(|r| r.id.as_str())
            .collect();
        format!(
            "(:rules {} :enabled {} :global-cooldown-ms {} :fires {} :global-blocks {} :holding ({}))",
            self.rules.len(),
            self.rules.iter().filter(|r| r.enabled).count(),
            self.global_cooldown_ms,
            self.fires,
            self.global_blocks,
            holding
                .iter()
                .map(|id| format!("\"{}\"", crate::action::escape_string(id)))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(values: &[(&str, f32)]) -> ChannelValues {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_below_threshold_no_action() {
        let rule = TriggerRule::new("r", "eyeBlinkRight", 0.6, ActionCommand::GlobalBack);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        assert!(engine.evaluate(&frame(&[("eyeBlinkRight", 0.5)]), 0).is_empty());
        assert!(engine.evaluate(&frame(&[("eyeBlinkRight", 0.5)]), 50).is_empty());
    }

    #[test]
    fn test_zero_hold_requires_second_frame() {
        let rule = TriggerRule::new("r", "eyeBlinkRight", 0.6, ActionCommand::GlobalBack);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        let first = engine.evaluate(&frame(&[("eyeBlinkRight", 0.8)]), 0);
        assert!(first.is_empty(), "First crossing must not fire, got {:?}", first);
        let second = engine.evaluate(&frame(&[("eyeBlinkRight", 0.6)]), 33);
        assert_eq!(second, vec![ActionCommand::GlobalBack]);
    }

    #[test]
    fn test_missing_channel_reads_zero() {
        let rule = TriggerRule::new("r", "jawOpen", 0.0, ActionCommand::GlobalHome);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        engine.evaluate(&ChannelValues::new(), 0);
        // 0.0 >= 0.0 holds even for an absent channel.
        assert_eq!(engine.evaluate(&ChannelValues::new(), 10).len(), 1);

        let rule = TriggerRule::new("r", "jawOpen", 0.1, ActionCommand::GlobalHome);
        engine.load_rules(vec![rule], 0);
        engine.evaluate(&ChannelValues::new(), 20);
        assert!(engine.evaluate(&ChannelValues::new(), 30).is_empty());
    }

    #[test]
    fn test_disabled_rule_never_fires() {
        let rule = TriggerRule::new("r", "jawOpen", 0.3, ActionCommand::GlobalHome).disabled();
        let mut engine = TriggerEngine::new(vec![rule], 0);
        for t in 0..20 {
            let actions = engine.evaluate(&frame(&[("jawOpen", 1.0)]), t * 50);
            assert!(actions.is_empty(), "Disabled rule fired at {}: {:?}", t, actions);
        }
    }

    #[test]
    fn test_priority_order() {
        let low = TriggerRule::new("low", "eyeBlinkRight", 0.3, ActionCommand::GlobalBack)
            .with_priority(100);
        let high = TriggerRule::new("high", "eyeBlinkRight", 0.3, ActionCommand::GlobalHome)
            .with_priority(1);
        let mut engine = TriggerEngine::new(vec![low, high], 500);
        assert_eq!(engine.rules()[0].id, "high");

        engine.evaluate(&frame(&[("eyeBlinkRight", 0.9)]), 0);
        let actions = engine.evaluate(&frame(&[("eyeBlinkRight", 0.9)]), 40);
        assert_eq!(
            actions,
            vec![ActionCommand::GlobalHome, ActionCommand::GlobalBack],
            "Both fire in one call, priority 1 first"
        );
        assert_eq!(engine.last_any_fired(), Some(40));
    }

    #[test]
    fn test_equal_priority_keeps_load_order() {
        let a = TriggerRule::new("a", "x", 0.1, ActionCommand::ScrollUp);
        let b = TriggerRule::new("b", "x", 0.1, ActionCommand::ScrollDown);
        let engine = TriggerEngine::new(vec![a, b], 0);
        let ids: Vec<&str> = engine.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_release_restarts_hold() {
        let rule = TriggerRule::new("r", "jawOpen", 0.5, ActionCommand::GlobalBack).with_hold(200);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        engine.evaluate(&frame(&[("jawOpen", 0.8)]), 0);
        engine.evaluate(&frame(&[("jawOpen", 0.0)]), 100);
        assert!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 150).is_empty());
        assert!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 250).is_empty());
        assert_eq!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 350).len(), 1);
    }

    #[test]
    fn test_refire_needs_fresh_hold() {
        let rule = TriggerRule::new("r", "jawOpen", 0.5, ActionCommand::GlobalBack)
            .with_hold(200)
            .with_cooldown(0);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        engine.evaluate(&frame(&[("jawOpen", 0.8)]), 0);
        assert_eq!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 200).len(), 1);

        // Drop and come back within the hold window.
        engine.evaluate(&frame(&[("jawOpen", 0.1)]), 250);
        engine.evaluate(&frame(&[("jawOpen", 0.8)]), 300);
        assert!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 400).is_empty());
        assert_eq!(engine.evaluate(&frame(&[("jawOpen", 0.8)]), 500).len(), 1);
    }

    #[test]
    fn test_global_cooldown_blocks_all_rules() {
        let a = TriggerRule::new("a", "eyeBlinkRight", 0.5, ActionCommand::GlobalBack)
            .with_cooldown(100);
        let b = TriggerRule::new("b", "jawOpen", 0.5, ActionCommand::GlobalHome)
            .with_cooldown(100)
            .with_priority(5);
        let mut engine = TriggerEngine::new(vec![a, b], 1000);
        let both = frame(&[("eyeBlinkRight", 0.9), ("jawOpen", 0.9)]);

        engine.evaluate(&both, 0);
        assert!(!engine.evaluate(&both, 10).is_empty());
        for t in [20, 300, 700, 1009] {
            let actions = engine.evaluate(&both, t);
            assert!(actions.is_empty(), "Global cooldown leaked at {}: {:?}", t, actions);
        }
        assert_eq!(engine.global_blocks, 4);
    }

    #[test]
    fn test_global_cooldown_skips_hold_tracking() {
        let a = TriggerRule::new("a", "x", 0.5, ActionCommand::GlobalBack).with_cooldown(0);
        let b = TriggerRule::new("b", "y", 0.5, ActionCommand::GlobalHome).with_priority(1);
        let mut engine = TriggerEngine::new(vec![a, b], 500);
        engine.evaluate(&frame(&[("x", 0.9)]), 0);
        assert_eq!(engine.evaluate(&frame(&[("x", 0.9)]), 10).len(), 1);

        // "y" rises during the global window; its hold only starts afterwards.
        engine.evaluate(&frame(&[("y", 0.9)]), 100);
        assert!(engine.evaluate(&frame(&[("y", 0.9)]), 510).is_empty());
        assert_eq!(
            engine.evaluate(&frame(&[("y", 0.9)]), 520),
            vec![ActionCommand::GlobalHome]
        );
    }

    #[test]
    fn test_end_to_end_hold_then_cooldown() {
        let rule = TriggerRule::new("A", "A", 0.5, ActionCommand::GlobalBack)
            .with_hold(200)
            .with_cooldown(1000);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        let a = frame(&[("A", 0.8)]);

        let mut fired_at = Vec::new();
        for t in (0..=1150).step_by(50) {
            if !engine.evaluate(&a, t).is_empty() {
                fired_at.push(t);
            }
        }
        assert_eq!(fired_at, vec![200], "Expected a single fire at 200ms");
        assert_eq!(engine.evaluate(&a, 1200).len(), 1, "Cooldown over at 1200ms");
    }

    #[test]
    fn test_load_rules_clears_runtime_state() {
        let rule = TriggerRule::new("r", "x", 0.5, ActionCommand::GlobalBack).with_cooldown(10_000);
        let mut engine = TriggerEngine::new(vec![rule.clone()], 10_000);
        engine.evaluate(&frame(&[("x", 1.0)]), 0);
        assert_eq!(engine.evaluate(&frame(&[("x", 1.0)]), 10).len(), 1);

        engine.load_rules(vec![rule], 10_000);
        assert_eq!(engine.last_any_fired(), None);
        engine.evaluate(&frame(&[("x", 1.0)]), 20);
        assert_eq!(engine.evaluate(&frame(&[("x", 1.0)]), 30).len(), 1);
    }

    #[test]
    fn test_clear_holds_keeps_cooldown() {
        let rule = TriggerRule::new("r", "x", 0.5, ActionCommand::GlobalHome)
            .with_hold(200)
            .with_cooldown(1000);
        let mut engine = TriggerEngine::new(vec![rule], 0);
        engine.evaluate(&frame(&[("x", 1.0)]), 0);
        assert_eq!(engine.evaluate(&frame(&[("x", 1.0)]), 200).len(), 1);
        engine.evaluate(&frame(&[("x", 1.0)]), 300);
        engine.clear_holds();
        assert!(engine.status_sexp().contains(":holding ()"));

        assert!(engine.evaluate(&frame(&[("x", 1.0)]), 1200).is_empty(), "Hold must restart");
        assert!(engine.evaluate(&frame(&[("x", 1.0)]), 1399).is_empty());
        assert_eq!(engine.evaluate(&frame(&[("x", 1.0)]), 1400).len(), 1);
        assert_eq!(engine.fires, 2);
    }

    #[test]
    fn test_status_sexp() {
        let rule = TriggerRule::new("blink", "eyeBlinkRight", 0.5, ActionCommand::GlobalBack)
            .with_hold(500);
        let mut engine = TriggerEngine::new(vec![rule], 300);
        engine.evaluate(&frame(&[("eyeBlinkRight", 0.9)]), 0);
        let sexp = engine.status_sexp();
        assert!(sexp.contains(":rules 1"), "got {}", sexp);
        assert!(sexp.contains(":holding (\"blink\")"), "got {}", sexp);
        assert!(sexp.contains(":global-cooldown-ms 300"));
    }

    #[test]
    fn test_rule_to_sexp() {
        let rule = TriggerRule::new("r1", "jawOpen", 0.5, ActionCommand::GlobalHome)
            .with_hold(100)
            .disabled();
        let sexp = rule.to_sexp();
        assert!(sexp.contains(":hold-ms 100"));
        assert!(sexp.contains(":enabled nil"));
        assert!(sexp.contains(":action (:action :global-home)"));
    }
}
