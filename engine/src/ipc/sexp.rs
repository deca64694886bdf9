//! S-expression plist helpers, response builders, and parsers for actions
//! and trigger rules.
//!
//! Messages are flat plists: `(:type :frame :t 120 :jawOpen 0.4)`.  Both
//! `Value::Keyword("key")` (elisp parser) and `Value::Symbol(":key")`
//! (default parser) forms are accepted.

use anyhow::{anyhow, bail, Context};
use lexpr::Value;

use crate::action::{escape_string, ActionCommand, DEFAULT_DRAG_MS, DEFAULT_SWIPE_MS};
use crate::smoothing::ChannelValues;
use crate::trigger::TriggerRule;

// ── Responses ──────────────────────────────────────────────

pub fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

pub fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}

// ── Plist access ───────────────────────────────────────────

fn key_name(v: &Value) -> Option<&str> {
    match v {
        Value::Keyword(k) => Some(&**k),
        Value::Symbol(s) => s.strip_prefix(':'),
        _ => None,
    }
}

fn atom_string(val: &Value) -> String {
    match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s: &str = v;
            s.strip_prefix(':').unwrap_or(s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "t" } else { "nil" }.to_string(),
        Value::Null => "nil".to_string(),
        _ => val.to_string(),
    }
}

/// All `:key value` pairs of a plist, in order.
pub fn plist_entries(value: &Value) -> Vec<(&str, &Value)> {
    let mut entries = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        match (key_name(pair.car()), pair.cdr()) {
            (Some(key), Value::Cons(next)) => {
                entries.push((key, next.car()));
                current = next.cdr();
            }
            _ => current = pair.cdr(),
        }
    }
    entries
}

/// Extract a keyword value from an s-expression plist as a string.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    plist_entries(value)
        .into_iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| atom_string(v))
}

pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Non-negative millisecond field.
pub fn get_ms(value: &Value, key: &str) -> Option<u64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Treats "nil" as false, anything else as true.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Numeric entries of a plist, skipping the given keys.
pub fn numeric_entries(value: &Value, skip: &[&str]) -> ChannelValues {
    plist_entries(value)
        .into_iter()
        .filter(|(k, _)| !skip.contains(k))
        .filter_map(|(k, v)| match v {
            Value::Number(n) => n.as_f64().map(|f| (k.to_string(), f as f32)),
            _ => None,
        })
        .collect()
}

// ── Parsers ────────────────────────────────────────────────

fn require_f32(value: &Value, key: &str, action: &str) -> anyhow::Result<f32> {
    get_float(value, key)
        .map(|f| f as f32)
        .ok_or_else(|| anyhow!(":{} requires :{}", action, key))
}

/// Parse the `:action` field (plus its parameters) of a plist.
pub fn parse_action(value: &Value) -> anyhow::Result<ActionCommand> {
    let name = get_keyword(value, "action").context("missing :action")?;
    let x = get_float(value, "x").map(|f| f as f32);
    let y = get_float(value, "y").map(|f| f as f32);
    let duration_ms = get_ms(value, "duration-ms");

    let action = match name.as_str() {
        "tap-custom" => ActionCommand::TapCustom {
            x: require_f32(value, "x", &name)?,
            y: require_f32(value, "y", &name)?,
        },
        "double-tap" => ActionCommand::DoubleTap {
            x: x.unwrap_or(0.5),
            y: y.unwrap_or(0.5),
        },
        "long-press" => ActionCommand::LongPress {
            x: x.unwrap_or(0.5),
            y: y.unwrap_or(0.5),
        },
        "swipe-up" => ActionCommand::SwipeUp {
            duration_ms: duration_ms.unwrap_or(DEFAULT_SWIPE_MS),
        },
        "swipe-down" => ActionCommand::SwipeDown {
            duration_ms: duration_ms.unwrap_or(DEFAULT_SWIPE_MS),
        },
        "swipe-left" => ActionCommand::SwipeLeft {
            duration_ms: duration_ms.unwrap_or(DEFAULT_SWIPE_MS),
        },
        "swipe-right" => ActionCommand::SwipeRight {
            duration_ms: duration_ms.unwrap_or(DEFAULT_SWIPE_MS),
        },
        "drag" => ActionCommand::Drag {
            start_x: require_f32(value, "start-x", &name)?,
            start_y: require_f32(value, "start-y", &name)?,
            end_x: require_f32(value, "end-x", &name)?,
            end_y: require_f32(value, "end-y", &name)?,
            duration_ms: duration_ms.unwrap_or(DEFAULT_DRAG_MS),
        },
        "open-app" => ActionCommand::OpenApp {
            package: get_string(value, "package").context(":open-app requires :package")?,
        },
        "switch-key" => ActionCommand::SwitchKey {
            key_code: get_int(value, "key-code")
                .and_then(|c| i32::try_from(c).ok())
                .context(":switch-key requires :key-code")?,
            label: get_string(value, "label").unwrap_or_default(),
        },
        other => match ActionCommand::from_name(other) {
            Some(action) => action,
            None => bail!("unknown action :{}", other),
        },
    };
    Ok(action)
}

/// Parse a trigger rule plist.
///
/// `(:id "blink" :channel "eyeBlinkRight" :threshold 0.6 :hold-ms 0
///   :cooldown-ms 300 :priority 0 :enabled t :action :global-back)`
pub fn parse_rule(value: &Value) -> anyhow::Result<TriggerRule> {
    let id = get_string(value, "id").context("rule missing :id")?;
    let channel = get_string(value, "channel").context("rule missing :channel")?;
    let threshold = get_float(value, "threshold").context("rule missing :threshold")? as f32;
    let action = parse_action(value).with_context(|| format!("rule {}", id))?;

    let mut rule = TriggerRule::new(id, channel, threshold, action);
    if let Some(name) = get_string(value, "name") {
        rule = rule.with_name(name);
    }
    if let Some(hold) = get_ms(value, "hold-ms") {
        rule = rule.with_hold(hold);
    }
    if let Some(cooldown) = get_ms(value, "cooldown-ms") {
        rule = rule.with_cooldown(cooldown);
    }
    if let Some(priority) = get_int(value, "priority") {
        rule = rule.with_priority(priority.clamp(i32::MIN as i64, i32::MAX as i64) as i32);
    }
    if get_bool(value, "enabled") == Some(false) {
        rule = rule.disabled();
    }
    Ok(rule)
}
