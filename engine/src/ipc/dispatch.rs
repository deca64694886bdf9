//! Command dispatch: parse s-expressions and route to the engine.

use lexpr::Value;
use tracing::{debug, warn};

use super::sexp::{error_response, get_float, get_int, get_keyword, ok_response};
use crate::mode::InteractionMode;
use crate::pipeline::MimicEngine;
use crate::toggle::ToggleEvent;

/// Parse an s-expression command and dispatch it.
/// Returns an optional response string (s-expression).
pub fn handle_message(engine: &mut MimicEngine, raw: &str) -> Option<String> {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("malformed s-expression: {}", e);
            return Some(error_response(0, &format!("malformed s-expression: {e}")));
        }
    };
    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);
    debug!("command {:?} id={}", msg_type, msg_id);

    match msg_type.as_deref() {
        Some("toggle") => handle_toggle(engine, msg_id, ToggleEvent::Toggle),
        Some("enable") => handle_toggle(engine, msg_id, ToggleEvent::Enable),
        Some("disable") => handle_toggle(engine, msg_id, ToggleEvent::Disable),
        Some("status") => handle_status(engine, msg_id),
        Some("config") => handle_config(engine, msg_id),
        Some("reset") => handle_reset(engine, msg_id),
        Some("set-mode") => handle_set_mode(engine, msg_id, &value),
        Some("set-smoothing") => handle_set_smoothing(engine, msg_id, &value),
        Some(other) => {
            warn!("unknown command type: {}", other);
            Some(error_response(msg_id, &format!("unknown message type: {other}")))
        }
        None => Some(error_response(msg_id, "missing :type")),
    }
}

fn handle_toggle(engine: &mut MimicEngine, msg_id: i64, event: ToggleEvent) -> Option<String> {
    if !engine.handle_command(event) {
        return Some(error_response(msg_id, "external toggle channel disabled"));
    }
    Some(format!(
        "(:type :response :id {} :status :ok :active {})",
        msg_id,
        if engine.is_active() { "t" } else { "nil" }
    ))
}

fn handle_status(engine: &mut MimicEngine, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :engine {})",
        msg_id,
        engine.status_sexp()
    ))
}

fn handle_config(engine: &mut MimicEngine, msg_id: i64) -> Option<String> {
    Some(format!(
        "(:type :response :id {} :status :ok :config {})",
        msg_id,
        engine.config_sexp()
    ))
}

fn handle_reset(engine: &mut MimicEngine, msg_id: i64) -> Option<String> {
    engine.reset();
    Some(ok_response(msg_id))
}

fn handle_set_mode(engine: &mut MimicEngine, msg_id: i64, value: &Value) -> Option<String> {
    let mode_str = get_keyword(value, "mode").unwrap_or_default();
    match InteractionMode::from_str(&mode_str) {
        Some(mode) => {
            engine.set_mode(mode);
            Some(ok_response(msg_id))
        }
        None => Some(error_response(
            msg_id,
            &format!("unknown mode: {mode_str}. Use: expression-only, cursor-click, head-mouse"),
        )),
    }
}

fn handle_set_smoothing(engine: &mut MimicEngine, msg_id: i64, value: &Value) -> Option<String> {
    let smoothing = engine.smoothing_mut();
    let Some(alpha) = get_float(value, "alpha") else {
        return Some(error_response(msg_id, "missing :alpha"));
    };
    let frames = get_int(value, "consecutive-frames")
        .map(|n| n.clamp(0, u32::MAX as i64) as u32)
        .unwrap_or_else(|| smoothing.consecutive_frames());
    smoothing.update_settings(alpha as f32, frames);
    Some(format!(
        "(:type :response :id {} :status :ok :alpha {:.2} :consecutive-frames {})",
        msg_id,
        smoothing.alpha(),
        smoothing.consecutive_frames()
    ))
}
