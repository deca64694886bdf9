//! Interaction modes and per-mode action filtering.

use crate::action::{ActionCategory, ActionCommand};

/// How the user drives the cursor and which actions are safe to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Expressions map to fixed-position gestures and system actions.
    #[default]
    ExpressionOnly,
    /// An external pointer moves the cursor; expressions click.
    CursorClick,
    /// Head movement drives an overlay cursor; expressions or dwell click.
    HeadMouse,
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpressionOnly => "expression-only",
            Self::CursorClick => "cursor-click",
            Self::HeadMouse => "head-mouse",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "expression-only" => Some(Self::ExpressionOnly),
            "cursor-click" => Some(Self::CursorClick),
            "head-mouse" => Some(Self::HeadMouse),
            _ => None,
        }
    }

    /// Parse a mode name.  Unknown names fall back to `ExpressionOnly`.
    pub fn from_str_or_default(s: &str) -> Self {
        Self::from_str(s).unwrap_or_default()
    }

    /// Whether `action` may run in this mode.
    ///
    /// ExpressionOnly blocks cursor actions, HeadMouse blocks fixed-position
    /// taps.  System, media, app and switch actions always pass.
    pub fn is_action_allowed(&self, action: &ActionCommand) -> bool {
        match self {
            Self::ExpressionOnly => action.category() != ActionCategory::Cursor,
            Self::CursorClick => true,
            Self::HeadMouse => !action.is_fixed_position_tap(),
        }
    }

    /// Action categories offered for this mode.
    pub fn available_categories(&self) -> Vec<ActionCategory> {
        let mut categories = vec![
            ActionCategory::System,
            ActionCategory::Media,
            ActionCategory::App,
            ActionCategory::Switch,
        ];
        match self {
            Self::ExpressionOnly => categories.push(ActionCategory::Gesture),
            Self::CursorClick => {
                categories.push(ActionCategory::Gesture);
                categories.push(ActionCategory::Cursor);
            }
            Self::HeadMouse => categories.push(ActionCategory::Cursor),
        }
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_only_blocks_cursor_actions() {
        let mode = InteractionMode::ExpressionOnly;
        assert!(!mode.is_action_allowed(&ActionCommand::TapAtCursor));
        assert!(!mode.is_action_allowed(&ActionCommand::DragEndAtCursor));
        assert!(mode.is_action_allowed(&ActionCommand::TapCenter));
        assert!(mode.is_action_allowed(&ActionCommand::GlobalBack));
    }

    #[test]
    fn test_cursor_click_allows_everything() {
        let mode = InteractionMode::CursorClick;
        assert!(mode.is_action_allowed(&ActionCommand::TapAtCursor));
        assert!(mode.is_action_allowed(&ActionCommand::TapCustom { x: 0.1, y: 0.1 }));
    }

    #[test]
    fn test_head_mouse_blocks_fixed_taps_only() {
        let mode = InteractionMode::HeadMouse;
        assert!(!mode.is_action_allowed(&ActionCommand::TapCenter));
        assert!(!mode.is_action_allowed(&ActionCommand::DoubleTap { x: 0.5, y: 0.5 }));
        assert!(mode.is_action_allowed(&ActionCommand::SwipeUp { duration_ms: 300 }));
        assert!(mode.is_action_allowed(&ActionCommand::LongPressAtCursor));
        assert!(mode.is_action_allowed(&ActionCommand::SwitchKey {
            key_code: 62,
            label: "space".into(),
        }));
    }

    #[test]
    fn test_mode_parse_falls_back() {
        assert_eq!(InteractionMode::from_str_or_default("head-mouse"), InteractionMode::HeadMouse);
        assert_eq!(
            InteractionMode::from_str_or_default("cursor-click"),
            InteractionMode::CursorClick
        );
        assert_eq!(
            InteractionMode::from_str_or_default("telepathy"),
            InteractionMode::ExpressionOnly
        );
        assert_eq!(InteractionMode::from_str("telepathy"), None);
    }

    #[test]
    fn test_available_categories() {
        let head = InteractionMode::HeadMouse.available_categories();
        assert!(head.contains(&ActionCategory::Cursor));
        assert!(!head.contains(&ActionCategory::Gesture));
        let expr = InteractionMode::ExpressionOnly.available_categories();
        assert!(expr.contains(&ActionCategory::Gesture));
        assert!(!expr.contains(&ActionCategory::Cursor));
        assert_eq!(InteractionMode::CursorClick.available_categories().len(), 6);
    }
}
