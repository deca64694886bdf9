//! Action commands: the opaque values handed to the platform executor.
//!
//! Covers system navigation, fixed-position gestures, cursor-relative
//! clicks, media keys, app launch, switch-access keys, and the internal
//! pause action.  Coordinates for fixed-position actions are fractions of
//! the screen (0.0–1.0).

// ── Categories ──────────────────────────────────────────────

/// Grouping used for mode filtering and UI tabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionCategory {
    /// Home, back, recents, lock screen, etc.
    System,
    /// Fixed-position taps, swipes, drags and pinches.
    Gesture,
    /// Actions applied at the current cursor position.
    Cursor,
    /// Media playback and volume.
    Media,
    /// App launch.
    App,
    /// Switch-access key injection.
    Switch,
}

impl ActionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Gesture => "gesture",
            Self::Cursor => "cursor",
            Self::Media => "media",
            Self::App => "app",
            Self::Switch => "switch",
        }
    }
}

// ── ActionCommand ───────────────────────────────────────────

/// Default swipe duration in milliseconds.
pub const DEFAULT_SWIPE_MS: u64 = 300;

/// Default drag duration in milliseconds.
pub const DEFAULT_DRAG_MS: u64 = 500;

/// A single command for the action executor.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCommand {
    GlobalHome,
    GlobalBack,
    GlobalRecents,
    GlobalNotifications,
    GlobalQuickSettings,
    ScreenLock,
    TakeScreenshot,
    PowerDialog,

    TapCenter,
    TapCustom { x: f32, y: f32 },
    DoubleTap { x: f32, y: f32 },
    LongPress { x: f32, y: f32 },

    SwipeUp { duration_ms: u64 },
    SwipeDown { duration_ms: u64 },
    SwipeLeft { duration_ms: u64 },
    SwipeRight { duration_ms: u64 },

    ScrollUp,
    ScrollDown,

    Drag {
        start_x: f32,
        start_y: f32,
        end_x: f32,
        end_y: f32,
        duration_ms: u64,
    },
    PinchIn,
    PinchOut,

    OpenApp { package: String },

    MediaPlayPause,
    MediaNext,
    MediaPrev,
    VolumeUp,
    VolumeDown,

    TapAtCursor,
    DoubleTapAtCursor,
    LongPressAtCursor,
    DragStartAtCursor,
    DragEndAtCursor,

    SwitchKey { key_code: i32, label: String },

    /// Flip the engine's active state instead of reaching the executor.
    MimicPause,
}

impl ActionCommand {
    /// Kebab-case name used in s-expressions and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalHome => "global-home",
            Self::GlobalBack => "global-back",
            Self::GlobalRecents => "global-recents",
            Self::GlobalNotifications => "global-notifications",
            Self::GlobalQuickSettings => "global-quick-settings",
            Self::ScreenLock => "screen-lock",
            Self::TakeScreenshot => "take-screenshot",
            Self::PowerDialog => "power-dialog",
            Self::TapCenter => "tap-center",
            Self::TapCustom { .. } => "tap-custom",
            Self::DoubleTap { .. } => "double-tap",
            Self::LongPress { .. } => "long-press",
            Self::SwipeUp { .. } => "swipe-up",
            Self::SwipeDown { .. } => "swipe-down",
            Self::SwipeLeft { .. } => "swipe-left",
            Self::SwipeRight { .. } => "swipe-right",
            Self::ScrollUp => "scroll-up",
            Self::ScrollDown => "scroll-down",
            Self::Drag { .. } => "drag",
            Self::PinchIn => "pinch-in",
            Self::PinchOut => "pinch-out",
            Self::OpenApp { .. } => "open-app",
            Self::MediaPlayPause => "media-play-pause",
            Self::MediaNext => "media-next",
            Self::MediaPrev => "media-prev",
            Self::VolumeUp => "volume-up",
            Self::VolumeDown => "volume-down",
            Self::TapAtCursor => "tap-at-cursor",
            Self::DoubleTapAtCursor => "double-tap-at-cursor",
            Self::LongPressAtCursor => "long-press-at-cursor",
            Self::DragStartAtCursor => "drag-start-at-cursor",
            Self::DragEndAtCursor => "drag-end-at-cursor",
            Self::SwitchKey { .. } => "switch-key",
            Self::MimicPause => "mimic-pause",
        }
    }

    /// Build a parameterless action (or one with default parameters) from
    /// its name.  Parameterised actions that need values (`tap-custom`,
    /// `drag`, `open-app`, `switch-key`) return None; the s-expression
    /// parser fills those in.
    pub fn from_name(name: &str) -> Option<Self> {
        let action = match name {
            "global-home" => Self::GlobalHome,
            "global-back" => Self::GlobalBack,
            "global-recents" => Self::GlobalRecents,
            "global-notifications" => Self::GlobalNotifications,
            "global-quick-settings" => Self::GlobalQuickSettings,
            "screen-lock" => Self::ScreenLock,
            "take-screenshot" => Self::TakeScreenshot,
            "power-dialog" => Self::PowerDialog,
            "tap-center" => Self::TapCenter,
            "double-tap" => Self::DoubleTap { x: 0.5, y: 0.5 },
            "long-press" => Self::LongPress { x: 0.5, y: 0.5 },
            "swipe-up" => Self::SwipeUp { duration_ms: DEFAULT_SWIPE_MS },
            "swipe-down" => Self::SwipeDown { duration_ms: DEFAULT_SWIPE_MS },
            "swipe-left" => Self::SwipeLeft { duration_ms: DEFAULT_SWIPE_MS },
            "swipe-right" => Self::SwipeRight { duration_ms: DEFAULT_SWIPE_MS },
            "scroll-up" => Self::ScrollUp,
            "scroll-down" => Self::ScrollDown,
            "pinch-in" => Self::PinchIn,
            "pinch-out" => Self::PinchOut,
            "media-play-pause" => Self::MediaPlayPause,
            "media-next" => Self::MediaNext,
            "media-prev" => Self::MediaPrev,
            "volume-up" => Self::VolumeUp,
            "volume-down" => Self::VolumeDown,
            "tap-at-cursor" => Self::TapAtCursor,
            "double-tap-at-cursor" => Self::DoubleTapAtCursor,
            "long-press-at-cursor" => Self::LongPressAtCursor,
            "drag-start-at-cursor" => Self::DragStartAtCursor,
            "drag-end-at-cursor" => Self::DragEndAtCursor,
            "mimic-pause" => Self::MimicPause,
            _ => return None,
        };
        Some(action)
    }

    pub fn category(&self) -> ActionCategory {
        match self {
            Self::GlobalHome
            | Self::GlobalBack
            | Self::GlobalRecents
            | Self::GlobalNotifications
            | Self::GlobalQuickSettings
            | Self::ScreenLock
            | Self::TakeScreenshot
            | Self::PowerDialog
            | Self::MimicPause => ActionCategory::System,
            Self::TapCenter
            | Self::TapCustom { .. }
            | Self::DoubleTap { .. }
            | Self::LongPress { .. }
            | Self::SwipeUp { .. }
            | Self::SwipeDown { .. }
            | Self::SwipeLeft { .. }
            | Self::SwipeRight { .. }
            | Self::ScrollUp
            | Self::ScrollDown
            | Self::Drag { .. }
            | Self::PinchIn
            | Self::PinchOut => ActionCategory::Gesture,
            Self::TapAtCursor
            | Self::DoubleTapAtCursor
            | Self::LongPressAtCursor
            | Self::DragStartAtCursor
            | Self::DragEndAtCursor => ActionCategory::Cursor,
            Self::MediaPlayPause
            | Self::MediaNext
            | Self::MediaPrev
            | Self::VolumeUp
            | Self::VolumeDown => ActionCategory::Media,
            Self::OpenApp { .. } => ActionCategory::App,
            Self::SwitchKey { .. } => ActionCategory::Switch,
        }
    }

    /// Whether this action targets a fixed screen position.
    pub fn is_fixed_position_tap(&self) -> bool {
        matches!(
            self,
            Self::TapCenter | Self::TapCustom { .. } | Self::DoubleTap { .. } | Self::LongPress { .. }
        )
    }

    /// Generate the s-expression form of this action.
    pub fn to_sexp(&self) -> String {
        match self {
            Self::TapCustom { x, y } | Self::DoubleTap { x, y } | Self::LongPress { x, y } => {
                format!("(:action :{} :x {:.3} :y {:.3})", self.as_str(), x, y)
            }
            Self::SwipeUp { duration_ms }
            | Self::SwipeDown { duration_ms }
            | Self::SwipeLeft { duration_ms }
            | Self::SwipeRight { duration_ms } => {
                format!("(:action :{} :duration-ms {})", self.as_str(), duration_ms)
            }
            Self::Drag {
                start_x,
                start_y,
                end_x,
                end_y,
                duration_ms,
            } => format!(
                "(:action :drag :start-x {:.3} :start-y {:.3} :end-x {:.3} :end-y {:.3} :duration-ms {})",
                start_x, start_y, end_x, end_y, duration_ms,
            ),
            Self::OpenApp { package } => {
                format!("(:action :open-app :package \"{}\")", escape_string(package))
            }
            Self::SwitchKey { key_code, label } => format!(
                "(:action :switch-key :key-code {} :label \"{}\")",
                key_code,
                escape_string(label),
            ),
            _ => format!("(:action :{})", self.as_str()),
        }
    }
}

/// Escape a string for s-expression output.
pub(crate) fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
