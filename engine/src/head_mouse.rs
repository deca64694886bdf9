//! Head-pose → cursor mapping for the head-mouse mode.
//!
//! Yaw and pitch (radians) pass through a deadzone and a sign-preserving
//! power curve, then move the cursor relative to its previous position.
//! Pitch is inverted (looking up moves the cursor up, towards y = 0).

use tracing::{debug, warn};

/// Head-mouse tuning parameters.
#[derive(Debug, Clone)]
pub struct HeadMouseConfig {
    /// Pixels per radian, horizontal.
    pub sensitivity_x: f32,
    /// Pixels per radian, vertical.
    pub sensitivity_y: f32,
    /// Angles below this magnitude (radians) are ignored.
    pub deadzone: f32,
    /// Exponent of the acceleration curve.
    pub acceleration: f32,
}

impl Default for HeadMouseConfig {
    fn default() -> Self {
        Self {
            sensitivity_x: 2500.0,
            sensitivity_y: 2500.0,
            deadzone: 0.05,
            acceleration: 1.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeadMouse {
    pub config: HeadMouseConfig,
    screen_width: f32,
    screen_height: f32,
    x: f32,
    y: f32,
}

impl HeadMouse {
    /// Cursor starts at the screen centre.
    pub fn new(config: HeadMouseConfig, screen_width: f32, screen_height: f32) -> Self {
        let mut mouse = Self {
            config,
            screen_width: screen_width.max(0.0),
            screen_height: screen_height.max(0.0),
            x: 0.0,
            y: 0.0,
        };
        mouse.recenter();
        mouse
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Move the cursor by one head-pose sample and return the new position.
    /// Non-finite angles are dropped and the cursor stays put.
    pub fn update(&mut self, yaw: f32, pitch: f32) -> (f32, f32) {
        if !yaw.is_finite() || !pitch.is_finite() {
            warn!("Head mouse: ignoring non-finite pose yaw={} pitch={}", yaw, pitch);
            return (self.x, self.y);
        }
        let yaw = accelerate(apply_deadzone(yaw, self.config.deadzone), self.config.acceleration);
        let pitch = accelerate(
            apply_deadzone(pitch, self.config.deadzone),
            self.config.acceleration,
        );

        let dx = yaw * self.config.sensitivity_x;
        let dy = -pitch * self.config.sensitivity_y;
        self.x = (self.x + dx).clamp(0.0, self.screen_width);
        self.y = (self.y + dy).clamp(0.0, self.screen_height);
        (self.x, self.y)
    }

    pub fn recenter(&mut self) {
        self.x = self.screen_width / 2.0;
        self.y = self.screen_height / 2.0;
    }

    /// Change the screen bounds and recenter.
    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        self.screen_width = width.max(0.0);
        self.screen_height = height.max(0.0);
        debug!("Head mouse screen {}x{}", self.screen_width, self.screen_height);
        self.recenter();
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:sensitivity-x {:.0} :sensitivity-y {:.0} :deadzone {:.3} :acceleration {:.2} :screen ({:.0} {:.0}))",
            self.config.sensitivity_x,
            self.config.sensitivity_y,
            self.config.deadzone,
            self.config.acceleration,
            self.screen_width,
            self.screen_height,
        )
    }
}

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        (value.abs() - deadzone).copysign(value)
    }
}

fn accelerate(value: f32, power: f32) -> f32 {
    if value == 0.0 {
        return 0.0;
    }
    value.abs().powf(power).copysign(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse() -> HeadMouse {
        HeadMouse::new(HeadMouseConfig::default(), 1080.0, 2400.0)
    }

    #[test]
    fn test_starts_centered() {
        assert_eq!(mouse().position(), (540.0, 1200.0));
    }

    #[test]
    fn test_deadzone_holds_still() {
        let mut m = mouse();
        assert_eq!(m.update(0.04, -0.049), (540.0, 1200.0));
    }

    #[test]
    fn test_yaw_moves_right_with_acceleration() {
        let mut m = mouse();
        let (x, y) = m.update(0.09, 0.0);
        // (0.09 - 0.05)^1.5 * 2500 = 20px
        assert!((x - 560.0).abs() < 0.1, "got {}", x);
        assert_eq!(y, 1200.0);
    }

    #[test]
    fn test_pitch_up_moves_cursor_up() {
        let mut m = mouse();
        let (_, y) = m.update(0.0, 0.09);
        assert!((y - 1180.0).abs() < 0.1, "got {}", y);
        let (_, y) = m.update(0.0, -0.09);
        assert!((y - 1200.0).abs() < 0.1, "got {}", y);
    }

    #[test]
    fn test_clamped_to_screen() {
        let mut m = mouse();
        for _ in 0..50 {
            m.update(-1.0, -1.0);
        }
        assert_eq!(m.position(), (0.0, 2400.0));
    }

    #[test]
    fn test_non_finite_pose_keeps_position() {
        let mut m = mouse();
        assert_eq!(m.update(f32::NAN, 0.0), (540.0, 1200.0));
        assert_eq!(m.update(0.0, f32::INFINITY), (540.0, 1200.0));
        let (x, y) = m.update(0.09, 0.0);
        assert!((x - 560.0).abs() < 0.1, "Cursor should recover, got {}", x);
        assert_eq!(y, 1200.0);
    }

    #[test]
    fn test_set_screen_size_recenters() {
        let mut m = mouse();
        m.update(0.5, 0.0);
        m.set_screen_size(200.0, 100.0);
        assert_eq!(m.position(), (100.0, 50.0));
    }
}
