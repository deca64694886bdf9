//! Per-channel exponential smoothing of raw blend-shape intensities.
//!
//! The first sample of a channel passes through unchanged; later samples
//! blend with the previous smoothed value.  The filter returns every
//! channel seen so far, so rules on channels missing from the current
//! frame still see their last smoothed value.

use std::collections::HashMap;
use tracing::{debug, warn};

/// Channel identifier → intensity (0.0–1.0) for one frame.
pub type ChannelValues = HashMap<String, f32>;

/// Smallest accepted smoothing factor.
pub const MIN_ALPHA: f32 = 0.1;
/// Largest accepted smoothing factor.
pub const MAX_ALPHA: f32 = 0.9;

// ── Config ──────────────────────────────────────────────────

/// Smoothing configuration.
#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    /// EMA weight of the newest sample (clamped to 0.1–0.9).
    pub alpha: f32,
    /// Consecutive frames required to confirm an expression.  Stored and
    /// reported, never consulted by matching.
    pub consecutive_frames: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            consecutive_frames: 3,
        }
    }
}

// ── Filter ──────────────────────────────────────────────────

/// Exponential moving average over named channels.
#[derive(Debug, Clone, Default)]
pub struct SmoothingFilter {
    config: SmoothingConfig,
    smoothed: ChannelValues,
}

impl SmoothingFilter {
    pub fn new(config: SmoothingConfig) -> Self {
        let mut filter = Self::default();
        filter.update_settings(config.alpha, config.consecutive_frames);
        filter
    }

    /// Current smoothing factor.
    pub fn alpha(&self) -> f32 {
        self.config.alpha
    }

    pub fn consecutive_frames(&self) -> u32 {
        self.config.consecutive_frames
    }

    /// Update the smoothing factor and the (inert) consecutive-frame count.
    pub fn update_settings(&mut self, alpha: f32, consecutive_frames: u32) {
        if alpha.is_finite() {
            self.config.alpha = alpha.clamp(MIN_ALPHA, MAX_ALPHA);
        } else {
            warn!("Smoothing: ignoring non-finite alpha {}", alpha);
        }
        self.config.consecutive_frames = consecutive_frames.clamp(1, 10);
        debug!(
            "Smoothing settings: alpha={:.2} consecutive_frames={}",
            self.config.alpha, self.config.consecutive_frames
        );
    }

    /// Blend a raw frame into the state and return all smoothed channels.
    /// Non-finite samples are skipped.
    pub fn process(&mut self, raw: &ChannelValues) -> ChannelValues {
        let alpha = self.config.alpha;
        for (channel, &value) in raw {
            if !value.is_finite() {
                debug!("Smoothing: skipping non-finite {} sample", channel);
                continue;
            }
            match self.smoothed.get_mut(channel) {
                Some(prev) => *prev = alpha * value + (1.0 - alpha) * *prev,
                None => {
                    self.smoothed.insert(channel.clone(), value);
                }
            }
        }
        self.smoothed.clone()
    }

    /// Last smoothed value of a channel, if it has been seen.
    pub fn value(&self, channel: &str) -> Option<f32> {
        self.smoothed.get(channel).copied()
    }

    /// Number of channels seen since the last reset.
    pub fn channel_count(&self) -> usize {
        self.smoothed.len()
    }

    /// Forget all channels (profile or context switch).
    pub fn reset(&mut self) {
        self.smoothed.clear();
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:alpha {:.2} :consecutive-frames {} :channels {})",
            self.config.alpha,
            self.config.consecutive_frames,
            self.smoothed.len(),
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
    fn test_first_sample_passes_through() {
        let mut filter = SmoothingFilter::default();
        let out = filter.process(&frame(&[("eyeBlinkRight", 0.8)]));
        assert_eq!(out["eyeBlinkRight"], 0.8);

        let mut filter = SmoothingFilter::new(SmoothingConfig {
            alpha: 0.3,
            consecutive_frames: 3,
        });
        let out = filter.process(&frame(&[("jawOpen", 0.37)]));
        assert_eq!(out["jawOpen"], 0.37);
    }

    #[test]
    fn test_second_sample_blends() {
        let mut filter = SmoothingFilter::default();
        filter.process(&frame(&[("eyeBlinkRight", 1.0)]));
        let out = filter.process(&frame(&[("eyeBlinkRight", 0.0)]));
        assert!((out["eyeBlinkRight"] - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_low_alpha_keeps_history() {
        let mut filter = SmoothingFilter::new(SmoothingConfig {
            alpha: 0.1,
            consecutive_frames: 3,
        });
        filter.process(&frame(&[("jawOpen", 1.0)]));
        let out = filter.process(&frame(&[("jawOpen", 0.0)]));
        assert!((out["jawOpen"] - 0.9).abs() < 1e-3);
    }

    #[test]
    fn test_alpha_clamped_high() {
        let mut filter = SmoothingFilter::default();
        filter.update_settings(2.0, 3);
        assert_eq!(filter.alpha(), 0.9);
        filter.process(&frame(&[("x", 1.0)]));
        let out = filter.process(&frame(&[("x", 0.0)]));
        assert!((out["x"] - 0.1).abs() < 1e-3, "got {}", out["x"]);
    }

    #[test]
    fn test_alpha_clamped_low_and_nan_ignored() {
        let mut filter = SmoothingFilter::default();
        filter.update_settings(-1.0, 3);
        assert_eq!(filter.alpha(), 0.1);
        filter.update_settings(f32::NAN, 3);
        assert_eq!(filter.alpha(), 0.1);
    }

    #[test]
    fn test_consecutive_frames_clamped() {
        let mut filter = SmoothingFilter::default();
        filter.update_settings(0.5, 0);
        assert_eq!(filter.consecutive_frames(), 1);
        filter.update_settings(0.5, 50);
        assert_eq!(filter.consecutive_frames(), 10);
    }

    #[test]
    fn test_channels_independent() {
        let mut filter = SmoothingFilter::default();
        filter.process(&frame(&[("eyeBlinkLeft", 1.0), ("jawOpen", 0.6)]));
        let out = filter.process(&frame(&[("eyeBlinkLeft", 0.0), ("jawOpen", 0.0)]));
        assert!((out["eyeBlinkLeft"] - 0.5).abs() < 1e-3);
        assert!((out["jawOpen"] - 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_absent_channel_keeps_last_value() {
        let mut filter = SmoothingFilter::default();
        filter.process(&frame(&[("jawOpen", 0.7)]));
        let out = filter.process(&frame(&[("mouthSmileLeft", 0.2)]));
        assert_eq!(out.len(), 2);
        assert_eq!(out["jawOpen"], 0.7);
        assert_eq!(filter.value("mouthSmileLeft"), Some(0.2));
    }

    #[test]
    fn test_non_finite_sample_skipped() {
        let mut filter = SmoothingFilter::default();
        filter.process(&frame(&[("jawOpen", 0.4)]));
        let out = filter.process(&frame(&[("jawOpen", f32::NAN), ("eyeBlinkLeft", f32::INFINITY)]));
        assert_eq!(out["jawOpen"], 0.4);
        assert!(!out.contains_key("eyeBlinkLeft"), "got {:?}", out);
        let out = filter.process(&frame(&[("jawOpen", 0.8)]));
        assert!((out["jawOpen"] - 0.6).abs() < 1e-6, "got {}", out["jawOpen"]);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut filter = SmoothingFilter::default();
        filter.process(&frame(&[("eyeBlinkRight", 1.0)]));
        filter.reset();
        assert_eq!(filter.channel_count(), 0);
        let out = filter.process(&frame(&[("eyeBlinkRight", 0.5)]));
        assert_eq!(out["eyeBlinkRight"], 0.5);
    }

    #[test]
    fn test_config_sexp() {
        let filter = SmoothingFilter::default();
        let sexp = filter.config_sexp();
        assert!(sexp.contains(":alpha 0.50"));
        assert!(sexp.contains(":consecutive-frames 3"));
    }
}
