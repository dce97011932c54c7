//! Haptic feedback
//!
//! Vibration cues are optional sensory sugar: hosts without a haptic device
//! accept every pattern and do nothing.
//!
//! Native: gamepad rumble through gilrs
//! WASM: `navigator.vibrate` via JavaScript FFI

#[cfg(not(target_arch = "wasm32"))]
mod gamepad;
#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(not(target_arch = "wasm32"))]
pub use gamepad::GamepadHaptics;
#[cfg(target_arch = "wasm32")]
pub use web::WebHaptics;

/// Default pulse length in milliseconds
pub const DEFAULT_PULSE_MS: u32 = 50;

/// A vibration request: one pulse, or alternating on/off durations (ms)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VibrationPattern {
    Pulse(u32),
    /// `[on, off, on, off, ...]`
    Sequence(Vec<u32>),
}

impl Default for VibrationPattern {
    fn default() -> Self {
        VibrationPattern::Pulse(DEFAULT_PULSE_MS)
    }
}

impl From<u32> for VibrationPattern {
    fn from(ms: u32) -> Self {
        VibrationPattern::Pulse(ms)
    }
}

impl From<Vec<u32>> for VibrationPattern {
    fn from(steps: Vec<u32>) -> Self {
        VibrationPattern::Sequence(steps)
    }
}

impl From<&[u32]> for VibrationPattern {
    fn from(steps: &[u32]) -> Self {
        VibrationPattern::Sequence(steps.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for VibrationPattern {
    fn from(steps: [u32; N]) -> Self {
        VibrationPattern::Sequence(steps.to_vec())
    }
}

impl VibrationPattern {
    /// The raw `[on, off, ...]` list as the web API takes it
    pub fn steps(&self) -> Vec<u32> {
        match self {
            VibrationPattern::Pulse(ms) => vec![*ms],
            VibrationPattern::Sequence(steps) => steps.clone(),
        }
    }

    /// `(start_ms, duration_ms)` of each "on" segment, zero-length ones skipped
    pub fn segments(&self) -> Vec<(u32, u32)> {
        let mut at = 0u32;
        let mut segments = Vec::new();
        for (i, ms) in self.steps().into_iter().enumerate() {
            if i % 2 == 0 && ms > 0 {
                segments.push((at, ms));
            }
            at = at.saturating_add(ms);
        }
        segments
    }

    /// Time until the last "on" segment ends
    pub fn total_ms(&self) -> u32 {
        self.segments()
            .last()
            .map_or(0, |(start, len)| start.saturating_add(*len))
    }
}

/// Host haptic capability
pub trait Haptics {
    /// Whether a vibration device is currently reachable
    fn is_supported(&mut self) -> bool;

    /// Fire a pattern; no-op when unsupported
    fn vibrate(&mut self, pattern: &VibrationPattern);
}

/// Host without haptics
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHaptics;

impl Haptics for NullHaptics {
    fn is_supported(&mut self) -> bool {
        false
    }

    fn vibrate(&mut self, _pattern: &VibrationPattern) {}
}

/// The platform's haptic backend
pub fn default_haptics() -> Box<dyn Haptics> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(GamepadHaptics::new())
    }

    #[cfg(target_arch = "wasm32")]
    {
        Box::new(WebHaptics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_short_pulse() {
        assert_eq!(VibrationPattern::default(), VibrationPattern::Pulse(50));
        assert_eq!(VibrationPattern::default().segments(), vec![(0, 50)]);
    }

    #[test]
    fn test_sequence_segments() {
        let pattern = VibrationPattern::from([100u32, 50, 100, 50, 200]);
        assert_eq!(pattern.segments(), vec![(0, 100), (150, 100), (300, 200)]);
        assert_eq!(pattern.total_ms(), 500);
        assert_eq!(pattern.steps(), vec![100, 50, 100, 50, 200]);
    }

    #[test]
    fn test_trailing_pause_and_zero_pulses() {
        let pattern = VibrationPattern::from(vec![0u32, 20, 30, 40]);
        assert_eq!(pattern.segments(), vec![(20, 30)]);
        assert_eq!(pattern.total_ms(), 50);
        assert_eq!(VibrationPattern::Sequence(Vec::new()).total_ms(), 0);
    }

    #[test]
    fn test_null_haptics_is_unsupported() {
        let mut haptics = NullHaptics;
        assert!(!haptics.is_supported());
        haptics.vibrate(&VibrationPattern::Pulse(100));
    }
}
