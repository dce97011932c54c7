//! `navigator.vibrate` via JavaScript FFI

use super::{Haptics, VibrationPattern};

extern "C" {
    fn journey_vibrate_supported() -> i32;
    fn journey_vibrate(steps_ptr: *const u32, len: usize);
}

/// Browser vibration API
#[derive(Debug, Default, Clone, Copy)]
pub struct WebHaptics;

impl Haptics for WebHaptics {
    fn is_supported(&mut self) -> bool {
        unsafe { journey_vibrate_supported() != 0 }
    }

    fn vibrate(&mut self, pattern: &VibrationPattern) {
        if !self.is_supported() {
            return;
        }
        let steps = pattern.steps();
        unsafe { journey_vibrate(steps.as_ptr(), steps.len()) }
    }
}
