//! Gamepad rumble via gilrs force feedback

use gilrs::ff::{BaseEffect, BaseEffectType, Effect, EffectBuilder, Repeat, Replay, Ticks};
use gilrs::{GamepadId, Gilrs};

use super::{Haptics, VibrationPattern};

/// Strong-motor magnitude used for every pulse
const RUMBLE_MAGNITUDE: u16 = 0xC000;

/// Rumble on every connected force-feedback gamepad
pub struct GamepadHaptics {
    gilrs: Option<Gilrs>,
    /// Playing effect; dropping it stops the rumble
    effect: Option<Effect>,
}

impl GamepadHaptics {
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(gilrs) => Some(gilrs),
            Err(e) => {
                log::warn!("Gamepad haptics unavailable: {}", e);
                None
            }
        };
        Self { gilrs, effect: None }
    }

    fn rumble_pads(gilrs: &mut Gilrs) -> Vec<GamepadId> {
        // Drain events so connection state is current
        while gilrs.next_event().is_some() {}
        gilrs
            .gamepads()
            .filter(|(_, pad)| pad.is_connected() && pad.is_ff_supported())
            .map(|(id, _)| id)
            .collect()
    }
}

impl Default for GamepadHaptics {
    fn default() -> Self {
        Self::new()
    }
}

impl Haptics for GamepadHaptics {
    fn is_supported(&mut self) -> bool {
        self.gilrs
            .as_mut()
            .is_some_and(|gilrs| !Self::rumble_pads(gilrs).is_empty())
    }

    fn vibrate(&mut self, pattern: &VibrationPattern) {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return;
        };
        let pads = Self::rumble_pads(gilrs);
        if pads.is_empty() {
            log::debug!("No force-feedback gamepad, skipping vibration");
            return;
        }
        let segments = pattern.segments();
        if segments.is_empty() {
            return;
        }

        let mut builder = EffectBuilder::new();
        for (start, duration) in segments {
            builder.add_effect(BaseEffect {
                kind: BaseEffectType::Strong {
                    magnitude: RUMBLE_MAGNITUDE,
                },
                scheduling: Replay {
                    after: Ticks::from_ms(start),
                    play_for: Ticks::from_ms(duration),
                    with_delay: Ticks::from_ms(0),
                },
                envelope: Default::default(),
            });
        }

        let effect = builder
            .repeat(Repeat::For(Ticks::from_ms(pattern.total_ms())))
            .gamepads(&pads)
            .finish(gilrs);

        match effect.and_then(|effect| effect.play().map(|_| effect)) {
            Ok(effect) => self.effect = Some(effect),
            Err(e) => log::warn!("Failed to play rumble: {}", e),
        }
    }
}
