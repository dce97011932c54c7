//! Procedural sound effects
//!
//! Every cue is synthesized at init from closed-form oscillator sums and
//! amplitude envelopes, so no audio assets ship with the journey.
//! Noise comes from a fixed per-effect seed: the same effect at the same
//! sample rate always produces the same buffer.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The closed set of named effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundEffect {
    Beep,
    Chime,
    Click,
    Error,
    Success,
    Door,
    Stamp,
    Dial,
    Unlock,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 9] = [
        SoundEffect::Beep,
        SoundEffect::Chime,
        SoundEffect::Click,
        SoundEffect::Error,
        SoundEffect::Success,
        SoundEffect::Door,
        SoundEffect::Stamp,
        SoundEffect::Dial,
        SoundEffect::Unlock,
    ];

    /// Name used by stage scripts
    pub fn name(&self) -> &'static str {
        match self {
            SoundEffect::Beep => "beep",
            SoundEffect::Chime => "chime",
            SoundEffect::Click => "click",
            SoundEffect::Error => "error",
            SoundEffect::Success => "success",
            SoundEffect::Door => "door",
            SoundEffect::Stamp => "stamp",
            SoundEffect::Dial => "dial",
            SoundEffect::Unlock => "unlock",
        }
    }

    /// Look up an effect by name (`None` for unknown names)
    pub fn from_name(name: &str) -> Option<SoundEffect> {
        Self::ALL.iter().copied().find(|e| e.name() == name)
    }

    /// Buffer length in seconds
    pub fn duration(&self) -> f64 {
        match self {
            SoundEffect::Door => 1.5,
            SoundEffect::Chime => 0.8,
            _ => 0.15,
        }
    }

    /// Number of samples in this effect's buffer at `sample_rate`
    pub fn sample_count(&self, sample_rate: u32) -> usize {
        (sample_rate as f64 * self.duration()) as usize
    }

    fn seed(&self) -> u64 {
        0x5EED_0000 + *self as u64
    }

    /// Render the effect as a mono buffer
    pub fn synthesize(&self, sample_rate: u32) -> Vec<f32> {
        let len = self.sample_count(sample_rate);
        let rate = sample_rate.max(1) as f64;
        let duration = self.duration();
        let mut rng = StdRng::seed_from_u64(self.seed());
        let mut noise = move || rng.gen_range(-1.0f64..1.0);

        let sine = |freq: f64, t: f64| (2.0 * PI * freq * t).sin();

        (0..len)
            .map(|i| {
                let t = i as f64 / rate;
                let sample = match self {
                    SoundEffect::Beep => sine(880.0, t) * (-t * 20.0).exp() * 0.3,
                    SoundEffect::Chime => {
                        (sine(523.0, t) * 0.3 + sine(659.0, t) * 0.2 + sine(784.0, t) * 0.15)
                            * (-t * 3.0).exp()
                    }
                    SoundEffect::Click => noise() * (-t * 80.0).exp() * 0.4,
                    SoundEffect::Dial => (sine(1200.0, t) * 0.2 + noise() * 0.3) * (-t * 60.0).exp(),
                    SoundEffect::Unlock => {
                        (sine(440.0, t) * 0.3 + sine(554.0, t) * 0.2 + noise() * 0.2)
                            * (-t * 15.0).exp()
                    }
                    SoundEffect::Error => sine(200.0, t) * (-t * 25.0).exp() * 0.4,
                    // Rising pitch: the instantaneous frequency term is scaled by t again
                    SoundEffect::Success => sine(440.0 + t * 400.0, t) * (-t * 8.0).exp() * 0.3,
                    // Half-sine swell over the whole buffer
                    SoundEffect::Door => {
                        (sine(80.0, t) * 0.3 + noise() * 0.1) * (PI * t / duration).sin()
                    }
                    SoundEffect::Stamp => (noise() * 0.5 + sine(150.0, t) * 0.3) * (-t * 40.0).exp(),
                };
                sample as f32
            })
            .collect()
    }
}

impl fmt::Display for SoundEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoundEffect {
    type Err = UnknownEffect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundEffect::from_name(s).ok_or_else(|| UnknownEffect(s.to_string()))
    }
}

/// Rejected effect name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sound effect: {0}")]
pub struct UnknownEffect(pub String);

/// Precomputed buffers for every [`SoundEffect`]
///
/// Buffers are shared with the mixer; triggering an effect only clones an `Arc`.
#[derive(Debug, Clone)]
pub struct EffectLibrary {
    sample_rate: u32,
    buffers: Vec<Arc<[f32]>>,
}

impl EffectLibrary {
    /// Synthesize all effects at `sample_rate`
    pub fn generate(sample_rate: u32) -> Self {
        let buffers = SoundEffect::ALL
            .iter()
            .map(|effect| Arc::from(effect.synthesize(sample_rate)))
            .collect();
        Self { sample_rate, buffers }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Cached buffer for an effect
    pub fn get(&self, effect: SoundEffect) -> &Arc<[f32]> {
        // ALL is declared in discriminant order
        &self.buffers[effect as usize]
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
