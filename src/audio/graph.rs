//! Mixing graph
//!
//! Signal flow, rendered in software on the output callback:
//!
//! ```text
//! effect voices ──> effects bus (1.0) ─┐
//! ambient voices ─> ambient bus (0.3) ─┼─> limiter ─> master (0.8) ─> output
//! background ─────> music bus   (0.5) ─┘
//! ```
//!
//! The graph is shared with the audio thread behind a mutex; the engine is the
//! only writer. Gain ramps and the fade-out stop are sample accurate because
//! they advance inside `render`.

use std::sync::{Arc, Mutex, MutexGuard};

use super::background::PcmBuffer;

/// Graph shared between the engine and the output callback
pub type SharedGraph = Arc<Mutex<MixGraph>>;

/// Lock the shared graph, recovering from a poisoned mutex
///
/// A panic mid-render leaves the graph in a consistent (if glitchy) state,
/// so keep playing rather than propagating the poison.
pub fn lock_graph(graph: &SharedGraph) -> MutexGuard<'_, MixGraph> {
    graph.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Upper bound on simultaneous one-shot voices (oldest is dropped beyond this)
pub const MAX_VOICES: usize = 64;

/// Category bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    Effects,
    Ambient,
    Music,
}

/// Default bus and master levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphLevels {
    pub effects: f32,
    pub ambient: f32,
    pub music: f32,
    pub master: f32,
}

impl Default for GraphLevels {
    fn default() -> Self {
        Self {
            effects: 1.0,
            ambient: 0.3,
            music: 0.5,
            master: 0.8,
        }
    }
}

impl GraphLevels {
    pub fn bus(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Effects => self.effects,
            Bus::Ambient => self.ambient,
            Bus::Music => self.music,
        }
    }
}

/// Limiter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterSettings {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            threshold_db: -3.0,
            ratio: 20.0,
            attack_secs: 0.001,
            release_secs: 0.1,
        }
    }
}

/// Hard-knee peak compressor with a stereo-linked detector
#[derive(Debug, Clone)]
struct Limiter {
    threshold_db: f32,
    /// Fraction of the overshoot removed (1 - 1/ratio)
    slope: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed gain reduction in dB (>= 0)
    reduction_db: f32,
}

impl Limiter {
    fn new(settings: LimiterSettings, sample_rate: u32) -> Self {
        let rate = sample_rate.max(1) as f32;
        let coeff = |secs: f32| {
            if secs <= 0.0 {
                0.0
            } else {
                (-1.0 / (secs * rate)).exp()
            }
        };
        Self {
            threshold_db: settings.threshold_db,
            slope: 1.0 - 1.0 / settings.ratio.max(1.0),
            attack_coeff: coeff(settings.attack_secs),
            release_coeff: coeff(settings.release_secs),
            reduction_db: 0.0,
        }
    }

    fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        let level_db = if peak > 1e-6 { 20.0 * peak.log10() } else { -120.0 };
        let over = level_db - self.threshold_db;
        let target = if over > 0.0 { over * self.slope } else { 0.0 };

        let coeff = if target > self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = target + coeff * (self.reduction_db - target);

        if self.reduction_db <= 0.0 {
            return (left, right);
        }
        let gain = 10f32.powf(-self.reduction_db / 20.0);
        (left * gain, right * gain)
    }
}

/// Bus gain with an optional linear ramp
#[derive(Debug, Clone)]
struct BusGain {
    current: f32,
    target: f32,
    ramp_remaining_frames: usize,
}

impl BusGain {
    fn new(gain: f32) -> Self {
        Self {
            current: gain,
            target: gain,
            ramp_remaining_frames: 0,
        }
    }

    fn set(&mut self, gain: f32) {
        self.current = gain;
        self.target = gain;
        self.ramp_remaining_frames = 0;
    }

    fn ramp_to(&mut self, target: f32, frames: usize) {
        if frames == 0 {
            self.set(target);
            return;
        }
        self.target = target;
        self.ramp_remaining_frames = frames;
    }

    fn is_ramping(&self) -> bool {
        self.ramp_remaining_frames > 0
    }

    fn next_frame_gain(&mut self) -> f32 {
        if self.ramp_remaining_frames == 0 {
            return self.current;
        }

        let remaining = self.ramp_remaining_frames as f32;
        self.current += (self.target - self.current) / remaining;
        self.ramp_remaining_frames -= 1;
        if self.ramp_remaining_frames == 0 {
            self.current = self.target;
        }
        self.current
    }
}

/// Identity of one background-track playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackgroundHandle(u64);

/// One-shot mono voice
struct Voice {
    bus: Bus,
    buffer: Arc<[f32]>,
    position: usize,
}

/// The single background-track playback slot
struct BackgroundVoice {
    handle: BackgroundHandle,
    buffer: Arc<PcmBuffer>,
    frame: usize,
    /// Stop (and restore the music bus) once the music ramp reaches its target
    stop_when_faded: bool,
}

/// Software mixing graph
pub struct MixGraph {
    sample_rate: u32,
    levels: GraphLevels,
    effects: BusGain,
    ambient: BusGain,
    music: BusGain,
    limiter: Limiter,
    voices: Vec<Voice>,
    background: Option<BackgroundVoice>,
    next_handle: u64,
    frames_rendered: u64,
    voices_started: u64,
    last_trigger: Option<(Bus, usize)>,
}

impl MixGraph {
    pub fn new(sample_rate: u32, levels: GraphLevels) -> Self {
        Self::with_limiter(sample_rate, levels, LimiterSettings::default())
    }

    pub fn with_limiter(sample_rate: u32, levels: GraphLevels, limiter: LimiterSettings) -> Self {
        Self {
            sample_rate,
            levels,
            effects: BusGain::new(levels.effects),
            ambient: BusGain::new(levels.ambient),
            music: BusGain::new(levels.music),
            limiter: Limiter::new(limiter, sample_rate),
            voices: Vec::new(),
            background: None,
            next_handle: 1,
            frames_rendered: 0,
            voices_started: 0,
            last_trigger: None,
        }
    }

    /// Wrap for sharing with an output callback
    pub fn shared(self) -> SharedGraph {
        Arc::new(Mutex::new(self))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn levels(&self) -> GraphLevels {
        self.levels
    }

    /// Playback clock in seconds (frames rendered so far)
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate.max(1) as f64
    }

    fn bus_mut(&mut self, bus: Bus) -> &mut BusGain {
        match bus {
            Bus::Effects => &mut self.effects,
            Bus::Ambient => &mut self.ambient,
            Bus::Music => &mut self.music,
        }
    }

    /// Current gain of a bus
    pub fn bus_gain(&self, bus: Bus) -> f32 {
        match bus {
            Bus::Effects => self.effects.current,
            Bus::Ambient => self.ambient.current,
            Bus::Music => self.music.current,
        }
    }

    /// Set a bus gain immediately, cancelling any ramp on it
    pub fn set_bus_gain(&mut self, bus: Bus, gain: f32) {
        self.bus_mut(bus).set(gain.max(0.0));
    }

    /// Ramp a bus gain linearly over `secs`
    pub fn ramp_bus_gain(&mut self, bus: Bus, target: f32, secs: f64) {
        let frames = (secs.max(0.0) * self.sample_rate as f64).round() as usize;
        self.bus_mut(bus).ramp_to(target.max(0.0), frames);
    }

    /// Start a one-shot voice on a bus
    ///
    /// Voices are independent and cannot be cancelled; they end with their buffer.
    pub fn trigger(&mut self, bus: Bus, buffer: Arc<[f32]>) {
        if self.voices.len() >= MAX_VOICES {
            self.voices.remove(0);
        }
        self.voices.push(Voice {
            bus,
            buffer,
            position: 0,
        });
        self.voices_started += 1;
        self.last_trigger = Some((bus, self.voices.last().map_or(0, |v| v.buffer.len())));
    }

    /// Voices still sounding
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Total voices started since construction
    pub fn voices_started(&self) -> u64 {
        self.voices_started
    }

    /// Bus and buffer length (frames) of the most recent voice
    pub fn last_trigger(&self) -> Option<(Bus, usize)> {
        self.last_trigger
    }

    /// Start the background track, replacing whatever was playing
    ///
    /// A previous handle is stopped outright, even mid fade-out, and the music
    /// bus is put back to its default level for the new track.
    pub fn start_background(&mut self, buffer: Arc<PcmBuffer>) -> BackgroundHandle {
        if let Some(old) = self.background.take() {
            log::debug!("Replacing background track {:?}", old.handle);
        }
        let music = self.levels.music;
        self.music.set(music);

        let handle = BackgroundHandle(self.next_handle);
        self.next_handle += 1;
        self.background = Some(BackgroundVoice {
            handle,
            buffer,
            frame: 0,
            stop_when_faded: false,
        });
        handle
    }

    /// Stop the background track
    ///
    /// With `fade_secs`, the music bus ramps to silence and the track stops
    /// when the ramp completes, after which the bus returns to its default
    /// level. Without, playback stops now. Returns false if nothing was playing.
    pub fn stop_background(&mut self, fade_secs: Option<f64>) -> bool {
        let Some(voice) = self.background.as_mut() else {
            return false;
        };

        match fade_secs {
            Some(secs) if secs > 0.0 => {
                if voice.stop_when_faded {
                    // Already fading out
                    return true;
                }
                voice.stop_when_faded = true;
                self.ramp_bus_gain(Bus::Music, 0.0, secs);
            }
            _ => {
                let fading = voice.stop_when_faded;
                self.background = None;
                if fading {
                    let music = self.levels.music;
                    self.music.set(music);
                }
            }
        }
        true
    }

    /// Handle of the playing background track
    pub fn active_background(&self) -> Option<BackgroundHandle> {
        self.background.as_ref().map(|v| v.handle)
    }

    /// Whether the background track is fading out
    pub fn is_fading_out(&self) -> bool {
        self.background.as_ref().is_some_and(|v| v.stop_when_faded)
    }

    /// Render interleaved output frames
    ///
    /// The graph mixes in stereo; mono outputs get the average, extra
    /// channels beyond two are silent.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;

        for frame in 0..frames {
            let effects_gain = self.effects.next_frame_gain();
            let ambient_gain = self.ambient.next_frame_gain();
            let music_gain = self.music.next_frame_gain();

            let mut effects_in = 0.0f32;
            let mut ambient_in = 0.0f32;
            for voice in &mut self.voices {
                if let Some(&s) = voice.buffer.get(voice.position) {
                    match voice.bus {
                        Bus::Effects => effects_in += s,
                        Bus::Ambient => ambient_in += s,
                        Bus::Music => {}
                    }
                }
                voice.position += 1;
            }

            let (mut music_l, mut music_r) = (0.0f32, 0.0f32);
            let mut background_done = false;
            if let Some(bg) = self.background.as_mut() {
                match bg.buffer.frame(bg.frame) {
                    Some((l, r)) => {
                        music_l = l;
                        music_r = r;
                        bg.frame += 1;
                    }
                    None => background_done = true,
                }
                if bg.stop_when_faded && (background_done || !self.music.is_ramping()) {
                    // Track ended or the fade completed: stop and restore the bus
                    background_done = true;
                    let music = self.levels.music;
                    self.music.set(music);
                }
            }
            if background_done {
                self.background = None;
            }

            let bed = effects_in * effects_gain + ambient_in * ambient_gain;
            let left = bed + music_l * music_gain;
            let right = bed + music_r * music_gain;

            let (left, right) = self.limiter.process(left, right);
            let left = left * self.levels.master;
            let right = right * self.levels.master;

            let base = frame * channels;
            if channels == 1 {
                out[base] = (left + right) * 0.5;
            } else {
                out[base] = left;
                out[base + 1] = right;
                for sample in &mut out[base + 2..base + channels] {
                    *sample = 0.0;
                }
            }
        }

        self.voices.retain(|v| v.position < v.buffer.len());
        self.frames_rendered += frames as u64;
    }
}
