//! Host audio output
//!
//! Platform-specific audio output:
//! - Native: cpal for direct audio device access
//! - WASM: Web Audio API via JavaScript FFI (frames pushed every frame)
//! - Headless: no device; a tap renders the graph on demand

use std::sync::{Arc, Mutex};

use super::graph::{lock_graph, Bus, SharedGraph};
use crate::error::AudioError;

/// Sample rate for audio output
pub const SAMPLE_RATE: u32 = 44100;

/// Upper bound on frames pushed per `pump` (prevents runaway if the tab was backgrounded)
pub const MAX_PUMP_FRAMES: usize = 4096;

/// Host audio capability
pub trait AudioOutput {
    /// Rate the graph must render at
    fn sample_rate(&self) -> u32;

    /// Open the device and start pulling from `graph`
    fn start(&mut self, graph: SharedGraph) -> Result<(), AudioError>;

    /// Called once per frame with elapsed seconds; push-model hosts render here
    fn pump(&mut self, _delta: f64) {}
}

/// Turns elapsed wall time into whole frames, carrying the fraction
#[derive(Debug, Default, Clone)]
pub(crate) struct FrameClock {
    accumulator: f64,
}

impl FrameClock {
    pub(crate) fn frames_for(&mut self, delta: f64, sample_rate: u32) -> usize {
        self.accumulator += delta.max(0.0) * sample_rate as f64;
        let frames = self.accumulator as usize;
        self.accumulator -= frames as f64;
        frames.min(MAX_PUMP_FRAMES)
    }
}

// =============================================================================
// Native audio output using cpal
// =============================================================================

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::*;
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleRate, Stream, StreamConfig};

    /// Default output device via cpal
    pub struct CpalOutput {
        /// The audio stream (kept alive while the engine lives)
        stream: Option<Stream>,
    }

    impl CpalOutput {
        pub fn new() -> Self {
            Self { stream: None }
        }
    }

    impl Default for CpalOutput {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioOutput for CpalOutput {
        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }

        fn start(&mut self, graph: SharedGraph) -> Result<(), AudioError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;

            let config = StreamConfig {
                channels: 2,
                sample_rate: SampleRate(SAMPLE_RATE),
                buffer_size: cpal::BufferSize::Default,
            };

            let stream = device
                .build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        lock_graph(&graph).render(data, 2);
                    },
                    |err| log::error!("Audio stream error: {}", err),
                    None,
                )
                .map_err(|e| AudioError::Stream(e.to_string()))?;

            stream.play().map_err(|e| AudioError::Stream(e.to_string()))?;
            self.stream = Some(stream);
            Ok(())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::CpalOutput;

// =============================================================================
// WASM audio output using Web Audio API via JavaScript
// =============================================================================

#[cfg(target_arch = "wasm32")]
mod web {
    use super::*;

    extern "C" {
        /// Creates the page's AudioContext; returns 0 if the browser refuses
        fn journey_audio_init(sample_rate: u32) -> i32;
        fn journey_audio_write(left_ptr: *const f32, right_ptr: *const f32, len: usize);
    }

    /// Web Audio sink fed from the frame loop
    pub struct WebOutput {
        graph: Option<SharedGraph>,
        clock: FrameClock,
        interleaved: Vec<f32>,
        left: Vec<f32>,
        right: Vec<f32>,
    }

    impl WebOutput {
        pub fn new() -> Self {
            Self {
                graph: None,
                clock: FrameClock::default(),
                interleaved: vec![0.0; MAX_PUMP_FRAMES * 2],
                left: vec![0.0; MAX_PUMP_FRAMES],
                right: vec![0.0; MAX_PUMP_FRAMES],
            }
        }
    }

    impl Default for WebOutput {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioOutput for WebOutput {
        fn sample_rate(&self) -> u32 {
            SAMPLE_RATE
        }

        fn start(&mut self, graph: SharedGraph) -> Result<(), AudioError> {
            if unsafe { journey_audio_init(SAMPLE_RATE) } == 0 {
                return Err(AudioError::Stream("AudioContext unavailable".into()));
            }
            self.graph = Some(graph);
            Ok(())
        }

        fn pump(&mut self, delta: f64) {
            let Some(graph) = self.graph.as_ref() else {
                return;
            };
            let frames = self.clock.frames_for(delta, SAMPLE_RATE);
            if frames == 0 {
                return;
            }

            lock_graph(graph).render(&mut self.interleaved[..frames * 2], 2);
            for i in 0..frames {
                self.left[i] = self.interleaved[i * 2];
                self.right[i] = self.interleaved[i * 2 + 1];
            }
            unsafe { journey_audio_write(self.left.as_ptr(), self.right.as_ptr(), frames) }
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::WebOutput;

// =============================================================================
// Headless output
// =============================================================================

/// Output with no device behind it
///
/// Nothing is rendered unless a [`HeadlessTap`] asks for frames, which makes
/// it the mock sink for tests and the sink used when audio is switched off.
pub struct HeadlessOutput {
    sample_rate: u32,
    graph: Arc<Mutex<Option<SharedGraph>>>,
    fail: bool,
}

impl HeadlessOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            graph: Arc::new(Mutex::new(None)),
            fail: false,
        }
    }

    /// An output whose `start` always fails (blocked host)
    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::new(SAMPLE_RATE)
        }
    }

    /// Handle for rendering and inspecting the graph from outside the engine
    pub fn tap(&self) -> HeadlessTap {
        HeadlessTap {
            graph: Arc::clone(&self.graph),
        }
    }
}

impl AudioOutput for HeadlessOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn start(&mut self, graph: SharedGraph) -> Result<(), AudioError> {
        if self.fail {
            return Err(AudioError::NoOutputDevice);
        }
        *self.graph.lock().unwrap_or_else(|e| e.into_inner()) = Some(graph);
        Ok(())
    }
}

/// Render/inspect handle for a [`HeadlessOutput`]
#[derive(Clone)]
pub struct HeadlessTap {
    graph: Arc<Mutex<Option<SharedGraph>>>,
}

impl HeadlessTap {
    /// Graph attached by the engine, if it has started
    pub fn graph(&self) -> Option<SharedGraph> {
        self.graph.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Render `frames` stereo frames; empty if the engine never started
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let Some(graph) = self.graph() else {
            return Vec::new();
        };
        let mut out = vec![0.0; frames * 2];
        lock_graph(&graph).render(&mut out, 2);
        out
    }

    /// Render `secs` of audio
    pub fn render_secs(&self, secs: f64) -> Vec<f32> {
        let Some(graph) = self.graph() else {
            return Vec::new();
        };
        let rate = lock_graph(&graph).sample_rate();
        self.render((secs * rate as f64).round() as usize)
    }

    /// Voices started on the graph so far (0 if never started)
    pub fn voices_started(&self) -> u64 {
        self.graph().map_or(0, |g| lock_graph(&g).voices_started())
    }

    /// Bus and length of the most recently triggered voice
    pub fn last_trigger(&self) -> Option<(Bus, usize)> {
        self.graph().and_then(|g| lock_graph(&g).last_trigger())
    }
}
