//! Audio engine
//!
//! Owns the mixing graph, the synthesized effect library and the single
//! background-track slot. Every call degrades to a silent no-op while the
//! graph is unavailable, so the journey never waits on sound.

use std::sync::Arc;

use super::background::{self, PcmBuffer};
use super::effects::{EffectLibrary, SoundEffect};
use super::graph::{lock_graph, BackgroundHandle, Bus, GraphLevels, MixGraph, SharedGraph};
use super::output::AudioOutput;
use crate::error::AudioError;
use crate::haptics::{Haptics, NullHaptics, VibrationPattern};

#[cfg(not(target_arch = "wasm32"))]
use super::background::PendingLoad;

/// Default fade-out for the background track
pub const DEFAULT_FADE_OUT_SECS: f64 = 1.0;

/// Graph lifecycle
enum EngineState {
    /// Waiting for the first user gesture
    Uninitialized,
    Ready { graph: SharedGraph, effects: EffectLibrary },
    /// Host refused audio output; stays this way for the session
    Failed,
}

/// The journey's sound and haptics engine
pub struct AudioEngine {
    output: Box<dyn AudioOutput>,
    haptics: Box<dyn Haptics>,
    levels: GraphLevels,
    fade_out_secs: f64,
    state: EngineState,
    sfx_enabled: bool,
    ambient_enabled: bool,
    /// Decoded background track at the graph rate
    background: Option<Arc<PcmBuffer>>,
    #[cfg(not(target_arch = "wasm32"))]
    pending_background: Option<PendingLoad>,
}

impl AudioEngine {
    /// Create an engine for `output` (nothing is opened until [`AudioEngine::init`])
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            haptics: Box::new(NullHaptics),
            levels: GraphLevels::default(),
            fade_out_secs: DEFAULT_FADE_OUT_SECS,
            state: EngineState::Uninitialized,
            sfx_enabled: true,
            ambient_enabled: true,
            background: None,
            #[cfg(not(target_arch = "wasm32"))]
            pending_background: None,
        }
    }

    pub fn with_levels(mut self, levels: GraphLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_haptics(mut self, haptics: Box<dyn Haptics>) -> Self {
        self.haptics = haptics;
        self
    }

    pub fn with_fade_out(mut self, secs: f64) -> Self {
        self.fade_out_secs = secs.max(0.0);
        self
    }

    /// Build the graph and start output
    ///
    /// Must be triggered from a user gesture on hosts with autoplay policies.
    /// Idempotent: later calls return the first outcome without retrying.
    pub fn init(&mut self) -> bool {
        match self.state {
            EngineState::Ready { .. } => return true,
            EngineState::Failed => return false,
            EngineState::Uninitialized => {}
        }

        let sample_rate = self.output.sample_rate();
        let mut graph = MixGraph::new(sample_rate, self.levels);
        if !self.ambient_enabled {
            graph.set_bus_gain(Bus::Ambient, 0.0);
        }
        let graph = graph.shared();

        if let Err(e) = self.output.start(Arc::clone(&graph)) {
            log::warn!("Audio initialization failed: {}", e);
            self.state = EngineState::Failed;
            return false;
        }

        let effects = EffectLibrary::generate(sample_rate);
        log::info!(
            "Audio ready at {} Hz ({} effects synthesized)",
            sample_rate,
            effects.len()
        );
        self.state = EngineState::Ready { graph, effects };
        true
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, EngineState::Ready { .. })
    }

    /// Graph sample rate once initialized
    pub fn sample_rate(&self) -> Option<u32> {
        self.graph().map(|g| lock_graph(g).sample_rate())
    }

    fn graph(&self) -> Option<&SharedGraph> {
        match &self.state {
            EngineState::Ready { graph, .. } => Some(graph),
            _ => None,
        }
    }

    /// Playback clock in seconds (0 before init)
    pub fn current_time(&self) -> f64 {
        self.graph().map_or(0.0, |g| lock_graph(g).current_time())
    }

    /// Fire a one-shot effect through the effects bus
    ///
    /// Overlapping calls each get their own voice.
    pub fn play_effect(&self, effect: SoundEffect) {
        if !self.sfx_enabled {
            return;
        }
        if let EngineState::Ready { graph, effects } = &self.state {
            lock_graph(graph).trigger(Bus::Effects, Arc::clone(effects.get(effect)));
        }
    }

    /// Fire an effect by its script name; unknown names are ignored
    pub fn play_effect_named(&self, name: &str) {
        match SoundEffect::from_name(name) {
            Some(effect) => self.play_effect(effect),
            None => log::debug!("Ignoring unknown effect {:?}", name),
        }
    }

    /// Fire a one-shot through the ambient bus (follows the ambient toggle)
    pub fn play_ambient(&self, effect: SoundEffect) {
        if let EngineState::Ready { graph, effects } = &self.state {
            lock_graph(graph).trigger(Bus::Ambient, Arc::clone(effects.get(effect)));
        }
    }

    /// Start fetching and decoding the background track on a worker thread
    ///
    /// Needs an initialized graph (the decode targets its sample rate).
    /// Poll with [`AudioEngine::update`] or [`AudioEngine::poll_background`].
    #[cfg(not(target_arch = "wasm32"))]
    pub fn preload_background(&mut self, url: &str) {
        let Some(rate) = self.sample_rate() else {
            log::debug!("Audio not initialized, not preloading {}", url);
            return;
        };
        log::info!("Preloading background track {}", url);
        self.pending_background = Some(PendingLoad::spawn(url.to_string(), rate));
    }

    /// Decode an already-fetched background track
    pub fn load_background_bytes(&mut self, bytes: Vec<u8>, hint: Option<&str>) -> bool {
        let result = background::decode(bytes, hint).and_then(|pcm| self.install_background(pcm));
        match result {
            Ok(()) => true,
            Err(AudioError::NotInitialized) => {
                log::debug!("Audio not initialized, dropping background track");
                false
            }
            Err(e) => {
                log::warn!("Failed to decode background track: {}", e);
                false
            }
        }
    }

    /// Install a decoded track (resampled to the graph rate)
    ///
    /// Ignored until the graph exists.
    pub fn set_background(&mut self, pcm: PcmBuffer) {
        if let Err(e) = self.install_background(pcm) {
            log::debug!("Background track not installed: {}", e);
        }
    }

    fn install_background(&mut self, pcm: PcmBuffer) -> Result<(), AudioError> {
        let rate = self.sample_rate().ok_or(AudioError::NotInitialized)?;
        let pcm = pcm.resampled(rate);
        log::info!("Background track ready ({:.1}s)", pcm.duration());
        self.background = Some(Arc::new(pcm));
        Ok(())
    }

    /// Collect a finished background load, if any
    pub fn poll_background(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            let Some(pending) = self.pending_background.as_mut() else {
                return;
            };
            let Some(result) = pending.poll() else {
                return;
            };
            let url = pending.url().to_string();
            self.pending_background = None;

            match result {
                Ok(pcm) => self.set_background(pcm),
                Err(e) => log::warn!("Failed to preload background track {}: {}", url, e),
            }
        }
    }

    pub fn is_background_ready(&self) -> bool {
        self.background.is_some()
    }

    pub fn is_background_loading(&self) -> bool {
        #[cfg(not(target_arch = "wasm32"))]
        {
            self.pending_background.is_some()
        }
        #[cfg(target_arch = "wasm32")]
        {
            false
        }
    }

    /// Start the background track, stopping any current playback first
    pub fn play_background(&mut self) -> Option<BackgroundHandle> {
        let buffer = self.background.as_ref()?;
        let graph = self.graph()?;
        Some(lock_graph(graph).start_background(Arc::clone(buffer)))
    }

    /// Stop the background track, optionally fading the music bus out first
    pub fn stop_background(&mut self, fade_out: bool) {
        let Some(graph) = self.graph() else {
            return;
        };
        let fade = fade_out.then_some(self.fade_out_secs);
        lock_graph(graph).stop_background(fade);
    }

    /// Handle of the background playback, if one is running
    pub fn active_background(&self) -> Option<BackgroundHandle> {
        self.graph().and_then(|g| lock_graph(g).active_background())
    }

    pub fn toggle_sfx(&mut self) -> bool {
        self.sfx_enabled = !self.sfx_enabled;
        self.sfx_enabled
    }

    /// Flip the ambient bus between its default level and silence
    pub fn toggle_ambient(&mut self) -> bool {
        self.ambient_enabled = !self.ambient_enabled;
        if let Some(graph) = self.graph() {
            let gain = if self.ambient_enabled {
                self.levels.ambient
            } else {
                0.0
            };
            lock_graph(graph).set_bus_gain(Bus::Ambient, gain);
        }
        self.ambient_enabled
    }

    pub fn is_sfx_enabled(&self) -> bool {
        self.sfx_enabled
    }

    pub fn is_ambient_enabled(&self) -> bool {
        self.ambient_enabled
    }

    /// Current gain of a bus (None before init)
    pub fn bus_gain(&self, bus: Bus) -> Option<f32> {
        self.graph().map(|g| lock_graph(g).bus_gain(bus))
    }

    /// Forward a vibration pattern to the host's haptics
    pub fn vibrate(&mut self, pattern: impl Into<VibrationPattern>) {
        self.haptics.vibrate(&pattern.into());
    }

    /// Per-frame housekeeping: finish background loads, feed push-model outputs
    pub fn update(&mut self, delta: f64) {
        self.poll_background();
        if self.is_initialized() {
            self.output.pump(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::background::tests::wav_bytes;
    use crate::audio::output::{HeadlessOutput, HeadlessTap};
    use std::cell::RefCell;
    use std::rc::Rc;

    const RATE: u32 = 8000;

    fn engine() -> (AudioEngine, HeadlessTap) {
        let output = HeadlessOutput::new(RATE);
        let tap = output.tap();
        (AudioEngine::new(Box::new(output)), tap)
    }

    fn ready_engine() -> (AudioEngine, HeadlessTap) {
        let (mut engine, tap) = engine();
        assert!(engine.init());
        (engine, tap)
    }

    fn with_track(engine: &mut AudioEngine, secs: f64) {
        let frames = (RATE as f64 * secs) as usize;
        engine.set_background(PcmBuffer::new(RATE, 1, vec![0.25; frames]));
    }

    #[derive(Clone, Default)]
    struct RecordingHaptics {
        log: Rc<RefCell<Vec<VibrationPattern>>>,
    }

    impl Haptics for RecordingHaptics {
        fn is_supported(&mut self) -> bool {
            true
        }

        fn vibrate(&mut self, pattern: &VibrationPattern) {
            self.log.borrow_mut().push(pattern.clone());
        }
    }

    #[test]
    fn test_uninitialized_engine_is_silent() {
        let (mut engine, tap) = engine();
        assert!(!engine.is_initialized());
        engine.play_effect(SoundEffect::Chime);
        engine.play_effect_named("beep");
        engine.stop_background(true);
        assert_eq!(engine.play_background(), None);
        assert_eq!(engine.current_time(), 0.0);
        assert_eq!(engine.bus_gain(Bus::Music), None);
        assert_eq!(tap.voices_started(), 0);
    }

    #[test]
    fn test_init_is_idempotent() {
        let (mut engine, tap) = engine();
        assert!(engine.init());
        let graph = tap.graph().unwrap();
        assert!(engine.init());
        assert!(Arc::ptr_eq(&graph, &tap.graph().unwrap()));
        assert_eq!(engine.sample_rate(), Some(RATE));
    }

    #[test]
    fn test_init_failure_is_permanent() {
        let mut engine = AudioEngine::new(Box::new(HeadlessOutput::unavailable()));
        assert!(!engine.init());
        assert!(!engine.init());
        assert!(!engine.is_initialized());
        engine.play_effect(SoundEffect::Beep);
        assert!(!engine.load_background_bytes(wav_bytes(RATE, 1, &[0; 100]), Some("wav")));
    }

    #[test]
    fn test_default_levels_after_init() {
        let (engine, _tap) = ready_engine();
        assert_eq!(engine.bus_gain(Bus::Effects), Some(1.0));
        assert_eq!(engine.bus_gain(Bus::Ambient), Some(0.3));
        assert_eq!(engine.bus_gain(Bus::Music), Some(0.5));
    }

    #[test]
    fn test_play_effect_triggers_voice() {
        let (engine, tap) = ready_engine();
        engine.play_effect(SoundEffect::Stamp);
        engine.play_effect(SoundEffect::Stamp);
        engine.play_effect_named("door");
        assert_eq!(tap.voices_started(), 3);

        let out = tap.render_secs(0.05);
        assert!(out.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn test_unknown_effect_name_is_ignored() {
        let (engine, tap) = ready_engine();
        engine.play_effect_named("kaboom");
        engine.play_effect_named("");
        assert_eq!(tap.voices_started(), 0);
    }

    #[test]
    fn test_toggle_sfx_gates_effects() {
        let (mut engine, tap) = ready_engine();
        assert!(!engine.toggle_sfx());
        engine.play_effect(SoundEffect::Beep);
        engine.play_effect_named("chime");
        assert_eq!(tap.voices_started(), 0);

        assert!(engine.toggle_sfx());
        engine.play_effect(SoundEffect::Beep);
        assert_eq!(tap.voices_started(), 1);
    }

    #[test]
    fn test_toggle_ambient_sets_bus_gain() {
        let (mut engine, _tap) = ready_engine();
        assert!(!engine.toggle_ambient());
        assert_eq!(engine.bus_gain(Bus::Ambient), Some(0.0));
        assert!(engine.toggle_ambient());
        assert_eq!(engine.bus_gain(Bus::Ambient), Some(0.3));
    }

    #[test]
    fn test_ambient_toggle_before_init_is_applied() {
        let (mut engine, _tap) = engine();
        assert!(!engine.toggle_ambient());
        assert!(engine.init());
        assert_eq!(engine.bus_gain(Bus::Ambient), Some(0.0));
    }

    #[test]
    fn test_play_background_without_track_is_noop() {
        let (mut engine, _tap) = ready_engine();
        assert!(!engine.is_background_ready());
        assert_eq!(engine.play_background(), None);
        assert_eq!(engine.active_background(), None);
    }

    #[test]
    fn test_play_background_twice_keeps_one_handle() {
        let (mut engine, _tap) = ready_engine();
        with_track(&mut engine, 2.0);
        let first = engine.play_background().unwrap();
        let second = engine.play_background().unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.active_background(), Some(second));
    }

    #[test]
    fn test_stop_background_with_fade() {
        let (mut engine, tap) = ready_engine();
        with_track(&mut engine, 5.0);
        engine.play_background();
        engine.stop_background(true);

        tap.render_secs(0.5);
        assert!(engine.active_background().is_some());
        let gain = engine.bus_gain(Bus::Music).unwrap();
        assert!(gain < 0.3 && gain > 0.2, "gain {}", gain);

        tap.render_secs(0.6);
        assert_eq!(engine.active_background(), None);
        assert_eq!(engine.bus_gain(Bus::Music), Some(0.5));
    }

    #[test]
    fn test_stop_background_immediately() {
        let (mut engine, _tap) = ready_engine();
        with_track(&mut engine, 5.0);
        engine.play_background();
        engine.stop_background(false);
        assert_eq!(engine.active_background(), None);
        // Nothing playing: another stop is a no-op
        engine.stop_background(true);
        assert_eq!(engine.bus_gain(Bus::Music), Some(0.5));
    }

    #[test]
    fn test_effects_do_not_wait_on_background() {
        let (mut engine, tap) = ready_engine();
        with_track(&mut engine, 5.0);
        engine.play_background();
        engine.stop_background(true);
        engine.play_effect(SoundEffect::Click);
        assert_eq!(tap.voices_started(), 1);
    }

    #[test]
    fn test_load_background_bytes() {
        let (mut engine, _tap) = ready_engine();
        assert!(engine.load_background_bytes(wav_bytes(4000, 1, &[1000; 400]), Some("wav")));
        assert!(engine.is_background_ready());
        assert!(engine.play_background().is_some());
    }

    #[test]
    fn test_ambient_voice_follows_toggle() {
        let (mut engine, tap) = ready_engine();
        let chime = SoundEffect::Chime.synthesize(RATE);

        engine.play_ambient(SoundEffect::Chime);
        assert_eq!(tap.last_trigger(), Some((Bus::Ambient, chime.len())));
        let out = tap.render(400);
        for (i, expected) in chime.iter().take(400).enumerate() {
            // ambient 0.3 * master 0.8
            assert!((out[i * 2] - expected * 0.3 * 0.8).abs() < 1e-6, "frame {}", i);
        }
        assert!(out.iter().any(|s| s.abs() > 0.01));

        assert!(!engine.toggle_ambient());
        engine.play_ambient(SoundEffect::Chime);
        let out = tap.render(400);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_ambient_ignores_sfx_toggle() {
        let (mut engine, tap) = ready_engine();
        engine.toggle_sfx();
        engine.play_ambient(SoundEffect::Dial);
        assert_eq!(tap.voices_started(), 1);
    }

    #[test]
    fn test_install_background_requires_graph() {
        let (mut engine, _tap) = engine();
        let pcm = PcmBuffer::new(RATE, 1, vec![0.1; 100]);
        assert!(matches!(
            engine.install_background(pcm.clone()),
            Err(AudioError::NotInitialized)
        ));
        engine.set_background(pcm);
        assert!(!engine.is_background_ready());
        assert!(!engine.load_background_bytes(wav_bytes(RATE, 1, &[0; 100]), Some("wav")));
    }

    #[test]
    fn test_load_background_garbage_degrades() {
        let (mut engine, _tap) = ready_engine();
        assert!(!engine.load_background_bytes(b"nope".to_vec(), None));
        assert!(!engine.is_background_ready());
        assert_eq!(engine.play_background(), None);
    }

    #[test]
    fn test_preload_background_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("flight.wav");
        std::fs::write(&path, wav_bytes(RATE, 1, &[4000; 800])).unwrap();

        let (mut engine, _tap) = ready_engine();
        engine.preload_background(&path.to_string_lossy());
        assert!(engine.is_background_loading());

        for _ in 0..500 {
            engine.update(0.0);
            if !engine.is_background_loading() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(engine.is_background_ready());
    }

    #[test]
    fn test_preload_failure_leaves_background_unset() {
        let (mut engine, _tap) = ready_engine();
        engine.preload_background("/nonexistent/flight.mp3");
        for _ in 0..500 {
            engine.update(0.0);
            if !engine.is_background_loading() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(!engine.is_background_loading());
        assert!(!engine.is_background_ready());
    }

    #[test]
    fn test_preload_before_init_is_noop() {
        let (mut engine, _tap) = engine();
        engine.preload_background("/tmp/whatever.mp3");
        assert!(!engine.is_background_loading());
    }

    #[test]
    fn test_vibrate_forwards_patterns() {
        let haptics = RecordingHaptics::default();
        let log = Rc::clone(&haptics.log);
        let (engine, _tap) = engine();
        let mut engine = engine.with_haptics(Box::new(haptics));

        engine.vibrate(VibrationPattern::default());
        engine.vibrate([100u32, 50, 100]);
        engine.vibrate(200u32);

        assert_eq!(
            *log.borrow(),
            vec![
                VibrationPattern::Pulse(50),
                VibrationPattern::Sequence(vec![100, 50, 100]),
                VibrationPattern::Pulse(200),
            ]
        );
    }
}
