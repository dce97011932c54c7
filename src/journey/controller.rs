//! Stage controller
//!
//! Single source of truth for which stage is showing. Transitions are
//! debounced: a request plays its cue immediately and commits after a fixed
//! delay, and any request arriving in between is dropped. Time is passed in
//! as seconds (`now`), the shell feeds it from the frame clock.

use super::flight::{FlightEvent, FlightTimeline};
use super::stage::{progress_percent, Stage, TOTAL_STAGES};
use crate::audio::{AudioEngine, SoundEffect};
use crate::storage::StageStore;

/// Default debounce window between a request and the committed stage change
pub const DEFAULT_TRANSITION_DELAY: f64 = 0.4;

/// Seconds between terminal announcement chimes on the ambient bus
pub const AMBIENT_CUE_INTERVAL: f64 = 8.0;

/// The single scheduled stage change
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingTransition {
    target: usize,
    due: f64,
}

pub struct StageController {
    audio: AudioEngine,
    store: StageStore,
    current: usize,
    pending: Option<PendingTransition>,
    transition_delay: f64,
    flight: FlightTimeline,
    /// Next announcement chime while on a terminal stage
    next_ambient_cue: Option<f64>,
}

impl StageController {
    /// Resume from the persisted stage (stage 0 if none or unreadable)
    pub fn new(audio: AudioEngine, store: StageStore, transition_delay: f64) -> Self {
        let current = store.load().unwrap_or(0);
        if current > 0 {
            log::info!("Resuming journey at stage {}", current);
        }
        Self {
            audio,
            store,
            current,
            pending: None,
            transition_delay: transition_delay.max(0.0),
            flight: FlightTimeline::default(),
            next_ambient_cue: None,
        }
    }

    pub fn with_flight_duration(mut self, secs: f64) -> Self {
        self.flight = FlightTimeline::new(secs);
        self
    }

    /// Move to the next stage after the transition delay
    ///
    /// Dropped while a transition is pending or on the last stage.
    pub fn advance(&mut self, now: f64) -> bool {
        if self.current >= TOTAL_STAGES - 1 {
            return false;
        }
        self.request(self.current + 1, SoundEffect::Chime, now)
    }

    /// Jump to `target` after the transition delay
    ///
    /// Dropped while a transition is pending or if `target` is out of range.
    pub fn go_to(&mut self, target: usize, now: f64) -> bool {
        if target >= TOTAL_STAGES {
            log::debug!("Ignoring jump to out-of-range stage {}", target);
            return false;
        }
        self.request(target, SoundEffect::Beep, now)
    }

    fn request(&mut self, target: usize, cue: SoundEffect, now: f64) -> bool {
        if let Some(pending) = self.pending {
            log::debug!(
                "Dropping transition to {} (already moving to {})",
                target,
                pending.target
            );
            return false;
        }

        self.audio.init();
        self.audio.play_effect(cue);
        self.pending = Some(PendingTransition {
            target,
            due: now + self.transition_delay,
        });
        true
    }

    /// Drive timers: commit a due transition and run the flight
    ///
    /// Returns the newly committed stage, if one was committed this call.
    pub fn update(&mut self, now: f64) -> Option<usize> {
        let committed = match self.pending {
            Some(pending) if now >= pending.due => {
                self.pending = None;
                self.commit(pending.target);
                Some(pending.target)
            }
            _ => None,
        };

        if self.stage() == Stage::Flight {
            if self.flight.update(now) == FlightEvent::Landed {
                self.audio.stop_background(true);
            }
            if self.flight.advance_due(now) {
                self.advance(now);
            }
        }

        self.update_ambient(now);

        committed
    }

    /// Terminal stages get a periodic announcement chime on the ambient bus
    fn update_ambient(&mut self, now: f64) {
        if !matches!(self.stage(), Stage::DutyFree | Stage::Lounge) || self.pending.is_some() {
            return;
        }
        let due = self.next_ambient_cue.map_or(true, |at| now >= at);
        if due {
            self.audio.play_ambient(SoundEffect::Chime);
            self.next_ambient_cue = Some(now + AMBIENT_CUE_INTERVAL);
        }
    }

    fn commit(&mut self, target: usize) {
        log::info!("stage {} -> {}", self.current, target);
        self.leave_stage();
        self.current = target;
        self.store.save(target);
    }

    /// Anything playing on the flight stage ends when it is left
    fn leave_stage(&mut self) {
        self.next_ambient_cue = None;
        if self.stage() == Stage::Flight {
            self.audio.stop_background(false);
            self.flight.reset();
        }
    }

    /// Back to stage 0 immediately, forgetting the persisted stage
    ///
    /// Cancels a pending transition. No cue is played.
    pub fn reset(&mut self) {
        self.pending = None;
        self.leave_stage();
        self.store.clear();
        self.current = 0;
        log::info!("Journey reset");
    }

    /// Take off (flight stage only)
    pub fn start_flight(&mut self, now: f64) -> bool {
        if self.stage() != Stage::Flight || self.pending.is_some() {
            return false;
        }
        if !self.flight.start(now) {
            return false;
        }
        self.audio.play_effect(SoundEffect::Chime);
        if self.audio.play_background().is_none() {
            log::debug!("Flight started without background track");
        }
        true
    }

    /// Cut the flight short; moves on shortly after
    pub fn skip_flight(&mut self, now: f64) -> bool {
        if self.stage() != Stage::Flight || self.flight.skip(now) != FlightEvent::Skipped {
            return false;
        }
        self.audio.stop_background(true);
        true
    }

    pub fn flight(&self) -> &FlightTimeline {
        &self.flight
    }

    pub fn init_audio(&mut self) -> bool {
        self.audio.init()
    }

    pub fn toggle_sfx(&mut self) -> bool {
        self.audio.toggle_sfx()
    }

    pub fn toggle_ambient(&mut self) -> bool {
        self.audio.toggle_ambient()
    }

    pub fn current_stage(&self) -> usize {
        self.current
    }

    pub fn stage(&self) -> Stage {
        Stage::from_index(self.current).unwrap_or_default()
    }

    pub fn progress_percent(&self) -> f64 {
        progress_percent(self.current)
    }

    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    /// Stage a pending transition will land on
    pub fn pending_target(&self) -> Option<usize> {
        self.pending.map(|p| p.target)
    }

    pub fn sfx_enabled(&self) -> bool {
        self.audio.is_sfx_enabled()
    }

    pub fn ambient_enabled(&self) -> bool {
        self.audio.is_ambient_enabled()
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine {
        &mut self.audio
    }

    pub fn store(&self) -> &StageStore {
        &self.store
    }
}
