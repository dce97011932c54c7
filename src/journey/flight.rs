//! Simulated flight
//!
//! The flight stage plays a fixed-length flight with the background track
//! underneath. The timeline only tracks phases and the hand-off back to the
//! controller; the caller reacts to the returned events (sound, advance).

/// Default flight length in seconds
pub const DEFAULT_FLIGHT_SECS: f64 = 60.0;

/// Wait between touchdown and moving on to the next stage
pub const LANDED_ADVANCE_DELAY: f64 = 2.0;

/// Wait between a skip and moving on to the next stage
pub const SKIPPED_ADVANCE_DELAY: f64 = 1.0;

/// Flight phase, derived from elapsed fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Boarding,
    Takeoff,
    Cruise,
    Landing,
    Arrived,
}

impl FlightPhase {
    /// Phase for a started flight at `progress` (0..=1)
    pub fn at(progress: f64) -> FlightPhase {
        if progress < 0.15 {
            FlightPhase::Takeoff
        } else if progress < 0.85 {
            FlightPhase::Cruise
        } else if progress < 1.0 {
            FlightPhase::Landing
        } else {
            FlightPhase::Arrived
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlightPhase::Boarding => "Embarcando",
            FlightPhase::Takeoff => "Despegando",
            FlightPhase::Cruise => "En crucero",
            FlightPhase::Landing => "Aterrizando",
            FlightPhase::Arrived => "Aterrizado",
        }
    }
}

/// What the caller should react to after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightEvent {
    /// Nothing changed that needs a reaction
    None,
    /// Flight reached the end on its own
    Landed,
    /// Flight was cut short by the user
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FlightTimeline {
    duration: f64,
    started_at: Option<f64>,
    phase: FlightPhase,
    progress: f64,
    advance_at: Option<f64>,
}

impl FlightTimeline {
    pub fn new(duration: f64) -> Self {
        Self {
            duration: duration.max(0.0),
            started_at: None,
            phase: FlightPhase::Boarding,
            progress: 0.0,
            advance_at: None,
        }
    }

    /// Take off. Returns false if the flight already started.
    pub fn start(&mut self, now: f64) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        self.phase = FlightPhase::Takeoff;
        self.progress = 0.0;
        true
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Advance the phase from the clock; reports `Landed` exactly once
    pub fn update(&mut self, now: f64) -> FlightEvent {
        let Some(started_at) = self.started_at else {
            return FlightEvent::None;
        };
        if self.phase == FlightPhase::Arrived {
            return FlightEvent::None;
        }

        self.progress = if self.duration > 0.0 {
            ((now - started_at) / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.phase = FlightPhase::at(self.progress);

        if self.phase == FlightPhase::Arrived {
            self.advance_at = Some(now + LANDED_ADVANCE_DELAY);
            FlightEvent::Landed
        } else {
            FlightEvent::None
        }
    }

    /// Jump straight to arrival (only while in the air)
    pub fn skip(&mut self, now: f64) -> FlightEvent {
        if self.started_at.is_none() || self.phase == FlightPhase::Arrived {
            return FlightEvent::None;
        }
        self.progress = 1.0;
        self.phase = FlightPhase::Arrived;
        self.advance_at = Some(now + SKIPPED_ADVANCE_DELAY);
        FlightEvent::Skipped
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    /// True once when the post-arrival wait has elapsed
    pub fn advance_due(&mut self, now: f64) -> bool {
        match self.advance_at {
            Some(at) if now >= at => {
                self.advance_at = None;
                true
            }
            _ => false,
        }
    }

    /// Back to boarding (leaving and re-entering the stage)
    pub fn reset(&mut self) {
        *self = Self::new(self.duration);
    }
}

impl Default for FlightTimeline {
    fn default() -> Self {
        Self::new(DEFAULT_FLIGHT_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boarding_until_started() {
        let mut flight = FlightTimeline::new(10.0);
        assert_eq!(flight.phase(), FlightPhase::Boarding);
        assert_eq!(flight.update(100.0), FlightEvent::None);
        assert_eq!(flight.phase(), FlightPhase::Boarding);
        assert_eq!(flight.skip(100.0), FlightEvent::None);
    }

    #[test]
    fn test_phases_follow_progress() {
        let mut flight = FlightTimeline::new(100.0);
        assert!(flight.start(0.0));
        assert!(!flight.start(5.0));
        assert_eq!(flight.phase(), FlightPhase::Takeoff);

        flight.update(10.0);
        assert_eq!(flight.phase(), FlightPhase::Takeoff);
        flight.update(15.0);
        assert_eq!(flight.phase(), FlightPhase::Cruise);
        flight.update(84.0);
        assert_eq!(flight.phase(), FlightPhase::Cruise);
        flight.update(85.0);
        assert_eq!(flight.phase(), FlightPhase::Landing);
        assert_eq!(flight.progress(), 0.85);
    }

    #[test]
    fn test_landed_reported_once() {
        let mut flight = FlightTimeline::new(10.0);
        flight.start(0.0);
        assert_eq!(flight.update(9.0), FlightEvent::None);
        assert_eq!(flight.update(10.0), FlightEvent::Landed);
        assert_eq!(flight.update(11.0), FlightEvent::None);
        assert_eq!(flight.phase(), FlightPhase::Arrived);
        assert_eq!(flight.progress(), 1.0);
    }

    #[test]
    fn test_advance_after_landing_delay() {
        let mut flight = FlightTimeline::new(10.0);
        flight.start(0.0);
        flight.update(10.5);
        assert!(!flight.advance_due(12.0));
        assert!(flight.advance_due(12.5));
        assert!(!flight.advance_due(20.0));
    }

    #[test]
    fn test_skip() {
        let mut flight = FlightTimeline::new(60.0);
        flight.start(0.0);
        flight.update(5.0);
        assert_eq!(flight.skip(5.0), FlightEvent::Skipped);
        assert_eq!(flight.phase(), FlightPhase::Arrived);
        assert_eq!(flight.progress(), 1.0);
        assert_eq!(flight.skip(5.5), FlightEvent::None);
        assert_eq!(flight.update(70.0), FlightEvent::None);

        assert!(!flight.advance_due(5.9));
        assert!(flight.advance_due(6.0));
    }

    #[test]
    fn test_zero_duration_lands_immediately() {
        let mut flight = FlightTimeline::new(0.0);
        flight.start(1.0);
        assert_eq!(flight.update(1.0), FlightEvent::Landed);
    }

    #[test]
    fn test_reset_returns_to_boarding() {
        let mut flight = FlightTimeline::new(10.0);
        flight.start(0.0);
        flight.skip(1.0);
        flight.reset();
        assert_eq!(flight.phase(), FlightPhase::Boarding);
        assert!(!flight.is_started());
        assert!(!flight.advance_due(100.0));
        assert!(flight.start(2.0));
    }
}
