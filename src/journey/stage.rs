//! The twelve scripted stages

/// Number of stages in the journey
pub const TOTAL_STAGES: usize = 12;

/// One scripted scene, in journey order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Welcome,
    CheckIn,
    Route,
    Luggage,
    Carousel,
    Security,
    Passport,
    Boarding,
    DutyFree,
    Lounge,
    Flight,
    Arrival,
}

impl Stage {
    pub const ALL: [Stage; TOTAL_STAGES] = [
        Stage::Welcome,
        Stage::CheckIn,
        Stage::Route,
        Stage::Luggage,
        Stage::Carousel,
        Stage::Security,
        Stage::Passport,
        Stage::Boarding,
        Stage::DutyFree,
        Stage::Lounge,
        Stage::Flight,
        Stage::Arrival,
    ];

    /// Stage at `index`, if in range
    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Following stage (`None` at the end of the journey)
    pub fn next(self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_last(self) -> bool {
        self.index() == TOTAL_STAGES - 1
    }

    /// Header label shown while the stage is active
    pub fn name(self) -> &'static str {
        match self {
            Stage::Welcome => "Bienvenida",
            Stage::CheckIn => "Check-in",
            Stage::Route => "Ruta",
            Stage::Luggage => "Equipaje",
            Stage::Carousel => "Cinta",
            Stage::Security => "Seguridad",
            Stage::Passport => "Pasaporte",
            Stage::Boarding => "Embarque",
            Stage::DutyFree => "Duty Free",
            Stage::Lounge => "Lounge",
            Stage::Flight => "Vuelo",
            Stage::Arrival => "Llegada",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Progress through the journey, `(stage + 1) / TOTAL_STAGES * 100`
pub fn progress_percent(stage: usize) -> f64 {
    (stage + 1) as f64 / TOTAL_STAGES as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_round_trip() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
            assert_eq!(Stage::from_index(i), Some(*stage));
        }
        assert_eq!(Stage::from_index(TOTAL_STAGES), None);
    }

    #[test]
    fn test_next_stops_at_arrival() {
        assert_eq!(Stage::Welcome.next(), Some(Stage::CheckIn));
        assert_eq!(Stage::Lounge.next(), Some(Stage::Flight));
        assert_eq!(Stage::Arrival.next(), None);
        assert!(Stage::Arrival.is_last());
        assert!(!Stage::Flight.is_last());
    }

    #[test]
    fn test_names() {
        assert_eq!(Stage::Welcome.name(), "Bienvenida");
        assert_eq!(Stage::DutyFree.to_string(), "Duty Free");
        assert_eq!(Stage::Arrival.name(), "Llegada");
    }

    #[test]
    fn test_progress_percent() {
        assert!((progress_percent(0) - 100.0 / 12.0).abs() < 1e-9);
        assert!((progress_percent(5) - 50.0).abs() < 1e-9);
        assert_eq!(progress_percent(TOTAL_STAGES - 1), 100.0);
    }
}
