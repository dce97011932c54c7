//! Journey
//!
//! The scripted sequence of airport stages and the controller that walks it.

pub mod controller;
pub mod flight;
pub mod stage;

pub use controller::{StageController, DEFAULT_TRANSITION_DELAY};
pub use flight::{FlightEvent, FlightPhase, FlightTimeline};
pub use stage::{progress_percent, Stage, TOTAL_STAGES};
