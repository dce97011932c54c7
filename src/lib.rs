//! Pipino Air: an interactive airport journey
//!
//! Twelve scripted stages walked by a debounced, persisted controller, with
//! sound effects synthesized at runtime instead of shipped as assets:
//! - `journey`: stage list, controller, flight timeline
//! - `audio`: effect synthesis, mixing graph, background track, output
//! - `haptics`: vibration patterns for gamepads and browsers
//! - `storage`: per-device persistence of the current stage

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod audio;
pub mod config;
pub mod error;
pub mod haptics;
pub mod journey;
pub mod storage;

pub use audio::{AudioEngine, SoundEffect};
pub use config::JourneyConfig;
pub use haptics::VibrationPattern;
pub use journey::{Stage, StageController, TOTAL_STAGES};
pub use storage::StageStore;
