//! Audio module
//!
//! Procedural sound effects, a software mixing graph and one streamed
//! background track:
//! - Effects are synthesized once at init, no audio assets are shipped
//! - Three category buses (effects, ambient, music) feed a shared limiter
//! - Output goes through cpal (native), Web Audio (WASM) or a headless tap

pub mod background;
pub mod effects;
pub mod engine;
pub mod graph;
pub mod output;

pub use background::PcmBuffer;
pub use effects::{EffectLibrary, SoundEffect};
pub use engine::AudioEngine;
pub use graph::{lock_graph, BackgroundHandle, Bus, GraphLevels, MixGraph, SharedGraph};
pub use output::{AudioOutput, HeadlessOutput, HeadlessTap, SAMPLE_RATE};

#[cfg(not(target_arch = "wasm32"))]
pub use output::CpalOutput;

#[cfg(target_arch = "wasm32")]
pub use output::WebOutput;
