//! KitSynth: a sixteen-channel drum sampler engine with four send-effect
//! slots, a controller/sysex control plane and a binary state format.

pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod fx;
pub mod project;
pub mod samples;
pub mod state;
pub mod synth;

pub use config::EngineConfig;
pub use synth::KitSynth;
