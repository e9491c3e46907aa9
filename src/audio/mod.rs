mod engine;

pub use engine::{default_output, AudioEngine};
