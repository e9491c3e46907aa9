pub mod delay;
pub mod distortion;
pub mod filter;
pub mod param_map;
pub mod reverb;
pub mod slot;

pub use delay::DelayPlugin;
pub use distortion::DistortionPlugin;
pub use filter::FilterPlugin;
pub use param_map::{ParamHint, ParamRange};
pub use reverb::ReverbPlugin;
pub use slot::{SendEffectSlot, SlotState};

use crate::error::PluginError;

/// Buffers handed to a plugin for one block. Only connected ports are `Some`.
pub struct PortIo<'a> {
    pub inputs: [Option<&'a [f32]>; 2],
    pub outputs: [Option<&'a mut [f32]>; 2],
}

impl<'a> PortIo<'a> {
    /// Input sample, or silence for an unconnected port
    pub fn input(&self, port: usize, frame: usize) -> f32 {
        self.inputs[port].map_or(0.0, |buf| buf[frame])
    }

    pub fn write(&mut self, port: usize, frame: usize, value: f32) {
        if let Some(buf) = self.outputs[port].as_deref_mut() {
            buf[frame] = value;
        }
    }
}

/// Runtime interface of a send-effect plugin
pub trait EffectPlugin: Send {
    fn lib(&self) -> &str;
    fn label(&self) -> &str;
    fn input_ports(&self) -> usize;
    fn output_ports(&self) -> usize;
    fn parameter_count(&self) -> usize;

    fn instantiate(&mut self, sample_rate: u32) -> Result<(), PluginError>;

    fn start(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn stop(&mut self) {}

    fn process(&mut self, io: PortIo<'_>, len: usize);

    fn param(&self, index: usize) -> f32;
    fn set_param(&mut self, index: usize, value: f32);
    fn param_range(&self, index: usize) -> ParamRange;

    fn param_name(&self, _index: usize) -> &str {
        ""
    }

    /// Control value (0..=127) to the parameter's native value
    fn convert_gui_control_value(&self, index: usize, ctrl: u8) -> f32 {
        self.param_range(index).from_control(ctrl)
    }

    /// Current native value of a parameter as a control value (0..=127)
    fn gui_control_value(&self, index: usize) -> u8 {
        self.param_range(index).to_control(self.param(index))
    }
}

/// Source of plugin instances, looked up by (lib, label)
pub trait PluginRegistry: Send {
    fn create(&self, lib: &str, label: &str) -> Option<Box<dyn EffectPlugin>>;

    /// Every (lib, label) pair, in index order
    fn plugins(&self) -> Vec<(String, String)>;

    fn index_of(&self, lib: &str, label: &str) -> Option<usize> {
        self.plugins()
            .iter()
            .position(|(l, n)| l == lib && n == label)
    }
}

pub const BUILTIN_LIB: &str = "kitsynth";

type Constructor = fn() -> Box<dyn EffectPlugin>;

fn new_delay() -> Box<dyn EffectPlugin> {
    Box::new(DelayPlugin::new())
}

fn new_reverb() -> Box<dyn EffectPlugin> {
    Box::new(ReverbPlugin::new())
}

fn new_filter() -> Box<dyn EffectPlugin> {
    Box::new(FilterPlugin::new())
}

fn new_distortion() -> Box<dyn EffectPlugin> {
    Box::new(DistortionPlugin::new())
}

const BUILTINS: [(&str, Constructor); 4] = [
    (delay::LABEL, new_delay),
    (reverb::LABEL, new_reverb),
    (filter::LABEL, new_filter),
    (distortion::LABEL, new_distortion),
];

/// Effects compiled into the engine
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinPlugins;

impl PluginRegistry for BuiltinPlugins {
    fn create(&self, lib: &str, label: &str) -> Option<Box<dyn EffectPlugin>> {
        if lib != BUILTIN_LIB {
            return None;
        }
        BUILTINS
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, ctor)| ctor())
    }

    fn plugins(&self) -> Vec<(String, String)> {
        BUILTINS
            .iter()
            .map(|(name, _)| (BUILTIN_LIB.to_string(), name.to_string()))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    pub const MOCK_LIB: &str = "mock";

    /// Copies each connected input to the matching output, or writes the
    /// first input to every output when there is only one input port.
    pub struct MockPlugin {
        label: String,
        inputs: usize,
        outputs: usize,
        params: Vec<f32>,
        pub fail_instantiate: bool,
        pub fail_start: bool,
        stops: Arc<AtomicUsize>,
    }

    impl MockPlugin {
        pub fn new(label: &str, inputs: usize, outputs: usize, params: usize) -> Self {
            Self {
                label: label.to_string(),
                inputs,
                outputs,
                params: vec![0.0; params],
                fail_instantiate: false,
                fail_start: false,
                stops: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn stop_counter(&self) -> Arc<AtomicUsize> {
            self.stops.clone()
        }
    }

    impl EffectPlugin for MockPlugin {
        fn lib(&self) -> &str {
            MOCK_LIB
        }

        fn label(&self) -> &str {
            &self.label
        }

        fn input_ports(&self) -> usize {
            self.inputs
        }

        fn output_ports(&self) -> usize {
            self.outputs
        }

        fn parameter_count(&self) -> usize {
            self.params.len()
        }

        fn instantiate(&mut self, _sample_rate: u32) -> Result<(), PluginError> {
            if self.fail_instantiate {
                return Err(PluginError::Instantiate(self.label.clone()));
            }
            Ok(())
        }

        fn start(&mut self) -> Result<(), PluginError> {
            if self.fail_start {
                return Err(PluginError::Start(self.label.clone()));
            }
            Ok(())
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn process(&mut self, mut io: PortIo<'_>, len: usize) {
            let stereo_in = io.inputs[1].is_some();
            for frame in 0..len {
                let first = io.input(0, frame);
                let second = if stereo_in { io.input(1, frame) } else { first };
                io.write(0, frame, first);
                io.write(1, frame, second);
            }
        }

        fn param(&self, index: usize) -> f32 {
            self.params.get(index).copied().unwrap_or(0.0)
        }

        fn set_param(&mut self, index: usize, value: f32) {
            if let Some(p) = self.params.get_mut(index) {
                *p = value;
            }
        }

        fn param_range(&self, _index: usize) -> ParamRange {
            ParamRange::linear(0.0, 127.0, 0.0)
        }
    }

    /// Registry of mock plugins: "mono" (1/1), "stereo" (2/2), "wide" (3/3),
    /// "broken" (fails to start)
    #[derive(Default)]
    pub struct MockRegistry;

    impl PluginRegistry for MockRegistry {
        fn create(&self, lib: &str, label: &str) -> Option<Box<dyn EffectPlugin>> {
            if lib != MOCK_LIB {
                return None;
            }
            let plugin = match label {
                "mono" => MockPlugin::new(label, 1, 1, 2),
                "stereo" => MockPlugin::new(label, 2, 2, 3),
                "wide" => MockPlugin::new(label, 3, 3, 0),
                "broken" => {
                    let mut p = MockPlugin::new(label, 2, 2, 0);
                    p.fail_start = true;
                    p
                }
                _ => return None,
            };
            Some(Box::new(plugin))
        }

        fn plugins(&self) -> Vec<(String, String)> {
            ["mono", "stereo", "wide", "broken"]
                .iter()
                .map(|label| (MOCK_LIB.to_string(), label.to_string()))
                .collect()
        }
    }
}
