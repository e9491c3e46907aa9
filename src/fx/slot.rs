use log::{debug, warn};

use super::{EffectPlugin, PortIo};
use crate::error::PluginError;

pub const RETURN_GAIN_SCALE: f64 = 75.0;
pub const DEFAULT_RETURN_CTRL: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Off,
    On,
}

/// One send-effect slot. Channels tap into the line-out buffers during a
/// block; the plugin writes the return buffers which are then mixed back.
pub struct SendEffectSlot {
    plugin: Option<Box<dyn EffectPlugin>>,
    inputs: usize,
    outputs: usize,
    connected_inputs: usize,
    connected_outputs: usize,
    return_ctrl: u8,
    return_gain: f64,
    state: SlotState,
    parameter_count: usize,
    line_out: [Vec<f32>; 2],
    ret: [Vec<f32>; 2],
}

/// Ports wired for a declared count: none, both for exactly two, else the first
fn connected_ports(declared: usize) -> usize {
    match declared {
        0 => 0,
        2 => 2,
        _ => 1,
    }
}

impl SendEffectSlot {
    pub fn new(max_block: usize) -> Self {
        Self {
            plugin: None,
            inputs: 0,
            outputs: 0,
            connected_inputs: 0,
            connected_outputs: 0,
            return_ctrl: DEFAULT_RETURN_CTRL,
            return_gain: 1.0,
            state: SlotState::Off,
            parameter_count: 0,
            line_out: [vec![0.0; max_block], vec![0.0; max_block]],
            ret: [vec![0.0; max_block], vec![0.0; max_block]],
        }
    }

    pub fn plugin(&self) -> Option<&dyn EffectPlugin> {
        self.plugin.as_deref()
    }

    pub fn plugin_mut(&mut self) -> Option<&mut (dyn EffectPlugin + 'static)> {
        self.plugin.as_deref_mut()
    }

    pub fn has_plugin(&self) -> bool {
        self.plugin.is_some()
    }

    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn is_on(&self) -> bool {
        self.state == SlotState::On
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn return_ctrl(&self) -> u8 {
        self.return_ctrl
    }

    pub fn return_gain(&self) -> f64 {
        self.return_gain
    }

    pub fn set_return_ctrl(&mut self, ctrl: u8) {
        self.return_ctrl = ctrl;
        self.return_gain = ctrl as f64 / RETURN_GAIN_SCALE;
    }

    /// Switch on or off. Only a slot holding a started plugin can be On.
    pub fn set_enabled(&mut self, on: bool) {
        self.state = if on && self.plugin.is_some() {
            SlotState::On
        } else {
            SlotState::Off
        };
    }

    /// Instantiate, connect and start `plugin`, replacing whatever was loaded.
    /// On failure the slot is left empty and Off.
    pub fn load(&mut self, mut plugin: Box<dyn EffectPlugin>, sample_rate: u32) -> Result<(), PluginError> {
        self.clear();

        let inputs = plugin.input_ports();
        let outputs = plugin.output_ports();
        if inputs > 2 {
            warn!("plugin {} has {} inputs, only the first is connected", plugin.label(), inputs);
        }
        if outputs > 2 {
            warn!("plugin {} has {} outputs, only the first is connected", plugin.label(), outputs);
        }

        plugin.instantiate(sample_rate)?;
        plugin.start()?;

        debug!(
            "started {}/{} ({} in, {} out, {} params)",
            plugin.lib(),
            plugin.label(),
            inputs,
            outputs,
            plugin.parameter_count()
        );
        self.inputs = inputs;
        self.outputs = outputs;
        self.connected_inputs = connected_ports(inputs);
        self.connected_outputs = connected_ports(outputs);
        self.parameter_count = plugin.parameter_count();
        self.plugin = Some(plugin);
        self.state = SlotState::On;
        Ok(())
    }

    /// Stop and drop the plugin. Returns whether one was loaded.
    pub fn clear(&mut self) -> bool {
        self.state = SlotState::Off;
        self.parameter_count = 0;
        self.inputs = 0;
        self.outputs = 0;
        self.connected_inputs = 0;
        self.connected_outputs = 0;
        match self.plugin.take() {
            Some(mut plugin) => {
                plugin.stop();
                debug!("stopped {}/{}", plugin.lib(), plugin.label());
                true
            }
            None => false,
        }
    }

    /// Zero the first `len` frames of both line-out buffers
    pub fn clear_line_out(&mut self, len: usize) {
        for buf in &mut self.line_out {
            buf[..len].fill(0.0);
        }
    }

    /// Add one frame of channel signal, already scaled by the send level
    pub fn tap(&mut self, frame: usize, left: f32, right: f32) {
        match self.inputs {
            2 => {
                self.line_out[0][frame] += left;
                self.line_out[1][frame] += right;
            }
            1 => self.line_out[0][frame] += (left + right) / 2.0,
            _ => {}
        }
    }

    /// Run the plugin over `len` frames of line-out into the return buffers
    pub fn run(&mut self, len: usize) {
        let Some(plugin) = self.plugin.as_mut() else {
            return;
        };
        let [line_l, line_r] = &self.line_out;
        let [ret_l, ret_r] = &mut self.ret;
        let mut io = PortIo {
            inputs: [None, None],
            outputs: [None, None],
        };
        if self.connected_inputs >= 1 {
            io.inputs[0] = Some(&line_l[..len]);
        }
        if self.connected_inputs == 2 {
            io.inputs[1] = Some(&line_r[..len]);
        }
        if self.connected_outputs >= 1 {
            io.outputs[0] = Some(&mut ret_l[..len]);
        }
        if self.connected_outputs == 2 {
            io.outputs[1] = Some(&mut ret_r[..len]);
        }
        plugin.process(io, len);
    }

    /// Mix the scaled return of one frame into a stereo pair
    pub fn mix_return(&self, frame: usize) -> (f64, f64) {
        match self.outputs {
            1 => {
                let v = self.return_gain * self.ret[0][frame] as f64 / 2.0;
                (v, v)
            }
            2 => (
                self.return_gain * self.ret[0][frame] as f64,
                self.return_gain * self.ret[1][frame] as f64,
            ),
            _ => (0.0, 0.0),
        }
    }
}

impl Drop for SendEffectSlot {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::fx::testing::MockPlugin;

    #[test]
    fn port_connection_counts() {
        assert_eq!(connected_ports(0), 0);
        assert_eq!(connected_ports(1), 1);
        assert_eq!(connected_ports(2), 2);
        assert_eq!(connected_ports(3), 1);
    }

    #[test]
    fn failed_start_leaves_slot_empty_and_off() {
        let mut slot = SendEffectSlot::new(16);
        let mut plugin = MockPlugin::new("broken", 2, 2, 1);
        plugin.fail_start = true;
        assert!(slot.load(Box::new(plugin), 44100).is_err());
        assert!(!slot.has_plugin());
        assert_eq!(slot.state(), SlotState::Off);
        slot.set_enabled(true);
        assert_eq!(slot.state(), SlotState::Off);
    }

    #[test]
    fn replacing_and_dropping_stop_the_plugin() {
        let first = MockPlugin::new("a", 1, 1, 0);
        let first_stops = first.stop_counter();
        let second = MockPlugin::new("b", 2, 2, 0);
        let second_stops = second.stop_counter();

        let mut slot = SendEffectSlot::new(16);
        slot.load(Box::new(first), 44100).unwrap();
        slot.load(Box::new(second), 44100).unwrap();
        assert_eq!(first_stops.load(Ordering::SeqCst), 1);
        assert!(slot.is_on());

        drop(slot);
        assert_eq!(second_stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn mono_input_receives_channel_average() {
        let mut slot = SendEffectSlot::new(4);
        slot.load(Box::new(MockPlugin::new("m", 1, 1, 0)), 44100).unwrap();
        slot.clear_line_out(4);
        slot.tap(0, 0.5, 0.25);
        slot.run(4);
        let (l, r) = slot.mix_return(0);
        let expected = 0.375 * slot.return_gain() / 2.0;
        assert!((l - expected).abs() < 1e-6);
        assert_eq!(l, r);
    }

    #[test]
    fn return_gain_uses_its_own_scale() {
        let mut slot = SendEffectSlot::new(4);
        assert_eq!(slot.return_ctrl(), 100);
        assert_eq!(slot.return_gain(), 1.0);
        slot.set_return_ctrl(75);
        assert_eq!(slot.return_gain(), 1.0);
    }
}
