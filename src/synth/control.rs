use log::{debug, error, info};

use super::{KitSynth, CHANNEL_COUNT, ENGINE_NAME, LOWEST_NOTE, MASTER_VOLUME_SCALE};
use crate::command::controllers::MASTER_CTRL_VOLUME;
use crate::command::{
    controller_table, ChannelControl, ControllerInfo, ControllerTarget, EventSource, MidiEvent,
    PluginControl, SysexCommand, SysexReply,
};
use crate::error::PluginError;
use crate::event::GuiMessage;
use crate::fx::param_map::CONTROL_MAX;

fn note_channel(pitch: u8) -> Option<usize> {
    let channel = pitch.checked_sub(LOWEST_NOTE)? as usize;
    (channel < CHANNEL_COUNT).then_some(channel)
}

impl KitSynth {
    /// Apply one event. Returns whether it changed anything.
    pub fn process_event(&mut self, event: MidiEvent, source: EventSource) -> bool {
        match event {
            MidiEvent::NoteOn { pitch, velocity, .. } => self.play_note(pitch, velocity),
            MidiEvent::NoteOff { pitch, .. } => self.release_note(pitch),
            MidiEvent::Controller { id, value, .. } => self.set_controller(id, value, source),
            MidiEvent::Sysex(data) => self.sysex(&data, source),
        }
    }

    /// Trigger the channel mapped to `pitch`. Velocity 0 is a note-off.
    pub fn play_note(&mut self, pitch: u8, velocity: u8) -> bool {
        if velocity == 0 {
            return self.release_note(pitch);
        }
        let Some(channel) = note_channel(pitch) else {
            debug!("note {} outside the kit", pitch);
            return false;
        };
        let ch = &mut self.channels[channel];
        if ch.sample().is_none() {
            return false;
        }
        ch.trigger(velocity);
        ch.is_playing()
    }

    pub fn release_note(&mut self, pitch: u8) -> bool {
        let Some(channel) = note_channel(pitch) else {
            return false;
        };
        let ch = &mut self.channels[channel];
        if ch.sustains_past_note_off() {
            return false;
        }
        ch.release();
        true
    }

    /// Set a controller. Host changes are mirrored to the GUI; unknown IDs
    /// are ignored.
    pub fn set_controller(&mut self, id: u32, value: i32, source: EventSource) -> bool {
        let Some(target) = ControllerTarget::decode(id) else {
            debug!("unknown controller {:#x} = {}", id, value);
            return false;
        };
        let ctrl = value.clamp(0, CONTROL_MAX as i32) as u8;
        let Some(applied) = self.apply_controller(target, ctrl) else {
            return false;
        };
        if source == EventSource::Host || target == ControllerTarget::LegacyVolume {
            let echo_id = match target {
                ControllerTarget::LegacyVolume => MASTER_CTRL_VOLUME,
                other => other.id(),
            };
            self.notifier.controller(echo_id, applied as i32);
        }
        true
    }

    /// Returns the control value now in effect, which differs from `ctrl`
    /// when a slot refuses to switch on.
    pub(crate) fn apply_controller(&mut self, target: ControllerTarget, ctrl: u8) -> Option<u8> {
        match target {
            ControllerTarget::MasterVolume | ControllerTarget::LegacyVolume => {
                self.master_ctrl = ctrl;
                self.master_volume = ctrl as f64 / MASTER_VOLUME_SCALE;
                Some(ctrl)
            }
            ControllerTarget::Channel { channel, control } => {
                let ch = self.channels.get_mut(channel)?;
                match control {
                    ChannelControl::Volume => ch.set_volume(ctrl),
                    ChannelControl::Pan => ch.set_pan(ctrl),
                    ChannelControl::NoteOffIgnore => ch.sustain_past_note_off = ctrl != 0,
                    ChannelControl::OnOff => ch.set_on(ctrl != 0),
                    ChannelControl::SendLevel(slot) => ch.set_send_level(slot, ctrl),
                }
                Some(ctrl)
            }
            ControllerTarget::Plugin { slot, control } => {
                let fx = self.slots.get_mut(slot)?;
                match control {
                    PluginControl::ReturnGain => {
                        fx.set_return_ctrl(ctrl);
                        Some(ctrl)
                    }
                    PluginControl::OnOff => {
                        fx.set_enabled(ctrl != 0);
                        Some(fx.is_on() as u8)
                    }
                }
            }
        }
    }

    /// Decode and run a live sysex command. Malformed input is ignored.
    pub fn sysex(&mut self, data: &[u8], source: EventSource) -> bool {
        let command = match SysexCommand::parse(data) {
            Ok(command) => command,
            Err(e) => {
                debug!("ignoring sysex: {}", e);
                return false;
            }
        };
        match command {
            SysexCommand::LoadSample { channel, filename } => {
                self.load_sample(channel as usize, &filename)
            }
            SysexCommand::ClearSample { channel } => self.clear_sample(channel as usize),
            SysexCommand::InitData(blob) => match self.deserialize(&blob) {
                Ok(()) => true,
                Err(e) => {
                    error!("init data: {}", e);
                    false
                }
            },
            SysexCommand::LoadSendEffect { slot, lib, label } => {
                self.load_send_effect(slot as usize, &lib, &label)
            }
            SysexCommand::ClearSendEffect { slot } => self.clear_send_effect(slot as usize),
            SysexCommand::SetPluginParameter {
                slot,
                parameter,
                value,
            } => self.set_plugin_parameter(
                slot as usize,
                parameter as usize,
                value,
                source == EventSource::Host,
            ),
            SysexCommand::GetInitData => match self.serialize() {
                Ok(blob) => {
                    self.notifier.reply(SysexReply::InitData(blob));
                    true
                }
                Err(e) => {
                    error!("cannot export state: {}", e);
                    false
                }
            },
        }
    }

    /// Replace the slot's plugin with `lib`/`label` from the registry.
    /// Failure leaves the slot empty and reports an error to the GUI.
    pub fn load_send_effect(&mut self, slot: usize, lib: &str, label: &str) -> bool {
        let Some(fx) = self.slots.get_mut(slot) else {
            debug!("send effect slot {} out of range", slot);
            return false;
        };
        if fx.clear() {
            self.notifier
                .reply(SysexReply::SendEffectCleared { slot: slot as u8 });
        }

        let result = match self.registry.create(lib, label) {
            Some(plugin) => fx.load(plugin, self.sample_rate),
            None => Err(PluginError::NotFound {
                lib: lib.to_string(),
                label: label.to_string(),
            }),
        };
        match result {
            Ok(()) => {
                let index = self.registry.index_of(lib, label).unwrap_or(0);
                info!("send effect {}: loaded {}/{}", slot, lib, label);
                self.notifier.reply(SysexReply::SendEffectLoaded {
                    slot: slot as u8,
                    plugin_index: index.min(u8::MAX as usize) as u8,
                });
                true
            }
            Err(e) => {
                error!("send effect {}: {}", slot, e);
                self.notifier
                    .reply(SysexReply::Error(format!("Error loading plugin \"{}\"", label)));
                false
            }
        }
    }

    pub fn clear_send_effect(&mut self, slot: usize) -> bool {
        let Some(fx) = self.slots.get_mut(slot) else {
            debug!("send effect slot {} out of range", slot);
            return false;
        };
        if !fx.clear() {
            return false;
        }
        self.notifier
            .reply(SysexReply::SendEffectCleared { slot: slot as u8 });
        true
    }

    /// Set a plugin parameter from its 0..=127 control value
    pub fn set_plugin_parameter(&mut self, slot: usize, parameter: usize, ctrl: u8, echo: bool) -> bool {
        let Some(plugin) = self.slots.get_mut(slot).and_then(|fx| fx.plugin_mut()) else {
            debug!("no plugin in send effect slot {}", slot);
            return false;
        };
        if parameter >= plugin.parameter_count() {
            debug!("slot {} has no parameter {}", slot, parameter);
            return false;
        }
        let value = plugin.convert_gui_control_value(parameter, ctrl);
        plugin.set_param(parameter, value);
        if echo {
            self.notifier.reply(SysexReply::PluginParameter {
                slot: slot as u8,
                parameter: parameter as u8,
                value: ctrl,
            });
        }
        true
    }

    /// Install finished loads, then apply queued GUI events and echo them
    /// to the host. Call once per block before `process`.
    pub fn process_messages(&mut self) {
        self.apply_load_outcomes();
        let rx = self.gui_bus.receiver();
        while let Some((event, source)) = rx.try_recv() {
            let echo = (source == EventSource::Gui && event.is_gui_forwardable())
                .then(|| event.clone());
            self.process_event(event, source);
            if let Some(event) = echo {
                self.notifier.host(event);
            }
        }
    }

    pub fn controllers(&self) -> Vec<ControllerInfo> {
        controller_table()
    }

    pub fn patch_name(&self) -> &'static str {
        ENGINE_NAME
    }

    /// No patch metadata beyond the name
    pub fn patch_info(&self) -> Option<String> {
        None
    }

    pub fn show_gui(&mut self, visible: bool) {
        self.gui_visible = visible;
        self.notifier.gui(GuiMessage::Visibility(visible));
    }

    pub fn gui_visible(&self) -> bool {
        self.gui_visible
    }
}

#[cfg(test)]
mod tests {
    use crate::command::controllers::{CTRL_VOLUME, MASTER_CTRL_VOLUME};
    use crate::command::{
        channel_controller, plugin_controller, ChannelControl, EventSource, MidiEvent,
        PluginControl, SysexCommand, SysexReply,
    };
    use crate::event::{GuiMessage, Notification};
    use crate::fx::testing::MOCK_LIB;
    use crate::synth::testing::engine;
    use crate::synth::{Sample, HIGHEST_NOTE, LOWEST_NOTE};

    fn reply(r: SysexReply) -> Notification {
        Notification::Gui(GuiMessage::Sysex(r))
    }

    fn load_fx(lib: &str, label: &str, slot: u8) -> Vec<u8> {
        SysexCommand::LoadSendEffect {
            slot,
            lib: lib.into(),
            label: label.into(),
        }
        .encode()
    }

    #[test]
    fn notes_map_onto_channels_and_need_a_sample() {
        let (mut synth, _rx) = engine();
        synth.install_for_test(15, Sample::from_interleaved(vec![0.5; 4], 1, "hat.wav"));
        assert!(!synth.play_note(LOWEST_NOTE, 100));
        assert!(!synth.play_note(LOWEST_NOTE - 1, 100));
        assert!(!synth.play_note(HIGHEST_NOTE + 1, 100));
        assert!(synth.play_note(HIGHEST_NOTE, 127));

        let ch = synth.channel(15).unwrap();
        assert!(ch.is_playing());
        assert_eq!(ch.gain_factor(), 1.0);
    }

    #[test]
    fn velocity_scales_with_volume_at_trigger_time() {
        let (mut synth, _rx) = engine();
        synth.install_for_test(0, Sample::from_interleaved(vec![0.5; 4], 1, "k.wav"));
        synth.set_controller(channel_controller(0, ChannelControl::Volume), 50, EventSource::Host);
        synth.play_note(LOWEST_NOTE, 127);
        assert!((synth.channel(0).unwrap().gain_factor() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn note_off_stops_unless_channel_sustains() {
        let (mut synth, _rx) = engine();
        synth.install_for_test(0, Sample::from_interleaved(vec![0.5; 4], 1, "k.wav"));
        synth.play_note(LOWEST_NOTE, 100);
        assert!(synth.process_event(
            MidiEvent::NoteOn {
                channel: 0,
                pitch: LOWEST_NOTE,
                velocity: 0
            },
            EventSource::Host
        ));
        assert!(!synth.channel(0).unwrap().is_playing());
        assert_eq!(synth.channel(0).unwrap().gain_factor(), 0.0);

        synth.set_controller(
            channel_controller(0, ChannelControl::NoteOffIgnore),
            1,
            EventSource::Host,
        );
        synth.play_note(LOWEST_NOTE, 100);
        assert!(!synth.release_note(LOWEST_NOTE));
        assert!(synth.channel(0).unwrap().is_playing());
    }

    #[test]
    fn host_controllers_are_mirrored_to_the_gui() {
        let (mut synth, rx) = engine();
        let pan = channel_controller(2, ChannelControl::Pan);
        assert!(synth.set_controller(pan, 0, EventSource::Host));
        assert_eq!(synth.channel(2).unwrap().balance(), (1.0, 0.0));
        assert!(synth.set_controller(CTRL_VOLUME, 200, EventSource::Host));
        assert_eq!(synth.master_ctrl(), 127);
        assert_eq!(
            rx.drain(),
            vec![
                Notification::Gui(GuiMessage::Controller { id: pan, value: 0 }),
                Notification::Gui(GuiMessage::Controller {
                    id: MASTER_CTRL_VOLUME,
                    value: 127
                }),
            ]
        );
    }

    #[test]
    fn unknown_controllers_are_ignored() {
        let (mut synth, rx) = engine();
        assert!(!synth.set_controller(0x10, 64, EventSource::Host));
        assert!(!synth.set_controller(0x60000, 64, EventSource::Host));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn send_levels_use_the_full_control_range() {
        let (mut synth, _rx) = engine();
        synth.set_controller(
            channel_controller(5, ChannelControl::SendLevel(3)),
            127,
            EventSource::Host,
        );
        assert_eq!(synth.channel(5).unwrap().send_level(3), 1.0);
        assert_eq!(synth.channel(5).unwrap().send_level(0), 0.0);
    }

    #[test]
    fn gui_events_are_applied_then_echoed_to_the_host() {
        let (mut synth, rx) = engine();
        let vol = channel_controller(1, ChannelControl::Volume);
        let event = MidiEvent::Controller {
            channel: 0,
            id: vol,
            value: 80,
        };
        assert!(synth.gui_sender().send(event.clone(), EventSource::Gui));
        synth.process_messages();
        assert_eq!(synth.channel(1).unwrap().volume_ctrl(), 80);
        assert_eq!(rx.drain(), vec![Notification::Host(event)]);
    }

    #[test]
    fn plugin_switch_needs_a_plugin() {
        let (mut synth, rx) = engine();
        let switch = plugin_controller(0, PluginControl::OnOff);
        synth.set_controller(switch, 1, EventSource::Host);
        assert!(!synth.slot(0).unwrap().is_on());
        assert_eq!(
            rx.drain(),
            vec![Notification::Gui(GuiMessage::Controller { id: switch, value: 0 })]
        );
    }

    #[test]
    fn loading_over_a_plugin_clears_it_first() {
        let (mut synth, rx) = engine();
        assert!(synth.sysex(&load_fx(MOCK_LIB, "mono", 1), EventSource::Host));
        assert!(synth.sysex(&load_fx(MOCK_LIB, "stereo", 1), EventSource::Host));
        let slot = synth.slot(1).unwrap();
        assert!(slot.is_on());
        assert_eq!(slot.inputs(), 2);
        assert_eq!(
            rx.drain(),
            vec![
                reply(SysexReply::SendEffectLoaded { slot: 1, plugin_index: 0 }),
                reply(SysexReply::SendEffectCleared { slot: 1 }),
                reply(SysexReply::SendEffectLoaded { slot: 1, plugin_index: 1 }),
            ]
        );
    }

    #[test]
    fn failed_plugin_load_reports_error_and_leaves_slot_off() {
        let (mut synth, rx) = engine();
        assert!(!synth.sysex(&load_fx(MOCK_LIB, "broken", 0), EventSource::Host));
        assert!(!synth.sysex(&load_fx("nowhere", "ghost", 0), EventSource::Host));
        let slot = synth.slot(0).unwrap();
        assert!(!slot.has_plugin());
        assert!(!slot.is_on());
        assert_eq!(
            rx.drain(),
            vec![
                reply(SysexReply::Error("Error loading plugin \"broken\"".into())),
                reply(SysexReply::Error("Error loading plugin \"ghost\"".into())),
            ]
        );
    }

    #[test]
    fn plugin_parameters_take_control_values() {
        let (mut synth, rx) = engine();
        synth.load_send_effect(2, MOCK_LIB, "stereo");
        rx.drain();
        let cmd = SysexCommand::SetPluginParameter {
            slot: 2,
            parameter: 1,
            value: 90,
        };
        assert!(synth.sysex(&cmd.encode(), EventSource::Host));
        let plugin = synth.slot(2).unwrap().plugin().unwrap();
        assert!((plugin.param(1) - 90.0).abs() < 1e-3);
        assert_eq!(
            rx.drain(),
            vec![reply(SysexReply::PluginParameter {
                slot: 2,
                parameter: 1,
                value: 90
            })]
        );

        // out of range parameter and GUI-originated changes stay quiet
        assert!(!synth.set_plugin_parameter(2, 3, 10, true));
        assert!(synth.set_plugin_parameter(2, 0, 10, false));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn clear_send_effect_only_reports_real_work() {
        let (mut synth, rx) = engine();
        assert!(!synth.clear_send_effect(3));
        assert!(!synth.clear_send_effect(9));
        synth.load_send_effect(3, MOCK_LIB, "mono");
        rx.drain();
        assert!(synth.sysex(&SysexCommand::ClearSendEffect { slot: 3 }.encode(), EventSource::Gui));
        assert!(!synth.slot(3).unwrap().has_plugin());
        assert_eq!(rx.drain(), vec![reply(SysexReply::SendEffectCleared { slot: 3 })]);
    }

    #[test]
    fn malformed_sysex_is_ignored() {
        let (mut synth, rx) = engine();
        assert!(!synth.sysex(&[], EventSource::Host));
        assert!(!synth.sysex(&[42, 1, 2], EventSource::Host));
        assert!(!synth.sysex(&[4], EventSource::Host));
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn get_init_data_answers_with_the_state_blob() {
        let (mut synth, rx) = engine();
        assert!(synth.sysex(&SysexCommand::GetInitData.encode(), EventSource::Gui));
        let expected = synth.serialize().unwrap();
        assert_eq!(&expected[..2], &[6, 1]);
        assert_eq!(rx.drain(), vec![reply(SysexReply::InitData(expected))]);
    }

    #[test]
    fn host_introspection() {
        let (mut synth, rx) = engine();
        assert_eq!(synth.controllers().len(), 137);
        assert_eq!(synth.patch_name(), "KitSynth");
        assert!(synth.patch_info().is_none());
        synth.show_gui(true);
        assert!(synth.gui_visible());
        assert_eq!(rx.drain(), vec![Notification::Gui(GuiMessage::Visibility(true))]);
    }
}
