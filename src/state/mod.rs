//! Binary state blob: the whole kit (channel controls, sample names, master
//! volume and send effects with their parameters) as one sysex payload.
//!
//! Layout after the `[INIT_DATA, version]` header, per channel:
//! `volume, pan, noteoff_ignore, on, send1..send4, sample`, where `sample`
//! is `0` or a length-prefixed filename. Then `master, 1` and, per slot,
//! `0` or `label, lib, param_count, return_ctrl, params..`.

pub mod record;
pub mod wire;

use log::{debug, warn};

use crate::command::sysex::opcode;
use crate::command::{
    channel_controller, ChannelControl, ControllerTarget, PluginControl, SysexReply,
};
use crate::error::ProtocolError;
use crate::synth::{KitSynth, CHANNEL_COUNT, SEND_EFFECT_COUNT};
pub use record::{ChannelRecord, SlotRecord, StateSummary};
use record::{check_sanity, read_header};
use wire::{ByteReader, ByteWriter};

pub const INIT_DATA_VERSION: u8 = 1;
/// Separates the channel section from the send-effect section
pub const SANITY_BYTE: u8 = 1;

const CHANNEL_RECORD: usize = 4 + SEND_EFFECT_COUNT + 1;

impl KitSynth {
    /// Export the current state. Fails only on strings longer than 254 bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, ProtocolError> {
        let capacity = 2 + CHANNEL_COUNT * CHANNEL_RECORD + 2 + SEND_EFFECT_COUNT;
        let mut w = ByteWriter::with_capacity(capacity);
        w.u8(opcode::INIT_DATA).u8(INIT_DATA_VERSION);

        for ch in &self.channels {
            w.u8(ch.volume_ctrl())
                .u8(ch.pan())
                .u8(ch.sustains_past_note_off() as u8)
                .u8(ch.is_on() as u8);
            for slot in 0..SEND_EFFECT_COUNT {
                w.u8(ch.send_ctrl(slot));
            }
            match ch.sample() {
                Some(sample) => {
                    w.sized_cstr(sample.filename())?;
                }
                None => {
                    w.u8(0);
                }
            }
        }

        w.u8(self.master_ctrl).u8(SANITY_BYTE);

        for fx in &self.slots {
            let Some(plugin) = fx.plugin() else {
                w.u8(0);
                continue;
            };
            w.sized_cstr(plugin.label())?.sized_cstr(plugin.lib())?;
            let count = plugin.parameter_count().min(u8::MAX as usize);
            w.u8(count as u8).u8(fx.return_ctrl());
            for index in 0..count {
                w.u8(plugin.gui_control_value(index));
            }
        }

        Ok(w.finish())
    }

    /// Apply a blob produced by `serialize`. Every change is reported to
    /// the GUI. On error, records read before the fault stay applied.
    pub fn deserialize(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let mut r = ByteReader::new(data);
        read_header(&mut r)?;

        for channel in 0..CHANNEL_COUNT {
            let record = ChannelRecord::read(&mut r)?;
            self.restore_channel(channel, record);
        }

        let master = r.u8()?;
        self.restore_controller(ControllerTarget::MasterVolume, master);
        check_sanity(&mut r)?;

        for slot in 0..SEND_EFFECT_COUNT {
            match SlotRecord::read(&mut r)? {
                Some(record) => self.restore_slot(slot, record),
                None => {
                    self.clear_send_effect(slot);
                }
            }
        }

        if !r.is_empty() {
            debug!("{} trailing bytes after init data", r.remaining());
        }
        Ok(())
    }

    fn restore_controller(&mut self, target: ControllerTarget, ctrl: u8) {
        if let Some(applied) = self.apply_controller(target, ctrl) {
            self.notifier.controller(target.id(), applied as i32);
        }
    }

    fn restore_channel(&mut self, channel: usize, record: ChannelRecord) {
        let target = |control| ControllerTarget::Channel { channel, control };

        self.restore_controller(target(ChannelControl::Volume), record.volume);
        self.restore_controller(target(ChannelControl::Pan), record.pan);
        self.restore_controller(
            target(ChannelControl::NoteOffIgnore),
            record.noteoff_ignore as u8,
        );

        // Restored as-is: the cursor is left alone
        self.channels[channel].channel_on = record.on;
        self.notifier.controller(
            channel_controller(channel, ChannelControl::OnOff),
            record.on as i32,
        );

        for (slot, &level) in record.sends.iter().enumerate() {
            self.restore_controller(target(ChannelControl::SendLevel(slot)), level);
        }

        match record.sample {
            Some(filename) => {
                self.load_sample(channel, &filename);
            }
            None => {
                self.discard_sample(channel);
                self.notifier.reply(SysexReply::SampleCleared {
                    channel: channel as u8,
                });
            }
        }
    }

    fn restore_slot(&mut self, slot: usize, record: SlotRecord) {
        let SlotRecord {
            label,
            lib,
            return_ctrl,
            params,
        } = record;
        if !self.load_send_effect(slot, &lib, &label) {
            warn!("send effect {}: skipping {} stored parameters", slot, params.len());
            return;
        }
        self.restore_controller(
            ControllerTarget::Plugin {
                slot,
                control: PluginControl::ReturnGain,
            },
            return_ctrl,
        );

        let Some(plugin) = self.slots[slot].plugin_mut() else {
            return;
        };
        let known = plugin.parameter_count();
        if known != params.len() {
            warn!(
                "send effect {}: {}/{} stores {} parameters, plugin has {}",
                slot,
                lib,
                label,
                params.len(),
                known
            );
        }
        for (index, &ctrl) in params.iter().take(known).enumerate() {
            let value = plugin.convert_gui_control_value(index, ctrl);
            plugin.set_param(index, value);
        }
        debug!("send effect {}: restored {}/{}", slot, lib, label);
    }
}
