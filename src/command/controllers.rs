//! Controller-ID space. Master, channel and plugin controllers occupy
//! consecutive ranges starting at the 14-bit NRPN offset.

use serde::Serialize;

use crate::synth::{CHANNEL_COUNT, SEND_EFFECT_COUNT};

pub const NRPN14_OFFSET: u32 = 0x50000;
/// Legacy absolute volume controller (MIDI CC 7)
pub const CTRL_VOLUME: u32 = 0x07;

pub const MASTER_CONTROLLERS: u32 = 1;
pub const CONTROLLERS_PER_CHANNEL: u32 = 8;
pub const CONTROLLERS_PER_PLUGIN: u32 = 2;

pub const FIRST_MASTER_CONTROLLER: u32 = NRPN14_OFFSET;
pub const LAST_MASTER_CONTROLLER: u32 = FIRST_MASTER_CONTROLLER + MASTER_CONTROLLERS - 1;
pub const MASTER_CTRL_VOLUME: u32 = FIRST_MASTER_CONTROLLER;

pub const FIRST_CHANNEL_CONTROLLER: u32 = LAST_MASTER_CONTROLLER + 1;
pub const LAST_CHANNEL_CONTROLLER: u32 =
    FIRST_CHANNEL_CONTROLLER + CONTROLLERS_PER_CHANNEL * CHANNEL_COUNT as u32 - 1;

pub const FIRST_PLUGIN_CONTROLLER: u32 = LAST_CHANNEL_CONTROLLER + 1;
pub const LAST_PLUGIN_CONTROLLER: u32 =
    FIRST_PLUGIN_CONTROLLER + CONTROLLERS_PER_PLUGIN * SEND_EFFECT_COUNT as u32 - 1;

pub const CONTROLLER_COUNT: usize = MASTER_CONTROLLERS as usize
    + CONTROLLERS_PER_CHANNEL as usize * CHANNEL_COUNT
    + CONTROLLERS_PER_PLUGIN as usize * SEND_EFFECT_COUNT;

/// Per-channel controller, in sub-id order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelControl {
    Volume,
    Pan,
    NoteOffIgnore,
    OnOff,
    SendLevel(usize),
}

impl ChannelControl {
    pub fn from_sub_id(sub: u32) -> Option<Self> {
        match sub {
            0 => Some(ChannelControl::Volume),
            1 => Some(ChannelControl::Pan),
            2 => Some(ChannelControl::NoteOffIgnore),
            3 => Some(ChannelControl::OnOff),
            4..=7 => Some(ChannelControl::SendLevel((sub - 4) as usize)),
            _ => None,
        }
    }

    pub fn sub_id(self) -> u32 {
        match self {
            ChannelControl::Volume => 0,
            ChannelControl::Pan => 1,
            ChannelControl::NoteOffIgnore => 2,
            ChannelControl::OnOff => 3,
            ChannelControl::SendLevel(fx) => 4 + fx as u32,
        }
    }

    fn describe(self, channel: usize) -> (String, u8) {
        let n = channel + 1;
        match self {
            ChannelControl::Volume => (format!("Channel {} volume", n), 127),
            ChannelControl::Pan => (format!("Channel {} pan", n), 127),
            ChannelControl::NoteOffIgnore => (format!("Channel {} noteoff ignore", n), 1),
            ChannelControl::OnOff => (format!("Channel {} on/off", n), 1),
            ChannelControl::SendLevel(fx) => (format!("Channel {} fx send {}", n, fx + 1), 127),
        }
    }
}

/// Per-send-effect controller, in sub-id order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginControl {
    ReturnGain,
    OnOff,
}

impl PluginControl {
    pub fn from_sub_id(sub: u32) -> Option<Self> {
        match sub {
            0 => Some(PluginControl::ReturnGain),
            1 => Some(PluginControl::OnOff),
            _ => None,
        }
    }

    pub fn sub_id(self) -> u32 {
        match self {
            PluginControl::ReturnGain => 0,
            PluginControl::OnOff => 1,
        }
    }
}

/// What a controller ID addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerTarget {
    MasterVolume,
    LegacyVolume,
    Channel {
        channel: usize,
        control: ChannelControl,
    },
    Plugin {
        slot: usize,
        control: PluginControl,
    },
}

impl ControllerTarget {
    /// Resolve a raw controller ID; `None` for IDs outside every range
    pub fn decode(id: u32) -> Option<Self> {
        match id {
            FIRST_CHANNEL_CONTROLLER..=LAST_CHANNEL_CONTROLLER => {
                let offset = id - FIRST_CHANNEL_CONTROLLER;
                let channel = (offset / CONTROLLERS_PER_CHANNEL) as usize;
                let control = ChannelControl::from_sub_id(offset % CONTROLLERS_PER_CHANNEL)?;
                Some(ControllerTarget::Channel { channel, control })
            }
            FIRST_MASTER_CONTROLLER..=LAST_MASTER_CONTROLLER => Some(ControllerTarget::MasterVolume),
            CTRL_VOLUME => Some(ControllerTarget::LegacyVolume),
            FIRST_PLUGIN_CONTROLLER..=LAST_PLUGIN_CONTROLLER => {
                let offset = id - FIRST_PLUGIN_CONTROLLER;
                let slot = (offset / CONTROLLERS_PER_PLUGIN) as usize;
                let control = PluginControl::from_sub_id(offset % CONTROLLERS_PER_PLUGIN)?;
                Some(ControllerTarget::Plugin { slot, control })
            }
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            ControllerTarget::MasterVolume => MASTER_CTRL_VOLUME,
            ControllerTarget::LegacyVolume => CTRL_VOLUME,
            ControllerTarget::Channel { channel, control } => channel_controller(channel, control),
            ControllerTarget::Plugin { slot, control } => plugin_controller(slot, control),
        }
    }
}

pub fn channel_controller(channel: usize, control: ChannelControl) -> u32 {
    FIRST_CHANNEL_CONTROLLER + channel as u32 * CONTROLLERS_PER_CHANNEL + control.sub_id()
}

pub fn plugin_controller(slot: usize, control: PluginControl) -> u32 {
    FIRST_PLUGIN_CONTROLLER + slot as u32 * CONTROLLERS_PER_PLUGIN + control.sub_id()
}

/// Host-facing description of one controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerInfo {
    pub index: usize,
    pub name: String,
    pub id: u32,
    pub min: u8,
    pub max: u8,
}

/// Every controller the engine exposes, master first
pub fn controller_table() -> Vec<ControllerInfo> {
    let mut table = Vec::with_capacity(CONTROLLER_COUNT);
    let mut push = |name: String, id: u32, max: u8| {
        let index = table.len();
        table.push(ControllerInfo {
            index,
            name,
            id,
            min: 0,
            max,
        });
    };

    push("Master volume".to_string(), MASTER_CTRL_VOLUME, 127);

    for channel in 0..CHANNEL_COUNT {
        for sub in 0..CONTROLLERS_PER_CHANNEL {
            if let Some(control) = ChannelControl::from_sub_id(sub) {
                let (name, max) = control.describe(channel);
                push(name, channel_controller(channel, control), max);
            }
        }
    }

    for slot in 0..SEND_EFFECT_COUNT {
        push(
            format!("Sendfx {} ret gain", slot),
            plugin_controller(slot, PluginControl::ReturnGain),
            127,
        );
        push(
            format!("Sendfx {} on/off", slot),
            plugin_controller(slot, PluginControl::OnOff),
            1,
        );
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous() {
        assert_eq!(FIRST_CHANNEL_CONTROLLER, 0x50001);
        assert_eq!(LAST_CHANNEL_CONTROLLER, 0x50080);
        assert_eq!(FIRST_PLUGIN_CONTROLLER, 0x50081);
        assert_eq!(LAST_PLUGIN_CONTROLLER, 0x50088);
    }

    #[test]
    fn decode_splits_offset_into_index_and_sub_id() {
        assert_eq!(
            ControllerTarget::decode(FIRST_CHANNEL_CONTROLLER + 8 * 3 + 1),
            Some(ControllerTarget::Channel {
                channel: 3,
                control: ChannelControl::Pan
            })
        );
        assert_eq!(
            ControllerTarget::decode(FIRST_CHANNEL_CONTROLLER + 8 * 15 + 7),
            Some(ControllerTarget::Channel {
                channel: 15,
                control: ChannelControl::SendLevel(3)
            })
        );
        assert_eq!(
            ControllerTarget::decode(FIRST_PLUGIN_CONTROLLER + 5),
            Some(ControllerTarget::Plugin {
                slot: 2,
                control: PluginControl::OnOff
            })
        );
        assert_eq!(ControllerTarget::decode(NRPN14_OFFSET), Some(ControllerTarget::MasterVolume));
        assert_eq!(ControllerTarget::decode(CTRL_VOLUME), Some(ControllerTarget::LegacyVolume));
        assert_eq!(ControllerTarget::decode(LAST_PLUGIN_CONTROLLER + 1), None);
        assert_eq!(ControllerTarget::decode(10), None);
    }

    #[test]
    fn table_ids_decode_back() {
        let table = controller_table();
        assert_eq!(table.len(), CONTROLLER_COUNT);
        assert_eq!(table.len(), 137);
        assert_eq!(table[0].name, "Master volume");
        assert_eq!(table[3].name, "Channel 1 noteoff ignore");
        assert_eq!(table[3].max, 1);
        assert_eq!(table[136].name, "Sendfx 3 on/off");
        for (i, info) in table.iter().enumerate() {
            assert_eq!(info.index, i);
            let target = ControllerTarget::decode(info.id).unwrap();
            assert_eq!(target.id(), info.id);
        }
    }
}
