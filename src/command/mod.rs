pub mod bus;
pub mod controllers;
pub mod sysex;
pub mod types;

pub use bus::{CommandBus, CommandReceiver, CommandSender};
pub use controllers::{
    channel_controller, controller_table, plugin_controller, ChannelControl, ControllerInfo,
    ControllerTarget, PluginControl,
};
pub use sysex::{SysexCommand, SysexReply};
pub use types::{EventSource, MidiEvent};
