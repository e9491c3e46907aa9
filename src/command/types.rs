use serde::{Deserialize, Serialize};

/// Where an event came from. Host events are mirrored to the GUI,
/// GUI events are echoed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Host,
    Gui,
}

/// Incoming event from the sequencer host or the GUI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEvent {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    Controller { channel: u8, id: u32, value: i32 },
    Sysex(Vec<u8>),
}

impl MidiEvent {
    /// Human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            MidiEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => format!("Note on {} velocity {} (midi channel {})", pitch, velocity, channel),
            MidiEvent::NoteOff { channel, pitch } => {
                format!("Note off {} (midi channel {})", pitch, channel)
            }
            MidiEvent::Controller { channel, id, value } => {
                format!("Controller {:#x} = {} (midi channel {})", id, value, channel)
            }
            MidiEvent::Sysex(data) => match data.first() {
                Some(cmd) => format!("Sysex command {} ({} bytes)", cmd, data.len()),
                None => "Empty sysex".to_string(),
            },
        }
    }

    /// Controller and sysex events are the ones the GUI may originate
    pub fn is_gui_forwardable(&self) -> bool {
        matches!(self, MidiEvent::Controller { .. } | MidiEvent::Sysex(_))
    }
}
