use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::warn;

use super::types::{EventSource, MidiEvent};

/// Queue of events waiting to be applied before the next render block
pub struct CommandBus {
    tx: Sender<(MidiEvent, EventSource)>,
    rx: Receiver<(MidiEvent, EventSource)>,
}

impl CommandBus {
    pub fn new() -> Self {
        let (tx, rx) = bounded(256);
        Self { tx, rx }
    }

    /// Get a sender that can be cloned and shared
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// Get a receiver (typically for the audio thread)
    pub fn receiver(&self) -> CommandReceiver {
        CommandReceiver {
            rx: self.rx.clone(),
        }
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable sender for queueing events
#[derive(Clone)]
pub struct CommandSender {
    tx: Sender<(MidiEvent, EventSource)>,
}

impl CommandSender {
    /// Queue an event (non-blocking, drops if buffer full)
    pub fn send(&self, event: MidiEvent, source: EventSource) -> bool {
        match self.tx.try_send((event, source)) {
            Ok(()) => true,
            Err(TrySendError::Full((event, _))) => {
                warn!("Command buffer full, dropping {}", event.description());
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Receiver for consuming queued events
#[derive(Clone)]
pub struct CommandReceiver {
    rx: Receiver<(MidiEvent, EventSource)>,
}

impl CommandReceiver {
    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Option<(MidiEvent, EventSource)> {
        self.rx.try_recv().ok()
    }
}
