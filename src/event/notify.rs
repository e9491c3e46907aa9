use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::command::{MidiEvent, SysexReply};

/// Update for the GUI so its controls follow engine state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuiMessage {
    Controller { id: u32, value: i32 },
    Sysex(SysexReply),
    Visibility(bool),
}

/// One-way message leaving the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Gui(GuiMessage),
    /// GUI-originated event echoed to the host so it can record it
    Host(MidiEvent),
}

/// Create a connected notifier / receiver pair
pub fn notification_channel() -> (Notifier, NotificationReceiver) {
    let (tx, rx) = unbounded();
    (Notifier { tx }, NotificationReceiver { rx })
}

/// Fire-and-forget sender; a dropped receiver silently discards messages
#[derive(Clone)]
pub struct Notifier {
    tx: Sender<Notification>,
}

impl Notifier {
    pub fn gui(&self, msg: GuiMessage) {
        let _ = self.tx.send(Notification::Gui(msg));
    }

    pub fn controller(&self, id: u32, value: i32) {
        self.gui(GuiMessage::Controller { id, value });
    }

    pub fn reply(&self, reply: SysexReply) {
        self.gui(GuiMessage::Sysex(reply));
    }

    pub fn host(&self, event: MidiEvent) {
        let _ = self.tx.send(Notification::Host(event));
    }
}

pub struct NotificationReceiver {
    rx: Receiver<Notification>,
}

impl NotificationReceiver {
    pub fn try_recv(&self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }

    /// Everything queued so far
    pub fn drain(&self) -> Vec<Notification> {
        self.rx.try_iter().collect()
    }
}
