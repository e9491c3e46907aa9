pub mod notify;

pub use notify::{notification_channel, GuiMessage, Notification, NotificationReceiver, Notifier};
