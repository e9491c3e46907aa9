//! The drum sampler engine: sixteen sample channels mixed into a stereo
//! pair, with four send-effect slots fed from per-channel send levels.

pub mod channel;
mod control;
pub mod engine_state;
pub mod loader;
mod render;
pub mod sample;

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, info};

pub use channel::{Channel, ChannelState};
pub use engine_state::{EngineState, EngineStateCell};
pub use loader::{LoadOutcome, SampleLoader};
pub use sample::Sample;

use crate::command::{CommandBus, CommandSender, SysexReply};
use crate::config::EngineConfig;
use crate::event::Notifier;
use crate::fx::{PluginRegistry, SendEffectSlot};
use crate::samples::resolve_sample_path;

pub const CHANNEL_COUNT: usize = 16;
pub const SEND_EFFECT_COUNT: usize = 4;
/// Note that triggers channel 0; the next fifteen notes map to the others
pub const LOWEST_NOTE: u8 = 36;
pub const HIGHEST_NOTE: u8 = LOWEST_NOTE + CHANNEL_COUNT as u8 - 1;

pub const MASTER_VOLUME_SCALE: f64 = 100.0;
pub const DEFAULT_MASTER_CTRL: u8 = 100;

pub const ENGINE_NAME: &str = "KitSynth";

/// Per-channel load bookkeeping. Every load or clear starts a new
/// generation; outcomes from an older one are discarded.
#[derive(Debug, Default, Clone, Copy)]
struct LoadTicket {
    generation: u64,
    pending: bool,
}

impl LoadTicket {
    fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    fn cancel(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    fn is_current(&self, generation: u64) -> bool {
        self.pending && self.generation == generation
    }
}

pub struct KitSynth {
    pub(crate) sample_rate: u32,
    max_block: usize,
    pub(crate) channels: [Channel; CHANNEL_COUNT],
    pub(crate) slots: [SendEffectSlot; SEND_EFFECT_COUNT],
    scratch: [Vec<f64>; 2],
    pub(crate) master_ctrl: u8,
    pub(crate) master_volume: f64,
    state: Arc<EngineStateCell>,
    loader: SampleLoader,
    loads: [LoadTicket; CHANNEL_COUNT],
    pub(crate) registry: Box<dyn PluginRegistry>,
    pub(crate) notifier: Notifier,
    gui_bus: CommandBus,
    gui_visible: bool,
    sample_dirs: Vec<PathBuf>,
}

impl KitSynth {
    pub fn new(
        config: &EngineConfig,
        registry: Box<dyn PluginRegistry>,
        notifier: Notifier,
    ) -> std::io::Result<Self> {
        let state = Arc::new(EngineStateCell::new(EngineState::Initializing));
        let loader = SampleLoader::spawn(state.clone(), config.sample_rate)?;
        let max_block = config.max_block.max(1);

        let synth = Self {
            sample_rate: config.sample_rate,
            max_block,
            channels: std::array::from_fn(|_| Channel::default()),
            slots: std::array::from_fn(|_| SendEffectSlot::new(max_block)),
            scratch: [vec![0.0; max_block], vec![0.0; max_block]],
            master_ctrl: DEFAULT_MASTER_CTRL,
            master_volume: DEFAULT_MASTER_CTRL as f64 / MASTER_VOLUME_SCALE,
            state,
            loader,
            loads: [LoadTicket::default(); CHANNEL_COUNT],
            registry,
            notifier,
            gui_bus: CommandBus::new(),
            gui_visible: false,
            sample_dirs: config.sample_dirs.clone(),
        };
        synth.state.set(EngineState::Running);
        info!(
            "{} ready: {} Hz, {} channels, {} send effects",
            ENGINE_NAME, synth.sample_rate, CHANNEL_COUNT, SEND_EFFECT_COUNT
        );
        Ok(synth)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn engine_state(&self) -> EngineState {
        self.state.get()
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    pub fn slot(&self, index: usize) -> Option<&SendEffectSlot> {
        self.slots.get(index)
    }

    pub fn master_ctrl(&self) -> u8 {
        self.master_ctrl
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    pub fn registry(&self) -> &dyn PluginRegistry {
        self.registry.as_ref()
    }

    /// Sender the GUI uses to queue controller and sysex events
    pub fn gui_sender(&self) -> CommandSender {
        self.gui_bus.sender()
    }

    /// Release the channel's sample and hand the file to the loader.
    /// Supersedes any load still pending for the channel.
    pub fn load_sample(&mut self, channel: usize, filename: &str) -> bool {
        if channel >= CHANNEL_COUNT {
            debug!("load request for unknown channel {}", channel);
            return false;
        }
        let generation = self.loads[channel].begin();
        self.swap_sample(channel, None);
        let path = resolve_sample_path(filename, &self.sample_dirs)
            .unwrap_or_else(|| PathBuf::from(filename));
        debug!("loading {} into channel {}", path.display(), channel);
        let queued = self.loader.request(channel, generation, filename, path);
        if !queued {
            self.loads[channel].cancel();
        }
        queued
    }

    /// Drop the channel's sample and cancel a pending load for it.
    /// Returns whether there was either.
    pub fn clear_sample(&mut self, channel: usize) -> bool {
        let Some(ch) = self.channels.get_mut(channel) else {
            debug!("clear request for unknown channel {}", channel);
            return false;
        };
        let ticket = &mut self.loads[channel];
        if ch.sample.is_none() && !ticket.pending {
            return false;
        }
        // A running load already holds the switch and keeps rendering off
        let _switch = self.state.try_enter(EngineState::ClearingSample);
        ticket.cancel();
        if let Some(old) = ch.install(None) {
            self.loader.retire(old);
        }
        self.notifier
            .reply(SysexReply::SampleCleared { channel: channel as u8 });
        debug!("cleared channel {}", channel);
        true
    }

    /// Empty the channel without notifying, cancelling a pending load
    pub(crate) fn discard_sample(&mut self, channel: usize) {
        if let Some(ticket) = self.loads.get_mut(channel) {
            ticket.cancel();
            self.swap_sample(channel, None);
        }
    }

    /// Install `sample`; the replaced one is freed on the loader thread
    fn swap_sample(&mut self, channel: usize, sample: Option<Sample>) {
        if let Some(old) = self.channels[channel].install(sample) {
            self.loader.retire(old);
        }
    }

    /// Install finished loads and tell the GUI about them
    pub(crate) fn apply_load_outcomes(&mut self) {
        while let Some(outcome) = self.loader.try_outcome() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        let Some(ticket) = self.loads.get_mut(outcome.channel) else {
            return;
        };
        if !ticket.is_current(outcome.generation) {
            debug!(
                "channel {}: dropping superseded load of {}",
                outcome.channel, outcome.filename
            );
            if let Ok(sample) = outcome.result {
                self.loader.retire(sample);
            }
            return;
        }
        ticket.pending = false;
        let ok = outcome.result.is_ok();
        self.swap_sample(outcome.channel, outcome.result.ok());
        self.notifier.reply(SysexReply::SampleLoaded {
            ok,
            channel: outcome.channel as u8,
            filename: outcome.filename,
        });
    }

    /// Block until every requested load has been installed
    pub fn wait_for_loads(&mut self) {
        while let Some(outcome) = self.loader.wait_outcome() {
            self.apply_outcome(outcome);
        }
    }
}

impl Drop for KitSynth {
    fn drop(&mut self) {
        self.state.set(EngineState::Initializing);
        for slot in &mut self.slots {
            slot.clear();
        }
        debug!("{} shut down", ENGINE_NAME);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::event::{notification_channel, NotificationReceiver};
    use crate::fx::testing::MockRegistry;

    pub fn engine_with_block(max_block: usize) -> (KitSynth, NotificationReceiver) {
        let (notifier, rx) = notification_channel();
        let config = EngineConfig {
            sample_rate: 44100,
            max_block,
            sample_dirs: Vec::new(),
        };
        let synth = KitSynth::new(&config, Box::new(MockRegistry), notifier).unwrap();
        (synth, rx)
    }

    pub fn engine() -> (KitSynth, NotificationReceiver) {
        engine_with_block(64)
    }

    impl KitSynth {
        /// Put a sample straight into a channel and switch it on
        pub fn install_for_test(&mut self, channel: usize, sample: Sample) {
            self.discard_sample(channel);
            self.channels[channel].install(Some(sample));
            self.channels[channel].set_on(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::testing::*;
    use super::*;
    use crate::event::{GuiMessage, Notification};
    use crate::fx::testing::MockPlugin;
    use crate::synth::sample::fixtures::write_wav;

    #[test]
    fn new_engine_is_running_with_defaults() {
        let (synth, _rx) = engine();
        assert_eq!(synth.engine_state(), EngineState::Running);
        assert_eq!(synth.master_ctrl(), 100);
        assert_eq!(synth.master_volume(), 1.0);
        let ch = synth.channel(0).unwrap();
        assert!(!ch.is_on());
        assert_eq!(ch.pan(), 64);
        assert!(synth.channel(CHANNEL_COUNT).is_none());
    }

    #[test]
    fn load_installs_sample_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "kick.wav", 1, 44100, 32, |_| 0.5);
        let (mut synth, rx) = engine();
        assert!(synth.load_sample(2, &path.to_string_lossy()));
        synth.wait_for_loads();

        let sample = synth.channel(2).unwrap().sample().unwrap();
        assert_eq!(sample.frames(), 32);
        assert_eq!(
            rx.drain(),
            vec![Notification::Gui(GuiMessage::Sysex(SysexReply::SampleLoaded {
                ok: true,
                channel: 2,
                filename: path.to_string_lossy().to_string(),
            }))]
        );
        assert_eq!(synth.engine_state(), EngineState::Running);
    }

    #[test]
    fn failed_load_leaves_channel_empty() {
        let (mut synth, rx) = engine();
        synth.install_for_test(1, Sample::from_interleaved(vec![0.1; 4], 1, "old.wav"));
        synth.load_sample(1, "/nonexistent/missing.wav");
        synth.wait_for_loads();

        assert!(synth.channel(1).unwrap().sample().is_none());
        assert!(matches!(
            rx.drain().as_slice(),
            [Notification::Gui(GuiMessage::Sysex(SysexReply::SampleLoaded { ok: false, channel: 1, .. }))]
        ));
    }

    #[test]
    fn load_resolves_names_against_sample_dirs() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(dir.path(), "snare.wav", 2, 44100, 8, |_| 0.2);
        let (notifier, _rx) = crate::event::notification_channel();
        let config = EngineConfig {
            sample_rate: 44100,
            max_block: 64,
            sample_dirs: vec![dir.path().to_path_buf()],
        };
        let mut synth =
            KitSynth::new(&config, Box::new(crate::fx::testing::MockRegistry), notifier).unwrap();
        synth.load_sample(0, "snare.wav");
        synth.wait_for_loads();
        assert_eq!(synth.channel(0).unwrap().sample().unwrap().filename(), "snare.wav");
    }

    #[test]
    fn clear_sample_notifies_only_when_something_was_there() {
        let (mut synth, rx) = engine();
        assert!(!synth.clear_sample(3));
        synth.install_for_test(3, Sample::from_interleaved(vec![0.1; 4], 2, "x.wav"));
        assert!(synth.clear_sample(3));
        assert!(synth.channel(3).unwrap().sample().is_none());
        assert_eq!(
            rx.drain(),
            vec![Notification::Gui(GuiMessage::Sysex(SysexReply::SampleCleared { channel: 3 }))]
        );
        assert_eq!(synth.engine_state(), EngineState::Running);
    }

    #[test]
    fn dropping_the_engine_stops_plugins() {
        let (mut synth, _rx) = engine();
        let plugin = MockPlugin::new("mono", 1, 1, 0);
        let stops = plugin.stop_counter();
        synth.slots[0].load(Box::new(plugin), 44100).unwrap();
        drop(synth);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_cancels_a_pending_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "kick.wav", 1, 44100, 32, |_| 0.5);
        let (mut synth, rx) = engine();
        synth.load_sample(0, &path.to_string_lossy());
        assert!(synth.clear_sample(0));
        synth.wait_for_loads();

        assert!(synth.channel(0).unwrap().sample().is_none());
        assert_eq!(
            rx.drain(),
            vec![Notification::Gui(GuiMessage::Sysex(SysexReply::SampleCleared { channel: 0 }))]
        );
        assert!(!synth.clear_sample(0));
    }

    #[test]
    fn later_load_supersedes_an_earlier_one() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_wav(dir.path(), "a.wav", 1, 44100, 8, |_| 0.1);
        let second = write_wav(dir.path(), "b.wav", 1, 44100, 16, |_| 0.2);
        let (mut synth, rx) = engine();
        synth.load_sample(5, &first.to_string_lossy());
        synth.load_sample(5, &second.to_string_lossy());
        synth.wait_for_loads();

        assert_eq!(synth.channel(5).unwrap().sample().unwrap().frames(), 16);
        assert_eq!(rx.drain().len(), 1);
    }
}
