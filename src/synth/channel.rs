use super::sample::Sample;
use super::SEND_EFFECT_COUNT;

pub const CHANNEL_VOLUME_SCALE: f64 = 100.0;
pub const DEFAULT_VOLUME_CTRL: u8 = 100;
pub const DEFAULT_PAN: u8 = 64;
pub const SEND_LEVEL_SCALE: f64 = 127.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Inactive,
    Playing,
}

/// One drum voice: a sample, a play cursor and its mixer settings
#[derive(Debug)]
pub struct Channel {
    pub(crate) sample: Option<Sample>,
    pub(crate) play_offset: usize,
    pub(crate) state: ChannelState,
    pub(crate) channel_on: bool,
    pub(crate) sustain_past_note_off: bool,
    pub(crate) volume_ctrl: u8,
    pub(crate) volume: f64,
    pub(crate) pan: u8,
    pub(crate) balance: (f64, f64),
    pub(crate) gain_factor: f64,
    pub(crate) send_levels: [f64; SEND_EFFECT_COUNT],
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            sample: None,
            play_offset: 0,
            state: ChannelState::Inactive,
            channel_on: false,
            sustain_past_note_off: false,
            volume_ctrl: DEFAULT_VOLUME_CTRL,
            volume: DEFAULT_VOLUME_CTRL as f64 / CHANNEL_VOLUME_SCALE,
            pan: DEFAULT_PAN,
            balance: (1.0, 1.0),
            gain_factor: 0.0,
            send_levels: [0.0; SEND_EFFECT_COUNT],
        }
    }
}

/// Left/right balance for a pan control: centre is unity on both sides and
/// moving away attenuates only the opposite side.
pub fn pan_balance(pan: u8) -> (f64, f64) {
    let dev = (pan as f64 - 64.0) / 64.0;
    if dev < 0.0 {
        (1.0, 1.0 + dev)
    } else {
        (1.0 - dev, 1.0)
    }
}

impl Channel {
    pub fn sample(&self) -> Option<&Sample> {
        self.sample.as_ref()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ChannelState::Playing
    }

    pub fn play_offset(&self) -> usize {
        self.play_offset
    }

    pub fn is_on(&self) -> bool {
        self.channel_on
    }

    pub fn sustains_past_note_off(&self) -> bool {
        self.sustain_past_note_off
    }

    pub fn volume_ctrl(&self) -> u8 {
        self.volume_ctrl
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn pan(&self) -> u8 {
        self.pan
    }

    pub fn balance(&self) -> (f64, f64) {
        self.balance
    }

    pub fn gain_factor(&self) -> f64 {
        self.gain_factor
    }

    pub fn send_level(&self, slot: usize) -> f64 {
        self.send_levels.get(slot).copied().unwrap_or(0.0)
    }

    /// Control value that reproduces the current send level
    pub fn send_ctrl(&self, slot: usize) -> u8 {
        (self.send_level(slot) * SEND_LEVEL_SCALE).round() as u8
    }

    pub(crate) fn set_volume(&mut self, ctrl: u8) {
        self.volume_ctrl = ctrl;
        self.volume = ctrl as f64 / CHANNEL_VOLUME_SCALE;
    }

    pub(crate) fn set_pan(&mut self, pan: u8) {
        self.pan = pan;
        self.balance = pan_balance(pan);
    }

    pub(crate) fn set_send_level(&mut self, slot: usize, ctrl: u8) {
        if let Some(level) = self.send_levels.get_mut(slot) {
            *level = ctrl as f64 / SEND_LEVEL_SCALE;
        }
    }

    pub(crate) fn set_on(&mut self, on: bool) {
        if !on && self.channel_on {
            self.state = ChannelState::Inactive;
        } else if on && !self.channel_on {
            self.state = ChannelState::Inactive;
            self.play_offset = 0;
        }
        self.channel_on = on;
    }

    pub(crate) fn trigger(&mut self, velocity: u8) {
        if self.sample.as_ref().map_or(true, |s| s.samples() == 0) {
            return;
        }
        self.play_offset = 0;
        self.state = ChannelState::Playing;
        self.gain_factor = velocity as f64 / 127.0 * self.volume;
    }

    pub(crate) fn release(&mut self) {
        if self.sustain_past_note_off {
            return;
        }
        self.state = ChannelState::Inactive;
        self.play_offset = 0;
        self.gain_factor = 0.0;
    }

    /// Swap in a new sample (or none) and rewind. Returns the old one.
    pub(crate) fn install(&mut self, sample: Option<Sample>) -> Option<Sample> {
        self.state = ChannelState::Inactive;
        self.play_offset = 0;
        std::mem::replace(&mut self.sample, sample)
    }
}
