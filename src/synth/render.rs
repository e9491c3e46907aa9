use super::channel::ChannelState;
use super::{EngineState, KitSynth};

impl KitSynth {
    /// Render `len` frames into `out_left`/`out_right` starting at `offset`.
    /// Does nothing unless the engine is running; the range is overwritten,
    /// not mixed into.
    pub fn process(&mut self, out_left: &mut [f32], out_right: &mut [f32], offset: usize, len: usize) {
        self.apply_load_outcomes();
        if self.state.get() != EngineState::Running {
            return;
        }

        let end = offset
            .saturating_add(len)
            .min(out_left.len())
            .min(out_right.len());
        let mut start = offset.min(end);
        while start < end {
            let n = (end - start).min(self.max_block);
            self.render_block(&mut out_left[start..start + n], &mut out_right[start..start + n]);
            start += n;
        }
    }

    fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let len = left.len();

        for slot in self.slots.iter_mut().filter(|s| s.is_on()) {
            slot.clear_line_out(len);
        }
        left.fill(0.0);
        right.fill(0.0);

        let [scratch_l, scratch_r] = &mut self.scratch;
        for channel in self.channels.iter_mut() {
            if !channel.channel_on || channel.state != ChannelState::Playing {
                continue;
            }
            let Some(sample) = channel.sample.as_ref() else {
                channel.state = ChannelState::Inactive;
                continue;
            };

            let data = sample.data();
            let step = sample.channels();
            let gain_l = channel.gain_factor * channel.balance.0;
            let gain_r = channel.gain_factor * channel.balance.1;
            scratch_l[..len].fill(0.0);
            scratch_r[..len].fill(0.0);

            for frame in 0..len {
                let pos = channel.play_offset;
                let (raw_l, raw_r) = if step == 2 {
                    (data[pos], data[pos + 1])
                } else {
                    (data[pos], data[pos])
                };
                let l = raw_l as f64 * gain_l;
                let r = raw_r as f64 * gain_r;
                scratch_l[frame] = l;
                scratch_r[frame] = r;

                for (slot, &level) in self.slots.iter_mut().zip(channel.send_levels.iter()) {
                    if level > 0.0 && slot.is_on() {
                        slot.tap(frame, (l * level) as f32, (r * level) as f32);
                    }
                }

                channel.play_offset += step;
                if channel.play_offset >= sample.samples() {
                    channel.state = ChannelState::Inactive;
                    channel.play_offset = 0;
                    break;
                }
            }

            for frame in 0..len {
                left[frame] += scratch_l[frame] as f32;
                right[frame] += scratch_r[frame] as f32;
            }
        }

        for slot in self.slots.iter_mut().filter(|s| s.is_on()) {
            slot.run(len);
            for frame in 0..len {
                let (l, r) = slot.mix_return(frame);
                left[frame] += l as f32;
                right[frame] += r as f32;
            }
        }

        let master = self.master_volume as f32;
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            *l *= master;
            *r *= master;
        }
    }
}
