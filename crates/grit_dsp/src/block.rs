//! Audio Block Views
//!
//! Non-owning, planar views over caller-provided channel buffers.
//! The engine never allocates block storage; hosts hand in slices they own
//! and the kernels read and write through these views.
//!
//! A view may be narrower than the underlying buffers: `frames` caps every
//! channel, so a fixed-capacity buffer can carry a shorter block.

/// Read-only view over `channels × frames` samples
#[derive(Debug, Clone, Copy)]
pub struct AudioBlock<'a> {
    channels: &'a [&'a [f32]],
    frames: usize,
}

impl<'a> AudioBlock<'a> {
    /// View every channel, using the shortest channel as the frame count
    pub fn new(channels: &'a [&'a [f32]]) -> Self {
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        Self { channels, frames }
    }

    /// View only the first `frames` frames (clamped to the buffer capacity)
    pub fn with_frames(channels: &'a [&'a [f32]], frames: usize) -> Self {
        let block = Self::new(channels);
        Self {
            frames: frames.min(block.frames),
            ..block
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &'a [f32] {
        &self.channels[index][..self.frames]
    }

    pub fn is_silent(&self) -> bool {
        (0..self.channel_count()).all(|ch| self.channel(ch).iter().all(|s| *s == 0.0))
    }
}

/// Mutable view over `channels × frames` samples
///
/// Two lifetimes so the caller's array of channel slices stays usable once
/// the view is dropped.
#[derive(Debug)]
pub struct AudioBlockMut<'a, 'b> {
    channels: &'a mut [&'b mut [f32]],
    frames: usize,
}

impl<'a, 'b> AudioBlockMut<'a, 'b> {
    pub fn new(channels: &'a mut [&'b mut [f32]]) -> Self {
        let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        Self { channels, frames }
    }

    pub fn with_frames(channels: &'a mut [&'b mut [f32]], frames: usize) -> Self {
        let mut block = Self::new(channels);
        block.frames = frames.min(block.frames);
        block
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index][..self.frames]
    }

    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let frames = self.frames;
        &mut self.channels[index][..frames]
    }

    /// Zero every channel
    pub fn fill_silence(&mut self) {
        let frames = self.frames;
        for channel in self.channels.iter_mut() {
            channel[..frames].fill(0.0);
        }
    }

    /// Copy `input` into this block
    ///
    /// Copies `min(frames)` frames of `min(channels)` channels; any output
    /// channel without a matching input channel is silenced.
    pub fn copy_from(&mut self, input: &AudioBlock<'_>) {
        let capacity = self.frames;
        let frames = capacity.min(input.frames());
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if index < input.channel_count() {
                channel[..frames].copy_from_slice(&input.channel(index)[..frames]);
                channel[frames..capacity].fill(0.0);
            } else {
                channel[..capacity].fill(0.0);
            }
        }
    }

    /// Copy the first `frames` samples of each channel from planar scratch
    #[inline]
    pub fn copy_from_channels<C: AsRef<[f32]>>(&mut self, source: &[C]) {
        let capacity = self.frames;
        for (channel, src) in self.channels.iter_mut().zip(source) {
            let src = src.as_ref();
            let frames = capacity.min(src.len());
            channel[..frames].copy_from_slice(&src[..frames]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_frames_use_shortest_channel() {
        let left = [0.0_f32; 8];
        let right = [0.0_f32; 6];
        let channels: [&[f32]; 2] = [&left, &right];
        let block = AudioBlock::new(&channels);
        assert_eq!(block.channel_count(), 2);
        assert_eq!(block.frames(), 6);
    }

    #[test]
    fn test_with_frames_clamps_to_capacity() {
        let left = [1.0_f32; 4];
        let channels: [&[f32]; 1] = [&left];
        assert_eq!(AudioBlock::with_frames(&channels, 2).frames(), 2);
        assert_eq!(AudioBlock::with_frames(&channels, 100).frames(), 4);
    }

    #[test]
    fn test_copy_from_and_silence() {
        let input_l = [0.5_f32, -0.5, 0.25];
        let input_channels: [&[f32]; 1] = [&input_l];
        let input = AudioBlock::new(&input_channels);

        let mut out_l = [9.0_f32; 3];
        let mut out_r = [9.0_f32; 3];
        {
            let mut channels: [&mut [f32]; 2] = [&mut out_l, &mut out_r];
            let mut output = AudioBlockMut::new(&mut channels);
            output.copy_from(&input);
        }
        assert_eq!(out_l, input_l);
        // No matching input channel
        assert_eq!(out_r, [0.0; 3]);
    }

    #[test]
    fn test_channel_mut_writes_through() {
        let mut left = [0.1_f32, 0.2];
        {
            let mut channels: [&mut [f32]; 1] = [&mut left];
            let mut block = AudioBlockMut::new(&mut channels);
            block.channel_mut(0)[1] = 0.7;
            assert_eq!(block.channel(0), &[0.1, 0.7]);
        }
        assert_eq!(left, [0.1, 0.7]);
    }

    #[test]
    fn test_fill_silence_respects_frame_count() {
        let mut left = [1.0_f32; 4];
        {
            let mut channels: [&mut [f32]; 1] = [&mut left];
            let mut block = AudioBlockMut::with_frames(&mut channels, 2);
            block.fill_silence();
        }
        assert_eq!(left, [0.0, 0.0, 1.0, 1.0]);
    }
}
