// src/audio_buffer.rs

/// A window over per-channel host buffers.
///
/// The host hands over one slice per channel for the whole block. A
/// `BlockIo` exposes only `frames` samples starting at `offset`, which is
/// how the splitter advances buffer positions without copying.
#[derive(Debug)]
pub struct BlockIo<'a, 'b> {
    inputs: &'a [&'b [f32]],
    outputs: &'a mut [&'b mut [f32]],
    offset: usize,
    frames: usize,
}

impl<'a, 'b> BlockIo<'a, 'b> {
    /// Create a window. The caller guarantees `offset + frames` does not
    /// exceed any channel's length.
    #[inline]
    pub(crate) fn new(
        inputs: &'a [&'b [f32]],
        outputs: &'a mut [&'b mut [f32]],
        offset: usize,
        frames: usize,
    ) -> Self {
        debug_assert!(inputs.iter().all(|ch| ch.len() >= offset + frames));
        debug_assert!(outputs.iter().all(|ch| ch.len() >= offset + frames));
        Self {
            inputs,
            outputs,
            offset,
            frames,
        }
    }

    /// Number of frames in this window.
    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Frame offset of this window within the host block.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn input_channels(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn output_channels(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    pub fn input(&self, ch: usize) -> &[f32] {
        &self.inputs[ch][self.offset..self.offset + self.frames]
    }

    #[inline]
    pub fn output_mut(&mut self, ch: usize) -> &mut [f32] {
        &mut self.outputs[ch][self.offset..self.offset + self.frames]
    }

    /// Zero every output channel in the window.
    #[inline]
    pub fn clear(&mut self) {
        for ch in 0..self.outputs.len() {
            self.output_mut(ch).fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_exposes_only_its_range() {
        let left_in = [1.0, 2.0, 3.0, 4.0];
        let inputs: [&[f32]; 1] = [&left_in];
        let mut left_out = [9.0f32; 4];
        let mut right_out = [9.0f32; 4];
        let mut outputs: [&mut [f32]; 2] = [&mut left_out, &mut right_out];

        let mut io = BlockIo::new(&inputs, &mut outputs, 1, 2);
        assert_eq!(io.frames(), 2);
        assert_eq!(io.input(0), &[2.0, 3.0]);
        io.clear();
        io.output_mut(1)[1] = 0.5;

        assert_eq!(left_out, [9.0, 0.0, 0.0, 9.0]);
        assert_eq!(right_out, [9.0, 0.0, 0.5, 9.0]);
    }
}
