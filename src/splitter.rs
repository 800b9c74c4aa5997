// src/splitter.rs
//
// Sample-accurate event splitting.
//
// One host block is rendered in pieces so every control event takes
// effect at the exact frame it was sent. There is no separate path for
// blocks without events: the same loop runs and degenerates to a single
// render call.

use crate::audio_buffer::BlockIo;
use crate::engine::AudioEngine;
use crate::event::ControlEvent;

/// What happened while splitting one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitReport {
    /// Frames rendered (after clamping to the shortest buffer).
    pub frames: usize,

    /// Number of render calls issued.
    pub renders: usize,

    /// Number of events applied.
    pub events: usize,

    /// Events whose offset fell outside `[cursor, frames]` and was clamped.
    pub clamped: usize,
}

/// Frames that can be rendered without indexing past any buffer.
#[inline]
fn usable_frames(inputs: &[&[f32]], outputs: &[&mut [f32]], frames: usize) -> usize {
    let shortest_in = inputs.iter().map(|ch| ch.len()).min().unwrap_or(frames);
    let shortest_out = outputs.iter().map(|ch| ch.len()).min().unwrap_or(frames);
    frames.min(shortest_in).min(shortest_out)
}

/// Render `frames` frames, applying `events` at their offsets.
///
/// Events are applied in slice order; the caller hands them over sorted
/// by offset with ties in arrival order. An event at offset `k` affects
/// frames `k..` only. Offsets past the block are applied after the last
/// frame, offsets behind the cursor are applied at the cursor.
///
/// Audio-thread-safe: no allocation, no locks.
pub fn split_block<'s, E, F>(
    engine: &mut E,
    inputs: &[&'s [f32]],
    outputs: &mut [&'s mut [f32]],
    frames: usize,
    events: &[ControlEvent],
    mut apply: F,
) -> SplitReport
where
    E: AudioEngine + ?Sized,
    F: FnMut(&mut E, &ControlEvent),
{
    let frames = usable_frames(inputs, outputs, frames);
    let mut report = SplitReport {
        frames,
        ..Default::default()
    };

    let mut done = 0usize;

    for event in events {
        let requested = event.offset as usize;
        let at = requested.clamp(done, frames);
        if at != requested {
            report.clamped += 1;
        }

        let n = at - done;
        if n > 0 {
            engine.render(&mut BlockIo::new(inputs, outputs, done, n));
            report.renders += 1;
            done = at;
        }

        apply(engine, event);
        report.events += 1;
    }

    let remaining = frames - done;
    if remaining > 0 {
        engine.render(&mut BlockIo::new(inputs, outputs, done, remaining));
        report.renders += 1;
    }

    report
}
