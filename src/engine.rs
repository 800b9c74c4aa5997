// src/engine.rs

use crate::audio_buffer::BlockIo;
use crate::event::MidiMessage;
use crate::params::ParamSnapshot;
use crate::state::ProgramSelection;

/// The DSP side of the instrument, driven from the audio thread.
///
/// Implementations:
/// - run exclusively on the audio thread
/// - must not allocate, block or take locks in any of these methods
/// - must render a split block identically to one contiguous call over
///   the same frames
pub trait AudioEngine: Send {
    /// Render one contiguous window of frames.
    fn render(&mut self, io: &mut BlockIo);

    /// Apply a trigger (note on/off, controller, ...) at the current frame.
    fn trigger(&mut self, message: &MidiMessage);

    /// Switch to an already-resolved program.
    fn select_program(&mut self, selection: ProgramSelection);

    /// Recompute derived state from the parameter ports.
    fn update_params(&mut self, _params: &ParamSnapshot) {}

    /// Reset voice state (activate / deactivate).
    fn reset(&mut self) {}
}
