// src/event.rs

/// ===============================
/// Raw MIDI messages
/// ===============================

const STATUS_CONTROL_CHANGE: u8 = 0xB0;
const STATUS_PROGRAM_CHANGE: u8 = 0xC0;

/// Controller numbers carrying the bank-select halves.
pub const CC_BANK_SELECT_MSB: u8 = 0x00;
pub const CC_BANK_SELECT_LSB: u8 = 0x20;

/// A short MIDI message stored inline (no allocation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    bytes: [u8; 3],
    len: u8,
}

impl MidiMessage {
    /// Wrap 1 to 3 raw bytes. Anything else is rejected.
    pub fn new(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 3 {
            return None;
        }
        let mut inline = [0u8; 3];
        inline[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            bytes: inline,
            len: bytes.len() as u8,
        })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.bytes[0] & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.bytes[0] & 0x0F
    }
}

/// ===============================
/// Block-relative control events
/// ===============================

/// What a control event does once it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    BankSelectMsb(u8),

    BankSelectLsb(u8),

    ProgramChange(u8),

    /// Forwarded untouched to the audio engine.
    Trigger(MidiMessage),
}

impl EventPayload {
    /// Decode a raw MIDI message.
    ///
    /// Bank-select controllers and program changes are picked out, every
    /// other message becomes a trigger. Returns `None` for empty or
    /// over-long input.
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        let message = MidiMessage::new(bytes)?;
        let data = message.as_bytes();

        let payload = match (message.status(), data) {
            (STATUS_CONTROL_CHANGE, [_, CC_BANK_SELECT_MSB, value]) => {
                EventPayload::BankSelectMsb(value & 0x7F)
            }
            (STATUS_CONTROL_CHANGE, [_, CC_BANK_SELECT_LSB, value]) => {
                EventPayload::BankSelectLsb(value & 0x7F)
            }
            (STATUS_PROGRAM_CHANGE, [_, program, ..]) => EventPayload::ProgramChange(program & 0x7F),
            _ => EventPayload::Trigger(message),
        };
        Some(payload)
    }
}

/// An event expressed as a frame offset into the current block.
///
/// These events:
/// - are RT-safe (Copy, no heap data)
/// - are applied exactly once, between frame `offset - 1` and `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub offset: u32,
    pub payload: EventPayload,
}

impl ControlEvent {
    pub fn new(offset: u32, payload: EventPayload) -> Self {
        Self { offset, payload }
    }

    pub fn from_midi(offset: u32, bytes: &[u8]) -> Option<Self> {
        EventPayload::from_midi(bytes).map(|payload| Self { offset, payload })
    }
}
