// src/lib.rs
//
// Library entry point: the real-time event/audio integration core of a
// polyphonic sample-based instrument.

mod audio_buffer;
mod bridge;
mod config;
mod engine;
mod event;
mod notify;
mod params;
mod scheduler;
mod splitter;
mod state;

// Re-export key types for Rust consumers
pub use audio_buffer::BlockIo;
pub use bridge::{ControlHandle, RealtimeHandle, create_instrument};
pub use config::{ConfigError, EngineConfig, MAX_CHANNELS};
pub use engine::AudioEngine;
pub use event::{CC_BANK_SELECT_LSB, CC_BANK_SELECT_MSB, ControlEvent, EventPayload, MidiMessage};
pub use notify::{NotifyObserver, Notifier, notify_channel};
pub use params::{ParamSnapshot, Params, ParamsRealtime, param_ports};
pub use scheduler::{SchedPayload, SchedPoll, SchedTask, Scheduler, sched_pair};
pub use splitter::{SplitReport, split_block};
pub use state::{
    Bank, BankDoc, BankId, BankSelect, BankStore, CURRENT_VERSION, DocumentError, Program,
    ProgramDoc, ProgramId, ProgramManager, ProgramRequest, ProgramSelection, SelectionDoc,
    StateDocument,
};
