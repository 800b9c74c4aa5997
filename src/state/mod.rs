// src/state/mod.rs
//
// Control-side state for one instrument instance.
//
// This module contains the bank/program directory, the current selection
// and the persistence document. The UI and host mutate these freely on
// the control thread; the audio thread only receives the program
// selection through the scheduler.
//
// Key principles:
// - Lookups that miss resolve to `None`, never to an error
// - Everything addressable can be exported as a versioned document
// - The engine never directly accesses these structures

mod bank;
mod document;
mod programs;

pub use bank::*;
pub use document::*;
pub use programs::*;
