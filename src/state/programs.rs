// src/state/programs.rs
//
// Current bank/program selection.
//
// Tracks the MIDI bank-select halves, resolves them against the store and
// arms the program task. Misses are silent: program-change traffic naming
// banks or programs that do not exist must never disturb rendering.

use crate::event::EventPayload;
use crate::scheduler::{SchedPayload, Scheduler};

use super::bank::{Bank, BankId, BankStore, Program, ProgramId};

/// Top bit of a half marks it as set.
const HALF_SET: u8 = 0x80;
const HALF_VALUE: u8 = 0x7F;

/// The two MIDI bank-select halves, each carrying its own "is set" flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankSelect {
    msb: u8,
    lsb: u8,
}

impl BankSelect {
    /// Both halves unset.
    pub const fn new() -> Self {
        Self { msb: 0, lsb: 0 }
    }

    /// Build from optional 7-bit halves.
    pub fn from_halves(msb: Option<u8>, lsb: Option<u8>) -> Self {
        let mut select = Self::new();
        if let Some(v) = msb {
            select.set_msb(v);
        }
        if let Some(v) = lsb {
            select.set_lsb(v);
        }
        select
    }

    #[inline]
    pub fn set_msb(&mut self, value: u8) {
        self.msb = HALF_SET | (value & HALF_VALUE);
    }

    #[inline]
    pub fn set_lsb(&mut self, value: u8) {
        self.lsb = HALF_SET | (value & HALF_VALUE);
    }

    /// Set both halves from a 14-bit bank id.
    #[inline]
    pub fn set_bank(&mut self, bank_id: BankId) {
        self.set_msb((bank_id >> 7) as u8);
        self.set_lsb(bank_id as u8);
    }

    #[inline]
    pub fn msb(&self) -> Option<u8> {
        (self.msb & HALF_SET != 0).then_some(self.msb & HALF_VALUE)
    }

    #[inline]
    pub fn lsb(&self) -> Option<u8> {
        (self.lsb & HALF_SET != 0).then_some(self.lsb & HALF_VALUE)
    }

    /// Whether any half has been selected.
    #[inline]
    pub fn is_set(&self) -> bool {
        (self.msb | self.lsb) & HALF_SET != 0
    }

    /// 14-bit bank id: MSB in bits 7..13, LSB in bits 0..6. An unset half
    /// contributes nothing.
    #[inline]
    pub fn bank_id(&self) -> BankId {
        let high = self.msb().map_or(0, |v| (v as BankId) << 7);
        let low = self.lsb().map_or(0, BankId::from);
        high | low
    }
}

/// A resolved bank/program pair, handed to the audio thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramSelection {
    pub bank: BankId,
    pub program: ProgramId,
}

impl SchedPayload for ProgramSelection {
    #[inline]
    fn into_word(self) -> u64 {
        ((self.bank as u64) << 16) | self.program as u64
    }

    #[inline]
    fn from_word(word: u64) -> Self {
        Self {
            bank: (word >> 16) as BankId,
            program: word as ProgramId,
        }
    }
}

/// Selection traffic seen on the audio thread, replayed on the control
/// thread in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRequest {
    BankSelectMsb(u8),
    BankSelectLsb(u8),
    ProgramChange(u8),
}

impl ProgramRequest {
    pub fn from_payload(payload: &EventPayload) -> Option<Self> {
        match *payload {
            EventPayload::BankSelectMsb(v) => Some(Self::BankSelectMsb(v)),
            EventPayload::BankSelectLsb(v) => Some(Self::BankSelectLsb(v)),
            EventPayload::ProgramChange(v) => Some(Self::ProgramChange(v)),
            EventPayload::Trigger(_) => None,
        }
    }
}

/// Owns the bank store and the current selection.
///
/// This struct is NOT real-time safe.
/// It lives on the control thread; the audio thread only ever sees the
/// `ProgramSelection` it schedules.
pub struct ProgramManager {
    store: BankStore,
    select: BankSelect,
    current: Option<ProgramSelection>,
    sched: Scheduler<ProgramSelection>,
}

impl ProgramManager {
    pub fn new(sched: Scheduler<ProgramSelection>) -> Self {
        Self::with_store(BankStore::new(), sched)
    }

    pub fn with_store(store: BankStore, sched: Scheduler<ProgramSelection>) -> Self {
        Self {
            store,
            select: BankSelect::new(),
            current: None,
            sched,
        }
    }

    pub fn store(&self) -> &BankStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BankStore {
        &mut self.store
    }

    /// Drop every bank and reset the selection to unset.
    pub fn clear(&mut self) {
        self.store.clear();
        self.select = BankSelect::new();
        self.current = None;
    }

    pub fn bank_select(&self) -> BankSelect {
        self.select
    }

    pub fn set_bank_select(&mut self, select: BankSelect) {
        self.select = select;
    }

    pub fn set_bank_msb(&mut self, value: u8) {
        self.select.set_msb(value);
    }

    pub fn set_bank_lsb(&mut self, value: u8) {
        self.select.set_lsb(value);
    }

    pub fn set_current_bank(&mut self, bank_id: BankId) {
        self.select.set_bank(bank_id);
    }

    pub fn current_bank_id(&self) -> BankId {
        self.select.bank_id()
    }

    /// Resolve `prog_id` within the currently selected bank.
    ///
    /// On a hit the selection becomes active and the program task is armed.
    /// On a miss nothing changes and `None` is returned.
    pub fn set_current_program(&mut self, prog_id: ProgramId) -> Option<ProgramSelection> {
        self.resolve(self.current_bank_id(), prog_id)
    }

    /// Re-activate a previously resolved selection without touching the
    /// bank-select halves. Same hit/miss rules as `set_current_program`.
    pub fn restore_selection(&mut self, selection: ProgramSelection) -> Option<ProgramSelection> {
        self.resolve(selection.bank, selection.program)
    }

    fn resolve(&mut self, bank_id: BankId, prog_id: ProgramId) -> Option<ProgramSelection> {
        let Some(program) = self.store.find_program(bank_id, prog_id) else {
            log::debug!("no program {} in bank {}", prog_id, bank_id);
            return None;
        };

        let selection = ProgramSelection {
            bank: bank_id,
            program: program.id(),
        };
        log::info!(
            "selected program {}:{} {:?}",
            selection.bank,
            selection.program,
            program.name()
        );

        self.current = Some(selection);
        self.sched.schedule_with(selection);
        Some(selection)
    }

    /// The active selection, if a program has been resolved.
    pub fn current_selection(&self) -> Option<ProgramSelection> {
        self.current
    }

    /// The active bank, unless it has since been removed.
    pub fn current_bank(&self) -> Option<&Bank> {
        self.store.find_bank(self.current?.bank)
    }

    /// The active program, unless it has since been removed.
    pub fn current_program(&self) -> Option<&Program> {
        let current = self.current?;
        self.store.find_program(current.bank, current.program)
    }

    /// Replay one request forwarded from the audio thread.
    pub fn apply_request(&mut self, request: ProgramRequest) -> Option<ProgramSelection> {
        match request {
            ProgramRequest::BankSelectMsb(v) => {
                self.set_bank_msb(v);
                None
            }
            ProgramRequest::BankSelectLsb(v) => {
                self.set_bank_lsb(v);
                None
            }
            ProgramRequest::ProgramChange(v) => self.set_current_program(v as ProgramId),
        }
    }
}
