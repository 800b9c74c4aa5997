// src/state/bank.rs
//
// Bank / program directory.
//
// Two-level keyed directory holding display metadata only. Owned by the
// control thread; the audio thread never looks anything up here.

use std::collections::BTreeMap;

/// Bank identifier, unique within the store.
pub type BankId = u16;

/// Program identifier, unique within its bank.
pub type ProgramId = u16;

/// A named, addressable instrument configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    id: ProgramId,
    name: String,
}

impl Program {
    fn new(id: ProgramId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A named group of programs, ordered by program id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bank {
    id: BankId,
    name: String,
    programs: BTreeMap<ProgramId, Program>,
}

impl Bank {
    fn new(id: BankId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            programs: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.get(&id)
    }

    /// Add a program, or rename it if `id` already exists.
    pub fn add_program(&mut self, id: ProgramId, name: impl Into<String>) -> &mut Program {
        let name = name.into();
        self.programs
            .entry(id)
            .and_modify(|prog| prog.name.clone_from(&name))
            .or_insert_with(|| Program::new(id, name.clone()))
    }

    /// Remove a program. Returns whether it existed.
    pub fn remove_program(&mut self, id: ProgramId) -> bool {
        self.programs.remove(&id).is_some()
    }

    /// Remove every program, keeping the bank itself.
    pub fn clear_programs(&mut self) {
        self.programs.clear();
    }

    /// Programs in ascending id order.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

/// Every bank of one instrument instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankStore {
    banks: BTreeMap<BankId, Bank>,
}

impl BankStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_bank(&self, id: BankId) -> Option<&Bank> {
        self.banks.get(&id)
    }

    pub fn find_bank_mut(&mut self, id: BankId) -> Option<&mut Bank> {
        self.banks.get_mut(&id)
    }

    /// Look up a program by bank and program id.
    pub fn find_program(&self, bank_id: BankId, prog_id: ProgramId) -> Option<&Program> {
        self.find_bank(bank_id)?.find_program(prog_id)
    }

    /// Add a bank, or rename it if `id` already exists.
    pub fn add_bank(&mut self, id: BankId, name: impl Into<String>) -> &mut Bank {
        let name = name.into();
        log::debug!("add bank {} {:?}", id, name);
        self.banks
            .entry(id)
            .and_modify(|bank| bank.name.clone_from(&name))
            .or_insert_with(|| Bank::new(id, name.clone()))
    }

    /// Remove a bank together with all of its programs.
    pub fn remove_bank(&mut self, id: BankId) -> bool {
        let removed = self.banks.remove(&id).is_some();
        if removed {
            log::debug!("removed bank {}", id);
        }
        removed
    }

    /// Drop every bank. Selection state lives in the program manager,
    /// which resets it alongside.
    pub(crate) fn clear(&mut self) {
        self.banks.clear();
    }

    /// Banks in ascending id order.
    pub fn banks(&self) -> impl Iterator<Item = &Bank> {
        self.banks.values()
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}
