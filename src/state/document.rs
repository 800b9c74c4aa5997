// src/state/document.rs
//
// Persistence document.
//
// Everything addressable about one instance (bank/program directory,
// bank-select halves, selected program, parameter values) as an ordered,
// versioned structure. The host decides where the JSON goes.

use serde::{Deserialize, Serialize};

use super::bank::{BankId, ProgramId};
use super::programs::{BankSelect, ProgramManager, ProgramSelection};

/// Version written by this build. Older documents load, newer ones do not.
pub const CURRENT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum DocumentError {
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported document version {0} (newest known is {})", CURRENT_VERSION)]
    UnsupportedVersion(u32),
    #[error("bank-select {half} value {value} exceeds 7 bits")]
    InvalidBankSelect { half: &'static str, value: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDoc {
    pub id: ProgramId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankDoc {
    pub id: BankId,
    pub name: String,
    #[serde(default)]
    pub programs: Vec<ProgramDoc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionDoc {
    /// Live bank-select halves, which may have moved on since the last
    /// program change.
    pub bank_msb: Option<u8>,
    pub bank_lsb: Option<u8>,
    /// Bank the active program was resolved in. Absent in documents that
    /// only carry the halves; the program then resolves against them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<BankId>,
    pub program: Option<ProgramId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    pub version: u32,
    #[serde(default)]
    pub banks: Vec<BankDoc>,
    #[serde(default)]
    pub selection: SelectionDoc,
    #[serde(default)]
    pub params: Vec<f32>,
}

impl StateDocument {
    /// Snapshot the directory and selection. Parameter values are left
    /// empty; the instrument bridge fills them in.
    pub fn export(programs: &ProgramManager) -> Self {
        let banks = programs
            .store()
            .banks()
            .map(|bank| BankDoc {
                id: bank.id(),
                name: bank.name().to_string(),
                programs: bank
                    .programs()
                    .map(|prog| ProgramDoc {
                        id: prog.id(),
                        name: prog.name().to_string(),
                    })
                    .collect(),
            })
            .collect();

        let select = programs.bank_select();
        let active = programs.current_selection();
        let selection = SelectionDoc {
            bank_msb: select.msb(),
            bank_lsb: select.lsb(),
            bank: active.map(|s| s.bank),
            program: active.map(|s| s.program),
        };

        Self {
            version: CURRENT_VERSION,
            banks,
            selection,
            params: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        let doc: Self = serde_json::from_str(text)?;
        doc.validate()?;
        Ok(doc)
    }

    pub fn validate(&self) -> Result<(), DocumentError> {
        if self.version > CURRENT_VERSION {
            return Err(DocumentError::UnsupportedVersion(self.version));
        }
        let halves = [
            ("msb", self.selection.bank_msb),
            ("lsb", self.selection.bank_lsb),
        ];
        for (half, value) in halves {
            if let Some(value) = value.filter(|v| *v > 0x7F) {
                return Err(DocumentError::InvalidBankSelect { half, value });
            }
        }
        Ok(())
    }

    /// Replace the manager's directory and selection with this document.
    ///
    /// Validation happens first, so a rejected document leaves the manager
    /// untouched. Returns the re-armed selection, if the saved program
    /// still resolves.
    pub fn apply_to(
        &self,
        programs: &mut ProgramManager,
    ) -> Result<Option<ProgramSelection>, DocumentError> {
        self.validate()?;

        programs.clear();
        let store = programs.store_mut();
        for bank_doc in &self.banks {
            let bank = store.add_bank(bank_doc.id, bank_doc.name.as_str());
            for prog_doc in &bank_doc.programs {
                bank.add_program(prog_doc.id, prog_doc.name.as_str());
            }
        }

        programs.set_bank_select(BankSelect::from_halves(
            self.selection.bank_msb,
            self.selection.bank_lsb,
        ));

        let selection = match (self.selection.bank, self.selection.program) {
            (Some(bank), Some(program)) => {
                programs.restore_selection(ProgramSelection { bank, program })
            }
            (None, Some(prog_id)) => programs.set_current_program(prog_id),
            (_, None) => None,
        };

        log::info!(
            "restored {} banks (document version {})",
            self.banks.len(),
            self.version
        );
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::sched_pair;
    use pretty_assertions::assert_eq;

    fn populated() -> ProgramManager {
        let (sched, _poll) = sched_pair();
        let mut programs = ProgramManager::new(sched);
        let store = programs.store_mut();
        let drums = store.add_bank(3, "Drums");
        drums.add_program(7, "Kick");
        drums.add_program(2, "Snare");
        store.add_bank(0, "Empty");
        programs.set_current_bank(3);
        programs.set_current_program(7);
        programs
    }

    #[test]
    fn export_is_ordered_by_id() {
        let doc = StateDocument::export(&populated());

        assert_eq!(
            doc,
            StateDocument {
                version: CURRENT_VERSION,
                banks: vec![
                    BankDoc {
                        id: 0,
                        name: "Empty".into(),
                        programs: vec![],
                    },
                    BankDoc {
                        id: 3,
                        name: "Drums".into(),
                        programs: vec![
                            ProgramDoc {
                                id: 2,
                                name: "Snare".into(),
                            },
                            ProgramDoc {
                                id: 7,
                                name: "Kick".into(),
                            },
                        ],
                    },
                ],
                selection: SelectionDoc {
                    bank_msb: Some(0),
                    bank_lsb: Some(3),
                    bank: Some(3),
                    program: Some(7),
                },
                params: vec![],
            }
        );
    }

    #[test]
    fn json_round_trip_reproduces_store_and_selection() {
        let original = populated();
        let json = StateDocument::export(&original).to_json().unwrap();

        let (sched, poll) = sched_pair();
        let mut restored = ProgramManager::new(sched);
        let selection = StateDocument::from_json(&json)
            .unwrap()
            .apply_to(&mut restored)
            .unwrap();

        assert_eq!(restored.store(), original.store());
        assert_eq!(restored.bank_select(), original.bank_select());
        assert_eq!(selection, original.current_selection());
        assert_eq!(poll.poll(), original.current_selection());
    }

    #[test]
    fn bank_select_after_program_change_round_trips() {
        let (sched, _poll) = sched_pair();
        let mut original = ProgramManager::new(sched);
        let store = original.store_mut();
        store.add_bank(3, "Drums").add_program(7, "Kick");
        store.add_bank(4, "Percussion").add_program(7, "Cowbell");
        original.set_current_bank(3);
        original.set_current_program(7);
        original.set_current_bank(4);

        let json = StateDocument::export(&original).to_json().unwrap();
        let (sched, poll) = sched_pair();
        let mut restored = ProgramManager::new(sched);
        let selection = StateDocument::from_json(&json)
            .unwrap()
            .apply_to(&mut restored)
            .unwrap();

        let kick = ProgramSelection { bank: 3, program: 7 };
        assert_eq!(selection, Some(kick));
        assert_eq!(restored.current_selection(), original.current_selection());
        assert_eq!(restored.current_program().map(|p| p.name()), Some("Kick"));
        assert_eq!(restored.bank_select(), original.bank_select());
        assert_eq!(restored.current_bank_id(), 4);
        assert_eq!(poll.poll(), Some(kick));
    }

    #[test]
    fn program_without_bank_resolves_against_halves() {
        let doc = StateDocument::from_json(
            r#"{
                "version": 1,
                "banks": [ { "id": 3, "name": "Drums", "programs": [ { "id": 7, "name": "Kick" } ] } ],
                "selection": { "bank_msb": 0, "bank_lsb": 3, "program": 7 }
            }"#,
        )
        .unwrap();

        let (sched, _poll) = sched_pair();
        let mut programs = ProgramManager::new(sched);
        assert_eq!(
            doc.apply_to(&mut programs).unwrap(),
            Some(ProgramSelection { bank: 3, program: 7 })
        );
    }

    #[test]
    fn unset_halves_survive_round_trip() {
        let (sched, _poll) = sched_pair();
        let mut programs = ProgramManager::new(sched);
        programs.set_bank_msb(1);

        let json = StateDocument::export(&programs).to_json().unwrap();
        let doc = StateDocument::from_json(&json).unwrap();
        assert_eq!(doc.selection.bank_lsb, None);

        let (sched, _poll) = sched_pair();
        let mut restored = ProgramManager::new(sched);
        doc.apply_to(&mut restored).unwrap();
        assert_eq!(restored.bank_select().msb(), Some(1));
        assert_eq!(restored.bank_select().lsb(), None);
    }

    #[test]
    fn minimal_document_loads_with_defaults() {
        let doc = StateDocument::from_json(r#"{ "version": 1 }"#).unwrap();
        assert!(doc.banks.is_empty());
        assert_eq!(doc.selection, SelectionDoc::default());
    }

    #[test]
    fn rejects_newer_versions_and_bad_halves() {
        assert!(matches!(
            StateDocument::from_json(r#"{ "version": 2 }"#),
            Err(DocumentError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            StateDocument::from_json(r#"{ "version": 1, "selection": { "bank_msb": 200 } }"#),
            Err(DocumentError::InvalidBankSelect { half: "msb", value: 200 })
        ));
        assert!(matches!(
            StateDocument::from_json("[]"),
            Err(DocumentError::Json(_))
        ));
    }

    #[test]
    fn rejected_document_leaves_manager_untouched() {
        let mut programs = populated();
        let mut doc = StateDocument::export(&programs);
        doc.version = 99;

        assert!(doc.apply_to(&mut programs).is_err());
        assert_eq!(programs.store().len(), 2);
        assert!(programs.current_selection().is_some());
    }

    #[test]
    fn duplicate_entries_keep_last_name() {
        let doc = StateDocument::from_json(
            r#"{
                "version": 1,
                "banks": [
                    { "id": 5, "name": "A", "programs": [ { "id": 1, "name": "x" } ] },
                    { "id": 5, "name": "B" }
                ]
            }"#,
        )
        .unwrap();

        let (sched, _poll) = sched_pair();
        let mut programs = ProgramManager::new(sched);
        doc.apply_to(&mut programs).unwrap();

        let bank = programs.store().find_bank(5).unwrap();
        assert_eq!(bank.name(), "B");
        assert_eq!(bank.len(), 1);
    }
}
