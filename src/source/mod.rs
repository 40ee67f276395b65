//! Input collaborators
//!
//! The engines never fetch data themselves. A [`ProposalSource`] hands over a
//! fully resolved input for an entity id, and a [`LabSource`] supplies the flat
//! marker map for a health proposal.

mod files;
mod labs;

pub use files::{
    json_files, load_finance_csv, load_finance_inputs, load_finance_json, read_health_proposal,
    FinanceLoad, JsonDirSource,
};
pub use labs::{labs_from_documents, DocumentLabs, LAB_KEYS};

use crate::error::SourceError;
use crate::input::{FinanceInput, HealthProposal, LabValues};
use std::collections::BTreeMap;

/// Supplies a scoring input given an entity id
pub trait ProposalSource<T> {
    /// Every entity id this source can supply, in a stable order
    fn entity_ids(&self) -> Vec<String>;

    fn fetch(&self, entity_id: &str) -> Result<T, SourceError>;
}

/// Supplies lab marker values for a health proposal
pub trait LabSource {
    fn lab_values(&self, proposal: &HealthProposal) -> LabValues;
}

/// Inputs already loaded into memory, in load order.
///
/// Every record is kept. A blank id becomes `row<N>` and a repeated id gets a
/// `#<N>` suffix, `N` being the 1-based row, so each record has its own entity id.
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    ids: Vec<String>,
    items: Vec<T>,
    index: BTreeMap<String, usize>,
}

impl<T> MemorySource<T> {
    pub fn new<F>(items: Vec<T>, key: F) -> Self
    where
        F: Fn(&T) -> String,
    {
        let mut ids = Vec::with_capacity(items.len());
        let mut index = BTreeMap::new();
        for (row, item) in items.iter().enumerate() {
            let base = key(item).trim().to_string();
            let mut id = if base.is_empty() {
                format!("row{}", row + 1)
            } else {
                base.clone()
            };
            if !base.is_empty() && index.contains_key(&id) {
                log::warn!("entity id '{}' repeats at row {}, scoring it separately", base, row + 1);
            }
            while index.contains_key(&id) {
                id = format!("{id}#{}", row + 1);
            }
            index.insert(id.clone(), row);
            ids.push(id);
        }
        Self { ids, items, index }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl MemorySource<FinanceInput> {
    pub fn finance(inputs: Vec<FinanceInput>) -> Self {
        Self::new(inputs, |i| i.proposal_number.clone())
    }
}

impl MemorySource<HealthProposal> {
    pub fn health(proposals: Vec<HealthProposal>) -> Self {
        Self::new(proposals, HealthProposal::entity_id)
    }
}

impl<T: Clone> ProposalSource<T> for MemorySource<T> {
    fn entity_ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    fn fetch(&self, entity_id: &str) -> Result<T, SourceError> {
        self.index
            .get(entity_id)
            .and_then(|&row| self.items.get(row))
            .cloned()
            .ok_or_else(|| SourceError::NotFound(entity_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finance(id: &str, occupation: &str) -> FinanceInput {
        FinanceInput {
            proposal_number: id.into(),
            occupation: Some(occupation.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_memory_source_keeps_load_order() {
        let source = MemorySource::finance(vec![finance("B", "pilot"), finance("A", "nurse")]);
        assert_eq!(source.len(), 2);
        assert_eq!(source.entity_ids(), vec!["B", "A"]);
        assert_eq!(source.fetch("A").unwrap().occupation.as_deref(), Some("nurse"));
        assert!(matches!(source.fetch("Z"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_repeated_and_blank_ids_are_all_kept() {
        let source = MemorySource::finance(vec![
            finance("", "a"),
            finance("P1", "b"),
            finance(" ", "c"),
            finance("P1", "d"),
        ]);
        assert_eq!(source.len(), 4);
        let ids = source.entity_ids();
        assert_eq!(ids, vec!["row1", "P1", "row3", "P1#4"]);
        let occupations: Vec<String> = ids
            .iter()
            .map(|id| source.fetch(id).unwrap().occupation.unwrap())
            .collect();
        assert_eq!(occupations, vec!["a", "b", "c", "d"]);
    }
}
