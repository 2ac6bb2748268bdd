use crate::types::{Hash, Proposal};
use crate::{GovernanceError, Result};
use std::collections::HashMap;

/// All known proposals, keyed by content hash with a unique-name index.
///
/// The store itself is not synchronized; the service wraps it in a lock so
/// whole queries observe one consistent set.
#[derive(Debug, Default, Clone)]
pub struct ProposalStore {
    by_hash: HashMap<Hash, Proposal>,
    by_name: HashMap<String, Hash>,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, proposal: Proposal) -> Result<()> {
        if self.by_hash.contains_key(&proposal.hash) {
            return Err(GovernanceError::DuplicateProposal(hex::encode(proposal.hash)));
        }
        if self.by_name.contains_key(&proposal.name) {
            return Err(GovernanceError::DuplicateProposal(proposal.name));
        }

        self.by_name.insert(proposal.name.clone(), proposal.hash);
        self.by_hash.insert(proposal.hash, proposal);
        Ok(())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Proposal> {
        self.by_name.get(name).and_then(|hash| self.by_hash.get(hash))
    }

    pub fn find_by_hash(&self, hash: &Hash) -> Option<&Proposal> {
        self.by_hash.get(hash)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Owned snapshot sorted by name
    pub fn all(&self) -> Vec<Proposal> {
        let mut proposals: Vec<Proposal> = self.by_hash.values().cloned().collect();
        proposals.sort_by(|a, b| a.name.cmp(&b.name));
        proposals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Proposal> {
        self.by_hash.values()
    }

    pub fn remove(&mut self, hash: &Hash) -> Option<Proposal> {
        let proposal = self.by_hash.remove(hash)?;
        self.by_name.remove(&proposal.name);
        Some(proposal)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}
