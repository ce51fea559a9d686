//! Answer Ledger
//!
//! Per-question answer and review-mark state. Every operation is
//! synchronous and total: unknown question ids get a fresh entry, repeated
//! identical calls leave the same state, and the last write wins.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::question::QuestionId;

/// Answer state for one question
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub selected_option: Option<String>,
    pub marked_for_review: bool,
}

impl AnswerEntry {
    /// An empty-string selection does not count as answered.
    pub fn is_answered(&self) -> bool {
        self.selected_option
            .as_deref()
            .is_some_and(|option| !option.is_empty())
    }
}

/// Mutable answer ledger owned by one session
#[derive(Debug, Default)]
pub struct AnswerLedger {
    /// Question order, used for deterministic snapshots
    order: Vec<QuestionId>,
    entries: HashMap<QuestionId, AnswerEntry>,
}

impl AnswerLedger {
    /// Create a ledger with an empty entry for every question.
    pub fn new<'a>(ids: impl IntoIterator<Item = &'a QuestionId>) -> Self {
        let mut ledger = Self::default();
        for id in ids {
            ledger.entry_mut(id);
        }
        ledger
    }

    fn entry_mut(&mut self, id: &QuestionId) -> &mut AnswerEntry {
        if !self.entries.contains_key(id) {
            self.order.push(id.clone());
        }
        self.entries.entry(id.clone()).or_default()
    }

    pub fn select(&mut self, id: &QuestionId, option: impl Into<String>) {
        self.entry_mut(id).selected_option = Some(option.into());
    }

    pub fn clear(&mut self, id: &QuestionId) {
        self.entry_mut(id).selected_option = None;
    }

    /// Flip the review mark, returning the new value.
    pub fn toggle_mark(&mut self, id: &QuestionId) -> bool {
        let entry = self.entry_mut(id);
        entry.marked_for_review = !entry.marked_for_review;
        entry.marked_for_review
    }

    pub fn get(&self, id: &QuestionId) -> Option<&AnswerEntry> {
        self.entries.get(id)
    }

    pub fn answered_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_answered()).count()
    }

    pub fn marked_count(&self) -> usize {
        self.entries.values().filter(|e| e.marked_for_review).count()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Immutable copy in question order.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let entries = self
            .order
            .iter()
            .map(|id| (id.clone(), self.entries.get(id).cloned().unwrap_or_default()))
            .collect();
        LedgerSnapshot { entries }
    }
}

/// Frozen copy of the ledger
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    entries: Vec<(QuestionId, AnswerEntry)>,
}

impl LedgerSnapshot {
    pub fn entries(&self) -> &[(QuestionId, AnswerEntry)] {
        &self.entries
    }

    pub fn get(&self, id: &QuestionId) -> Option<&AnswerEntry> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.entries.iter().filter(|(_, e)| e.is_answered()).count()
    }

    pub fn marked_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, e)| e.marked_for_review)
            .count()
    }
}
