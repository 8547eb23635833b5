//! Optimistic list updates.
//!
//! A client applies a change locally before the server confirms it. Every
//! change is tracked as a mutation moving from `Pending` to either
//! `Committed` or `Failed`. The visible list is always recomputed from the
//! confirmed base plus the still-pending mutations, so a failure rolls back
//! by simply dropping out of that replay.

use serde::Serialize;
use thiserror::Error;

use crate::models::{InventoryItem, Recipe, ShoppingListItem};

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for InventoryItem {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Recipe {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for ShoppingListItem {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationState {
    Pending,
    Committed,
    Failed,
}

impl MutationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    Insert(T),
    Replace(T),
    Remove(String),
}

impl<T: Keyed + Clone> Mutation<T> {
    fn apply(&self, items: &mut Vec<T>) {
        match self {
            Self::Insert(item) => items.push(item.clone()),
            Self::Replace(item) => upsert(items, item.clone()),
            Self::Remove(key) => items.retain(|existing| existing.key() != key.as_str()),
        }
    }
}

fn upsert<T: Keyed>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.key() == item.key()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MutationId(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("unknown mutation {0:?}")]
    Unknown(MutationId),
    #[error("mutation {id:?} is already {}", .state.as_str())]
    AlreadySettled { id: MutationId, state: MutationState },
}

#[derive(Debug, Clone)]
struct Tracked<T> {
    id: MutationId,
    mutation: Mutation<T>,
    state: MutationState,
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OptimisticList<T> {
    base: Vec<T>,
    log: Vec<Tracked<T>>,
    next_id: u64,
}

impl<T: Keyed + Clone> OptimisticList<T> {
    pub fn new(base: Vec<T>) -> Self {
        Self {
            base,
            log: Vec::new(),
            next_id: 1,
        }
    }

    /// Record a mutation as pending. It shows up in [`Self::view`] immediately.
    pub fn submit(&mut self, mutation: Mutation<T>) -> MutationId {
        let id = MutationId(self.next_id);
        self.next_id += 1;
        self.log.push(Tracked {
            id,
            mutation,
            state: MutationState::Pending,
            error: None,
        });
        id
    }

    fn pending_entry(&mut self, id: MutationId) -> Result<&mut Tracked<T>, MutationError> {
        let entry = self
            .log
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(MutationError::Unknown(id))?;
        if entry.state.is_terminal() {
            return Err(MutationError::AlreadySettled {
                id,
                state: entry.state,
            });
        }
        Ok(entry)
    }

    /// Confirm a mutation. For inserts and replacements the row returned by
    /// the server, when given, replaces the optimistic guess.
    pub fn commit(&mut self, id: MutationId, confirmed: Option<T>) -> Result<(), MutationError> {
        let entry = self.pending_entry(id)?;
        entry.state = MutationState::Committed;
        let settled = match (&entry.mutation, confirmed) {
            (Mutation::Insert(_) | Mutation::Replace(_), Some(row)) => Mutation::Replace(row),
            (other, _) => other.clone(),
        };
        settled.apply(&mut self.base);
        Ok(())
    }

    pub fn fail(&mut self, id: MutationId, reason: impl Into<String>) -> Result<(), MutationError> {
        let entry = self.pending_entry(id)?;
        entry.state = MutationState::Failed;
        entry.error = Some(reason.into());
        Ok(())
    }

    pub fn state(&self, id: MutationId) -> Option<MutationState> {
        self.log.iter().find(|t| t.id == id).map(|t| t.state)
    }

    pub fn error(&self, id: MutationId) -> Option<&str> {
        self.log
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.error.as_deref())
    }

    pub fn pending_count(&self) -> usize {
        self.log
            .iter()
            .filter(|t| t.state == MutationState::Pending)
            .count()
    }

    /// Confirmed rows with pending mutations replayed on top in submission order.
    pub fn view(&self) -> Vec<T> {
        let mut items = self.base.clone();
        for tracked in self.log.iter().filter(|t| t.state == MutationState::Pending) {
            tracked.mutation.apply(&mut items);
        }
        items
    }

    /// Replace the confirmed rows with a fresh read from the server and drop
    /// settled mutations. Pending ones keep replaying over the new base.
    pub fn revalidate(&mut self, base: Vec<T>) {
        self.base = base;
        self.log.retain(|t| t.state == MutationState::Pending);
    }
}
