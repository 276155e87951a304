use std::cell::Cell;

use crate::{
    executor::{predicate::Criteria, statement::Assignment},
    types::record::Record,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    OnTableInserted,
    OnTableUpdated,
    OnTableDeleted,
}

/// Emitted after each successful mutating operation, for external
/// collaborators such as replication and triggers.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub table: String,
    pub data: Option<Record>,
    pub criteria: Option<Criteria>,
    pub updates: Option<Vec<Assignment>>,
}

impl Event {
    pub fn inserted(table: impl Into<String>, data: Record) -> Self {
        Self {
            kind: EventKind::OnTableInserted,
            table: table.into(),
            data: Some(data),
            criteria: None,
            updates: None,
        }
    }

    pub fn updated(
        table: impl Into<String>,
        criteria: Criteria,
        updates: Vec<Assignment>,
    ) -> Self {
        Self {
            kind: EventKind::OnTableUpdated,
            table: table.into(),
            data: None,
            criteria: Some(criteria),
            updates: Some(updates),
        }
    }

    pub fn deleted(table: impl Into<String>, criteria: Criteria) -> Self {
        Self {
            kind: EventKind::OnTableDeleted,
            table: table.into(),
            data: None,
            criteria: Some(criteria),
            updates: None,
        }
    }
}

pub type Subscriber = Box<dyn Fn(&Event)>;

/// Synchronous fan-out to an unordered list of subscribers. Subscribers must
/// not mutate the database reentrantly; a one-bit guard drops nested emits.
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    emitting: Cell<bool>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            emitting: Cell::new(false),
        }
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    pub fn emit(&self, event: &Event) {
        if self.emitting.replace(true) {
            return;
        }
        for subscriber in &self.subscribers {
            subscriber(event);
        }
        self.emitting.set(false);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
