use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    event::{Event, EventHandle},
    Error, Result,
};

/// Case-insensitive registry of every defined event.
///
/// Events are append-only: once defined, an event lives as long as the registry. Each
/// definition takes the next value of a monotonically increasing creation counter, the
/// secondary ordering key of events sharing a site.
#[derive(Debug, Default)]
pub struct EventRegistry {
    events: DashMap<String, EventHandle>,
    next_order: AtomicU64,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines an event, or returns the existing one of the same name.
    ///
    /// Redefining an event with the same cancellable flag returns the existing event
    /// unchanged, keeping the priority of the first definition.
    ///
    /// Names are matched ignoring ASCII case only: `onTick` and `ONTICK` name one event, while
    /// non-ASCII letters must match exactly (`événement` and `ÉVÉNEMENT` are two events).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an empty name and [`Error::DuplicateEvent`] if
    /// the existing event has a different cancellable flag.
    pub fn define(&self, name: &str, cancellable: bool, priority: i32) -> Result<EventHandle> {
        if name.trim().is_empty() {
            return Err(config_error!("Event names must not be empty"));
        }

        match self.events.entry(name.to_ascii_lowercase()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.is_cancellable() != cancellable {
                    return Err(Error::DuplicateEvent {
                        name: name.to_string(),
                        existing: existing.is_cancellable(),
                        requested: cancellable,
                    });
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(entry) => {
                let order = self.next_order.fetch_add(1, Ordering::Relaxed);
                let event = Arc::new(Event::new(name, cancellable, priority, order));
                entry.insert(Arc::clone(&event));
                Ok(event)
            }
        }
    }

    /// Looks up an event by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EventHandle> {
        self.events
            .get(&name.to_ascii_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Returns `true` if `event` is the very handle this registry holds under its name.
    #[must_use]
    pub fn owns(&self, event: &EventHandle) -> bool {
        self.get(event.name())
            .is_some_and(|known| Arc::ptr_eq(&known, event))
    }

    /// Number of defined events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no event is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Every defined event in dispatch order.
    #[must_use]
    pub fn events(&self) -> Vec<EventHandle> {
        let mut events: Vec<EventHandle> = self
            .events
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        events.sort();
        events
    }
}
