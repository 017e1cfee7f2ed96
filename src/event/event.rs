//! The event type and its attachment state machine.

use std::{
    cmp::Ordering,
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    event::{info::WrapperType, ListenerRef},
    inject::Injector,
    ir::{MethodBody, MethodSignature, TypeDesc},
    proxy::{DispatchRoutine, ProxyGenerator},
    Error, Result,
};

/// Shared handle to a registered event.
pub type EventHandle = Arc<Event>;

/// Per-body state cached while an event is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// `owner.name(desc)` of the attached body
    pub method: String,
    /// Signature of the attached body
    pub signature: MethodSignature,
    /// Return type of the attached body
    pub return_type: TypeDesc,
    /// Whether the attached body has no receiver
    pub is_static: bool,
    /// Wrapper type used for the attached body's return type
    pub wrapper: WrapperType,
    /// Number of injections performed while attached
    pub injections: usize,
}

impl Attachment {
    fn new(body: &MethodBody) -> Self {
        Attachment {
            method: body.to_string(),
            signature: body.signature.clone(),
            return_type: body.signature.ret.clone(),
            is_static: body.is_static(),
            wrapper: WrapperType::for_return(&body.signature.ret),
            injections: 0,
        }
    }
}

/// A named unit of instrumentation with zero or more listeners.
///
/// Events move through `Unattached -> Attached -> (injected one or more times) -> Unattached`.
/// While attached, an event caches the return type, static-ness and wrapper type of the one
/// body it is being injected into. Attaching an already attached event is rejected with
/// [`Error::EventAlreadyAttached`] rather than waiting, so two passes sharing an event are
/// detected instead of silently serialised.
///
/// Events compare equal when their names are equal ignoring ASCII case, and order by
/// `(priority, order)` ascending. Non-ASCII letters in names must match exactly.
///
/// # Example
///
/// ```rust
/// use eventscope::event::Event;
///
/// let early = Event::new("onLoadSecure", true, 500, 1);
/// let late = Event::new("onLoad", false, 1000, 0);
/// assert!(early < late);
/// assert_eq!(Event::new("ONLOAD", true, 0, 7), late);
/// ```
pub struct Event {
    name: String,
    cancellable: bool,
    priority: i32,
    order: u64,
    listeners: boxcar::Vec<ListenerRef>,
    attachment: Mutex<Option<Attachment>>,
}

impl Event {
    /// Creates an unattached event without listeners.
    ///
    /// Registered events are created through [`crate::event::EventRegistry::define`], which
    /// assigns `order`.
    #[must_use]
    pub fn new(name: &str, cancellable: bool, priority: i32, order: u64) -> Self {
        Event {
            name: name.to_string(),
            cancellable,
            priority,
            order,
            listeners: boxcar::Vec::new(),
            attachment: Mutex::new(None),
        }
    }

    /// The event name, as first defined.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether listeners may cancel the instrumented method.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    /// Dispatch priority, lower values run first.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Creation order tag, the secondary sort key.
    #[must_use]
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Adds a listener. Adding the same listener twice has no effect.
    pub fn add_listener(&self, listener: ListenerRef) {
        if !self.listeners.iter().any(|(_, known)| *known == listener) {
            self.listeners.push(listener);
        }
    }

    /// Snapshot of the registered listeners.
    #[must_use]
    pub fn listeners(&self) -> Vec<ListenerRef> {
        self.listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }

    /// Snapshot of the attachment state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the state lock is poisoned.
    pub fn attachment(&self) -> Result<Option<Attachment>> {
        Ok(lock!(self.attachment).clone())
    }

    /// Returns `true` while attached to a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockError`] if the state lock is poisoned.
    pub fn is_attached(&self) -> Result<bool> {
        Ok(lock!(self.attachment).is_some())
    }

    /// Attaches the event to `body`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventAlreadyAttached`] if the event is attached to any body, including
    /// `body` itself.
    pub fn attach(&self, body: &MethodBody) -> Result<()> {
        let mut state = lock!(self.attachment);
        if let Some(current) = state.as_ref() {
            return Err(Error::EventAlreadyAttached {
                event: self.name.clone(),
                attached: current.method.clone(),
                requested: body.to_string(),
            });
        }
        *state = Some(Attachment::new(body));
        Ok(())
    }

    /// Injects the event into `body` before the instruction at `index`.
    ///
    /// Allocates a new dispatch routine for the site, adds this event to it and splices the
    /// wrapper construction, the routine call and (when `cancellable`) the cancellation check
    /// into `body`. `cancellable` is the flag of the site, which may differ from the event's own
    /// flag when several events share the site.
    ///
    /// On failure the routine is discarded again and `body` is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotAttached`] unless attached to `body`, and
    /// [`Error::Synthesis`] if the code cannot be inserted at `index`.
    pub fn inject(
        self: &Arc<Self>,
        body: &mut MethodBody,
        index: usize,
        cancellable: bool,
        proxies: &ProxyGenerator,
    ) -> Result<Arc<DispatchRoutine>> {
        let mut state = lock!(self.attachment);
        let attachment = match state.as_mut() {
            Some(attachment) if attachment.method == body.to_string() => attachment,
            _ => return Err(Error::EventNotAttached(self.name.clone())),
        };

        let routine = proxies.allocate(body, attachment.wrapper, index, cancellable)?;
        routine.add_event(Arc::clone(self));

        let injector = Injector::new(&self.name, attachment, cancellable);
        if let Err(error) = injector.inject(body, index, &routine.method_ref()) {
            proxies.discard(&routine)?;
            return Err(error);
        }

        attachment.injections += 1;
        Ok(routine)
    }

    /// Adds this event to a routine another event already created for the same site.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotAttached`] unless attached to the routine's body.
    pub fn add_to_handler(self: &Arc<Self>, routine: &DispatchRoutine) -> Result<()> {
        let mut state = lock!(self.attachment);
        match state.as_mut() {
            Some(attachment) if attachment.method == routine.target() => {
                routine.add_event(Arc::clone(self));
                attachment.injections += 1;
                Ok(())
            }
            _ => Err(Error::EventNotAttached(self.name.clone())),
        }
    }

    /// Releases the attachment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotAttached`] if the event is not attached.
    pub fn detach(&self) -> Result<()> {
        let mut state = lock!(self.attachment);
        match state.take() {
            Some(_) => Ok(()),
            None => Err(Error::EventNotAttached(self.name.clone())),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("cancellable", &self.cancellable)
            .field("priority", &self.priority)
            .field("order", &self.order)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        (self.priority, self.order)
            .cmp(&(other.priority, other.order))
            .then_with(|| {
                self.name
                    .to_ascii_lowercase()
                    .cmp(&other.name.to_ascii_lowercase())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EngineConfig,
        ir::{Instruction, MethodAccess},
        test::{body, event},
    };

    fn void_body() -> MethodBody {
        body(
            "a/B",
            "m",
            "()V",
            MethodAccess::PUBLIC,
            vec![Instruction::Return(None)],
        )
    }

    #[test]
    fn ordering_is_priority_then_order() {
        let mut events = [
            Event::new("c", false, 10, 0),
            Event::new("a", false, 5, 2),
            Event::new("b", false, 5, 1),
        ];
        events.sort();
        let names: Vec<_> = events.iter().map(Event::name).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn state_machine() {
        let event = event("onTick");
        let body = void_body();

        assert!(matches!(event.detach(), Err(Error::EventNotAttached(_))));
        event.attach(&body).unwrap();
        assert!(event.is_attached().unwrap());

        let again = event.attach(&body).unwrap_err();
        assert!(matches!(again, Error::EventAlreadyAttached { .. }));
        assert!(again.is_configuration());

        let attachment = event.attachment().unwrap().unwrap();
        assert_eq!(attachment.wrapper, WrapperType::EventInfo);
        assert!(!attachment.is_static);

        event.detach().unwrap();
        assert!(!event.is_attached().unwrap());
        event.attach(&body).unwrap();
    }

    #[test]
    fn inject_requires_matching_attachment() {
        let event = Arc::new(event("onTick"));
        let proxies = ProxyGenerator::new(&EngineConfig::default());
        let mut target = void_body();

        let result = event.inject(&mut target, 0, false, &proxies);
        assert!(matches!(result, Err(Error::EventNotAttached(_))));

        let other = body(
            "a/B",
            "other",
            "()V",
            MethodAccess::PUBLIC,
            vec![Instruction::Return(None)],
        );
        event.attach(&other).unwrap();
        let result = event.inject(&mut target, 0, false, &proxies);
        assert!(matches!(result, Err(Error::EventNotAttached(_))));
        assert_eq!(proxies.routine_count().unwrap(), 0);
    }

    #[test]
    fn inject_counts_and_registers_routine() {
        let event = Arc::new(event("onTick"));
        let proxies = ProxyGenerator::new(&EngineConfig::default());
        let mut target = void_body();

        event.attach(&target).unwrap();
        let routine = event.inject(&mut target, 0, false, &proxies).unwrap();
        assert_eq!(event.attachment().unwrap().unwrap().injections, 1);
        assert_eq!(routine.events().len(), 1);
        assert!(target.instructions.len() > 1);
        event.detach().unwrap();
    }

    #[test]
    fn failed_injection_discards_routine() {
        let event = Arc::new(event("onTick"));
        let proxies = ProxyGenerator::new(&EngineConfig::default());
        let mut target = void_body();
        let before = target.clone();

        event.attach(&target).unwrap();
        // past the final return: unreachable
        let result = event.inject(&mut target, 1, false, &proxies);
        assert!(matches!(result, Err(Error::Synthesis { .. })));
        assert_eq!(target, before);
        assert_eq!(proxies.routine_count().unwrap(), 0);
    }

    #[test]
    fn listeners_are_deduplicated() {
        let event = event("onTick");
        event.add_listener(ListenerRef::new("a/Hooks", "tick"));
        event.add_listener(ListenerRef::new("a.Hooks", "tick"));
        event.add_listener(ListenerRef::new("a/Hooks", "other"));
        assert_eq!(event.listener_count(), 2);
    }
}
