use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{
    context::EngineContext,
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    event::EventHandle,
    inject::Injection,
    ir::MethodBody,
    proxy::DispatchRoutine,
    Error, Result,
};

/// Result of transforming one method body.
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    /// `owner.name(desc)` of the body
    pub method: String,
    /// Whether the body was rewritten
    pub modified: bool,
    /// Number of distinct sites injected
    pub sites: usize,
    /// The routines the rewritten body calls, in descending site order
    pub routines: Vec<Arc<DispatchRoutine>>,
}

impl TransformOutcome {
    fn unmodified(body: &MethodBody) -> Self {
        TransformOutcome {
            method: body.to_string(),
            modified: false,
            sites: 0,
            routines: Vec::new(),
        }
    }
}

/// Detaches every event it attached when dropped, also on error paths.
struct AttachGuard {
    events: Vec<EventHandle>,
}

impl AttachGuard {
    fn attach(events: Vec<EventHandle>, body: &MethodBody) -> Result<Self> {
        let mut guard = AttachGuard {
            events: Vec::with_capacity(events.len()),
        };
        for event in events {
            event.attach(body)?;
            guard.events.push(event);
        }
        Ok(guard)
    }

    fn release(mut self) -> Result<()> {
        while let Some(event) = self.events.pop() {
            event.detach()?;
        }
        Ok(())
    }
}

impl Drop for AttachGuard {
    fn drop(&mut self) {
        for event in self.events.drain(..) {
            let _ = event.detach();
        }
    }
}

/// Runs the injection pass over method bodies.
///
/// For one body the pass
/// 1. selects every injection whose descriptor names the body,
/// 2. runs their locators and groups the events by insertion index,
/// 3. attaches every involved event,
/// 4. injects the sites from the last to the first, so earlier indices stay valid,
/// 5. detaches the events again.
///
/// At each site the events are sorted by `(priority, order)`; the first creates the dispatch
/// routine and carries its name in the wrapper, the others join the routine through
/// [`crate::event::Event::add_to_handler`].
///
/// # Shared cancellation
///
/// A site is cancellable if ANY event mapped to it is cancellable. A non-cancellable event
/// sharing a site with a cancellable one therefore sees the method return early when a
/// listener of the other event cancels, and its own listeners stop running once the wrapper
/// is cancelled.
///
/// # Failure handling
///
/// The body is rewritten on a copy. If synthesis fails the copy is dropped, the routines
/// allocated for the body are discarded, an error diagnostic is reported and the body is left
/// exactly as supplied.
pub struct Transformer<'a> {
    context: &'a EngineContext,
}

impl<'a> Transformer<'a> {
    /// Creates a transformer over the registrations of `context`.
    #[must_use]
    pub fn new(context: &'a EngineContext) -> Self {
        Transformer { context }
    }

    /// Transforms one body in place.
    ///
    /// A body that no injection targets, or in which no locator finds a site, is returned
    /// untouched with `modified == false`.
    ///
    /// # Errors
    ///
    /// Returns configuration errors (such as [`Error::EventAlreadyAttached`] when another pass
    /// holds one of the events) and [`Error::Synthesis`] if the body cannot be rewritten. In
    /// both cases `body` is unchanged.
    pub fn transform(&self, body: &mut MethodBody) -> Result<TransformOutcome> {
        let sites = self.locate(body);
        if sites.is_empty() {
            return Ok(TransformOutcome::unmodified(body));
        }

        let mut events: Vec<EventHandle> = Vec::new();
        for event in sites.values().flatten() {
            if !events.iter().any(|known| Arc::ptr_eq(known, event)) {
                events.push(Arc::clone(event));
            }
        }
        events.sort();

        let mut working = body.clone();
        let guard = AttachGuard::attach(events, &working)?;
        let mut routines = Vec::with_capacity(sites.len());

        match self.inject_sites(&mut working, &sites, &mut routines) {
            Ok(()) => {
                guard.release()?;
                *body = working;
                Ok(TransformOutcome {
                    method: body.to_string(),
                    modified: true,
                    sites: sites.len(),
                    routines,
                })
            }
            Err(error) => {
                drop(guard);
                for routine in &routines {
                    self.context.proxies().discard(routine)?;
                }
                if matches!(error, Error::Synthesis { .. }) {
                    self.context.diagnostics().push(
                        Diagnostic::new(
                            DiagnosticSeverity::Error,
                            DiagnosticCategory::Injection,
                            error.to_string(),
                        )
                        .with_method(body.to_string()),
                    );
                }
                Err(error)
            }
        }
    }

    /// Transforms every body, continuing past bodies that cannot be rewritten.
    ///
    /// Synthesis failures leave the affected body unchanged and are reported as error
    /// diagnostics. Afterwards every injection whose target type is among `bodies` but whose
    /// method is not is reported as a resolution miss.
    ///
    /// # Errors
    ///
    /// Aborts on the first error that is not a synthesis failure; those indicate an
    /// inconsistent event model.
    pub fn transform_all(&self, bodies: &mut [MethodBody]) -> Result<Vec<TransformOutcome>> {
        let mut outcomes = Vec::with_capacity(bodies.len());
        for body in bodies.iter_mut() {
            match self.transform(body) {
                Ok(outcome) => outcomes.push(outcome),
                Err(Error::Synthesis { .. }) => outcomes.push(TransformOutcome::unmodified(body)),
                Err(error) => return Err(error),
            }
        }
        self.report_unresolved(bodies);
        Ok(outcomes)
    }

    /// Reports injections whose target type is among `bodies` but whose method is not.
    ///
    /// Returns the number of misses reported.
    pub fn report_unresolved(&self, bodies: &[MethodBody]) -> usize {
        let order = &self.context.config().epoch_order;
        let missed = self.context.methods().unresolved(bodies, order);
        let mut misses = 0;
        for injection in self.context.injections() {
            let descriptor = &injection.target;
            if !missed.iter().any(|miss| Arc::ptr_eq(miss, descriptor)) {
                continue;
            }
            if bodies.iter().any(|body| descriptor.has_owner(&body.owner)) {
                misses += 1;
                self.context.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Resolution,
                        format!("No method matches {descriptor} under any naming epoch"),
                    )
                    .with_event(injection.event.name()),
                );
            }
        }
        misses
    }

    fn locate(&self, body: &MethodBody) -> BTreeMap<usize, Vec<EventHandle>> {
        let config = self.context.config();
        let mut sites: BTreeMap<usize, Vec<EventHandle>> = BTreeMap::new();
        let targets = self.context.methods().resolve(body, &config.epoch_order);
        if targets.is_empty() {
            return sites;
        }

        for injection in self.context.injections() {
            if !targets.iter().any(|target| Arc::ptr_eq(target, &injection.target)) {
                continue;
            }

            let found = injection
                .locator
                .find(&body.signature, &body.instructions, &injection.event);
            if config.verbose {
                self.context.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Info,
                        DiagnosticCategory::Locator,
                        format!("{} found {} point(s)", injection.locator.name(), found.len()),
                    )
                    .with_method(body.to_string())
                    .with_event(injection.event.name()),
                );
            }

            for site in found {
                let events = sites.entry(site.insertion_index()).or_default();
                if !events.iter().any(|known| Arc::ptr_eq(known, &injection.event)) {
                    events.push(Arc::clone(&injection.event));
                }
            }
        }
        sites
    }

    fn inject_sites(
        &self,
        working: &mut MethodBody,
        sites: &BTreeMap<usize, Vec<EventHandle>>,
        routines: &mut Vec<Arc<DispatchRoutine>>,
    ) -> Result<()> {
        let proxies = self.context.proxies();
        let diagnostics = self.context.diagnostics();

        for (index, events) in sites.iter().rev() {
            let mut events = events.clone();
            events.sort();
            let cancellable = events.iter().any(|event| event.is_cancellable());

            let Some((lead, rest)) = events.split_first() else {
                continue;
            };
            let routine = lead.inject(working, *index, cancellable, proxies)?;
            routines.push(Arc::clone(&routine));
            for event in rest {
                event.add_to_handler(&routine)?;
            }

            for event in &events {
                diagnostics.push(
                    Diagnostic::new(
                        DiagnosticSeverity::Info,
                        DiagnosticCategory::Injection,
                        format!("Event {} injected at site {} via {}", event, index, routine),
                    )
                    .with_method(working.to_string())
                    .with_event(event.name())
                    .with_site(*index),
                );
            }
        }

        let required = working
            .required_max_stack()
            .map_err(|e| synthesis_error!(working, "rewritten body is inconsistent: {}", e))?;
        if required > working.max_stack {
            return Err(synthesis_error!(
                working,
                "max_stack {} is below the required {}",
                working.max_stack,
                required
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for Transformer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        descriptor::MethodDescriptor,
        event::ListenerRef,
        ir::{Instruction, LabelId, MethodAccess},
        locator::{BeforeReturn, Head},
        test::body,
    };

    fn tick_body() -> MethodBody {
        body(
            "game/World",
            "tick",
            "()V",
            MethodAccess::PUBLIC,
            vec![Instruction::Nop, Instruction::Return(None)],
        )
    }

    #[test]
    fn untargeted_body_is_untouched() {
        let context = EngineContext::default();
        let mut target = tick_body();
        let before = target.clone();
        let outcome = context.transformer().transform(&mut target).unwrap();
        assert!(!outcome.modified);
        assert_eq!(target, before);
    }

    #[test]
    fn events_are_detached_after_transform() {
        let context = EngineContext::default();
        let event = context.define_event("onTick", false, 0).unwrap();
        context
            .register_injection(
                &event,
                MethodDescriptor::new("game/World", "tick", "()V").unwrap(),
                Head,
            )
            .unwrap();
        context
            .add_listener(&event, ListenerRef::new("mods/Hooks", "tick"))
            .unwrap();

        let mut target = tick_body();
        let outcome = context.transformer().transform(&mut target).unwrap();
        assert!(outcome.modified);
        assert_eq!(outcome.sites, 1);
        assert!(!event.is_attached().unwrap());
        assert_eq!(
            context
                .diagnostics()
                .by_category(DiagnosticCategory::Injection)
                .len(),
            1
        );
    }

    #[test]
    fn co_located_events_share_one_routine() {
        let context = EngineContext::default();
        let a = context.define_event("a", false, 10).unwrap();
        let b = context.define_event("b", true, 5).unwrap();
        let descriptor = MethodDescriptor::new("game/World", "tick", "()V").unwrap();
        context
            .register_injection(&a, descriptor.clone(), BeforeReturn::new())
            .unwrap();
        context
            .register_injection(&b, descriptor, BeforeReturn::new())
            .unwrap();

        let mut target = tick_body();
        let outcome = context.transformer().transform(&mut target).unwrap();
        assert_eq!(outcome.routines.len(), 1);
        let routine = &outcome.routines[0];
        assert!(routine.is_cancellable());
        let names: Vec<_> = routine
            .events()
            .iter()
            .map(|event| event.name().to_string())
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn held_event_aborts_without_changes() {
        let context = EngineContext::default();
        let event = context.define_event("onTick", false, 0).unwrap();
        context
            .register_injection(
                &event,
                MethodDescriptor::new("game/World", "tick", "()V").unwrap(),
                Head,
            )
            .unwrap();

        let other = body(
            "game/World",
            "other",
            "()V",
            MethodAccess::PUBLIC,
            vec![Instruction::Return(None)],
        );
        event.attach(&other).unwrap();

        let mut target = tick_body();
        let before = target.clone();
        let err = context.transformer().transform(&mut target).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(target, before);
        assert_eq!(context.proxies().routine_count().unwrap(), 0);
        event.detach().unwrap();
    }

    #[test]
    fn shared_target_resolves_once_for_every_injection() {
        let context = EngineContext::default();
        let early = context.define_event("early", false, 0).unwrap();
        let late = context.define_event("late", false, 1).unwrap();
        for event in [&early, &late] {
            context
                .register_injection(
                    event,
                    MethodDescriptor::new("game/World", "tick", "()V").unwrap(),
                    Head,
                )
                .unwrap();
        }
        assert_eq!(context.methods().len(), 1);

        let mut target = tick_body();
        let outcome = context.transformer().transform(&mut target).unwrap();
        assert_eq!(outcome.sites, 1);
        assert_eq!(outcome.routines[0].events().len(), 2);
    }

    #[test]
    fn unresolved_targets_come_from_the_registry() {
        let context = EngineContext::default();
        let event = context.define_event("onTick", false, 0).unwrap();
        for name in ["tick", "render"] {
            context
                .register_injection(
                    &event,
                    MethodDescriptor::new("game/World", name, "()V").unwrap(),
                    Head,
                )
                .unwrap();
        }
        context
            .register_injection(
                &event,
                MethodDescriptor::new("game/Other", "run", "()V").unwrap(),
                Head,
            )
            .unwrap();

        let bodies = [tick_body()];
        assert_eq!(context.transformer().report_unresolved(&bodies), 1);
        assert_eq!(
            context
                .diagnostics()
                .by_category(DiagnosticCategory::Resolution)
                .len(),
            1
        );
    }

    #[test]
    fn exhausted_label_ids_fail_synthesis() {
        let context = EngineContext::default();
        let event = context.define_event("onExit", true, 0).unwrap();
        context
            .register_injection(
                &event,
                MethodDescriptor::new("game/World", "tick", "()V").unwrap(),
                BeforeReturn::new(),
            )
            .unwrap();

        let mut target = body(
            "game/World",
            "tick",
            "()V",
            MethodAccess::PUBLIC,
            vec![Instruction::Label(LabelId(u32::MAX)), Instruction::Return(None)],
        );
        let before = target.clone();
        let err = context.transformer().transform(&mut target).unwrap_err();
        assert!(matches!(err, Error::Synthesis { .. }));
        assert_eq!(target, before);
        assert_eq!(context.proxies().routine_count().unwrap(), 0);
        assert!(!event.is_attached().unwrap());

        let mut bodies = [target];
        let outcomes = context.transformer().transform_all(&mut bodies).unwrap();
        assert!(!outcomes[0].modified);
        assert_eq!(bodies[0], before);
    }
}
