//! The engine context owning every registry of one injection engine.
//!
//! The [`EngineContext`] is the single entry point of registration code and of the
//! transformation passes. It owns the event and method registries, the injection and
//! redirect registrations, the proxy arena and the diagnostics sink, so several independent
//! engines can coexist in one process (one per test, for example).

use std::{fmt, sync::Arc};

use crate::{
    config::EngineConfig,
    descriptor::{MethodDescriptor, MethodRegistry},
    diagnostics::Diagnostics,
    event::{EventHandle, EventRegistry, ListenerRef},
    inject::{Injection, Transformer},
    locator::InjectionPoint,
    proxy::{GeneratedProxy, ProxyGenerator},
    redirect::{RedirectKind, RedirectRegistry, RedirectTransformer},
    Error, Result,
};

/// Shared state of one injection engine.
///
/// Registration methods take `&self` and may be called from several threads; every
/// collection is append-only.
///
/// # Example
///
/// ```rust
/// use eventscope::descriptor::MethodDescriptor;
/// use eventscope::event::ListenerRef;
/// use eventscope::ir::{Instruction, MethodAccess, MethodBody, MethodSignature};
/// use eventscope::locator::Head;
/// use eventscope::EngineContext;
///
/// let context = EngineContext::default();
/// let tick = context.define_event("onTick", false, 0)?;
/// context.register_injection(&tick, MethodDescriptor::new("game/World", "tick", "()V")?, Head)?;
/// context.add_listener(&tick, ListenerRef::parse("mods.Hooks.onTick")?)?;
///
/// let mut body = MethodBody::new(
///     "game/World",
///     "tick",
///     MethodSignature::parse("()V")?,
///     MethodAccess::PUBLIC,
/// )
/// .with_instructions(vec![Instruction::Return(None)])?;
///
/// let outcome = context.transformer().transform(&mut body)?;
/// assert!(outcome.modified);
///
/// let proxies = context.generate_proxies()?;
/// assert_eq!(proxies.len(), 1);
/// assert_eq!(proxies[0].methods.len(), 1);
/// # Ok::<(), eventscope::Error>(())
/// ```
pub struct EngineContext {
    config: EngineConfig,
    diagnostics: Arc<Diagnostics>,
    events: EventRegistry,
    methods: MethodRegistry,
    injections: boxcar::Vec<Arc<Injection>>,
    proxies: ProxyGenerator,
    redirects: RedirectRegistry,
}

impl EngineContext {
    /// Creates a context with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration, validated before use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `config` is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: EngineConfig) -> Self {
        EngineContext {
            proxies: ProxyGenerator::new(&config),
            config,
            diagnostics: Arc::new(Diagnostics::new()),
            events: EventRegistry::new(),
            methods: MethodRegistry::new(),
            injections: boxcar::Vec::new(),
            redirects: RedirectRegistry::new(),
        }
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The diagnostics sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// The event registry.
    #[must_use]
    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Every descriptor named by an injection or redirect.
    #[must_use]
    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    /// The proxy arena.
    #[must_use]
    pub fn proxies(&self) -> &ProxyGenerator {
        &self.proxies
    }

    /// The redirect registry.
    #[must_use]
    pub fn redirects(&self) -> &RedirectRegistry {
        &self.redirects
    }

    /// Iterates the injection registrations in registration order.
    pub fn injections(&self) -> impl Iterator<Item = &Arc<Injection>> {
        self.injections.iter().map(|(_, injection)| injection)
    }

    /// Defines an event, or returns the existing event of the same name.
    ///
    /// See [`EventRegistry::define`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateEvent`] if the name exists with a different cancellable flag.
    pub fn define_event(&self, name: &str, cancellable: bool, priority: i32) -> Result<EventHandle> {
        self.events.define(name, cancellable, priority)
    }

    /// Looks up an event by name, ignoring ASCII case.
    #[must_use]
    pub fn event(&self, name: &str) -> Option<EventHandle> {
        self.events.get(name)
    }

    /// Injects `event` into the method named by `target` wherever `locator` finds a site.
    ///
    /// # Arguments
    ///
    /// * `event` - An event defined in this context.
    /// * `target` - The target method under one or more naming epochs.
    /// * `locator` - Strategy finding the injection sites.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `event` was not defined in this context.
    pub fn register_injection(
        &self,
        event: &EventHandle,
        target: MethodDescriptor,
        locator: impl InjectionPoint + 'static,
    ) -> Result<Arc<Injection>> {
        self.ensure_owned(event)?;
        let injection = Arc::new(Injection {
            event: Arc::clone(event),
            target: self.methods.register(target),
            locator: Box::new(locator),
        });
        self.injections.push(Arc::clone(&injection));
        Ok(injection)
    }

    /// Adds a listener to `event`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEvent`] if `event` was not defined in this context.
    pub fn add_listener(&self, event: &EventHandle, listener: ListenerRef) -> Result<()> {
        self.ensure_owned(event)?;
        event.add_listener(listener);
        Ok(())
    }

    /// Queues a redirect handler for `target`.
    ///
    /// See [`RedirectRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `target` already has handlers of another kind.
    pub fn register_redirect(
        &self,
        target: MethodDescriptor,
        handler: ListenerRef,
        kind: RedirectKind,
        earliest: bool,
    ) -> Result<()> {
        let target = self.methods.register(target);
        self.redirects.register(target, handler, kind, earliest)
    }

    /// A transformer running the injection pass.
    #[must_use]
    pub fn transformer(&self) -> Transformer<'_> {
        Transformer::new(self)
    }

    /// A transformer applying redirects.
    #[must_use]
    pub fn redirector(&self) -> RedirectTransformer<'_> {
        RedirectTransformer::new(self)
    }

    /// Emits the proxy types for every routine allocated so far.
    ///
    /// # Errors
    ///
    /// Returns an error if a routine body cannot be generated.
    pub fn generate_proxies(&self) -> Result<Vec<GeneratedProxy>> {
        self.proxies.generate(&self.diagnostics)
    }

    fn ensure_owned(&self, event: &EventHandle) -> Result<()> {
        if self.events.owns(event) {
            Ok(())
        } else {
            Err(Error::UnknownEvent(event.name().to_string()))
        }
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::with_valid_config(EngineConfig::default())
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("events", &self.events.len())
            .field("methods", &self.methods.len())
            .field("injections", &self.injections.count())
            .field("redirects", &self.redirects.len())
            .finish()
    }
}
