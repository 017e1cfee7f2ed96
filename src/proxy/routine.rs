use std::fmt;

use crossbeam_skiplist::SkipMap;

use crate::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
    event::{info::WrapperType, EventHandle},
    ir::{
        CallKind, CodeBuilder, GuardedCall, JumpCondition, LabelId, MethodAccess, MethodBody,
        MethodRef, MethodSignature, TypeDesc, ValueKind, STRING_CLASS,
    },
    Result,
};

/// Runtime support type receiving missing-listener reports.
pub const RUNTIME_SUPPORT_CLASS: &str = "eventscope/runtime/EventDiagnostics";

/// Fallback invoked when a listener's type is absent.
pub const ON_MISSING_CLASS: &str = "onMissingClass";

/// Fallback invoked when a listener's method is absent.
pub const ON_MISSING_METHOD: &str = "onMissingMethod";

fn missing_callback(name: &str) -> MethodRef {
    MethodRef::new(
        RUNTIME_SUPPORT_CLASS,
        name,
        MethodSignature::new(vec![TypeDesc::object(STRING_CLASS); 3], TypeDesc::Void),
    )
}

/// `onMissingClass(String event, String owner, String method)`.
#[must_use]
pub fn on_missing_class() -> MethodRef {
    missing_callback(ON_MISSING_CLASS)
}

/// `onMissingMethod(String event, String owner, String method)`.
#[must_use]
pub fn on_missing_method() -> MethodRef {
    missing_callback(ON_MISSING_METHOD)
}

/// A generated method dispatching every listener of every event at one site.
///
/// One routine exists per `(method body, insertion index)` with at least one event. Events
/// are kept in a skip list keyed by `(priority, order)`, so the dispatch order is fixed no
/// matter in which order events were added.
pub struct DispatchRoutine {
    id: u32,
    name: String,
    proxy_class: String,
    target: String,
    site: usize,
    signature: MethodSignature,
    cancellable: bool,
    events: SkipMap<(i32, u64), EventHandle>,
}

impl DispatchRoutine {
    pub(crate) fn new(
        id: u32,
        name: String,
        proxy_class: String,
        body: &MethodBody,
        wrapper: WrapperType,
        site: usize,
        cancellable: bool,
    ) -> Self {
        let mut params = Vec::with_capacity(body.signature.params.len() + 1);
        params.push(wrapper.type_desc());
        params.extend(body.signature.params.iter().cloned());

        DispatchRoutine {
            id,
            name,
            proxy_class,
            target: body.to_string(),
            site,
            signature: MethodSignature::new(params, TypeDesc::Void),
            cancellable,
            events: SkipMap::new(),
        }
    }

    /// Unique id within its generator.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Method name of the routine.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Internal name of the proxy type declaring the routine.
    #[must_use]
    pub fn proxy_class(&self) -> &str {
        &self.proxy_class
    }

    /// `owner.name(desc)` of the instrumented body.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Insertion index of the site in the instrumented body.
    #[must_use]
    pub fn site(&self) -> usize {
        self.site
    }

    /// `(wrapper, original arguments...)V`.
    #[must_use]
    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }

    /// Whether listeners may cancel at this site.
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        self.cancellable
    }

    /// Static reference used by the injected call.
    #[must_use]
    pub fn method_ref(&self) -> MethodRef {
        MethodRef::new(&self.proxy_class, &self.name, self.signature.clone())
    }

    /// Adds an event. Adding an event twice keeps one entry.
    pub fn add_event(&self, event: EventHandle) {
        self.events.insert((event.priority(), event.order()), event);
    }

    /// Events in dispatch order.
    #[must_use]
    pub fn events(&self) -> Vec<EventHandle> {
        self.events
            .iter()
            .map(|entry| EventHandle::clone(entry.value()))
            .collect()
    }

    /// Builds the body of the routine.
    ///
    /// For every event in order and every listener of that event, the wrapper and the
    /// arguments the listener accepts are reloaded and the listener is invoked through a
    /// [`GuardedCall`], so an absent listener reports to the runtime support type and the
    /// remaining listeners still run. At cancellable sites the wrapper is checked after each
    /// listener and the routine returns as soon as it is cancelled.
    ///
    /// Listeners whose explicit signature does not fit the routine are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if the generated body is inconsistent.
    pub fn generate(&self, diagnostics: &Diagnostics) -> Result<MethodBody> {
        let done = LabelId(0);
        let mut builder = CodeBuilder::new();

        self.emit_listeners(&mut builder, done, diagnostics)
            .and_then(|checked| {
                if checked {
                    builder.label(done)?;
                }
                builder.ret(None)?;
                Ok(())
            })
            .map_err(|e| synthesis_error!(self, "dispatch body could not be built: {}", e))?;

        let run = builder.finish();
        let mut body = MethodBody::new(
            &self.proxy_class,
            &self.name,
            self.signature.clone(),
            MethodAccess::PUBLIC | MethodAccess::STATIC | MethodAccess::SYNTHETIC,
        );
        body.instructions.replace(run.instructions);
        body.max_stack = run.peak;
        Ok(body)
    }

    /// Emits one guarded call per compatible listener, returns `true` if any cancellation
    /// check branching to `done` was emitted.
    fn emit_listeners(
        &self,
        builder: &mut CodeBuilder,
        done: LabelId,
        diagnostics: &Diagnostics,
    ) -> Result<bool> {
        let wrapper = self
            .signature
            .params
            .first()
            .and_then(TypeDesc::internal_name)
            .and_then(|name| WrapperType::from_class_name(&name))
            .unwrap_or(WrapperType::EventInfo);

        let mut checked = false;
        for event in self.events() {
            for listener in event.listeners() {
                let Some(signature) = listener.resolve(&self.signature) else {
                    diagnostics.push(
                        Diagnostic::new(
                            DiagnosticSeverity::Warning,
                            DiagnosticCategory::Dispatch,
                            format!(
                                "Listener {} does not accept {}, skipped",
                                listener, self.signature
                            ),
                        )
                        .with_method(self.target.clone())
                        .with_event(event.name())
                        .with_site(self.site),
                    );
                    continue;
                };

                builder.load_args(&signature, 0)?;
                builder.guarded_call(GuardedCall {
                    target: MethodRef::new(&listener.owner, &listener.method, signature),
                    context: event.name().to_string(),
                    on_missing_class: on_missing_class(),
                    on_missing_method: on_missing_method(),
                })?;

                if self.cancellable {
                    builder
                        .load(ValueKind::Reference, 0)?
                        .call(CallKind::Virtual, wrapper.is_cancelled())?
                        .jump(JumpCondition::IfNonZero, done)?;
                    checked = true;
                }
            }
        }
        Ok(checked)
    }
}

impl fmt::Debug for DispatchRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchRoutine")
            .field("name", &self.name)
            .field("proxy_class", &self.proxy_class)
            .field("target", &self.target)
            .field("site", &self.site)
            .field("cancellable", &self.cancellable)
            .field("events", &self.events().len())
            .finish()
    }
}

impl fmt::Display for DispatchRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.proxy_class, self.name, self.signature)
    }
}
