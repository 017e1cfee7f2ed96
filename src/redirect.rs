//! One-shot callback redirection.
//!
//! Redirection is the simpler sibling of event injection: a target method is either replaced
//! by calls to a queue of static handlers, or has those calls prepended to its original code.
//! There is no wrapper, no cancellation, no priority and no merging; handlers receive the
//! receiver (for instance methods) followed by every argument and run in queue order.
//!
//! # Example
//!
//! ```rust
//! use eventscope::descriptor::MethodDescriptor;
//! use eventscope::event::ListenerRef;
//! use eventscope::ir::{Instruction, MethodAccess, MethodBody, MethodSignature};
//! use eventscope::redirect::RedirectKind;
//! use eventscope::EngineContext;
//!
//! let context = EngineContext::default();
//! context.register_redirect(
//!     MethodDescriptor::new("game/Net", "send", "(I)V")?,
//!     ListenerRef::new("mods/Net", "send"),
//!     RedirectKind::Prepend,
//!     false,
//! )?;
//!
//! let mut body = MethodBody::new(
//!     "game/Net",
//!     "send",
//!     MethodSignature::parse("(I)V")?,
//!     MethodAccess::PUBLIC | MethodAccess::STATIC,
//! )
//! .with_instructions(vec![Instruction::Return(None)])?;
//!
//! assert!(context.redirector().transform(&mut body)?);
//! assert_eq!(body.instructions.len(), 3);
//! # Ok::<(), eventscope::Error>(())
//! ```

use std::{collections::VecDeque, fmt, sync::Arc};

use dashmap::DashMap;
use strum::Display;

use crate::{
    context::EngineContext,
    descriptor::{MethodDescriptor, NamingEpoch},
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity},
    event::ListenerRef,
    ir::{CallKind, CodeBuilder, MethodBody, MethodRef, MethodSignature, TypeDesc, ValueKind},
    Result,
};

/// How handler calls are combined with the original code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum RedirectKind {
    /// The original code is dropped; the last handler's result is returned
    Replace,
    /// Handler calls run first, then the original code
    Prepend,
}

/// Snapshot of the handlers registered for one method.
#[derive(Debug, Clone, PartialEq)]
pub struct Redirect {
    /// How the handlers are combined with the original code
    pub kind: RedirectKind,
    /// Handlers in call order
    pub handlers: Vec<ListenerRef>,
}

#[derive(Debug)]
struct RedirectQueue {
    kind: RedirectKind,
    handlers: VecDeque<ListenerRef>,
}

/// Per-method handler queues.
#[derive(Debug, Default)]
pub struct RedirectRegistry {
    queues: DashMap<Arc<MethodDescriptor>, RedirectQueue>,
}

impl RedirectRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `handler` for `target`.
    ///
    /// Handlers run first-in first-out; `earliest` puts the handler at the front of the
    /// queue instead. Queuing the same handler twice has no effect.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if `target` already has handlers of a
    /// different kind.
    pub fn register(
        &self,
        target: Arc<MethodDescriptor>,
        handler: ListenerRef,
        kind: RedirectKind,
        earliest: bool,
    ) -> Result<()> {
        let mut queue = self.queues.entry(target).or_insert_with(|| RedirectQueue {
            kind,
            handlers: VecDeque::new(),
        });

        if queue.kind != kind {
            return Err(config_error!(
                "Redirect of {} is registered as {}, cannot add {} handler {}",
                queue.key(),
                queue.kind,
                kind,
                handler
            ));
        }
        if queue.handlers.contains(&handler) {
            return Ok(());
        }
        if earliest {
            queue.handlers.push_front(handler);
        } else {
            queue.handlers.push_back(handler);
        }
        Ok(())
    }

    /// The redirect for `body`, if any descriptor names it under one of the epochs in `order`.
    #[must_use]
    pub fn find(&self, body: &MethodBody, order: &[NamingEpoch]) -> Option<Redirect> {
        self.queues.iter().find_map(|entry| {
            entry.key().resolve_body(body, order).map(|_| Redirect {
                kind: entry.kind,
                handlers: entry.handlers.iter().cloned().collect(),
            })
        })
    }

    /// Number of redirected methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Returns `true` if nothing is redirected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

/// Applies registered redirects to method bodies.
pub struct RedirectTransformer<'a> {
    context: &'a EngineContext,
}

impl<'a> RedirectTransformer<'a> {
    /// Creates a transformer over the redirects of `context`.
    #[must_use]
    pub fn new(context: &'a EngineContext) -> Self {
        RedirectTransformer { context }
    }

    /// Applies the redirect registered for `body`, if any.
    ///
    /// Handlers whose explicit signature differs from the one the redirect calls them with
    /// (receiver, then the method's parameters, returning the method's return type) are
    /// skipped with a warning. Returns whether the body was rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if the handler calls cannot be emitted; `body` is
    /// left unchanged.
    pub fn transform(&self, body: &mut MethodBody) -> Result<bool> {
        let order = &self.context.config().epoch_order;
        let Some(redirect) = self.context.redirects().find(body, order) else {
            return Ok(false);
        };

        let signature = handler_signature(body);
        let handlers: Vec<MethodRef> = redirect
            .handlers
            .iter()
            .filter_map(|handler| self.bind(body, handler, &signature))
            .collect();
        if handlers.is_empty() {
            return Ok(false);
        }

        let ret = body.signature.ret.value_kind();
        let mut builder = CodeBuilder::new();
        let emitted = match redirect.kind {
            RedirectKind::Replace => emit_replace(&mut builder, &signature, &handlers, ret),
            RedirectKind::Prepend => emit_prepend(&mut builder, &signature, &handlers, ret),
        };
        emitted.map_err(|e| synthesis_error!(body, "redirect: {}", e))?;
        let run = builder.finish();

        match redirect.kind {
            RedirectKind::Replace => {
                body.instructions.replace(run.instructions);
                body.max_stack = run.peak;
            }
            RedirectKind::Prepend => {
                body.instructions.insert(0, run.instructions)?;
                body.max_stack = body.max_stack.max(run.peak);
            }
        }

        self.context.diagnostics().push(
            Diagnostic::new(
                DiagnosticSeverity::Info,
                DiagnosticCategory::Redirect,
                format!("{} redirected to {} handler(s)", redirect.kind, handlers.len()),
            )
            .with_method(body.to_string()),
        );
        Ok(true)
    }

    fn bind(
        &self,
        body: &MethodBody,
        handler: &ListenerRef,
        signature: &MethodSignature,
    ) -> Option<MethodRef> {
        match &handler.signature {
            Some(explicit) if explicit != signature => {
                self.context.diagnostics().push(
                    Diagnostic::new(
                        DiagnosticSeverity::Warning,
                        DiagnosticCategory::Redirect,
                        format!("Handler {handler} does not accept {signature}, skipped"),
                    )
                    .with_method(body.to_string()),
                );
                None
            }
            _ => Some(MethodRef::new(
                &handler.owner,
                &handler.method,
                signature.clone(),
            )),
        }
    }
}

impl fmt::Debug for RedirectTransformer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectTransformer").finish_non_exhaustive()
    }
}

/// Receiver (for instance methods) followed by the parameters, returning the method's type.
fn handler_signature(body: &MethodBody) -> MethodSignature {
    let mut params = Vec::with_capacity(body.signature.params.len() + 1);
    if !body.is_static() {
        params.push(TypeDesc::object(&body.owner));
    }
    params.extend(body.signature.params.iter().cloned());
    MethodSignature::new(params, body.signature.ret.clone())
}

fn emit_replace(
    builder: &mut CodeBuilder,
    signature: &MethodSignature,
    handlers: &[MethodRef],
    ret: Option<ValueKind>,
) -> Result<()> {
    let last = handlers.len().saturating_sub(1);
    for (position, handler) in handlers.iter().enumerate() {
        builder
            .load_args(signature, 0)?
            .call(CallKind::Static, handler.clone())?;
        if position != last {
            if let Some(kind) = ret {
                builder.discard(kind)?;
            }
        }
    }
    builder.ret(ret)?;
    Ok(())
}

fn emit_prepend(
    builder: &mut CodeBuilder,
    signature: &MethodSignature,
    handlers: &[MethodRef],
    ret: Option<ValueKind>,
) -> Result<()> {
    for handler in handlers {
        builder
            .load_args(signature, 0)?
            .call(CallKind::Static, handler.clone())?;
        if let Some(kind) = ret {
            builder.discard(kind)?;
        }
    }
    Ok(())
}
