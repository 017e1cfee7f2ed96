//! Code synthesis at injection sites and the transformation pass.
//!
//! - [`Injector`] splices the wrapper construction, dispatch call and cancellation check into
//!   one body at one site, keeping `max_stack` / `max_locals` consistent.
//! - [`Transformer`] drives a pass: resolve registrations against a body, locate sites, merge
//!   co-located events, inject and detach.
//! - [`Injection`] is one registration mapping an event to a target method and locator.

use std::{fmt, sync::Arc};

use crate::{descriptor::MethodDescriptor, event::EventHandle, locator::InjectionPoint};

mod injector;
mod transformer;

pub use injector::{InjectionReport, Injector};
pub use transformer::{TransformOutcome, Transformer};

/// One registered mapping of an event to a site search in a target method.
pub struct Injection {
    /// The injected event
    pub event: EventHandle,
    /// The target method
    pub target: Arc<MethodDescriptor>,
    /// How sites are located in the target
    pub locator: Box<dyn InjectionPoint>,
}

impl fmt::Debug for Injection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injection")
            .field("event", &self.event.name())
            .field("target", &self.target.to_string())
            .field("locator", &self.locator)
            .finish()
    }
}
