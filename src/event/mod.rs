//! Events, listeners and the wrapper model.
//!
//! An [`Event`] is a named, prioritised unit of instrumentation. Registration code defines
//! events in an [`EventRegistry`], adds [`ListenerRef`]s to them and maps them to target
//! methods through injections. During a transformation pass each event is attached to the
//! body being rewritten, injected at every located site and detached again.
//!
//! # Key Components
//!
//! - [`Event`] / [`EventHandle`] - The event and its attachment state machine
//! - [`ListenerRef`] - An external callback
//! - [`EventRegistry`] - Case-insensitive registry with creation ordering
//! - [`info`] - Wrapper types and their accessors
//!
//! # Ordering
//!
//! When several events share a site they dispatch by ascending priority, ties broken by
//! creation order. Listeners of one event run in registration order, although callers
//! must not rely on that.

#[allow(clippy::module_inception)]
mod event;
pub mod info;
mod listener;
mod registry;

pub use event::{Attachment, Event, EventHandle};
pub use info::WrapperType;
pub use listener::ListenerRef;
pub use registry::EventRegistry;
