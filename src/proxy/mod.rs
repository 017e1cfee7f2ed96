//! Generated dispatch routines and the proxy types declaring them.
//!
//! Every injection site calls exactly one static dispatch routine. The routine receives the
//! wrapper and the original arguments and invokes every listener of every event at the site
//! through guarded calls, so a listener that is missing at execution time is reported to the
//! runtime support type instead of aborting the remaining listeners.
//!
//! # Key Components
//!
//! - [`DispatchRoutine`] - One routine per site, with its events in dispatch order
//! - [`ProxyGenerator`] - Arena of proxy types with spill slots
//! - [`GeneratedProxy`] - A finished proxy type handed to the host
//!
//! # Runtime support
//!
//! Missing listeners are reported to [`RUNTIME_SUPPORT_CLASS`] through
//! [`ON_MISSING_CLASS`] and [`ON_MISSING_METHOD`], each receiving the event name, the listener
//! owner and the listener method name.

mod generator;
mod routine;

pub use generator::{GeneratedProxy, ProxyGenerator};
pub use routine::{
    on_missing_class, on_missing_method, DispatchRoutine, ON_MISSING_CLASS, ON_MISSING_METHOD,
    RUNTIME_SUPPORT_CLASS,
};
