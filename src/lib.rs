// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

//! # eventscope
//!
//! An event-injection engine for structured method bodies. `eventscope` locates points inside
//! the instruction sequence of a compiled method, rewrites the method to invoke a dynamically
//! assembled set of external callbacks at each point, and optionally lets those callbacks cancel
//! the rest of the method with a synthesized return value.
//!
//! ## Features
//!
//! - **Composable locators** - Method head, returns, calls (with ordinal or constant argument),
//!   field accesses, allocations, jumps, plus `Shift`, `And` and `Or` combinators
//! - **Exact bookkeeping** - Injected code keeps `max_stack` / `max_locals` consistent with a
//!   stack-depth analysis of the rewritten body
//! - **Merged dispatch** - Events landing on one site share one generated routine, dispatched by
//!   `(priority, creation order)`
//! - **Naming epochs** - Targets are matched under obfuscated, intermediate and readable names
//! - **Fault isolation** - Listener calls are guarded; a missing listener is reported and skipped
//! - **Reference interpreter** - Rewritten bodies can be executed to verify their behaviour
//!
//! ## Quick Start
//!
//! ```rust
//! use eventscope::prelude::*;
//!
//! let context = EngineContext::default();
//! let load = context.define_event("onLoad", true, 1000)?;
//! context.add_listener(&load, ListenerRef::parse("mods.Hooks.onLoad")?)?;
//! context.register_injection(
//!     &load,
//!     MethodDescriptor::builder()
//!         .alias(NamingEpoch::Deobfuscated, "game/Client", "load", "()Z")?
//!         .alias(NamingEpoch::Obfuscated, "a", "b", "()Z")?
//!         .build()?,
//!     Head,
//! )?;
//!
//! let mut body = MethodBody::new(
//!     "a",
//!     "b",
//!     MethodSignature::parse("()Z")?,
//!     MethodAccess::PUBLIC,
//! )
//! .with_instructions(vec![
//!     Instruction::Const(Constant::Int(1)),
//!     Instruction::Return(Some(ValueKind::Int)),
//! ])?;
//!
//! let outcome = context.transformer().transform(&mut body)?;
//! assert!(outcome.modified);
//! assert_eq!(body.required_max_stack()?, body.max_stack);
//! # Ok::<(), eventscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - Method bodies, instructions and the stack-depth analysis
//! - [`descriptor`] - Target methods under several naming epochs
//! - [`locator`] - Injection-point search strategies
//! - [`event`] - Events, listeners and the wrapper model
//! - [`inject`] - Code synthesis and the transformation pass
//! - [`proxy`] - Generated dispatch routines
//! - [`redirect`] - One-shot callback redirection
//! - [`emulation`] - Reference interpreter for rewritten bodies
//!
//! All registries live in an [`EngineContext`]; every fallible operation returns [`Result`].
#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use eventscope::prelude::*;
///
/// let context = EngineContext::default();
/// let event = context.define_event("onTick", false, 0)?;
/// assert_eq!(event.name(), "onTick");
/// # Ok::<(), eventscope::Error>(())
/// ```
pub mod prelude;

pub mod config;
pub mod context;
pub mod descriptor;
pub mod diagnostics;
pub mod emulation;
pub mod event;
pub mod inject;
pub mod ir;
pub mod locator;
pub mod proxy;
pub mod redirect;

/// `eventscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `eventscope` Error type
///
/// The main error type for all operations in this crate. See [`Error::is_configuration`] for
/// the split between fatal registration mistakes and per-method failures.
pub use error::Error;

/// Owner of every registry of one engine
pub use context::EngineContext;
