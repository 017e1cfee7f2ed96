//! Target method identification across naming epochs.
//!
//! The host program ships under obfuscated names that change per release, while registrations
//! are usually written against readable names. A [`MethodDescriptor`] bundles every known alias
//! of one method; the engine tries them against each supplied body in the configured
//! [`NamingEpoch`] order.
//!
//! # Key Components
//!
//! - [`NamingEpoch`] - The parallel naming schemes
//! - [`MethodDescriptor`] - Immutable per-epoch alias set
//! - [`MethodRegistry`] - Shared, append-only store of descriptors

mod method;
mod registry;

pub use method::{MethodAlias, MethodDescriptor, MethodDescriptorBuilder, NamingEpoch};
pub use registry::MethodRegistry;
