//! Shared registry of target method descriptors.

use std::sync::Arc;

use crate::{
    descriptor::{MethodDescriptor, NamingEpoch},
    ir::MethodBody,
};

/// Append-only store of every descriptor named by a registration.
///
/// Registering the same descriptor twice returns the existing entry, so injections and
/// redirections that target one method share one `Arc`.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    descriptors: boxcar::Vec<Arc<MethodDescriptor>>,
}

impl MethodRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `descriptor`, returning the shared entry.
    pub fn register(&self, descriptor: MethodDescriptor) -> Arc<MethodDescriptor> {
        if let Some(existing) = self.iter().find(|known| ***known == descriptor) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(descriptor);
        self.descriptors.push(Arc::clone(&shared));
        shared
    }

    /// Number of distinct descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.count()
    }

    /// Returns `true` if nothing was registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates the descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MethodDescriptor>> {
        self.descriptors.iter().map(|(_, descriptor)| descriptor)
    }

    /// Every descriptor that names `body` under one of the epochs in `order`.
    #[must_use]
    pub fn resolve(&self, body: &MethodBody, order: &[NamingEpoch]) -> Vec<Arc<MethodDescriptor>> {
        self.iter()
            .filter(|descriptor| descriptor.resolve_body(body, order).is_some())
            .cloned()
            .collect()
    }

    /// Descriptors that name none of `bodies`.
    #[must_use]
    pub fn unresolved(
        &self,
        bodies: &[MethodBody],
        order: &[NamingEpoch],
    ) -> Vec<Arc<MethodDescriptor>> {
        self.iter()
            .filter(|descriptor| {
                !bodies
                    .iter()
                    .any(|body| descriptor.resolve_body(body, order).is_some())
            })
            .cloned()
            .collect()
    }
}
