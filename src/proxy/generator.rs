use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};

use crate::{
    config::EngineConfig,
    diagnostics::Diagnostics,
    event::info::WrapperType,
    ir::MethodBody,
    proxy::DispatchRoutine,
    Result,
};

/// One generated proxy type and the routines it declares.
#[derive(Debug)]
struct ProxySlot {
    name: String,
    routines: Vec<Arc<DispatchRoutine>>,
}

/// A finished proxy type, ready to be assembled by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProxy {
    /// Internal name of the type
    pub name: String,
    /// Generated static dispatch routines
    pub methods: Vec<MethodBody>,
}

/// Allocates dispatch routines into an arena of proxy types.
///
/// The arena starts with one slot named after [`EngineConfig::proxy_class_name`]. Once the
/// active slot declares [`EngineConfig::max_proxy_methods`] routines, a new slot is opened
/// with the spill index appended (`EventProxy$1`, `EventProxy$2`, ...). Routine names are
/// derived from a global id, so a reference handed to injected code stays valid no matter
/// which slot the routine lands in.
///
/// # Example
///
/// ```rust
/// use eventscope::config::EngineConfig;
/// use eventscope::event::WrapperType;
/// use eventscope::ir::{Instruction, MethodAccess, MethodBody, MethodSignature};
/// use eventscope::proxy::ProxyGenerator;
///
/// let config = EngineConfig::default().with_max_proxy_methods(1);
/// let proxies = ProxyGenerator::new(&config);
/// let body = MethodBody::new("a/B", "m", MethodSignature::parse("()V")?, MethodAccess::STATIC);
///
/// let first = proxies.allocate(&body, WrapperType::EventInfo, 0, false)?;
/// let second = proxies.allocate(&body, WrapperType::EventInfo, 3, false)?;
/// assert_eq!(first.proxy_class(), "eventscope/runtime/EventProxy");
/// assert_eq!(second.proxy_class(), "eventscope/runtime/EventProxy$1");
/// assert_eq!(second.name(), "$event00002");
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Debug)]
pub struct ProxyGenerator {
    class_name: String,
    prefix: String,
    capacity: usize,
    next_id: AtomicU32,
    slots: Mutex<Vec<ProxySlot>>,
}

impl ProxyGenerator {
    /// Creates an empty arena.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        ProxyGenerator {
            class_name: config.proxy_class_name.clone(),
            prefix: config.dispatch_prefix.clone(),
            capacity: config.max_proxy_methods.max(1),
            next_id: AtomicU32::new(1),
            slots: Mutex::new(Vec::new()),
        }
    }

    fn slot_name(&self, index: usize) -> String {
        if index == 0 {
            self.class_name.clone()
        } else {
            format!("{}${}", self.class_name, index)
        }
    }

    /// Creates a routine for the site at `site` of `body` in the active slot.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn allocate(
        &self,
        body: &MethodBody,
        wrapper: WrapperType,
        site: usize,
        cancellable: bool,
    ) -> Result<Arc<DispatchRoutine>> {
        let mut slots = lock!(self.slots);
        let spill = match slots.last() {
            Some(active) => active.routines.len() >= self.capacity,
            None => true,
        };
        if spill {
            let name = self.slot_name(slots.len());
            slots.push(ProxySlot {
                name,
                routines: Vec::new(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = slots
            .last_mut()
            .ok_or_else(|| crate::Error::Error("proxy arena has no active slot".into()))?;
        let routine = Arc::new(DispatchRoutine::new(
            id,
            format!("{}{:05}", self.prefix, id),
            slot.name.clone(),
            body,
            wrapper,
            site,
            cancellable,
        ));
        slot.routines.push(Arc::clone(&routine));
        Ok(routine)
    }

    /// Removes a routine whose injection was abandoned.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn discard(&self, routine: &DispatchRoutine) -> Result<()> {
        let mut slots = lock!(self.slots);
        for slot in slots.iter_mut() {
            slot.routines.retain(|known| known.id() != routine.id());
        }
        Ok(())
    }

    /// Number of live routines over all slots.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn routine_count(&self) -> Result<usize> {
        Ok(lock!(self.slots).iter().map(|slot| slot.routines.len()).sum())
    }

    /// Number of opened slots, including slots emptied by discards.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn slot_count(&self) -> Result<usize> {
        Ok(lock!(self.slots).len())
    }

    /// Snapshot of every live routine, in allocation order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn routines(&self) -> Result<Vec<Arc<DispatchRoutine>>> {
        Ok(lock!(self.slots)
            .iter()
            .flat_map(|slot| slot.routines.iter().cloned())
            .collect())
    }

    /// Finalises every routine and groups them per proxy type.
    ///
    /// Slots without live routines produce no type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if a routine body cannot be built, and
    /// [`crate::Error::LockError`] if the arena lock is poisoned.
    pub fn generate(&self, diagnostics: &Diagnostics) -> Result<Vec<GeneratedProxy>> {
        let slots = lock!(self.slots);
        let mut proxies = Vec::with_capacity(slots.len());
        for slot in slots.iter().filter(|slot| !slot.routines.is_empty()) {
            let methods = slot
                .routines
                .iter()
                .map(|routine| routine.generate(diagnostics))
                .collect::<Result<Vec<_>>>()?;
            proxies.push(GeneratedProxy {
                name: slot.name.clone(),
                methods,
            });
        }
        Ok(proxies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ir::MethodAccess, test::body};

    fn target() -> MethodBody {
        body(
            "a/B",
            "m",
            "()V",
            MethodAccess::STATIC,
            vec![crate::ir::Instruction::Return(None)],
        )
    }

    #[test]
    fn spills_into_indexed_slots() {
        let proxies = ProxyGenerator::new(&EngineConfig::default().with_max_proxy_methods(2));
        let body = target();
        let routines: Vec<_> = (0..5)
            .map(|site| {
                proxies
                    .allocate(&body, WrapperType::EventInfo, site, false)
                    .unwrap()
            })
            .collect();

        let classes: Vec<_> = routines.iter().map(|r| r.proxy_class().to_string()).collect();
        assert_eq!(
            classes,
            [
                "eventscope/runtime/EventProxy",
                "eventscope/runtime/EventProxy",
                "eventscope/runtime/EventProxy$1",
                "eventscope/runtime/EventProxy$1",
                "eventscope/runtime/EventProxy$2",
            ]
        );
        assert_eq!(proxies.slot_count().unwrap(), 3);
        assert_eq!(routines[0].name(), "$event00001");
        assert_eq!(routines[4].name(), "$event00005");
    }

    #[test]
    fn discard_removes_routine() {
        let proxies = ProxyGenerator::new(&EngineConfig::default());
        let body = target();
        let kept = proxies
            .allocate(&body, WrapperType::EventInfo, 0, false)
            .unwrap();
        let dropped = proxies
            .allocate(&body, WrapperType::EventInfo, 1, false)
            .unwrap();
        proxies.discard(&dropped).unwrap();

        let live = proxies.routines().unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].id(), kept.id());
    }

    #[test]
    fn generate_groups_by_slot() {
        let proxies = ProxyGenerator::new(&EngineConfig::default().with_max_proxy_methods(1));
        let body = target();
        let first = proxies
            .allocate(&body, WrapperType::EventInfo, 0, false)
            .unwrap();
        proxies
            .allocate(&body, WrapperType::EventInfo, 1, false)
            .unwrap();
        proxies.discard(&first).unwrap();

        let generated = proxies.generate(&Diagnostics::new()).unwrap();
        assert_eq!(generated.len(), 1);
        assert_eq!(generated[0].name, "eventscope/runtime/EventProxy$1");
        assert_eq!(generated[0].methods[0].name, "$event00002");
    }
}
