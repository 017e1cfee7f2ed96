//! Object storage of the reference interpreter.
//!
//! No garbage collection is simulated: handles stay valid for the lifetime of the heap, and
//! allocation fails once [`crate::emulation::EmulationLimits::max_heap_objects`] is reached.

use std::{collections::HashMap, fmt};

use crate::{
    emulation::{EmValue, HeapRef},
    event::WrapperType,
    Error, Result,
};

/// State of one event wrapper instance.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapperState {
    /// Wrapper type the instance was allocated as
    pub wrapper: WrapperType,
    /// Event name passed to the constructor
    pub name: String,
    /// Receiver passed to the constructor, `Null` for static methods
    pub source: EmValue,
    /// Whether listeners may cancel
    pub cancellable: bool,
    /// Whether a listener cancelled
    pub cancelled: bool,
    /// Override value stored by a listener
    pub return_value: Option<EmValue>,
}

impl WrapperState {
    fn new(wrapper: WrapperType) -> Self {
        WrapperState {
            wrapper,
            name: String::new(),
            source: EmValue::Null,
            cancellable: false,
            cancelled: false,
            return_value: None,
        }
    }

    /// Marks the wrapper cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if the wrapper was constructed as not cancellable.
    pub fn cancel(&mut self) -> Result<()> {
        if !self.cancellable {
            return Err(Error::Emulation(format!(
                "Event '{}' is not cancellable",
                self.name
            )));
        }
        self.cancelled = true;
        Ok(())
    }
}

/// An object on the heap.
#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    /// An immutable string
    String(String),
    /// An event wrapper
    Wrapper(WrapperState),
    /// A plain instance with named fields
    Instance {
        /// Internal name of the instance's type
        class: String,
        /// Field values, absent fields read as their default
        fields: HashMap<String, EmValue>,
    },
}

impl HeapObject {
    /// Internal name of the object's type.
    #[must_use]
    pub fn class_name(&self) -> &str {
        match self {
            HeapObject::String(_) => crate::ir::STRING_CLASS,
            HeapObject::Wrapper(state) => state.wrapper.class_name(),
            HeapObject::Instance { class, .. } => class,
        }
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapObject::String(value) => write!(f, "{value:?}"),
            HeapObject::Wrapper(state) => write!(
                f,
                "{}({}, cancelled={})",
                state.wrapper.class_name(),
                state.name,
                state.cancelled
            ),
            HeapObject::Instance { class, .. } => write!(f, "{class}"),
        }
    }
}

/// Simulated object heap.
#[derive(Debug)]
pub struct ManagedHeap {
    objects: Vec<HeapObject>,
    max_objects: usize,
}

impl ManagedHeap {
    /// Creates an empty heap holding at most `max_objects` objects (0 for unlimited).
    #[must_use]
    pub fn new(max_objects: usize) -> Self {
        ManagedHeap {
            objects: Vec::new(),
            max_objects,
        }
    }

    /// Number of allocated objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if nothing was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Allocates `object`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] when the object limit is reached.
    pub fn alloc(&mut self, object: HeapObject) -> Result<HeapRef> {
        if self.max_objects > 0 && self.objects.len() >= self.max_objects {
            return Err(Error::Emulation(format!(
                "heap limit of {} objects reached",
                self.max_objects
            )));
        }
        let id = u32::try_from(self.objects.len())
            .map_err(|_| Error::Emulation("heap exhausted".to_string()))?;
        self.objects.push(object);
        Ok(HeapRef(id))
    }

    /// Allocates a string.
    ///
    /// # Errors
    ///
    /// See [`ManagedHeap::alloc`].
    pub fn alloc_string(&mut self, value: &str) -> Result<HeapRef> {
        self.alloc(HeapObject::String(value.to_string()))
    }

    /// Allocates an uninitialised instance of `class`; wrapper types get wrapper state.
    ///
    /// # Errors
    ///
    /// See [`ManagedHeap::alloc`].
    pub fn alloc_instance(&mut self, class: &str) -> Result<HeapRef> {
        match WrapperType::from_class_name(class) {
            Some(wrapper) => self.alloc(HeapObject::Wrapper(WrapperState::new(wrapper))),
            None => self.alloc(HeapObject::Instance {
                class: class.to_string(),
                fields: HashMap::new(),
            }),
        }
    }

    /// The object behind `handle`.
    #[must_use]
    pub fn get(&self, handle: HeapRef) -> Option<&HeapObject> {
        self.objects.get(handle.0 as usize)
    }

    /// Mutable access to the object behind `handle`.
    pub fn get_mut(&mut self, handle: HeapRef) -> Option<&mut HeapObject> {
        self.objects.get_mut(handle.0 as usize)
    }

    /// The string behind `value`, `None` for null or non-strings.
    #[must_use]
    pub fn string(&self, value: &EmValue) -> Option<&str> {
        match self.get(value.as_heap_ref()?)? {
            HeapObject::String(s) => Some(s),
            _ => None,
        }
    }

    /// The wrapper state behind `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if `value` is not a wrapper.
    pub fn wrapper(&self, value: &EmValue) -> Result<&WrapperState> {
        match value.as_heap_ref().and_then(|r| self.get(r)) {
            Some(HeapObject::Wrapper(state)) => Ok(state),
            _ => Err(Error::Emulation(format!("{value} is not an event wrapper"))),
        }
    }

    /// Mutable wrapper state behind `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if `value` is not a wrapper.
    pub fn wrapper_mut(&mut self, value: &EmValue) -> Result<&mut WrapperState> {
        match value.as_heap_ref().and_then(|r| self.get_mut(r)) {
            Some(HeapObject::Wrapper(state)) => Ok(state),
            _ => Err(Error::Emulation(format!("{value} is not an event wrapper"))),
        }
    }

    /// Every wrapper allocated so far, in allocation order.
    pub fn wrappers(&self) -> impl Iterator<Item = &WrapperState> {
        self.objects.iter().filter_map(|object| match object {
            HeapObject::Wrapper(state) => Some(state),
            _ => None,
        })
    }
}

impl Default for ManagedHeap {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::info::EVENT_INFO_CLASS;

    #[test]
    fn wrapper_classes_get_wrapper_state() {
        let mut heap = ManagedHeap::default();
        let handle = heap.alloc_instance(EVENT_INFO_CLASS).unwrap();
        let state = heap.wrapper(&EmValue::Ref(handle)).unwrap();
        assert_eq!(state.wrapper, WrapperType::EventInfo);
        assert!(!state.cancelled);

        let other = heap.alloc_instance("game/Entity").unwrap();
        assert!(heap.wrapper(&EmValue::Ref(other)).is_err());
        assert_eq!(heap.get(other).unwrap().class_name(), "game/Entity");
    }

    #[test]
    fn limit_is_enforced() {
        let mut heap = ManagedHeap::new(1);
        heap.alloc_string("a").unwrap();
        assert!(heap.alloc_string("b").is_err());
    }

    #[test]
    fn strings() {
        let mut heap = ManagedHeap::default();
        let handle = heap.alloc_string("onTick").unwrap();
        assert_eq!(heap.string(&EmValue::Ref(handle)), Some("onTick"));
        assert_eq!(heap.string(&EmValue::Null), None);
    }
}
