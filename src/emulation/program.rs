//! The code visible to the reference interpreter.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use crate::{
    emulation::{EmValue, ManagedHeap},
    ir::{MethodBody, MethodRef, MethodSignature},
    proxy::GeneratedProxy,
    Result,
};

/// A method implemented in Rust.
///
/// Receives the receiver (for instance methods) followed by the arguments and returns the
/// method's result, `None` for `void`.
pub type NativeFn =
    Arc<dyn Fn(&mut NativeContext<'_>, &[EmValue]) -> Result<Option<EmValue>> + Send + Sync>;

/// State a [`NativeFn`] can reach while it runs.
pub struct NativeContext<'a> {
    pub(crate) heap: &'a mut ManagedHeap,
    pub(crate) trace: &'a mut Vec<String>,
    pub(crate) method: &'a MethodRef,
}

impl NativeContext<'_> {
    /// The invoked method.
    #[must_use]
    pub fn method(&self) -> &MethodRef {
        self.method
    }

    /// The heap.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        self.heap
    }

    /// Mutable access to the heap.
    pub fn heap_mut(&mut self) -> &mut ManagedHeap {
        self.heap
    }

    /// Appends `entry` to the interpreter's trace.
    pub fn record(&mut self, entry: impl Into<String>) {
        self.trace.push(entry.into());
    }

    /// The string behind `value`.
    #[must_use]
    pub fn string(&self, value: &EmValue) -> Option<String> {
        self.heap.string(value).map(str::to_string)
    }

    /// Event name carried by `wrapper`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Emulation`] if `wrapper` is not an event wrapper.
    pub fn event_name(&self, wrapper: &EmValue) -> Result<String> {
        Ok(self.heap.wrapper(wrapper)?.name.clone())
    }

    /// Cancels `wrapper`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Emulation`] if `wrapper` is not a cancellable event wrapper.
    pub fn cancel(&mut self, wrapper: &EmValue) -> Result<()> {
        self.heap.wrapper_mut(wrapper)?.cancel()
    }

    /// Cancels `wrapper` and stores the value the instrumented method returns.
    ///
    /// # Errors
    ///
    /// See [`NativeContext::cancel`].
    pub fn cancel_with(&mut self, wrapper: &EmValue, value: EmValue) -> Result<()> {
        let state = self.heap.wrapper_mut(wrapper)?;
        state.cancel()?;
        state.return_value = Some(value);
        Ok(())
    }

    /// Returns `true` if `wrapper` was cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Emulation`] if `wrapper` is not an event wrapper.
    pub fn is_cancelled(&self, wrapper: &EmValue) -> Result<bool> {
        Ok(self.heap.wrapper(wrapper)?.cancelled)
    }
}

type MethodKey = (String, String, String);

fn key(owner: &str, name: &str, signature: &MethodSignature) -> MethodKey {
    (
        owner.replace('.', "/"),
        name.to_string(),
        signature.to_string(),
    )
}

/// A resolved call target.
#[derive(Clone)]
pub enum Callable {
    /// An interpreted body
    Body(Arc<MethodBody>),
    /// A native implementation
    Native(NativeFn),
}

/// The set of types and methods that exist for the interpreter.
///
/// A type exists once one of its methods was added or it was declared through
/// [`Program::add_class`]; guarded calls use that distinction to pick their fallback.
#[derive(Clone, Default)]
pub struct Program {
    classes: HashSet<String>,
    bodies: HashMap<MethodKey, Arc<MethodBody>>,
    natives: HashMap<MethodKey, NativeFn>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a type without methods.
    pub fn add_class(&mut self, name: &str) -> &mut Self {
        self.classes.insert(name.replace('.', "/"));
        self
    }

    /// Adds an interpreted method, replacing an earlier one with the same identity.
    pub fn add_body(&mut self, body: MethodBody) -> &mut Self {
        self.classes.insert(body.owner.clone());
        let key = key(&body.owner, &body.name, &body.signature);
        self.bodies.insert(key, Arc::new(body));
        self
    }

    /// Adds every method of every generated proxy.
    pub fn add_proxies(&mut self, proxies: &[GeneratedProxy]) -> &mut Self {
        for proxy in proxies {
            self.add_class(&proxy.name);
            for method in &proxy.methods {
                self.add_body(method.clone());
            }
        }
        self
    }

    /// Adds a native method.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is invalid.
    pub fn add_native<F>(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        native: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut NativeContext<'_>, &[EmValue]) -> Result<Option<EmValue>> + Send + Sync + 'static,
    {
        let signature = MethodSignature::parse(descriptor)?;
        let key = key(owner, name, &signature);
        self.classes.insert(key.0.clone());
        self.natives.insert(key, Arc::new(native));
        Ok(self)
    }

    /// Returns `true` if the type exists.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    /// Resolves a call target; natives win over bodies.
    #[must_use]
    pub fn resolve(&self, method: &MethodRef) -> Option<Callable> {
        let key = key(&method.owner, &method.name, &method.signature);
        if let Some(native) = self.natives.get(&key) {
            return Some(Callable::Native(Arc::clone(native)));
        }
        self.bodies.get(&key).map(|body| Callable::Body(Arc::clone(body)))
    }

    /// The interpreted body of `method`, if any.
    #[must_use]
    pub fn body(&self, method: &MethodRef) -> Option<&MethodBody> {
        self.bodies
            .get(&key(&method.owner, &method.name, &method.signature))
            .map(AsRef::as_ref)
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("classes", &self.classes.len())
            .field("bodies", &self.bodies.len())
            .field("natives", &self.natives.len())
            .finish()
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Body(body) => write!(f, "Body({body})"),
            Callable::Native(_) => write!(f, "Native"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, MethodAccess};

    #[test]
    fn natives_win_and_register_their_class() {
        let mut program = Program::new();
        let body = MethodBody::new(
            "mods/Hooks",
            "tick",
            MethodSignature::parse("()V").unwrap(),
            MethodAccess::PUBLIC | MethodAccess::STATIC,
        )
        .with_instructions(vec![Instruction::Return(None)])
        .unwrap();
        let method = body.method_ref();
        program.add_body(body);
        assert!(matches!(program.resolve(&method), Some(Callable::Body(_))));

        program
            .add_native("mods.Hooks", "tick", "()V", |_, _| Ok(None))
            .unwrap();
        assert!(matches!(program.resolve(&method), Some(Callable::Native(_))));
        assert!(program.has_class("mods/Hooks"));
        assert!(!program.has_class("mods/Other"));
    }

    #[test]
    fn overloads_are_distinct() {
        let mut program = Program::new();
        program
            .add_native("a/B", "m", "(I)V", |_, _| Ok(None))
            .unwrap();
        let other = MethodRef::parse("a/B", "m", "(J)V").unwrap();
        assert!(program.resolve(&other).is_none());
    }
}
