//! Reference interpreter for rewritten method bodies.
//!
//! This module executes [`crate::ir::MethodBody`]s so that the effect of a transformation can be
//! observed instead of only inspected: listeners run, wrappers get cancelled, override values
//! come back out of the instrumented method.
//!
//! # Key Components
//!
//! - [`Interpreter`] - Executes bodies, enforcing declared `max_stack` / `max_locals`
//! - [`EmulationLimits`] - Instruction, call depth and heap limits
//! - [`Program`] - The types, bodies and native methods visible to the interpreter
//! - [`NativeContext`] - What a native method can reach (heap, wrappers, trace)
//! - [`ManagedHeap`] / [`HeapObject`] - Object storage, including event wrappers
//! - [`EmValue`] / [`HeapRef`] - Runtime values
//!
//! # Usage Examples
//!
//! ```rust
//! use eventscope::descriptor::MethodDescriptor;
//! use eventscope::emulation::{EmValue, EmulationLimits, Interpreter, Program};
//! use eventscope::event::ListenerRef;
//! use eventscope::ir::{Constant, Instruction, MethodAccess, MethodBody, MethodSignature, ValueKind};
//! use eventscope::locator::Head;
//! use eventscope::EngineContext;
//!
//! let context = EngineContext::default();
//! let event = context.define_event("onQuery", true, 0)?;
//! context.add_listener(&event, ListenerRef::new("mods/Hooks", "onQuery"))?;
//! context.register_injection(&event, MethodDescriptor::new("game/World", "query", "()I")?, Head)?;
//!
//! let mut body = MethodBody::new(
//!     "game/World",
//!     "query",
//!     MethodSignature::parse("()I")?,
//!     MethodAccess::PUBLIC | MethodAccess::STATIC,
//! )
//! .with_instructions(vec![
//!     Instruction::Const(Constant::Int(1)),
//!     Instruction::Return(Some(ValueKind::Int)),
//! ])?;
//! context.transformer().transform(&mut body)?;
//!
//! let mut program = Program::new();
//! program.add_proxies(&context.generate_proxies()?);
//! program.add_native(
//!     "mods/Hooks",
//!     "onQuery",
//!     "(Leventscope/event/ReturnEventInfo;)V",
//!     |ctx, args| {
//!         ctx.cancel_with(&args[0], EmValue::Int(42))?;
//!         Ok(None)
//!     },
//! )?;
//!
//! let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
//! assert_eq!(interpreter.execute(&body, &[])?, Some(EmValue::Int(42)));
//! # Ok::<(), eventscope::Error>(())
//! ```

mod heap;
mod interpreter;
mod program;
mod value;

pub use heap::{HeapObject, ManagedHeap, WrapperState};
pub use interpreter::{EmulationLimits, Interpreter};
pub use program::{Callable, NativeContext, NativeFn, Program};
pub use value::{EmValue, HeapRef};
