//! # eventscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the eventscope library. Import this module to get quick access to the registration
//! API, the instruction model and the locators.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all eventscope operations
pub use crate::Error;

/// The result type used throughout eventscope
pub use crate::Result;

/// Engine configuration
pub use crate::config::EngineConfig;

/// Owner of every registry of one engine
pub use crate::EngineContext;

/// Diagnostics collected during registration and transformation
pub use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics};

// ================================================================================================
// Instruction Model
// ================================================================================================

/// Method bodies and their instruction sequence
pub use crate::ir::{InstructionList, MethodAccess, MethodBody};

/// Instructions and their operands
pub use crate::ir::{
    ArithOp, CallKind, Constant, FieldOp, FieldRef, GuardedCall, Instruction, JumpCondition,
    LabelId, MethodRef,
};

/// Type and method descriptors
pub use crate::ir::{MethodSignature, TypeDesc, ValueKind};

// ================================================================================================
// Registration
// ================================================================================================

/// Target methods under several naming epochs
pub use crate::descriptor::{MethodDescriptor, NamingEpoch};

/// Events and listeners
pub use crate::event::{Event, EventHandle, ListenerRef, WrapperType};

/// Redirect modes
pub use crate::redirect::RedirectKind;

// ================================================================================================
// Locators
// ================================================================================================

/// The locator trait and its result
pub use crate::locator::{InjectionPoint, InjectionSite, Placement};

/// Built-in locators and combinators
pub use crate::locator::{
    And, BeforeCall, BeforeCallWithConstant, BeforeFieldAccess, BeforeJump, BeforeNew,
    BeforeReturn, Head, Or, Shift,
};

// ================================================================================================
// Passes and Output
// ================================================================================================

/// The injection pass
pub use crate::inject::{TransformOutcome, Transformer};

/// Generated dispatch code
pub use crate::proxy::{DispatchRoutine, GeneratedProxy};

/// Reference interpreter
pub use crate::emulation::{EmValue, EmulationLimits, Interpreter, Program};
