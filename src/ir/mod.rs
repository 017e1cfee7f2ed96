//! Instruction-sequence model.
//!
//! This module provides the mutable representation of method bodies that every other component
//! of the engine reads or rewrites:
//!
//! - [`types`] - Type and method descriptors with a bounds-checked parser
//! - [`instruction`] - Abstract instructions, member references and stack behaviour
//! - [`body`] - [`MethodBody`], [`InstructionList`] and stack-depth analysis
//! - [`builder`] - [`CodeBuilder`] for synthesizing instruction runs
//!
//! # Invariants
//!
//! Branch targets are symbolic labels, so insertion anywhere in an [`InstructionList`] keeps
//! every branch well formed. The declared `max_stack` / `max_locals` of a body are plain data;
//! components that insert code are responsible for raising them, and
//! [`MethodBody::required_max_stack`] can always recompute the exact requirement.

pub mod body;
pub mod builder;
pub mod instruction;
pub mod types;

pub use body::{parameter_slots, InstructionList, MethodAccess, MethodBody};
pub use builder::{CodeBuilder, CodeRun};
pub use instruction::{
    ArithOp, CallKind, Constant, FieldOp, FieldRef, FlowType, GuardedCall, Instruction,
    JumpCondition, LabelId, MethodRef, StackBehavior,
};
pub use types::{
    DescriptorParser, MethodSignature, TypeDesc, ValueKind, MAX_PARAMETER_SLOTS, OBJECT_CLASS,
    STRING_CLASS,
};
