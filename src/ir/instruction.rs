//! Abstract instruction representation, operands and stack-effect metadata.
//!
//! Instructions are kept at the level an injection engine cares about: what they push and pop,
//! whether they transfer control, and which methods/fields/types they reference. Branch targets
//! are symbolic [`LabelId`]s anchored by [`Instruction::Label`] pseudo-instructions, so inserting
//! code anywhere in a sequence never invalidates a branch.
//!
//! # Key Components
//!
//! - [`Instruction`] - A single abstract instruction
//! - [`Constant`] - Values pushed by [`Instruction::Const`]
//! - [`MethodRef`] / [`FieldRef`] - Symbolic member references
//! - [`GuardedCall`] - A call whose target is resolved (and may be missing) at execution time
//! - [`FlowType`] - Control flow classification
//! - [`StackBehavior`] - Slots popped and pushed
//!
//! # Usage Examples
//!
//! ```rust
//! use eventscope::ir::{CallKind, Constant, FlowType, Instruction, MethodRef};
//!
//! let call = Instruction::Call {
//!     kind: CallKind::Static,
//!     method: MethodRef::parse("a/Profiler", "startSection", "(Ljava/lang/String;)V")?,
//! };
//! assert_eq!(call.flow_type(), FlowType::Call);
//! assert_eq!(call.stack_behavior().pops, 1);
//!
//! let push = Instruction::Const(Constant::Long(7));
//! assert_eq!(push.stack_behavior().pushes, 2);
//! # Ok::<(), eventscope::Error>(())
//! ```

use std::fmt;

use strum::Display;

use crate::{
    ir::types::{MethodSignature, TypeDesc, ValueKind},
    Result,
};

/// Symbolic branch target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(pub u32);

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Constant values that can be pushed onto the operand stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// The null reference
    Null,
    /// 32-bit integer (also used for booleans, `0`/`1`)
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String literal
    String(String),
}

impl Constant {
    /// Stack kind of the pushed value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Constant::Null | Constant::String(_) => ValueKind::Reference,
            Constant::Int(_) => ValueKind::Int,
            Constant::Long(_) => ValueKind::Long,
            Constant::Float(_) => ValueKind::Float,
            Constant::Double(_) => ValueKind::Double,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => write!(f, "null"),
            Constant::Int(v) => write!(f, "{v}"),
            Constant::Long(v) => write!(f, "{v}L"),
            Constant::Float(v) => write!(f, "{v}F"),
            Constant::Double(v) => write!(f, "{v}D"),
            Constant::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Dispatch mode of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CallKind {
    /// No receiver
    #[strum(serialize = "invokestatic")]
    Static,
    /// Virtual dispatch on the receiver
    #[strum(serialize = "invokevirtual")]
    Virtual,
    /// Exact dispatch (constructors, private and super calls)
    #[strum(serialize = "invokespecial")]
    Special,
    /// Interface dispatch
    #[strum(serialize = "invokeinterface")]
    Interface,
}

impl CallKind {
    /// Returns `true` if the call consumes a receiver.
    #[must_use]
    pub fn has_receiver(self) -> bool {
        !matches!(self, CallKind::Static)
    }
}

/// Field access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FieldOp {
    /// Read a static field
    #[strum(serialize = "getstatic")]
    GetStatic,
    /// Write a static field
    #[strum(serialize = "putstatic")]
    PutStatic,
    /// Read an instance field
    #[strum(serialize = "getfield")]
    GetField,
    /// Write an instance field
    #[strum(serialize = "putfield")]
    PutField,
}

impl FieldOp {
    /// Returns `true` for the two read operations.
    #[must_use]
    pub fn is_read(self) -> bool {
        matches!(self, FieldOp::GetStatic | FieldOp::GetField)
    }
}

/// Condition of a branch instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum JumpCondition {
    /// Unconditional
    #[strum(serialize = "goto")]
    Always,
    /// Pops an int, branches if it is zero
    #[strum(serialize = "ifeq")]
    IfZero,
    /// Pops an int, branches if it is not zero
    #[strum(serialize = "ifne")]
    IfNonZero,
    /// Pops an int, branches if it is negative
    #[strum(serialize = "iflt")]
    IfNegative,
    /// Pops a reference, branches if it is null
    #[strum(serialize = "ifnull")]
    IfNull,
    /// Pops a reference, branches if it is not null
    #[strum(serialize = "ifnonnull")]
    IfNonNull,
    /// Pops two ints, branches if equal
    #[strum(serialize = "if_icmpeq")]
    IfIntEqual,
    /// Pops two ints, branches if not equal
    #[strum(serialize = "if_icmpne")]
    IfIntNotEqual,
    /// Pops two ints, branches if the first is less than the second
    #[strum(serialize = "if_icmplt")]
    IfIntLess,
}

impl JumpCondition {
    /// Number of stack slots consumed by the condition.
    #[must_use]
    pub fn pops(self) -> u8 {
        match self {
            JumpCondition::Always => 0,
            JumpCondition::IfZero
            | JumpCondition::IfNonZero
            | JumpCondition::IfNegative
            | JumpCondition::IfNull
            | JumpCondition::IfNonNull => 1,
            JumpCondition::IfIntEqual | JumpCondition::IfIntNotEqual | JumpCondition::IfIntLess => {
                2
            }
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ArithOp {
    /// Addition
    #[strum(serialize = "add")]
    Add,
    /// Subtraction
    #[strum(serialize = "sub")]
    Sub,
    /// Multiplication
    #[strum(serialize = "mul")]
    Mul,
}

/// Symbolic reference to a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: MethodSignature,
}

impl MethodRef {
    /// Creates a reference, normalising `.` separators in the owner to `/`.
    #[must_use]
    pub fn new(owner: &str, name: &str, signature: MethodSignature) -> Self {
        MethodRef {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
            signature,
        }
    }

    /// Creates a reference from a textual method descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `descriptor` is invalid.
    pub fn parse(owner: &str, name: &str, descriptor: &str) -> Result<Self> {
        Ok(MethodRef::new(owner, name, MethodSignature::parse(descriptor)?))
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.signature)
    }
}

/// Symbolic reference to a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Internal name of the declaring type
    pub owner: String,
    /// Field name
    pub name: String,
    /// Field type
    pub desc: TypeDesc,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}:{}", self.owner, self.name, self.desc)
    }
}

/// A static call resolved at execution time.
///
/// If the declaring type of `target` cannot be found, the arguments are discarded and
/// `on_missing_class` is invoked; if the type exists but the method does not,
/// `on_missing_method` is invoked instead. Both callbacks receive three string arguments:
/// `context`, the target owner and the target name. Execution then continues with the next
/// instruction, so one missing target never prevents the following instructions from running.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardedCall {
    /// The method to invoke
    pub target: MethodRef,
    /// Free-form context passed to the fallbacks (the event name for listener calls)
    pub context: String,
    /// Invoked when the target type is absent
    pub on_missing_class: MethodRef,
    /// Invoked when the target method is absent
    pub on_missing_method: MethodRef,
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Execution continues with the next instruction
    Sequential,
    /// Conditional branch to a label
    ConditionalBranch,
    /// Unconditional branch to a label
    UnconditionalBranch,
    /// Call to another method, then continues
    Call,
    /// Returns from the current method
    Return,
    /// Throws the reference on top of the stack
    Throw,
}

/// Stack effect of an instruction, in slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackBehavior {
    /// Number of slots popped
    pub pops: u16,
    /// Number of slots pushed
    pub pushes: u16,
}

/// An abstract instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// No operation
    Nop,
    /// Branch target anchor, emits no code
    Label(LabelId),
    /// Push a constant
    Const(Constant),
    /// Push a local variable
    Load {
        /// Kind of the loaded value
        kind: ValueKind,
        /// First slot of the local
        index: u16,
    },
    /// Pop into a local variable
    Store {
        /// Kind of the stored value
        kind: ValueKind,
        /// First slot of the local
        index: u16,
    },
    /// Discard one single-slot value
    Pop,
    /// Duplicate one single-slot value
    Dup,
    /// Binary arithmetic on two values of `kind`
    Arith {
        /// Operator
        op: ArithOp,
        /// Operand kind
        kind: ValueKind,
    },
    /// Allocate an uninitialised instance of the named type
    New(String),
    /// Narrow a reference to the named type
    CheckCast(String),
    /// Read or write a field
    Field {
        /// Access mode
        op: FieldOp,
        /// Accessed field
        field: FieldRef,
    },
    /// Invoke a method
    Call {
        /// Dispatch mode
        kind: CallKind,
        /// Invoked method
        method: MethodRef,
    },
    /// Invoke a static method that may be missing at execution time
    GuardedCall(Box<GuardedCall>),
    /// Branch to a label
    Jump {
        /// Branch condition
        cond: JumpCondition,
        /// Branch target
        target: LabelId,
    },
    /// Return from the method, `None` for void
    Return(Option<ValueKind>),
    /// Throw the reference on top of the stack
    Throw,
}

impl Instruction {
    /// Human readable mnemonic.
    #[must_use]
    pub fn mnemonic(&self) -> String {
        match self {
            Instruction::Nop => "nop".to_string(),
            Instruction::Label(_) => "label".to_string(),
            Instruction::Const(_) => "ldc".to_string(),
            Instruction::Load { kind, .. } => format!("{kind}load"),
            Instruction::Store { kind, .. } => format!("{kind}store"),
            Instruction::Pop => "pop".to_string(),
            Instruction::Dup => "dup".to_string(),
            Instruction::Arith { op, kind } => format!("{kind}{op}"),
            Instruction::New(_) => "new".to_string(),
            Instruction::CheckCast(_) => "checkcast".to_string(),
            Instruction::Field { op, .. } => op.to_string(),
            Instruction::Call { kind, .. } => kind.to_string(),
            Instruction::GuardedCall(_) => "invokeguarded".to_string(),
            Instruction::Jump { cond, .. } => cond.to_string(),
            Instruction::Return(Some(kind)) => format!("{kind}return"),
            Instruction::Return(None) => "return".to_string(),
            Instruction::Throw => "athrow".to_string(),
        }
    }

    /// Control flow classification.
    #[must_use]
    pub fn flow_type(&self) -> FlowType {
        match self {
            Instruction::Call { .. } | Instruction::GuardedCall(_) => FlowType::Call,
            Instruction::Jump {
                cond: JumpCondition::Always,
                ..
            } => FlowType::UnconditionalBranch,
            Instruction::Jump { .. } => FlowType::ConditionalBranch,
            Instruction::Return(_) => FlowType::Return,
            Instruction::Throw => FlowType::Throw,
            _ => FlowType::Sequential,
        }
    }

    /// Returns `true` if execution can continue with the following instruction.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        !matches!(
            self.flow_type(),
            FlowType::UnconditionalBranch | FlowType::Return | FlowType::Throw
        )
    }

    /// Returns the branch target, if any.
    #[must_use]
    pub fn branch_target(&self) -> Option<LabelId> {
        match self {
            Instruction::Jump { target, .. } => Some(*target),
            _ => None,
        }
    }

    /// Returns `true` for return instructions.
    #[must_use]
    pub fn is_return(&self) -> bool {
        matches!(self, Instruction::Return(_))
    }

    /// Slots popped and pushed by this instruction.
    #[must_use]
    pub fn stack_behavior(&self) -> StackBehavior {
        let (pops, pushes) = match self {
            Instruction::Nop | Instruction::Label(_) => (0, 0),
            Instruction::Const(constant) => (0, constant.kind().slots()),
            Instruction::Load { kind, .. } => (0, kind.slots()),
            Instruction::Store { kind, .. } => (kind.slots(), 0),
            Instruction::Pop => (1, 0),
            Instruction::Dup => (1, 2),
            Instruction::Arith { kind, .. } => (kind.slots() * 2, kind.slots()),
            Instruction::New(_) => (0, 1),
            Instruction::CheckCast(_) => (1, 1),
            Instruction::Field { op, field } => match op {
                FieldOp::GetStatic => (0, field.desc.slots()),
                FieldOp::PutStatic => (field.desc.slots(), 0),
                FieldOp::GetField => (1, field.desc.slots()),
                FieldOp::PutField => (1 + field.desc.slots(), 0),
            },
            Instruction::Call { kind, method } => (
                method.signature.args_size().saturating_add(u16::from(kind.has_receiver())),
                method.signature.ret.slots(),
            ),
            Instruction::GuardedCall(call) => (
                call.target.signature.args_size(),
                call.target.signature.ret.slots(),
            ),
            Instruction::Jump { cond, .. } => (u16::from(cond.pops()), 0),
            Instruction::Return(kind) => (kind.map_or(0, ValueKind::slots), 0),
            Instruction::Throw => (1, 0),
        };
        StackBehavior { pops, pushes }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, "{label}:"),
            Instruction::Const(constant) => write!(f, "ldc {constant}"),
            Instruction::Load { index, .. } | Instruction::Store { index, .. } => {
                write!(f, "{} {index}", self.mnemonic())
            }
            Instruction::New(class) | Instruction::CheckCast(class) => {
                write!(f, "{} {class}", self.mnemonic())
            }
            Instruction::Field { op, field } => write!(f, "{op} {field}"),
            Instruction::Call { kind, method } => write!(f, "{kind} {method}"),
            Instruction::GuardedCall(call) => write!(f, "invokeguarded {}", call.target),
            Instruction::Jump { cond, target } => write!(f, "{cond} {target}"),
            _ => write!(f, "{}", self.mnemonic()),
        }
    }
}
