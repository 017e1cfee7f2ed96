//! Instruction run builder with real-time stack tracking.
//!
//! [`CodeBuilder`] emits straight-line runs of instructions (with forward branches) that are
//! later spliced into a method body or become the body of a generated method. While emitting,
//! it tracks the operand-stack depth relative to the depth at which the run starts, recording
//! the peak so the caller can update `max_stack` precisely. Depth at a label is taken from the
//! branches targeting it, which makes code after an unconditional return continue with the
//! correct depth.
//!
//! # Example
//!
//! ```rust
//! use eventscope::ir::{CodeBuilder, Constant, JumpCondition, LabelId, ValueKind};
//!
//! let mut builder = CodeBuilder::new();
//! let skip = LabelId(100);
//! builder
//!     .constant(Constant::Int(1))?
//!     .jump(JumpCondition::IfZero, skip)?
//!     .constant(Constant::Long(5))?
//!     .ret(Some(ValueKind::Long))?
//!     .label(skip)?
//!     .ret(None)?;
//!
//! let run = builder.finish();
//! assert_eq!(run.peak, 2);
//! assert_eq!(run.instructions.len(), 6);
//! # Ok::<(), eventscope::Error>(())
//! ```

use std::collections::HashMap;

use crate::{
    ir::{
        body::parameter_slots,
        instruction::{
            CallKind, Constant, GuardedCall, Instruction, JumpCondition, LabelId, MethodRef,
        },
        types::{MethodSignature, ValueKind},
    },
    Result,
};

/// The output of a [`CodeBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct CodeRun {
    /// The emitted instructions
    pub instructions: Vec<Instruction>,
    /// Highest stack depth reached, relative to the start of the run
    pub peak: u16,
}

/// Builder for instruction runs.
///
/// The builder is not [`Sync`]-shared; create one per synthesized run.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    insns: Vec<Instruction>,
    depth: u16,
    peak: u16,
    reachable: bool,
    label_depths: HashMap<LabelId, u16>,
}

impl CodeBuilder {
    /// Creates a builder starting at relative depth 0.
    #[must_use]
    pub fn new() -> Self {
        CodeBuilder {
            reachable: true,
            ..Self::default()
        }
    }

    /// Current relative stack depth.
    #[must_use]
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Emits one instruction, updating the tracked depth.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if the instruction would pop values the run did not
    /// push itself.
    pub fn emit(&mut self, insn: Instruction) -> Result<&mut Self> {
        if let Instruction::Label(label) = &insn {
            if let Some(depth) = self.label_depths.get(label) {
                self.depth = *depth;
                self.reachable = true;
            }
        }

        let behavior = insn.stack_behavior();
        let remaining = self.depth.checked_sub(behavior.pops).ok_or_else(|| {
            malformed_error!(
                "'{}' pops {} slot(s) at relative depth {}",
                insn,
                behavior.pops,
                self.depth
            )
        })?;
        self.depth = remaining + behavior.pushes;
        self.peak = self.peak.max(self.depth);

        if let Some(target) = insn.branch_target() {
            self.label_depths.entry(target).or_insert(self.depth);
        }
        if !insn.falls_through() {
            self.reachable = false;
        }

        self.insns.push(insn);
        Ok(self)
    }

    /// Pushes a constant.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn constant(&mut self, constant: Constant) -> Result<&mut Self> {
        self.emit(Instruction::Const(constant))
    }

    /// Pushes a local.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn load(&mut self, kind: ValueKind, index: u16) -> Result<&mut Self> {
        self.emit(Instruction::Load { kind, index })
    }

    /// Pops into a local.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn store(&mut self, kind: ValueKind, index: u16) -> Result<&mut Self> {
        self.emit(Instruction::Store { kind, index })
    }

    /// Duplicates the top slot.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn dup(&mut self) -> Result<&mut Self> {
        self.emit(Instruction::Dup)
    }

    /// Discards a value of `kind` (two `pop`s for wide values).
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn discard(&mut self, kind: ValueKind) -> Result<&mut Self> {
        for _ in 0..kind.slots() {
            self.emit(Instruction::Pop)?;
        }
        Ok(self)
    }

    /// Allocates an instance of `class`.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn new_object(&mut self, class: &str) -> Result<&mut Self> {
        self.emit(Instruction::New(class.to_string()))
    }

    /// Narrows the reference on top of the stack.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn checkcast(&mut self, class: &str) -> Result<&mut Self> {
        self.emit(Instruction::CheckCast(class.to_string()))
    }

    /// Emits a call.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn call(&mut self, kind: CallKind, method: MethodRef) -> Result<&mut Self> {
        self.emit(Instruction::Call { kind, method })
    }

    /// Emits a guarded static call.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn guarded_call(&mut self, call: GuardedCall) -> Result<&mut Self> {
        self.emit(Instruction::GuardedCall(Box::new(call)))
    }

    /// Emits a branch.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn jump(&mut self, cond: JumpCondition, target: LabelId) -> Result<&mut Self> {
        self.emit(Instruction::Jump { cond, target })
    }

    /// Defines a label at the current position.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn label(&mut self, label: LabelId) -> Result<&mut Self> {
        self.emit(Instruction::Label(label))
    }

    /// Returns from the method.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn ret(&mut self, kind: Option<ValueKind>) -> Result<&mut Self> {
        self.emit(Instruction::Return(kind))
    }

    /// Pushes every parameter of `signature`, whose first parameter lives in `first_slot`.
    ///
    /// # Errors
    ///
    /// See [`CodeBuilder::emit`].
    pub fn load_args(&mut self, signature: &MethodSignature, first_slot: u16) -> Result<&mut Self> {
        for (slot, kind) in parameter_slots(signature, first_slot) {
            self.load(kind, slot)?;
        }
        Ok(self)
    }

    /// Returns `true` if the next emitted instruction would be reachable.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Finishes the run.
    #[must_use]
    pub fn finish(self) -> CodeRun {
        CodeRun {
            instructions: self.insns,
            peak: self.peak,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_peak_over_calls() {
        let mut builder = CodeBuilder::new();
        builder
            .constant(Constant::Int(1))
            .unwrap()
            .constant(Constant::Double(2.0))
            .unwrap()
            .call(
                CallKind::Static,
                MethodRef::parse("a/B", "f", "(ID)J").unwrap(),
            )
            .unwrap();
        assert_eq!(builder.depth(), 2);
        let run = builder.finish();
        assert_eq!(run.peak, 3);
    }

    #[test]
    fn label_restores_branch_depth() {
        let mut builder = CodeBuilder::new();
        let done = LabelId(3);
        builder
            .constant(Constant::Null)
            .unwrap()
            .jump(JumpCondition::IfNull, done)
            .unwrap()
            .constant(Constant::Int(4))
            .unwrap()
            .ret(Some(ValueKind::Int))
            .unwrap();
        assert!(!builder.is_reachable());
        builder.label(done).unwrap();
        assert!(builder.is_reachable());
        assert_eq!(builder.depth(), 0);
    }

    #[test]
    fn underflow_is_rejected() {
        let mut builder = CodeBuilder::new();
        assert!(builder.emit(Instruction::Pop).is_err());
    }

    #[test]
    fn load_args_uses_slot_layout() {
        let signature = MethodSignature::parse("(JZ)V").unwrap();
        let mut builder = CodeBuilder::new();
        builder.load_args(&signature, 1).unwrap();
        let run = builder.finish();
        assert_eq!(
            run.instructions,
            vec![
                Instruction::Load {
                    kind: ValueKind::Long,
                    index: 1
                },
                Instruction::Load {
                    kind: ValueKind::Int,
                    index: 3
                },
            ]
        );
        assert_eq!(run.peak, 3);
    }

    #[test]
    fn discard_wide_value() {
        let mut builder = CodeBuilder::new();
        builder
            .constant(Constant::Long(1))
            .unwrap()
            .discard(ValueKind::Long)
            .unwrap();
        assert_eq!(builder.depth(), 0);
        assert_eq!(builder.finish().instructions.len(), 3);
    }
}
