//! Method bodies and the mutable instruction sequence.
//!
//! A [`MethodBody`] is the unit the engine transforms: the identity of one function (owner,
//! name, signature, access flags), its [`InstructionList`] and the declared `max_stack` /
//! `max_locals` bookkeeping the target format verifies.
//!
//! The stack analysis in [`MethodBody::stack_depths`] performs a simple forward dataflow pass
//! over the instruction list and fails on underflow, inconsistent depths at merge points or
//! code that falls off the end of the body. Injection relies on it to learn the operand-stack
//! depth at a site before adding code there.

use std::{collections::HashMap, fmt};

use bitflags::bitflags;

use crate::{
    ir::{
        instruction::{Instruction, LabelId, MethodRef},
        types::{MethodSignature, ValueKind},
    },
    Result,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Method access flags
    pub struct MethodAccess: u16 {
        /// Accessible by anyone
        const PUBLIC = 0x0001;
        /// Accessible only by the declaring type
        const PRIVATE = 0x0002;
        /// Accessible by sub-types
        const PROTECTED = 0x0004;
        /// No receiver
        const STATIC = 0x0008;
        /// Cannot be overridden
        const FINAL = 0x0010;
        /// Runs under the receiver's monitor
        const SYNCHRONIZED = 0x0020;
        /// Generated, not present in source
        const SYNTHETIC = 0x1000;
    }
}

/// Ordered, mutable instruction sequence of one method body.
///
/// Labels are allocated through [`InstructionList::new_label`], which never hands out an id
/// that is already used in the sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionList {
    insns: Vec<Instruction>,
    next_label: u64,
}

impl InstructionList {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.insns.len()
    }

    /// Returns `true` if the sequence holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    /// Instruction at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.insns.get(index)
    }

    /// Iterates the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.insns.iter()
    }

    /// Borrows the instructions as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Instruction] {
        &self.insns
    }

    /// Appends one instruction.
    pub fn push(&mut self, insn: Instruction) {
        self.track_label(&insn);
        self.insns.push(insn);
    }

    /// Allocates a fresh label id above every label already in the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] once the sequence already uses label `u32::MAX`.
    pub fn new_label(&mut self) -> Result<LabelId> {
        let id = u32::try_from(self.next_label)
            .map_err(|_| malformed_error!("Label ids are exhausted"))?;
        self.next_label += 1;
        Ok(LabelId(id))
    }

    /// Inserts `insns` so that the first of them ends up at `index`.
    ///
    /// `index == len()` appends.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if `index` is past the end of the sequence.
    pub fn insert(&mut self, index: usize, insns: Vec<Instruction>) -> Result<()> {
        if index > self.insns.len() {
            return Err(malformed_error!(
                "Insertion index {} is out of bounds (len {})",
                index,
                self.insns.len()
            ));
        }
        for insn in &insns {
            self.track_label(insn);
        }
        self.insns.splice(index..index, insns);
        Ok(())
    }

    /// Replaces the whole sequence.
    pub fn replace(&mut self, insns: Vec<Instruction>) {
        self.insns.clear();
        for insn in insns {
            self.push(insn);
        }
    }

    /// Position of the definition of `label`.
    #[must_use]
    pub fn label_position(&self, label: LabelId) -> Option<usize> {
        self.insns
            .iter()
            .position(|insn| matches!(insn, Instruction::Label(l) if *l == label))
    }

    /// Maps every defined label to its position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] if a label is defined twice.
    pub fn label_positions(&self) -> Result<HashMap<LabelId, usize>> {
        let mut positions = HashMap::new();
        for (index, insn) in self.insns.iter().enumerate() {
            if let Instruction::Label(label) = insn {
                if positions.insert(*label, index).is_some() {
                    return Err(malformed_error!("Label {} is defined twice", label));
                }
            }
        }
        Ok(positions)
    }

    fn track_label(&mut self, insn: &Instruction) {
        let used = match insn {
            Instruction::Label(label) => Some(*label),
            _ => insn.branch_target(),
        };
        if let Some(LabelId(id)) = used {
            self.next_label = self.next_label.max(u64::from(id) + 1);
        }
    }
}

impl From<Vec<Instruction>> for InstructionList {
    fn from(insns: Vec<Instruction>) -> Self {
        let mut list = InstructionList::new();
        list.replace(insns);
        list
    }
}

impl<'a> IntoIterator for &'a InstructionList {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.insns.iter()
    }
}

/// A concrete method body supplied by the host loader.
///
/// # Example
///
/// ```rust
/// use eventscope::ir::{Instruction, MethodAccess, MethodBody, MethodSignature, ValueKind};
///
/// let mut body = MethodBody::new(
///     "game/World",
///     "tick",
///     MethodSignature::parse("(I)V")?,
///     MethodAccess::PUBLIC,
/// );
/// body.instructions.push(Instruction::Return(None));
/// assert_eq!(body.max_locals, 2);
/// assert_eq!(body.first_arg_slot(), 1);
/// body.validate()?;
/// # Ok::<(), eventscope::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Internal name of the declaring type
    pub owner: String,
    /// Method name
    pub name: String,
    /// Method signature
    pub signature: MethodSignature,
    /// Access flags
    pub access: MethodAccess,
    /// The instruction sequence
    pub instructions: InstructionList,
    /// Declared maximum operand-stack depth, in slots
    pub max_stack: u16,
    /// Declared number of local slots (receiver and parameters included)
    pub max_locals: u16,
}

impl MethodBody {
    /// Creates an empty body whose `max_locals` covers the receiver and the parameters.
    #[must_use]
    pub fn new(owner: &str, name: &str, signature: MethodSignature, access: MethodAccess) -> Self {
        let receiver = u16::from(!access.contains(MethodAccess::STATIC));
        let max_locals = receiver.saturating_add(signature.args_size());
        MethodBody {
            owner: owner.replace('.', "/"),
            name: name.to_string(),
            signature,
            access,
            instructions: InstructionList::new(),
            max_stack: 0,
            max_locals,
        }
    }

    /// Sets the instructions and recomputes `max_stack` / `max_locals` from them.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack analysis of the new sequence fails.
    pub fn with_instructions(mut self, insns: Vec<Instruction>) -> Result<Self> {
        self.instructions = InstructionList::from(insns);
        self.max_stack = self.required_max_stack()?;
        self.max_locals = self.max_locals.max(self.required_max_locals());
        Ok(self)
    }

    /// Returns `true` for methods without a receiver.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccess::STATIC)
    }

    /// Local slot of the first declared parameter.
    #[must_use]
    pub fn first_arg_slot(&self) -> u16 {
        u16::from(!self.is_static())
    }

    /// Reference to this method.
    #[must_use]
    pub fn method_ref(&self) -> MethodRef {
        MethodRef {
            owner: self.owner.clone(),
            name: self.name.clone(),
            signature: self.signature.clone(),
        }
    }

    /// Checks that every branch target is defined exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on duplicate or dangling labels.
    pub fn validate(&self) -> Result<()> {
        let positions = self.instructions.label_positions()?;
        for insn in &self.instructions {
            if let Some(target) = insn.branch_target() {
                if !positions.contains_key(&target) {
                    return Err(malformed_error!(
                        "Branch to undefined label {} in {}",
                        target,
                        self
                    ));
                }
            }
        }
        Ok(())
    }

    /// Computes the operand-stack depth before every instruction.
    ///
    /// Unreachable instructions get `None`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] on dangling labels, stack underflow, inconsistent
    /// depths where control flow merges, or code that falls off the end of the body.
    pub fn stack_depths(&self) -> Result<Vec<Option<u16>>> {
        let insns = self.instructions.as_slice();
        let positions = self.instructions.label_positions()?;
        let mut depths: Vec<Option<u16>> = vec![None; insns.len()];
        if insns.is_empty() {
            return Ok(depths);
        }

        let mut worklist = vec![(0usize, 0u16)];
        while let Some((index, depth)) = worklist.pop() {
            let Some(insn) = insns.get(index) else {
                return Err(malformed_error!("Execution falls off the end of {}", self));
            };

            match depths[index] {
                Some(known) if known == depth => continue,
                Some(known) => {
                    return Err(malformed_error!(
                        "Inconsistent stack depth at {} in {}: {} vs {}",
                        index,
                        self,
                        known,
                        depth
                    ))
                }
                None => depths[index] = Some(depth),
            }

            let behavior = insn.stack_behavior();
            let remaining = depth.checked_sub(behavior.pops).ok_or_else(|| {
                malformed_error!("Stack underflow at {} ({}) in {}", index, insn, self)
            })?;
            let after = remaining + behavior.pushes;

            if let Some(target) = insn.branch_target() {
                let position = positions.get(&target).ok_or_else(|| {
                    malformed_error!("Branch to undefined label {} in {}", target, self)
                })?;
                worklist.push((*position, after));
            }
            if insn.falls_through() {
                worklist.push((index + 1, after));
            }
        }

        Ok(depths)
    }

    /// The smallest `max_stack` that covers every reachable instruction.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`MethodBody::stack_depths`].
    pub fn required_max_stack(&self) -> Result<u16> {
        let depths = self.stack_depths()?;
        let mut max = 0u16;
        for (insn, depth) in self.instructions.iter().zip(depths) {
            if let Some(depth) = depth {
                let behavior = insn.stack_behavior();
                max = max.max(depth).max(depth - behavior.pops + behavior.pushes);
            }
        }
        Ok(max)
    }

    /// The smallest `max_locals` that covers the parameters and every local access.
    #[must_use]
    pub fn required_max_locals(&self) -> u16 {
        let mut max = self.first_arg_slot().saturating_add(self.signature.args_size());
        for insn in &self.instructions {
            if let Instruction::Load { kind, index } | Instruction::Store { kind, index } = insn {
                max = max.max(index.saturating_add(kind.slots()));
            }
        }
        max
    }

    /// Local slot and kind of every declared parameter, in order.
    #[must_use]
    pub fn parameter_slots(&self) -> Vec<(u16, ValueKind)> {
        parameter_slots(&self.signature, self.first_arg_slot())
    }
}

/// Local slot and kind of every parameter of `signature`, starting at `first_slot`.
#[must_use]
pub fn parameter_slots(signature: &MethodSignature, first_slot: u16) -> Vec<(u16, ValueKind)> {
    let mut slot = first_slot;
    let mut slots = Vec::with_capacity(signature.params.len());
    for param in &signature.params {
        if let Some(kind) = param.value_kind() {
            slots.push((slot, kind));
            slot = slot.saturating_add(kind.slots());
        }
    }
    slots
}

impl fmt::Display for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.signature)
    }
}
