//! Shared fixtures for unit tests.

use crate::{
    event::Event,
    ir::{CallKind, Instruction, MethodAccess, MethodBody, MethodRef, MethodSignature},
};

// Parses a method descriptor
pub fn signature(descriptor: &str) -> MethodSignature {
    MethodSignature::parse(descriptor).unwrap()
}

// Creates an unregistered, non-cancellable event with priority 0
pub fn event(name: &str) -> Event {
    Event::new(name, false, 0, 0)
}

// Creates an invokestatic instruction
pub fn static_call(owner: &str, name: &str, descriptor: &str) -> Instruction {
    Instruction::Call {
        kind: CallKind::Static,
        method: MethodRef::parse(owner, name, descriptor).unwrap(),
    }
}

/// Creates a body with exact `max_stack` / `max_locals` for `insns`
pub fn body(
    owner: &str,
    name: &str,
    descriptor: &str,
    access: MethodAccess,
    insns: Vec<Instruction>,
) -> MethodBody {
    MethodBody::new(owner, name, signature(descriptor), access)
        .with_instructions(insns)
        .unwrap()
}
