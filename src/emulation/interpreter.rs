//! Instruction interpreter for [`MethodBody`]s.
//!
//! The [`Interpreter`] executes bodies against a [`Program`] and a [`ManagedHeap`]. It enforces
//! the declared `max_stack` and `max_locals` of every frame, so a rewritten body whose
//! bookkeeping is under-counted fails with [`Error::StackOverflow`] instead of silently
//! succeeding. Wide values (`long`, `double`) occupy two stack and local slots, matching the
//! slot counts the stack analysis in [`MethodBody::stack_depths`] works with.
//!
//! The event wrapper types and the runtime support type are provided as intrinsics, so
//! rewritten bodies and generated proxies run without any host runtime.

use std::{collections::HashMap, sync::Arc};

use crate::{
    diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, Diagnostics},
    emulation::{Callable, EmValue, HeapObject, ManagedHeap, NativeContext, Program},
    event::{
        info::{CANCEL, CONSTRUCTOR_NAME, GET_RETURN_VALUE, IS_CANCELLED, SET_RETURN_VALUE},
        WrapperType,
    },
    ir::{
        ArithOp, Constant, FieldOp, FieldRef, GuardedCall, Instruction, JumpCondition, LabelId,
        MethodBody, MethodRef, ValueKind, OBJECT_CLASS,
    },
    proxy::{ON_MISSING_CLASS, ON_MISSING_METHOD, RUNTIME_SUPPORT_CLASS},
    Error, Result,
};

/// Execution limits of one [`Interpreter`].
///
/// # Default Values
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_instructions` | 1,000,000 |
/// | `max_call_depth` | 256 |
/// | `max_heap_objects` | 100,000 |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulationLimits {
    /// Maximum instructions to execute, 0 for unlimited
    pub max_instructions: u64,
    /// Maximum nesting of interpreted calls
    pub max_call_depth: usize,
    /// Maximum number of heap objects, 0 for unlimited
    pub max_heap_objects: usize,
}

impl Default for EmulationLimits {
    fn default() -> Self {
        EmulationLimits {
            max_instructions: 1_000_000,
            max_call_depth: 256,
            max_heap_objects: 100_000,
        }
    }
}

impl EmulationLimits {
    /// Creates the default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the instruction budget.
    #[must_use]
    pub fn with_max_instructions(mut self, max: u64) -> Self {
        self.max_instructions = max;
        self
    }

    /// Sets the call depth limit.
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the heap object limit.
    #[must_use]
    pub fn with_max_heap_objects(mut self, max: usize) -> Self {
        self.max_heap_objects = max;
        self
    }
}

/// One slot of the operand stack or the locals.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Value(EmValue),
    /// Upper half of a wide value
    Top,
    Empty,
}

struct Frame<'b> {
    body: &'b MethodBody,
    stack: Vec<Slot>,
    locals: Vec<Slot>,
    labels: HashMap<LabelId, usize>,
}

impl<'b> Frame<'b> {
    fn new(body: &'b MethodBody, args: &[EmValue]) -> Result<Self> {
        let expected = body.signature.params.len() + usize::from(!body.is_static());
        if args.len() != expected {
            return Err(Error::Emulation(format!(
                "{} expects {} argument(s), got {}",
                body,
                expected,
                args.len()
            )));
        }

        let mut frame = Frame {
            body,
            stack: Vec::with_capacity(usize::from(body.max_stack)),
            locals: vec![Slot::Empty; usize::from(body.max_locals)],
            labels: body.instructions.label_positions()?,
        };
        let mut slot = 0u16;
        for arg in args {
            frame.store_local(slot, *arg)?;
            slot += arg.kind().slots();
        }
        Ok(frame)
    }

    fn push(&mut self, value: EmValue) -> Result<()> {
        let slots = usize::from(value.kind().slots());
        if self.stack.len() + slots > usize::from(self.body.max_stack) {
            return Err(Error::StackOverflow {
                method: self.body.to_string(),
                depth: self.stack.len() + slots,
                max_stack: self.body.max_stack,
            });
        }
        self.stack.push(Slot::Value(value));
        if slots == 2 {
            self.stack.push(Slot::Top);
        }
        Ok(())
    }

    fn pop_slot(&mut self) -> Result<Slot> {
        self.stack
            .pop()
            .ok_or_else(|| Error::Emulation(format!("Stack underflow in {}", self.body)))
    }

    fn pop(&mut self) -> Result<EmValue> {
        match self.pop_slot()? {
            Slot::Value(value) if value.kind().slots() == 1 => Ok(value),
            Slot::Top => match self.pop_slot()? {
                Slot::Value(value) if value.kind().slots() == 2 => Ok(value),
                other => Err(self.corrupt(&format!("split wide value {other:?}"))),
            },
            other => Err(self.corrupt(&format!("unexpected stack slot {other:?}"))),
        }
    }

    fn pop_kind(&mut self, kind: ValueKind) -> Result<EmValue> {
        let value = self.pop()?;
        if value.kind() != kind {
            return Err(self.corrupt(&format!("expected {kind} value, found {value}")));
        }
        Ok(value)
    }

    fn pop_args(&mut self, method: &MethodRef, receiver: bool) -> Result<Vec<EmValue>> {
        let mut args = Vec::with_capacity(method.signature.params.len() + usize::from(receiver));
        for param in method.signature.params.iter().rev() {
            let kind = param
                .value_kind()
                .ok_or_else(|| self.corrupt("void parameter"))?;
            args.push(self.pop_kind(kind)?);
        }
        if receiver {
            args.push(self.pop_kind(ValueKind::Reference)?);
        }
        args.reverse();
        Ok(args)
    }

    fn load_local(&self, kind: ValueKind, index: u16) -> Result<EmValue> {
        self.check_local(kind, index)?;
        match self.locals[usize::from(index)] {
            Slot::Value(value) if value.kind() == kind => Ok(value),
            other => Err(self.corrupt(&format!("local {index} holds {other:?}, not {kind}"))),
        }
    }

    fn store_local(&mut self, index: u16, value: EmValue) -> Result<()> {
        let kind = value.kind();
        self.check_local(kind, index)?;
        let index = usize::from(index);
        self.locals[index] = Slot::Value(value);
        if kind.slots() == 2 {
            self.locals[index + 1] = Slot::Top;
        }
        Ok(())
    }

    fn check_local(&self, kind: ValueKind, index: u16) -> Result<()> {
        if u32::from(index) + u32::from(kind.slots()) > u32::from(self.body.max_locals) {
            return Err(self.corrupt(&format!(
                "local {index} exceeds max_locals {}",
                self.body.max_locals
            )));
        }
        Ok(())
    }

    fn target(&self, label: LabelId) -> Result<usize> {
        self.labels
            .get(&label)
            .copied()
            .ok_or_else(|| self.corrupt(&format!("undefined label {label}")))
    }

    fn corrupt(&self, message: &str) -> Error {
        Error::Emulation(format!("{} in {}", message, self.body))
    }
}

/// Reference interpreter for rewritten bodies and generated proxies.
///
/// # Example
///
/// ```rust
/// use eventscope::emulation::{EmValue, EmulationLimits, Interpreter, Program};
/// use eventscope::ir::{Constant, Instruction, MethodAccess, MethodBody, MethodSignature, ValueKind};
///
/// let body = MethodBody::new(
///     "game/Math",
///     "seven",
///     MethodSignature::parse("()I")?,
///     MethodAccess::PUBLIC | MethodAccess::STATIC,
/// )
/// .with_instructions(vec![
///     Instruction::Const(Constant::Int(7)),
///     Instruction::Return(Some(ValueKind::Int)),
/// ])?;
///
/// let program = Program::new();
/// let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
/// assert_eq!(interpreter.execute(&body, &[])?, Some(EmValue::Int(7)));
/// # Ok::<(), eventscope::Error>(())
/// ```
pub struct Interpreter<'p> {
    program: &'p Program,
    limits: EmulationLimits,
    heap: ManagedHeap,
    statics: HashMap<(String, String), EmValue>,
    diagnostics: Arc<Diagnostics>,
    trace: Vec<String>,
    executed: u64,
    depth: usize,
}

impl<'p> Interpreter<'p> {
    /// Creates an interpreter over `program`.
    #[must_use]
    pub fn new(program: &'p Program, limits: EmulationLimits) -> Self {
        Interpreter {
            program,
            heap: ManagedHeap::new(limits.max_heap_objects),
            limits,
            statics: HashMap::new(),
            diagnostics: Arc::new(Diagnostics::new()),
            trace: Vec::new(),
            executed: 0,
            depth: 0,
        }
    }

    /// Reports runtime diagnostics to `diagnostics` instead of a private sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Arc<Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Runtime diagnostics, such as missing listeners.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    /// The heap.
    #[must_use]
    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    /// Mutable access to the heap, for preparing arguments.
    pub fn heap_mut(&mut self) -> &mut ManagedHeap {
        &mut self.heap
    }

    /// Entries recorded by natives and runtime fallbacks, in execution order.
    #[must_use]
    pub fn trace(&self) -> &[String] {
        &self.trace
    }

    /// Number of instructions executed so far.
    #[must_use]
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    /// Allocates a string argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] when the heap limit is reached.
    pub fn alloc_string(&mut self, value: &str) -> Result<EmValue> {
        Ok(EmValue::Ref(self.heap.alloc_string(value)?))
    }

    /// Allocates an instance argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] when the heap limit is reached.
    pub fn alloc_instance(&mut self, class: &str) -> Result<EmValue> {
        Ok(EmValue::Ref(self.heap.alloc_instance(class)?))
    }

    /// Invokes `method` as a static call (or with the receiver as first argument).
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMethod`] if the method does not exist, and any error raised
    /// while executing it.
    pub fn invoke(&mut self, method: &MethodRef, args: &[EmValue]) -> Result<Option<EmValue>> {
        self.call(method, args.to_vec())
    }

    /// Executes `body` with `args` (receiver first for instance methods).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InstructionLimit`] / [`Error::CallDepthLimit`] when a limit is hit,
    /// [`Error::StackOverflow`] when a frame exceeds its declared `max_stack`, and
    /// [`Error::Emulation`] for every other execution failure.
    pub fn execute(&mut self, body: &MethodBody, args: &[EmValue]) -> Result<Option<EmValue>> {
        if self.depth >= self.limits.max_call_depth {
            return Err(Error::CallDepthLimit(self.limits.max_call_depth));
        }
        self.depth += 1;
        let result = self.run(body, args);
        self.depth -= 1;
        result
    }

    fn run(&mut self, body: &MethodBody, args: &[EmValue]) -> Result<Option<EmValue>> {
        let mut frame = Frame::new(body, args)?;
        let insns = body.instructions.as_slice();
        let mut pc = 0usize;

        loop {
            let Some(insn) = insns.get(pc) else {
                return Err(frame.corrupt("execution fell off the end"));
            };
            self.executed += 1;
            if self.limits.max_instructions > 0 && self.executed > self.limits.max_instructions {
                return Err(Error::InstructionLimit(self.limits.max_instructions));
            }
            pc += 1;

            match insn {
                Instruction::Nop | Instruction::Label(_) => {}
                Instruction::Const(Constant::String(value)) => {
                    let value = self.alloc_string(value)?;
                    frame.push(value)?;
                }
                Instruction::Const(constant) => {
                    let value = EmValue::from_constant(constant)
                        .ok_or_else(|| frame.corrupt("unsupported constant"))?;
                    frame.push(value)?;
                }
                Instruction::Load { kind, index } => {
                    let value = frame.load_local(*kind, *index)?;
                    frame.push(value)?;
                }
                Instruction::Store { kind, index } => {
                    let value = frame.pop_kind(*kind)?;
                    frame.store_local(*index, value)?;
                }
                Instruction::Pop => {
                    frame.pop_slot()?;
                }
                Instruction::Dup => match frame.stack.last().copied() {
                    Some(Slot::Value(value)) if value.kind().slots() == 1 => frame.push(value)?,
                    _ => return Err(frame.corrupt("dup of a non single-slot value")),
                },
                Instruction::Arith { op, kind } => {
                    let rhs = frame.pop_kind(*kind)?;
                    let lhs = frame.pop_kind(*kind)?;
                    let Some(value) = arith(*op, lhs, rhs) else {
                        return Err(frame.corrupt("mismatched arithmetic operands"));
                    };
                    frame.push(value)?;
                }
                Instruction::New(class) => {
                    let value = self.alloc_instance(class)?;
                    frame.push(value)?;
                }
                Instruction::CheckCast(class) => {
                    let value = frame.pop_kind(ValueKind::Reference)?;
                    self.check_cast(&value, class)?;
                    frame.push(value)?;
                }
                Instruction::Field { op, field } => self.field(&mut frame, *op, field)?,
                Instruction::Call { kind, method } => {
                    let args = frame.pop_args(method, kind.has_receiver())?;
                    if kind.has_receiver() && args.first().is_some_and(EmValue::is_null) {
                        return Err(frame.corrupt(&format!("null receiver calling {method}")));
                    }
                    if let Some(value) = self.call(method, args)? {
                        frame.push(value)?;
                    }
                }
                Instruction::GuardedCall(call) => {
                    let args = frame.pop_args(&call.target, false)?;
                    if let Some(value) = self.guarded_call(call, args)? {
                        frame.push(value)?;
                    }
                }
                Instruction::Jump { cond, target } => {
                    if branch_taken(&mut frame, *cond)? {
                        pc = frame.target(*target)?;
                    }
                }
                Instruction::Return(None) => return Ok(None),
                Instruction::Return(Some(kind)) => return Ok(Some(frame.pop_kind(*kind)?)),
                Instruction::Throw => {
                    let value = frame.pop_kind(ValueKind::Reference)?;
                    return Err(frame.corrupt(&format!("uncaught throw of {value}")));
                }
            }
        }
    }

    fn call(&mut self, method: &MethodRef, args: Vec<EmValue>) -> Result<Option<EmValue>> {
        if let Some(result) = self.intrinsic(method, &args)? {
            return Ok(result);
        }

        match self.program.resolve(method) {
            Some(Callable::Body(body)) => self.execute(&body, &args),
            Some(Callable::Native(native)) => {
                let mut context = NativeContext {
                    heap: &mut self.heap,
                    trace: &mut self.trace,
                    method,
                };
                (*native)(&mut context, &args)
            }
            // constructors of types the program does not model (java/lang/Object) do nothing
            None if method.name == CONSTRUCTOR_NAME => Ok(None),
            None => Err(Error::MissingMethod(method.to_string())),
        }
    }

    fn guarded_call(&mut self, call: &GuardedCall, args: Vec<EmValue>) -> Result<Option<EmValue>> {
        let target = &call.target;
        let fallback = if !self.program.has_class(&target.owner) {
            &call.on_missing_class
        } else if self.program.resolve(target).is_none() {
            &call.on_missing_method
        } else {
            return self.call(target, args);
        };

        let report = vec![
            self.alloc_string(&call.context)?,
            self.alloc_string(&target.owner)?,
            self.alloc_string(&target.name)?,
        ];
        self.call(fallback, report)?;
        Ok(EmValue::default_for_type(&target.signature.ret))
    }

    /// Wrapper and runtime support methods. `Ok(None)` means "not an intrinsic".
    #[allow(clippy::option_option)]
    fn intrinsic(&mut self, method: &MethodRef, args: &[EmValue]) -> Result<Option<Option<EmValue>>> {
        if method.owner == RUNTIME_SUPPORT_CLASS {
            return self.runtime_support(method, args);
        }
        if WrapperType::from_class_name(&method.owner).is_none() {
            return Ok(None);
        }
        let Some(receiver) = args.first() else {
            return Ok(None);
        };

        let name = method.name.as_str();
        if name == CONSTRUCTOR_NAME && args.len() == 4 {
            let event = self.heap.string(&args[1]).unwrap_or_default().to_string();
            let cancellable = args[3].as_bool().unwrap_or(false);
            let state = self.heap.wrapper_mut(receiver)?;
            state.name = event;
            state.source = args[2];
            state.cancellable = cancellable;
            return Ok(Some(None));
        }
        if name == IS_CANCELLED {
            let cancelled = self.heap.wrapper(receiver)?.cancelled;
            return Ok(Some(Some(EmValue::from_bool(cancelled))));
        }
        if name == CANCEL {
            self.heap.wrapper_mut(receiver)?.cancel()?;
            return Ok(Some(None));
        }
        if name == SET_RETURN_VALUE && args.len() == 2 {
            self.heap.wrapper_mut(receiver)?.return_value = Some(args[1]);
            return Ok(Some(None));
        }
        if name.starts_with(GET_RETURN_VALUE) {
            let stored = self.heap.wrapper(receiver)?.return_value;
            return self.return_value(method, stored).map(|value| Some(Some(value)));
        }
        Ok(None)
    }

    fn return_value(&self, method: &MethodRef, stored: Option<EmValue>) -> Result<EmValue> {
        let ret = &method.signature.ret;
        let kind = ret
            .value_kind()
            .ok_or_else(|| Error::Emulation(format!("{method} returns void")))?;
        match stored {
            None => Ok(EmValue::default_for(kind)),
            Some(value) if value.kind() == kind => Ok(value),
            Some(value) => Err(Error::Emulation(format!(
                "Override value {value} does not fit {ret} of {method}"
            ))),
        }
    }

    #[allow(clippy::option_option)]
    fn runtime_support(
        &mut self,
        method: &MethodRef,
        args: &[EmValue],
    ) -> Result<Option<Option<EmValue>>> {
        let missing = match method.name.as_str() {
            ON_MISSING_CLASS => "class",
            ON_MISSING_METHOD => "method",
            _ => return Ok(None),
        };
        let text = |index: usize| {
            args.get(index)
                .and_then(|value| self.heap.string(value))
                .unwrap_or_default()
                .to_string()
        };
        let (event, owner, name) = (text(0), text(1), text(2));

        self.trace
            .push(format!("{}({event}, {owner}, {name})", method.name));
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticSeverity::Error,
                DiagnosticCategory::Runtime,
                format!("Listener {missing} missing: {owner}.{name}"),
            )
            .with_event(event),
        );
        Ok(Some(None))
    }

    fn check_cast(&self, value: &EmValue, class: &str) -> Result<()> {
        let Some(handle) = value.as_heap_ref() else {
            return Ok(());
        };
        let actual = self
            .heap
            .get(handle)
            .map(HeapObject::class_name)
            .ok_or_else(|| Error::Emulation(format!("dangling reference {handle}")))?;
        if class == OBJECT_CLASS || actual == class {
            Ok(())
        } else {
            Err(Error::Emulation(format!(
                "ClassCastException: {actual} cannot be cast to {class}"
            )))
        }
    }

    fn field(&mut self, frame: &mut Frame<'_>, op: FieldOp, field: &FieldRef) -> Result<()> {
        let kind = field
            .desc
            .value_kind()
            .ok_or_else(|| frame.corrupt("void field"))?;
        let default = EmValue::default_for(kind);
        let key = (field.owner.clone(), field.name.clone());

        match op {
            FieldOp::GetStatic => {
                let value = self.statics.get(&key).copied().unwrap_or(default);
                frame.push(value)
            }
            FieldOp::PutStatic => {
                let value = frame.pop_kind(kind)?;
                self.statics.insert(key, value);
                Ok(())
            }
            FieldOp::GetField => {
                let receiver = frame.pop_kind(ValueKind::Reference)?;
                let value = self
                    .instance_fields(&receiver)?
                    .get(&field.name)
                    .copied()
                    .unwrap_or(default);
                frame.push(value)
            }
            FieldOp::PutField => {
                let value = frame.pop_kind(kind)?;
                let receiver = frame.pop_kind(ValueKind::Reference)?;
                self.instance_fields(&receiver)?
                    .insert(field.name.clone(), value);
                Ok(())
            }
        }
    }

    fn instance_fields(&mut self, receiver: &EmValue) -> Result<&mut HashMap<String, EmValue>> {
        match receiver.as_heap_ref().and_then(|r| self.heap.get_mut(r)) {
            Some(HeapObject::Instance { fields, .. }) => Ok(fields),
            _ => Err(Error::Emulation(format!(
                "field access on {receiver}, which is not an instance"
            ))),
        }
    }
}

fn arith(op: ArithOp, lhs: EmValue, rhs: EmValue) -> Option<EmValue> {
    Some(match (lhs, rhs) {
        (EmValue::Int(a), EmValue::Int(b)) => EmValue::Int(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
        }),
        (EmValue::Long(a), EmValue::Long(b)) => EmValue::Long(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
        }),
        (EmValue::Float(a), EmValue::Float(b)) => EmValue::Float(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
        }),
        (EmValue::Double(a), EmValue::Double(b)) => EmValue::Double(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
        }),
        _ => return None,
    })
}

fn branch_taken(frame: &mut Frame<'_>, cond: JumpCondition) -> Result<bool> {
    let int = |frame: &mut Frame<'_>| -> Result<i32> {
        let value = frame.pop_kind(ValueKind::Int)?;
        value.as_i32().ok_or_else(|| frame.corrupt("expected int"))
    };
    Ok(match cond {
        JumpCondition::Always => true,
        JumpCondition::IfZero => int(frame)? == 0,
        JumpCondition::IfNonZero => int(frame)? != 0,
        JumpCondition::IfNegative => int(frame)? < 0,
        JumpCondition::IfNull => frame.pop_kind(ValueKind::Reference)?.is_null(),
        JumpCondition::IfNonNull => !frame.pop_kind(ValueKind::Reference)?.is_null(),
        JumpCondition::IfIntEqual | JumpCondition::IfIntNotEqual | JumpCondition::IfIntLess => {
            let rhs = int(frame)?;
            let lhs = int(frame)?;
            match cond {
                JumpCondition::IfIntEqual => lhs == rhs,
                JumpCondition::IfIntNotEqual => lhs != rhs,
                _ => lhs < rhs,
            }
        }
    })
}

impl std::fmt::Debug for Interpreter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("program", self.program)
            .field("limits", &self.limits)
            .field("heap", &self.heap.len())
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::info::EVENT_INFO_CLASS,
        ir::{MethodAccess, TypeDesc},
        proxy::{on_missing_class, on_missing_method},
        test::{body, static_call},
    };

    const STATIC: MethodAccess = MethodAccess::PUBLIC.union(MethodAccess::STATIC);

    fn run(body: &MethodBody, args: &[EmValue]) -> Result<Option<EmValue>> {
        let program = Program::new();
        Interpreter::new(&program, EmulationLimits::default()).execute(body, args)
    }

    #[test]
    fn loop_with_wide_locals() {
        // long sum = 0; for (int i = n; i != 0; i--) sum += 3; return sum;
        let top = LabelId(0);
        let done = LabelId(1);
        let sum = body(
            "a/Math",
            "sum",
            "(I)J",
            STATIC,
            vec![
                Instruction::Const(Constant::Long(0)),
                Instruction::Store { kind: ValueKind::Long, index: 1 },
                Instruction::Label(top),
                Instruction::Load { kind: ValueKind::Int, index: 0 },
                Instruction::Jump { cond: JumpCondition::IfZero, target: done },
                Instruction::Load { kind: ValueKind::Long, index: 1 },
                Instruction::Const(Constant::Long(3)),
                Instruction::Arith { op: ArithOp::Add, kind: ValueKind::Long },
                Instruction::Store { kind: ValueKind::Long, index: 1 },
                Instruction::Load { kind: ValueKind::Int, index: 0 },
                Instruction::Const(Constant::Int(1)),
                Instruction::Arith { op: ArithOp::Sub, kind: ValueKind::Int },
                Instruction::Store { kind: ValueKind::Int, index: 0 },
                Instruction::Jump { cond: JumpCondition::Always, target: top },
                Instruction::Label(done),
                Instruction::Load { kind: ValueKind::Long, index: 1 },
                Instruction::Return(Some(ValueKind::Long)),
            ],
        );
        assert_eq!(sum.max_locals, 3);
        assert_eq!(run(&sum, &[EmValue::Int(4)]).unwrap(), Some(EmValue::Long(12)));
    }

    #[test]
    fn undercounted_max_stack_fails() {
        let mut two = body(
            "a/Math",
            "two",
            "()J",
            STATIC,
            vec![
                Instruction::Const(Constant::Long(2)),
                Instruction::Return(Some(ValueKind::Long)),
            ],
        );
        two.max_stack = 1;
        assert!(matches!(
            run(&two, &[]),
            Err(Error::StackOverflow { max_stack: 1, .. })
        ));
    }

    #[test]
    fn undercounted_max_locals_fails() {
        let mut store = body(
            "a/Math",
            "store",
            "()V",
            STATIC,
            vec![
                Instruction::Const(Constant::Int(1)),
                Instruction::Store { kind: ValueKind::Int, index: 0 },
                Instruction::Return(None),
            ],
        );
        store.max_locals = 0;
        assert!(run(&store, &[]).is_err());
    }

    #[test]
    fn instruction_limit() {
        let spin = LabelId(0);
        let forever = body(
            "a/Loop",
            "spin",
            "()V",
            STATIC,
            vec![
                Instruction::Label(spin),
                Instruction::Jump { cond: JumpCondition::Always, target: spin },
            ],
        );
        let program = Program::new();
        let limits = EmulationLimits::new().with_max_instructions(100);
        let err = Interpreter::new(&program, limits)
            .execute(&forever, &[])
            .unwrap_err();
        assert!(matches!(err, Error::InstructionLimit(100)));
    }

    #[test]
    fn call_depth_limit() {
        let recurse = body(
            "a/Loop",
            "recurse",
            "()V",
            STATIC,
            vec![static_call("a/Loop", "recurse", "()V"), Instruction::Return(None)],
        );
        let mut program = Program::new();
        program.add_body(recurse.clone());
        let limits = EmulationLimits::new().with_max_call_depth(8);
        let err = Interpreter::new(&program, limits)
            .execute(&recurse, &[])
            .unwrap_err();
        assert!(matches!(err, Error::CallDepthLimit(8)));
    }

    fn guarded(owner: &str, name: &str) -> Instruction {
        Instruction::GuardedCall(Box::new(GuardedCall {
            target: MethodRef::parse(owner, name, "()I").unwrap(),
            context: "onTick".to_string(),
            on_missing_class: on_missing_class(),
            on_missing_method: on_missing_method(),
        }))
    }

    fn guarded_body() -> MethodBody {
        body(
            "a/Caller",
            "run",
            "()I",
            STATIC,
            vec![
                guarded("mods/Absent", "value"),
                guarded("mods/Hooks", "absent"),
                Instruction::Arith { op: ArithOp::Add, kind: ValueKind::Int },
                guarded("mods/Hooks", "value"),
                Instruction::Arith { op: ArithOp::Add, kind: ValueKind::Int },
                Instruction::Return(Some(ValueKind::Int)),
            ],
        )
    }

    #[test]
    fn guarded_calls_fall_back_and_continue() {
        let mut program = Program::new();
        program
            .add_native("mods/Hooks", "value", "()I", |ctx, _| {
                ctx.record("value");
                Ok(Some(EmValue::Int(5)))
            })
            .unwrap();

        let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
        let result = interpreter.execute(&guarded_body(), &[]).unwrap();
        assert_eq!(result, Some(EmValue::Int(5)));
        assert_eq!(
            interpreter.trace(),
            [
                "onMissingClass(onTick, mods/Absent, value)",
                "onMissingMethod(onTick, mods/Hooks, absent)",
                "value",
            ]
        );
        let runtime = interpreter
            .diagnostics()
            .by_category(DiagnosticCategory::Runtime);
        assert_eq!(runtime.len(), 2);
        assert_eq!(runtime[0].event.as_deref(), Some("onTick"));
    }

    #[test]
    fn unguarded_missing_method_fails() {
        let caller = body(
            "a/Caller",
            "run",
            "()V",
            STATIC,
            vec![static_call("mods/Absent", "m", "()V"), Instruction::Return(None)],
        );
        assert!(matches!(run(&caller, &[]), Err(Error::MissingMethod(_))));
    }

    #[test]
    fn wrapper_intrinsics() {
        let program = Program::new();
        let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
        let wrapper = interpreter.alloc_instance(EVENT_INFO_CLASS).unwrap();
        let name = interpreter.alloc_string("onTick").unwrap();

        let info = WrapperType::EventInfo;
        interpreter
            .invoke(
                &info.constructor(),
                &[wrapper, name, EmValue::Null, EmValue::from_bool(false)],
            )
            .unwrap();
        assert_eq!(interpreter.heap().wrapper(&wrapper).unwrap().name, "onTick");

        assert!(interpreter.invoke(&info.cancel(), &[wrapper]).is_err());
        let cancelled = interpreter.invoke(&info.is_cancelled(), &[wrapper]).unwrap();
        assert_eq!(cancelled, Some(EmValue::Int(0)));
    }

    #[test]
    fn check_cast() {
        let program = Program::new();
        let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
        let text = interpreter.alloc_string("x").unwrap();
        assert!(interpreter.check_cast(&text, "java/lang/String").is_ok());
        assert!(interpreter.check_cast(&text, OBJECT_CLASS).is_ok());
        assert!(interpreter.check_cast(&text, "game/Entity").is_err());
        assert!(interpreter.check_cast(&EmValue::Null, "game/Entity").is_ok());
        assert_eq!(
            EmValue::default_for_type(&TypeDesc::object("game/Entity")),
            Some(EmValue::Null)
        );
    }
}
