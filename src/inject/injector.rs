use crate::{
    event::{info::return_accessor, Attachment},
    ir::{
        CallKind, CodeBuilder, CodeRun, Constant, JumpCondition, LabelId, MethodBody, MethodRef,
        ValueKind,
    },
    Result,
};

/// What one injection added to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionReport {
    /// Insertion index of the synthesized run
    pub index: usize,
    /// Number of instructions inserted
    pub inserted: usize,
    /// Operand-stack depth at the site before insertion
    pub depth: u16,
    /// Local slot holding the wrapper at cancellable sites
    pub wrapper_local: Option<u16>,
}

/// Synthesizes the call into a dispatch routine at one site.
///
/// The inserted run leaves the operand stack as it found it: the wrapper is constructed,
/// handed to the routine together with every argument of the method, and at cancellable
/// sites read back from a fresh local to decide whether to return early.
///
/// ```text
/// new      <wrapper>
/// dup
/// ldc      "<event name>"
/// aload 0 | aconst_null
/// iconst   <cancellable>
/// invokespecial <wrapper>.<init>(Ljava/lang/String;Ljava/lang/Object;Z)V
/// [astore n; aload n]                       cancellable only
/// <load every argument>
/// invokestatic <proxy>.<routine>(<wrapper><args>)V
/// [aload n; invokevirtual isCancelled()Z; ifeq skip;
///  return | aload n; getReturnValue*; checkcast?; <x>return;
///  skip:]                                    cancellable only
/// ```
#[derive(Debug)]
pub struct Injector<'a> {
    event: &'a str,
    attachment: &'a Attachment,
    cancellable: bool,
}

impl<'a> Injector<'a> {
    /// Creates an injector for `event` attached with `attachment`.
    #[must_use]
    pub fn new(event: &'a str, attachment: &'a Attachment, cancellable: bool) -> Self {
        Injector {
            event,
            attachment,
            cancellable,
        }
    }

    /// Inserts the dispatch call to `dispatch` before instruction `index` of `body`.
    ///
    /// `max_stack` is raised to cover the stack depth at the site plus the peak of the inserted
    /// run, `max_locals` by the wrapper slot of cancellable sites. On error `body` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Synthesis`] if the stack depth at `index` cannot be determined
    /// (broken body, unreachable site), the bookkeeping would overflow or the body has no label
    /// ids left.
    pub fn inject(
        &self,
        body: &mut MethodBody,
        index: usize,
        dispatch: &MethodRef,
    ) -> Result<InjectionReport> {
        let depths = body
            .stack_depths()
            .map_err(|e| synthesis_error!(body, "stack analysis failed: {}", e))?;
        let depth = depths
            .get(index)
            .copied()
            .flatten()
            .ok_or_else(|| synthesis_error!(body, "site {} is unreachable", index))?;

        let wrapper_local = if self.cancellable {
            Some(body.max_locals.max(body.required_max_locals()))
        } else {
            None
        };
        let max_locals = match wrapper_local {
            Some(slot) => slot
                .checked_add(1)
                .ok_or_else(|| synthesis_error!(body, "local slots exhausted"))?,
            None => body.max_locals,
        };

        let skip = body
            .instructions
            .new_label()
            .map_err(|e| synthesis_error!(body, "{}", e))?;
        let run = self
            .synthesize(body, dispatch, wrapper_local, skip)
            .map_err(|e| synthesis_error!(body, "{}", e))?;
        let max_stack = depth
            .checked_add(run.peak)
            .ok_or_else(|| synthesis_error!(body, "operand stack exceeds {} slots", u16::MAX))?;

        let inserted = run.instructions.len();
        body.instructions
            .insert(index, run.instructions)
            .map_err(|e| synthesis_error!(body, "{}", e))?;
        body.max_stack = body.max_stack.max(max_stack);
        body.max_locals = max_locals;

        Ok(InjectionReport {
            index,
            inserted,
            depth,
            wrapper_local,
        })
    }

    fn synthesize(
        &self,
        body: &MethodBody,
        dispatch: &MethodRef,
        wrapper_local: Option<u16>,
        skip: LabelId,
    ) -> Result<CodeRun> {
        let wrapper = self.attachment.wrapper;
        let mut builder = CodeBuilder::new();

        builder
            .new_object(wrapper.class_name())?
            .dup()?
            .constant(Constant::String(self.event.to_string()))?;
        if self.attachment.is_static {
            builder.constant(Constant::Null)?;
        } else {
            builder.load(ValueKind::Reference, 0)?;
        }
        builder
            .constant(Constant::Int(i32::from(self.cancellable)))?
            .call(CallKind::Special, wrapper.constructor())?;

        if let Some(slot) = wrapper_local {
            builder
                .store(ValueKind::Reference, slot)?
                .load(ValueKind::Reference, slot)?;
        }

        builder
            .load_args(&self.attachment.signature, body.first_arg_slot())?
            .call(CallKind::Static, dispatch.clone())?;

        if let Some(slot) = wrapper_local {
            builder
                .load(ValueKind::Reference, slot)?
                .call(CallKind::Virtual, wrapper.is_cancelled())?
                .jump(JumpCondition::IfZero, skip)?;

            match return_accessor(&self.attachment.return_type) {
                None => {
                    builder.ret(None)?;
                }
                Some(accessor) => {
                    builder
                        .load(ValueKind::Reference, slot)?
                        .call(CallKind::Virtual, accessor.method)?;
                    if let Some(class) = &accessor.cast {
                        builder.checkcast(class)?;
                    }
                    builder.ret(Some(accessor.kind))?;
                }
            }
            builder.label(skip)?;
        }

        Ok(builder.finish())
    }
}
