use eventscope::prelude::*;

fn size_body() -> Result<MethodBody> {
    MethodBody::new(
        "game/Net",
        "size",
        MethodSignature::parse("(J)I")?,
        MethodAccess::PUBLIC,
    )
    .with_instructions(vec![
        Instruction::Call {
            kind: CallKind::Static,
            method: MethodRef::parse("game/Net", "original", "()V")?,
        },
        Instruction::Const(Constant::Int(4)),
        Instruction::Return(Some(ValueKind::Int)),
    ])
}

fn handlers(program: &mut Program) -> Result<()> {
    program.add_native("game/Net", "original", "()V", |ctx, _| {
        ctx.record("original");
        Ok(None)
    })?;
    for (name, result) in [("first", 10), ("second", 20)] {
        program.add_native("mods/Net", name, "(Lgame/Net;J)I", move |ctx, args| {
            ctx.record(format!("{name} {}", args[1]));
            Ok(Some(EmValue::Int(result)))
        })?;
    }
    Ok(())
}

fn run(context: &EngineContext, body: &mut MethodBody) -> Result<(Option<EmValue>, Vec<String>)> {
    assert!(context.redirector().transform(body)?);
    body.validate()?;
    assert!(body.max_stack >= body.required_max_stack()?);

    let mut program = Program::new();
    handlers(&mut program)?;
    let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
    let receiver = interpreter.alloc_instance("game/Net")?;
    let result = interpreter.execute(body, &[receiver, EmValue::Long(64)])?;
    Ok((result, interpreter.trace().to_vec()))
}

#[test]
fn test_replace_returns_last_handler_result() -> Result<()> {
    let context = EngineContext::default();
    let target = MethodDescriptor::new("game/Net", "size", "(J)I")?;
    for name in ["first", "second"] {
        context.register_redirect(
            target.clone(),
            ListenerRef::new("mods/Net", name),
            RedirectKind::Replace,
            false,
        )?;
    }

    let mut body = size_body()?;
    let (result, trace) = run(&context, &mut body)?;
    assert_eq!(result, Some(EmValue::Int(20)));
    assert_eq!(trace, ["first 64L", "second 64L"]);
    Ok(())
}

#[test]
fn test_prepend_keeps_original() -> Result<()> {
    let context = EngineContext::default();
    let target = MethodDescriptor::new("game/Net", "size", "(J)I")?;
    context.register_redirect(
        target.clone(),
        ListenerRef::new("mods/Net", "first"),
        RedirectKind::Prepend,
        false,
    )?;
    context.register_redirect(
        target,
        ListenerRef::new("mods/Net", "second"),
        RedirectKind::Prepend,
        true,
    )?;

    let mut body = size_body()?;
    let (result, trace) = run(&context, &mut body)?;
    assert_eq!(result, Some(EmValue::Int(4)));
    assert_eq!(trace, ["second 64L", "first 64L", "original"]);
    Ok(())
}

#[test]
fn test_kind_is_fixed_by_first_registration() -> Result<()> {
    let context = EngineContext::default();
    let target = MethodDescriptor::new("game/Net", "size", "(J)I")?;
    context.register_redirect(
        target.clone(),
        ListenerRef::new("mods/Net", "first"),
        RedirectKind::Replace,
        false,
    )?;
    let rejected = context.register_redirect(
        target,
        ListenerRef::new("mods/Net", "second"),
        RedirectKind::Prepend,
        false,
    );
    assert!(rejected.is_err_and(|error| error.is_configuration()));
    assert_eq!(context.redirects().len(), 1);
    Ok(())
}
