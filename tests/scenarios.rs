//! Complete registration-to-execution scenarios.

use eventscope::prelude::*;

const STATIC: MethodAccess = MethodAccess::PUBLIC.union(MethodAccess::STATIC);

fn static_call(owner: &str, name: &str, descriptor: &str) -> Result<Instruction> {
    Ok(Instruction::Call {
        kind: CallKind::Static,
        method: MethodRef::parse(owner, name, descriptor)?,
    })
}

fn client_load() -> Result<MethodBody> {
    MethodBody::new(
        "a",
        "b",
        MethodSignature::parse("()Z")?,
        MethodAccess::PUBLIC,
    )
    .with_instructions(vec![
        static_call("a", "c", "()V")?,
        Instruction::Const(Constant::Int(1)),
        Instruction::Return(Some(ValueKind::Int)),
    ])
}

fn load_descriptor() -> Result<MethodDescriptor> {
    MethodDescriptor::builder()
        .alias(NamingEpoch::Deobfuscated, "game.Client", "load", "()Z")?
        .alias(NamingEpoch::Obfuscated, "a", "b", "()Z")?
        .build()
}

/// Two events at the head of `Client.load()`: a cancellable security check that runs first
/// and a plain notification.
fn load_program(context: &EngineContext, deny: bool) -> Result<Program> {
    let mut program = Program::new();
    program.add_proxies(&context.generate_proxies()?);
    program.add_native("a", "c", "()V", |ctx, _| {
        ctx.record("body");
        Ok(None)
    })?;
    program.add_native(
        "mods/Security",
        "check",
        "(Leventscope/event/ReturnEventInfo;)V",
        move |ctx, args| {
            let name = ctx.event_name(&args[0])?;
            ctx.record(format!("check via {name}"));
            if deny {
                ctx.cancel_with(&args[0], EmValue::from_bool(false))?;
            }
            Ok(None)
        },
    )?;
    program.add_native(
        "mods/Loader",
        "onLoad",
        "(Leventscope/event/ReturnEventInfo;)V",
        |ctx, _| {
            ctx.record("onLoad");
            Ok(None)
        },
    )?;
    Ok(program)
}

#[test]
fn test_secure_load_can_deny() -> Result<()> {
    let context = EngineContext::default();
    let on_load = context.define_event("onLoad", false, 1000)?;
    let on_load_secure = context.define_event("onLoadSecure", true, 500)?;
    context.register_injection(&on_load, load_descriptor()?, Head)?;
    context.register_injection(&on_load_secure, load_descriptor()?, Head)?;
    context.add_listener(&on_load, ListenerRef::parse("mods.Loader.onLoad")?)?;
    context.add_listener(&on_load_secure, ListenerRef::parse("mods.Security.check")?)?;

    let mut load = client_load()?;
    let outcome = context.transformer().transform(&mut load)?;
    assert!(outcome.modified);
    assert_eq!(outcome.sites, 1);
    assert_eq!(outcome.routines.len(), 1);

    let routine = &outcome.routines[0];
    assert!(routine.is_cancellable());
    let order: Vec<String> = routine
        .events()
        .iter()
        .map(|event| event.name().to_string())
        .collect();
    assert_eq!(order, ["onLoadSecure", "onLoad"]);

    let allowed = load_program(&context, false)?;
    let mut interpreter = Interpreter::new(&allowed, EmulationLimits::default());
    let client = interpreter.alloc_instance("a")?;
    assert_eq!(interpreter.execute(&load, &[client])?, Some(EmValue::Int(1)));
    assert_eq!(
        interpreter.trace(),
        ["check via onLoadSecure", "onLoad", "body"]
    );

    let denied = load_program(&context, true)?;
    let mut interpreter = Interpreter::new(&denied, EmulationLimits::default());
    let client = interpreter.alloc_instance("a")?;
    assert_eq!(
        interpreter.execute(&load, &[client])?,
        Some(EmValue::from_bool(false))
    );
    assert_eq!(interpreter.trace(), ["check via onLoadSecure"]);
    Ok(())
}

#[test]
fn test_second_render_call() -> Result<()> {
    let render = MethodDescriptor::new("game/Renderer", "render", "()V")?;
    let context = EngineContext::default();
    let event = context.define_event("onSecondRender", false, 0)?;
    context.register_injection(
        &event,
        MethodDescriptor::new("game/Scene", "draw", "()V")?,
        BeforeCall::nth(render, 1),
    )?;
    context.add_listener(&event, ListenerRef::new("mods/Hooks", "onSecondRender"))?;

    let call = static_call("game/Renderer", "render", "()V")?;
    let mut draw = MethodBody::new("game/Scene", "draw", MethodSignature::parse("()V")?, STATIC)
        .with_instructions(vec![
            call.clone(),
            call.clone(),
            call,
            Instruction::Return(None),
        ])?;
    context.transformer().transform(&mut draw)?;

    let mut program = Program::new();
    program.add_proxies(&context.generate_proxies()?);
    program.add_native("game/Renderer", "render", "()V", |ctx, _| {
        ctx.record("render");
        Ok(None)
    })?;
    program.add_native(
        "mods/Hooks",
        "onSecondRender",
        "(Leventscope/event/EventInfo;)V",
        |ctx, _| {
            ctx.record("event");
            Ok(None)
        },
    )?;

    let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
    interpreter.execute(&draw, &[])?;
    assert_eq!(interpreter.trace(), ["render", "event", "render", "render"]);
    Ok(())
}

#[test]
fn test_listener_sees_arguments() -> Result<()> {
    let context = EngineContext::default();
    let event = context.define_event("onMove", false, 0)?;
    context.register_injection(
        &event,
        MethodDescriptor::new("game/Entity", "move", "(DI)V")?,
        Head,
    )?;
    context.add_listener(&event, ListenerRef::new("mods/Hooks", "onMove"))?;

    let mut movement = MethodBody::new(
        "game/Entity",
        "move",
        MethodSignature::parse("(DI)V")?,
        MethodAccess::PUBLIC,
    )
    .with_instructions(vec![Instruction::Return(None)])?;
    context.transformer().transform(&mut movement)?;

    let mut program = Program::new();
    program.add_proxies(&context.generate_proxies()?);
    program.add_native(
        "mods/Hooks",
        "onMove",
        "(Leventscope/event/EventInfo;DI)V",
        |ctx, args| {
            ctx.record(format!("{} {}", args[1], args[2]));
            Ok(None)
        },
    )?;

    let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
    let entity = interpreter.alloc_instance("game/Entity")?;
    interpreter.execute(
        &movement,
        &[entity, EmValue::Double(1.5), EmValue::Int(3)],
    )?;
    assert_eq!(interpreter.trace(), ["1.5D 3"]);
    Ok(())
}

#[test]
fn test_profiler_section() -> Result<()> {
    let load = MethodDescriptor::new("game/Assets", "load", "(Ljava/lang/String;)V")?;
    let context = EngineContext::default();
    let event = context.define_event("onMusic", false, 0)?;
    context.register_injection(
        &event,
        MethodDescriptor::new("game/Assets", "init", "()V")?,
        BeforeCallWithConstant::new(load, Constant::String("music".into())),
    )?;
    context.add_listener(
        &event,
        ListenerRef::new("mods/Hooks", "onMusic")
            .with_signature("(Leventscope/event/EventInfo;)V")?,
    )?;

    let call = static_call("game/Assets", "load", "(Ljava/lang/String;)V")?;
    let mut init = MethodBody::new("game/Assets", "init", MethodSignature::parse("()V")?, STATIC)
        .with_instructions(vec![
            Instruction::Const(Constant::String("shaders".into())),
            call.clone(),
            Instruction::Const(Constant::String("music".into())),
            call,
            Instruction::Return(None),
        ])?;
    let outcome = context.transformer().transform(&mut init)?;
    assert_eq!(outcome.sites, 1);

    let mut program = Program::new();
    program.add_proxies(&context.generate_proxies()?);
    program.add_native(
        "game/Assets",
        "load",
        "(Ljava/lang/String;)V",
        |ctx, args| {
            let section = ctx.string(&args[0]).unwrap_or_default();
            ctx.record(format!("load {section}"));
            Ok(None)
        },
    )?;
    program.add_native(
        "mods/Hooks",
        "onMusic",
        "(Leventscope/event/EventInfo;)V",
        |ctx, _| {
            ctx.record("event");
            Ok(None)
        },
    )?;

    let mut interpreter = Interpreter::new(&program, EmulationLimits::default());
    interpreter.execute(&init, &[])?;
    assert_eq!(
        interpreter.trace(),
        ["load shaders", "event", "load music"]
    );
    Ok(())
}
