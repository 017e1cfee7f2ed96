//! Benchmarks for the injection pass.
//!
//! Each iteration builds a fresh context, since a transformed body cannot be transformed
//! again without injecting twice.

extern crate eventscope;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use eventscope::prelude::*;
use std::hint::black_box;

fn render_call() -> Instruction {
    Instruction::Call {
        kind: CallKind::Static,
        method: MethodRef::parse("game/Renderer", "render", "(F)V").unwrap(),
    }
}

/// A static `(I)V` body with `calls` render calls and a return on each branch.
fn scene(calls: usize) -> MethodBody {
    let mut code = InstructionList::new();
    let other = code.new_label().unwrap();
    code.push(Instruction::Load {
        kind: ValueKind::Int,
        index: 0,
    });
    code.push(Instruction::Jump {
        cond: JumpCondition::IfZero,
        target: other,
    });
    for _ in 0..calls {
        code.push(Instruction::Const(Constant::Float(1.0)));
        code.push(render_call());
    }
    code.push(Instruction::Return(None));
    code.push(Instruction::Label(other));
    code.push(Instruction::Return(None));

    MethodBody::new(
        "game/Scene",
        "draw",
        MethodSignature::parse("(I)V").unwrap(),
        MethodAccess::PUBLIC | MethodAccess::STATIC,
    )
    .with_instructions(code.as_slice().to_vec())
    .unwrap()
}

fn context(events: usize) -> EngineContext {
    let context = EngineContext::default();
    let target = MethodDescriptor::new("game/Scene", "draw", "(I)V").unwrap();
    let render = MethodDescriptor::new("game/Renderer", "render", "(F)V").unwrap();
    for index in 0..events {
        let event = context
            .define_event(&format!("event{index}"), index % 2 == 0, index as i32)
            .unwrap();
        context
            .register_injection(&event, target.clone(), BeforeCall::new(render.clone()))
            .unwrap();
        context
            .register_injection(&event, target.clone(), BeforeReturn::new())
            .unwrap();
        context
            .add_listener(&event, ListenerRef::new("mods/Hooks", "onRender"))
            .unwrap();
    }
    context
}

/// Benchmark one event at every call and return of a small body.
fn bench_transform_small(c: &mut Criterion) {
    c.bench_function("transform_small", |b| {
        b.iter_batched(
            || (context(1), scene(4)),
            |(context, mut body)| {
                let outcome = context.transformer().transform(&mut body).unwrap();
                black_box(outcome)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark eight co-located events in a body with 64 call sites.
fn bench_transform_large(c: &mut Criterion) {
    c.bench_function("transform_large", |b| {
        b.iter_batched(
            || (context(8), scene(64)),
            |(context, mut body)| {
                let outcome = context.transformer().transform(&mut body).unwrap();
                black_box(outcome)
            },
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark generating proxy types after a transform.
fn bench_generate_proxies(c: &mut Criterion) {
    c.bench_function("generate_proxies", |b| {
        b.iter_batched(
            || {
                let context = context(8);
                let mut body = scene(64);
                context.transformer().transform(&mut body).unwrap();
                context
            },
            |context| black_box(context.generate_proxies().unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_transform_small,
    bench_transform_large,
    bench_generate_proxies,
);
criterion_main!(benches);
