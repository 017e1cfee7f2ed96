//! Benchmarks for descriptor parsing and alias resolution.

extern crate eventscope;

use criterion::{criterion_group, criterion_main, Criterion};
use eventscope::prelude::*;
use std::hint::black_box;

/// Benchmark parsing a method descriptor without parameters.
fn bench_signature_void(c: &mut Criterion) {
    c.bench_function("sig_method_void", |b| {
        b.iter(|| {
            let sig = MethodSignature::parse(black_box("()V")).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a method descriptor with mixed primitive, object and array parameters.
fn bench_signature_mixed(c: &mut Criterion) {
    let descriptor = "(IJLjava/lang/String;[[DZLgame/world/Chunk;)Ljava/util/List;";

    c.bench_function("sig_method_mixed", |b| {
        b.iter(|| {
            let sig = MethodSignature::parse(black_box(descriptor)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark parsing a long field type.
fn bench_type_array(c: &mut Criterion) {
    c.bench_function("sig_type_array", |b| {
        b.iter(|| {
            let ty = TypeDesc::parse(black_box("[[[Lgame/render/Texture;")).unwrap();
            black_box(ty)
        });
    });
}

/// Benchmark matching a three-epoch descriptor against a body under its obfuscated name.
fn bench_resolve_body(c: &mut Criterion) {
    let descriptor = MethodDescriptor::builder()
        .alias(NamingEpoch::Deobfuscated, "game.Client", "startGame", "()V")
        .unwrap()
        .alias(NamingEpoch::Intermediate, "game/Client", "func_71384_a", "()V")
        .unwrap()
        .alias(NamingEpoch::Obfuscated, "bao", "f", "()V")
        .unwrap()
        .build()
        .unwrap();
    let body = MethodBody::new(
        "bao",
        "f",
        MethodSignature::parse("()V").unwrap(),
        MethodAccess::PUBLIC,
    );
    let order = NamingEpoch::default_order();

    c.bench_function("descriptor_resolve_body", |b| {
        b.iter(|| black_box(descriptor.resolve_body(black_box(&body), &order)));
    });
}

criterion_group!(
    benches,
    bench_signature_void,
    bench_signature_mixed,
    bench_type_array,
    bench_resolve_body,
);
criterion_main!(benches);
