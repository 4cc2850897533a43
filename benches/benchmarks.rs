//! Benchmark suite for draftloop.
//!
//! This module provides performance benchmarks for:
//! - Satisfaction checks on replies of various lengths
//! - Prompt composition for the revise step
//! - Full scripted sessions with an increasing number of revisions
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Save baseline for comparison
//! cargo bench -- --save-baseline main
//!
//! # Compare against baseline
//! cargo bench -- --baseline main
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use draftloop::prompts;
use draftloop::session::{KeywordPredicate, SatisfactionPredicate, SessionController};
use draftloop::testing::{ScriptedChannel, ScriptedGenerator};

// ============================================================================
// Satisfaction Benchmarks
// ============================================================================

/// Benchmark the keyword predicate against long, unsatisfied replies.
///
/// The worst case is a reply that contains no keyword at all, since every
/// keyword has to scan the whole lowercased text.
fn bench_satisfaction_check(c: &mut Criterion) {
    let mut group = c.benchmark_group("satisfaction_check");
    let predicate = KeywordPredicate::default();

    for words in [10, 100, 1000] {
        let reply = "please make the tone more formal ".repeat(words / 5 + 1);
        group.throughput(Throughput::Bytes(reply.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(words), &reply, |b, reply| {
            b.iter(|| predicate.is_satisfied(black_box(reply)));
        });
    }

    group.finish();
}

// ============================================================================
// Prompt Benchmarks
// ============================================================================

/// Benchmark revise prompt assembly for growing documents.
fn bench_revise_prompt(c: &mut Criterion) {
    let mut group = c.benchmark_group("revise_prompt");

    for lines in [10, 100, 1000] {
        let document = "Line item: consulting services, 10 hours at $50\n".repeat(lines);
        group.throughput(Throughput::Bytes(document.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &document, |b, doc| {
            b.iter(|| prompts::revise_prompt(black_box(doc), black_box("make it more formal")));
        });
    }

    group.finish();
}

// ============================================================================
// Session Benchmarks
// ============================================================================

/// Benchmark complete sessions with scripted collaborators.
///
/// Measures controller overhead only; both collaborators answer instantly.
fn bench_scripted_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("scripted_session");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    for revisions in [0usize, 5, 25] {
        group.bench_with_input(
            BenchmarkId::from_parameter(revisions),
            &revisions,
            |b, &revisions| {
                b.iter(|| {
                    let mut replies = vec!["Client: Acme, Amount: $500".to_string()];
                    replies.extend((0..revisions).map(|i| format!("change number {}", i)));
                    replies.push("looks good".to_string());

                    let generator = Arc::new(ScriptedGenerator::new().with_fallback("draft text"));
                    let channel = Arc::new(ScriptedChannel::new(replies));
                    let mut controller = SessionController::new("invoice", generator, channel);

                    runtime.block_on(async {
                        let session = controller.run().await.unwrap();
                        black_box(session.revision_count());
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(satisfaction_benches, bench_satisfaction_check);

criterion_group!(prompt_benches, bench_revise_prompt);

criterion_group!(session_benches, bench_scripted_session);

criterion_main!(satisfaction_benches, prompt_benches, session_benches);
