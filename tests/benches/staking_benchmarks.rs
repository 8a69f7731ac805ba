//! # Staking Benchmarks
//!
//! | Operation | Scaling |
//! |-----------|---------|
//! | Delegate | O(log n) in validators and delegations |
//! | End block | O(n log n) re-rank over validators |
//! | Slash | O(k) in exposed queue entries |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use qc_18_staking::{Dec, StakingConfig, StakingMsg};
use qc_tests::fixtures::{account, create_validator_msg, fast_config, tokens, Chain};
use rand::Rng;
use std::time::Duration;

const DELEGATOR_BASE: u8 = 200;

fn chain_with_validators(count: u8, max_validators: usize) -> Chain {
    let mut funded: Vec<(u8, u64)> = (1..=count).map(|id| (id, 1_000_000)).collect();
    funded.extend((0..50).map(|i| (DELEGATOR_BASE + i, 1_000_000_000)));
    let config = StakingConfig {
        max_validators,
        check_invariants: false,
        max_entries: 64,
        ..fast_config()
    };

    let mut chain = Chain::new(config, &funded).expect("chain setup");
    let mut rng = rand::thread_rng();
    for id in 1..=count {
        let bond = rng.gen_range(10..10_000);
        chain
            .deliver(create_validator_msg(id, tokens(bond)))
            .expect("create validator");
    }
    chain.commit().expect("first block");
    chain
}

fn bench_delegate(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-staking-delegate");
    group.measurement_time(Duration::from_secs(5));

    for validators in [10u8, 50, 150] {
        let chain = chain_with_validators(validators, 100);
        let mut rng = rand::thread_rng();
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("delegate", validators),
            &chain,
            |b, chain| {
                b.iter(|| {
                    let msg = StakingMsg::Delegate {
                        delegator: account(DELEGATOR_BASE + rng.gen_range(0..50)),
                        validator: account(rng.gen_range(1..=validators)),
                        amount: tokens(rng.gen_range(1..100)),
                    };
                    black_box(chain.deliver(msg).is_ok())
                })
            },
        );
    }

    group.finish();
}

fn bench_end_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-staking-end-block");
    group.measurement_time(Duration::from_secs(5));

    for validators in [10u8, 50, 150] {
        let mut chain = chain_with_validators(validators, 100);
        let mut rng = rand::thread_rng();
        group.bench_function(BenchmarkId::new("rerank_after_delegation", validators), |b| {
            b.iter(|| {
                let _ = chain.delegate(
                    DELEGATOR_BASE,
                    rng.gen_range(1..=validators),
                    rng.gen_range(1..1_000),
                );
                black_box(chain.commit().map(|u| u.len()).unwrap_or(0))
            })
        });
    }

    group.finish();
}

fn bench_slash_with_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-18-staking-slash");

    for entries in [1u64, 16, 64] {
        group.bench_with_input(BenchmarkId::new("exposed_entries", entries), &entries, |b, &n| {
            b.iter_batched(
                || {
                    let mut chain = chain_with_validators(2, 2);
                    chain.delegate(DELEGATOR_BASE, 1, 100_000).expect("delegate");
                    for _ in 0..n {
                        let _ = chain.deliver(StakingMsg::Undelegate {
                            delegator: account(DELEGATOR_BASE),
                            validator: account(1),
                            shares: tokens(1),
                        });
                        chain.commit().expect("commit");
                    }
                    chain
                },
                |chain| {
                    let fraction = Dec::from_ratio_digits(5, 2).unwrap_or_default();
                    black_box(chain.slash(1, chain.height - 1, fraction).is_ok())
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    staking_benches,
    bench_delegate,
    bench_end_block,
    bench_slash_with_queue
);
criterion_main!(staking_benches);
