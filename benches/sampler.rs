use criterion::{black_box, criterion_group, criterion_main, Criterion};

use magic_mcmc::distributions::{MagicSquareDensity, Proposal, SwapProposal};
use magic_mcmc::magic::deviation;
use magic_mcmc::metropolis::Metropolis;

fn bench_deviation(c: &mut Criterion) {
    let order_3: Vec<u32> = (1..=9).collect();
    let order_10: Vec<u32> = (1..=100).collect();
    let order_30: Vec<u32> = (1..=900).collect();

    c.bench_function("deviation_order_3", |b| {
        b.iter(|| deviation(black_box(&order_3)))
    });
    c.bench_function("deviation_order_10", |b| {
        b.iter(|| deviation(black_box(&order_10)))
    });
    c.bench_function("deviation_order_30", |b| {
        b.iter(|| deviation(black_box(&order_30)))
    });
}

fn bench_step(c: &mut Criterion) {
    c.bench_function("metropolis_step_order_5", |b| {
        let proposal = SwapProposal::new().set_seed(42);
        let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 5)
            .expect("Expected sampler construction to succeed")
            .set_seed(42);
        b.iter(|| black_box(sampler.step()))
    });
}

fn bench_run(c: &mut Criterion) {
    c.bench_function("metropolis_run_order_4_1000", |b| {
        b.iter(|| {
            let proposal = SwapProposal::new().set_seed(42);
            let mut sampler = Metropolis::new(MagicSquareDensity::default(), proposal, 4)
                .expect("Expected sampler construction to succeed")
                .set_seed(42);
            black_box(sampler.run(1000).expect("Expected the run to succeed"))
        })
    });
}

criterion_group!(benches, bench_deviation, bench_step, bench_run);
criterion_main!(benches);
