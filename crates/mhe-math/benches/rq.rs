use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mhe_math::{
    rns::{BasisExtender, Decomposer},
    rq::{Context, Poly, Representation, RingQP},
    zq::primes::generate_prime,
};
use rand::thread_rng;
use std::{sync::Arc, time::Duration};

fn moduli(count: usize, bits: usize, degree: usize, upper_bound: u64) -> Vec<u64> {
    let mut out = vec![];
    let mut bound = upper_bound;
    while out.len() < count {
        match generate_prime(bits, 2 * degree as u64, bound) {
            Some(p) => {
                out.push(p);
                bound = p;
            }
            None => break,
        }
    }
    out
}

pub fn rq_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("rq");
    group.sample_size(50);
    group.warm_up_time(Duration::from_secs(1));
    let mut rng = thread_rng();

    for degree in [1024usize, 4096] {
        let q = moduli(4, 55, degree, 1 << 55);
        let p = moduli(2, 61, degree, 1 << 61);
        let ctx = Context::new_arc(&q, degree).unwrap();
        let ring = Arc::new(RingQP::new(ctx.clone(), Some(Context::new_arc(&p, degree).unwrap())).unwrap());

        let mut a = Poly::random(&ctx, 3, Representation::PowerBasis, &mut rng);
        group.bench_function(BenchmarkId::new("ntt_forward_backward", degree), |b| {
            b.iter(|| {
                a.change_representation(Representation::Ntt);
                a.change_representation(Representation::PowerBasis);
            });
        });

        let x = Poly::random(&ctx, 3, Representation::Ntt, &mut rng);
        let y = Poly::random(&ctx, 3, Representation::Ntt, &mut rng);
        group.bench_function(BenchmarkId::new("mul", degree), |b| {
            b.iter(|| &x * &y);
        });

        let decomposer = Decomposer::new(&ring, 3, Some(1), 0).unwrap();
        group.bench_function(BenchmarkId::new("decompose", degree), |b| {
            b.iter(|| decomposer.decompose(&x).unwrap());
        });

        let extender = BasisExtender::new(&ring).unwrap();
        let z = ring.random(3, Some(1), Representation::Ntt, &mut rng).unwrap();
        group.bench_function(BenchmarkId::new("mod_down", degree), |b| {
            b.iter(|| extender.mod_down(&z).unwrap());
        });
    }

    group.finish();
}

criterion_group!(rq, rq_benchmark);
criterion_main!(rq);
