use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exalloc::{BoundedRegion, Heap};

/// Benchmark an allocate/release round trip at varying request sizes.
fn bench_allocate_release(c: &mut Criterion) {
  let mut group = c.benchmark_group("allocate_release");

  for size in [16usize, 128, 1024].iter() {
    group.bench_with_input(BenchmarkId::new("Heap", size), size, |b, &size| {
      let mut heap = Heap::new(BoundedRegion::new(1 << 24)).unwrap();

      b.iter(|| {
        let block = heap.allocate(black_box(size)).unwrap();
        heap.release(block);
      });
    });
  }

  group.finish();
}

/// Benchmark the allocate-copy-release path of reallocate.
fn bench_reallocate(c: &mut Criterion) {
  let mut group = c.benchmark_group("reallocate");

  for target in [64usize, 512, 4096].iter() {
    group.bench_with_input(BenchmarkId::new("grow", target), target, |b, &target| {
      let mut heap = Heap::new(BoundedRegion::new(1 << 24)).unwrap();

      b.iter(|| {
        let block = heap.allocate(16).unwrap();
        let block = heap.reallocate(Some(block), black_box(target)).unwrap();
        heap.release(block);
      });
    });
  }

  group.finish();
}

/// Benchmark a mixed workload with interleaved lifetimes, splits, and
/// coalescing, heap construction included.
fn bench_mixed_workload(c: &mut Criterion) {
  c.bench_function("mixed_workload", |b| {
    b.iter(|| {
      let mut heap = Heap::new(BoundedRegion::new(1 << 24)).unwrap();
      let mut live = Vec::new();

      for i in 0..64usize {
        let block = heap.allocate(black_box(16 + (i * 37) % 500)).unwrap();
        live.push(block);

        if i % 3 == 0 {
          let victim = live.swap_remove((i * 7) % live.len());
          heap.release(victim);
        }
      }

      for block in live.drain(..) {
        heap.release(block);
      }
    });
  });
}

criterion_group!(
  benches,
  bench_allocate_release,
  bench_reallocate,
  bench_mixed_workload,
);
criterion_main!(benches);
