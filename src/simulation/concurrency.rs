use crate::simulation_parameters::ExecutionStrategy;

pub use internal::*;

/**
 * Evaluate `f` once per particle index and collect the results in index order.
 * Each task only reads shared state, the output vector is the fresh snapshot
 * that the caller commits after the whole pass completed.
 */
pub fn map_particles<X: Send, F: Fn(usize) -> X + Send + Sync>(
    strategy: ExecutionStrategy,
    batch_size: usize,
    n: usize,
    f: F,
) -> Vec<X> {
    match strategy {
        ExecutionStrategy::Scalar => (0..n).map(f).collect(),
        ExecutionStrategy::ParallelBatch => par_map0(n, batch_size, f),
    }
}

/// Mutate every element independently. One writer per index.
pub fn for_each_particle_mut<T: Send + Sync, F: Fn(usize, &mut T) + Send + Sync>(
    strategy: ExecutionStrategy,
    batch_size: usize,
    arr1: &mut [T],
    f: F,
) {
    match strategy {
        ExecutionStrategy::Scalar => arr1.iter_mut().enumerate().for_each(|(idx, v1)| f(idx, v1)),
        ExecutionStrategy::ParallelBatch => par_iter_mut1(arr1, batch_size, f),
    }
}

#[cfg(target_arch = "wasm32")]
mod internal {
    pub fn par_map0<X: Send, F: Fn(usize) -> X + Send + Sync>(n: usize, _batch_size: usize, f: F) -> Vec<X> {
        (0..n).into_iter().map(f).collect()
    }

    pub fn par_iter_mut1<T1: Send + Sync, F: Fn(usize, &mut T1) + Send + Sync>(
        arr1: &mut [T1],
        _batch_size: usize,
        f: F,
    ) {
        arr1.into_iter().enumerate().for_each(|(idx, v1)| {
            f(idx, v1);
        });
    }

    pub fn par_iter_reduce1<
        T1: Send + Sync,
        F: Fn(usize, &T1) -> X + Send + Sync,
        X: Send,
        C: Fn(X, X) -> X + Send + Sync,
        I: Fn() -> X + Send + Sync,
    >(
        arr1: &[T1],
        identity: I,
        combine: C,
        f: F,
    ) -> X {
        arr1.iter()
            .enumerate()
            .map(|(i, a)| f(i, a))
            .fold(identity(), |acc, value| combine(acc, value))
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod internal {
    use rayon::prelude::*;

    pub fn par_map0<X: Send, F: Fn(usize) -> X + Send + Sync>(n: usize, batch_size: usize, f: F) -> Vec<X> {
        (0..n).into_par_iter().with_min_len(batch_size.max(1)).map(f).collect()
    }

    pub fn par_iter_mut1<T1: Send + Sync, F: Fn(usize, &mut T1) + Send + Sync>(
        arr1: &mut [T1],
        batch_size: usize,
        f: F,
    ) {
        arr1.par_iter_mut()
            .with_min_len(batch_size.max(1))
            .enumerate()
            .for_each(|(idx, v1)| {
                f(idx, v1);
            });
    }

    pub fn par_iter_reduce1<
        T1: Send + Sync,
        F: Fn(usize, &T1) -> X + Send + Sync,
        X: Send,
        C: Fn(X, X) -> X + Send + Sync,
        I: Fn() -> X + Send + Sync,
    >(
        arr1: &[T1],
        identity: I,
        combine: C,
        f: F,
    ) -> X {
        arr1.par_iter()
            .enumerate()
            .map(|(i, a)| f(i, a))
            .reduce(identity, combine)
    }
}

#[test]
fn strategies_produce_identical_index_order() {
    let n = 1037;
    let scalar = map_particles(ExecutionStrategy::Scalar, 100, n, |i| i * i);
    let parallel = map_particles(ExecutionStrategy::ParallelBatch, 100, n, |i| i * i);
    assert_eq!(scalar.len(), n);
    assert_eq!(scalar, parallel);

    let mut a: Vec<usize> = vec![0; n];
    let mut b: Vec<usize> = vec![0; n];
    for_each_particle_mut(ExecutionStrategy::Scalar, 7, &mut a, |i, v| *v = 3 * i + 1);
    for_each_particle_mut(ExecutionStrategy::ParallelBatch, 7, &mut b, |i, v| *v = 3 * i + 1);
    assert_eq!(a, b);
    assert_eq!(a[n - 1], 3 * (n - 1) + 1);

    let sum = par_iter_reduce1(&a, || 0, |x, y| x + y, |_, v| *v);
    assert_eq!(sum, a.iter().sum::<usize>());
}
