//! Fork-join helpers that fall back to sequential loops when the `parallel`
//! feature is disabled or parallelism is switched off at runtime.
//!
//! Every helper hands each task a disjoint `&mut` chunk, so tasks never need locks.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Calls `task(index, chunk)` for every `chunk_size`-long chunk of `data`.
pub fn for_each_chunk_mut<T, F>(data: &mut [T], chunk_size: usize, parallel: bool, task: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    let chunk_size = chunk_size.max(1);

    #[cfg(feature = "parallel")]
    {
        if parallel {
            data.par_chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(index, chunk)| task(index, chunk));
            return;
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    data.chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(index, chunk)| task(index, chunk));
}

/// Calls `task(index, item)` for every element of `data`.
pub fn for_each_mut<T, F>(data: &mut [T], parallel: bool, task: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            data.par_iter_mut()
                .enumerate()
                .for_each(|(index, item)| task(index, item));
            return;
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    data.iter_mut()
        .enumerate()
        .for_each(|(index, item)| task(index, item));
}

/// Runs two independent closures, potentially concurrently.
pub fn join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return rayon::join(a, b);
        }
    }

    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    (a(), b())
}

/// Fixed worker pool the culling pass runs on.
pub struct WorkerPool {
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
    threads: usize,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .finish()
    }
}

impl WorkerPool {
    /// Builds a dedicated pool of `threads` workers; zero uses the global rayon pool.
    pub fn new(threads: usize) -> Self {
        #[cfg(feature = "parallel")]
        let pool = {
            if threads == 0 {
                None
            } else {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|index| format!("light-cull-{index}"))
                    .build()
                {
                    Ok(pool) => Some(pool),
                    Err(err) => {
                        log::warn!(
                            "failed to build {threads}-thread culling pool ({err}); using the global pool"
                        );
                        None
                    }
                }
            }
        };

        Self {
            #[cfg(feature = "parallel")]
            pool,
            threads,
        }
    }

    /// Requested worker count; zero when the global pool is used.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Runs `op` with this pool as the current rayon pool.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if let Some(pool) = &self.pool {
                return pool.install(op);
            }
        }
        op()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_receive_their_index() {
        for parallel in [false, true] {
            let mut data = vec![0usize; 10];
            for_each_chunk_mut(&mut data, 3, parallel, |index, chunk| {
                chunk.iter_mut().for_each(|value| *value = index);
            });
            assert_eq!(data, vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3]);
        }
    }

    #[test]
    fn dedicated_pool_runs_work() {
        let pool = WorkerPool::new(2);
        let (a, b) = pool.install(|| join(true, || 1 + 1, || 2 + 2));
        assert_eq!((a, b), (2, 4));
    }
}
