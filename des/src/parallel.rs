//! Independent replications run concurrently on a rayon pool.
//!
//! Each replication receives its index and must build everything it needs
//! (agents, seeded RNGs) from that index alone. Nothing is shared between
//! replications, so the results do not depend on thread count or on the
//! order in which workers pick up jobs.
//!
//! A panic inside one replication is caught and reported as `Err(String)`
//! in that replication's slot; the others still complete.
//!
//! ```rust
//! use des::parallel::ParallelRunner;
//!
//! let results = ParallelRunner::new(8, |replication| replication * 2)
//!     .num_threads(2)
//!     .run();
//!
//! assert_eq!(results[3], Ok(6));
//! ```

use crate::EventLoop;
use log::warn;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs `num_replications` calls of `job` in parallel, returning results in
/// replication order.
pub struct ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    num_replications: usize,
    job: F,
    num_threads: Option<usize>,
    progress_callback: Option<ProgressCallback>,
}

impl<R, F> ParallelRunner<R, F>
where
    F: Fn(usize) -> R + Send + Sync,
    R: Send,
{
    pub fn new(num_replications: usize, job: F) -> Self {
        ParallelRunner {
            num_replications,
            job,
            num_threads: None,
            progress_callback: None,
        }
    }

    /// Use a dedicated pool of `n` workers instead of rayon's global pool.
    pub fn num_threads(mut self, n: usize) -> Self {
        self.num_threads = Some(n);
        self
    }

    /// Called with `(completed, total)` after each replication finishes.
    pub fn progress<P>(mut self, callback: P) -> Self
    where
        P: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn run(self) -> Vec<Result<R, String>> {
        let completed = AtomicUsize::new(0);

        let execute = || -> Vec<Result<R, String>> {
            (0..self.num_replications)
                .into_par_iter()
                .map(|replication| {
                    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        (self.job)(replication)
                    }));

                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    if let Some(ref callback) = self.progress_callback {
                        callback(done, self.num_replications);
                    }

                    result.map_err(|panic| {
                        if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        }
                    })
                })
                .collect()
        };

        let pool = self.num_threads.and_then(|n| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| warn!("falling back to global rayon pool: {}", e))
                .ok()
        });

        match pool {
            Some(pool) => pool.install(execute),
            None => execute(),
        }
    }
}

/// Builds one `EventLoop` per replication, runs it to `until` and collects
/// the agents' stats.
pub fn run_event_loops<T, S, B>(
    num_replications: usize,
    builder: B,
    until: usize,
) -> Vec<Result<Vec<S>, String>>
where
    B: Fn(usize) -> EventLoop<T, S> + Send + Sync,
    S: Send,
{
    ParallelRunner::new(num_replications, |replication| {
        let mut event_loop = builder(replication);
        event_loop.run(until);
        event_loop.stats()
    })
    .run()
}

/// Progress callback that prints every `interval` completions.
pub fn simple_progress_reporter(interval: usize) -> impl Fn(usize, usize) + Send + Sync {
    let interval = interval.max(1);
    move |completed, total| {
        if completed % interval == 0 || completed == total {
            println!("  Completed {}/{} replications", completed, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Agent, Response};

    struct Ticker {
        id: usize,
        ticks: usize,
    }

    impl Agent<u8, (usize, usize)> for Ticker {
        fn act(&mut self, current_t: usize, _data: &u8) -> Response<u8, (usize, usize)> {
            self.ticks += 1;
            Response::event(current_t + 1, 0)
        }

        fn stats(&self) -> (usize, usize) {
            (self.id, self.ticks)
        }
    }

    fn ticker_loop(id: usize) -> EventLoop<u8, (usize, usize)> {
        let agents: Vec<Box<dyn Agent<u8, (usize, usize)>>> = vec![Box::new(Ticker { id, ticks: 0 })];
        EventLoop::new(vec![(0, 0)], agents)
    }

    #[test]
    fn results_keep_replication_order() {
        let results = run_event_loops(20, ticker_loop, 10);
        assert_eq!(results.len(), 20);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.as_ref().map(|s| s[0]), Ok((i, 10)));
        }
    }

    #[test]
    fn repeated_runs_are_identical() {
        let first = run_event_loops(8, ticker_loop, 25);
        let second = run_event_loops(8, ticker_loop, 25);
        assert_eq!(first, second);
    }

    #[test]
    fn panic_is_isolated_to_its_replication() {
        let results = ParallelRunner::new(6, |replication| {
            if replication == 4 {
                panic!("bad replication");
            }
            replication
        })
        .run();

        assert_eq!(results[4], Err("bad replication".to_string()));
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 5);
    }

    #[test]
    fn progress_reaches_total() {
        use std::sync::Mutex;
        let last = Arc::new(Mutex::new(0));
        let last_clone = last.clone();

        ParallelRunner::new(5, |replication| replication)
            .num_threads(2)
            .progress(move |done, _total| {
                let mut seen = last_clone.lock().unwrap();
                *seen = (*seen).max(done);
            })
            .run();

        assert_eq!(*last.lock().unwrap(), 5);
    }

    #[test]
    fn zero_replications() {
        let results = ParallelRunner::new(0, |replication| replication).run();
        assert!(results.is_empty());
    }

    #[test]
    fn simple_progress_reporter_tolerates_zero_interval() {
        let reporter = simple_progress_reporter(0);
        reporter(1, 3);
        reporter(3, 3);
    }
}
