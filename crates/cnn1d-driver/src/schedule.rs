//! Multiplier scheduling
//!
//! A schedule decides how the class loop of the fused sweep is spread over a
//! bounded number of multipliers: one shared multiplier, several lanes in one
//! thread, or a pool of workers each owning a disjoint band of classes.
//!
//! Every schedule hands each class to exactly one band, and a band always
//! walks positions then filters in order, so each `logits[c]` sees the same
//! sequence of additions. The budget changes latency, never a result bit.

use crate::error::{Cnn1dError, Result};
use cnn1d_ip::{Dims, ResourceBudget};
use rayon::prelude::*;
use std::fmt::Debug;
use tracing::debug;

/// Work for one band of classes: `(first_class, logits_band)`.
pub type Band<'a> = dyn Fn(usize, &mut [f32]) + Sync + 'a;

/// Policy bounding how many multiplies run concurrently.
pub trait Schedule: Debug + Send + Sync {
    /// Upper bound on multiplies in flight.
    fn mul_budget(&self) -> usize;

    /// Classes updated together inside one band.
    fn lanes(&self) -> usize;

    /// Run `band` over disjoint sub-slices of `logits` that together cover it.
    fn dispatch(&self, logits: &mut [f32], band: &Band<'_>);

    /// Short human-readable description.
    fn describe(&self) -> String;
}

/// One multiplier reused for every tap and every class.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl Schedule for Sequential {
    fn mul_budget(&self) -> usize {
        1
    }

    fn lanes(&self) -> usize {
        1
    }

    fn dispatch(&self, logits: &mut [f32], band: &Band<'_>) {
        band(0, logits);
    }

    fn describe(&self) -> String {
        "sequential".to_string()
    }
}

/// `n` multipliers time-multiplexed over the class loop in one thread.
#[derive(Debug, Clone, Copy)]
pub struct Lanes {
    lanes: usize,
}

impl Lanes {
    /// Schedule with `lanes` multipliers (at least one).
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes: lanes.max(1),
        }
    }
}

impl Schedule for Lanes {
    fn mul_budget(&self) -> usize {
        self.lanes
    }

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn dispatch(&self, logits: &mut [f32], band: &Band<'_>) {
        band(0, logits);
    }

    fn describe(&self) -> String {
        format!("lanes={}", self.lanes)
    }
}

/// Pool of workers, each sweeping the whole input for its own class band.
///
/// Workers recompute convolution activations independently; only the dense
/// fold is split.
#[derive(Debug)]
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
    lanes: usize,
}

impl WorkerPool {
    /// Pool of `workers` threads with `lanes` multipliers each.
    ///
    /// # Errors
    ///
    /// Returns error if the thread pool cannot be built.
    pub fn new(workers: usize, lanes: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("cnn1d-mac-{i}"))
            .build()
            .map_err(|e| Cnn1dError::invalid_config(format!("worker pool: {e}")))?;
        debug!("WorkerPool: {workers} workers × {lanes} lanes");
        Ok(Self {
            pool,
            workers,
            lanes: lanes.max(1),
        })
    }

    /// Largest pool with `lanes` lanes per worker that fits `mul_limit`.
    ///
    /// # Errors
    ///
    /// Returns error if the thread pool cannot be built.
    pub fn within(mul_limit: usize, lanes: usize) -> Result<Self> {
        Self::new((mul_limit / lanes.max(1)).max(1), lanes)
    }

    /// Number of worker threads.
    pub const fn workers(&self) -> usize {
        self.workers
    }
}

impl Schedule for WorkerPool {
    fn mul_budget(&self) -> usize {
        self.workers * self.lanes
    }

    fn lanes(&self) -> usize {
        self.lanes
    }

    fn dispatch(&self, logits: &mut [f32], band: &Band<'_>) {
        if logits.is_empty() {
            return;
        }
        let band_len = logits.len().div_ceil(self.workers);
        self.pool.install(|| {
            logits
                .par_chunks_mut(band_len)
                .enumerate()
                .for_each(|(i, chunk)| band(i * band_len, chunk));
        });
    }

    fn describe(&self) -> String {
        format!("pool workers={} lanes={}", self.workers, self.lanes)
    }
}

/// Widest lane group a single worker drives.
pub const MAX_LANES: usize = 8;

/// Pick a schedule that fits `budget` for a model of shape `dims`.
///
/// A cap of one gives [`Sequential`]. Otherwise each worker gets up to
/// [`MAX_LANES`] lanes, and the cap decides how many class bands run at once:
/// one band is [`Lanes`], more is a [`WorkerPool`].
///
/// # Errors
///
/// Returns error if a worker pool is needed and cannot be built.
pub fn schedule_for(budget: ResourceBudget, dims: &Dims) -> Result<Box<dyn Schedule>> {
    let limit = budget.mul_limit.max(1);
    if limit == 1 {
        return Ok(Box::new(Sequential));
    }
    let lanes = limit.min(dims.classes.max(1)).min(MAX_LANES);
    let bands = dims.classes.div_ceil(lanes).max(1);
    let workers = (limit / lanes).clamp(1, bands);
    if workers == 1 {
        return Ok(Box::new(Lanes::new(lanes)));
    }
    Ok(Box::new(WorkerPool::new(workers, lanes)?))
}
