//! Ordered issuance of data-parallel stages.
//!
//! Every stage of an iteration is a parallel loop over pixels or path
//! slots. The **WorkQueue** runs one stage at a time on its own
//! thread pool and only returns once all workers of the stage are
//! done, so a stage always sees the complete output of the previous
//! one.

// std
use std::panic::{self, AssertUnwindSafe};
// others
use rayon::{ThreadPool, ThreadPoolBuilder};
use strum_macros::Display;
use tracing::{error, trace};
// wavefront
use crate::core::error::{RenderError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Stage {
    GenerateRays,
    Intersect,
    SortByMaterial,
    Shade,
    Compact,
    FinalGather,
    GBuffer,
    Variance,
    Denoise,
    ToneMap,
}

pub struct WorkQueue {
    pool: ThreadPool,
}

impl WorkQueue {
    /// A queue backed by *num_threads* workers, all available cores
    /// for zero.
    pub fn new(num_threads: usize) -> Result<Self> {
        let num_cores: usize = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads
        };
        let pool: ThreadPool = ThreadPoolBuilder::new()
            .num_threads(num_cores)
            .thread_name(|i| format!("wavefront-{}", i))
            .build()?;
        Ok(WorkQueue { pool })
    }
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
    /// Run *work* on the pool and wait for it. A panic in any worker is
    /// reported as [RenderError::StagePanicked] naming the stage.
    pub fn issue<F, R>(&self, stage: Stage, work: F) -> Result<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        trace!(%stage, "issue");
        self.pool
            .install(|| panic::catch_unwind(AssertUnwindSafe(work)))
            .map_err(|_| {
                error!(%stage, "stage panicked");
                RenderError::StagePanicked { stage }
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn stages_run_in_issue_order() {
        let queue = WorkQueue::new(2).unwrap();
        assert_eq!(queue.num_threads(), 2);
        let mut data: Vec<u32> = vec![1; 1000];
        queue
            .issue(Stage::Shade, || data.par_iter_mut().for_each(|v| *v *= 3))
            .unwrap();
        let sum: u32 = queue
            .issue(Stage::FinalGather, || data.par_iter().sum())
            .unwrap();
        assert_eq!(sum, 3000);
    }

    #[test]
    fn panicking_stage_is_reported() {
        let queue = WorkQueue::new(1).unwrap();
        let result: Result<()> = queue.issue(Stage::Compact, || panic!("boom"));
        match result {
            Err(RenderError::StagePanicked { stage }) => assert_eq!(stage, Stage::Compact),
            _ => panic!("expected a stage panic"),
        }
        assert_eq!(Stage::FinalGather.to_string(), "final-gather");
    }
}
