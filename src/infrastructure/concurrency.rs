/// Concurrency management for batch audits.
/// Configures the global rayon pool that audits independent traces in parallel.

use anyhow::Result;
use tracing::info;

/// Worker count used when none is configured: half the cores, minimum 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool. Returns the worker count.
pub fn init_thread_pool(jobs: Option<usize>) -> Result<usize> {
    let workers = jobs.filter(|j| *j > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!(workers, cores = num_cpus::get(), "initialized audit thread pool");
    Ok(workers)
}
