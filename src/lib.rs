// workpool: a fixed-size worker thread pool with per-task result handles

pub mod error;
pub mod thread_pool;

pub use error::TaskError;
pub use thread_pool::{Builder, TaskHandle, TaskResult, ThreadPool, WorkerPool};
