use anyhow::Result;

pub mod builder;
pub mod handle;
pub mod shared_queue;

pub use builder::Builder;
pub use handle::{TaskHandle, TaskResult};
pub use shared_queue::WorkerPool;

pub trait ThreadPool {
    fn new(num: u32) -> Result<Self>
    where
        Self: Sized;

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}
