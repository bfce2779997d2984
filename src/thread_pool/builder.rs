use anyhow::Result;

use crate::thread_pool::shared_queue::WorkerPool;

const DEFAULT_NAME_PREFIX: &str = "workpool";

#[derive(Debug, Clone)]
pub struct Builder {
    num_threads: usize,
    name_prefix: String,
    stack_size: Option<usize>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            num_threads: num_cpus::get(),
            name_prefix: DEFAULT_NAME_PREFIX.to_owned(),
            stack_size: None,
        }
    }
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    pub fn num_threads(mut self, num: usize) -> Self {
        self.num_threads = num;
        self
    }

    /// Workers are named `{prefix}-{index}`.
    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    pub fn build(&self) -> Result<WorkerPool> {
        WorkerPool::spawn_workers(self)
    }

    pub(crate) fn threads(&self) -> usize {
        self.num_threads
    }

    pub(crate) fn name_prefix(&self) -> &str {
        &self.name_prefix
    }

    pub(crate) fn stack_size_bytes(&self) -> Option<usize> {
        self.stack_size
    }
}
