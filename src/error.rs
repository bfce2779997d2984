use std::any::Any;

use thiserror::Error;

/// The failure side of a task outcome, observed through its handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),
    #[error("task was dropped before it ran")]
    Cancelled,
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_owned()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("unknown panic payload")
        };
        TaskError::Panicked(msg)
    }
}
