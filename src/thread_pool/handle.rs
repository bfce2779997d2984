use std::fmt;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::TaskError;

pub type TaskResult<T> = Result<T, TaskError>;

/// Writer side of a task's result channel. Dropping it unfulfilled makes the
/// reader resolve to [`TaskError::Cancelled`].
pub(crate) struct Completer<T>(Sender<TaskResult<T>>);

impl<T> Completer<T> {
    pub(crate) fn complete(self, result: TaskResult<T>) {
        // the submitter may have dropped its handle already
        let _ = self.0.send(result);
    }
}

/// Reader side of a task's result channel. The outcome is cached once observed.
pub struct TaskHandle<T> {
    receiver: Receiver<TaskResult<T>>,
    outcome: Option<TaskResult<T>>,
}

pub(crate) fn channel<T>() -> (Completer<T>, TaskHandle<T>) {
    let (send, recv) = bounded(1);
    (
        Completer(send),
        TaskHandle {
            receiver: recv,
            outcome: None,
        },
    )
}

impl<T> TaskHandle<T> {
    pub fn join(mut self) -> TaskResult<T> {
        match self.outcome.take() {
            Some(outcome) => outcome,
            None => self.receiver.recv().unwrap_or(Err(TaskError::Cancelled)),
        }
    }

    /// Block until the task finishes, keeping the outcome in the handle.
    pub fn wait(&mut self) -> &TaskResult<T> {
        let receiver = &self.receiver;
        self.outcome
            .get_or_insert_with(|| receiver.recv().unwrap_or(Err(TaskError::Cancelled)))
    }

    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&TaskResult<T>> {
        if self.outcome.is_none() {
            match self.receiver.recv_timeout(timeout) {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(RecvTimeoutError::Disconnected) => {
                    self.outcome = Some(Err(TaskError::Cancelled))
                }
                Err(RecvTimeoutError::Timeout) => return None,
            }
        }
        self.outcome.as_ref()
    }

    pub fn try_result(&mut self) -> Option<&TaskResult<T>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Disconnected) => self.outcome = Some(Err(TaskError::Cancelled)),
                Err(TryRecvError::Empty) => return None,
            }
        }
        self.outcome.as_ref()
    }

    pub fn is_finished(&mut self) -> bool {
        self.try_result().is_some()
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.outcome {
            None => "pending",
            Some(Ok(_)) => "completed",
            Some(Err(TaskError::Panicked(_))) => "panicked",
            Some(Err(TaskError::Cancelled)) => "cancelled",
        };
        f.debug_struct("TaskHandle").field("state", &state).finish()
    }
}
