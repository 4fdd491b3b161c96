use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::RunnerError;

/// A message transport. `receive` polls and returns `None` when nothing
/// is waiting.
#[async_trait]
pub trait MessageQueue<T: Send + 'static>: Send + Sync {
    async fn publish(&self, message: T) -> Result<(), RunnerError>;

    async fn receive(&self) -> Result<Option<T>, RunnerError>;
}

/// FIFO queue kept in memory.
pub struct MemoryQueue<T> {
    messages: Mutex<VecDeque<T>>,
}

impl<T> Default for MemoryQueue<T> {
    fn default() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T: Clone> MemoryQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waiting messages, oldest first, without removing them.
    pub fn snapshot(&self) -> Vec<T> {
        self.messages
            .lock()
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<T: Send + 'static> MessageQueue<T> for MemoryQueue<T> {
    async fn publish(&self, message: T) -> Result<(), RunnerError> {
        self.messages
            .lock()
            .map_err(|_| RunnerError::Queue("queue lock poisoned".to_string()))?
            .push_back(message);
        Ok(())
    }

    async fn receive(&self) -> Result<Option<T>, RunnerError> {
        Ok(self
            .messages
            .lock()
            .map_err(|_| RunnerError::Queue("queue lock poisoned".to_string()))?
            .pop_front())
    }
}
