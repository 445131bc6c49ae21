use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Oldest notices are dropped once the board is full.
const MAX_NOTICES: usize = 50;

/// Transient operator-visible messages. Scheduling outcomes and pipeline
/// failures land here; the admin endpoint drains the board.
#[derive(Clone, Default)]
pub struct NoticeBoard {
    inner: Arc<Mutex<VecDeque<String>>>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("operator notice: {}", message);

        let mut notices = self.inner.lock().expect("notice board lock poisoned");
        if notices.len() == MAX_NOTICES {
            notices.pop_front();
        }
        notices.push_back(message);
    }

    pub fn drain(&self) -> Vec<String> {
        let mut notices = self.inner.lock().expect("notice board lock poisoned");
        notices.drain(..).collect()
    }
}
