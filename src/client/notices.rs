use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// User-facing notification queue. Created by whoever drives the upload flow
/// and handed to the components that report to the user; dropped with them.
#[derive(Debug, Default)]
pub struct Notices {
    queue: Mutex<VecDeque<Notice>>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice {
            kind,
            message: message.into(),
        };
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(notice);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(NoticeKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(NoticeKind::Error, message);
    }

    /// Removes and returns every pending notice, oldest first
    pub fn drain(&self) -> Vec<Notice> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn latest(&self) -> Option<Notice> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_in_order() {
        let notices = Notices::new();
        notices.info("first");
        notices.error("second");

        assert_eq!(notices.len(), 2);
        assert_eq!(notices.latest().unwrap().message, "second");

        let drained = notices.drain();
        assert_eq!(drained[0].kind, NoticeKind::Info);
        assert_eq!(drained[1].kind, NoticeKind::Error);
        assert!(notices.is_empty());
    }
}
