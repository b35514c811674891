//! Notification Sink - where operation outcomes are reported
//!
//! The engine never returns remote failures to the caller. Instead every
//! completed operation produces one notice here: a success, an
//! offline-qualified success, or (only for rejected local validation) an
//! error. Messages are user-facing Vietnamese text.

use std::sync::Mutex;

use tracing::{info, warn};

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Error,
}

impl std::fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoticeKind::Success => write!(f, "success"),
            NoticeKind::Info => write!(f, "info"),
            NoticeKind::Error => write!(f, "error"),
        }
    }
}

/// A single reported outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

/// Receiver of operation outcomes (toast, status line, log...)
pub trait NotificationSink {
    fn notify(&self, message: &str, kind: NoticeKind);
}

/// Suffix appended when the remote leg of an operation failed
pub const OFFLINE_SUFFIX: &str = " (Offline)";

/// What an operation did, for building its message
#[derive(Debug, Clone, Copy)]
pub(crate) enum Action<'a> {
    Saved,
    Updated,
    Commented,
    Deleted,
    Cleared,
    Imported(usize),
    Renamed { from: &'a str, to: &'a str },
}

/// Build the message for a completed operation
pub(crate) fn outcome(action: Action<'_>, label: &str, synced: bool) -> Notice {
    let base = match action {
        Action::Saved => format!("Đã lưu {}", label),
        Action::Updated => format!("Đã cập nhật {}", label),
        Action::Commented => "Đã thêm bình luận".to_string(),
        Action::Deleted => format!("Đã xóa {}", label),
        Action::Cleared => format!("Đã xóa toàn bộ {}", label),
        Action::Imported(count) => format!("Đã nhập {} {}", count, label),
        Action::Renamed { from, to } => format!("Đã đổi mã {} {} → {}", label, from, to),
    };

    if synced {
        Notice {
            message: base,
            kind: NoticeKind::Success,
        }
    } else {
        Notice {
            message: format!("{}{}", base, OFFLINE_SUFFIX),
            kind: NoticeKind::Info,
        }
    }
}

/// Message for a rename rejected because the target key is taken
pub(crate) fn duplicate_key(key: &str) -> Notice {
    Notice {
        message: format!("Mã {} đã tồn tại!", key),
        kind: NoticeKind::Error,
    }
}

/// Sink that only writes notices to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, message: &str, kind: NoticeKind) {
        match kind {
            NoticeKind::Error => warn!(kind = %kind, "{}", message),
            _ => info!(kind = %kind, "{}", message),
        }
    }
}

/// Sink that keeps every notice, for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingSink {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices.lock().ok()?.last().cloned()
    }

    pub fn clear(&self) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.clear();
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, message: &str, kind: NoticeKind) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                message: message.to_string(),
                kind,
            });
        }
    }
}
