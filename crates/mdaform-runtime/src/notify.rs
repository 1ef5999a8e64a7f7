#![forbid(unsafe_code)]

//! User-facing notifications.
//!
//! Editors report save and delete outcomes through the [`Notifier`] port and
//! never wait on it. [`NotificationCenter`] is the in-memory implementation:
//! a bounded queue with per-kind auto-dismiss, queried by the host with an
//! explicit `now` so expiry is deterministic under test.
//!
//! # Expiry
//!
//! | Kind | Default duration |
//! |------|------------------|
//! | `Success`, `Warning`, `Info` | 5 s |
//! | `Error` | persistent until dismissed |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default auto-dismiss duration.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// Default number of notifications kept.
pub const DEFAULT_MAX_VISIBLE: usize = 5;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl NotificationKind {
    /// Short label for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fire-and-forget notification sink.
pub trait Notifier {
    /// Show `message` to the user.
    fn notify(&self, message: &str, kind: NotificationKind);
}

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

/// One queued notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: Instant,
    /// `None` means it stays until dismissed.
    pub duration: Option<Duration>,
}

impl Notification {
    /// Whether the auto-dismiss duration has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.duration
            .is_some_and(|d| now.saturating_duration_since(self.created_at) >= d)
    }
}

struct Inner {
    queue: Vec<Notification>,
    next_id: u64,
    ttl: Duration,
    max_visible: usize,
}

/// Bounded in-memory notification queue.
///
/// Cloning yields another handle onto the same queue. When a push overflows
/// the capacity, expired entries go first, then the oldest non-error entry.
/// An error is only evicted when nothing but errors is queued.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Rc<RefCell<Inner>>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    /// Center with the default TTL and capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_TTL, DEFAULT_MAX_VISIBLE)
    }

    /// Center with a custom TTL and capacity. A capacity of zero is raised
    /// to one.
    #[must_use]
    pub fn with_limits(ttl: Duration, max_visible: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                queue: Vec::new(),
                next_id: 1,
                ttl,
                max_visible: max_visible.max(1),
            })),
        }
    }

    /// Queue a notification created at `now`.
    pub fn push_at(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        now: Instant,
    ) -> NotificationId {
        let mut inner = self.inner.borrow_mut();
        let id = NotificationId(inner.next_id);
        inner.next_id += 1;
        let duration = match kind {
            NotificationKind::Error => None,
            _ => Some(inner.ttl),
        };
        inner.queue.push(Notification {
            id,
            kind,
            message: message.into(),
            created_at: now,
            duration,
        });
        if inner.queue.len() > inner.max_visible {
            inner.queue.retain(|n| !n.is_expired(now));
        }
        while inner.queue.len() > inner.max_visible {
            let victim = inner
                .queue
                .iter()
                .position(|n| n.kind != NotificationKind::Error)
                .unwrap_or(0);
            let evicted = inner.queue.remove(victim);
            tracing::trace!(id = evicted.id.0, kind = evicted.kind.as_str(), "notification evicted");
        }
        id
    }

    /// Notifications not yet expired at `now`, oldest first.
    #[must_use]
    pub fn visible(&self, now: Instant) -> Vec<Notification> {
        self.inner
            .borrow()
            .queue
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Every queued notification, expired or not.
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.inner.borrow().queue.clone()
    }

    /// The newest notification, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Notification> {
        self.inner.borrow().queue.last().cloned()
    }

    /// Remove one notification. Returns whether it was queued.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.queue.len();
        inner.queue.retain(|n| n.id != id);
        inner.queue.len() != before
    }

    /// Drop expired notifications. Returns how many were removed.
    pub fn prune(&self, now: Instant) -> usize {
        let mut inner = self.inner.borrow_mut();
        let before = inner.queue.len();
        inner.queue.retain(|n| !n.is_expired(now));
        before - inner.queue.len()
    }

    /// Remove everything.
    pub fn clear(&self) {
        self.inner.borrow_mut().queue.clear();
    }

    /// Number of queued notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, message: &str, kind: NotificationKind) {
        tracing::debug!(kind = kind.as_str(), message, "notification");
        self.push_at(message, kind, Instant::now());
    }
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("NotificationCenter")
            .field("queued", &inner.queue.len())
            .field("ttl", &inner.ttl)
            .field("max_visible", &inner.max_visible)
            .finish()
    }
}
