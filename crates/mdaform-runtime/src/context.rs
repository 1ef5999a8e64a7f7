#![forbid(unsafe_code)]

//! Shared services handed to every editor.
//!
//! There is no global store: the host builds one [`AppContext`] at startup
//! and passes it to each screen. Cloning is cheap and every clone sees the
//! same notifier and lists.

use std::fmt;
use std::rc::Rc;

use crate::config::EditorConfig;
use crate::notify::{NotificationCenter, NotificationKind, Notifier};
use crate::persistence::{KeyValueStore, MemoryStore, PinnedItems, RecentItems};

/// Application-wide collaborators.
#[derive(Clone)]
pub struct AppContext {
    config: EditorConfig,
    notifier: Rc<dyn Notifier>,
    center: Option<NotificationCenter>,
    store: Rc<dyn KeyValueStore>,
    recent: RecentItems,
    pinned: PinnedItems,
}

impl AppContext {
    /// Context over an explicit store and notifier.
    pub fn new(
        config: EditorConfig,
        store: Rc<dyn KeyValueStore>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        if !store.is_available() {
            tracing::warn!(store = store.name(), "key-value store unavailable");
        }
        Self {
            recent: RecentItems::new(Rc::clone(&store), config.recent_limit),
            pinned: PinnedItems::new(Rc::clone(&store)),
            config,
            notifier,
            center: None,
            store,
        }
    }

    /// Context over `store` that queues notifications in a
    /// [`NotificationCenter`] using the configured TTL.
    pub fn with_store(config: EditorConfig, store: Rc<dyn KeyValueStore>) -> Self {
        let center = NotificationCenter::with_limits(
            config.notification_ttl,
            crate::notify::DEFAULT_MAX_VISIBLE,
        );
        let mut ctx = Self::new(config, store, Rc::new(center.clone()));
        ctx.center = Some(center);
        ctx
    }

    /// Fully in-memory context.
    pub fn in_memory(config: EditorConfig) -> Self {
        Self::with_store(config, Rc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Send a notification.
    pub fn notify(&self, message: &str, kind: NotificationKind) {
        self.notifier.notify(message, kind);
    }

    /// The notification queue, when the context owns one.
    #[must_use]
    pub fn notifications(&self) -> Option<&NotificationCenter> {
        self.center.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &Rc<dyn KeyValueStore> {
        &self.store
    }

    #[must_use]
    pub fn recent(&self) -> &RecentItems {
        &self.recent
    }

    #[must_use]
    pub fn pinned(&self) -> &PinnedItems {
        &self.pinned
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::in_memory(EditorConfig::default())
    }
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("store", &self.store.name())
            .field("notification_center", &self.center.is_some())
            .finish_non_exhaustive()
    }
}
