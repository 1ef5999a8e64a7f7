#![forbid(unsafe_code)]

//! Runtime: autosave, navigation guarding, keyboard commands, and editors.
//!
//! # Role in mdaform
//! `mdaform-runtime` layers the time- and event-driven behaviour of a record
//! form on top of [`mdaform_core::DirtyTracker`]. Everything here is
//! single-threaded: handles share state through `Rc`, are `!Send`, and never
//! block. Time enters only as an explicit `now: Instant` argument.
//!
//! # Primary responsibilities
//! - **AutoSaveScheduler**: one debounced idle deadline per form.
//! - **NavigationGuard**: router blocker and unload hook keyed on the live
//!   dirty flag.
//! - **KeyboardCommandRouter**: Ctrl/Cmd+S and Ctrl/Cmd+Shift+S.
//! - **RecordEditor**: composes the above around an entity service.
//! - **AppContext**: notifier, recent/pinned lists, and configuration.

pub mod autosave;
pub mod config;
pub mod context;
pub mod editor;
pub mod keyboard;
pub mod navigation;
pub mod notify;
pub mod persistence;

pub use autosave::{AutoSaveInputs, AutoSaveScheduler, DEFAULT_AUTOSAVE_DELAY};
pub use config::{ConfigError, EditorConfig};
pub use context::AppContext;
pub use editor::{EditorCommand, RecordEditor};
pub use keyboard::{
    Dispatch, KeyCommands, KeyEventBus, KeyHandler, KeyboardCommandRouter, ListenerId,
    SAVE_AND_CLOSE_CHORD, SAVE_CHORD,
};
pub use navigation::{
    BlockerId, BlockerState, HookId, MemoryRouter, NavigationGuard, NavigationOutcome, Router,
    UnloadDecision,
};
pub use notify::{
    Notification, NotificationCenter, NotificationId, NotificationKind, Notifier,
};
#[cfg(feature = "file-store")]
pub use persistence::FileStore;
pub use persistence::{
    ItemRef, KeyValueStore, MemoryStore, PinnedItems, RecentItems, StorageError, StorageResult,
};
