#![forbid(unsafe_code)]

//! mdaform public facade crate.
//!
//! Re-exports the form-editing surface from the internal crates and offers a
//! small prelude for screens that edit records.

use std::fmt;

#[cfg(feature = "log-subscriber")]
pub mod logging;

// --- Core re-exports -------------------------------------------------------

pub use mdaform_core::{
    DirtyTracker, FieldMap, FormSnapshot, KeyChord, KeyCode, KeyEvent, KeyEventKind, LiveFlag,
    LoadDetection, Modifiers, ResetToken, Scalar, TrackerTransition,
};

// --- Data re-exports -------------------------------------------------------

pub use mdaform_data::{
    Assignment, Category, DataError, EntityService, MemoryService, Priority, Project,
    ProjectStatus, Query, Record, RecordId, SortDirection, Task, TaskStatus, TeamMember,
    TimeEntry,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "file-store")]
pub use mdaform_runtime::FileStore;
pub use mdaform_runtime::{
    AppContext, AutoSaveScheduler, ConfigError, EditorCommand, EditorConfig, ItemRef,
    KeyEventBus, KeyValueStore, KeyboardCommandRouter, MemoryRouter, MemoryStore,
    NavigationGuard, NavigationOutcome, NotificationCenter, NotificationKind, Notifier,
    PinnedItems, RecentItems, RecordEditor, Router, StorageError, UnloadDecision,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for mdaform hosts.
#[derive(Debug)]
pub enum Error {
    /// Entity service failure.
    Data(DataError),
    /// Key-value store failure.
    Storage(StorageError),
    /// Bad configuration value.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Data(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<DataError> for Error {
    fn from(err: DataError) -> Self {
        Self::Data(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for mdaform APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AppContext, EditorConfig, EntityService, Error, FieldMap, KeyCode, KeyEvent,
        KeyEventBus, MemoryRouter, MemoryService, Modifiers, NavigationOutcome, Record,
        RecordEditor, RecordId, Result, Router, Scalar,
    };

    pub use crate::{core, data, runtime};
}

pub use mdaform_core as core;
pub use mdaform_data as data;
pub use mdaform_runtime as runtime;
