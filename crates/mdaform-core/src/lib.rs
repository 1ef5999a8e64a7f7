#![forbid(unsafe_code)]

//! Core: field values, form snapshots, dirty tracking, and key events.
//!
//! # Role in mdaform
//! `mdaform-core` holds the state that a record-editing screen compares on
//! every render. It performs no I/O and owns no timers; the runtime crate
//! layers autosave, navigation guarding, and keyboard commands on top of the
//! [`DirtyTracker`](dirty::DirtyTracker) defined here.

pub mod dirty;
pub mod event;
pub mod live;
pub mod snapshot;
pub mod value;

pub use dirty::{DirtyTracker, LoadDetection, ResetToken, TrackerTransition};
pub use event::{KeyChord, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use live::LiveFlag;
pub use snapshot::FormSnapshot;
pub use value::{FieldMap, Scalar};
