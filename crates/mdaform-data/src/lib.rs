#![forbid(unsafe_code)]

//! Entity records and the CRUD service port.
//!
//! Record editors never talk to a remote store directly. They go through
//! [`EntityService`], an opaque CRUD port with one implementation per entity
//! type. [`MemoryService`] is the in-process implementation used by tests,
//! demos, and offline hosts.
//!
//! # Entities
//!
//! | Type | Entity name |
//! |------|-------------|
//! | [`Project`] | `project` |
//! | [`Task`] | `task` |
//! | [`TeamMember`] | `team_member` |
//! | [`Category`] | `category` |
//! | [`Assignment`] | `assignment` |
//! | [`TimeEntry`] | `time_entry` |

pub mod entities;
pub mod error;
pub mod query;
pub mod record;
pub mod service;

pub use entities::{
    Assignment, Category, Priority, Project, ProjectStatus, Task, TaskStatus, TeamMember,
    TimeEntry,
};
pub use error::{DataError, DataResult};
pub use query::{Query, SortDirection};
pub use record::{FieldReader, Record, RecordId};
pub use service::{EntityService, MemoryService};
