#![forbid(unsafe_code)]

//! Business entities edited through record forms.
//!
//! Column names in [`Record::to_fields`] are the form field names. Lookup
//! columns hold the referenced record id as text; date columns are
//! `YYYY-MM-DD` [`Scalar::Date`] values.

use chrono::{DateTime, NaiveDate, Utc};
use mdaform_core::{FieldMap, Scalar};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{DataError, DataResult};
use crate::record::{FieldReader, Record, RecordId, date_scalar};

fn required(entity: &'static str, field: &str, value: &str) -> DataResult<()> {
    if value.trim().is_empty() {
        return Err(DataError::validation(entity, field, "is required"));
    }
    Ok(())
}

fn date_order(
    entity: &'static str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> DataResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(DataError::validation(
            entity,
            "end_date",
            "must not be before start_date",
        )),
        _ => Ok(()),
    }
}

fn lookup(id: Option<RecordId>) -> Scalar {
    id.map(Scalar::from).unwrap_or(Scalar::Null)
}

// ---------------------------------------------------------------------------
// Option sets
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Planned,
    Active,
    OnHold,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Blocked,
    Done,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget: Option<f64>,
    pub owner_id: Option<RecordId>,
    pub category_id: Option<RecordId>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Record for Project {
    const ENTITY: &'static str = "project";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            name: String::new(),
            description: None,
            status: ProjectStatus::default(),
            start_date: None,
            end_date: None,
            budget: None,
            owner_id: None,
            category_id: None,
            modified_at: None,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("name", self.name.as_str())
            .with("description", self.description.clone())
            .with("status", self.status.to_string())
            .with("start_date", date_scalar(self.start_date))
            .with("end_date", date_scalar(self.end_date))
            .with("budget", self.budget)
            .with("owner_id", lookup(self.owner_id))
            .with("category_id", lookup(self.category_id))
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.text("name", &mut self.name)?;
        r.opt_text("description", &mut self.description)?;
        r.choice("status", &mut self.status)?;
        r.opt_date("start_date", &mut self.start_date)?;
        r.opt_date("end_date", &mut self.end_date)?;
        r.opt_number("budget", &mut self.budget)?;
        r.opt_id("owner_id", &mut self.owner_id)?;
        r.opt_id("category_id", &mut self.category_id)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        required(Self::ENTITY, "name", &self.name)?;
        if self.budget.is_some_and(|b| b < 0.0) {
            return Err(DataError::validation(
                Self::ENTITY,
                "budget",
                "must not be negative",
            ));
        }
        date_order(Self::ENTITY, self.start_date, self.end_date)
    }

    fn title(&self) -> String {
        self.name.clone()
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.modified_at = Some(at);
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: RecordId,
    pub project_id: Option<RecordId>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub estimated_hours: Option<f64>,
    pub assigned_to: Option<RecordId>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Record for Task {
    const ENTITY: &'static str = "task";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            project_id: None,
            title: String::new(),
            description: None,
            status: TaskStatus::default(),
            priority: Priority::default(),
            due_date: None,
            estimated_hours: None,
            assigned_to: None,
            modified_at: None,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("project_id", lookup(self.project_id))
            .with("title", self.title.as_str())
            .with("description", self.description.clone())
            .with("status", self.status.to_string())
            .with("priority", self.priority.to_string())
            .with("due_date", date_scalar(self.due_date))
            .with("estimated_hours", self.estimated_hours)
            .with("assigned_to", lookup(self.assigned_to))
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.opt_id("project_id", &mut self.project_id)?;
        r.text("title", &mut self.title)?;
        r.opt_text("description", &mut self.description)?;
        r.choice("status", &mut self.status)?;
        r.choice("priority", &mut self.priority)?;
        r.opt_date("due_date", &mut self.due_date)?;
        r.opt_number("estimated_hours", &mut self.estimated_hours)?;
        r.opt_id("assigned_to", &mut self.assigned_to)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        required(Self::ENTITY, "title", &self.title)?;
        if self.estimated_hours.is_some_and(|h| h < 0.0) {
            return Err(DataError::validation(
                Self::ENTITY,
                "estimated_hours",
                "must not be negative",
            ));
        }
        Ok(())
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.modified_at = Some(at);
    }
}

// ---------------------------------------------------------------------------
// TeamMember
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: RecordId,
    pub full_name: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub hourly_rate: Option<f64>,
    pub active: bool,
}

impl Record for TeamMember {
    const ENTITY: &'static str = "team_member";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            full_name: String::new(),
            email: None,
            role: None,
            hourly_rate: None,
            active: true,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("full_name", self.full_name.as_str())
            .with("email", self.email.clone())
            .with("role", self.role.clone())
            .with("hourly_rate", self.hourly_rate)
            .with("active", self.active)
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.text("full_name", &mut self.full_name)?;
        r.opt_text("email", &mut self.email)?;
        r.opt_text("role", &mut self.role)?;
        r.opt_number("hourly_rate", &mut self.hourly_rate)?;
        r.boolean("active", &mut self.active)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        required(Self::ENTITY, "full_name", &self.full_name)?;
        match &self.email {
            Some(email) if !email.contains('@') => Err(DataError::validation(
                Self::ENTITY,
                "email",
                "is not an email address",
            )),
            _ => Ok(()),
        }
    }

    fn title(&self) -> String {
        self.full_name.clone()
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl Record for Category {
    const ENTITY: &'static str = "category";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            name: String::new(),
            color: None,
            description: None,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("name", self.name.as_str())
            .with("color", self.color.clone())
            .with("description", self.description.clone())
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.text("name", &mut self.name)?;
        r.opt_text("color", &mut self.color)?;
        r.opt_text("description", &mut self.description)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        required(Self::ENTITY, "name", &self.name)
    }

    fn title(&self) -> String {
        self.name.clone()
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// A team member's allocation to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: RecordId,
    pub project_id: Option<RecordId>,
    pub member_id: Option<RecordId>,
    pub role: Option<String>,
    /// Share of the member's time, 0 to 100.
    pub allocation_percent: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Record for Assignment {
    const ENTITY: &'static str = "assignment";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            project_id: None,
            member_id: None,
            role: None,
            allocation_percent: 100.0,
            start_date: None,
            end_date: None,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("project_id", lookup(self.project_id))
            .with("member_id", lookup(self.member_id))
            .with("role", self.role.clone())
            .with("allocation_percent", self.allocation_percent)
            .with("start_date", date_scalar(self.start_date))
            .with("end_date", date_scalar(self.end_date))
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.opt_id("project_id", &mut self.project_id)?;
        r.opt_id("member_id", &mut self.member_id)?;
        r.opt_text("role", &mut self.role)?;
        r.number("allocation_percent", &mut self.allocation_percent)?;
        r.opt_date("start_date", &mut self.start_date)?;
        r.opt_date("end_date", &mut self.end_date)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        if self.project_id.is_none() {
            return Err(DataError::validation(Self::ENTITY, "project_id", "is required"));
        }
        if self.member_id.is_none() {
            return Err(DataError::validation(Self::ENTITY, "member_id", "is required"));
        }
        if !(0.0..=100.0).contains(&self.allocation_percent) {
            return Err(DataError::validation(
                Self::ENTITY,
                "allocation_percent",
                "must be between 0 and 100",
            ));
        }
        date_order(Self::ENTITY, self.start_date, self.end_date)
    }

    fn title(&self) -> String {
        match &self.role {
            Some(role) => format!("{role} ({}%)", self.allocation_percent),
            None => format!("Assignment ({}%)", self.allocation_percent),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: RecordId,
    pub task_id: Option<RecordId>,
    pub member_id: Option<RecordId>,
    pub work_date: Option<NaiveDate>,
    pub hours: f64,
    pub billable: bool,
    pub notes: Option<String>,
}

impl Record for TimeEntry {
    const ENTITY: &'static str = "time_entry";

    fn id(&self) -> RecordId {
        self.id
    }

    fn blank(id: RecordId) -> Self {
        Self {
            id,
            task_id: None,
            member_id: None,
            work_date: None,
            hours: 0.0,
            billable: true,
            notes: None,
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("task_id", lookup(self.task_id))
            .with("member_id", lookup(self.member_id))
            .with("work_date", date_scalar(self.work_date))
            .with("hours", self.hours)
            .with("billable", self.billable)
            .with("notes", self.notes.clone())
    }

    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()> {
        let mut r = FieldReader::new(Self::ENTITY, fields);
        r.opt_id("task_id", &mut self.task_id)?;
        r.opt_id("member_id", &mut self.member_id)?;
        r.opt_date("work_date", &mut self.work_date)?;
        r.number("hours", &mut self.hours)?;
        r.boolean("billable", &mut self.billable)?;
        r.opt_text("notes", &mut self.notes)?;
        r.finish()
    }

    fn validate(&self) -> DataResult<()> {
        if self.work_date.is_none() {
            return Err(DataError::validation(Self::ENTITY, "work_date", "is required"));
        }
        if !(self.hours > 0.0 && self.hours <= 24.0) {
            return Err(DataError::validation(
                Self::ENTITY,
                "hours",
                "must be more than 0 and at most 24",
            ));
        }
        Ok(())
    }

    fn title(&self) -> String {
        match self.work_date {
            Some(day) => format!("{}h on {day}", self.hours),
            None => format!("{}h", self.hours),
        }
    }
}
