#![forbid(unsafe_code)]

//! Record identity and field conversion.
//!
//! Every entity converts to and from a [`FieldMap`]. Forms edit the map; the
//! service applies it back onto the typed record. [`FieldReader`] does the
//! per-field parsing so each entity only lists its columns.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use mdaform_core::{FieldMap, Scalar};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DataError, DataResult};

/// Date format used for date-only columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Primary key of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero id.
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RecordId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<RecordId> for Scalar {
    fn from(id: RecordId) -> Self {
        Scalar::Text(id.to_string())
    }
}

/// A typed entity record that round-trips through a [`FieldMap`].
pub trait Record: Clone + fmt::Debug + 'static {
    /// Logical entity name (`project`, `task`, ...).
    const ENTITY: &'static str;

    /// Primary key.
    fn id(&self) -> RecordId;

    /// An empty record carrying only its id.
    fn blank(id: RecordId) -> Self;

    /// Editable columns as form values.
    fn to_fields(&self) -> FieldMap;

    /// Apply the columns present in `fields`. Absent columns are untouched.
    fn apply_fields(&mut self, fields: &FieldMap) -> DataResult<()>;

    /// Check cross-field and required-field rules.
    fn validate(&self) -> DataResult<()> {
        Ok(())
    }

    /// Display title used by recent and pinned lists.
    fn title(&self) -> String;

    /// Stamp the last-modified time. Entities without one ignore it.
    fn touch(&mut self, _at: chrono::DateTime<chrono::Utc>) {}
}

// ---------------------------------------------------------------------------
// FieldReader
// ---------------------------------------------------------------------------

/// Parses entries of a [`FieldMap`] into typed record columns.
///
/// Each method writes to its target only when the column is present.
/// [`finish`](Self::finish) rejects columns the entity does not know.
#[derive(Debug)]
pub struct FieldReader<'a> {
    entity: &'static str,
    fields: &'a FieldMap,
    seen: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    /// Start reading `fields` for `entity`.
    pub fn new(entity: &'static str, fields: &'a FieldMap) -> Self {
        Self {
            entity,
            fields,
            seen: Vec::new(),
        }
    }

    fn take(&mut self, name: &'static str) -> Option<&'a Scalar> {
        self.seen.push(name);
        self.fields.get(name)
    }

    fn invalid(&self, name: &str, message: impl Into<String>) -> DataError {
        DataError::validation(self.entity, name, message)
    }

    /// Required text column. Empty text is allowed here; use
    /// [`Record::validate`] for required checks.
    pub fn text(&mut self, name: &'static str, target: &mut String) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => String::new(),
                other => other
                    .as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| self.invalid(name, "expected text"))?,
            };
        }
        Ok(())
    }

    /// Optional text column. Empty text clears it.
    pub fn opt_text(&mut self, name: &'static str, target: &mut Option<String>) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => None,
                other => {
                    let s = other
                        .as_str()
                        .ok_or_else(|| self.invalid(name, "expected text"))?;
                    (!s.is_empty()).then(|| s.to_owned())
                }
            };
        }
        Ok(())
    }

    /// Required number column.
    pub fn number(&mut self, name: &'static str, target: &mut f64) -> DataResult<()> {
        let mut value = Some(*target);
        self.opt_number(name, &mut value)?;
        *target = value.ok_or_else(|| self.invalid(name, "a number is required"))?;
        Ok(())
    }

    /// Optional number column. Accepts numeric text.
    pub fn opt_number(&mut self, name: &'static str, target: &mut Option<f64>) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => None,
                Scalar::Text(s) if s.trim().is_empty() => None,
                Scalar::Text(s) => Some(
                    s.trim()
                        .parse::<f64>()
                        .map_err(|_| self.invalid(name, format!("`{s}` is not a number")))?,
                ),
                other => Some(
                    other
                        .as_f64()
                        .ok_or_else(|| self.invalid(name, "expected a number"))?,
                ),
            };
        }
        Ok(())
    }

    /// Boolean column. Null reads as `false`.
    pub fn boolean(&mut self, name: &'static str, target: &mut bool) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => false,
                Scalar::Text(s) => match s.as_str() {
                    "true" | "1" | "yes" => true,
                    "false" | "0" | "no" | "" => false,
                    _ => return Err(self.invalid(name, format!("`{s}` is not a yes/no value"))),
                },
                other => other
                    .as_bool()
                    .ok_or_else(|| self.invalid(name, "expected true or false"))?,
            };
        }
        Ok(())
    }

    /// Required date column.
    pub fn date(&mut self, name: &'static str, target: &mut NaiveDate) -> DataResult<()> {
        let mut value = Some(*target);
        self.opt_date(name, &mut value)?;
        *target = value.ok_or_else(|| self.invalid(name, "a date is required"))?;
        Ok(())
    }

    /// Optional date column in `YYYY-MM-DD` form. A date-time string keeps
    /// only its date part.
    pub fn opt_date(
        &mut self,
        name: &'static str,
        target: &mut Option<NaiveDate>,
    ) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => None,
                other => {
                    let s = other
                        .as_str()
                        .ok_or_else(|| self.invalid(name, "expected a date"))?;
                    if s.is_empty() {
                        None
                    } else {
                        let day = s.get(..10).unwrap_or(s);
                        Some(NaiveDate::parse_from_str(day, DATE_FORMAT).map_err(|_| {
                            self.invalid(name, format!("`{s}` is not a YYYY-MM-DD date"))
                        })?)
                    }
                }
            };
        }
        Ok(())
    }

    /// Required lookup column.
    pub fn id(&mut self, name: &'static str, target: &mut RecordId) -> DataResult<()> {
        let mut value = Some(*target);
        self.opt_id(name, &mut value)?;
        *target = value.ok_or_else(|| self.invalid(name, "a reference is required"))?;
        Ok(())
    }

    /// Optional lookup column.
    pub fn opt_id(&mut self, name: &'static str, target: &mut Option<RecordId>) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            *target = match value {
                Scalar::Null => None,
                other => {
                    let s = other
                        .as_str()
                        .ok_or_else(|| self.invalid(name, "expected a record id"))?;
                    if s.is_empty() {
                        None
                    } else {
                        Some(s.parse().map_err(|_| {
                            self.invalid(name, format!("`{s}` is not a record id"))
                        })?)
                    }
                }
            };
        }
        Ok(())
    }

    /// Option-set column parsed with [`FromStr`].
    pub fn choice<T: FromStr>(&mut self, name: &'static str, target: &mut T) -> DataResult<()> {
        if let Some(value) = self.take(name) {
            let s = value
                .as_str()
                .ok_or_else(|| self.invalid(name, "expected an option value"))?;
            *target = s
                .parse()
                .map_err(|_| self.invalid(name, format!("`{s}` is not a valid option")))?;
        }
        Ok(())
    }

    /// Reject any column that was not read.
    pub fn finish(self) -> DataResult<()> {
        match self
            .fields
            .keys()
            .find(|key| !self.seen.iter().any(|seen| *seen == *key))
        {
            Some(unknown) => Err(DataError::validation(
                self.entity,
                unknown,
                "unknown field",
            )),
            None => Ok(()),
        }
    }
}

/// Date column value for [`Record::to_fields`].
pub(crate) fn date_scalar(date: Option<NaiveDate>) -> Scalar {
    date.map(|d| Scalar::date(d.format(DATE_FORMAT).to_string()))
        .unwrap_or(Scalar::Null)
}
