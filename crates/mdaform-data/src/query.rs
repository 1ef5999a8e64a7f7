#![forbid(unsafe_code)]

//! List queries for [`EntityService::get_all`](crate::EntityService::get_all).

use std::cmp::Ordering;

use mdaform_core::{FieldMap, Scalar};

/// Sort direction for [`Query::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Search, filter, sort, and limit options for a list call.
///
/// All parts are optional; [`Query::default`] returns every record in store
/// order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Case-insensitive substring matched against every text column.
    pub search: Option<String>,
    /// Column equality on canonical values. All must match.
    pub filters: Vec<(String, Scalar)>,
    /// Sort column and direction.
    pub order_by: Option<(String, SortDirection)>,
    /// Maximum number of rows returned.
    pub top: Option<usize>,
}

impl Query {
    /// Empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text search. Blank text disables search.
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = (!text.trim().is_empty()).then_some(text);
        self
    }

    /// Add an equality filter.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    /// Sort by a column.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Limit the row count.
    #[must_use]
    pub fn top(mut self, n: usize) -> Self {
        self.top = Some(n);
        self
    }

    /// Whether a row passes the search and filters.
    #[must_use]
    pub fn matches(&self, fields: &FieldMap) -> bool {
        let search_ok = self.search.as_deref().is_none_or(|needle| {
            let needle = needle.trim().to_lowercase();
            fields.iter().any(|(_, value)| {
                matches!(value, Scalar::Text(_))
                    && value.canonical().to_lowercase().contains(&needle)
            })
        });
        search_ok
            && self
                .filters
                .iter()
                .all(|(name, value)| fields.canonical(name) == value.canonical())
    }

    /// Compare two rows by the sort column. Numbers compare numerically,
    /// everything else by canonical text; empty values sort first.
    #[must_use]
    pub fn compare(&self, a: &FieldMap, b: &FieldMap) -> Ordering {
        let Some((field, direction)) = &self.order_by else {
            return Ordering::Equal;
        };
        let ord = match (
            a.get(field).and_then(Scalar::as_f64),
            b.get(field).and_then(Scalar::as_f64),
        ) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => a.canonical(field).cmp(&b.canonical(field)),
        };
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}
