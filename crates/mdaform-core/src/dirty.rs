#![forbid(unsafe_code)]

//! Dirty tracking for record forms.
//!
//! A [`DirtyTracker`] is fed the form's live values on every render or tick
//! and answers one question: do the current values differ from the last
//! stable snapshot?
//!
//! # Transitions
//!
//! `update(values, token)` classifies each observation:
//!
//! | Condition | Result |
//! |-----------|--------|
//! | token differs from the last seen token | snapshot cleared, clean ([`TrackerTransition::TokenChanged`]) |
//! | no snapshot yet | snapshot := values, clean ([`TrackerTransition::Baselined`]) |
//! | populated keys grew by more than one (heuristic policy) | snapshot := values, clean ([`TrackerTransition::Baselined`]) |
//! | otherwise | snapshot kept, diffed ([`TrackerTransition::Observed`]) |
//!
//! The growth rule distinguishes "the server response landed and many fields
//! were populated at once" from "the user typed into one field". It can
//! misclassify a multi-field paste as a load; hosts that know when a record
//! landed should select [`LoadDetection::Explicit`] and call
//! [`DirtyTracker::mark_loaded`].
//!
//! # Invariants
//!
//! 1. `is_dirty()` implies a snapshot exists.
//! 2. Immediately after `reset(v)` or `mark_loaded(v)`, `is_dirty()` is false
//!    and `dirty_fields()` is empty.
//! 3. The [`LiveFlag`] always equals `is_dirty()` when control returns to the
//!    caller of any mutating method.

use std::collections::BTreeSet;
use std::fmt;

use crate::live::LiveFlag;
use crate::snapshot::FormSnapshot;
use crate::value::FieldMap;

/// Identity of the record being edited.
///
/// A change of token means "this is now a different record": the snapshot is
/// discarded and the next observation is treated as the initial load.
/// `ResetToken::none()` denotes a record that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ResetToken(Option<String>);

impl ResetToken {
    /// Token for an existing record.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(Some(id.into()))
    }

    /// Token for a record that does not exist yet.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// The underlying identity, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl fmt::Display for ResetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(id) => f.write_str(id),
            None => f.write_str("<new>"),
        }
    }
}

impl From<&str> for ResetToken {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResetToken {
    fn from(id: String) -> Self {
        Self(Some(id))
    }
}

impl From<Option<String>> for ResetToken {
    fn from(id: Option<String>) -> Self {
        Self(id)
    }
}

/// How the tracker recognises that a record has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadDetection {
    /// Re-baseline when the populated-key count grows by more than one
    /// between observations.
    #[default]
    Heuristic,
    /// Only the first observation, token changes, `reset`, and `mark_loaded`
    /// re-baseline.
    Explicit,
}

/// What an [`update`](DirtyTracker::update) call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerTransition {
    /// A different record: snapshot discarded.
    TokenChanged,
    /// Snapshot replaced with the observed values.
    Baselined,
    /// Snapshot kept; values diffed against it.
    Observed,
}

/// Snapshot-based change detector for one form instance.
///
/// Not shared across forms: two open editors own two trackers.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    snapshot: Option<FormSnapshot>,
    current: FieldMap,
    token: Option<ResetToken>,
    last_populated: usize,
    last_observed: Option<FormSnapshot>,
    revision: u64,
    policy: LoadDetection,
    dirty: bool,
    live: LiveFlag,
}

impl DirtyTracker {
    /// Create a tracker with the default (heuristic) load detection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker with the given load detection policy.
    #[must_use]
    pub fn with_policy(policy: LoadDetection) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Active load detection policy.
    #[must_use]
    pub fn policy(&self) -> LoadDetection {
        self.policy
    }

    /// Change the load detection policy. Takes effect on the next `update`.
    pub fn set_policy(&mut self, policy: LoadDetection) {
        self.policy = policy;
    }

    /// Feed the form's live values.
    pub fn update(&mut self, values: &FieldMap, token: &ResetToken) -> TrackerTransition {
        let populated = values.populated_count();
        let grew_by = populated.saturating_sub(self.last_populated);
        self.last_populated = populated;
        self.observe(values);

        let transition = match &self.token {
            Some(seen) if seen != token => {
                tracing::debug!(from = %seen, to = %token, "reset token changed, snapshot discarded");
                self.token = Some(token.clone());
                self.snapshot = None;
                TrackerTransition::TokenChanged
            }
            _ => {
                self.token = Some(token.clone());
                let looks_like_load = self.policy == LoadDetection::Heuristic && grew_by > 1;
                if self.snapshot.is_none() || looks_like_load {
                    tracing::debug!(
                        token = %token,
                        populated,
                        grew_by,
                        initial = self.snapshot.is_none(),
                        "form baselined"
                    );
                    self.snapshot = Some(FormSnapshot::capture(values));
                    TrackerTransition::Baselined
                } else {
                    TrackerTransition::Observed
                }
            }
        };

        self.current = values.clone();
        self.recompute();
        transition
    }

    /// Force the snapshot to `values` and mark clean, synchronously.
    ///
    /// Used by save-success handlers: the live flag is cleared before this
    /// returns, so a navigation issued right after is not blocked.
    pub fn reset(&mut self, values: &FieldMap) {
        tracing::debug!(token = ?self.token, fields = values.len(), "form reset");
        self.baseline(values);
    }

    /// Explicit "record loaded" transition; same effect as [`reset`](Self::reset).
    pub fn mark_loaded(&mut self, values: &FieldMap) {
        tracing::debug!(token = ?self.token, fields = values.len(), "record loaded");
        self.baseline(values);
    }

    /// Whether the current values differ from the snapshot.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Fields whose current value differs from the snapshot.
    #[must_use]
    pub fn dirty_fields(&self) -> BTreeSet<String> {
        match &self.snapshot {
            Some(snapshot) => snapshot.differing_fields(&self.current),
            None => BTreeSet::new(),
        }
    }

    /// Whether a single field differs from the snapshot.
    #[must_use]
    pub fn is_field_dirty(&self, name: &str) -> bool {
        match (&self.snapshot, self.current.get(name)) {
            (Some(snapshot), Some(value)) => value.canonical() != snapshot.get(name),
            _ => false,
        }
    }

    /// Shared cell mirroring [`is_dirty`](Self::is_dirty).
    #[must_use]
    pub fn live_flag(&self) -> LiveFlag {
        self.live.clone()
    }

    /// Count of observed value changes.
    ///
    /// Increments whenever `update` sees values whose canonical form differs
    /// from the previous observation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current snapshot, if one has been captured.
    #[must_use]
    pub fn snapshot(&self) -> Option<&FormSnapshot> {
        self.snapshot.as_ref()
    }

    /// Last token seen by `update`.
    #[must_use]
    pub fn token(&self) -> Option<&ResetToken> {
        self.token.as_ref()
    }

    /// Values from the most recent observation.
    #[must_use]
    pub fn current(&self) -> &FieldMap {
        &self.current
    }

    fn baseline(&mut self, values: &FieldMap) {
        self.snapshot = Some(FormSnapshot::capture(values));
        self.current = values.clone();
        self.last_populated = values.populated_count();
        self.observe(values);
        self.recompute();
    }

    fn observe(&mut self, values: &FieldMap) {
        let observed = FormSnapshot::capture(values);
        if let Some(previous) = &self.last_observed
            && *previous != observed
        {
            self.revision = self.revision.wrapping_add(1);
        }
        self.last_observed = Some(observed);
    }

    fn recompute(&mut self) {
        self.dirty = self
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.differs_from(&self.current));
        self.live.set(self.dirty);
    }
}
