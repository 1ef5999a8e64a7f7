#![forbid(unsafe_code)]

//! Idle-delay autosave scheduling.
//!
//! [`AutoSaveScheduler`] owns at most one pending deadline. The host re-arms
//! it every tick with the current [`AutoSaveInputs`] and polls it with the
//! current instant; the scheduler never reads a clock itself.
//!
//! # Invariants
//!
//! 1. At most one deadline is outstanding.
//! 2. Ineligible inputs (clean, new, saving or deactivated) cancel the
//!    deadline and schedule nothing.
//! 3. Inputs that differ from the previous `arm` restart the deadline at
//!    `now + delay`; identical inputs leave it in place.
//! 4. The callback invoked on fire is the one passed to the latest `arm`.
//! 5. A cancelled or dropped scheduler never invokes a callback.
//!
//! # Example
//!
//! ```
//! use mdaform_runtime::autosave::{AutoSaveInputs, AutoSaveScheduler};
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::{Duration, Instant};
//!
//! let fired = Rc::new(Cell::new(0));
//! let mut scheduler = AutoSaveScheduler::new(Duration::from_secs(30));
//! let t0 = Instant::now();
//! let inputs = AutoSaveInputs { dirty: true, revision: 1, ..Default::default() };
//!
//! let f = Rc::clone(&fired);
//! scheduler.arm(inputs, move || f.set(f.get() + 1), t0);
//! assert!(!scheduler.poll(t0 + Duration::from_secs(29)));
//! assert!(scheduler.poll(t0 + Duration::from_secs(30)));
//! assert_eq!(fired.get(), 1);
//! ```

use std::fmt;
use std::time::{Duration, Instant};

/// Default idle delay before an autosave fires.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(30);

/// Flags the scheduler keys its deadline on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoSaveInputs {
    /// Form differs from its snapshot.
    pub dirty: bool,
    /// Record has never been stored.
    pub is_new: bool,
    /// A save call is in flight.
    pub saving: bool,
    /// Record was deleted or deactivated.
    pub deactivated: bool,
    /// Edit counter from the dirty tracker.
    pub revision: u64,
}

impl AutoSaveInputs {
    /// Whether these inputs allow an autosave.
    #[must_use]
    pub const fn eligible(&self) -> bool {
        self.dirty && !self.is_new && !self.saving && !self.deactivated
    }
}

type SaveCallback = Box<dyn FnMut()>;

/// Debounced single-deadline autosave timer.
pub struct AutoSaveScheduler {
    delay: Duration,
    deadline: Option<Instant>,
    last_inputs: Option<AutoSaveInputs>,
    callback: Option<SaveCallback>,
    fire_count: u64,
}

impl AutoSaveScheduler {
    /// Scheduler with the given idle delay.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            last_inputs: None,
            callback: None,
            fire_count: 0,
        }
    }

    /// Configured idle delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Pending deadline, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a deadline is outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// How many times the callback has fired.
    #[must_use]
    pub fn fire_count(&self) -> u64 {
        self.fire_count
    }

    /// Store `on_save` as the latest callback and (re)schedule per `inputs`.
    pub fn arm(&mut self, inputs: AutoSaveInputs, on_save: impl FnMut() + 'static, now: Instant) {
        self.callback = Some(Box::new(on_save));

        let changed = self.last_inputs != Some(inputs);
        self.last_inputs = Some(inputs);

        if !inputs.eligible() {
            if self.deadline.take().is_some() {
                tracing::debug!(
                    dirty = inputs.dirty,
                    is_new = inputs.is_new,
                    saving = inputs.saving,
                    deactivated = inputs.deactivated,
                    "autosave cancelled"
                );
            }
            return;
        }

        if changed {
            let deadline = now + self.delay;
            self.deadline = Some(deadline);
            tracing::trace!(
                revision = inputs.revision,
                delay_ms = self.delay.as_millis() as u64,
                "autosave scheduled"
            );
        }
    }

    /// Fire the latest callback if the deadline has passed at `now`.
    ///
    /// Returns whether it fired. The deadline is cleared either way once it
    /// has elapsed; the next change of inputs schedules a new one.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.fire_count += 1;
                tracing::info!(
                    fire_count = self.fire_count,
                    revision = self.last_inputs.map(|i| i.revision).unwrap_or(0),
                    "autosave fired"
                );
                if let Some(callback) = self.callback.as_mut() {
                    callback();
                }
                true
            }
            _ => false,
        }
    }

    /// Drop the pending deadline. The next `arm` schedules afresh.
    pub fn cancel(&mut self) {
        if self.deadline.take().is_some() {
            tracing::debug!("autosave cancelled");
        }
        self.last_inputs = None;
    }
}

impl Default for AutoSaveScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOSAVE_DELAY)
    }
}

impl Drop for AutoSaveScheduler {
    fn drop(&mut self) {
        self.cancel();
        self.callback = None;
    }
}

impl fmt::Debug for AutoSaveScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoSaveScheduler")
            .field("delay", &self.delay)
            .field("deadline", &self.deadline)
            .field("last_inputs", &self.last_inputs)
            .field("fire_count", &self.fire_count)
            .finish_non_exhaustive()
    }
}
