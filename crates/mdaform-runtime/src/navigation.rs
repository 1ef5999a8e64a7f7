#![forbid(unsafe_code)]

//! Navigation interception for unsaved edits.
//!
//! The [`Router`] trait is the contract a host router offers: blockers that
//! veto a transition and park it until the user proceeds or resets, plus
//! unload hooks consulted before the whole app closes. [`MemoryRouter`] is a
//! history-stack implementation of it.
//!
//! [`NavigationGuard`] installs a blocker and an unload hook keyed on a
//! [`LiveFlag`]. Because the predicate reads the flag at call time, a
//! synchronous `reset` on the dirty tracker is visible to a navigation
//! issued in the same step.
//!
//! # State machine
//!
//! ```text
//!   Idle ──(navigate while dirty, target ≠ current)──▶ Blocked
//!   Blocked ──confirm_leave──▶ Idle   (navigation completes)
//!   Blocked ──cancel_leave───▶ Idle   (location unchanged)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mdaform_core::LiveFlag;

/// Handle for an installed blocker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockerId(u64);

/// Handle for an installed unload hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Blocker predicate: `(current, next) -> block?`.
pub type BlockerFn = Rc<dyn Fn(&str, &str) -> bool>;

/// Unload hook: returns `true` to ask the user before closing.
pub type UnloadHook = Rc<dyn Fn() -> bool>;

/// What a blocker currently reports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BlockerState {
    /// Nothing parked.
    #[default]
    Unblocked,
    /// A transition is parked.
    Blocked { from: String, to: String },
}

impl BlockerState {
    /// Whether a transition is parked.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Result of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Location changed.
    Navigated,
    /// Target equals the current location, or there is nowhere to go back to.
    Unchanged,
    /// A blocker parked the transition.
    Blocked(BlockerId),
}

/// Whether closing the app needs confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadDecision {
    /// Close without asking.
    Allow,
    /// Some hook wants the user to confirm first.
    Confirm,
}

/// Router contract used by [`NavigationGuard`].
///
/// Methods take `&self`; routers are shared handles.
pub trait Router {
    /// Current location.
    fn location(&self) -> String;

    /// Navigate to `to`, consulting blockers.
    fn navigate(&self, to: &str) -> NavigationOutcome;

    /// Install a blocker predicate.
    fn add_blocker(&self, predicate: BlockerFn) -> BlockerId;

    /// Remove a blocker. Any transition it parked is dropped.
    fn remove_blocker(&self, id: BlockerId);

    /// State of a blocker. Unknown ids report `Unblocked`.
    fn blocker_state(&self, id: BlockerId) -> BlockerState;

    /// Complete the transition parked by `id`. Returns whether one was
    /// pending.
    fn proceed(&self, id: BlockerId) -> bool;

    /// Discard the transition parked by `id`.
    fn reset(&self, id: BlockerId);

    /// Install an unload hook.
    fn add_unload_hook(&self, hook: UnloadHook) -> HookId;

    /// Remove an unload hook.
    fn remove_unload_hook(&self, id: HookId);

    /// Ask every hook whether closing needs confirmation.
    fn request_unload(&self) -> UnloadDecision;
}

// ---------------------------------------------------------------------------
// MemoryRouter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Push(String),
    /// Pop back to this entry.
    Back(String),
}

struct BlockerEntry {
    id: BlockerId,
    predicate: BlockerFn,
    parked: Option<(String, Pending)>,
}

struct RouterState {
    history: Vec<String>,
    blockers: Vec<BlockerEntry>,
    hooks: Vec<(HookId, UnloadHook)>,
    next_id: u64,
}

impl RouterState {
    fn current(&self) -> &str {
        self.history.last().map(String::as_str).unwrap_or("/")
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// History-stack router.
///
/// Clones share state. Predicates and hooks are called with no internal
/// borrow held, so they may call back into the router.
#[derive(Clone)]
pub struct MemoryRouter {
    state: Rc<RefCell<RouterState>>,
}

impl MemoryRouter {
    /// Router starting at `initial`.
    #[must_use]
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(RouterState {
                history: vec![initial.into()],
                blockers: Vec::new(),
                hooks: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Visited locations, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().history.clone()
    }

    /// Number of installed blockers.
    #[must_use]
    pub fn blocker_count(&self) -> usize {
        self.state.borrow().blockers.len()
    }

    /// Number of installed unload hooks.
    #[must_use]
    pub fn unload_hook_count(&self) -> usize {
        self.state.borrow().hooks.len()
    }

    /// Go back one entry, consulting blockers.
    pub fn back(&self) -> NavigationOutcome {
        let target = {
            let state = self.state.borrow();
            let len = state.history.len();
            if len < 2 {
                return NavigationOutcome::Unchanged;
            }
            state.history[len - 2].clone()
        };
        self.transition(&target, Pending::Back(target.clone()))
    }

    fn transition(&self, to: &str, pending: Pending) -> NavigationOutcome {
        let (from, predicates) = {
            let state = self.state.borrow();
            let predicates: Vec<(BlockerId, BlockerFn)> = state
                .blockers
                .iter()
                .map(|b| (b.id, Rc::clone(&b.predicate)))
                .collect();
            (state.current().to_owned(), predicates)
        };

        if from == to {
            return NavigationOutcome::Unchanged;
        }

        if let Some((id, _)) = predicates.iter().find(|(_, p)| p(from.as_str(), to)) {
            let mut state = self.state.borrow_mut();
            if let Some(entry) = state.blockers.iter_mut().find(|b| b.id == *id) {
                entry.parked = Some((to.to_owned(), pending));
            }
            tracing::debug!(from = %from, to, blocker = id.0, "navigation blocked");
            return NavigationOutcome::Blocked(*id);
        }

        self.apply(pending);
        tracing::trace!(from = %from, to, "navigated");
        NavigationOutcome::Navigated
    }

    fn apply(&self, pending: Pending) {
        let mut state = self.state.borrow_mut();
        match pending {
            Pending::Push(to) => state.history.push(to),
            Pending::Back(to) => {
                let len = state.history.len();
                if len >= 2 && state.history[len - 2] == to {
                    state.history.pop();
                } else {
                    // History moved while the back was parked.
                    tracing::debug!(to = %to, "back target no longer previous, pushing");
                    state.history.push(to);
                }
            }
        }
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Router for MemoryRouter {
    fn location(&self) -> String {
        self.state.borrow().current().to_owned()
    }

    fn navigate(&self, to: &str) -> NavigationOutcome {
        self.transition(to, Pending::Push(to.to_owned()))
    }

    fn add_blocker(&self, predicate: BlockerFn) -> BlockerId {
        let mut state = self.state.borrow_mut();
        let id = BlockerId(state.alloc_id());
        state.blockers.push(BlockerEntry {
            id,
            predicate,
            parked: None,
        });
        id
    }

    fn remove_blocker(&self, id: BlockerId) {
        self.state.borrow_mut().blockers.retain(|b| b.id != id);
    }

    fn blocker_state(&self, id: BlockerId) -> BlockerState {
        let state = self.state.borrow();
        match state.blockers.iter().find(|b| b.id == id) {
            Some(BlockerEntry {
                parked: Some((to, _)),
                ..
            }) => BlockerState::Blocked {
                from: state.current().to_owned(),
                to: to.clone(),
            },
            _ => BlockerState::Unblocked,
        }
    }

    fn proceed(&self, id: BlockerId) -> bool {
        let parked = {
            let mut state = self.state.borrow_mut();
            state
                .blockers
                .iter_mut()
                .find(|b| b.id == id)
                .and_then(|b| b.parked.take())
        };
        match parked {
            Some((to, pending)) => {
                tracing::debug!(to = %to, blocker = id.0, "blocked navigation proceeding");
                self.apply(pending);
                true
            }
            None => false,
        }
    }

    fn reset(&self, id: BlockerId) {
        let mut state = self.state.borrow_mut();
        if let Some(entry) = state.blockers.iter_mut().find(|b| b.id == id)
            && entry.parked.take().is_some()
        {
            tracing::debug!(blocker = id.0, "blocked navigation discarded");
        }
    }

    fn add_unload_hook(&self, hook: UnloadHook) -> HookId {
        let mut state = self.state.borrow_mut();
        let id = HookId(state.alloc_id());
        state.hooks.push((id, hook));
        id
    }

    fn remove_unload_hook(&self, id: HookId) {
        self.state.borrow_mut().hooks.retain(|(hid, _)| *hid != id);
    }

    fn request_unload(&self) -> UnloadDecision {
        let hooks: Vec<UnloadHook> = self
            .state
            .borrow()
            .hooks
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        if hooks.iter().any(|h| h()) {
            UnloadDecision::Confirm
        } else {
            UnloadDecision::Allow
        }
    }
}

impl fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryRouter")
            .field("location", &state.current())
            .field("depth", &state.history.len())
            .field("blockers", &state.blockers.len())
            .field("hooks", &state.hooks.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// NavigationGuard
// ---------------------------------------------------------------------------

/// Blocks navigation away from a dirty form until the user decides.
///
/// Dropping the guard removes its blocker and unload hook.
pub struct NavigationGuard<R: Router> {
    router: R,
    blocker: BlockerId,
    hook: HookId,
    live: LiveFlag,
}

impl<R: Router> NavigationGuard<R> {
    /// Install the blocker and unload hook on `router`.
    pub fn attach(router: R, live: LiveFlag) -> Self {
        let flag = live.clone();
        let blocker = router.add_blocker(Rc::new(move |current: &str, next: &str| {
            flag.get() && current != next
        }));
        let flag = live.clone();
        let hook = router.add_unload_hook(Rc::new(move || flag.get()));
        tracing::trace!(blocker = blocker.0, hook = hook.0, "navigation guard attached");
        Self {
            router,
            blocker,
            hook,
            live,
        }
    }

    /// Whether the leave-confirmation dialog should be shown.
    #[must_use]
    pub fn show_dialog(&self) -> bool {
        self.router.blocker_state(self.blocker).is_blocked()
    }

    /// Target of the parked navigation.
    #[must_use]
    pub fn pending_target(&self) -> Option<String> {
        match self.router.blocker_state(self.blocker) {
            BlockerState::Blocked { to, .. } => Some(to),
            BlockerState::Unblocked => None,
        }
    }

    /// Leave anyway: complete the parked navigation.
    pub fn confirm_leave(&self) -> bool {
        self.router.proceed(self.blocker)
    }

    /// Stay: discard the parked navigation.
    pub fn cancel_leave(&self) {
        self.router.reset(self.blocker);
    }

    /// Whether the guarded form is currently dirty.
    #[must_use]
    pub fn is_guarding(&self) -> bool {
        self.live.get()
    }

    /// The router this guard is attached to.
    pub fn router(&self) -> &R {
        &self.router
    }
}

impl<R: Router> Drop for NavigationGuard<R> {
    fn drop(&mut self) {
        self.router.remove_blocker(self.blocker);
        self.router.remove_unload_hook(self.hook);
        tracing::trace!(blocker = self.blocker.0, "navigation guard detached");
    }
}

impl<R: Router> fmt::Debug for NavigationGuard<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationGuard")
            .field("blocker", &self.blocker)
            .field("hook", &self.hook)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}
