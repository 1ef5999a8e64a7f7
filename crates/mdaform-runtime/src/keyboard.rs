#![forbid(unsafe_code)]

//! Keyboard save commands.
//!
//! [`KeyEventBus`] is the window-level listener registry: the host feeds every
//! key event through [`KeyEventBus::dispatch`]. [`KeyboardCommandRouter`]
//! registers one listener that maps the save chords onto callbacks.
//!
//! | Chord | Command |
//! |-------|---------|
//! | Ctrl/Cmd+S | save |
//! | Ctrl/Cmd+Shift+S | save and close |
//!
//! Both chords always prevent the host's default handling (the browser or
//! terminal "save page" action), even while the router is disabled.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use mdaform_core::{KeyChord, KeyEvent};

/// Save chord.
pub const SAVE_CHORD: KeyChord = KeyChord::primary('s');

/// Save-and-close chord.
pub const SAVE_AND_CLOSE_CHORD: KeyChord = KeyChord::primary_shift('s');

/// Handle for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Key listener. Returns `true` to prevent the default action.
pub type KeyHandler = Rc<dyn Fn(&KeyEvent) -> bool>;

/// Outcome of dispatching one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// Some listener prevented the default action.
    pub default_prevented: bool,
    /// Listeners that prevented the default action, in call order.
    pub handled_by: Vec<ListenerId>,
}

// ---------------------------------------------------------------------------
// KeyEventBus
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BusState {
    listeners: Vec<(ListenerId, KeyHandler)>,
    next_id: u64,
}

/// Shared key listener registry.
///
/// Listeners run in registration order with no internal borrow held, so a
/// listener may register or unregister listeners (including itself) while
/// an event is being dispatched. A listener removed mid-dispatch is not
/// called for that event; one added mid-dispatch sees the next event.
#[derive(Clone, Default)]
pub struct KeyEventBus {
    state: Rc<RefCell<BusState>>,
}

impl KeyEventBus {
    /// Empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener.
    pub fn register(&self, handler: KeyHandler) -> ListenerId {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = ListenerId(state.next_id);
        state.listeners.push((id, handler));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn unregister(&self, id: ListenerId) {
        self.state.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: ListenerId) -> bool {
        self.state
            .borrow()
            .listeners
            .iter()
            .any(|(lid, _)| *lid == id)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener.
    pub fn dispatch(&self, event: &KeyEvent) -> Dispatch {
        let snapshot: Vec<(ListenerId, KeyHandler)> = self
            .state
            .borrow()
            .listeners
            .iter()
            .map(|(id, h)| (*id, Rc::clone(h)))
            .collect();

        let mut out = Dispatch::default();
        for (id, handler) in snapshot {
            if !self.contains(id) {
                continue;
            }
            if handler(event) {
                out.default_prevented = true;
                out.handled_by.push(id);
            }
        }
        out
    }
}

impl fmt::Debug for KeyEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// KeyboardCommandRouter
// ---------------------------------------------------------------------------

/// A command callback.
pub type Command = Rc<dyn Fn()>;

/// Callbacks and enablement for the save chords.
#[derive(Clone, Default)]
pub struct KeyCommands {
    pub on_save: Option<Command>,
    pub on_save_and_close: Option<Command>,
    /// Suppress callbacks. Default handling is still prevented.
    pub disabled: bool,
}

impl KeyCommands {
    /// Commands with a save callback.
    #[must_use]
    pub fn with_save(mut self, f: impl Fn() + 'static) -> Self {
        self.on_save = Some(Rc::new(f));
        self
    }

    /// Commands with a save-and-close callback.
    #[must_use]
    pub fn with_save_and_close(mut self, f: impl Fn() + 'static) -> Self {
        self.on_save_and_close = Some(Rc::new(f));
        self
    }

    /// Set the disabled flag.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl fmt::Debug for KeyCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCommands")
            .field("on_save", &self.on_save.is_some())
            .field("on_save_and_close", &self.on_save_and_close.is_some())
            .field("disabled", &self.disabled)
            .finish()
    }
}

fn command_handler(commands: KeyCommands) -> KeyHandler {
    Rc::new(move |event: &KeyEvent| {
        if !event.is_actionable() {
            return false;
        }
        let (name, callback) = if SAVE_AND_CLOSE_CHORD.matches(event) {
            ("save_and_close", commands.on_save_and_close.as_ref())
        } else if SAVE_CHORD.matches(event) {
            ("save", commands.on_save.as_ref())
        } else {
            return false;
        };
        if commands.disabled {
            tracing::trace!(command = name, "key command suppressed");
        } else if let Some(callback) = callback {
            tracing::debug!(command = name, "key command");
            callback();
        }
        true
    })
}

/// Binds the save chords on a [`KeyEventBus`] for the lifetime of the value.
pub struct KeyboardCommandRouter {
    bus: KeyEventBus,
    listener: ListenerId,
    commands: KeyCommands,
}

impl KeyboardCommandRouter {
    /// Register the chord listener on `bus`.
    pub fn register(bus: &KeyEventBus, commands: KeyCommands) -> Self {
        let listener = bus.register(command_handler(commands.clone()));
        Self {
            bus: bus.clone(),
            listener,
            commands,
        }
    }

    /// Replace the callbacks and flag, re-registering the listener.
    pub fn update(&mut self, commands: KeyCommands) {
        self.bus.unregister(self.listener);
        self.listener = self.bus.register(command_handler(commands.clone()));
        self.commands = commands;
    }

    /// Change only the disabled flag. No-op when unchanged.
    pub fn set_disabled(&mut self, disabled: bool) {
        if self.commands.disabled != disabled {
            let commands = self.commands.clone().disabled(disabled);
            self.update(commands);
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.commands.disabled
    }

    /// The currently registered listener.
    #[must_use]
    pub fn listener(&self) -> ListenerId {
        self.listener
    }
}

impl Drop for KeyboardCommandRouter {
    fn drop(&mut self) {
        self.bus.unregister(self.listener);
    }
}

impl fmt::Debug for KeyboardCommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardCommandRouter")
            .field("listener", &self.listener)
            .field("commands", &self.commands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdaform_core::{KeyCode, KeyEventKind, Modifiers};
    use std::cell::Cell;

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL)
    }

    fn counting() -> (Rc<Cell<u32>>, Rc<Cell<u32>>, KeyCommands) {
        let saves = Rc::new(Cell::new(0));
        let closes = Rc::new(Cell::new(0));
        let (s, c) = (Rc::clone(&saves), Rc::clone(&closes));
        let commands = KeyCommands::default()
            .with_save(move || s.set(s.get() + 1))
            .with_save_and_close(move || c.set(c.get() + 1));
        (saves, closes, commands)
    }

    #[test]
    fn ctrl_s_saves_once() {
        let bus = KeyEventBus::new();
        let (saves, closes, commands) = counting();
        let router = KeyboardCommandRouter::register(&bus, commands);
        let d = bus.dispatch(&ctrl('s'));
        assert!(d.default_prevented);
        assert_eq!(d.handled_by, vec![router.listener()]);
        assert_eq!((saves.get(), closes.get()), (1, 0));
    }

    #[test]
    fn cmd_works_like_ctrl() {
        let bus = KeyEventBus::new();
        let (saves, _, commands) = counting();
        let _router = KeyboardCommandRouter::register(&bus, commands);
        bus.dispatch(&KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::SUPER));
        assert_eq!(saves.get(), 1);
    }

    #[test]
    fn shift_variants_save_and_close() {
        let bus = KeyEventBus::new();
        let (saves, closes, commands) = counting();
        let _router = KeyboardCommandRouter::register(&bus, commands);
        let ctrl_shift = Modifiers::CTRL | Modifiers::SHIFT;
        bus.dispatch(&ctrl('S').with_modifiers(ctrl_shift));
        bus.dispatch(&ctrl('s').with_modifiers(ctrl_shift));
        assert_eq!((saves.get(), closes.get()), (0, 2));
    }

    #[test]
    fn caps_lock_ctrl_s_only_saves() {
        let bus = KeyEventBus::new();
        let (saves, closes, commands) = counting();
        let _router = KeyboardCommandRouter::register(&bus, commands);
        let d = bus.dispatch(&ctrl('S'));
        assert!(d.default_prevented);
        assert_eq!((saves.get(), closes.get()), (1, 0));
    }

    #[test]
    fn disabled_still_prevents_default() {
        let bus = KeyEventBus::new();
        let (saves, closes, commands) = counting();
        let _router = KeyboardCommandRouter::register(&bus, commands.disabled(true));
        assert!(bus.dispatch(&ctrl('s')).default_prevented);
        assert!(
            bus.dispatch(&ctrl('S').with_modifiers(Modifiers::CTRL | Modifiers::SHIFT))
                .default_prevented
        );
        assert_eq!((saves.get(), closes.get()), (0, 0));
    }

    #[test]
    fn release_and_plain_keys_ignored() {
        let bus = KeyEventBus::new();
        let (saves, _, commands) = counting();
        let _router = KeyboardCommandRouter::register(&bus, commands);
        assert!(
            !bus.dispatch(&ctrl('s').with_kind(KeyEventKind::Release))
                .default_prevented
        );
        assert!(!bus.dispatch(&KeyEvent::new(KeyCode::Char('s'))).default_prevented);
        assert!(
            !bus.dispatch(&ctrl('s').with_modifiers(Modifiers::CTRL | Modifiers::ALT))
                .default_prevented
        );
        assert!(bus.dispatch(&ctrl('s').with_kind(KeyEventKind::Repeat)).default_prevented);
        assert_eq!(saves.get(), 1);
    }

    #[test]
    fn set_disabled_toggles() {
        let bus = KeyEventBus::new();
        let (saves, _, commands) = counting();
        let mut router = KeyboardCommandRouter::register(&bus, commands);
        router.set_disabled(true);
        bus.dispatch(&ctrl('s'));
        router.set_disabled(false);
        bus.dispatch(&ctrl('s'));
        assert_eq!(saves.get(), 1);
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn drop_unregisters() {
        let bus = KeyEventBus::new();
        let (saves, _, commands) = counting();
        let router = KeyboardCommandRouter::register(&bus, commands);
        drop(router);
        assert!(bus.is_empty());
        assert!(!bus.dispatch(&ctrl('s')).default_prevented);
        assert_eq!(saves.get(), 0);
    }

    #[test]
    fn listener_may_unregister_itself_during_dispatch() {
        let bus = KeyEventBus::new();
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let (b, s) = (bus.clone(), Rc::clone(&slot));
        let id = bus.register(Rc::new(move |_: &KeyEvent| {
            if let Some(id) = s.get() {
                b.unregister(id);
            }
            true
        }));
        slot.set(Some(id));
        assert!(bus.dispatch(&ctrl('x')).default_prevented);
        assert!(bus.is_empty());
        assert!(!bus.dispatch(&ctrl('x')).default_prevented);
    }

    #[test]
    fn listener_removed_mid_dispatch_is_skipped() {
        let bus = KeyEventBus::new();
        let later_calls = Rc::new(Cell::new(0));
        let victim: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));
        let (b, v) = (bus.clone(), Rc::clone(&victim));
        bus.register(Rc::new(move |_: &KeyEvent| {
            if let Some(id) = v.get() {
                b.unregister(id);
            }
            false
        }));
        let lc = Rc::clone(&later_calls);
        let id = bus.register(Rc::new(move |_: &KeyEvent| {
            lc.set(lc.get() + 1);
            false
        }));
        victim.set(Some(id));
        bus.dispatch(&ctrl('x'));
        assert_eq!(later_calls.get(), 0);
    }
}
