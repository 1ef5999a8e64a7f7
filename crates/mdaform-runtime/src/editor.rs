#![forbid(unsafe_code)]

//! One record-editing screen.
//!
//! [`RecordEditor`] owns the live form values and wires the dirty tracker to
//! its collaborators:
//!
//! ```text
//!   set_field ──▶ DirtyTracker ──live flag──▶ NavigationGuard (router blocker)
//!                     │
//!                     └─ dirty/revision ──▶ AutoSaveScheduler ──▶ save()
//!   KeyEventBus ──▶ KeyboardCommandRouter ──▶ command queue ──▶ save() / save_and_close()
//! ```
//!
//! Chord and autosave callbacks only enqueue an [`EditorCommand`]; the editor
//! runs them from [`tick`](RecordEditor::tick) and
//! [`process_commands`](RecordEditor::process_commands), so no callback ever
//! holds a borrow of the editor.
//!
//! Save success resets the tracker before returning. A navigation issued
//! right after a successful save is therefore never blocked.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use mdaform_core::{DirtyTracker, FieldMap, ResetToken, Scalar};
use mdaform_data::{DataError, DataResult, EntityService, Record, RecordId};

use crate::autosave::{AutoSaveInputs, AutoSaveScheduler};
use crate::context::AppContext;
use crate::keyboard::{KeyCommands, KeyEventBus, KeyboardCommandRouter};
use crate::navigation::{MemoryRouter, NavigationGuard, NavigationOutcome, Router};
use crate::notify::NotificationKind;
use crate::persistence::ItemRef;

/// Deferred editor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    Save,
    SaveAndClose,
    AutoSave,
}

type CommandQueue = Rc<RefCell<VecDeque<EditorCommand>>>;

/// Editor for one record of type `R`.
pub struct RecordEditor<R, S, Ro = MemoryRouter>
where
    R: Record,
    S: EntityService<R>,
    Ro: Router + Clone,
{
    service: S,
    router: Ro,
    ctx: AppContext,
    record: Option<R>,
    values: FieldMap,
    tracker: DirtyTracker,
    autosave: AutoSaveScheduler,
    guard: Option<NavigationGuard<Ro>>,
    keys: Option<KeyboardCommandRouter>,
    queue: CommandQueue,
    saving: bool,
    deactivated: bool,
}

impl<R, S, Ro> RecordEditor<R, S, Ro>
where
    R: Record,
    S: EntityService<R>,
    Ro: Router + Clone,
{
    /// Open `id`, or a blank new record when `id` is `None`.
    pub fn open(
        service: S,
        router: Ro,
        bus: &KeyEventBus,
        ctx: &AppContext,
        id: Option<RecordId>,
    ) -> DataResult<Self> {
        let record = match id {
            Some(id) => match service.get(id) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(entity = R::ENTITY, id = %id, error = %e, "record load failed");
                    ctx.notify(
                        &format!("Could not load {}: {e}", R::ENTITY),
                        NotificationKind::Error,
                    );
                    return Err(e);
                }
            },
            None => None,
        };
        let values = match &record {
            Some(record) => record.to_fields(),
            None => R::blank(RecordId::nil()).to_fields(),
        };

        let config = ctx.config();
        let mut tracker = DirtyTracker::with_policy(config.load_detection);
        let token = token_for(record.as_ref());
        tracker.update(&values, &token);
        tracker.mark_loaded(&values);

        let guard = NavigationGuard::attach(router.clone(), tracker.live_flag());
        let queue: CommandQueue = Rc::new(RefCell::new(VecDeque::new()));
        let keys = config
            .keyboard_shortcuts
            .then(|| KeyboardCommandRouter::register(bus, key_commands(&queue)));

        if let Some(record) = &record {
            ctx.recent().record(item_ref(record));
        }

        tracing::info!(
            entity = R::ENTITY,
            id = %token,
            is_new = record.is_none(),
            fields = values.len(),
            "record opened"
        );

        Ok(Self {
            service,
            router,
            ctx: ctx.clone(),
            autosave: AutoSaveScheduler::new(config.autosave_delay),
            record,
            values,
            tracker,
            guard: Some(guard),
            keys,
            queue,
            saving: false,
            deactivated: false,
        })
    }

    // -- state -------------------------------------------------------------

    /// Live form values.
    #[must_use]
    pub fn values(&self) -> &FieldMap {
        &self.values
    }

    /// The stored record, `None` until a new record is first saved.
    #[must_use]
    pub fn record(&self) -> Option<&R> {
        self.record.as_ref()
    }

    #[must_use]
    pub fn is_new(&self) -> bool {
        self.record.is_none()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.tracker.is_dirty()
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    #[must_use]
    pub fn is_deactivated(&self) -> bool {
        self.deactivated
    }

    #[must_use]
    pub fn tracker(&self) -> &DirtyTracker {
        &self.tracker
    }

    #[must_use]
    pub fn autosave(&self) -> &AutoSaveScheduler {
        &self.autosave
    }

    /// Commands waiting for [`process_commands`](Self::process_commands).
    #[must_use]
    pub fn pending_commands(&self) -> Vec<EditorCommand> {
        self.queue.borrow().iter().copied().collect()
    }

    // -- editing -----------------------------------------------------------

    /// Edit one field.
    pub fn set_field(&mut self, name: &str, value: impl Into<Scalar>) {
        self.values.insert(name, value);
        self.observe();
    }

    /// Edit several fields at once.
    pub fn set_fields(&mut self, fields: &FieldMap) {
        self.values.merge(fields);
        self.observe();
    }

    /// Throw away edits and return to the stored values.
    pub fn discard_changes(&mut self) {
        self.values = match &self.record {
            Some(record) => record.to_fields(),
            None => R::blank(RecordId::nil()).to_fields(),
        };
        self.tracker.reset(&self.values);
    }

    fn observe(&mut self) {
        let token = token_for(self.record.as_ref());
        self.tracker.update(&self.values, &token);
    }

    // -- timers and commands -----------------------------------------------

    /// Re-arm autosave with the current flags and run it if due.
    ///
    /// Returns whether an autosave ran.
    pub fn tick(&mut self, now: Instant) -> bool {
        let inputs = AutoSaveInputs {
            dirty: self.tracker.is_dirty(),
            is_new: self.is_new(),
            saving: self.saving,
            deactivated: self.deactivated,
            revision: self.tracker.revision(),
        };
        let queue = Rc::clone(&self.queue);
        self.autosave.arm(
            inputs,
            move || queue.borrow_mut().push_back(EditorCommand::AutoSave),
            now,
        );
        if !self.autosave.poll(now) {
            return false;
        }

        self.queue
            .borrow_mut()
            .retain(|c| *c != EditorCommand::AutoSave);
        if let Err(e) = self.save() {
            tracing::warn!(entity = R::ENTITY, error = %e, "autosave failed");
        }
        true
    }

    /// Run queued chord commands. `list_location` is where save-and-close
    /// navigates.
    pub fn process_commands(&mut self, list_location: &str) -> Vec<EditorCommand> {
        let mut ran = Vec::new();
        loop {
            let next = self.queue.borrow_mut().pop_front();
            let Some(command) = next else { break };
            let result = match command {
                EditorCommand::Save | EditorCommand::AutoSave => self.save().map(drop),
                EditorCommand::SaveAndClose => self.save_and_close(list_location).map(drop),
            };
            if let Err(e) = result {
                tracing::debug!(?command, error = %e, "queued command failed");
            }
            ran.push(command);
        }
        ran
    }

    // -- persistence -------------------------------------------------------

    /// Create or update the record from the live values.
    ///
    /// On success the tracker is reset to the stored values before this
    /// returns. On failure the error is notified and dirty state is left
    /// as it was.
    pub fn save(&mut self) -> DataResult<R> {
        if self.deactivated {
            return Err(DataError::Conflict(format!(
                "{} was deleted",
                R::ENTITY
            )));
        }

        self.saving = true;
        if let Some(keys) = self.keys.as_mut() {
            keys.set_disabled(true);
        }
        let result = match &self.record {
            Some(record) => self.service.update(record.id(), &self.values),
            None => self.service.create(&self.values),
        };
        self.saving = false;
        if let Some(keys) = self.keys.as_mut() {
            keys.set_disabled(false);
        }

        match result {
            Ok(stored) => {
                let created = self.record.is_none();
                self.values = stored.to_fields();
                if created {
                    // Adopt the new identity before re-baselining.
                    self.tracker.update(&self.values, &token_for(Some(&stored)));
                }
                self.tracker.reset(&self.values);
                self.ctx.recent().record(item_ref(&stored));
                self.ctx.notify(
                    &format!("Saved {}", stored.title()),
                    NotificationKind::Success,
                );
                tracing::info!(entity = R::ENTITY, id = %stored.id(), created, "record saved");
                self.record = Some(stored.clone());
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!(entity = R::ENTITY, error = %e, "record save failed");
                self.ctx
                    .notify(&format!("Could not save: {e}"), NotificationKind::Error);
                Err(e)
            }
        }
    }

    /// Save, then navigate to `list_location`.
    pub fn save_and_close(&mut self, list_location: &str) -> DataResult<NavigationOutcome> {
        self.save()?;
        Ok(self.router.navigate(list_location))
    }

    /// Delete the record and mark the editor deactivated.
    pub fn delete(&mut self) -> DataResult<()> {
        if let Some(record) = &self.record {
            let id = record.id();
            if let Err(e) = self.service.delete(id) {
                tracing::warn!(entity = R::ENTITY, id = %id, error = %e, "record delete failed");
                self.ctx
                    .notify(&format!("Could not delete: {e}"), NotificationKind::Error);
                return Err(e);
            }
            let id = id.to_string();
            self.ctx.recent().remove(R::ENTITY, &id);
            self.ctx.pinned().unpin(R::ENTITY, &id);
            self.ctx.notify(
                &format!("Deleted {}", record.title()),
                NotificationKind::Success,
            );
            tracing::info!(entity = R::ENTITY, id = %id, "record deleted");
        }
        self.deactivated = true;
        self.autosave.cancel();
        self.tracker.reset(&self.values);
        Ok(())
    }

    /// Pin or unpin the record. Returns whether it is now pinned; a new
    /// record cannot be pinned.
    pub fn toggle_pin(&self) -> bool {
        match &self.record {
            Some(record) => self.ctx.pinned().toggle(item_ref(record)),
            None => false,
        }
    }

    // -- navigation ----------------------------------------------------------

    /// Navigate through the guarded router.
    pub fn navigate(&self, to: &str) -> NavigationOutcome {
        self.router.navigate(to)
    }

    /// Whether the leave-confirmation dialog is up.
    #[must_use]
    pub fn show_leave_dialog(&self) -> bool {
        self.guard.as_ref().is_some_and(NavigationGuard::show_dialog)
    }

    /// Target of the blocked navigation.
    #[must_use]
    pub fn pending_navigation(&self) -> Option<String> {
        self.guard.as_ref().and_then(NavigationGuard::pending_target)
    }

    /// Leave without saving.
    pub fn confirm_leave(&self) -> bool {
        self.guard.as_ref().is_some_and(NavigationGuard::confirm_leave)
    }

    /// Stay on the form.
    pub fn cancel_leave(&self) {
        if let Some(guard) = &self.guard {
            guard.cancel_leave();
        }
    }

    /// Detach timers and listeners.
    pub fn close(self) {}
}

impl<R, S, Ro> Drop for RecordEditor<R, S, Ro>
where
    R: Record,
    S: EntityService<R>,
    Ro: Router + Clone,
{
    fn drop(&mut self) {
        self.autosave.cancel();
        self.keys = None;
        self.guard = None;
        self.queue.borrow_mut().clear();
        tracing::debug!(entity = R::ENTITY, "editor closed");
    }
}

impl<R, S, Ro> fmt::Debug for RecordEditor<R, S, Ro>
where
    R: Record,
    S: EntityService<R>,
    Ro: Router + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordEditor")
            .field("entity", &R::ENTITY)
            .field("record", &self.record.as_ref().map(Record::id))
            .field("dirty", &self.tracker.is_dirty())
            .field("saving", &self.saving)
            .field("deactivated", &self.deactivated)
            .field("autosave", &self.autosave)
            .finish_non_exhaustive()
    }
}

fn token_for<R: Record>(record: Option<&R>) -> ResetToken {
    match record {
        Some(record) => ResetToken::new(record.id().to_string()),
        None => ResetToken::none(),
    }
}

fn item_ref<R: Record>(record: &R) -> ItemRef {
    ItemRef::new(R::ENTITY, record.id().to_string(), record.title())
}

fn key_commands(queue: &CommandQueue) -> KeyCommands {
    let save = Rc::clone(queue);
    let close = Rc::clone(queue);
    KeyCommands::default()
        .with_save(move || save.borrow_mut().push_back(EditorCommand::Save))
        .with_save_and_close(move || close.borrow_mut().push_back(EditorCommand::SaveAndClose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use mdaform_core::{KeyCode, KeyEvent, Modifiers};
    use mdaform_data::{Category, MemoryService};
    use std::time::Duration;

    type Editor = RecordEditor<Category, MemoryService<Category>>;

    fn fixture() -> (MemoryService<Category>, MemoryRouter, KeyEventBus, AppContext, RecordId) {
        let service = MemoryService::<Category>::new();
        let stored = service
            .create(&FieldMap::new().with("name", "Ops"))
            .unwrap();
        let router = MemoryRouter::new(format!("/categories/{}", stored.id));
        (service, router, KeyEventBus::new(), AppContext::default(), stored.id)
    }

    fn open(
        service: &MemoryService<Category>,
        router: &MemoryRouter,
        bus: &KeyEventBus,
        ctx: &AppContext,
        id: Option<RecordId>,
    ) -> Editor {
        RecordEditor::open(service.clone(), router.clone(), bus, ctx, id).unwrap()
    }

    #[test]
    fn opens_clean_and_records_recent() {
        let (service, router, bus, ctx, id) = fixture();
        let editor = open(&service, &router, &bus, &ctx, Some(id));
        assert!(!editor.is_dirty());
        assert!(!editor.is_new());
        assert_eq!(ctx.recent().items()[0].id, id.to_string());
    }

    #[test]
    fn missing_record_fails_to_open() {
        let (service, router, bus, ctx, _) = fixture();
        let err = Editor::open(service, router, &bus, &ctx, Some(RecordId::new())).unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[test]
    fn edit_then_save_is_clean() {
        let (service, router, bus, ctx, id) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        editor.set_field("name", "Operations");
        assert!(editor.is_dirty());
        editor.save().unwrap();
        assert!(!editor.is_dirty());
        assert_eq!(service.get(id).unwrap().name, "Operations");
    }

    #[test]
    fn new_record_save_adopts_identity() {
        let (service, router, bus, ctx, _) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, None);
        assert!(editor.is_new());
        editor.set_field("name", "Finance");
        let stored = editor.save().unwrap();
        assert!(!editor.is_new());
        assert!(!editor.is_dirty());

        editor.set_field("color", "teal");
        assert!(editor.is_dirty());
        assert_eq!(
            editor.tracker().dirty_fields().into_iter().collect::<Vec<_>>(),
            ["color"]
        );
        assert_eq!(editor.record().map(|r| r.id), Some(stored.id));
    }

    #[test]
    fn chord_queues_command() {
        let (service, router, bus, ctx, id) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        editor.set_field("name", "Ops 2");
        let d = bus.dispatch(&KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL));
        assert!(d.default_prevented);
        assert_eq!(editor.pending_commands(), [EditorCommand::Save]);
        assert_eq!(editor.process_commands("/categories"), [EditorCommand::Save]);
        assert!(!editor.is_dirty());
        assert_eq!(router.location(), format!("/categories/{id}"));
    }

    #[test]
    fn shortcuts_can_be_disabled_by_config() {
        let (service, router, bus, _, id) = fixture();
        let ctx = AppContext::in_memory(EditorConfig::default().with_keyboard_shortcuts(false));
        let _editor = open(&service, &router, &bus, &ctx, Some(id));
        assert!(bus.is_empty());
    }

    #[test]
    fn autosave_runs_after_idle_delay() {
        let (service, router, bus, _, id) = fixture();
        let ctx = AppContext::in_memory(
            EditorConfig::default().with_autosave_delay(Duration::from_secs(10)),
        );
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        let t0 = Instant::now();
        editor.set_field("name", "Auto");
        assert!(!editor.tick(t0));
        assert!(!editor.tick(t0 + Duration::from_secs(9)));
        assert!(editor.tick(t0 + Duration::from_secs(10)));
        assert!(!editor.is_dirty());
        assert_eq!(service.get(id).unwrap().name, "Auto");
        assert!(!editor.tick(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn delete_deactivates_and_forgets() {
        let (service, router, bus, ctx, id) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        assert!(editor.toggle_pin());
        editor.set_field("name", "doomed");
        editor.delete().unwrap();
        assert!(editor.is_deactivated());
        assert!(!editor.is_dirty());
        assert!(ctx.recent().items().is_empty());
        assert!(ctx.pinned().items().is_empty());
        assert!(editor.save().is_err());
    }

    #[test]
    fn discard_restores_stored_values() {
        let (service, router, bus, ctx, id) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        editor.set_field("name", "typo");
        editor.discard_changes();
        assert!(!editor.is_dirty());
        assert_eq!(editor.values().canonical("name"), "Ops");
    }

    #[test]
    fn close_detaches_everything() {
        let (service, router, bus, ctx, id) = fixture();
        let mut editor = open(&service, &router, &bus, &ctx, Some(id));
        editor.set_field("name", "unsaved");
        editor.close();
        assert!(bus.is_empty());
        assert_eq!(router.blocker_count(), 0);
        assert_eq!(router.navigate("/categories"), NavigationOutcome::Navigated);
    }
}
