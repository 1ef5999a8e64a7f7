#![forbid(unsafe_code)]

//! End-to-end record editor flows.
//!
//! Each test drives a [`RecordEditor`] the way a host screen would: edits go
//! through `set_field`, keys through the shared [`KeyEventBus`], time through
//! explicit `tick(now)` calls, and navigation through a [`MemoryRouter`].

use std::time::{Duration, Instant};

use mdaform_core::{FieldMap, KeyCode, KeyEvent, KeyEventKind, Modifiers};
use mdaform_data::{DataError, EntityService, MemoryService, Project, RecordId};
use mdaform_runtime::{
    AppContext, EditorCommand, EditorConfig, KeyEventBus, MemoryRouter, NavigationOutcome,
    NotificationKind, RecordEditor, Router, UnloadDecision,
};

type ProjectEditor = RecordEditor<Project, MemoryService<Project>>;

const LIST: &str = "/projects";

struct Screen {
    service: MemoryService<Project>,
    router: MemoryRouter,
    bus: KeyEventBus,
    ctx: AppContext,
    id: RecordId,
}

impl Screen {
    fn new(config: EditorConfig) -> Self {
        let service = MemoryService::<Project>::new();
        let stored = service
            .create(
                &FieldMap::new()
                    .with("name", "Apollo")
                    .with("status", "active")
                    .with("budget", 1200.0),
            )
            .expect("seed project");
        Self {
            router: MemoryRouter::new(format!("{LIST}/{}", stored.id)),
            service,
            bus: KeyEventBus::new(),
            ctx: AppContext::in_memory(config),
            id: stored.id,
        }
    }

    fn open(&self, id: Option<RecordId>) -> ProjectEditor {
        RecordEditor::open(
            self.service.clone(),
            self.router.clone(),
            &self.bus,
            &self.ctx,
            id,
        )
        .expect("open editor")
    }

    fn latest_kind(&self) -> Option<NotificationKind> {
        self.ctx
            .notifications()
            .and_then(|center| center.latest())
            .map(|n| n.kind)
    }
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c)).with_modifiers(Modifiers::CTRL)
}

// ============================================================================
// Navigation
// ============================================================================

#[test]
fn dirty_form_blocks_then_cancel_then_confirm() {
    let screen = Screen::new(EditorConfig::default());
    let editor = {
        let mut editor = screen.open(Some(screen.id));
        editor.set_field("name", "Apollo II");
        editor
    };
    let home = screen.router.location();

    assert!(matches!(
        editor.navigate("/dashboard"),
        NavigationOutcome::Blocked(_)
    ));
    assert!(editor.show_leave_dialog());
    assert_eq!(editor.pending_navigation().as_deref(), Some("/dashboard"));
    assert_eq!(screen.router.location(), home);

    editor.cancel_leave();
    assert!(!editor.show_leave_dialog());
    assert_eq!(screen.router.location(), home);
    assert!(editor.is_dirty());

    assert!(matches!(
        editor.navigate("/dashboard"),
        NavigationOutcome::Blocked(_)
    ));
    assert!(editor.confirm_leave());
    assert_eq!(screen.router.location(), "/dashboard");
    assert!(!editor.show_leave_dialog());
}

#[test]
fn clean_form_navigates_freely() {
    let screen = Screen::new(EditorConfig::default());
    let editor = screen.open(Some(screen.id));
    assert_eq!(editor.navigate(LIST), NavigationOutcome::Navigated);
    assert!(!editor.show_leave_dialog());
}

#[test]
fn reverting_an_edit_lifts_the_block() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    editor.set_field("name", "Apollo II");
    editor.set_field("name", "Apollo");
    assert!(!editor.is_dirty());
    assert_eq!(editor.navigate(LIST), NavigationOutcome::Navigated);
}

#[test]
fn unload_asks_for_confirmation_only_when_dirty() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    assert_eq!(screen.router.request_unload(), UnloadDecision::Allow);
    editor.set_field("budget", 1500.0);
    assert_eq!(screen.router.request_unload(), UnloadDecision::Confirm);
    editor.save().expect("save");
    assert_eq!(screen.router.request_unload(), UnloadDecision::Allow);
}

// ============================================================================
// Keyboard commands
// ============================================================================

#[test]
fn save_and_close_chord_is_not_blocked_by_its_own_edits() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    editor.set_field("name", "Apollo II");

    let event = KeyEvent::new(KeyCode::Char('S')).with_modifiers(Modifiers::CTRL | Modifiers::SHIFT);
    assert!(screen.bus.dispatch(&event).default_prevented);
    assert_eq!(editor.pending_commands(), [EditorCommand::SaveAndClose]);

    assert_eq!(editor.process_commands(LIST), [EditorCommand::SaveAndClose]);
    assert_eq!(screen.router.location(), LIST);
    assert!(!editor.show_leave_dialog());
    assert!(!editor.is_dirty());
    assert_eq!(
        screen.service.get(screen.id).expect("stored").name,
        "Apollo II"
    );
}

#[test]
fn save_chord_on_clean_form_still_prevents_default() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    let calls = screen.service.calls();

    assert!(screen.bus.dispatch(&ctrl('s')).default_prevented);
    editor.process_commands(LIST);
    assert_eq!(screen.service.calls(), calls + 1);
    assert!(!editor.is_dirty());
}

#[test]
fn key_release_and_other_letters_are_ignored() {
    let screen = Screen::new(EditorConfig::default());
    let editor = screen.open(Some(screen.id));

    let release = ctrl('s').with_kind(KeyEventKind::Release);
    assert!(!screen.bus.dispatch(&release).default_prevented);
    assert!(!screen.bus.dispatch(&ctrl('d')).default_prevented);
    assert!(
        !screen
            .bus
            .dispatch(&KeyEvent::new(KeyCode::Char('s')))
            .default_prevented
    );
    assert!(editor.pending_commands().is_empty());
}

// ============================================================================
// Save failures
// ============================================================================

#[test]
fn failed_save_keeps_dirty_state_and_reports_error() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    editor.set_field("name", "Apollo II");

    screen
        .service
        .fail_next(DataError::Unavailable("server offline".into()));
    let err = editor.save().expect_err("injected failure");
    assert!(err.is_transient());
    assert!(editor.is_dirty());
    assert!(!editor.is_saving());
    assert_eq!(screen.latest_kind(), Some(NotificationKind::Error));
    assert!(matches!(
        editor.navigate(LIST),
        NavigationOutcome::Blocked(_)
    ));
    editor.cancel_leave();

    editor.save().expect("retry succeeds");
    assert!(!editor.is_dirty());
    assert_eq!(screen.latest_kind(), Some(NotificationKind::Success));
}

#[test]
fn validation_failure_is_reported_and_nothing_is_stored() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    editor.set_field("budget", -5.0);

    let err = editor.save().expect_err("negative budget");
    assert!(matches!(err, DataError::Validation { field, .. } if field == "budget"));
    assert!(editor.is_dirty());
    assert_eq!(
        screen.service.get(screen.id).expect("stored").budget,
        Some(1200.0)
    );
}

#[test]
fn failed_save_and_close_stays_on_the_form() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(Some(screen.id));
    let home = screen.router.location();
    editor.set_field("name", "Apollo II");

    screen
        .service
        .fail_next(DataError::Conflict("edited elsewhere".into()));
    assert!(editor.save_and_close(LIST).is_err());
    assert_eq!(screen.router.location(), home);
    assert!(editor.is_dirty());
}

// ============================================================================
// Autosave
// ============================================================================

#[test]
fn new_record_is_never_autosaved() {
    let screen = Screen::new(EditorConfig::default().with_autosave_delay(Duration::from_secs(2)));
    let mut editor = screen.open(None);
    let rows = screen.service.len();
    let t0 = Instant::now();

    editor.set_field("name", "Gemini");
    assert!(editor.is_dirty());
    assert!(!editor.tick(t0));
    assert!(!editor.tick(t0 + Duration::from_secs(60)));
    assert!(!editor.autosave().is_pending());
    assert_eq!(screen.service.len(), rows);
}

#[test]
fn autosave_debounces_on_every_edit() {
    let screen = Screen::new(EditorConfig::default().with_autosave_delay(Duration::from_secs(5)));
    let mut editor = screen.open(Some(screen.id));
    let t0 = Instant::now();

    editor.set_field("name", "A");
    assert!(!editor.tick(t0));
    editor.set_field("name", "Ap");
    assert!(!editor.tick(t0 + Duration::from_secs(4)));
    // The second edit restarted the clock.
    assert!(!editor.tick(t0 + Duration::from_secs(6)));
    assert!(editor.tick(t0 + Duration::from_secs(9)));

    assert_eq!(editor.autosave().fire_count(), 1);
    assert_eq!(screen.service.get(screen.id).expect("stored").name, "Ap");
}

#[test]
fn failed_autosave_is_not_retried_until_the_next_edit() {
    let screen = Screen::new(EditorConfig::default().with_autosave_delay(Duration::from_secs(1)));
    let mut editor = screen.open(Some(screen.id));
    let t0 = Instant::now();

    editor.set_field("name", "Apollo II");
    editor.tick(t0);
    screen
        .service
        .fail_next(DataError::Unavailable("offline".into()));
    assert!(editor.tick(t0 + Duration::from_secs(1)));
    assert!(editor.is_dirty());
    assert!(!editor.tick(t0 + Duration::from_secs(30)));

    editor.set_field("name", "Apollo III");
    editor.tick(t0 + Duration::from_secs(31));
    assert!(editor.tick(t0 + Duration::from_secs(32)));
    assert!(!editor.is_dirty());
}

#[test]
fn deleted_record_cancels_pending_autosave() {
    let screen = Screen::new(EditorConfig::default().with_autosave_delay(Duration::from_secs(1)));
    let mut editor = screen.open(Some(screen.id));
    let t0 = Instant::now();

    editor.set_field("name", "doomed");
    editor.tick(t0);
    assert!(editor.autosave().is_pending());
    editor.delete().expect("delete");
    assert!(!editor.tick(t0 + Duration::from_secs(5)));
    assert!(screen.service.get(screen.id).is_err());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn new_record_save_then_edit_tracks_only_new_changes() {
    let screen = Screen::new(EditorConfig::default());
    let mut editor = screen.open(None);
    editor.set_field("name", "Gemini");
    let stored = editor.save().expect("create");
    assert!(!editor.is_new());
    assert_eq!(screen.ctx.recent().items()[0].id, stored.id.to_string());

    editor.set_field("status", "on_hold");
    assert_eq!(
        editor.tracker().dirty_fields().into_iter().collect::<Vec<_>>(),
        ["status"]
    );
}

#[test]
fn dropped_editor_leaves_no_listeners_or_blockers() {
    let screen = Screen::new(EditorConfig::default());
    {
        let mut editor = screen.open(Some(screen.id));
        editor.set_field("name", "unsaved");
        assert_eq!(screen.bus.len(), 1);
        assert_eq!(screen.router.blocker_count(), 1);
        assert_eq!(screen.router.unload_hook_count(), 1);
    }
    assert!(screen.bus.is_empty());
    assert_eq!(screen.router.blocker_count(), 0);
    assert_eq!(screen.router.unload_hook_count(), 0);
    assert_eq!(screen.router.navigate(LIST), NavigationOutcome::Navigated);
    assert!(!screen.bus.dispatch(&ctrl('s')).default_prevented);
}

#[test]
fn two_editors_on_one_bus_each_receive_chords() {
    let screen = Screen::new(EditorConfig::default());
    let mut first = screen.open(Some(screen.id));
    let second = screen.open(Some(screen.id));
    first.set_field("name", "first");

    let dispatch = screen.bus.dispatch(&ctrl('s'));
    assert_eq!(dispatch.handled_by.len(), 2);
    assert_eq!(first.pending_commands(), [EditorCommand::Save]);
    assert_eq!(second.pending_commands(), [EditorCommand::Save]);

    drop(second);
    assert_eq!(screen.bus.len(), 1);
    first.process_commands(LIST);
    assert!(!first.is_dirty());
}

#[test]
fn pinning_survives_reopen() {
    let screen = Screen::new(EditorConfig::default());
    let editor = screen.open(Some(screen.id));
    assert!(editor.toggle_pin());
    editor.close();

    let editor = screen.open(Some(screen.id));
    assert!(
        screen
            .ctx
            .pinned()
            .is_pinned("project", &screen.id.to_string())
    );
    assert!(!editor.toggle_pin());
}
