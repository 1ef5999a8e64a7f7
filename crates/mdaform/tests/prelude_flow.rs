#![forbid(unsafe_code)]

//! A host screen written against the prelude only.

use mdaform::prelude::*;
use mdaform::{NotificationKind, Task, TaskStatus};

fn open_task(
    service: &MemoryService<Task>,
    router: &MemoryRouter,
    bus: &KeyEventBus,
    ctx: &AppContext,
    id: Option<RecordId>,
) -> Result<RecordEditor<Task, MemoryService<Task>>> {
    Ok(RecordEditor::open(
        service.clone(),
        router.clone(),
        bus,
        ctx,
        id,
    )?)
}

#[test]
fn create_edit_and_close_a_task() -> Result<()> {
    let service = MemoryService::<Task>::new();
    let router = MemoryRouter::new("/tasks/new");
    let bus = KeyEventBus::new();
    let ctx = AppContext::in_memory(EditorConfig::from_lookup(|_| None)?);

    let mut editor = open_task(&service, &router, &bus, &ctx, None)?;
    editor.set_field("title", "Write release notes");
    editor.set_field("due_date", Scalar::Date("2026-11-02".into()));
    let task = editor.save()?;
    assert_eq!(task.status, TaskStatus::NotStarted);
    assert_eq!(
        task.due_date.map(|d| d.to_string()).as_deref(),
        Some("2026-11-02")
    );

    editor.set_field("status", "in_progress");
    assert!(matches!(
        router.navigate("/tasks"),
        NavigationOutcome::Blocked(_)
    ));
    editor.cancel_leave();

    let shift_s = KeyEvent::new(KeyCode::Char('s')).with_modifiers(Modifiers::CTRL | Modifiers::SHIFT);
    assert!(bus.dispatch(&shift_s).default_prevented);
    editor.process_commands("/tasks");
    assert_eq!(router.location(), "/tasks");
    assert_eq!(service.get(task.id)?.status, TaskStatus::InProgress);

    let center = ctx.notifications().expect("in-memory context owns a center");
    assert!(
        center
            .all()
            .iter()
            .all(|n| n.kind == NotificationKind::Success)
    );
    Ok(())
}

#[test]
fn missing_record_surfaces_as_data_error() {
    let service = MemoryService::<Task>::new();
    let ctx = AppContext::default();
    let err = open_task(
        &service,
        &MemoryRouter::default(),
        &KeyEventBus::new(),
        &ctx,
        Some(RecordId::new()),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Data(_)));
    assert!(err.to_string().contains("not found"));
}
