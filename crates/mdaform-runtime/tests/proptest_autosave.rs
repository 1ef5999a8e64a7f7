//! Property-based tests for autosave scheduling.
//!
//! 1. A fire never happens before the last edit plus the delay.
//! 2. Each burst of edits produces at most one fire.
//! 3. A burst followed by enough idle time always fires exactly once.
//! 4. Ineligible inputs never fire, whatever the timing.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use mdaform_runtime::{AutoSaveInputs, AutoSaveScheduler};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

/// One host tick: time moves forward by `gap_ms`, optionally after an edit.
#[derive(Debug, Clone, Copy)]
struct Step {
    gap_ms: u64,
    edit: bool,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    (0u64..4_000, any::<bool>()).prop_map(|(gap_ms, edit)| Step { gap_ms, edit })
}

fn dirty(revision: u64) -> AutoSaveInputs {
    AutoSaveInputs {
        dirty: true,
        revision,
        ..Default::default()
    }
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
    let fired = Rc::new(Cell::new(0));
    let f = Rc::clone(&fired);
    (fired, move || f.set(f.get() + 1))
}

// ── Properties ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn fires_only_after_idle_delay(
        delay_ms in 1u64..3_000,
        steps in prop::collection::vec(step_strategy(), 1..60),
    ) {
        let delay = Duration::from_millis(delay_ms);
        let mut scheduler = AutoSaveScheduler::new(delay);
        let t0 = Instant::now();
        let mut now = t0;
        let mut revision = 1u64;
        let mut last_edit = t0;
        let mut owed = true;
        let mut fires = 0u64;
        let (_, cb) = counter();
        scheduler.arm(dirty(revision), cb, now);

        for step in steps {
            now += Duration::from_millis(step.gap_ms);
            if step.edit {
                revision += 1;
                last_edit = now;
                owed = true;
            }
            let (_, cb) = counter();
            scheduler.arm(dirty(revision), cb, now);
            if scheduler.poll(now) {
                prop_assert!(now >= last_edit + delay, "fired {:?} early", last_edit + delay - now);
                prop_assert!(owed, "fired twice for one burst");
                owed = false;
                fires += 1;
            }
        }

        let far = now + delay;
        let (_, cb) = counter();
        scheduler.arm(dirty(revision), cb, far);
        if scheduler.poll(far) {
            fires += 1;
            prop_assert!(owed);
        } else {
            prop_assert!(!owed);
        }
        prop_assert!(!scheduler.is_pending());
        prop_assert_eq!(scheduler.fire_count(), fires);
    }

    #[test]
    fn latest_callback_is_the_one_fired(
        delay_ms in 1u64..1_000,
        rearms in 1usize..10,
    ) {
        let delay = Duration::from_millis(delay_ms);
        let mut scheduler = AutoSaveScheduler::new(delay);
        let t0 = Instant::now();
        let mut counters = Vec::new();
        for _ in 0..rearms {
            let (fired, cb) = counter();
            counters.push(fired);
            scheduler.arm(dirty(1), cb, t0);
        }
        prop_assert!(scheduler.poll(t0 + delay));
        let (last, earlier) = counters.split_last().expect("at least one arm");
        prop_assert_eq!(last.get(), 1);
        prop_assert!(earlier.iter().all(|c| c.get() == 0));
    }

    #[test]
    fn ineligible_inputs_never_fire(
        is_new in any::<bool>(),
        saving in any::<bool>(),
        deactivated in any::<bool>(),
        gaps in prop::collection::vec(0u64..10_000, 1..20),
    ) {
        prop_assume!(is_new || saving || deactivated);
        let mut scheduler = AutoSaveScheduler::new(Duration::from_millis(10));
        let inputs = AutoSaveInputs {
            dirty: true,
            is_new,
            saving,
            deactivated,
            revision: 1,
        };
        let (fired, cb) = counter();
        let mut now = Instant::now();
        scheduler.arm(inputs, cb, now);
        for gap in gaps {
            now += Duration::from_millis(gap);
            prop_assert!(!scheduler.poll(now));
        }
        prop_assert_eq!(fired.get(), 0);
        prop_assert_eq!(scheduler.fire_count(), 0);
    }
}
