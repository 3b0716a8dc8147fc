use std::collections::BTreeSet;

use proptest::prelude::*;
use term_desk::apps::{AppFactory, AppKind};
use term_desk::store::KvStore;
use term_desk::window::{Position, SpawnCascade, WindowId, WindowRegistry};

const KINDS: [AppKind; 4] = [AppKind::QUIZ, AppKind::MEMORY, AppKind::CHAT, AppKind::TIMER];

fn registry(origin: (i32, i32), step: i32) -> WindowRegistry {
    WindowRegistry::new(
        AppFactory::with_builtins(KvStore::in_memory()),
        SpawnCascade::new(Position::new(origin.0, origin.1), step),
    )
}

proptest! {
    #[test]
    fn opens_yield_distinct_ids_and_stepped_positions(
        picks in prop::collection::vec(0usize..KINDS.len(), 1..12),
        origin in (-50i32..50, -50i32..50),
        step in 1i32..8,
    ) {
        let mut registry = registry(origin, step);
        let mut seen = BTreeSet::new();
        let mut previous: Option<Position> = None;
        for pick in picks {
            let id = registry.open(KINDS[pick].clone()).unwrap();
            prop_assert!(seen.insert(id));
            let pos = registry.get(id).unwrap().position();
            if let Some(prev) = previous {
                prop_assert_eq!(pos, prev.offset(step, step));
            } else {
                prop_assert_eq!(pos, Position::new(origin.0, origin.1));
            }
            previous = Some(pos);
        }
    }

    #[test]
    fn last_focused_window_has_highest_z(
        count in 1usize..8,
        focuses in prop::collection::vec(0usize..8, 0..24),
    ) {
        let mut registry = registry((0, 0), 2);
        let ids: Vec<WindowId> = (0..count)
            .map(|i| registry.open(KINDS[i % KINDS.len()].clone()).unwrap())
            .collect();
        let mut last = *ids.last().unwrap();
        for pick in focuses {
            last = ids[pick % count];
            registry.focus(last);
        }
        let top = registry.get(last).unwrap().z_index();
        for record in registry.records().filter(|record| record.id() != last) {
            prop_assert!(record.z_index() < top);
        }
        prop_assert_eq!(registry.focused(), Some(last));
    }

    #[test]
    fn double_close_matches_single_close(
        count in 1usize..6,
        victim in 0usize..6,
    ) {
        let mut once = registry((0, 0), 3);
        let mut twice = registry((0, 0), 3);
        let mut target = None;
        for i in 0..count {
            let a = once.open(KINDS[i % KINDS.len()].clone()).unwrap();
            let b = twice.open(KINDS[i % KINDS.len()].clone()).unwrap();
            prop_assert_eq!(a, b);
            if i == victim % count {
                target = Some(a);
            }
        }
        let target = target.unwrap();
        once.close(target);
        twice.close(target);
        twice.close(target);
        prop_assert_eq!(once.list(), twice.list());
        prop_assert!(twice.list().iter().all(|snap| snap.id != target));
    }
}
