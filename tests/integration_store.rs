use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;
use term_desk::apps::chat::{HISTORY_KEY, HistoryEntry, USERNAME_KEY};
use term_desk::apps::quiz::{HIGH_SCORES_KEY, HighScore, record_high_score};
use term_desk::apps::{AppFactory, AppKind};
use term_desk::config::StoreLocation;
use term_desk::runner::open_store;
use term_desk::store::KvStore;
use term_desk::window::{SpawnCascade, WindowRegistry};

fn type_keys(registry: &mut WindowRegistry, text: &str) {
    for c in text.chars() {
        registry.key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
    }
    registry.key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
}

#[test]
fn chat_username_and_history_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("store.json");
    {
        let store = open_store(&StoreLocation::File(path.clone())).unwrap();
        let mut registry =
            WindowRegistry::new(AppFactory::with_builtins(store), SpawnCascade::default());
        registry.open(AppKind::CHAT).unwrap();
        type_keys(&mut registry, "alice");
        type_keys(&mut registry, "hello there");
        // The loopback echo of our own line must not be stored twice.
        registry.tick(Instant::now());
    }

    let reopened = KvStore::open(&path).unwrap();
    assert_eq!(reopened.get::<String>(USERNAME_KEY).as_deref(), Some("alice"));
    assert_eq!(
        reopened.get::<Vec<HistoryEntry>>(HISTORY_KEY).unwrap(),
        vec![HistoryEntry {
            username: "alice".into(),
            message: "hello there".into(),
        }]
    );
}

#[test]
fn high_score_table_round_trips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let store = KvStore::open(&path).unwrap();
    let mut scores = Vec::new();
    for (name, time) in [("a", 9000), ("b", 4000), ("c", 7000), ("d", 12000), ("e", 3000), ("f", 5000)] {
        scores = record_high_score(
            scores,
            HighScore {
                username: name.into(),
                time,
            },
        );
    }
    store.set(HIGH_SCORES_KEY, &scores).unwrap();

    let loaded: Vec<HighScore> = KvStore::open(&path).unwrap().get(HIGH_SCORES_KEY).unwrap();
    let names: Vec<_> = loaded.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(names, ["e", "b", "f", "c", "a"]);
}

#[test]
fn memory_location_never_touches_disk() {
    let store = open_store(&StoreLocation::Memory).unwrap();
    assert!(store.path().is_none());
    store.set("k", &1).unwrap();
    assert_eq!(store.get::<i32>("k"), Some(1));
}
