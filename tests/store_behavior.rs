// File: tests/store_behavior.rs
// Behavior tests for the habit store: write-through persistence,
// validation, idempotent mutation and focus reloads.
use habitude::context::TestContext;
use habitude::model::Habit;
use habitude::storage::{HABITS_KEY, LocalStorage};
use habitude::store::{HabitStore, StoreError};

#[test]
fn test_every_mutation_is_written_through() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);

    let a = store.add(&ctx, "Drink water").unwrap();
    let b = store.add(&ctx, "Stretch").unwrap();
    store.add(&ctx, "Read").unwrap();

    store.toggle(&ctx, &a.id).unwrap();
    store.delete(&ctx, &b.id).unwrap();

    // Whatever is in memory must also be on disk.
    let persisted = LocalStorage::load_habits(&ctx);
    assert_eq!(persisted, store.habits().to_vec());
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().any(|h| h.id == a.id && h.completed));
}

#[test]
fn test_fresh_storage_loads_as_empty_list() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    assert!(store.habits().is_empty());
    assert!(!store.is_loading());
}

#[test]
fn test_rejected_add_performs_no_write() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);

    assert_eq!(store.add(&ctx, "\t \n"), Err(StoreError::EmptyName));

    let path = LocalStorage::get_path_for_key(&ctx, HABITS_KEY).unwrap();
    assert!(
        !path.exists(),
        "a rejected add must not touch the habit slot"
    );
}

#[test]
fn test_unknown_id_mutations_leave_storage_untouched() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    store.add(&ctx, "Walk").unwrap();
    let before = LocalStorage::load_habits(&ctx);

    assert_eq!(store.toggle(&ctx, "missing").unwrap(), None);
    assert!(!store.delete(&ctx, "missing").unwrap());

    assert_eq!(LocalStorage::load_habits(&ctx), before);
}

#[test]
fn test_toggle_twice_restores_original_state() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);

    let habit = store.add(&ctx, "Meditate").unwrap();
    store.toggle(&ctx, &habit.id).unwrap();
    store.toggle(&ctx, &habit.id).unwrap();

    let persisted = LocalStorage::load_habits(&ctx);
    assert_eq!(persisted.len(), 1);
    assert!(!persisted[0].completed, "double toggle must round-trip");
}

#[test]
fn test_external_reset_is_invisible_until_next_focus() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    store.add(&ctx, "Journal").unwrap();
    store.add(&ctx, "Run").unwrap();

    // Another surface wipes the slot behind the store's back.
    LocalStorage::save_habits(&ctx, &[]).unwrap();

    // No push channel exists, so memory still shows the old list.
    assert_eq!(store.habits().len(), 2);

    // The next focus reload picks the wipe up.
    store.initialize(&ctx);
    assert!(store.habits().is_empty());
}

#[test]
fn test_reload_survives_a_corrupt_slot() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    store.add(&ctx, "Sleep early").unwrap();

    let path = LocalStorage::get_path_for_key(&ctx, HABITS_KEY).unwrap();
    std::fs::write(&path, "][ not json").unwrap();

    store.initialize(&ctx);
    assert!(
        store.habits().is_empty(),
        "corruption must degrade to an empty list, not an error"
    );

    // The store keeps working and the next write repairs the slot.
    store.add(&ctx, "Recovered").unwrap();
    assert_eq!(LocalStorage::load_habits(&ctx).len(), 1);
}

#[test]
fn test_stored_shape_is_a_plain_json_array() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    store.add(&ctx, "Hydrate").unwrap();

    let path = LocalStorage::get_path_for_key(&ctx, HABITS_KEY).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    let array = value.as_array().expect("slot must hold a JSON array");
    assert_eq!(array.len(), 1);
    let entry = &array[0];
    assert!(entry.get("id").is_some());
    assert_eq!(entry.get("name").and_then(|v| v.as_str()), Some("Hydrate"));
    assert_eq!(
        entry.get("completed").and_then(|v| v.as_bool()),
        Some(false)
    );
    assert!(entry.get("createdAt").is_some());
}

#[test]
fn test_habits_preserve_insertion_order_across_reloads() {
    let ctx = TestContext::new();
    let mut store = HabitStore::new();
    store.initialize(&ctx);
    for name in ["first", "second", "third"] {
        store.add(&ctx, name).unwrap();
    }

    let mut reloaded = HabitStore::new();
    reloaded.initialize(&ctx);
    let names: Vec<&str> = reloaded.habits().iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn test_two_stores_last_writer_wins() {
    let ctx = TestContext::new();
    let mut one = HabitStore::new();
    let mut two = HabitStore::new();
    one.initialize(&ctx);
    two.initialize(&ctx);

    one.add(&ctx, "From one").unwrap();
    two.add(&ctx, "From two").unwrap();

    // The second writer replaced the slot wholesale.
    let persisted = LocalStorage::load_habits(&ctx);
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].name, "From two");
}

#[test]
fn test_roundtrip_preserves_timestamps() {
    let ctx = TestContext::new();
    let mut habits = vec![Habit::new("Timed")];
    habits[0].completed = true;
    LocalStorage::save_habits(&ctx, &habits).unwrap();

    let loaded = LocalStorage::load_habits(&ctx);
    assert_eq!(loaded, habits);
    assert_eq!(loaded[0].created_at, habits[0].created_at);
}
