// Flat-file assistant store behavior

use atelier::store::{Assistant, AssistantStatus, AssistantStore, StoreError};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> AssistantStore {
    AssistantStore::for_user(dir.path(), "")
}

#[test]
fn save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let a = Assistant::new("Recipe Helper", "cooking ideas", "You are a chef.", "");
    let b = Assistant::new("Tutor", "math help", "You are a tutor.", "algebra notes");
    store.save(&[a.clone(), b.clone()]).unwrap();

    let loaded = store.load();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, a.id);
    assert_eq!(loaded[1].name, "Tutor");
    assert_eq!(loaded[1].knowledge_base, "algebra notes");
}

#[test]
fn missing_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    assert!(store_in(&dir).load().is_empty());
}

#[test]
fn corrupt_file_loads_empty() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.path(), "{not valid json").unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn per_user_stores_are_separate_files() {
    let dir = TempDir::new().unwrap();
    let alice = AssistantStore::for_user(dir.path(), "Alice");
    let bob = AssistantStore::for_user(dir.path(), "Bob");

    alice
        .save(&[Assistant::new("A", "", "sp", "")])
        .unwrap();

    assert_eq!(alice.load().len(), 1);
    assert!(bob.load().is_empty());
    assert!(alice.path().ends_with("alice_assistants.json"));
}

#[test]
fn remove_deletes_only_the_matching_record() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let a = Assistant::new("A", "", "sp", "");
    let b = Assistant::new("B", "", "sp", "");
    store.save(&[a.clone(), b]).unwrap();

    assert!(store.remove(a.id).unwrap());
    let remaining = store.load();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "B");

    // Removing again is a no-op.
    assert!(!store.remove(a.id).unwrap());
}

#[test]
fn import_fills_missing_fields() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let json = r#"{
        "name": "Imported",
        "description": "from a file",
        "system_prompt": "You are imported."
    }"#;

    let assistant = store.import(json).unwrap();
    assert_eq!(assistant.name, "Imported");
    assert_eq!(assistant.status, AssistantStatus::Active);

    let loaded = store.load();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, assistant.id);
}

#[test]
fn import_rejects_records_missing_required_fields() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let json = r#"{"name": "No prompt", "description": "d"}"#;
    match store.import(json) {
        Err(StoreError::MissingField(field)) => assert_eq!(field, "system_prompt"),
        other => panic!("expected MissingField error, got {other:?}"),
    }
    assert!(store.load().is_empty());
}

#[test]
fn export_import_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let original = Assistant::new("Helper", "desc", "You help.", "some facts");
    let json = AssistantStore::export(&original).unwrap();

    let imported = store.import(&json).unwrap();
    assert_eq!(imported.id, original.id);
    assert_eq!(imported.knowledge_base, "some facts");
    assert_eq!(imported.created_at, original.created_at);
}

#[test]
fn draft_status_survives_the_roundtrip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let mut a = Assistant::new("Draft one", "", "sp", "");
    a.status = AssistantStatus::Draft;
    store.save(&[a]).unwrap();

    assert_eq!(store.load()[0].status, AssistantStatus::Draft);
}
