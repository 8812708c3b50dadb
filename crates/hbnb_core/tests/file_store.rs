use hbnb_core::{ClassKind, Entity, FileStore, StoreError, CLASS_KEY};
use serde_json::json;
use std::fs;

#[test]
fn missing_and_blank_files_load_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");

    let store = FileStore::open(&path).unwrap();
    assert!(store.is_empty());
    assert!(!path.exists(), "load must not create the backing file");

    fs::write(&path, "  \n").unwrap();
    let store = FileStore::open(&path).unwrap();
    assert!(store.is_empty());
}

#[test]
fn save_then_reload_round_trips_attributes_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");

    let mut store = FileStore::open(&path).unwrap();
    let mut user = Entity::new(ClassKind::User);
    user.set_attribute("first_name", json!("Betty"));
    user.set_attribute("age", json!(30));
    user.set_attribute("rating", json!(4.5));
    user.set_attribute("tags", json!(["a", 1]));
    store.save(&mut user).unwrap();

    let reloaded = FileStore::open(&path).unwrap();
    let record = reloaded.get(ClassKind::User, user.id()).unwrap();
    assert_eq!(record, &user.to_record());
    assert_eq!(record[CLASS_KEY], json!("User"));

    let rebuilt = Entity::from_record(ClassKind::User, record).unwrap();
    assert_eq!(rebuilt, user);
    assert_eq!(rebuilt.updated_at(), user.updated_at());
}

#[test]
fn save_refreshes_updated_at_but_not_created_at() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("file.json")).unwrap();

    let mut place = Entity::new(ClassKind::Place);
    let created_at = place.created_at();
    store.save(&mut place).unwrap();
    let first_save = place.updated_at();
    std::thread::sleep(std::time::Duration::from_millis(2));
    store.save(&mut place).unwrap();

    assert_eq!(place.created_at(), created_at);
    assert!(place.updated_at() > first_save);
}

#[test]
fn iteration_keeps_insertion_order_and_filters_by_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");
    let mut store = FileStore::open(&path).unwrap();

    let mut ids = Vec::new();
    for kind in [ClassKind::City, ClassKind::User, ClassKind::City, ClassKind::Review] {
        let mut entity = Entity::new(kind);
        store.save(&mut entity).unwrap();
        ids.push((kind, entity.id().to_string()));
    }

    let reloaded = FileStore::open(&path).unwrap();
    let seen: Vec<(ClassKind, String)> = reloaded
        .all(None)
        .map(|(kind, record)| (kind, record["id"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(seen, ids);

    let cities: Vec<ClassKind> = reloaded.all(Some(ClassKind::City)).map(|(kind, _)| kind).collect();
    assert_eq!(cities, [ClassKind::City, ClassKind::City]);
    assert_eq!(reloaded.count(ClassKind::City), 2);
    assert_eq!(reloaded.count(ClassKind::Amenity), 0);
}

#[test]
fn delete_is_a_noop_for_absent_keys_and_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("file.json")).unwrap();

    let mut first = Entity::new(ClassKind::State);
    let mut second = Entity::new(ClassKind::State);
    let mut third = Entity::new(ClassKind::State);
    for entity in [&mut first, &mut second, &mut third] {
        store.save(entity).unwrap();
    }

    assert!(!store.delete(ClassKind::State, "no-such-id"));
    assert!(store.delete(ClassKind::State, second.id()));
    assert!(!store.contains(ClassKind::State, second.id()));

    let remaining: Vec<&str> = store
        .all(None)
        .map(|(_, record)| record["id"].as_str().unwrap())
        .collect();
    assert_eq!(remaining, [first.id(), third.id()]);
}

#[test]
fn put_forces_class_field_and_upserts() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("file.json")).unwrap();

    let record = json!({ "id": "1", "name": "wifi" }).as_object().unwrap().clone();
    store.put(ClassKind::Amenity, "1", record.clone());
    let mut replacement = record;
    replacement.insert("name".to_string(), json!("pool"));
    store.put(ClassKind::Amenity, "1", replacement);

    assert_eq!(store.len(), 1);
    let stored = store.get(ClassKind::Amenity, "1").unwrap();
    assert_eq!(stored["name"], json!("pool"));
    assert_eq!(stored[CLASS_KEY], json!("Amenity"));
}

#[test]
fn flush_replaces_file_without_leaving_temp_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("file.json");
    let mut store = FileStore::open(&path).unwrap();

    let mut city = Entity::new(ClassKind::City);
    store.save(&mut city).unwrap();
    store.delete(ClassKind::City, city.id());
    store.flush().unwrap();

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(document, json!({}));

    let leftovers: Vec<String> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(leftovers, ["file.json"]);
}

#[test]
fn corrupt_documents_are_fatal_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");

    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(FileStore::open(&path), Err(StoreError::Json(_))));

    fs::write(&path, r#"{"User.1": {"id": "1"}}"#).unwrap();
    assert!(matches!(
        FileStore::open(&path),
        Err(StoreError::InvalidData(_))
    ));
}

#[test]
fn unwritable_target_propagates_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // A directory sitting where the backing file should be makes rename fail.
    let path = dir.path().join("file.json");
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), "x").unwrap();

    let mut store = FileStore::new(&path);
    let mut user = Entity::new(ClassKind::User);
    let err = store.save(&mut user).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert!(!dir.path().join("file.json.tmp").exists());
}

#[test]
fn record_under_foreign_key_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");
    let mut user = Entity::new(ClassKind::User);
    let mut record = user.to_record();
    record.insert("id".to_string(), json!("2"));
    let document = json!({ "User.1": record });
    fs::write(&path, document.to_string()).unwrap();

    let err = FileStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));

    // The well-formed version of the same record loads fine.
    user.set_attribute("name", json!("x"));
    let key = format!("User.{}", user.id());
    fs::write(&path, json!({ key: user.to_record() }).to_string()).unwrap();
    assert_eq!(FileStore::open(&path).unwrap().count(ClassKind::User), 1);
}

#[test]
fn unparsable_timestamps_fail_at_load_not_later() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file.json");
    fs::write(
        &path,
        r#"{"User.1": {"id": "1", "__class__": "User", "created_at": 5}}"#,
    )
    .unwrap();

    let err = FileStore::open(&path).unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
    assert!(err.to_string().contains("created_at"));
}
