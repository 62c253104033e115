//! Record Store and Durable Flush Tests
//!
//! Tests for:
//! - create/list/get/update/delete semantics
//! - debounced flush coalescing (deterministic and real-time)
//! - flush failures never failing the mutation
//! - on-disk snapshot shape and reload

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use ecrf::records::{RecordData, RecordStore};
use ecrf::schema::SchemaRegistry;
use ecrf::storage::{
    DebouncedScheduler, FileBackend, ManualScheduler, MemoryBackend, SnapshotBackend, StateStore, StorageError,
};
use ecrf::study::{BindFormRequest, StudyBinder};
use ecrf::{EcrfConfig, EcrfError, EcrfService, ResourceKind};
use serde_json::{json, Value};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn data(value: Value) -> RecordData {
    value.as_object().cloned().expect("fixture must be an object")
}

fn memory_store() -> (RecordStore, Arc<MemoryBackend>, Arc<ManualScheduler>) {
    let backend = Arc::new(MemoryBackend::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let state = StateStore::open(backend.clone(), scheduler.clone()).expect("open state");
    (RecordStore::new(state), backend, scheduler)
}

// =============================================================================
// Record operations
// =============================================================================

#[test]
fn test_create_then_list_returns_exactly_that_record() {
    let (store, _, _) = memory_store();
    let created = store.create("f1", data(json!({"TERM": "Headache", "SEVERITY": "2"})));

    let listed = store.list("f1");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].data, data(json!({"TERM": "Headache", "SEVERITY": "2"})));
}

#[test]
fn test_update_preserves_id_and_created_at() {
    let (store, _, _) = memory_store();
    let created = store.create("f1", data(json!({"A": "old"})));

    let updated = store.update("f1", &created.id, data(json!({"A": "new"}))).unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.data["A"], "new");
    assert!(updated.updated_at.is_some());
    assert!(updated.updated_at.unwrap() >= created.created_at);
}

#[test]
fn test_delete_unknown_id_leaves_bucket_alone() {
    let (store, _, _) = memory_store();
    let kept = store.create("f1", data(json!({"A": 1})));

    assert!(!store.delete("f1", "does-not-exist"));
    assert_eq!(store.list("f1"), vec![kept]);
}

#[test]
fn test_get_unknown_record_is_not_found() {
    let (store, _, _) = memory_store();
    let err = store.get("f1", "r1").unwrap_err();
    assert!(matches!(err, EcrfError::NotFound { kind: ResourceKind::Record, .. }));
}

#[test]
fn test_buckets_are_isolated() {
    let (store, _, _) = memory_store();
    let a = store.create("f1", data(json!({"A": 1})));
    store.create("f2", data(json!({"A": 2})));

    assert_eq!(store.list("f1").len(), 1);
    assert!(store.get("f2", &a.id).is_err());
}

// =============================================================================
// Debounced flush
// =============================================================================

#[test]
fn test_n_mutations_produce_one_write_of_final_state() {
    let (store, backend, scheduler) = memory_store();

    let first = store.create("f1", data(json!({"N": 1})));
    let second = store.create("f1", data(json!({"N": 2})));
    store.update("f1", &first.id, data(json!({"N": 10}))).unwrap();
    store.delete("f1", &second.id);
    store.create("f1", data(json!({"N": 3})));

    assert_eq!(backend.write_count(), 0, "no write before the window elapses");
    assert!(scheduler.fire());
    assert_eq!(backend.write_count(), 1);

    let persisted = backend.stored().unwrap();
    let values: Vec<_> = persisted.bucket("f1").iter().map(|r| r.data["N"].clone()).collect();
    assert_eq!(values, vec![json!(10), json!(3)]);
}

#[test]
fn test_failed_flush_does_not_fail_mutation() {
    let (store, backend, scheduler) = memory_store();
    backend.set_fail_writes(true);

    let record = store.create("f1", data(json!({"A": 1})));
    scheduler.fire();

    assert_eq!(backend.write_count(), 0);
    assert_eq!(store.get("f1", &record.id).unwrap(), record);

    backend.set_fail_writes(false);
    store.create("f1", data(json!({"A": 2})));
    scheduler.fire();
    assert_eq!(backend.stored().unwrap().bucket("f1").len(), 2);
}

#[tokio::test]
async fn test_real_debouncer_coalesces_burst() {
    let backend = Arc::new(MemoryBackend::new());
    let scheduler = Arc::new(DebouncedScheduler::from_current(Duration::from_millis(40)).unwrap());
    let state = StateStore::open(backend.clone(), scheduler).unwrap();
    let store = RecordStore::new(state);

    for i in 0..10 {
        store.create("f1", data(json!({"N": i})));
    }
    assert_eq!(backend.write_count(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(backend.write_count(), 1);
    assert_eq!(backend.stored().unwrap().bucket("f1").len(), 10);
}

// =============================================================================
// File backend
// =============================================================================

#[test]
fn test_snapshot_file_shape_and_reload() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ecrf-data.json");
    let scheduler = Arc::new(ManualScheduler::new());
    let state = StateStore::open(Arc::new(FileBackend::new(&path)), scheduler.clone()).unwrap();

    let binder = StudyBinder::new(Arc::new(SchemaRegistry::with_builtin()), state.clone());
    let form = binder.bind_form("S1", BindFormRequest::new("AE-1.0.0")).unwrap();
    let store = RecordStore::new(state);
    let record = store.create(&form.id, data(json!({"TERM": "Cough", "START": "2024-01-01"})));
    scheduler.fire();

    let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["studies"]["S1"]["forms"][0]["templateFormId"], "AE-1.0.0");
    assert_eq!(doc["records"][form.id.as_str()][0]["id"], record.id.as_str());
    assert!(doc["records"][form.id.as_str()][0].get("updatedAt").is_none());

    let reloaded = FileBackend::new(&path).load().unwrap().unwrap();
    assert_eq!(reloaded.bucket(&form.id)[0], record);
}

#[test]
fn test_corrupt_snapshot_fails_startup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ecrf-data.json");
    fs::write(&path, "{\"studies\": [").unwrap();

    let result = StateStore::open(Arc::new(FileBackend::new(&path)), Arc::new(ManualScheduler::new()));
    assert!(matches!(result, Err(StorageError::Corrupt { .. })));
}

#[test]
fn test_service_reopen_sees_flushed_state() {
    let tmp = TempDir::new().unwrap();
    let config = EcrfConfig {
        data_file: tmp.path().join("data").join("ecrf-data.json"),
        ..Default::default()
    };

    let form_id = {
        let svc = EcrfService::open_with_scheduler(&config, Arc::new(ManualScheduler::new())).unwrap();
        let form = svc.bind_form("S1", BindFormRequest::new("VS-1.0.0")).unwrap();
        svc.submit_record("S1", &form.id, data(json!({"HEIGHT": 170}))).unwrap();
        svc.flush_now().unwrap();
        form.id
    };

    let svc = EcrfService::open_with_scheduler(&config, Arc::new(ManualScheduler::new())).unwrap();
    assert_eq!(svc.list_records("S1", &form_id).unwrap().len(), 1);
    assert_eq!(svc.get_definition("S1").unwrap().visits, config.default_study_visits);
}
