mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use common::{PRODUCT, PUBLISHER, guard, issue, request};
use ianus_guard::{FileLicenseSource, GuardError, LicenseSource, LicenseStore, MemoryLicenseSource};
use ianus_license::{LicenseError, UNEXPECTED_FAILURE_REASON};
use tempfile::TempDir;

fn identifier() -> String {
    format!("{PUBLISHER}_{PRODUCT}")
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn register_labels_record_from_token() {
    let source = MemoryLicenseSource::new();
    let record = source.register(&issue("S1", Some(30))).unwrap();

    assert_eq!(record.identifier, identifier());
    assert_eq!(record.name, "Ianua Software - Demo");
    assert!(record.expires_at.is_some());
    assert!(record.active);
}

#[test]
fn register_supersedes_previous_license() {
    let source = MemoryLicenseSource::new();
    let first = source.register(&issue("S1", Some(30))).unwrap();
    let second = source.register(&issue("S2", Some(30))).unwrap();

    let active = source.find(&identifier()).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, second.id);

    let all = source.records().unwrap();
    assert_eq!(all.len(), 2);
    assert!(!all.iter().find(|r| r.id == first.id).unwrap().active);

    let outcome = guard(request()).check(&source);
    assert_eq!(outcome.result.claims().unwrap().subject, "S2");
}

#[test]
fn register_rejects_empty_key() {
    let source = MemoryLicenseSource::new();
    assert!(matches!(
        source.register("  "),
        Err(GuardError::InvalidLicense(LicenseError::EmptyToken))
    ));
}

#[test]
fn register_rejects_malformed_key() {
    let source = MemoryLicenseSource::new();
    assert!(matches!(
        source.register("one.two"),
        Err(GuardError::InvalidLicense(LicenseError::MalformedToken))
    ));
    assert!(source.records().unwrap().is_empty());
}

#[test]
fn deactivate_hides_record() {
    let source = MemoryLicenseSource::new();
    let record = source.register(&issue("S1", Some(30))).unwrap();

    assert!(source.deactivate(record.id).unwrap());
    assert!(source.find(&identifier()).unwrap().is_empty());
    assert!(!source.deactivate(uuid::Uuid::new_v4()).unwrap());
}

#[test]
fn find_normalizes_identifier() {
    let source = MemoryLicenseSource::new();
    source.register(&issue("S1", Some(30))).unwrap();
    let braced = format!("{{{}}}_{}", PUBLISHER.to_uppercase(), PRODUCT);
    assert_eq!(source.find(&braced).unwrap().len(), 1);
}

// ── File store ───────────────────────────────────────────────────

#[test]
fn file_store_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = FileLicenseSource::new(dir.path().join("licenses.json"));
    assert!(store.records().unwrap().is_empty());
    assert!(store.find(&identifier()).unwrap().is_empty());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("licenses.json");

    let record = FileLicenseSource::new(&path)
        .register(&issue("S1", Some(30)))
        .unwrap();

    let reopened = FileLicenseSource::new(&path);
    let found = reopened.find(&identifier()).unwrap();
    assert_eq!(found, vec![record]);

    let outcome = guard(request()).check(&reopened);
    assert!(outcome.is_valid(), "{:?}", outcome.result);
}

#[test]
fn file_store_supersedes_and_deactivates() {
    let dir = TempDir::new().unwrap();
    let store = FileLicenseSource::new(dir.path().join("licenses.json"));

    let first = store.register(&issue("S1", Some(30))).unwrap();
    let second = store.register(&issue("S2", None)).unwrap();
    assert_eq!(store.find(&identifier()).unwrap()[0].id, second.id);
    assert_eq!(store.records().unwrap().len(), 2);

    assert!(store.deactivate(second.id).unwrap());
    assert!(store.find(&identifier()).unwrap().is_empty());
    assert!(!store.records().unwrap().iter().any(|r| r.id == first.id && r.active));
}

#[test]
fn file_store_readers_never_see_partial_writes() {
    let dir = TempDir::new().unwrap();
    let store = FileLicenseSource::new(dir.path().join("licenses.json"));
    store.register(&issue("S0", Some(30))).unwrap();

    let tokens: Vec<String> = (1..=50).map(|i| issue(&format!("S{i}"), Some(30))).collect();
    let guard = guard(request());
    let writing = AtomicBool::new(true);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for token in &tokens {
                store.register(token).unwrap();
            }
            writing.store(false, Ordering::SeqCst);
        });

        let mut checks = 0;
        while writing.load(Ordering::SeqCst) || checks == 0 {
            let outcome = guard.check(&store);
            assert!(outcome.is_valid(), "check {checks}: {:?}", outcome.result);
            checks += 1;
        }
    });

    assert_eq!(store.find(&identifier()).unwrap().len(), 1);
    assert_eq!(store.records().unwrap().len(), 51);
}

#[test]
fn file_store_rejects_corrupt_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("licenses.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = FileLicenseSource::new(&path);
    assert!(matches!(
        store.find(&identifier()),
        Err(GuardError::Serialization(_))
    ));

    let outcome = guard(request()).check(&store);
    assert!(outcome.result.is_terminal());
    assert_eq!(outcome.result.reason(), Some(UNEXPECTED_FAILURE_REASON));
}

#[test]
fn default_path_is_under_data_dir() {
    if let Ok(path) = FileLicenseSource::default_path() {
        assert!(path.ends_with("ianus/licenses.json"));
    }
}
