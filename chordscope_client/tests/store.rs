use chordscope_client::store::{
    FileStore, KeyValueStore, StoreError, ACCESS_TOKEN_KEY, EMAIL_KEY, NAME_KEY, REFRESH_TOKEN_KEY,
};

#[test]
fn missing_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path().join("nested/prefs.json")).unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert!(!store.path().exists(), "nothing is written until a mutation");
}

#[test]
fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chordscope/preferences.json");

    {
        let store = FileStore::open(&path).unwrap();
        store.set(ACCESS_TOKEN_KEY, "access-1").unwrap();
        store.set(REFRESH_TOKEN_KEY, "refresh-1").unwrap();
        store.set(NAME_KEY, "Ada").unwrap();
        store.set(EMAIL_KEY, "ada@example.com").unwrap();
        store.remove(NAME_KEY).unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("access-1"));
    assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("refresh-1"));
    assert_eq!(store.get(EMAIL_KEY).unwrap().as_deref(), Some("ada@example.com"));
    assert_eq!(store.get(NAME_KEY).unwrap(), None);

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["accessToken"], "access-1");
}

#[test]
fn clear_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");

    let store = FileStore::open(&path).unwrap();
    store.set(ACCESS_TOKEN_KEY, "a").unwrap();
    store.clear().unwrap();
    drop(store);

    let store = FileStore::open(&path).unwrap();
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
}

#[test]
fn blank_file_is_empty_and_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let blank = dir.path().join("blank.json");
    std::fs::write(&blank, "  \n").unwrap();
    assert_eq!(FileStore::open(&blank).unwrap().get(EMAIL_KEY).unwrap(), None);

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, "{ not json").unwrap();
    assert!(matches!(FileStore::open(&corrupt), Err(StoreError::Json(_))));
}

#[cfg(unix)]
#[test]
fn store_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    let store = FileStore::open(&path).unwrap();
    store.set(REFRESH_TOKEN_KEY, "secret").unwrap();

    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);

    // A stale temp file left by an interrupted write does not leak its mode.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, "{}").unwrap();
    std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o644)).unwrap();
    store.set(ACCESS_TOKEN_KEY, "token").unwrap();
    let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[test]
fn failed_write_leaves_memory_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let parent = dir.path().join("prefs");
    let path = parent.join("prefs.json");

    let store = FileStore::open(&path).unwrap();
    store.set(ACCESS_TOKEN_KEY, "a").unwrap();

    // Replace the parent directory with a plain file so every write fails.
    std::fs::remove_dir_all(&parent).unwrap();
    std::fs::write(&parent, "blocker").unwrap();

    assert!(store.set(ACCESS_TOKEN_KEY, "b").is_err());
    assert!(store.clear().is_err());
    assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a"));
}
