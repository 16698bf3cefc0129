//! Integration tests for directory and file removal

mod common;

#[tokio::test]
async fn test_rm_dir_cascades() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["a/b", "keep"]).await.unwrap();
    common::upload_file(&store, &memory, "a/b/c.txt").await;
    common::upload_file(&store, &memory, "a/d.txt").await;

    let removed = store.remove_dirs(&["a"]).await.unwrap();
    assert_eq!(
        common::paths(&removed),
        vec!["a", "a/b", "a/b/c.txt", "a/d.txt"]
    );
    assert_eq!(memory.keys(), vec!["keep/"]);
}

#[tokio::test]
async fn test_rm_dir_leaves_prefix_siblings() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["photos", "photos2"]).await.unwrap();
    common::upload_file(&store, &memory, "photos2/x.png").await;

    store.remove_dirs(&["photos"]).await.unwrap();
    assert_eq!(memory.keys(), vec!["photos2/", "photos2/x.png"]);
}

#[tokio::test]
async fn test_rm_missing_dir_is_noop() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["a"]).await.unwrap();

    let removed = store.remove_dirs(&["ghost"]).await.unwrap();
    assert!(removed.is_empty());
    assert_eq!(memory.keys(), vec!["a/"]);
}

#[tokio::test]
async fn test_rm_overlapping_dirs() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["a/b"]).await.unwrap();
    common::upload_file(&store, &memory, "a/b/c.txt").await;

    let removed = store.remove_dirs(&["a", "a/b"]).await.unwrap();
    assert_eq!(common::paths(&removed), vec!["a", "a/b", "a/b/c.txt"]);
    assert!(memory.keys().is_empty());
}

#[tokio::test]
async fn test_rm_virtual_dir_removes_contents() {
    let (store, memory) = common::setup_test_env();
    common::put_raw(&memory, "implied/x.txt").await;

    let removed = store.remove_dirs(&["implied"]).await.unwrap();
    assert_eq!(common::paths(&removed), vec!["implied/x.txt"]);
    assert!(memory.keys().is_empty());
}

#[tokio::test]
async fn test_rm_files_skips_missing() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["docs"]).await.unwrap();
    common::upload_file(&store, &memory, "docs/a.txt").await;
    common::upload_file(&store, &memory, "docs/b.txt").await;

    let removed = store
        .remove_files(&["docs/a.txt", "docs/missing.txt"])
        .await
        .unwrap();
    assert_eq!(common::paths(&removed), vec!["docs/a.txt"]);
    assert_eq!(memory.keys(), vec!["docs/", "docs/b.txt"]);
}

#[tokio::test]
async fn test_rm_files_does_not_touch_dirs() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["docs"]).await.unwrap();

    let removed = store.remove_files(&["docs"]).await.unwrap();
    assert!(removed.is_empty());
    assert_eq!(memory.keys(), vec!["docs/"]);
}
