//! Integration tests for in-place renames

mod common;

use ::common::nodes::{NodeStoreError, PathError};

#[tokio::test]
async fn test_rename_file() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["docs"]).await.unwrap();
    let file = common::upload_file(&store, &memory, "docs/a.txt").await;

    let renamed = store.rename_file("docs/a.txt", "b.txt").await.unwrap();
    assert_eq!(renamed.path, "docs/b.txt");
    assert_eq!(renamed.name, "b.txt");
    assert_eq!(renamed.id, file.id);
    assert_eq!(memory.keys(), vec!["docs/", "docs/b.txt"]);
}

#[tokio::test]
async fn test_rename_dir_moves_children() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["docs/2024"]).await.unwrap();
    common::upload_file(&store, &memory, "docs/2024/a.txt").await;

    let renamed = store.rename_dir("docs", "papers").await.unwrap();
    assert_eq!(
        common::paths(&renamed),
        vec!["papers", "papers/2024", "papers/2024/a.txt"]
    );
    assert_eq!(
        memory.keys(),
        vec!["papers/", "papers/2024/", "papers/2024/a.txt"]
    );
}

#[tokio::test]
async fn test_rename_onto_sibling_fails() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["a", "taken"]).await.unwrap();
    common::upload_file(&store, &memory, "note.txt").await;

    let result = store.rename_dir("a", "taken").await;
    assert!(matches!(result, Err(NodeStoreError::PathAlreadyExists(p)) if p == "taken"));

    // a file and a directory cannot share a name either
    let result = store.rename_dir("a", "note.txt").await;
    assert!(matches!(result, Err(NodeStoreError::PathAlreadyExists(_))));
    let result = store.rename_file("note.txt", "a").await;
    assert!(matches!(result, Err(NodeStoreError::PathAlreadyExists(_))));
}

#[tokio::test]
async fn test_rename_onto_implied_sibling_fails() {
    let (store, memory) = common::setup_test_env();
    store.create_dirs(&["src"]).await.unwrap();
    common::upload_file(&store, &memory, "src/keep.txt").await;
    common::put_raw(&memory, "taken/keep.txt").await;

    let result = store.rename_dir("src", "taken").await;
    assert!(matches!(result, Err(NodeStoreError::PathAlreadyExists(p)) if p == "taken"));
    assert_eq!(
        memory.keys(),
        vec!["src/", "src/keep.txt", "taken/keep.txt"]
    );

    // a file cannot take the name of a directory implied by deeper keys
    common::put_raw(&memory, "src/sub/deep.txt").await;
    let result = store.rename_file("src/keep.txt", "sub").await;
    assert!(matches!(result, Err(NodeStoreError::PathAlreadyExists(p)) if p == "src/sub"));
}

#[tokio::test]
async fn test_rename_rejects_bad_names() {
    let (store, counting) = common::setup_counting_env();

    let result = store.rename_file("a.txt", "x/y.txt").await;
    assert!(matches!(
        result,
        Err(NodeStoreError::InvalidPath {
            source: PathError::NotASegment(_),
            ..
        })
    ));
    let result = store.rename_dir("a", "..").await;
    assert!(matches!(
        result,
        Err(NodeStoreError::InvalidPath {
            source: PathError::ReservedSegment(_),
            ..
        })
    ));
    let result = store.rename_dir("docs/a", "a").await;
    assert!(matches!(result, Err(NodeStoreError::SamePath(_))));
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn test_rename_missing_file() {
    let (store, _memory) = common::setup_test_env();

    let result = store.rename_file("ghost.txt", "spirit.txt").await;
    assert!(matches!(result, Err(NodeStoreError::PathNotFound(_))));
}
