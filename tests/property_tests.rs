//! Property-based tests for record IDs, stores and the in-memory Git backend.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use gitrecords::git::{AddOptions, GitOperations, HistoryOptions, MemoryGit};
use gitrecords::store::{
    storage_name, validate_id, ColonEncoder, FsStore, IdEncoder, MemoryStore, RecordStore,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    title: String,
    priority: u32,
    tags: Vec<String>,
}

/// Characters that are safe in a record ID and a file name.
fn id_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('.'),
        Just(':'),
    ]
}

/// IDs accepted by `validate_id`, leading dots included.
fn valid_id() -> impl Strategy<Value = String> {
    prop::collection::vec(id_char(), 1..24).prop_filter_map("must be a valid id", |chars| {
        let id: String = chars.into_iter().collect();
        if id.contains("..") {
            None
        } else {
            Some(id)
        }
    })
}

/// Valid IDs the colon encoding accepts.
fn colon_id() -> impl Strategy<Value = String> {
    valid_id().prop_filter("no underscores", |id| !id.contains('_'))
}

fn record() -> impl Strategy<Value = Record> {
    (
        "[a-zA-Z0-9 ]{0,40}",
        any::<u32>(),
        prop::collection::vec("[a-z]{1,8}", 0..4),
    )
        .prop_map(|(title, priority, tags)| Record {
            title,
            priority,
            tags,
        })
}

/// A small set of distinct IDs with one record each.
fn record_set(
    ids: impl Strategy<Value = String>,
) -> impl Strategy<Value = BTreeMap<String, Record>> {
    prop::collection::btree_map(ids, record(), 0..8)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_ids_validate(id in valid_id()) {
        prop_assert!(validate_id(&id).is_ok());
    }

    #[test]
    fn separators_always_rejected(
        prefix in "[a-z]{0,8}",
        sep in prop_oneof![Just("/"), Just("\\"), Just("..")],
        suffix in "[a-z]{0,8}",
    ) {
        let id = format!("{prefix}{sep}{suffix}");
        let err = validate_id(&id).unwrap_err();
        prop_assert!(err.is_invalid_id());
    }

    #[test]
    fn colon_encoding_round_trips(id in colon_id()) {
        let encoded = ColonEncoder.encode(&id);
        prop_assert!(!encoded.contains(':'));
        prop_assert_eq!(ColonEncoder.decode(&encoded), id);
    }

    #[test]
    fn colon_encoding_accepts_only_reversible_ids(id in valid_id()) {
        match storage_name(&id, Some(&ColonEncoder)) {
            Ok(name) => prop_assert_eq!(ColonEncoder.decode(&name), id),
            Err(err) => {
                prop_assert!(err.is_invalid_id());
                prop_assert!(id.contains('_'));
            }
        }
    }

    #[test]
    fn memory_store_lists_what_was_put(records in record_set(valid_id())) {
        tokio_test::block_on(async {
            let store: MemoryStore<Record> = MemoryStore::new();
            for (id, value) in &records {
                store.put(id, value, &()).await.unwrap();
            }

            let listed = store.list().await.unwrap();
            let expected: Vec<String> = records.keys().cloned().collect();
            assert_eq!(listed, expected);

            for (id, value) in &records {
                assert_eq!(store.get(id).await.unwrap().as_ref(), Some(value));
            }
        });
    }

    #[test]
    fn fs_store_lists_what_was_put(records in record_set(valid_id())) {
        let dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let store: FsStore<Record> = FsStore::new(dir.path());
            let entries: Vec<(String, Record)> = records.clone().into_iter().collect();
            store.put_many(&entries, &()).await.unwrap();

            let listed = store.list().await.unwrap();
            let expected: Vec<String> = records.keys().cloned().collect();
            assert_eq!(listed, expected);
        });
    }

    #[test]
    fn colon_encoded_fs_store_lists_what_was_put(records in record_set(colon_id())) {
        let dir = TempDir::new().unwrap();
        runtime().block_on(async {
            let store: FsStore<Record> = FsStore::new(dir.path()).with_encoder(ColonEncoder);
            let entries: Vec<(String, Record)> = records.clone().into_iter().collect();
            store.put_many(&entries, &()).await.unwrap();

            let listed = store.list().await.unwrap();
            let expected: Vec<String> = records.keys().cloned().collect();
            assert_eq!(listed, expected);

            for (id, value) in &records {
                assert_eq!(store.get(id).await.unwrap().as_ref(), Some(value));
            }
        });
    }

    #[test]
    fn memory_git_commit_records_content(
        files in prop::collection::btree_map("[a-z]{1,6}\\.json", "[a-z0-9]{0,16}", 1..6),
    ) {
        tokio_test::block_on(async {
            let git = MemoryGit::new();
            let before = git.commit_count();

            for (path, content) in &files {
                git.add(&[path.as_str()], AddOptions::with_content(content.as_str()))
                    .await
                    .unwrap();
            }
            let head = git.commit("batch").await.unwrap();

            assert_eq!(git.commit_count(), before + 1);
            assert_eq!(git.commit_hash("HEAD").await.unwrap(), head);
            assert!(git.staged_files().await.unwrap().is_empty());
            for (path, content) in &files {
                assert_eq!(&git.file_content(&head, path).await.unwrap(), content);
            }

            let history = git.commit_history(&HistoryOptions::default()).await.unwrap();
            assert_eq!(history[0].hash, head);
        });
    }
}

// =============================================================================
// Determinism
// =============================================================================

mod determinism_tests {
    use super::*;

    #[test]
    fn record_encoding_is_stable() {
        tokio_test::block_on(async {
            let value = Record {
                title: "Write docs".into(),
                priority: 2,
                tags: vec!["docs".into()],
            };
            let dir = TempDir::new().unwrap();
            let store: FsStore<Record> = FsStore::new(dir.path());

            store.put("a", &value, &()).await.unwrap();
            let first = std::fs::read_to_string(dir.path().join("a.json")).unwrap();
            store.put("a", &value, &()).await.unwrap();
            let second = std::fs::read_to_string(dir.path().join("a.json")).unwrap();

            assert_eq!(first, second);
            assert!(first.ends_with('\n'));
        });
    }

    #[test]
    fn validation_is_consistent() {
        let cases = [
            ("task-1", true),
            ("human.camilo", true),
            ("a:b", true),
            ("", false),
            ("..", false),
            ("a..b", false),
            ("a/b", false),
            ("a\\b", false),
        ];
        for (id, valid) in cases {
            assert_eq!(validate_id(id).is_ok(), valid, "id {id:?}");
            assert_eq!(validate_id(id).is_ok(), valid, "id {id:?} second call");
        }
    }
}
