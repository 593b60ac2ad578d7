//! Property-based tests for the tree normalizer.
//!
//! Raw listings are generated as arbitrary path soups, including duplicates,
//! backslashes, leading `./` and trailing `/`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use polyarc_core::ArchiveEntry;
use polyarc_core::tree::{self, level_of, normalize};
use proptest::prelude::*;

fn raw_path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z0-9]{1,4}", 1..5),
        prop::sample::select(vec!["", "./", "/"]),
        prop::sample::select(vec!["/", "\\"]),
        any::<bool>(),
    )
        .prop_map(|(segments, lead, separator, trailing)| {
            let mut path = format!("{lead}{}", segments.join(separator));
            if trailing {
                path.push('/');
            }
            path
        })
}

fn raw_entries() -> impl Strategy<Value = Vec<ArchiveEntry>> {
    prop::collection::vec((raw_path(), any::<bool>()), 0..24).prop_map(|items| {
        items
            .into_iter()
            .map(|(path, folder)| {
                if folder {
                    ArchiveEntry::folder(&path)
                } else {
                    ArchiveEntry::file(&path)
                }
            })
            .collect()
    })
}

proptest! {
    /// Every non-root entry has its parent one level up.
    #[test]
    fn prop_tree_is_complete(raw in raw_entries()) {
        let entries = normalize(raw);
        let keys: BTreeSet<(usize, &str)> = entries.iter().map(|e| (e.level(), e.path())).collect();
        for entry in &entries {
            if entry.level() > 0 {
                let parent = tree::parent_of(entry.path()).unwrap();
                prop_assert!(
                    keys.contains(&(entry.level() - 1, parent)),
                    "{} has no parent entry",
                    entry.path()
                );
            }
        }
    }

    /// Level is the separator count of the stored path.
    #[test]
    fn prop_level_matches_separators(raw in raw_entries()) {
        for entry in normalize(raw) {
            prop_assert_eq!(entry.level(), level_of(entry.path()));
            prop_assert_eq!(entry.level(), entry.path().matches('/').count());
        }
    }

    /// No `(level, path)` key appears twice and indices are sequential.
    #[test]
    fn prop_no_duplicates(raw in raw_entries()) {
        let entries = normalize(raw);
        let keys: BTreeSet<(usize, &str)> = entries.iter().map(|e| (e.level(), e.path())).collect();
        prop_assert_eq!(keys.len(), entries.len());
        for (index, entry) in entries.iter().enumerate() {
            prop_assert_eq!(entry.index(), index);
        }
    }

    /// Every raw path survives normalization.
    #[test]
    fn prop_raw_paths_survive(raw in raw_entries()) {
        let wanted: BTreeSet<String> = raw.iter().map(|e| e.path().to_string()).collect();
        let entries = normalize(raw);
        for path in wanted {
            prop_assert!(entries.iter().any(|e| e.path() == path));
        }
    }

    /// Normalizing twice changes nothing.
    #[test]
    fn prop_idempotent(raw in raw_entries()) {
        let once = normalize(raw);
        let twice = normalize(once.clone());
        prop_assert_eq!(once, twice);
    }
}

#[test]
fn test_single_nested_file_scenario() {
    let entries = normalize(vec![ArchiveEntry::file("a/b.txt")]);
    let shape: Vec<(&str, usize, bool)> = entries
        .iter()
        .map(|e| (e.path(), e.level(), e.is_folder()))
        .collect();
    assert_eq!(shape, vec![("a", 0, true), ("a/b.txt", 1, false)]);
}
