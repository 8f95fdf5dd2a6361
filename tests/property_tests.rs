//! Property-based tests using proptest
//!
//! Cover key/path mapping and listing pagination across randomized inputs.

use mlplatform_sdk::tos::path::{key_for_relative_path, relative_key_path};
use mlplatform_sdk::tos::download_tree;
use mlplatform_sdk::{MemoryObjectStore, RemotePath};
use proptest::prelude::*;
use std::path::PathBuf;

// =============================================================================
// Strategies
// =============================================================================

/// A file or directory name that is safe on every platform
fn arb_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,15}".prop_filter("dot names", |s| s != "." && s != "..")
}

fn arb_relative_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_segment(), 1..5)
}

fn arb_prefix() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_segment(), 0..4).prop_map(|segments| {
        segments
            .iter()
            .map(|s| format!("{}/", s))
            .collect::<String>()
    })
}

// =============================================================================
// Key mapping
// =============================================================================

proptest! {
    #[test]
    fn key_maps_back_to_relative_path(prefix in arb_prefix(), segments in arb_relative_path()) {
        let relative: PathBuf = segments.iter().collect();
        let key = key_for_relative_path(&prefix, &relative);

        prop_assert!(key.starts_with(&prefix));
        prop_assert!(!key.contains('\\'));
        prop_assert_eq!(relative_key_path(&prefix, &key), Some(relative));
    }

    #[test]
    fn parent_segments_never_map_to_a_path(
        prefix in arb_prefix(),
        before in prop::collection::vec(arb_segment(), 0..3),
        after in prop::collection::vec(arb_segment(), 0..3),
    ) {
        let mut segments = before;
        segments.push("..".to_string());
        segments.extend(after);
        let key = format!("{}{}", prefix, segments.join("/"));

        prop_assert_eq!(relative_key_path(&prefix, &key), None);
    }

    #[test]
    fn keys_outside_prefix_are_rejected(prefix in arb_prefix(), other in arb_segment()) {
        prop_assume!(!prefix.is_empty());
        let key = format!("zz-{}/{}", other, prefix);
        prop_assert_eq!(relative_key_path(&prefix, &key), None);
    }

    #[test]
    fn remote_path_display_parses_back(bucket in "[a-z][a-z0-9-]{2,20}", prefix in arb_prefix()) {
        let uri = format!("tos://{}/{}", bucket, prefix);
        let parsed = RemotePath::parse(&uri).unwrap();

        prop_assert_eq!(&parsed.bucket, &bucket);
        prop_assert!(!parsed.key.starts_with('/') && !parsed.key.ends_with('/'));
        prop_assert_eq!(RemotePath::parse(&parsed.to_string()).unwrap(), parsed.clone());
        prop_assert!(parsed.list_prefix().is_empty() || parsed.list_prefix().ends_with('/'));
    }

    #[test]
    fn foreign_schemes_are_rejected(scheme in "(s3|http|https|file)", rest in "[a-z]{1,8}/[a-z]{1,8}") {
        let uri = format!("{}://{}", scheme, rest);
        prop_assert!(RemotePath::parse(&uri).is_err());
    }
}

// =============================================================================
// Pagination
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn paginated_download_fetches_every_object(objects in 1usize..40, page_size in 1u32..8) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (summary, written) = runtime.block_on(async {
            let store = MemoryObjectStore::new().with_page_limit(page_size);
            for i in 0..objects {
                store
                    .put_object("bucket", &format!("p/model/f{:03}.bin", i), vec![1u8; i])
                    .await;
            }

            let dest = tempfile::tempdir().unwrap();
            let summary = download_tree(
                &store,
                &RemotePath::new("bucket", "p/model"),
                dest.path(),
                false,
            )
            .await
            .unwrap();
            let written = std::fs::read_dir(dest.path()).unwrap().count();
            (summary, written)
        });

        let expected_pages = objects.div_ceil(page_size as usize);
        prop_assert_eq!(summary.objects, objects);
        prop_assert_eq!(written, objects);
        prop_assert_eq!(summary.list_calls, expected_pages);
        prop_assert_eq!(summary.bytes, (0..objects as u64).sum::<u64>());
    }
}
