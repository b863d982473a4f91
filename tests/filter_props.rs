//! Property tests for filter validation and pagination invariants.

mod util;

use std::sync::Arc;

use gutensearch::search::engine::SearchEngine;
use gutensearch::search::filter::{Filter, LIMIT_RANGE};
use gutensearch::storage::MemoryCatalog;
use proptest::prelude::*;
use serde_json::{Value, json};
use util::sample_catalog;

/// JSON scalars of every shape the validator may meet.
fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>().prop_map(|f| json!(f)),
        any::<bool>().prop_map(|b| json!(b)),
        "[ -~]{0,12}".prop_map(|s| json!(s)),
        Just(Value::Null),
    ]
}

fn field_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar(),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::Array),
    ]
}

/// Arbitrary candidate objects mixing known keys, junk keys, and arbitrary
/// value shapes.
fn candidate() -> impl Strategy<Value = Value> {
    let key = prop_oneof![
        Just("ids".to_string()),
        Just("language".to_string()),
        Just("mime_type".to_string()),
        Just("topic".to_string()),
        Just("author".to_string()),
        Just("title".to_string()),
        Just("sort".to_string()),
        Just("skip".to_string()),
        Just("limit".to_string()),
        Just("download_count".to_string()),
        Just("junk".to_string()),
    ];
    prop::collection::btree_map(key, field_value(), 0..8)
        .prop_map(|map| Value::Object(map.into_iter().collect()))
}

proptest! {
    /// validate(validate(c)) == validate(c) for every accepted candidate.
    #[test]
    fn validation_is_idempotent(candidate in candidate()) {
        let first = Filter::validate(&candidate).unwrap();
        let echoed = serde_json::to_value(&first).unwrap();
        let second = Filter::validate(&echoed).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Validated pagination always lands in range.
    #[test]
    fn validated_pagination_is_in_range(candidate in candidate()) {
        let filter = Filter::validate(&candidate).unwrap();
        let (lo, hi) = LIMIT_RANGE;
        prop_assert!(filter.limit >= lo && filter.limit <= hi);
        // usize skip cannot be negative; the clamp is observable through
        // re-serialization staying stable.
        prop_assert!(filter.skip <= i64::MAX as usize);
    }

    /// `results.len() == min(limit, max(0, count - skip))` over the sample
    /// catalog for arbitrary pagination.
    #[test]
    fn pagination_length_invariant(skip in 0i64..40, limit in -10i64..200) {
        let engine = SearchEngine::new(Arc::new(MemoryCatalog::new(sample_catalog())));
        let filter = Filter::builder().skip(skip).limit(limit).build();
        let result = engine.search(&filter).unwrap();
        let expected = result.count.saturating_sub(filter.skip).min(filter.limit);
        prop_assert_eq!(result.results.len(), expected);
    }

    /// Download-count sorts are monotonic with ascending-id tie-break.
    #[test]
    fn download_sort_is_monotonic(skip in 0i64..10, limit in 1i64..100) {
        let engine = SearchEngine::new(Arc::new(MemoryCatalog::new(sample_catalog())));
        let filter = Filter::builder()
            .sort(gutensearch::search::filter::Sort::DownloadCountDesc)
            .skip(skip)
            .limit(limit)
            .build();
        let result = engine.search(&filter).unwrap();
        for pair in result.results.windows(2) {
            prop_assert!(pair[0].download_count >= pair[1].download_count);
            if pair[0].download_count == pair[1].download_count {
                prop_assert!(pair[0].id < pair[1].id);
            }
        }
    }
}
