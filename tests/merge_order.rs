//! Merge-order property: folding the same classified feedbacks into the
//! global issues in any order yields identical totals and tiers per key.

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;

use civicpulse::{
    classifier, BatchId, FeedbackStore, MemoryStore, PriorityTier,
};

const TEXTS: &[&str] = &[
    "thanni varala",
    "water pipe leak near the tap",
    "no water supply for 6 days",
    "kuppai everywhere, bad smell",
    "garbage not collected",
    "current cut for 3 days",
    "power voltage problem",
    "road damaged, pothole danger",
    "hospital medicine delay",
    "nothing specific to report",
];

/// Merge the given texts in order and return issue_key -> (total, tier)
async fn merge_all(order: &[usize]) -> BTreeMap<String, (u64, PriorityTier)> {
    let store = Arc::new(MemoryStore::new());
    let batch_id = BatchId::new();

    for &i in order {
        let annotation = classifier::annotate(TEXTS[i]);
        let key = civicpulse::issue_key(&annotation.category, &annotation.main_issue);
        let contributor = civicpulse::Contributor {
            name: None,
            booth: "1".to_string(),
            batch_id,
        };
        store
            .merge_global_issue(&key, &annotation.category, &annotation.main_issue, contributor)
            .await
            .unwrap();
    }

    store
        .list_global_issues()
        .await
        .unwrap()
        .into_iter()
        .map(|i| (i.issue_key, (i.total_reports, i.priority)))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn merge_outcome_is_order_independent(
        order in Just((0..TEXTS.len()).collect::<Vec<_>>()).prop_shuffle()
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (shuffled, canonical) = rt.block_on(async {
            let shuffled = merge_all(&order).await;
            let canonical = merge_all(&(0..TEXTS.len()).collect::<Vec<_>>()).await;
            (shuffled, canonical)
        });
        prop_assert_eq!(shuffled, canonical);
    }
}
