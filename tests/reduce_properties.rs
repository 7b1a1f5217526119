//! Reduction invariants
//!
//! A transport may reduce partial results along any tree and in any
//! arrival order, so every deal must be associative and have `null` as its
//! identity. Deals over unordered data must also be commutative.
//!
//! Average is deliberately absent: a mean of means is not associative.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{json, Value};

use shardplan::reducer::{reduce, DealSpec, SortDeal, SortOperator, UNLIMITED};

fn sorted_records(values: Vec<i64>) -> Value {
    let mut values = values;
    values.sort_unstable();
    Value::Array(values.into_iter().map(|v| json!([v])).collect())
}

fn limit_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![Just(UNLIMITED), 0i64..8]
}

/// Grouped shard result: unique keys, sorted by count descending then key
fn groups(counts: BTreeMap<u8, u16>) -> Value {
    let mut rows: Vec<(String, u16)> = counts
        .into_iter()
        .map(|(key, n)| (format!("k{}", key), n))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Value::Array(rows.into_iter().map(|(key, n)| json!([key, n])).collect())
}

fn group_deal() -> DealSpec {
    let mut deal = SortDeal::new(
        vec![SortOperator::descending(1), SortOperator::ascending(0)],
        UNLIMITED,
    );
    deal.key_column = Some(0);
    deal.n_sub_records_column = Some(1);
    DealSpec::Sort(deal)
}

fn assoc(deal: &DealSpec, a: &Value, b: &Value, c: &Value) -> (Value, Value) {
    let left = reduce(deal, &reduce(deal, a, b).unwrap(), c).unwrap();
    let right = reduce(deal, a, &reduce(deal, b, c).unwrap()).unwrap();
    (left, right)
}

// =============================================================================
// SUM
// =============================================================================

proptest! {
    #[test]
    fn sum_numbers_associative_and_commutative(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000, c in -1_000_000i64..1_000_000) {
        let deal = DealSpec::sum();
        let (left, right) = assoc(&deal, &json!(a), &json!(b), &json!(c));
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left, json!(a + b + c));
        prop_assert_eq!(
            reduce(&deal, &json!(a), &json!(b)).unwrap(),
            reduce(&deal, &json!(b), &json!(a)).unwrap()
        );
    }

    #[test]
    fn sum_identity(a in any::<i32>(), items in prop::collection::vec(any::<u8>(), 0..6)) {
        let deal = DealSpec::sum();
        prop_assert_eq!(reduce(&deal, &json!(a), &json!(0)).unwrap(), json!(a));
        prop_assert_eq!(reduce(&deal, &json!(a), &Value::Null).unwrap(), json!(a));
        prop_assert_eq!(reduce(&deal, &json!(items), &json!([])).unwrap(), json!(items));
        prop_assert_eq!(reduce(&deal, &Value::Null, &json!(items)).unwrap(), json!(items));
    }

    #[test]
    fn sum_lists_associative_under_limit(
        a in prop::collection::vec(any::<u8>(), 0..6),
        b in prop::collection::vec(any::<u8>(), 0..6),
        c in prop::collection::vec(any::<u8>(), 0..6),
        limit in limit_strategy(),
    ) {
        let deal = DealSpec::Sum { limit };
        let (left, right) = assoc(&deal, &json!(a), &json!(b), &json!(c));
        prop_assert_eq!(&left, &right);

        let mut expected: Vec<u8> = a.iter().chain(&b).chain(&c).copied().collect();
        if limit >= 0 {
            expected.truncate(limit as usize);
        }
        prop_assert_eq!(left, json!(expected));
    }
}

// =============================================================================
// AND / OR
// =============================================================================

proptest! {
    #[test]
    fn logical_deals_associative_and_commutative(a in any::<bool>(), b in any::<bool>(), c in any::<bool>()) {
        for deal in [DealSpec::And, DealSpec::Or] {
            let (left, right) = assoc(&deal, &json!(a), &json!(b), &json!(c));
            prop_assert_eq!(left, right);
            prop_assert_eq!(
                reduce(&deal, &json!(a), &json!(b)).unwrap(),
                reduce(&deal, &json!(b), &json!(a)).unwrap()
            );
            prop_assert_eq!(reduce(&deal, &json!(a), &Value::Null).unwrap(), json!(a));
        }
    }
}

// =============================================================================
// SORT
// =============================================================================

proptest! {
    #[test]
    fn sort_merge_is_a_sorted_prefix(
        a in prop::collection::vec(-50i64..50, 0..8),
        b in prop::collection::vec(-50i64..50, 0..8),
        limit in limit_strategy(),
    ) {
        let deal = DealSpec::sort(vec![SortOperator::ascending(0)], limit);
        let merged = reduce(&deal, &sorted_records(a.clone()), &sorted_records(b.clone())).unwrap();

        let mut all: Vec<i64> = a.into_iter().chain(b).collect();
        all.sort_unstable();
        if limit >= 0 {
            all.truncate(limit as usize);
        }
        prop_assert_eq!(merged, sorted_records(all));
    }

    #[test]
    fn sort_merge_associative_and_commutative(
        a in prop::collection::vec(-50i64..50, 0..8),
        b in prop::collection::vec(-50i64..50, 0..8),
        c in prop::collection::vec(-50i64..50, 0..8),
        limit in limit_strategy(),
    ) {
        let deal = DealSpec::sort(vec![SortOperator::descending(0)], limit);
        let desc = |values: Vec<i64>| {
            let Value::Array(mut rows) = sorted_records(values) else { unreachable!() };
            rows.reverse();
            Value::Array(rows)
        };
        let (a, b, c) = (desc(a), desc(b), desc(c));

        let (left, right) = assoc(&deal, &a, &b, &c);
        prop_assert_eq!(left, right);
        prop_assert_eq!(reduce(&deal, &a, &b).unwrap(), reduce(&deal, &b, &a).unwrap());
    }

    #[test]
    fn group_unification_associative(
        a in prop::collection::btree_map(0u8..6, 1u16..20, 0..5),
        b in prop::collection::btree_map(0u8..6, 1u16..20, 0..5),
        c in prop::collection::btree_map(0u8..6, 1u16..20, 0..5),
    ) {
        let deal = group_deal();
        let mut totals: BTreeMap<u8, u16> = BTreeMap::new();
        for (key, n) in a.iter().chain(&b).chain(&c) {
            *totals.entry(*key).or_default() += n;
        }

        let (left, right) = assoc(&deal, &groups(a), &groups(b), &groups(c));
        prop_assert_eq!(&left, &right);
        prop_assert_eq!(left, groups(totals));
    }
}

// =============================================================================
// FIXED SCENARIOS
// =============================================================================

#[test]
fn test_interleaved_shards_merge() {
    let deal = DealSpec::sort(vec![SortOperator::ascending(0)], UNLIMITED);
    let merged = reduce(&deal, &json!([[1], [3], [5]]), &json!([[2], [4], [6]])).unwrap();
    assert_eq!(merged, json!([[1], [2], [3], [4], [5], [6]]));
}

#[test]
fn test_error_lists_concatenate() {
    let merged = reduce(&DealSpec::sum(), &json!(["shard1 timeout"]), &json!([])).unwrap();
    assert_eq!(merged, json!(["shard1 timeout"]));
}

#[test]
fn test_average_is_pairwise() {
    let mean = reduce(&DealSpec::Average, &json!(2), &json!(4)).unwrap();
    assert_eq!(mean, json!(3.0));
    // ((2 + 4) / 2 + 9) / 2, not (2 + 4 + 9) / 3
    let nested = reduce(&DealSpec::Average, &mean, &json!(9)).unwrap();
    assert_eq!(nested, json!(6.0));
}
