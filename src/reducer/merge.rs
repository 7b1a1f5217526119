//! Order-preserving record merges
//!
//! Records arrive from shards as positional tuples. A sort chain decides
//! which of two records comes first:
//!
//! 1. For each operator in order, `op(left[col], right[col])` true means the
//!    left record precedes; `op(right[col], left[col])` true means the right
//!    record precedes; otherwise the next operator decides.
//! 2. If no operator decides, the left record precedes (stable tie-break).
//!
//! With strict operators this is a lexicographic order over the chain.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::Value;

use super::compare::compare;
use super::deal::{SortDeal, SortOperator};

/// Returns the value at `column` of a tuple record
pub fn column(record: &Value, column: usize) -> Option<&Value> {
    match record {
        Value::Array(values) => values.get(column),
        _ => None,
    }
}

/// Returns true if `right` must be emitted before `left`
pub fn right_precedes(left: &Value, right: &Value, operators: &[SortOperator]) -> bool {
    for op in operators {
        let l = column(left, op.column);
        let r = column(right, op.column);
        if op.operator.apply(l, r) {
            return false;
        }
        if op.operator.apply(r, l) {
            return true;
        }
    }
    false
}

/// Merges two sequences, each already sorted under `operators`.
///
/// Stops once `limit` records are produced; `None` merges everything.
/// Records are cloned only when taken.
pub fn merge_sorted(
    left: &[Value],
    right: &[Value],
    operators: &[SortOperator],
    limit: Option<usize>,
) -> Vec<Value> {
    merge_iter(left.iter().cloned(), right.iter().cloned(), operators, limit)
}

fn merge_iter<L, R>(
    left: L,
    right: R,
    operators: &[SortOperator],
    limit: Option<usize>,
) -> Vec<Value>
where
    L: ExactSizeIterator<Item = Value>,
    R: ExactSizeIterator<Item = Value>,
{
    let total = left.len() + right.len();
    let capacity = limit.map_or(total, |limit| limit.min(total));
    let mut merged = Vec::with_capacity(capacity);
    let mut left = left.peekable();
    let mut right = right.peekable();

    while merged.len() < capacity {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => right_precedes(l, r, operators),
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        if let Some(record) = next {
            merged.push(record);
        }
    }

    merged
}

/// Stable bottom-up merge sort under a sort chain
pub fn sort_records(records: Vec<Value>, operators: &[SortOperator]) -> Vec<Value> {
    if operators.is_empty() || records.len() < 2 {
        return records;
    }

    let mut runs: Vec<Vec<Value>> = records.into_iter().map(|record| vec![record]).collect();
    while runs.len() > 1 {
        let mut next = Vec::with_capacity(runs.len().div_ceil(2));
        let mut pending = runs.into_iter();
        while let Some(left) = pending.next() {
            match pending.next() {
                Some(right) => {
                    next.push(merge_iter(left.into_iter(), right.into_iter(), operators, None))
                }
                None => next.push(left),
            }
        }
        runs = next;
    }
    runs.pop().unwrap_or_default()
}

/// Group key ordered by value, so `1` and `1.0` name the same group
struct GroupKey<'a>(&'a Value);

impl PartialEq for GroupKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for GroupKey<'_> {}

impl PartialOrd for GroupKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.0, other.0)
    }
}

/// Unifies records sharing the deal's key column.
///
/// The first occurrence of a key keeps its position; later occurrences are
/// absorbed into it. Records without a key column belong to no group and
/// are kept as they are. Returns the input unchanged if the deal has no key.
pub fn unify(left: &[Value], right: &[Value], deal: &SortDeal) -> Vec<Value> {
    let Some(key_column) = deal.key_column else {
        return left.iter().chain(right).cloned().collect();
    };

    let mut unified: Vec<Value> = Vec::with_capacity(left.len() + right.len());
    let mut positions: BTreeMap<GroupKey<'_>, usize> = BTreeMap::new();

    for record in left.iter().chain(right) {
        let Some(key) = column(record, key_column) else {
            unified.push(record.clone());
            continue;
        };
        match positions.get(&GroupKey(key)) {
            Some(&index) => absorb(&mut unified[index], record, deal),
            None => {
                positions.insert(GroupKey(key), unified.len());
                unified.push(record.clone());
            }
        }
    }

    unified
}

fn absorb(base: &mut Value, other: &Value, deal: &SortDeal) {
    let (Value::Array(base), Value::Array(other)) = (base, other) else {
        return;
    };

    if let Some(index) = deal.n_sub_records_column {
        let total = match (base.get(index), other.get(index)) {
            (Some(a), Some(b)) => super::reducer::add_numbers(a, b),
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        };
        if let (Some(total), Some(slot)) = (total, base.get_mut(index)) {
            *slot = total;
        }
    }

    if let Some(index) = deal.sub_records_column {
        let extra = other.get(index).and_then(Value::as_array).cloned().unwrap_or_default();
        if let Some(Value::Array(samples)) = base.get_mut(index) {
            samples.extend(extra);
            samples.truncate(deal.max_n_sub_records);
        }
    }
}
