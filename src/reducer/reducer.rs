//! The reduction function
//!
//! `reduce(deal, left, right)` is pure: operands are borrowed, the result is
//! a new value. It is associative, and commutative up to the order of
//! records that the deal leaves unordered, so a scheduler may apply it
//! over any reduction tree in any arrival order.
//!
//! `null` stands for an absent partial result and acts as the identity of
//! every deal.

use serde_json::Value;

use super::compare::type_name;
use super::deal::{limit_cap, DealSpec, SortDeal};
use super::errors::{ReduceError, ReduceResult};
use super::merge::{merge_sorted, sort_records, unify};

/// Combines two partial values under a deal
pub fn reduce(deal: &DealSpec, left: &Value, right: &Value) -> ReduceResult<Value> {
    match deal {
        DealSpec::Sum { limit } => sum(left, right, *limit),
        DealSpec::And => logical(deal, left, right, |l, r| l && r),
        DealSpec::Or => logical(deal, left, right, |l, r| l || r),
        DealSpec::Average => average(left, right),
        DealSpec::Sort(sort) => sort_merge(sort, left, right),
    }
}

fn mismatch(deal: &DealSpec, left: &Value, right: &Value) -> ReduceError {
    ReduceError::TypeMismatch {
        deal: deal.type_name(),
        left: type_name(left),
        right: type_name(right),
    }
}

/// Adds two JSON numbers, exactly for integers
pub(crate) fn add_numbers(left: &Value, right: &Value) -> Option<Value> {
    let (Value::Number(l), Value::Number(r)) = (left, right) else {
        return None;
    };
    if let (Some(l), Some(r)) = (l.as_i64(), r.as_i64()) {
        if let Some(total) = l.checked_add(r) {
            return Some(Value::from(total));
        }
    }
    if let (Some(l), Some(r)) = (l.as_u64(), r.as_u64()) {
        if let Some(total) = l.checked_add(r) {
            return Some(Value::from(total));
        }
    }
    let total = l.as_f64().unwrap_or(0.0) + r.as_f64().unwrap_or(0.0);
    Some(Value::from(total))
}

fn truncated(items: Vec<Value>, limit: i64) -> Value {
    let mut items = items;
    if let Some(cap) = limit_cap(limit) {
        items.truncate(cap);
    }
    Value::Array(items)
}

fn sum(left: &Value, right: &Value, limit: i64) -> ReduceResult<Value> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Value::Null),
        (Value::Array(items), Value::Null) | (Value::Null, Value::Array(items)) => {
            Ok(truncated(items.clone(), limit))
        }
        (Value::Number(_), Value::Null) => Ok(left.clone()),
        (Value::Null, Value::Number(_)) => Ok(right.clone()),
        (Value::Number(_), Value::Number(_)) => {
            add_numbers(left, right).ok_or_else(|| mismatch(&DealSpec::Sum { limit }, left, right))
        }
        (Value::Array(l), Value::Array(r)) => {
            let mut items = Vec::with_capacity(l.len() + r.len());
            items.extend(l.iter().cloned());
            items.extend(r.iter().cloned());
            Ok(truncated(items, limit))
        }
        _ => Err(mismatch(&DealSpec::Sum { limit }, left, right)),
    }
}

fn logical(
    deal: &DealSpec,
    left: &Value,
    right: &Value,
    combine: fn(bool, bool) -> bool,
) -> ReduceResult<Value> {
    match (left, right) {
        (Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(combine(*l, *r))),
        (Value::Bool(_), Value::Null) => Ok(left.clone()),
        (Value::Null, Value::Bool(_)) => Ok(right.clone()),
        (Value::Null, Value::Null) => Ok(Value::Null),
        _ => Err(mismatch(deal, left, right)),
    }
}

/// Pairwise mean. Averaging averages is only a true mean when every leaf
/// carries the same weight; shards of different sizes skew the result.
fn average(left: &Value, right: &Value) -> ReduceResult<Value> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            let mean = (l.as_f64().unwrap_or(0.0) + r.as_f64().unwrap_or(0.0)) / 2.0;
            Ok(Value::from(mean))
        }
        (Value::Number(_), Value::Null) => Ok(left.clone()),
        (Value::Null, Value::Number(_)) => Ok(right.clone()),
        (Value::Null, Value::Null) => Ok(Value::Null),
        _ => Err(mismatch(&DealSpec::Average, left, right)),
    }
}

fn sort_merge(deal: &SortDeal, left: &Value, right: &Value) -> ReduceResult<Value> {
    let empty = Vec::new();
    let (left_records, right_records) = match (left, right) {
        (Value::Null, Value::Null) => return Ok(Value::Null),
        (Value::Array(l), Value::Array(r)) => (l, r),
        (Value::Array(l), Value::Null) => (l, &empty),
        (Value::Null, Value::Array(r)) => (&empty, r),
        _ => return Err(mismatch(&DealSpec::Sort(deal.clone()), left, right)),
    };

    let limit = limit_cap(deal.limit);
    if !deal.unifies() {
        return Ok(Value::Array(merge_sorted(
            left_records,
            right_records,
            &deal.operators,
            limit,
        )));
    }

    let unified = unify(left_records, right_records, deal);
    let mut sorted = sort_records(unified, &deal.operators);
    if let Some(cap) = limit {
        sorted.truncate(cap);
    }
    Ok(Value::Array(sorted))
}
