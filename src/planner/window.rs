//! Record window arithmetic
//!
//! A query can window its records twice: the rich `sortBy` window picks
//! rows out of the sorted set, and the output window picks rows out of
//! that. Both collapse into one final window over the globally sorted
//! records:
//!
//! - `offset = sort_offset + output_offset`
//! - `limit` is unlimited when both limits are; otherwise it is the
//!   number of rows the two windows can yield,
//!   `min(max(sort_limit - output_offset, 0), output_limit)` with
//!   unlimited operands left out of the `min`
//!
//! No shard knows the global rank of its rows, so each shard must return
//! its first `offset + limit` rows; the gather step slices the exact
//! window out of the merged list.

use crate::reducer::UNLIMITED;

use super::errors::{PlannerError, PlannerResult};

/// Final record window of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordWindow {
    pub offset: i64,
    /// `UNLIMITED` or a row count
    pub limit: i64,
}

fn check_offset(what: &str, offset: i64) -> PlannerResult<()> {
    if offset < 0 {
        return Err(PlannerError::invalid_output(format!(
            "{} offset must be >= 0, got {}",
            what, offset
        )));
    }
    Ok(())
}

fn check_limit(what: &str, limit: i64) -> PlannerResult<()> {
    if limit < UNLIMITED {
        return Err(PlannerError::invalid_output(format!(
            "{} limit must be >= -1, got {}",
            what, limit
        )));
    }
    Ok(())
}

impl RecordWindow {
    /// Window of an output without a sort window
    pub fn output(offset: i64, limit: i64) -> PlannerResult<Self> {
        Self::compute(0, UNLIMITED, offset, limit)
    }

    /// Collapses the sort window and the output window into one
    pub fn compute(
        sort_offset: i64,
        sort_limit: i64,
        output_offset: i64,
        output_limit: i64,
    ) -> PlannerResult<Self> {
        check_offset("sortBy", sort_offset)?;
        check_limit("sortBy", sort_limit)?;
        check_offset("output", output_offset)?;
        check_limit("output", output_limit)?;

        let offset = sort_offset
            .checked_add(output_offset)
            .ok_or_else(|| PlannerError::invalid_output("combined offset overflows"))?;

        let from_sort = (sort_limit != UNLIMITED).then(|| (sort_limit - output_offset).max(0));
        let from_output = (output_limit != UNLIMITED).then_some(output_limit);
        let limit = match (from_sort, from_output) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => UNLIMITED,
        };

        let window = Self { offset, limit };
        window.shard_limit()?;
        Ok(window)
    }

    pub fn is_limited(&self) -> bool {
        self.limit != UNLIMITED
    }

    /// Rows every shard must return: `offset + limit`, or unlimited
    pub fn shard_limit(&self) -> PlannerResult<i64> {
        if !self.is_limited() {
            return Ok(UNLIMITED);
        }
        self.offset
            .checked_add(self.limit)
            .ok_or_else(|| PlannerError::invalid_output("offset + limit overflows"))
    }
}
