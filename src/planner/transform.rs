//! Per-query rewrite
//!
//! Turns one caller query into the three pieces the plan needs: the copy
//! broadcast to the shards, the deals that reduce its elements, and the
//! gather spec that projects the reduced value back to the caller's shape.

use std::sync::LazyLock;

use regex::Regex;

use crate::message::{ElementMapper, GatherSpec, OrderedMap};
use crate::reducer::{DealSpec, SortDeal, SortOperator, UNLIMITED};

use super::ast::{Element, GroupBy, OutputSpec, QuerySpec, RecordFormat, RichSort, SortBy};
use super::config::PlannerConfig;
use super::errors::{PlannerError, PlannerResult};
use super::window::RecordWindow;

/// Group key column added to grouped records
pub const GROUP_KEY_ATTRIBUTE: &str = "_key";
/// Number of records folded into a group
pub const N_SUB_RECORDS_ATTRIBUTE: &str = "_nsubrecs";
/// Sampled records of a group
pub const SUB_RECORDS_ATTRIBUTE: &str = "_subrecs";

static SORT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?)([A-Za-z_@][A-Za-z0-9_@]*(?:\.[A-Za-z_@][A-Za-z0-9_@]*)*)$")
        .expect("sort key pattern is valid")
});

/// A parsed sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub attribute: String,
    pub descending: bool,
}

impl SortKey {
    /// Parses `name` or `-name`
    pub fn parse(key: &str) -> PlannerResult<Self> {
        let captures = SORT_KEY
            .captures(key)
            .ok_or_else(|| PlannerError::invalid_sort_key(key))?;
        Ok(Self {
            attribute: captures[2].to_string(),
            descending: !captures[1].is_empty(),
        })
    }

    fn operator(&self, column: usize) -> SortOperator {
        if self.descending {
            SortOperator::descending(column)
        } else {
            SortOperator::ascending(column)
        }
    }
}

#[derive(Debug, Clone)]
struct Grouping {
    max_n_sub_records: usize,
}

fn grouping(group_by: Option<&GroupBy>) -> PlannerResult<Option<Grouping>> {
    let Some(group_by) = group_by else {
        return Ok(None);
    };
    let key = group_by.key();
    let valid_key = SORT_KEY
        .captures(key)
        .is_some_and(|captures| captures[1].is_empty());
    if !valid_key {
        return Err(PlannerError::invalid_group_by(format!(
            "group key '{}' is not an attribute name",
            key
        )));
    }
    let max = usize::try_from(group_by.max_n_sub_records()).map_err(|_| {
        PlannerError::invalid_group_by(format!(
            "maxNSubRecords must be >= 0, got {}",
            group_by.max_n_sub_records()
        ))
    })?;
    Ok(Some(Grouping {
        max_n_sub_records: max,
    }))
}

/// Position of `attribute`, appending it when missing
fn column_of(attributes: &mut Vec<String>, attribute: &str) -> usize {
    match attributes.iter().position(|a| a == attribute) {
        Some(column) => column,
        None => {
            attributes.push(attribute.to_string());
            attributes.len() - 1
        }
    }
}

/// Everything the plan needs from one query
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    /// Copy sent to the shards
    pub broadcast: QuerySpec,
    /// Element name -> deal
    pub deals: OrderedMap<DealSpec>,
    pub gather: GatherSpec,
    /// Final record window over the merged records
    pub window: RecordWindow,
    /// Rows each shard returns
    pub shard_limit: i64,
}

/// Rewrites one query for distribution
pub fn plan_query(name: &str, query: &QuerySpec, config: &PlannerConfig) -> PlannerResult<PlannedQuery> {
    let output = query.output.clone().unwrap_or_default();
    let elements = output.parsed_elements()?;
    let limit = output.limit.unwrap_or(config.default_limit);

    let window = match &query.sort_by {
        Some(sort_by) => {
            RecordWindow::compute(sort_by.offset(), sort_by.limit(), output.offset, limit)?
        }
        None => RecordWindow::output(output.offset, limit)?,
    };
    let sort_keys: Vec<SortKey> = match &query.sort_by {
        Some(sort_by) => sort_by
            .keys()
            .iter()
            .map(|key| SortKey::parse(key))
            .collect::<PlannerResult<_>>()?,
        None => Vec::new(),
    };
    let grouping = grouping(query.group_by.as_ref())?;

    let wants_count = elements.contains(&Element::Count);
    let wants_records = elements.contains(&Element::Records);
    // A hidden count is recomputed from the returned records. A grouped count
    // is the number of unified groups, since shard counts repeat split groups.
    let recount = wants_count && (output.hides(Element::Count) || grouping.is_some());
    let records_visible = wants_records && !output.hides(Element::Records);
    let reduce_records = records_visible || recount;

    let shard_limit = match grouping {
        Some(_) => UNLIMITED,
        None => window.shard_limit()?,
    };

    let mut attributes = output.attributes.clone();
    let mut deals = OrderedMap::new();
    if wants_count && !recount {
        deals.insert(Element::Count.as_str(), DealSpec::sum());
    }
    if reduce_records {
        let mut sort = SortDeal::new(Vec::new(), shard_limit);
        if let Some(grouping) = &grouping {
            sort.key_column = Some(column_of(&mut attributes, GROUP_KEY_ATTRIBUTE));
            sort.n_sub_records_column = Some(column_of(&mut attributes, N_SUB_RECORDS_ATTRIBUTE));
            if grouping.max_n_sub_records > 0 {
                sort.sub_records_column = Some(column_of(&mut attributes, SUB_RECORDS_ATTRIBUTE));
                sort.max_n_sub_records = grouping.max_n_sub_records;
            }
        }
        sort.operators = sort_keys
            .iter()
            .map(|key| key.operator(column_of(&mut attributes, &key.attribute)))
            .collect();
        deals.insert(Element::Records.as_str(), DealSpec::Sort(sort));
    }

    let mut mappers = OrderedMap::new();
    if recount {
        let mapper = match grouping {
            Some(_) => ElementMapper::count_all_of(Element::Records.as_str()),
            None => ElementMapper::count_of(Element::Records.as_str()),
        };
        mappers.insert(Element::Count.as_str(), mapper);
    }
    if reduce_records {
        let mut mapper = ElementMapper::records(
            output.attributes.clone(),
            output.format,
            window.offset,
            window.limit,
        );
        mapper.no_output = !records_visible;
        mappers.insert(Element::Records.as_str(), mapper);
    }

    let mut broadcast_elements: Vec<String> = output.elements.clone();
    if reduce_records && !wants_records {
        broadcast_elements.push(Element::Records.as_str().to_string());
    }
    let broadcast_output = OutputSpec {
        format: RecordFormat::Simple,
        elements: broadcast_elements,
        attributes,
        offset: 0,
        limit: Some(shard_limit),
        no_output: Vec::new(),
    };
    let broadcast_sort = query.sort_by.as_ref().map(|sort_by| match sort_by {
        SortBy::Keys(keys) => SortBy::Keys(keys.clone()),
        SortBy::Rich(rich) => SortBy::Rich(RichSort {
            keys: rich.keys.clone(),
            offset: 0,
            limit: shard_limit,
        }),
    });

    let mut broadcast = query.clone();
    broadcast.output = Some(broadcast_output);
    broadcast.sort_by = broadcast_sort;

    Ok(PlannedQuery {
        broadcast,
        deals,
        gather: GatherSpec {
            output: name.to_string(),
            elements: (!mappers.is_empty()).then_some(mappers),
        },
        window,
        shard_limit,
    })
}
