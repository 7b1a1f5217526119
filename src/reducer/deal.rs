//! Deal descriptors: how two partial values of one output are combined
//!
//! Serialised as `{"type": "<name>", ...}` so a reduce message can carry
//! one per output element.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::compare::compare_values;

/// Limit value meaning "no truncation"
pub const UNLIMITED: i64 = -1;

fn unlimited() -> i64 {
    UNLIMITED
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// Converts a wire limit into a cap; negative means none
pub fn limit_cap(limit: i64) -> Option<usize> {
    usize::try_from(limit).ok()
}

/// Named comparison used by a sort chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "==")]
    Equal,
}

impl Comparator {
    const TABLE: [(&'static str, Comparator); 5] = [
        ("<", Comparator::Less),
        ("<=", Comparator::LessOrEqual),
        (">", Comparator::Greater),
        (">=", Comparator::GreaterOrEqual),
        ("==", Comparator::Equal),
    ];

    /// Looks up a comparator by its symbol
    pub fn parse(symbol: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(candidate, _)| *candidate == symbol)
            .map(|(_, comparator)| *comparator)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Equal => "==",
        }
    }

    /// Evaluates `left <op> right`
    pub fn apply(&self, left: Option<&Value>, right: Option<&Value>) -> bool {
        let ordering = compare_values(left, right);
        match self {
            Comparator::Less => ordering.is_lt(),
            Comparator::LessOrEqual => ordering.is_le(),
            Comparator::Greater => ordering.is_gt(),
            Comparator::GreaterOrEqual => ordering.is_ge(),
            Comparator::Equal => ordering.is_eq(),
        }
    }
}

/// One link of a sort chain: compare `column` with `operator`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOperator {
    pub column: usize,
    pub operator: Comparator,
}

impl SortOperator {
    pub fn new(column: usize, operator: Comparator) -> Self {
        Self { column, operator }
    }

    pub fn ascending(column: usize) -> Self {
        Self::new(column, Comparator::Less)
    }

    pub fn descending(column: usize) -> Self {
        Self::new(column, Comparator::Greater)
    }
}

/// Parameters of an order-preserving merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortDeal {
    #[serde(default)]
    pub operators: Vec<SortOperator>,
    #[serde(default = "unlimited")]
    pub limit: i64,
    /// Records sharing this column's value are unified into one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_column: Option<usize>,
    /// Column holding a sub-record count, added on unification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_sub_records_column: Option<usize>,
    /// Column holding sampled sub-records, concatenated on unification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_records_column: Option<usize>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_n_sub_records: usize,
}

impl SortDeal {
    pub fn new(operators: Vec<SortOperator>, limit: i64) -> Self {
        Self {
            operators,
            limit,
            key_column: None,
            n_sub_records_column: None,
            sub_records_column: None,
            max_n_sub_records: 0,
        }
    }

    /// Returns true if records are unified by key before sorting
    pub fn unifies(&self) -> bool {
        self.key_column.is_some()
    }
}

/// How two partial values are combined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DealSpec {
    /// Numbers add, sequences concatenate
    Sum {
        #[serde(default = "unlimited")]
        limit: i64,
    },
    And,
    Or,
    /// Pairwise mean; not weighted by shard size
    Average,
    Sort(SortDeal),
}

impl DealSpec {
    /// Unlimited sum
    pub fn sum() -> Self {
        DealSpec::Sum { limit: UNLIMITED }
    }

    pub fn sort(operators: Vec<SortOperator>, limit: i64) -> Self {
        DealSpec::Sort(SortDeal::new(operators, limit))
    }

    /// Returns the wire type name
    pub fn type_name(&self) -> &'static str {
        match self {
            DealSpec::Sum { .. } => "sum",
            DealSpec::And => "and",
            DealSpec::Or => "or",
            DealSpec::Average => "average",
            DealSpec::Sort(_) => "sort",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_comparator_table() {
        for symbol in ["<", "<=", ">", ">=", "=="] {
            let comparator = Comparator::parse(symbol).unwrap();
            assert_eq!(comparator.symbol(), symbol);
        }
        assert_eq!(Comparator::parse("<=>"), None);
    }

    #[test]
    fn test_comparator_apply() {
        let one = json!(1);
        let two = json!(2);
        assert!(Comparator::Less.apply(Some(&one), Some(&two)));
        assert!(!Comparator::Less.apply(Some(&one), Some(&one)));
        assert!(Comparator::LessOrEqual.apply(Some(&one), Some(&one)));
        assert!(Comparator::Greater.apply(Some(&two), Some(&one)));
        assert!(Comparator::Equal.apply(Some(&two), Some(&two)));
        assert!(Comparator::Less.apply(None, Some(&one)));
    }

    #[test]
    fn test_deal_wire_format() {
        let deal = DealSpec::sort(vec![SortOperator::descending(1)], 10);
        assert_eq!(
            serde_json::to_value(&deal).unwrap(),
            json!({
                "type": "sort",
                "operators": [{"column": 1, "operator": ">"}],
                "limit": 10
            })
        );
        assert_eq!(
            serde_json::to_value(DealSpec::sum()).unwrap(),
            json!({"type": "sum", "limit": -1})
        );
        assert_eq!(
            serde_json::to_value(DealSpec::And).unwrap(),
            json!({"type": "and"})
        );
    }

    #[test]
    fn test_deal_decodes_with_defaults() {
        let deal: DealSpec = serde_json::from_value(json!({"type": "sort"})).unwrap();
        assert_eq!(deal, DealSpec::sort(Vec::new(), UNLIMITED));
    }

    #[test]
    fn test_limit_cap() {
        assert_eq!(limit_cap(-1), None);
        assert_eq!(limit_cap(0), Some(0));
        assert_eq!(limit_cap(7), Some(7));
    }
}
