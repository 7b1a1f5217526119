//! Pipeline configuration

use serde::{Deserialize, Serialize};

/// Shape of the tree partial responses are reduced along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReductionTree {
    /// Left fold in arrival order
    Sequential,
    /// Adjacent pairs, level by level
    #[default]
    Balanced,
}

impl ReductionTree {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReductionTree::Sequential => "sequential",
            ReductionTree::Balanced => "balanced",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub tree: ReductionTree,
}

impl PipelineConfig {
    pub fn with_tree(tree: ReductionTree) -> Self {
        Self { tree }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_tree_is_balanced() {
        let config: PipelineConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config.tree, ReductionTree::Balanced);

        let config: PipelineConfig = serde_json::from_value(json!({"tree": "sequential"})).unwrap();
        assert_eq!(config.tree.as_str(), "sequential");
    }
}
