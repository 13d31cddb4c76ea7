use crate::config::CyclePolicy;
use crate::open_cypher_parser::ast::Condition;

/// Per-call knobs for path translation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathOptions {
    /// Relationship property to minimize in `shortestPath`. Switches the
    /// lowering from the native shortest-path operator to a weighted search.
    pub weight_property: Option<String>,
    /// Request the bidirectional-search hint for single-pair shortest paths.
    pub bidirectional: bool,
    pub enumeration: PathEnumerationOptions,
}

/// Limits for enumerating paths (named variable-length paths and
/// `allShortestPaths`). Unset fields fall back to the translator config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathEnumerationOptions {
    pub max_results: Option<u64>,
    pub max_depth: Option<u32>,
    /// `NodeId` values no path may visit.
    pub excluded_node_ids: Vec<String>,
    pub excluded_relationship_types: Vec<String>,
    /// Extra condition over the query variables, e.g. from
    /// [`parse_condition`](crate::open_cypher_parser::parse_condition).
    pub predicate: Option<Condition>,
    pub cycle_policy: Option<CyclePolicy>,
}

impl PathOptions {
    pub fn with_weight(property: impl Into<String>) -> Self {
        PathOptions {
            weight_property: Some(property.into()),
            ..Default::default()
        }
    }
}
