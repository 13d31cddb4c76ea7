//! KQL generation from a validated, schema-resolved Cypher query.

pub mod common;
mod condition_translator;
pub mod context;
mod expression_translator;
pub mod function_registry;
mod graph_source;
pub mod path_translator;
mod pattern_translator;
mod projection_translator;
mod to_kql_query;

pub use context::{Binding, TranslationContext};
pub use path_translator::{check_path_lengths, Anchor};
pub use to_kql_query::generate_kql;

/// How an expression refers to the values of a query variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Inside a graph operator: `u.Age`, `u.NodeId`.
    Graph,
    /// Over the backing table of a lone node: `Age`.
    Tabular,
    /// After a graph operator, over its projected columns: `u_age`.
    Flat,
}
