use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::ast_visitor::Violation;
use crate::graph_catalog::GraphSchemaError;
use crate::open_cypher_parser::ast::Position;
use crate::open_cypher_parser::errors::OpenCypherParsingError;

/// What made a pattern untranslatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsupportedKind {
    /// `*` or `*n..` under the reject policy.
    UnboundedPath,
    /// Upper bound above the configured ceiling.
    PathTooDeep,
    InvalidPathLength,
    ShortestPath,
    OptionalMatch,
    Aggregate,
    Function,
    ConflictingBinding,
    Projection,
    Pattern,
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnsupportedKind::UnboundedPath => "unbounded-path",
            UnsupportedKind::PathTooDeep => "path-too-deep",
            UnsupportedKind::InvalidPathLength => "invalid-path-length",
            UnsupportedKind::ShortestPath => "shortest-path",
            UnsupportedKind::OptionalMatch => "optional-match",
            UnsupportedKind::Aggregate => "aggregate",
            UnsupportedKind::Function => "function",
            UnsupportedKind::ConflictingBinding => "conflicting-binding",
            UnsupportedKind::Projection => "projection",
            UnsupportedKind::Pattern => "pattern",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TranslationError {
    #[error("Lexical error at {position}: {message}")]
    Lexical { message: String, position: Position },

    #[error("Syntax error at {position}: expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        position: Position,
    },

    #[error("Unbound identifier `{name}` at {position}")]
    UnboundIdentifier { name: String, position: Position },

    #[error("Unresolved schema reference: {0}")]
    UnresolvedSchemaReference(#[from] GraphSchemaError),

    #[error("Unsupported pattern ({kind}): {detail}{}", .alternative.as_ref().map(|a| format!("; try {}", a)).unwrap_or_default())]
    UnsupportedPattern {
        kind: UnsupportedKind,
        detail: String,
        alternative: Option<String>,
    },

    /// Internal invariant violation between translation phases.
    #[error("Translation assembly failed: {0}")]
    TranslationAssembly(String),
}

impl TranslationError {
    pub fn unsupported(kind: UnsupportedKind, detail: impl Into<String>) -> Self {
        TranslationError::UnsupportedPattern {
            kind,
            detail: detail.into(),
            alternative: None,
        }
    }

    pub fn unsupported_with_alternative(
        kind: UnsupportedKind,
        detail: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        TranslationError::UnsupportedPattern {
            kind,
            detail: detail.into(),
            alternative: Some(alternative.into()),
        }
    }

    /// Stable code for logs and result diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslationError::Lexical { .. } => "lexical",
            TranslationError::Syntax { .. } => "syntax",
            TranslationError::UnboundIdentifier { .. } => "unbound-identifier",
            TranslationError::UnresolvedSchemaReference(_) => "unresolved-schema-reference",
            TranslationError::UnsupportedPattern { .. } => "unsupported-pattern",
            TranslationError::TranslationAssembly(_) => "translation-assembly",
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            TranslationError::Lexical { position, .. }
            | TranslationError::Syntax { position, .. }
            | TranslationError::UnboundIdentifier { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<OpenCypherParsingError> for TranslationError {
    fn from(err: OpenCypherParsingError) -> Self {
        match err {
            OpenCypherParsingError::Lexical { message, position } => {
                TranslationError::Lexical { message, position }
            }
            OpenCypherParsingError::Syntax {
                expected,
                found,
                position,
            } => TranslationError::Syntax {
                expected,
                found,
                position,
            },
        }
    }
}

impl From<Violation> for TranslationError {
    fn from(violation: Violation) -> Self {
        let detail = violation.to_string();
        match violation {
            Violation::UnboundIdentifier { name, position } => {
                TranslationError::UnboundIdentifier { name, position }
            }
            Violation::ConflictingBinding { .. } => {
                TranslationError::unsupported(UnsupportedKind::ConflictingBinding, detail)
            }
            Violation::InvalidPathLength { .. } => {
                TranslationError::unsupported(UnsupportedKind::InvalidPathLength, detail)
            }
            Violation::InvalidShortestPath { .. } => TranslationError::unsupported_with_alternative(
                UnsupportedKind::ShortestPath,
                detail,
                "a single variable-length relationship inside shortestPath",
            ),
            Violation::AggregateInWhere { .. } => {
                TranslationError::unsupported(UnsupportedKind::Aggregate, detail)
            }
        }
    }
}
