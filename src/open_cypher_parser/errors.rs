use thiserror::Error;

use super::ast::Position;

/// Failure to turn query text into an AST. Both kinds abort immediately.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OpenCypherParsingError {
    #[error("Lexical error at {position}: {message}")]
    Lexical { message: String, position: Position },
    #[error("Syntax error at {position}: expected {expected}, found {found}")]
    Syntax {
        expected: String,
        found: String,
        position: Position,
    },
}

impl OpenCypherParsingError {
    pub fn position(&self) -> Position {
        match self {
            OpenCypherParsingError::Lexical { position, .. }
            | OpenCypherParsingError::Syntax { position, .. } => *position,
        }
    }
}

/// Constructor-level invariant violations of AST nodes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AstValidationError {
    #[error(
        "Invalid variable-length range: minimum hops ({min}) cannot be greater than maximum hops ({max})"
    )]
    InvalidPathLength { min: u32, max: u32 },
    #[error("MATCH clause must contain at least one pattern")]
    EmptyMatch,
    #[error("MATCH at {position} has no pattern")]
    EmptyMatchPart { position: Position },
    #[error("RETURN clause at {position} must contain at least one item")]
    EmptyReturn { position: Position },
}
