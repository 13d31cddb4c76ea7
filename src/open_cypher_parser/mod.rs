//! Parser for the supported Cypher subset.
//!
//! Text is tokenized by [`lexer::tokenize`] and then consumed by a
//! recursive-descent parser with one token of lookahead. Clause productions
//! live in their own modules as `impl TokenParser` blocks.

use ast::{Condition, Position, Query};
use errors::{AstValidationError, OpenCypherParsingError};
use lexer::{Token, TokenKind};

pub mod ast;
pub mod errors;
mod expression;
pub mod lexer;
mod match_clause;
mod order_by_and_page_clause;
mod path_pattern;
mod return_clause;
mod where_clause;

/// Parenthesized conditions, nested lists and nested function calls deeper
/// than this are rejected instead of recursing further.
const MAX_NESTING_DEPTH: usize = 64;

/// AND/OR chains build left-deep trees, so their length is capped per query.
const MAX_CONNECTIVES: usize = 1024;

/// Parse a complete query: `MATCH ... [WHERE ...] RETURN ...`.
pub fn parse_query(input: &str) -> Result<Query, OpenCypherParsingError> {
    let tokens = lexer::tokenize(input)?;
    let mut parser = TokenParser::new(tokens);
    let query = parser.parse_query()?;
    log::trace!("Parsed query AST: {:?}", query);
    Ok(query)
}

/// Parse a standalone boolean condition such as `n.enabled = true AND n.age > 3`.
pub fn parse_condition(input: &str) -> Result<Condition, OpenCypherParsingError> {
    let tokens = lexer::tokenize(input)?;
    let mut parser = TokenParser::new(tokens);
    let condition = parser.parse_condition()?;
    parser.expect(&TokenKind::Eof, "end of condition")?;
    Ok(condition)
}

pub(crate) struct TokenParser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
    connectives: usize,
}

impl TokenParser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        TokenParser {
            tokens,
            cursor: 0,
            depth: 0,
            connectives: 0,
        }
    }

    fn parse_query(&mut self) -> Result<Query, OpenCypherParsingError> {
        let match_clause = if self.check(&TokenKind::Match) || self.check(&TokenKind::Optional) {
            Some(self.parse_match_clause()?)
        } else {
            None
        };

        let where_clause = if match_clause.is_some() && self.check(&TokenKind::Where) {
            Some(self.parse_where_clause()?)
        } else {
            None
        };

        if !self.check(&TokenKind::Return) {
            let expected = match (&match_clause, &where_clause) {
                (None, _) => "MATCH, OPTIONAL MATCH or RETURN",
                (Some(_), None) => "MATCH, WHERE or RETURN",
                (Some(_), Some(_)) => "RETURN",
            };
            return Err(self.error(expected));
        }
        let return_clause = self.parse_return_clause()?;

        self.eat(&TokenKind::Semicolon);
        self.expect(&TokenKind::Eof, "end of query")?;

        Ok(Query {
            match_clause,
            where_clause,
            return_clause,
        })
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    /// Token `n` places ahead; the trailing `Eof` is returned past the end.
    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.cursor + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token, OpenCypherParsingError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(expected))
        }
    }

    /// True when the next token is an identifier spelled `word` (any case).
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name.eq_ignore_ascii_case(word))
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<ast::Identifier, OpenCypherParsingError> {
        match &self.peek().kind {
            TokenKind::Identifier(name) => {
                let identifier = ast::Identifier::new(name.clone(), self.peek().position);
                self.advance();
                Ok(identifier)
            }
            _ => Err(self.error(expected)),
        }
    }

    /// Labels, relationship types and property keys may also be spelled like
    /// keywords (`n.order`, `:Match`).
    fn expect_name(&mut self, expected: &str) -> Result<String, OpenCypherParsingError> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            kind if kind.is_keyword() => {
                let name = token.text.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_count(&mut self, expected: &str) -> Result<u64, OpenCypherParsingError> {
        match self.peek().kind {
            TokenKind::Integer(n) if n >= 0 => {
                self.advance();
                Ok(n as u64)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn error(&self, expected: &str) -> OpenCypherParsingError {
        let token = self.peek();
        OpenCypherParsingError::Syntax {
            expected: expected.to_string(),
            found: token.describe(),
            position: token.position,
        }
    }

    fn invalid(&self, err: AstValidationError, position: Position) -> OpenCypherParsingError {
        OpenCypherParsingError::Syntax {
            expected: "a well-formed construct".to_string(),
            found: err.to_string(),
            position,
        }
    }

    fn enter_nested(&mut self) -> Result<(), OpenCypherParsingError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("shallower nesting"));
        }
        Ok(())
    }

    fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn count_connective(&mut self) -> Result<(), OpenCypherParsingError> {
        self.connectives += 1;
        if self.connectives > MAX_CONNECTIVES {
            return Err(self.error("fewer AND/OR operators"));
        }
        Ok(())
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, OpenCypherParsingError>,
    ) -> Result<T, OpenCypherParsingError> {
        self.enter_nested()?;
        let result = parse(self);
        self.leave_nested();
        result
    }
}
