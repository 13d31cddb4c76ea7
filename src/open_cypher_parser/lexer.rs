//! Tokenizer for the Cypher subset.
//!
//! Each token shape is a small nom parser; `tokenize` drives them over the
//! input, skipping whitespace and comments, and tracks line/column positions.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, digit1, multispace1, satisfy},
    combinator::{opt, recognize, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::pair,
    IResult, Parser,
};
use serde::Serialize;
use std::fmt;

use super::ast::Position;
use super::errors::OpenCypherParsingError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // Keywords
    Match,
    Optional,
    Where,
    Return,
    And,
    Or,
    Not,
    Distinct,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Skip,
    As,
    In,
    Is,
    Null,
    True,
    False,

    Identifier(String),
    StringLiteral(String),
    Integer(i64),
    Float(f64),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
    DotDot,
    Star,
    Pipe,
    Dash,
    ArrowRight, // ->
    ArrowLeft,  // <-
    Equal,
    NotEqual, // <> or !=
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,

    Eof,
}

impl TokenKind {
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Match
                | TokenKind::Optional
                | TokenKind::Where
                | TokenKind::Return
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::Distinct
                | TokenKind::Order
                | TokenKind::By
                | TokenKind::Asc
                | TokenKind::Desc
                | TokenKind::Limit
                | TokenKind::Skip
                | TokenKind::As
                | TokenKind::In
                | TokenKind::Is
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    /// Human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::StringLiteral(_) => format!("string {}", self.text),
            TokenKind::Integer(_) | TokenKind::Float(_) => format!("number {}", self.text),
            kind if kind.is_keyword() => format!("keyword {}", self.text.to_uppercase()),
            _ => format!("'{}'", self.text),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word.to_ascii_lowercase().as_str() {
        "match" => TokenKind::Match,
        "optional" => TokenKind::Optional,
        "where" => TokenKind::Where,
        "return" => TokenKind::Return,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "distinct" => TokenKind::Distinct,
        "order" => TokenKind::Order,
        "by" => TokenKind::By,
        "asc" | "ascending" => TokenKind::Asc,
        "desc" | "descending" => TokenKind::Desc,
        "limit" => TokenKind::Limit,
        "skip" => TokenKind::Skip,
        "as" => TokenKind::As,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        _ => return None,
    };
    Some(kind)
}

fn trivia(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((
        multispace1,
        recognize(pair(tag("//"), take_while(|c| c != '\n'))),
        recognize((tag("/*"), take_until("*/"), tag("*/"))),
    ))))
    .parse(input)
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn quoted_identifier(input: &str) -> IResult<&str, &str> {
    let (rest, _) = char('`').parse(input)?;
    let (rest, name) = take_while(|c| c != '`').parse(rest)?;
    let (rest, _) = char('`').parse(rest)?;
    Ok((rest, name))
}

/// `1..3` must lex as integer, range, integer: a float needs digits after the dot.
fn number(input: &str) -> IResult<&str, &str> {
    recognize(pair(digit1, opt(pair(char('.'), digit1)))).parse(input)
}

fn string_literal(input: &str) -> IResult<&str, String> {
    let (rest, quote) = alt((char('\''), char('"'))).parse(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, other)) => out.push(other),
                None => break,
            },
            c if c == quote => return Ok((&rest[idx + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Char)))
}

fn symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        alt((
            value(TokenKind::DotDot, tag("..")),
            value(TokenKind::ArrowRight, tag("->")),
            value(TokenKind::ArrowLeft, tag("<-")),
            value(TokenKind::NotEqual, tag("<>")),
            value(TokenKind::NotEqual, tag("!=")),
            value(TokenKind::LessThanEqual, tag("<=")),
            value(TokenKind::GreaterThanEqual, tag(">=")),
        )),
        alt((
            value(TokenKind::LParen, char('(')),
            value(TokenKind::RParen, char(')')),
            value(TokenKind::LBracket, char('[')),
            value(TokenKind::RBracket, char(']')),
            value(TokenKind::LBrace, char('{')),
            value(TokenKind::RBrace, char('}')),
            value(TokenKind::Comma, char(',')),
            value(TokenKind::Colon, char(':')),
            value(TokenKind::Semicolon, char(';')),
            value(TokenKind::Dot, char('.')),
            value(TokenKind::Star, char('*')),
            value(TokenKind::Pipe, char('|')),
            value(TokenKind::Dash, char('-')),
            value(TokenKind::Equal, char('=')),
            value(TokenKind::LessThan, char('<')),
            value(TokenKind::GreaterThan, char('>')),
        )),
    ))
    .parse(input)
}

fn advance_position(position: &mut Position, consumed: &str) {
    for ch in consumed.chars() {
        position.offset += ch.len_utf8();
        if ch == '\n' {
            position.line += 1;
            position.column = 1;
        } else {
            position.column += 1;
        }
    }
}

fn lexical_error(message: impl Into<String>, position: Position) -> OpenCypherParsingError {
    OpenCypherParsingError::Lexical {
        message: message.into(),
        position,
    }
}

/// Split query text into tokens. The result always ends with [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, OpenCypherParsingError> {
    let mut tokens = Vec::new();
    let mut position = Position::new(0, 1, 1);
    let mut remaining = input;

    loop {
        if let Ok((rest, skipped)) = trivia(remaining) {
            advance_position(&mut position, skipped);
            remaining = rest;
        }
        if remaining.is_empty() {
            break;
        }
        if remaining.starts_with("/*") {
            return Err(lexical_error("unterminated block comment", position));
        }

        let start = position;
        let (rest, kind) = if let Ok((rest, word)) = bare_word(remaining) {
            let kind = keyword(word).unwrap_or_else(|| TokenKind::Identifier(word.to_string()));
            (rest, kind)
        } else if remaining.starts_with('`') {
            match quoted_identifier(remaining) {
                Ok((rest, name)) if !name.is_empty() => {
                    (rest, TokenKind::Identifier(name.to_string()))
                }
                Ok(_) => return Err(lexical_error("empty quoted identifier", start)),
                Err(_) => return Err(lexical_error("unterminated quoted identifier", start)),
            }
        } else if let Ok((rest, digits)) = number(remaining) {
            let kind = if digits.contains('.') {
                let parsed = digits.parse::<f64>().map_err(|_| {
                    lexical_error(format!("invalid float literal '{}'", digits), start)
                })?;
                TokenKind::Float(parsed)
            } else {
                let parsed = digits.parse::<i64>().map_err(|_| {
                    lexical_error(format!("integer literal '{}' is out of range", digits), start)
                })?;
                TokenKind::Integer(parsed)
            };
            (rest, kind)
        } else if remaining.starts_with('\'') || remaining.starts_with('"') {
            match string_literal(remaining) {
                Ok((rest, text)) => (rest, TokenKind::StringLiteral(text)),
                Err(_) => return Err(lexical_error("unterminated string literal", start)),
            }
        } else if let Ok((rest, kind)) = symbol(remaining) {
            (rest, kind)
        } else {
            let ch = remaining.chars().next().unwrap_or_default();
            return Err(lexical_error(format!("unexpected character '{}'", ch), start));
        };

        let consumed = &remaining[..remaining.len() - rest.len()];
        advance_position(&mut position, consumed);
        tokens.push(Token {
            kind,
            text: consumed.to_string(),
            position: start,
        });
        remaining = rest;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        text: String::new(),
        position,
    });
    Ok(tokens)
}
