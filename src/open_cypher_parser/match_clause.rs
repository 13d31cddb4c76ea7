use super::ast::{MatchClause, MatchPart};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

impl TokenParser {
    /// `('OPTIONAL'? 'MATCH' PathExpression (',' PathExpression)*)+`
    pub(super) fn parse_match_clause(&mut self) -> Result<MatchClause, OpenCypherParsingError> {
        let clause_position = self.peek().position;
        let mut parts = Vec::new();

        loop {
            let position = self.peek().position;
            let optional = if self.eat(&TokenKind::Optional) {
                self.expect(&TokenKind::Match, "MATCH after OPTIONAL")?;
                true
            } else if self.eat(&TokenKind::Match) {
                false
            } else {
                break;
            };

            let mut patterns = vec![self.parse_path_expression()?];
            while self.eat(&TokenKind::Comma) {
                patterns.push(self.parse_path_expression()?);
            }
            parts.push(MatchPart {
                optional,
                patterns,
                position,
            });
        }

        MatchClause::new(parts).map_err(|e| self.invalid(e, clause_position))
    }
}
