use super::ast::{Comparison, ComparisonOperator, Condition, WhereClause};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

impl TokenParser {
    pub(super) fn parse_where_clause(&mut self) -> Result<WhereClause, OpenCypherParsingError> {
        let position = self.expect(&TokenKind::Where, "WHERE")?.position;
        let condition = self.parse_condition()?;
        Ok(WhereClause {
            condition,
            position,
        })
    }

    /// Precedence climbing, loosest first: OR, AND, NOT, comparison.
    pub(super) fn parse_condition(&mut self) -> Result<Condition, OpenCypherParsingError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            self.count_connective()?;
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, OpenCypherParsingError> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            self.count_connective()?;
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Condition, OpenCypherParsingError> {
        if self.eat(&TokenKind::Not) {
            self.enter_nested()?;
            let inner = self.parse_not();
            self.leave_nested();
            return Ok(Condition::Not(Box::new(inner?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Condition, OpenCypherParsingError> {
        if self.eat(&TokenKind::LParen) {
            self.enter_nested()?;
            let inner = self.parse_condition();
            self.leave_nested();
            let inner = inner?;
            self.expect(&TokenKind::RParen, "')' closing the condition")?;
            return Ok(inner);
        }

        let position = self.peek().position;
        let left = self.parse_expression()?;

        let operator = match self.peek().kind.clone() {
            TokenKind::Equal => ComparisonOperator::Equal,
            TokenKind::NotEqual => ComparisonOperator::NotEqual,
            TokenKind::LessThan => ComparisonOperator::LessThan,
            TokenKind::GreaterThan => ComparisonOperator::GreaterThan,
            TokenKind::LessThanEqual => ComparisonOperator::LessThanEqual,
            TokenKind::GreaterThanEqual => ComparisonOperator::GreaterThanEqual,
            TokenKind::In => ComparisonOperator::In,
            TokenKind::Is => {
                self.advance();
                let negated = self.eat(&TokenKind::Not);
                self.expect(&TokenKind::Null, "NULL after IS")?;
                return Ok(Condition::IsNull {
                    expression: left,
                    negated,
                });
            }
            TokenKind::Identifier(word) if word.eq_ignore_ascii_case("starts") => {
                self.advance();
                self.expect_with_keyword()?;
                return self.finish_comparison(ComparisonOperator::StartsWith, left, position);
            }
            TokenKind::Identifier(word) if word.eq_ignore_ascii_case("ends") => {
                self.advance();
                self.expect_with_keyword()?;
                return self.finish_comparison(ComparisonOperator::EndsWith, left, position);
            }
            TokenKind::Identifier(word) if word.eq_ignore_ascii_case("contains") => {
                ComparisonOperator::Contains
            }
            _ => return Ok(Condition::Predicate(left)),
        };

        self.advance();
        self.finish_comparison(operator, left, position)
    }

    fn finish_comparison(
        &mut self,
        operator: ComparisonOperator,
        left: super::ast::Expression,
        position: super::ast::Position,
    ) -> Result<Condition, OpenCypherParsingError> {
        let right = self.parse_expression()?;
        Ok(Condition::Comparison(Comparison {
            operator,
            left,
            right,
            position,
        }))
    }

    fn expect_with_keyword(&mut self) -> Result<(), OpenCypherParsingError> {
        if self.check_word("with") {
            self.advance();
            Ok(())
        } else {
            Err(self.error("WITH"))
        }
    }
}
