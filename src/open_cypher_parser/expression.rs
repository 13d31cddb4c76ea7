use super::ast::{AggregateCall, AggregateFunction, Expression, FunctionCall, PropertyAccess};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

impl TokenParser {
    /// Operand of a condition or a projection item:
    /// literal | list | variable | variable '.' key | name '(' args ')'
    pub(super) fn parse_expression(&mut self) -> Result<Expression, OpenCypherParsingError> {
        match &self.peek().kind {
            TokenKind::StringLiteral(_)
            | TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Dash => Ok(Expression::Literal(self.parse_literal()?)),
            TokenKind::LBracket => self.nested(Self::parse_list),
            TokenKind::Identifier(_) => {
                if self.peek_nth(1).kind == TokenKind::LParen {
                    self.nested(Self::parse_function_call)
                } else {
                    let variable = self.expect_identifier("variable")?;
                    if self.eat(&TokenKind::Dot) {
                        let key = self.expect_name("property name after '.'")?;
                        Ok(Expression::Property(PropertyAccess { variable, key }))
                    } else {
                        Ok(Expression::Variable(variable))
                    }
                }
            }
            _ => Err(self.error("expression")),
        }
    }

    fn parse_list(&mut self) -> Result<Expression, OpenCypherParsingError> {
        self.expect(&TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();
        if !self.check(&TokenKind::RBracket) {
            loop {
                items.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBracket, "']' closing the list")?;
        Ok(Expression::List(items))
    }

    fn parse_function_call(&mut self) -> Result<Expression, OpenCypherParsingError> {
        let position = self.peek().position;
        let name = self.expect_name("function name")?;
        self.expect(&TokenKind::LParen, "'(' after function name")?;

        if let Some(function) = AggregateFunction::from_name(&name) {
            let distinct = self.eat(&TokenKind::Distinct);
            let argument = if function == AggregateFunction::Count && !distinct && self.eat(&TokenKind::Star) {
                None
            } else {
                Some(Box::new(self.parse_expression()?))
            };
            self.expect(&TokenKind::RParen, "')' closing the aggregate call")?;
            return Ok(Expression::Aggregate(AggregateCall {
                function,
                distinct,
                argument,
                position,
            }));
        }

        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' closing the function call")?;
        Ok(Expression::FunctionCall(FunctionCall {
            name,
            args,
            position,
        }))
    }
}
