use super::ast::{ReturnClause, ReturnItem};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

impl TokenParser {
    /// `'RETURN' 'DISTINCT'? Item (',' Item)* OrderBy? Page?`
    pub(super) fn parse_return_clause(&mut self) -> Result<ReturnClause, OpenCypherParsingError> {
        let position = self.expect(&TokenKind::Return, "RETURN")?.position;
        let distinct = self.eat(&TokenKind::Distinct);

        let mut items = Vec::new();
        loop {
            items.push(self.parse_return_item()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let mut clause =
            ReturnClause::new(distinct, items, position).map_err(|e| self.invalid(e, position))?;
        self.parse_order_by_and_page(&mut clause)?;
        Ok(clause)
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem, OpenCypherParsingError> {
        if self.check(&TokenKind::Star) {
            let position = self.advance().position;
            return Ok(ReturnItem::Wildcard(position));
        }
        let expression = self.parse_expression()?;
        let alias = if self.eat(&TokenKind::As) {
            Some(self.expect_identifier("alias after AS")?)
        } else {
            None
        };
        Ok(ReturnItem::Expression { expression, alias })
    }
}

#[cfg(test)]
mod tests {
    use crate::open_cypher_parser::ast::*;
    use crate::open_cypher_parser::errors::OpenCypherParsingError;
    use crate::open_cypher_parser::parse_query;

    #[test]
    fn test_distinct_and_aliases() {
        let query = parse_query("MATCH (u) RETURN DISTINCT u.name AS name, u.dept").unwrap();
        let clause = &query.return_clause;
        assert!(clause.distinct);
        assert_eq!(clause.items().len(), 2);
        match &clause.items()[0] {
            ReturnItem::Expression { alias, .. } => {
                assert_eq!(alias.as_ref().unwrap().name, "name")
            }
            other => panic!("unexpected {:?}", other),
        }
        match &clause.items()[1] {
            ReturnItem::Expression { alias, .. } => assert!(alias.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wildcard_item() {
        let query = parse_query("MATCH (u)-[r]->(v) RETURN *").unwrap();
        assert!(matches!(query.return_clause.items()[0], ReturnItem::Wildcard(_)));
    }

    #[test]
    fn test_empty_return_is_error() {
        let err = parse_query("MATCH (u) RETURN").unwrap_err();
        assert!(matches!(err, OpenCypherParsingError::Syntax { ref expected, .. } if expected == "expression"));
    }

    #[test]
    fn test_alias_must_be_identifier() {
        assert!(parse_query("MATCH (u) RETURN u.name AS 'x'").is_err());
    }
}
