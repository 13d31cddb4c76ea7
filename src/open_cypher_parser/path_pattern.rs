use super::ast::{
    Direction, Literal, NodePattern, PathExpression, PathKind, PathLength, PathStep,
    PropertyConstraint, RelationshipPattern,
};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

/// Prevents runaway inputs like (a)-->(b)-->(c)... repeated hundreds of times.
/// Real queries rarely exceed 10 hops.
const MAX_RELATIONSHIP_CHAIN_DEPTH: usize = 50;

impl TokenParser {
    /// `(IDENT '=')? (shortestPath '(' Chain ')' | allShortestPaths '(' Chain ')' | Chain)`
    pub(super) fn parse_path_expression(
        &mut self,
    ) -> Result<PathExpression, OpenCypherParsingError> {
        let position = self.peek().position;

        let variable = if matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_nth(1).kind == TokenKind::Equal
        {
            let identifier = self.expect_identifier("path variable")?;
            self.advance();
            Some(identifier)
        } else {
            None
        };

        let kind = if self.peek_nth(1).kind == TokenKind::LParen && self.check_word("shortestPath")
        {
            PathKind::ShortestPath
        } else if self.peek_nth(1).kind == TokenKind::LParen
            && self.check_word("allShortestPaths")
        {
            PathKind::AllShortestPaths
        } else {
            PathKind::Pattern
        };

        let (start, steps) = if kind == PathKind::Pattern {
            self.parse_chain()?
        } else {
            self.advance();
            self.expect(&TokenKind::LParen, "'(' after path function")?;
            let chain = self.parse_chain()?;
            self.expect(&TokenKind::RParen, "')' closing path function")?;
            chain
        };

        Ok(PathExpression {
            variable,
            kind,
            start,
            steps,
            position,
        })
    }

    fn parse_chain(&mut self) -> Result<(NodePattern, Vec<PathStep>), OpenCypherParsingError> {
        let start = self.parse_node_pattern()?;
        let mut steps = Vec::new();

        while self.check(&TokenKind::Dash) || self.check(&TokenKind::ArrowLeft) {
            if steps.len() >= MAX_RELATIONSHIP_CHAIN_DEPTH {
                return Err(self.error("a shorter relationship chain"));
            }
            let relationship = self.parse_relationship_pattern()?;
            let node = self.parse_node_pattern()?;
            steps.push(PathStep { relationship, node });
        }

        Ok((start, steps))
    }

    /// `'(' IDENT? (':' Label)* PropertyMap? ')'`
    fn parse_node_pattern(&mut self) -> Result<NodePattern, OpenCypherParsingError> {
        let position = self
            .expect(&TokenKind::LParen, "'(' starting a node pattern")?
            .position;

        let variable = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            Some(self.expect_identifier("node variable")?)
        } else {
            None
        };

        let mut labels = Vec::new();
        while self.eat(&TokenKind::Colon) {
            labels.push(self.expect_name("node label")?);
        }

        let properties = if self.check(&TokenKind::LBrace) {
            self.parse_property_map()?
        } else {
            Vec::new()
        };

        self.expect(&TokenKind::RParen, "')' closing the node pattern")?;

        Ok(NodePattern {
            variable,
            labels,
            properties,
            position,
        })
    }

    /// Direction is encoded by which side carries the arrow:
    /// `-[]->` outgoing, `<-[]-` incoming, `-[]-` and `<-[]->` either.
    fn parse_relationship_pattern(
        &mut self,
    ) -> Result<RelationshipPattern, OpenCypherParsingError> {
        let position = self.peek().position;
        let incoming = if self.eat(&TokenKind::ArrowLeft) {
            true
        } else {
            self.expect(&TokenKind::Dash, "'-' or '<-' starting a relationship")?;
            false
        };

        let mut variable = None;
        let mut types = Vec::new();
        let mut properties = Vec::new();
        let mut length = None;

        if self.eat(&TokenKind::LBracket) {
            if matches!(self.peek().kind, TokenKind::Identifier(_)) {
                variable = Some(self.expect_identifier("relationship variable")?);
            }
            if self.eat(&TokenKind::Colon) {
                types.push(self.expect_name("relationship type")?);
                while self.eat(&TokenKind::Pipe) {
                    self.eat(&TokenKind::Colon);
                    types.push(self.expect_name("relationship type after '|'")?);
                }
            }
            if self.check(&TokenKind::Star) {
                length = Some(self.parse_path_length()?);
            }
            if self.check(&TokenKind::LBrace) {
                properties = self.parse_property_map()?;
            }
            self.expect(&TokenKind::RBracket, "']' closing the relationship")?;
        }

        let outgoing = if self.eat(&TokenKind::ArrowRight) {
            true
        } else {
            self.expect(&TokenKind::Dash, "'-' or '->' ending a relationship")?;
            false
        };

        let direction = match (incoming, outgoing) {
            (false, true) => Direction::Outgoing,
            (true, false) => Direction::Incoming,
            _ => Direction::Either,
        };

        Ok(RelationshipPattern {
            variable,
            types,
            direction,
            properties,
            length,
            position,
        })
    }

    /// `'*' INT? ('..' INT?)?`
    fn parse_path_length(&mut self) -> Result<PathLength, OpenCypherParsingError> {
        let position = self.expect(&TokenKind::Star, "'*'")?.position;
        let lower = self.parse_hop_count()?;

        if !self.eat(&TokenKind::DotDot) {
            return Ok(lower.map(PathLength::fixed).unwrap_or_else(PathLength::unbounded));
        }

        let upper = self.parse_hop_count()?;
        match (lower, upper) {
            (Some(min), Some(max)) => PathLength::range(min, max).map_err(|e| self.invalid(e, position)),
            (None, Some(max)) => PathLength::range(1, max).map_err(|e| self.invalid(e, position)),
            (Some(min), None) => Ok(PathLength::at_least(min)),
            (None, None) => Ok(PathLength::unbounded()),
        }
    }

    fn parse_hop_count(&mut self) -> Result<Option<u32>, OpenCypherParsingError> {
        match self.peek().kind {
            TokenKind::Integer(n) => {
                let hops = u32::try_from(n).map_err(|_| self.error("a hop count below 2^32"))?;
                self.advance();
                Ok(Some(hops))
            }
            _ => Ok(None),
        }
    }

    /// `'{' (key ':' literal (',' key ':' literal)*)? '}'`
    fn parse_property_map(&mut self) -> Result<Vec<PropertyConstraint>, OpenCypherParsingError> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut constraints = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let key = self.expect_name("property key")?;
                self.expect(&TokenKind::Colon, "':' after property key")?;
                let value = self.parse_literal()?;
                constraints.push(PropertyConstraint { key, value });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace, "'}' closing the property map")?;
        Ok(constraints)
    }

    pub(super) fn parse_literal(&mut self) -> Result<Literal, OpenCypherParsingError> {
        let literal = match &self.peek().kind {
            TokenKind::StringLiteral(s) => Literal::String(s.clone()),
            TokenKind::Integer(n) => Literal::Integer(*n),
            TokenKind::Float(v) => Literal::Float(*v),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Null => Literal::Null,
            TokenKind::Dash => {
                return match self.peek_nth(1).kind {
                    TokenKind::Integer(n) => {
                        self.advance();
                        self.advance();
                        Ok(Literal::Integer(-n))
                    }
                    TokenKind::Float(v) => {
                        self.advance();
                        self.advance();
                        Ok(Literal::Float(-v))
                    }
                    _ => Err(self.error("literal value")),
                };
            }
            _ => return Err(self.error("literal value")),
        };
        self.advance();
        Ok(literal)
    }
}

#[cfg(test)]
mod tests {
    use crate::open_cypher_parser::ast::*;
    use crate::open_cypher_parser::errors::OpenCypherParsingError;
    use crate::open_cypher_parser::parse_query;

    fn first_path(query: &str) -> PathExpression {
        let parsed = parse_query(query).unwrap();
        let clause = parsed.match_clause.unwrap();
        let (_, path) = clause.patterns().next().unwrap();
        path.clone()
    }

    #[test]
    fn test_node_with_labels_and_properties() {
        let path = first_path("MATCH (u:User:Admin {name: 'alice', age: 30, score: -1.5}) RETURN u");
        assert_eq!(path.start.variable.as_ref().unwrap().name, "u");
        assert_eq!(path.start.labels, vec!["User", "Admin"]);
        assert_eq!(
            path.start.properties,
            vec![
                PropertyConstraint {
                    key: "name".to_string(),
                    value: Literal::String("alice".to_string())
                },
                PropertyConstraint {
                    key: "age".to_string(),
                    value: Literal::Integer(30)
                },
                PropertyConstraint {
                    key: "score".to_string(),
                    value: Literal::Float(-1.5)
                },
            ]
        );
    }

    #[test]
    fn test_anonymous_node() {
        let path = first_path("MATCH () RETURN 1");
        assert!(path.start.variable.is_none());
        assert!(path.start.labels.is_empty());
    }

    #[test]
    fn test_relationship_directions() {
        let cases = [
            ("MATCH (a)-[:R]->(b) RETURN a", Direction::Outgoing),
            ("MATCH (a)<-[:R]-(b) RETURN a", Direction::Incoming),
            ("MATCH (a)-[:R]-(b) RETURN a", Direction::Either),
            ("MATCH (a)-->(b) RETURN a", Direction::Outgoing),
            ("MATCH (a)<--(b) RETURN a", Direction::Incoming),
            ("MATCH (a)--(b) RETURN a", Direction::Either),
            ("MATCH (a)<-[:R]->(b) RETURN a", Direction::Either),
        ];
        for (query, expected) in cases {
            let path = first_path(query);
            assert_eq!(path.steps[0].relationship.direction, expected, "{}", query);
        }
    }

    #[test]
    fn test_relationship_types_and_variable() {
        let path = first_path("MATCH (a)-[r:KNOWS|:FOLLOWS|LIKES {since: 2020}]->(b) RETURN r");
        let rel = &path.steps[0].relationship;
        assert_eq!(rel.variable.as_ref().unwrap().name, "r");
        assert_eq!(rel.types, vec!["KNOWS", "FOLLOWS", "LIKES"]);
        assert_eq!(rel.properties.len(), 1);
        assert!(rel.length.is_none());
    }

    #[test]
    fn test_path_length_forms() {
        let cases = [
            ("*", PathLength::unbounded()),
            ("*3", PathLength::fixed(3)),
            ("*1..3", PathLength::range(1, 3).unwrap()),
            ("*..4", PathLength::range(1, 4).unwrap()),
            ("*2..", PathLength::at_least(2)),
            ("*..", PathLength::unbounded()),
            ("*0..2", PathLength::range(0, 2).unwrap()),
        ];
        for (suffix, expected) in cases {
            let query = format!("MATCH (a)-[:KNOWS{}]->(b) RETURN b", suffix);
            let path = first_path(&query);
            assert_eq!(path.steps[0].relationship.length, Some(expected), "{}", suffix);
        }
    }

    #[test]
    fn test_inverted_range_is_syntax_error() {
        let err = parse_query("MATCH (a)-[:KNOWS*3..1]->(b) RETURN b").unwrap_err();
        match err {
            OpenCypherParsingError::Syntax { found, .. } => {
                assert!(found.contains("minimum hops (3)"), "{}", found)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_multi_hop_chain() {
        let path = first_path("MATCH (a:User)-[:MEMBER_OF]->(g:Group)<-[:MEMBER_OF]-(b:User) RETURN a, b");
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.end().labels, vec!["User"]);
        assert_eq!(path.nodes().count(), 3);
    }

    #[test]
    fn test_unclosed_node_pattern() {
        let err = parse_query("MATCH (n RETURN n").unwrap_err();
        assert!(matches!(
            err,
            OpenCypherParsingError::Syntax { ref expected, .. } if expected == "')' closing the node pattern"
        ));
    }

    #[test]
    fn test_missing_end_node() {
        assert!(parse_query("MATCH (n)-[:R]-> RETURN n").is_err());
        assert!(parse_query("MATCH (n)-[:R] RETURN n").is_err());
    }

    #[test]
    fn test_all_shortest_paths() {
        let path = first_path("MATCH allShortestPaths((a)-[*..5]->(b)) RETURN a");
        assert_eq!(path.kind, PathKind::AllShortestPaths);
        assert!(path.variable.is_none());
    }

    #[test]
    fn test_chain_depth_guard() {
        let chain = "-->()".repeat(60);
        let query = format!("MATCH (){} RETURN 1", chain);
        assert!(parse_query(&query).is_err());
    }
}
