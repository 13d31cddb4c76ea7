use super::ast::{OrderByItem, ReturnClause, SortOrder};
use super::errors::OpenCypherParsingError;
use super::lexer::TokenKind;
use super::TokenParser;

impl TokenParser {
    /// `('ORDER' 'BY' Item (',' Item)*)? ('LIMIT' n ('SKIP' n)? | 'SKIP' n ('LIMIT' n)?)?`
    ///
    /// SKIP and LIMIT are accepted in either order.
    pub(super) fn parse_order_by_and_page(
        &mut self,
        clause: &mut ReturnClause,
    ) -> Result<(), OpenCypherParsingError> {
        if self.eat(&TokenKind::Order) {
            self.expect(&TokenKind::By, "BY after ORDER")?;
            loop {
                let expression = self.parse_expression()?;
                let order = if self.eat(&TokenKind::Desc) {
                    SortOrder::Desc
                } else {
                    self.eat(&TokenKind::Asc);
                    SortOrder::Asc
                };
                clause.order_by.push(OrderByItem { expression, order });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        if self.eat(&TokenKind::Limit) {
            clause.limit = Some(self.expect_count("non-negative integer after LIMIT")?);
            if self.eat(&TokenKind::Skip) {
                clause.skip = Some(self.expect_count("non-negative integer after SKIP")?);
            }
        } else if self.eat(&TokenKind::Skip) {
            clause.skip = Some(self.expect_count("non-negative integer after SKIP")?);
            if self.eat(&TokenKind::Limit) {
                clause.limit = Some(self.expect_count("non-negative integer after LIMIT")?);
            }
        }
        Ok(())
    }
}
