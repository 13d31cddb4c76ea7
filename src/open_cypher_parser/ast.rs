use serde::Serialize;
use std::fmt;

use super::errors::AstValidationError;

/// Location of a token or node in the query text (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Position {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A variable name together with where it appeared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub name: String,
    pub position: Position,
}

impl Identifier {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Identifier {
            name: name.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    /// `None` only for a bare `RETURN ...` query.
    pub match_clause: Option<MatchClause>,
    pub where_clause: Option<WhereClause>,
    pub return_clause: ReturnClause,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchClause {
    parts: Vec<MatchPart>,
}

impl MatchClause {
    pub fn new(parts: Vec<MatchPart>) -> Result<Self, AstValidationError> {
        if parts.is_empty() {
            return Err(AstValidationError::EmptyMatch);
        }
        if let Some(part) = parts.iter().find(|p| p.patterns.is_empty()) {
            return Err(AstValidationError::EmptyMatchPart {
                position: part.position,
            });
        }
        Ok(MatchClause { parts })
    }

    pub fn parts(&self) -> &[MatchPart] {
        &self.parts
    }

    /// All path expressions in source order, with their OPTIONAL flag.
    pub fn patterns(&self) -> impl Iterator<Item = (bool, &PathExpression)> {
        self.parts
            .iter()
            .flat_map(|part| part.patterns.iter().map(move |p| (part.optional, p)))
    }

    pub fn has_optional(&self) -> bool {
        self.parts.iter().any(|p| p.optional)
    }
}

/// One `MATCH` or `OPTIONAL MATCH` keyword and the patterns that follow it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPart {
    pub optional: bool,
    pub patterns: Vec<PathExpression>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathKind {
    Pattern,
    ShortestPath,
    AllShortestPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathExpression {
    /// `p` in `p = (a)-->(b)`
    pub variable: Option<Identifier>,
    pub kind: PathKind,
    pub start: NodePattern,
    pub steps: Vec<PathStep>,
    pub position: Position,
}

impl PathExpression {
    pub fn nodes(&self) -> impl Iterator<Item = &NodePattern> {
        std::iter::once(&self.start).chain(self.steps.iter().map(|s| &s.node))
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipPattern> {
        self.steps.iter().map(|s| &s.relationship)
    }

    pub fn end(&self) -> &NodePattern {
        self.steps.last().map(|s| &s.node).unwrap_or(&self.start)
    }

    pub fn has_variable_length(&self) -> bool {
        self.relationships().any(|r| r.length.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub relationship: RelationshipPattern,
    pub node: NodePattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePattern {
    pub variable: Option<Identifier>,
    pub labels: Vec<String>,
    pub properties: Vec<PropertyConstraint>,
    pub position: Position,
}

/// `{key: literal}` entry inside a node or relationship pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyConstraint {
    pub key: String,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipPattern {
    pub variable: Option<Identifier>,
    pub types: Vec<String>,
    pub direction: Direction,
    pub properties: Vec<PropertyConstraint>,
    /// `None` for a plain single hop.
    pub length: Option<PathLength>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Outgoing, // `->`
    Incoming, // `<-`
    Either,   // `-`
}

impl Direction {
    /// Direction of the same relationship read from its other end.
    pub fn reversed(self) -> Direction {
        match self {
            Direction::Outgoing => Direction::Incoming,
            Direction::Incoming => Direction::Outgoing,
            Direction::Either => Direction::Either,
        }
    }
}

/// Hop count of a variable-length relationship.
///
/// `*3` is `min = max = 3`, `*1..3` is a range, `*2..` has no upper bound and
/// a bare `*` is `min = 1` with no upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PathLength {
    min: u32,
    max: Option<u32>,
}

impl PathLength {
    pub fn fixed(hops: u32) -> Self {
        PathLength {
            min: hops,
            max: Some(hops),
        }
    }

    pub fn range(min: u32, max: u32) -> Result<Self, AstValidationError> {
        if min > max {
            return Err(AstValidationError::InvalidPathLength { min, max });
        }
        Ok(PathLength {
            min,
            max: Some(max),
        })
    }

    pub fn at_least(min: u32) -> Self {
        PathLength { min, max: None }
    }

    pub fn unbounded() -> Self {
        PathLength { min: 1, max: None }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    pub fn is_bounded(&self) -> bool {
        self.max.is_some()
    }
}

impl fmt::Display for PathLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "*{}", max),
            Some(max) => write!(f, "*{}..{}", self.min, max),
            None if self.min == 1 => write!(f, "*"),
            None => write!(f, "*{}..", self.min),
        }
    }
}

/// Closed set of literal values. Every consumer matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{:?}", v),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereClause {
    pub condition: Condition,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    Comparison(Comparison),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// `expr IS NULL` / `expr IS NOT NULL`
    IsNull {
        expression: Expression,
        negated: bool,
    },
    /// A bare boolean operand such as `u.enabled` or `contains(u.name, 'adm')`.
    Predicate(Expression),
}

impl Condition {
    /// Top-level AND operands, left to right.
    pub fn conjuncts(&self) -> Vec<&Condition> {
        match self {
            Condition::And(left, right) => {
                let mut out = left.conjuncts();
                out.extend(right.conjuncts());
                out
            }
            other => vec![other],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub operator: ComparisonOperator,
    pub left: Expression,
    pub right: Expression,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    Equal,            // =
    NotEqual,         // <> or !=
    LessThan,         // <
    GreaterThan,      // >
    LessThanEqual,    // <=
    GreaterThanEqual, // >=
    In,
    StartsWith,
    EndsWith,
    Contains,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComparisonOperator::Equal => "=",
            ComparisonOperator::NotEqual => "<>",
            ComparisonOperator::LessThan => "<",
            ComparisonOperator::GreaterThan => ">",
            ComparisonOperator::LessThanEqual => "<=",
            ComparisonOperator::GreaterThanEqual => ">=",
            ComparisonOperator::In => "IN",
            ComparisonOperator::StartsWith => "STARTS WITH",
            ComparisonOperator::EndsWith => "ENDS WITH",
            ComparisonOperator::Contains => "CONTAINS",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expression {
    Literal(Literal),
    Variable(Identifier),
    Property(PropertyAccess),
    FunctionCall(FunctionCall),
    Aggregate(AggregateCall),
    List(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyAccess {
    pub variable: Identifier,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    pub distinct: bool,
    /// `None` for `count(*)`.
    pub argument: Option<Box<Expression>>,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Collect,
}

impl AggregateFunction {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "collect" => Some(AggregateFunction::Collect),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Collect => "collect",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(lit) => write!(f, "{}", lit),
            Expression::Variable(id) => write!(f, "{}", id.name),
            Expression::Property(prop) => write!(f, "{}.{}", prop.variable.name, prop.key),
            Expression::FunctionCall(call) => {
                write!(f, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Aggregate(agg) => {
                write!(f, "{}(", agg.function.name())?;
                if agg.distinct {
                    write!(f, "DISTINCT ")?;
                }
                match &agg.argument {
                    Some(arg) => write!(f, "{})", arg),
                    None => write!(f, "*)"),
                }
            }
            Expression::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Expression {
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate(_) => true,
            Expression::FunctionCall(call) => call.args.iter().any(|a| a.contains_aggregate()),
            Expression::List(items) => items.iter().any(|a| a.contains_aggregate()),
            Expression::Literal(_) | Expression::Variable(_) | Expression::Property(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnClause {
    pub distinct: bool,
    items: Vec<ReturnItem>,
    pub order_by: Vec<OrderByItem>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub position: Position,
}

impl ReturnClause {
    pub fn new(
        distinct: bool,
        items: Vec<ReturnItem>,
        position: Position,
    ) -> Result<Self, AstValidationError> {
        if items.is_empty() {
            return Err(AstValidationError::EmptyReturn { position });
        }
        Ok(ReturnClause {
            distinct,
            items,
            order_by: Vec::new(),
            skip: None,
            limit: None,
            position,
        })
    }

    pub fn items(&self) -> &[ReturnItem] {
        &self.items
    }

    pub fn has_aggregates(&self) -> bool {
        self.items.iter().any(|item| match item {
            ReturnItem::Expression { expression, .. } => expression.contains_aggregate(),
            ReturnItem::Wildcard(_) => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReturnItem {
    /// `RETURN *`
    Wildcard(Position),
    Expression {
        expression: Expression,
        alias: Option<Identifier>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderByItem {
    pub expression: Expression,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    Asc,
    Desc,
}
