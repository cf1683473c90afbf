use std::borrow::BorrowMut;

use anyhow::{Context, Result};
use pest::Parser as _;
use pest_derive::Parser;

use crate::ast::{
    ArithOp, ColumnName, Condition, Expr, Filter, FilterEntry, Literal, Operand, Operator,
    TableName, Unsupported,
};

#[derive(Parser)]
#[grammar = "parq.pest"]
struct Parser;

type Pair<'a> = pest::iterators::Pair<'a, Rule>;
type Pairs<'a> = pest::iterators::Pairs<'a, Rule>;

/// Parser output. Same shape as `ast::Query` except that a select's filter
/// slot carries one extra layer of nesting: the where clause comes out as a
/// group of conditions, not a flat condition list. `rewrite::normalize`
/// unwraps that layer before any rewriting happens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedQuery {
    Select(ParsedSelect),
    Other(Unsupported),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedSelect {
    pub table: TableName,
    pub filter: Vec<Filter>,
    pub group: Vec<ColumnName>,
    pub projection: Vec<ColumnName>,
}

pub fn parse_query(code: &str) -> Result<ParsedQuery> {
    let statement = Parser::parse(Rule::statement, code)
        .context("Failed to parse input")?
        .next()
        .unwrap();

    let inner = statement.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::select_stmt => Ok(ParsedQuery::Select(ParsedSelect::from(inner))),
        Rule::other_stmt => Ok(ParsedQuery::Other(Unsupported::from(inner))),
        _ => unreachable!(),
    }
}

fn expect_next_rule<'a, P: BorrowMut<Pairs<'a>>>(mut pairs: P, rule: Rule) -> Pair<'a> {
    let pair = pairs.borrow_mut().next().expect("missing pair");
    assert_eq!(pair.as_rule(), rule);
    pair
}

fn convert_identifier(pair: Pair) -> String {
    assert_eq!(pair.as_rule(), Rule::identifier);
    pair.as_str().to_string()
}

impl From<Pair<'_>> for ParsedSelect {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::select_stmt);

        let mut table = TableName::new();
        let mut filter = vec![];
        let mut group = vec![];
        let mut projection = vec![];

        for pair in pair.into_inner() {
            match pair.as_rule() {
                Rule::kw_select | Rule::kw_from => {}
                Rule::projection => {
                    projection = pair.into_inner().map(convert_identifier).collect();
                }
                Rule::by_clause => {
                    group = pair
                        .into_inner()
                        .filter(|pair| pair.as_rule() == Rule::identifier)
                        .map(convert_identifier)
                        .collect();
                }
                Rule::identifier => table = convert_identifier(pair),
                Rule::where_clause => {
                    filter = vec![pair
                        .into_inner()
                        .filter(|pair| pair.as_rule() == Rule::condition)
                        .map(FilterEntry::from)
                        .collect()];
                }
                _ => unreachable!(),
            }
        }

        Self {
            table,
            filter,
            group,
            projection,
        }
    }
}

impl From<Pair<'_>> for FilterEntry {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::condition);
        let mut pairs = pair.into_inner();
        let lhs = Expr::from(expect_next_rule(&mut pairs, Rule::expr));
        let op = convert_operator(expect_next_rule(&mut pairs, Rule::cmp_op).as_str());
        let rhs = Expr::from(expect_next_rule(&mut pairs, Rule::expr));

        // Only a plain column compared against a scalar or a list has the
        // atomic triplet shape; everything else stays an opaque expression.
        match (lhs, rhs) {
            (Expr::Column(column), Expr::Literal(value)) => FilterEntry::Condition(Condition {
                op,
                column,
                operand: Operand::Scalar(value),
            }),
            (Expr::Column(column), Expr::List(items)) => FilterEntry::Condition(Condition {
                op,
                column,
                operand: Operand::List(items),
            }),
            (lhs, rhs) => FilterEntry::Opaque(Expr::Cmp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }),
        }
    }
}

impl From<Pair<'_>> for Expr {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::expr);
        let mut pairs = pair.into_inner();
        let mut expr = convert_term(pairs.next().expect("empty expression"));

        while let Some(op_pair) = pairs.next() {
            let op = convert_arith_op(op_pair.as_str());
            let rhs = convert_term(pairs.next().expect("missing operand"));
            expr = Expr::Arith {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }

        expr
    }
}

fn convert_term(pair: Pair) -> Expr {
    assert_eq!(pair.as_rule(), Rule::term);
    let inner = pair.into_inner().next().expect("empty term");
    match inner.as_rule() {
        Rule::func_call => {
            let mut pairs = inner.into_inner();
            let func = convert_identifier(pairs.next().expect("missing function name"));
            let args = pairs.map(Expr::from).collect();
            Expr::Call { func, args }
        }
        Rule::list => Expr::List(inner.into_inner().map(Literal::from).collect()),
        Rule::literal => Expr::Literal(Literal::from(inner)),
        Rule::identifier => Expr::Column(convert_identifier(inner)),
        Rule::expr => Expr::from(inner),
        _ => unreachable!(),
    }
}

impl From<Pair<'_>> for Literal {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::literal);
        let inner = pair.into_inner().next().expect("empty literal");
        match inner.as_rule() {
            Rule::string_literal => {
                let interior = expect_next_rule(inner.into_inner(), Rule::string_interior);
                Self::String(interior.as_str().to_string())
            }
            Rule::integer_literal => {
                Self::Integer(inner.as_str().parse().expect("invalid integer"))
            }
            _ => unreachable!(),
        }
    }
}

impl From<Pair<'_>> for Unsupported {
    fn from(pair: Pair<'_>) -> Self {
        assert_eq!(pair.as_rule(), Rule::other_stmt);
        let text = pair.as_str().to_string();
        let verb = expect_next_rule(pair.into_inner(), Rule::other_verb)
            .as_str()
            .to_string();
        Self { verb, text }
    }
}

fn convert_operator(s: &str) -> Operator {
    match s {
        "=" => Operator::Eq,
        "<>" => Operator::Ne,
        "<" => Operator::Lt,
        ">" => Operator::Gt,
        "<=" => Operator::Le,
        ">=" => Operator::Ge,
        "in" => Operator::In,
        "within" => Operator::Within,
        "like" => Operator::Like,
        _ => unreachable!(),
    }
}

fn convert_arith_op(s: &str) -> ArithOp {
    match s {
        "+" => ArithOp::Add,
        "-" => ArithOp::Sub,
        "*" => ArithOp::Mul,
        "/" => ArithOp::Div,
        "%" => ArithOp::Mod,
        _ => unreachable!(),
    }
}
