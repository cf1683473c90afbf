//! SQL bridge to the execution engine. Renders query trees as SQL so the
//! original and the rewritten form of a query can both be run (and diffed)
//! against SQLite.

use anyhow::{bail, Result};
use itertools::Itertools;
use rusqlite::types::ValueRef;

use crate::ast::{ArithOp, Condition, Expr, FilterEntry, Literal, Operand, Operator, Query, Select};

/// Only selects have a SQL form; other statements are carried verbatim by
/// the rewriter and cannot be rendered.
pub fn to_sql(query: &Query) -> Result<String> {
    match query {
        Query::Select(select) => select_to_sql(select),
        Query::Other(other) => bail!("cannot render {:?} statement as SQL", other.verb),
    }
}

pub fn select_to_sql(select: &Select) -> Result<String> {
    let mut s = String::new();
    s.push_str("SELECT ");
    if select.projection.is_empty() {
        s.push('*');
    } else {
        s.push_str(&select.projection.iter().join(", "));
    }

    s.push_str("\nFROM ");
    s.push_str(&select.table);

    if !select.filter.is_empty() {
        s.push_str("\nWHERE ");
        s.push_str(
            &select
                .filter
                .iter()
                .map(entry_to_sql)
                .collect::<Result<Vec<_>>>()?
                .join("\n  AND "),
        );
    }

    if !select.group.is_empty() {
        s.push_str("\nGROUP BY ");
        s.push_str(&select.group.iter().join(", "));
    }

    Ok(s)
}

fn entry_to_sql(entry: &FilterEntry) -> Result<String> {
    match entry {
        FilterEntry::Condition(cond) => condition_to_sql(cond),
        FilterEntry::Opaque(expr) => expr_to_sql(expr),
    }
}

fn condition_to_sql(cond: &Condition) -> Result<String> {
    Ok(match (cond.op, &cond.operand) {
        (Operator::In, Operand::List(items)) => {
            if items.is_empty() {
                // SQL has no empty IN list.
                "1 = 0".to_owned()
            } else {
                format!(
                    "{} IN ({})",
                    cond.column,
                    items.iter().map(literal_to_sql).join(", ")
                )
            }
        }
        (Operator::Within, Operand::List(items)) => {
            if items.len() != 2 {
                bail!("within requires a two-element list");
            }
            format!(
                "{} BETWEEN {} AND {}",
                cond.column,
                literal_to_sql(&items[0]),
                literal_to_sql(&items[1])
            )
        }
        (Operator::In | Operator::Within, Operand::Scalar(_)) => {
            bail!("{:?} requires a list operand", cond.op)
        }
        (op, Operand::Scalar(value)) => {
            format!("{} {} {}", cond.column, cmp_to_sql(op)?, literal_to_sql(value))
        }
        (op, Operand::List(_)) => bail!("no SQL form for {:?} against a list", op),
    })
}

fn expr_to_sql(expr: &Expr) -> Result<String> {
    Ok(match expr {
        Expr::Column(name) => name.clone(),
        Expr::Literal(value) => literal_to_sql(value),
        Expr::List(items) => format!("({})", items.iter().map(literal_to_sql).join(", ")),
        Expr::Call { func, args } => format!(
            "{}({})",
            func,
            args.iter()
                .map(expr_to_sql)
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        ),
        Expr::Arith { op, lhs, rhs } => format!(
            "({} {} {})",
            expr_to_sql(lhs)?,
            arith_to_sql(*op),
            expr_to_sql(rhs)?
        ),
        Expr::Cmp {
            op: Operator::Within,
            lhs,
            rhs,
        } => match rhs.as_ref() {
            Expr::List(items) if items.len() == 2 => format!(
                "{} BETWEEN {} AND {}",
                expr_to_sql(lhs)?,
                literal_to_sql(&items[0]),
                literal_to_sql(&items[1])
            ),
            _ => bail!("within requires a two-element list"),
        },
        Expr::Cmp { op, lhs, rhs } => format!(
            "{} {} {}",
            expr_to_sql(lhs)?,
            cmp_to_sql(*op)?,
            expr_to_sql(rhs)?
        ),
    })
}

fn cmp_to_sql(op: Operator) -> Result<&'static str> {
    Ok(match op {
        Operator::Eq => "=",
        Operator::Ne => "<>",
        Operator::Lt => "<",
        Operator::Gt => ">",
        Operator::Le => "<=",
        Operator::Ge => ">=",
        Operator::In => "IN",
        Operator::Like => "LIKE",
        Operator::Within => bail!("within requires a two-element list"),
    })
}

fn arith_to_sql(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Div => "/",
        ArithOp::Mod => "%",
    }
}

pub fn literal_to_sql(value: &Literal) -> String {
    match value {
        Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        Literal::Integer(n) => n.to_string(),
    }
}

pub fn literal_from_ref(value: ValueRef) -> Result<Literal> {
    match value {
        ValueRef::Integer(x) => Ok(Literal::Integer(x.into())),
        ValueRef::Text(s) => Ok(Literal::String(std::str::from_utf8(s)?.to_owned())),
        value => bail!("unsupported value type {:?}", value),
    }
}
