use anyhow::Result;
use log::debug;
use num_bigint::BigInt;

use crate::ast::{ColumnName, Condition, Filter, FilterEntry, Literal, Operand, Operator, Query, Select};
use crate::dims::DimTable;
use crate::parser::{parse_query, ParsedQuery, ParsedSelect};

pub const DEFAULT_ID_COLUMN: &str = "int";

/// Rewrites filters over logical partition columns into filters over the
/// physical partition id column, using a dimension table as the oracle.
///
/// Pure per call: nothing is cached or mutated between invocations, so a
/// rewriter can serve any number of queries, and distinct dimension tables
/// get distinct rewriters.
#[derive(Clone, Debug)]
pub struct Rewriter<'a> {
    dims: &'a DimTable,
    id_column: ColumnName,
}

impl<'a> Rewriter<'a> {
    pub fn new(dims: &'a DimTable) -> Self {
        Self::with_id_column(dims, DEFAULT_ID_COLUMN)
    }

    pub fn with_id_column(dims: &'a DimTable, id_column: impl Into<ColumnName>) -> Self {
        Self {
            dims,
            id_column: id_column.into(),
        }
    }

    /// A condition can be answered by the dimension table only if it is an
    /// exact-equality or membership test on a partition column. Everything
    /// else (other operators, other columns, shape-mismatched operands,
    /// derived expressions) is opaque and preserved verbatim. Never an
    /// error: a missed rewrite only costs performance.
    fn is_translatable(&self, entry: &FilterEntry) -> bool {
        match entry {
            FilterEntry::Condition(cond) => {
                let shape_ok = matches!(
                    (cond.op, &cond.operand),
                    (Operator::Eq, Operand::Scalar(_)) | (Operator::In, Operand::List(_))
                );
                shape_ok && self.dims.is_partition_column(&cond.column)
            }
            FilterEntry::Opaque(_) => false,
        }
    }

    /// Collapse every translatable condition into a single membership
    /// condition on the id column, placed first, followed by the opaque
    /// conditions in their original order.
    ///
    /// A filter with nothing to translate is returned unchanged; rewriting
    /// it anyway would synthesize a membership over the whole dimension
    /// table for no benefit. The id column is never itself a partition
    /// column, so a second pass finds nothing to translate and the rewrite
    /// is idempotent.
    pub fn rewrite_filter(&self, filter: Filter) -> Filter {
        let translatable: Vec<&Condition> = filter
            .iter()
            .filter_map(|entry| match entry {
                FilterEntry::Condition(cond) if self.is_translatable(entry) => Some(cond),
                _ => None,
            })
            .collect();

        if translatable.is_empty() {
            return filter;
        }

        let ids = self.dims.matching_ids(&translatable);
        debug!(
            "rewrote {} conditions into {} partition ids",
            translatable.len(),
            ids.len()
        );

        let membership = Condition {
            op: Operator::In,
            column: self.id_column.clone(),
            operand: Operand::List(
                ids.into_iter()
                    .map(|id| Literal::Integer(BigInt::from(id)))
                    .collect(),
            ),
        };

        let mut rewritten = vec![FilterEntry::Condition(membership)];
        rewritten.extend(
            filter
                .into_iter()
                .filter(|entry| !self.is_translatable(entry)),
        );
        rewritten
    }

    /// Rewrite the filter slot of a plain filtered select. Any other
    /// statement is returned exactly as received.
    pub fn translate(&self, query: Query) -> Query {
        match query {
            Query::Select(Select {
                table,
                filter,
                group,
                projection,
            }) => Query::Select(Select {
                table,
                filter: self.rewrite_filter(filter),
                group,
                projection,
            }),
            other @ Query::Other(_) => other,
        }
    }

    /// Parse and rewrite a textual query. The result is always a tree, never
    /// text, even when the statement is unsupported or nothing was
    /// rewritten.
    pub fn translate_text(&self, code: &str) -> Result<Query> {
        Ok(self.translate(normalize(parse_query(code)?)))
    }
}

/// The parser wraps a select's filter slot in one extra layer of nesting
/// relative to a hand-built tree. Unwrap exactly that layer, so both input
/// forms reach the rewriter structurally identical.
///
/// Precondition: `parsed` is direct parser output (at most one group in the
/// filter slot). Postcondition: the filter slot is a flat condition list.
/// This is a quirk-correction, not a general deep-flatten.
pub fn normalize(parsed: ParsedQuery) -> Query {
    match parsed {
        ParsedQuery::Select(ParsedSelect {
            table,
            filter,
            group,
            projection,
        }) => Query::Select(Select {
            table,
            filter: filter.into_iter().flatten().collect(),
            group,
            projection,
        }),
        ParsedQuery::Other(other) => Query::Other(other),
    }
}
