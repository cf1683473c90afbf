use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

use crate::ast::{ColumnName, Condition, Literal, Operand, Operator};
use crate::sql::literal_from_ref;

/// Position of a row in the dimension table. Physical partitions are named
/// by this id, so a row's position must never change once data has been
/// written against it; the table may only be appended to.
pub type PartitionId = u64;

/// Read-only view over the table enumerating every known combination of
/// logical partition-column values. Its column names are the partition
/// column set; its row positions are the partition ids.
#[derive(Clone, Debug, Default)]
pub struct DimTable {
    columns: Vec<ColumnName>,
    rows: Vec<Vec<Literal>>,
}

impl DimTable {
    pub fn new(columns: Vec<ColumnName>, rows: Vec<Vec<Literal>>) -> Result<Self> {
        for row in &rows {
            if row.len() != columns.len() {
                bail!(
                    "dimension row has {} values, expected {}",
                    row.len(),
                    columns.len()
                );
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if rows[..i].contains(row) {
                bail!("duplicate dimension row {:?}", row);
            }
        }
        Ok(Self { columns, rows })
    }

    /// Read the enumeration from SQLite in rowid order. Row position in the
    /// stored table is the partition id.
    pub fn load(conn: &Connection, table: &str) -> Result<Self> {
        let mut stmt = conn
            .prepare(&format!("SELECT * FROM {}", table))
            .with_context(|| format!("Failed to read dimension table {:?}", table))?;

        let columns: Vec<ColumnName> = stmt
            .column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let mut raw_rows = stmt.query([])?;
        let mut rows = vec![];
        while let Some(row) = raw_rows.next()? {
            rows.push(
                (0..columns.len())
                    .map(|i| literal_from_ref(row.get_ref(i)?))
                    .collect::<Result<Vec<_>>>()?,
            );
        }

        info!(
            "loaded dimension table {:?}: {} columns, {} rows",
            table,
            columns.len(),
            rows.len()
        );
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[ColumnName] {
        &self.columns
    }

    pub fn is_partition_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct partition ids of rows satisfying the conjunction of all
    /// conditions. A combination present in the partitioned data but missing
    /// here silently under-matches; keeping this table a superset of every
    /// combination ever written is the maintainer's invariant, not checked
    /// here.
    pub fn matching_ids(&self, conds: &[&Condition]) -> BTreeSet<PartitionId> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| conds.iter().all(|cond| self.holds(cond, row)))
            .map(|(id, _)| id as PartitionId)
            .collect()
    }

    fn holds(&self, cond: &Condition, row: &[Literal]) -> bool {
        let index = match self.columns.iter().position(|c| c == &cond.column) {
            Some(index) => index,
            None => return false,
        };
        let field = &row[index];
        match (cond.op, &cond.operand) {
            (Operator::Eq, Operand::Scalar(value)) => field == value,
            (Operator::In, Operand::List(values)) => values.contains(field),
            _ => false,
        }
    }
}
