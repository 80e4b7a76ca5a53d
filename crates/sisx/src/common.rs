//! 📦 Common data structures: the building blocks of sisx
//!
//! 🎬 COLD OPEN. INT. SOURCE-OF-RECORD DATABASE, 2:13 AM
//!
//! A cursor opens. Somewhere in a view called something like `ETS_ENROLLMENTV01_VW`,
//! a row wakes up. It has a section id, a term id, a campus uid, and a `LAST_UPDATED`
//! column that insists it is UTC. (It is not UTC. We will get to that.)
//!
//! This module holds the humble structs that carry those rows from the driver to the
//! serializer: a [`Row`] is an ordered bag of [`CellValue`]s, nothing more. No schema.
//! No opinions. Column names ride alongside in the cursor, not in the row.
//!
//! 🧠 Knowledge graph:
//! - Produced by: `backends::*` sources (Oracle, in-memory)
//! - Consumed by: `serializer::RowWriter`
//! - Ordering is sacred: cells stay in SELECT order, rows stay in cursor order.
//!
//! 🦆

use chrono::NaiveDateTime;

/// 🧩 One scalar cell of a result row.
///
/// Heterogeneous on purpose: the driver hands us text, numbers, timestamps and the
/// occasional void (`NULL`). The serializer decides how each renders.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 🕳️ SQL `NULL`. Renders as an empty field. Delimiters stay put.
    Null,
    /// 📝 Plain text, rendered as-is (modulo delimiter hygiene).
    Text(String),
    /// 🔢 A driver-formatted numeric. Oracle `NUMBER` arrives as text so we never
    /// round a grade point average into a crime.
    Number(String),
    /// 🔢 Integer cell, mostly from test fixtures and drivers that know better.
    Integer(i64),
    /// 🌊 Floating point, for the rare column that insists.
    Float(f64),
    /// 🕰️ Naive wall-clock timestamp. The zone story is told by the serializer.
    Timestamp(NaiveDateTime),
}

impl CellValue {
    /// 📝 Shorthand for text cells, because `CellValue::Text("x".to_string())` gets old.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(CellValue::Text).unwrap_or(CellValue::Null)
    }
}

/// 📄 A result row: cells in SELECT order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub cells: Vec<CellValue>,
}

impl Row {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// 🎯 First cell as text, if any. Used for single-column lookups like term ids.
    pub fn first_as_string(&self) -> Option<String> {
        match self.cells.first()? {
            CellValue::Null => None,
            CellValue::Text(s) | CellValue::Number(s) => Some(s.clone()),
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Timestamp(ts) => Some(ts.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_first_cell_becomes_a_term_id() {
        let row = Row::new(vec![CellValue::Number("2248".into()), CellValue::Null]);
        assert_eq!(row.first_as_string().as_deref(), Some("2248"));
    }

    #[test]
    fn the_one_where_a_null_first_cell_is_nobody() {
        let row = Row::new(vec![CellValue::Null]);
        assert_eq!(row.first_as_string(), None);
        assert_eq!(Row::default().first_as_string(), None);
    }

    #[test]
    fn the_one_where_optional_strings_know_their_nulls() {
        assert_eq!(CellValue::from(None::<String>), CellValue::Null);
        assert_eq!(CellValue::from(Some("x".to_string())), CellValue::text("x"));
    }
}
