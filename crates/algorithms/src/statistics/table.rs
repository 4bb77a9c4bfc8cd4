//! Per-polygon result tables

use gridzonal_core::vector::PolygonId;
use gridzonal_core::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;

/// Where a row's value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    /// Mean of the polygon's own cells
    Computed,
    /// Copied from the nearest preceding row with a value
    ForwardFilled,
    /// Copied from the nearest following row with a value
    BackwardFilled,
    /// No value yet
    Absent,
}

/// One polygon's result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZonalRow {
    pub id: PolygonId,
    /// Position of the polygon in the input layer
    pub sequence: usize,
    pub value: Option<f64>,
    /// Number of valid cells that contributed to a computed value
    pub valid_cells: usize,
    pub origin: ValueOrigin,
}

impl ZonalRow {
    /// Row for a polygon, `Computed` when `value` is present
    pub fn new(id: PolygonId, sequence: usize, value: Option<f64>, valid_cells: usize) -> Self {
        let origin = if value.is_some() {
            ValueOrigin::Computed
        } else {
            ValueOrigin::Absent
        };
        Self { id, sequence, value, valid_cells, origin }
    }
}

/// Results keyed by polygon id, kept in input order.
///
/// Lookups go through the id index, never through row position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZonalTable {
    rows: Vec<ZonalRow>,
    index: HashMap<PolygonId, usize>,
}

impl ZonalTable {
    /// Build a table from rows in order, rejecting duplicate ids
    pub fn new(rows: Vec<ZonalRow>) -> Result<Self> {
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            if index.insert(row.id.clone(), position).is_some() {
                return Err(Error::DuplicateId(row.id.to_string()));
            }
        }
        Ok(Self { rows, index })
    }

    /// Build a table of computed/absent rows from `(id, value)` pairs
    pub fn from_values<I, K>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Option<f64>)>,
        K: Into<PolygonId>,
    {
        let rows = values
            .into_iter()
            .enumerate()
            .map(|(sequence, (id, value))| ZonalRow::new(id.into(), sequence, value, 0))
            .collect();
        Self::new(rows)
    }

    pub fn rows(&self) -> &[ZonalRow] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [ZonalRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZonalRow> {
        self.rows.iter()
    }

    /// Row for polygon `id`
    pub fn get(&self, id: &PolygonId) -> Option<&ZonalRow> {
        self.index.get(id).map(|&position| &self.rows[position])
    }

    /// Number of rows without a value
    pub fn absent_count(&self) -> usize {
        self.rows.iter().filter(|row| row.value.is_none()).count()
    }

    /// Convert into a table where every polygon has a value.
    ///
    /// # Errors
    /// [`Error::UnresolvableGap`] if any row is still absent. After
    /// [`fill_gaps`](super::fill_gaps) this only happens when no polygon
    /// produced a value at all.
    pub fn into_complete(self) -> Result<CompleteTable> {
        let absent = self.absent_count();
        if absent > 0 {
            return Err(Error::UnresolvableGap { rows: absent });
        }

        let ZonalTable { rows, index } = self;
        let filled = rows
            .iter()
            .filter(|row| row.origin != ValueOrigin::Computed)
            .count();
        // No row is absent here, so positions in `index` stay valid
        let rows = rows
            .into_iter()
            .filter_map(|row| row.value.map(|value| (row.id, value)))
            .collect();

        Ok(CompleteTable { rows, index, filled })
    }
}

/// Gap-free result: one value per polygon, in input order, looked up by id
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CompleteTable {
    rows: Vec<(PolygonId, f64)>,
    #[serde(skip)]
    index: HashMap<PolygonId, usize>,
    filled: usize,
}

impl CompleteTable {
    pub fn rows(&self) -> &[(PolygonId, f64)] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(PolygonId, f64)> {
        self.rows.iter()
    }

    /// Value for polygon `id`
    pub fn get(&self, id: &PolygonId) -> Option<f64> {
        self.index.get(id).map(|&position| self.rows[position].1)
    }

    /// How many values were copied from neighbouring rows
    pub fn filled_count(&self) -> usize {
        self.filled
    }

    pub fn into_rows(self) -> Vec<(PolygonId, f64)> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_id() {
        let table = ZonalTable::from_values(vec![("b", Some(2.0)), ("a", None)]).unwrap();
        assert_eq!(table.get(&PolygonId::from("a")).unwrap().sequence, 1);
        assert_eq!(table.get(&PolygonId::from("b")).unwrap().origin, ValueOrigin::Computed);
        assert!(table.get(&PolygonId::from("c")).is_none());
        assert_eq!(table.absent_count(), 1);
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let result = ZonalTable::from_values(vec![(1, Some(1.0)), (1, Some(2.0))]);
        assert!(matches!(result, Err(Error::DuplicateId(_))));
    }

    #[test]
    fn test_into_complete_rejects_absent_rows() {
        let table = ZonalTable::from_values(vec![(1, Some(1.0)), (2, None)]).unwrap();
        assert!(matches!(table.into_complete(), Err(Error::UnresolvableGap { rows: 1 })));
    }

    #[test]
    fn test_complete_table_lookup_by_id() {
        let table = ZonalTable::from_values(vec![(30, Some(3.0)), (10, Some(1.0)), (20, Some(2.0))]).unwrap();
        let complete = table.into_complete().unwrap();

        assert_eq!(complete.get(&PolygonId::from(10)), Some(1.0));
        assert_eq!(complete.get(&PolygonId::from(20)), Some(2.0));
        assert_eq!(complete.get(&PolygonId::from(30)), Some(3.0));
        assert_eq!(complete.get(&PolygonId::from(40)), None);
        // Input order is kept alongside the index
        assert_eq!(complete.rows()[0], (PolygonId::from(30), 3.0));
    }

    #[test]
    fn test_empty_table_completes() {
        let complete = ZonalTable::default().into_complete().unwrap();
        assert!(complete.is_empty());
        assert_eq!(complete.filled_count(), 0);
    }
}
