//! Column-resolved cells of a compiled polynomial.

use std::collections::BTreeMap;

/// Merge key of a cell. Quadratic pairs are stored with `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellKey {
    Constant,
    Linear(usize),
    Quadratic(usize, usize),
}

impl CellKey {
    pub fn quadratic(a: usize, b: usize) -> Self {
        CellKey::Quadratic(a.min(b), a.max(b))
    }

    pub fn degree(self) -> usize {
        match self {
            CellKey::Constant => 0,
            CellKey::Linear(_) => 1,
            CellKey::Quadratic(_, _) => 2,
        }
    }

    /// Key of the product, or `None` above degree 2.
    pub fn product(self, other: CellKey) -> Option<CellKey> {
        match (self, other) {
            (CellKey::Constant, key) | (key, CellKey::Constant) => Some(key),
            (CellKey::Linear(a), CellKey::Linear(b)) => Some(CellKey::quadratic(a, b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub key: CellKey,
    pub coefficient: f64,
}

impl Cell {
    pub fn constant(coefficient: f64) -> Self {
        Self {
            key: CellKey::Constant,
            coefficient,
        }
    }

    pub fn linear(column: usize, coefficient: f64) -> Self {
        Self {
            key: CellKey::Linear(column),
            coefficient,
        }
    }

    pub fn quadratic(a: usize, b: usize, coefficient: f64) -> Self {
        Self {
            key: CellKey::quadratic(a, b),
            coefficient,
        }
    }

    pub fn scaled(self, by: f64) -> Self {
        Self {
            key: self.key,
            coefficient: self.coefficient * by,
        }
    }

    pub fn product(&self, other: &Cell) -> Option<Cell> {
        Some(Cell {
            key: self.key.product(other.key)?,
            coefficient: self.coefficient * other.coefficient,
        })
    }
}

/// Sum cells sharing a key and return them in canonical key order.
pub fn merge_cells(cells: impl IntoIterator<Item = Cell>) -> Vec<Cell> {
    let mut merged: BTreeMap<CellKey, f64> = BTreeMap::new();
    for cell in cells {
        *merged.entry(cell.key).or_insert(0.0) += cell.coefficient;
    }
    merged
        .into_iter()
        .filter(|(_, coefficient)| *coefficient != 0.0)
        .map(|(key, coefficient)| Cell { key, coefficient })
        .collect()
}

/// Split merged cells into variable cells and the constant part.
pub fn split_constant(cells: &[Cell]) -> (Vec<Cell>, f64) {
    let mut constant = 0.0;
    let mut rest = Vec::with_capacity(cells.len());
    for cell in cells {
        if cell.key == CellKey::Constant {
            constant += cell.coefficient;
        } else {
            rest.push(*cell);
        }
    }
    (rest, constant)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::{Cell, CellKey, merge_cells, split_constant};

    #[test]
    fn merge_orders_and_sums() {
        let merged = merge_cells(vec![
            Cell::quadratic(3, 1, 1.0),
            Cell::linear(2, 1.0),
            Cell::constant(4.0),
            Cell::quadratic(1, 3, 2.0),
            Cell::linear(0, -1.0),
            Cell::linear(0, 1.0),
        ]);
        assert_eq!(
            merged,
            vec![
                Cell::constant(4.0),
                Cell::linear(2, 1.0),
                Cell::quadratic(1, 3, 3.0),
            ]
        );
    }

    #[test]
    fn product_respects_degree_cap() {
        let linear = Cell::linear(1, 2.0);
        let product = linear.product(&Cell::linear(0, 3.0)).unwrap();
        assert_eq!(product.key, CellKey::Quadratic(0, 1));
        assert_eq!(product.coefficient, 6.0);
        assert_eq!(product.product(&linear), None);
        assert_eq!(
            Cell::constant(2.0).product(&product).unwrap().coefficient,
            12.0
        );
    }

    #[test]
    fn split_extracts_constant() {
        let (cells, constant) = split_constant(&[Cell::constant(1.5), Cell::linear(0, 1.0)]);
        assert_eq!(constant, 1.5);
        assert_eq!(cells, vec![Cell::linear(0, 1.0)]);
    }
}
