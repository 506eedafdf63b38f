//! Constraint groups and shadow prices.

use super::MechanismModel;
use super::error::ModelError;

/// Rows sharing a name prefix, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintGroup {
    pub name: String,
    pub rows: Vec<usize>,
}

impl ConstraintGroup {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl MechanismModel {
    /// Rows whose names start with `prefix`.
    pub fn constraint_group(&self, prefix: &str) -> ConstraintGroup {
        ConstraintGroup {
            name: prefix.to_string(),
            rows: self
                .constraints
                .iter()
                .enumerate()
                .filter(|(_, constraint)| constraint.name.starts_with(prefix))
                .map(|(row, _)| row)
                .collect(),
        }
    }

    /// All rows grouped by the name part before `separator`, in order of
    /// first appearance. A name without the separator is its own group key.
    pub fn constraint_groups(&self, separator: &str) -> Vec<ConstraintGroup> {
        let mut groups: Vec<ConstraintGroup> = Vec::new();
        for (row, constraint) in self.constraints.iter().enumerate() {
            let key = constraint
                .name
                .split_once(separator)
                .map_or(constraint.name.as_str(), |(head, _)| head);
            match groups.iter_mut().find(|group| group.name == key) {
                Some(group) => group.rows.push(row),
                None => groups.push(ConstraintGroup {
                    name: key.to_string(),
                    rows: vec![row],
                }),
            }
        }
        groups
    }

    /// Pair each row of `group` with its dual from a per-row dual vector.
    pub fn shadow_prices(
        &self,
        group: &ConstraintGroup,
        duals: &[f64],
    ) -> Result<Vec<(String, f64)>, ModelError> {
        if duals.len() != self.constraints.len() {
            return Err(ModelError::SolutionLength {
                expected: self.constraints.len(),
                actual: duals.len(),
            });
        }
        group
            .rows
            .iter()
            .map(|row| {
                self.constraints
                    .get(*row)
                    .map(|constraint| (constraint.name.clone(), duals[*row]))
                    .ok_or(ModelError::SolutionLength {
                        expected: self.constraints.len(),
                        actual: *row + 1,
                    })
            })
            .collect()
    }
}
