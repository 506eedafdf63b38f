//! Row translation for the dump phase.
//!
//! Rows are split into chunks and translated independently, sequentially or
//! on the rayon pool. Each row writes into its own pre-sized slot, so the
//! output order equals the intermediate-model row order regardless of which
//! chunk finishes first.
//!
//! ```text
//! rows [r0 r1 r2 r3 r4 r5 r6]
//!   ├─ chunk 0: r0 r1 r2 ──┐
//!   ├─ chunk 1: r3 r4 r5 ──┼─> translate (parallel or sequential)
//!   └─ chunk 2: r6       ──┘
//!          │
//!          ▼
//! slots [s0 s1 s2 s3 s4 s5 s6]  ──> native add_row, in order
//! ```

use std::time::Instant;
use tetra_core::{CellKey, ObjectiveRow, Row, Sign};
use tetra_solver::SolverError;
use tracing::{debug, trace};

pub(crate) const SOLVER_NAME: &str = "highs";

/// A row in the shape HiGHS takes: `lower <= sum(factors) <= upper`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NativeRow {
    pub lower: f64,
    pub upper: f64,
    pub factors: Vec<(usize, f64)>,
}

type Slot = Result<NativeRow, SolverError>;

pub(crate) struct RowDump {
    chunk_count: usize,
    use_parallel: bool,
}

impl RowDump {
    pub fn new() -> Self {
        Self {
            chunk_count: num_cpus::get(),
            use_parallel: true,
        }
    }

    pub fn with_chunk_count(mut self, count: usize) -> Self {
        self.chunk_count = count.max(1);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.use_parallel = parallel;
        self
    }

    /// Translate every row; the first failing row (in row order) wins.
    pub fn translate(&self, rows: &[Row]) -> Result<Vec<NativeRow>, SolverError> {
        let started = Instant::now();
        let chunk_size = rows.len().div_ceil(self.chunk_count).max(1);
        debug!(
            component = "row_dump",
            operation = "translate",
            status = "start",
            num_rows = rows.len(),
            chunk_count = self.chunk_count,
            chunk_size,
            use_parallel = self.use_parallel,
            "Starting row translation"
        );

        let mut slots: Vec<Slot> = vec![Ok(NativeRow::default()); rows.len()];
        if self.use_parallel && cfg!(feature = "parallel") {
            #[cfg(feature = "parallel")]
            {
                fill_parallel(rows, &mut slots, chunk_size);
            }
            #[cfg(not(feature = "parallel"))]
            {
                fill_sequential(rows, &mut slots, chunk_size);
            }
        } else {
            fill_sequential(rows, &mut slots, chunk_size);
        }

        let translated = slots.into_iter().collect::<Result<Vec<_>, _>>();
        debug!(
            component = "row_dump",
            operation = "translate",
            status = if translated.is_ok() { "complete" } else { "error" },
            num_rows = rows.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Finished row translation"
        );
        translated
    }
}

impl Default for RowDump {
    fn default() -> Self {
        Self::new()
    }
}

fn fill_chunk(rows: &[Row], slots: &mut [Slot], chunk_id: usize, chunk_size: usize) {
    let offset = chunk_id * chunk_size;
    trace!(
        component = "row_dump",
        operation = "process_chunk",
        chunk_id,
        chunk_size = slots.len(),
        "Processing chunk"
    );
    for (position, slot) in slots.iter_mut().enumerate() {
        *slot = translate_row(&rows[offset + position]);
    }
}

fn fill_sequential(rows: &[Row], slots: &mut [Slot], chunk_size: usize) {
    for (chunk_id, chunk) in slots.chunks_mut(chunk_size).enumerate() {
        fill_chunk(rows, chunk, chunk_id, chunk_size);
    }
}

#[cfg(feature = "parallel")]
fn fill_parallel(rows: &[Row], slots: &mut [Slot], chunk_size: usize) {
    use rayon::prelude::*;

    slots
        .par_chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(chunk_id, chunk)| fill_chunk(rows, chunk, chunk_id, chunk_size));
}

fn translate_row(row: &Row) -> Slot {
    let mut shift = 0.0;
    let mut factors = Vec::with_capacity(row.cells.len());
    for cell in &row.cells {
        match cell.key {
            CellKey::Linear(column) => factors.push((column, cell.coefficient)),
            CellKey::Constant => shift += cell.coefficient,
            CellKey::Quadratic(..) => {
                return Err(SolverError::UnsupportedModel {
                    solver: SOLVER_NAME.to_string(),
                    reason: format!("row '{}' has a quadratic term", row.name),
                });
            }
        }
    }
    let rhs = row.rhs - shift;
    let (lower, upper) = match row.sign {
        Sign::LessEqual => (f64::NEG_INFINITY, rhs),
        Sign::GreaterEqual => (rhs, f64::INFINITY),
        Sign::Equal => (rhs, rhs),
    };
    Ok(NativeRow {
        lower,
        upper,
        factors,
    })
}

/// Dense per-column objective coefficients. Repeated cells are summed.
pub(crate) fn objective_costs(
    objective: &ObjectiveRow,
    num_columns: usize,
) -> Result<Vec<f64>, SolverError> {
    let mut costs = vec![0.0; num_columns];
    for cell in &objective.cells {
        match cell.key {
            CellKey::Linear(column) => match costs.get_mut(column) {
                Some(cost) => *cost += cell.coefficient,
                None => {
                    return Err(SolverError::EngineSolvingException(format!(
                        "objective references column {column} of {num_columns}"
                    )));
                }
            },
            CellKey::Constant => {}
            CellKey::Quadratic(..) => {
                return Err(SolverError::UnsupportedModel {
                    solver: SOLVER_NAME.to_string(),
                    reason: "quadratic objective".to_string(),
                });
            }
        }
    }
    Ok(costs)
}
