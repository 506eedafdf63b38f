//! Piecewise-linear interpolation over sampled points and grids.
//!
//! The lowering picks one active segment (1D) or triangle (2D) with a binary
//! per piece and writes the input as a convex combination of that piece's
//! vertices.

use crate::types::VariableType;
use tetra_expr::{Polynomial, Sign};

use super::MechanismModel;
use super::error::ModelError;
use super::lowering::Lowering;

fn strictly_increasing(values: &[f64]) -> bool {
    values.iter().all(|value| value.is_finite()) && values.windows(2).all(|w| w[0] < w[1])
}

/// Finite `values` table with one row per `xs` sample and one column per `ys` sample.
fn rectangular(xs: &[f64], ys: &[f64], values: &[Vec<f64>]) -> bool {
    values.len() == xs.len()
        && values
            .iter()
            .all(|row| row.len() == ys.len() && row.iter().all(|v| v.is_finite()))
}

/// Segment `k` with `xs[k] <= value <= xs[k + 1]`.
fn locate(xs: &[f64], value: f64) -> Option<usize> {
    if !value.is_finite() || value < xs[0] || value > xs[xs.len() - 1] {
        return None;
    }
    let upper = xs.partition_point(|x| *x < value);
    Some(upper.saturating_sub(1).min(xs.len() - 2))
}

/// Linear interpolation between sample points.
///
/// `None` outside the domain, or when the samples are fewer than two, not
/// strictly increasing in `x`, or not finite.
pub fn interpolate_1d(points: &[(f64, f64)], value: f64) -> Option<f64> {
    let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
    if points.len() < 2
        || !strictly_increasing(&xs)
        || points.iter().any(|(_, y)| !y.is_finite())
    {
        return None;
    }
    let k = locate(&xs, value)?;
    let (x0, y0) = points[k];
    let (x1, y1) = points[k + 1];
    Some(y0 + (value - x0) / (x1 - x0) * (y1 - y0))
}

/// Interpolation over the grid triangulated along the `(i, j)`-`(i+1, j+1)`
/// diagonal of every cell.
///
/// `None` outside the grid, or when an axis has fewer than two strictly
/// increasing samples or `values` is not a finite `xs.len() x ys.len()` table.
pub fn interpolate_2d(xs: &[f64], ys: &[f64], values: &[Vec<f64>], x: f64, y: f64) -> Option<f64> {
    if xs.len() < 2
        || ys.len() < 2
        || !strictly_increasing(xs)
        || !strictly_increasing(ys)
        || !rectangular(xs, ys, values)
    {
        return None;
    }
    let i = locate(xs, x)?;
    let j = locate(ys, y)?;
    let u = (x - xs[i]) / (xs[i + 1] - xs[i]);
    let v = (y - ys[j]) / (ys[j + 1] - ys[j]);
    let f00 = values[i][j];
    let f10 = values[i + 1][j];
    let f01 = values[i][j + 1];
    let f11 = values[i + 1][j + 1];
    if u >= v {
        Some(f00 + u * (f10 - f00) + v * (f11 - f10))
    } else {
        Some(f00 + v * (f01 - f00) + u * (f11 - f01))
    }
}

impl MechanismModel {
    pub(crate) fn lower_piecewise_1d(
        &mut self,
        lowering: &mut Lowering,
        input: &Polynomial,
        points: &[(f64, f64)],
    ) -> Result<Polynomial, ModelError> {
        let xs: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
        if points.len() < 2 || !strictly_increasing(&xs) {
            return Err(lowering.invalid(
                "at least two points with strictly increasing finite x are required",
            ));
        }
        if points.iter().any(|(_, y)| !y.is_finite()) {
            return Err(lowering.invalid("sample values must be finite"));
        }
        let range = self.span_of(lowering, input)?;
        let (first, last) = (xs[0], xs[xs.len() - 1]);
        if let Some(fixed) = range.fixed_value() {
            return interpolate_1d(points, fixed)
                .map(Polynomial::from_constant)
                .ok_or_else(|| {
                    lowering.invalid(format!("input {fixed} lies outside [{first}, {last}]"))
                });
        }
        if range.upper_f64() < first || range.lower_f64() > last {
            return Err(lowering.invalid(format!(
                "input range {range} does not meet [{first}, {last}]"
            )));
        }

        let mut weights = Vec::with_capacity(points.len());
        for k in 0..points.len() {
            weights.push(self.auxiliary(
                lowering,
                &format!("lambda_{k}"),
                VariableType::Percentage,
                0.0,
                1.0,
                None,
            )?);
        }
        let mut segments = Vec::with_capacity(points.len() - 1);
        for k in 0..points.len() - 1 {
            segments.push(self.auxiliary(
                lowering,
                &format!("segment_{k}"),
                VariableType::Binary,
                0.0,
                1.0,
                None,
            )?);
        }

        let weight_sum = tetra_expr::sum(weights.iter().copied());
        self.tie(lowering, "lambda_sum", weight_sum, Sign::Equal, 1.0);
        let segment_sum = tetra_expr::sum(segments.iter().copied());
        self.tie(lowering, "segment_sum", segment_sum, Sign::Equal, 1.0);
        for (k, weight) in weights.iter().enumerate() {
            let mut support = Polynomial::from(*weight);
            if k > 0 {
                support = support - segments[k - 1];
            }
            if k < segments.len() {
                support = support - segments[k];
            }
            self.tie(
                lowering,
                &format!("lambda_{k}_support"),
                support,
                Sign::LessEqual,
                0.0,
            );
        }
        let position: Polynomial = weights
            .iter()
            .zip(&xs)
            .map(|(weight, x)| Polynomial::term(*weight, *x))
            .sum();
        self.tie(lowering, "input", input.sub(&position), Sign::Equal, 0.0);

        Ok(weights
            .iter()
            .zip(points)
            .map(|(weight, (_, y))| Polynomial::term(*weight, *y))
            .sum())
    }

    pub(crate) fn lower_piecewise_2d(
        &mut self,
        lowering: &mut Lowering,
        x: &Polynomial,
        y: &Polynomial,
        xs: &[f64],
        ys: &[f64],
        values: &[Vec<f64>],
    ) -> Result<Polynomial, ModelError> {
        if xs.len() < 2 || ys.len() < 2 || !strictly_increasing(xs) || !strictly_increasing(ys) {
            return Err(lowering.invalid(
                "grid axes need at least two strictly increasing finite samples",
            ));
        }
        if !rectangular(xs, ys, values) {
            return Err(lowering.invalid(format!(
                "grid values must be a finite {}x{} table",
                xs.len(),
                ys.len()
            )));
        }
        let x_range = self.span_of(lowering, x)?;
        let y_range = self.span_of(lowering, y)?;
        if let (Some(fx), Some(fy)) = (x_range.fixed_value(), y_range.fixed_value()) {
            return interpolate_2d(xs, ys, values, fx, fy)
                .map(Polynomial::from_constant)
                .ok_or_else(|| {
                    lowering.invalid(format!("point ({fx}, {fy}) lies outside the grid"))
                });
        }
        let outside = |range: &tetra_expr::ValueRange<f64>, axis: &[f64]| {
            range.upper_f64() < axis[0] || range.lower_f64() > axis[axis.len() - 1]
        };
        if outside(&x_range, xs) || outside(&y_range, ys) {
            return Err(lowering.invalid("input ranges do not meet the grid"));
        }

        let (nx, ny) = (xs.len(), ys.len());
        let mut weights = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                weights.push(self.auxiliary(
                    lowering,
                    &format!("lambda_{i}_{j}"),
                    VariableType::Percentage,
                    0.0,
                    1.0,
                    None,
                )?);
            }
        }
        let vertex = |i: usize, j: usize| i * ny + j;

        let mut triangles = Vec::new();
        let mut membership: Vec<Vec<usize>> = vec![Vec::new(); nx * ny];
        for i in 0..nx - 1 {
            for j in 0..ny - 1 {
                let lower = [vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1)];
                let upper = [vertex(i, j), vertex(i, j + 1), vertex(i + 1, j + 1)];
                for corners in [lower, upper] {
                    let t = triangles.len();
                    triangles.push(self.auxiliary(
                        lowering,
                        &format!("triangle_{t}"),
                        VariableType::Binary,
                        0.0,
                        1.0,
                        None,
                    )?);
                    for corner in corners {
                        membership[corner].push(t);
                    }
                }
            }
        }

        let weight_sum = tetra_expr::sum(weights.iter().copied());
        self.tie(lowering, "lambda_sum", weight_sum, Sign::Equal, 1.0);
        let triangle_sum = tetra_expr::sum(triangles.iter().copied());
        self.tie(lowering, "triangle_sum", triangle_sum, Sign::Equal, 1.0);
        for i in 0..nx {
            for j in 0..ny {
                let v = vertex(i, j);
                let covering = tetra_expr::sum(membership[v].iter().map(|t| triangles[*t]));
                self.tie(
                    lowering,
                    &format!("lambda_{i}_{j}_support"),
                    Polynomial::from(weights[v]).sub(&covering),
                    Sign::LessEqual,
                    0.0,
                );
            }
        }

        let mut x_position = Polynomial::new_empty();
        let mut y_position = Polynomial::new_empty();
        let mut value = Polynomial::new_empty();
        for i in 0..nx {
            for j in 0..ny {
                let weight = weights[vertex(i, j)];
                x_position = x_position.add(&Polynomial::term(weight, xs[i]));
                y_position = y_position.add(&Polynomial::term(weight, ys[j]));
                value = value.add(&Polynomial::term(weight, values[i][j]));
            }
        }
        self.tie(lowering, "x", x.sub(&x_position), Sign::Equal, 0.0);
        self.tie(lowering, "y", y.sub(&y_position), Sign::Equal, 0.0);
        Ok(value)
    }
}
