//! CPLEX-LP text export.

use super::{Column, ObjectiveRow, Row};
use crate::types::{Sense, VariableType};
use std::fmt::Write as _;
use std::io;
use tetra_expr::{Cell, CellKey};

/// Number formatting shared by every LP section.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() {
            "-inf".to_string()
        } else {
            "+inf".to_string()
        };
    }
    let mut rendered = format!("{value:.12}");
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }
    if rendered == "-0" {
        "0".to_string()
    } else {
        rendered
    }
}

/// Column and row names restricted to characters LP readers accept.
pub(crate) fn lp_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || "_.#$%&@{}~!".contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    match cleaned.chars().next() {
        None => "_".to_string(),
        Some(first) if first.is_ascii_digit() || first == '.' => format!("_{cleaned}"),
        Some(_) => cleaned,
    }
}

fn push_term(out: &mut String, first: &mut bool, coefficient: f64, body: &str) {
    let negative = coefficient < 0.0;
    let magnitude = coefficient.abs();
    let term = if magnitude == 1.0 {
        body.to_string()
    } else {
        format!("{} {body}", format_number(magnitude))
    };
    if *first {
        if negative {
            out.push_str("- ");
        }
        out.push_str(&term);
        *first = false;
    } else if negative {
        let _ = write!(out, " - {term}");
    } else {
        let _ = write!(out, " + {term}");
    }
}

/// Linear part, then the bracketed quadratic part with each coefficient
/// multiplied by `quadratic_scale`.
fn write_cells(
    cells: &[Cell],
    names: &[String],
    quadratic_scale: f64,
    quadratic_suffix: &str,
) -> String {
    let mut out = String::new();
    let mut first = true;
    for cell in cells {
        if let CellKey::Linear(column) = cell.key {
            push_term(&mut out, &mut first, cell.coefficient, &names[column]);
        }
    }
    let quadratic: Vec<&Cell> = cells
        .iter()
        .filter(|cell| cell.key.degree() == 2)
        .collect();
    if !quadratic.is_empty() {
        out.push_str(if first { "[ " } else { " + [ " });
        let mut inner_first = true;
        for cell in quadratic {
            if let CellKey::Quadratic(a, b) = cell.key {
                let body = if a == b {
                    format!("{} ^ 2", names[a])
                } else {
                    format!("{} * {}", names[a], names[b])
                };
                push_term(
                    &mut out,
                    &mut inner_first,
                    cell.coefficient * quadratic_scale,
                    &body,
                );
            }
        }
        let _ = write!(out, " ]{quadratic_suffix}");
        first = false;
    }
    if first {
        if let Some(name) = names.first() {
            let _ = write!(out, "0 {name}");
        }
    }
    out
}

fn bound_line(column: &Column, name: &str) -> Option<String> {
    if column.kind == VariableType::Binary && column.lower == 0.0 && column.upper == 1.0 {
        return None;
    }
    let (lower, upper) = (column.lower, column.upper);
    if lower == 0.0 && upper == f64::INFINITY {
        return None;
    }
    if lower == f64::NEG_INFINITY && upper == f64::INFINITY {
        return Some(format!("{name} free"));
    }
    if lower == upper {
        return Some(format!("{name} = {}", format_number(lower)));
    }
    Some(format!(
        "{} <= {name} <= {}",
        format_number(lower),
        format_number(upper)
    ))
}

pub(crate) fn write_lp<W: io::Write>(
    writer: &mut W,
    name: &str,
    columns: &[Column],
    rows: &[Row],
    objective: &ObjectiveRow,
) -> io::Result<()> {
    let names: Vec<String> = columns.iter().map(|column| lp_name(&column.name)).collect();

    writeln!(writer, "\\ Problem: {name}")?;
    writeln!(
        writer,
        "{}",
        match objective.sense {
            Sense::Minimize => "Minimize",
            Sense::Maximize => "Maximize",
        }
    )?;
    let mut line = write_cells(&objective.cells, &names, 2.0, " / 2");
    if objective.constant != 0.0 {
        let sign = if objective.constant < 0.0 { '-' } else { '+' };
        let _ = write!(line, " {sign} {}", format_number(objective.constant.abs()));
    }
    writeln!(writer, " obj: {line}")?;

    writeln!(writer, "Subject To")?;
    for row in rows {
        writeln!(
            writer,
            " {}: {} {} {}",
            lp_name(&row.name),
            write_cells(&row.cells, &names, 1.0, ""),
            row.sign.as_str(),
            format_number(row.rhs)
        )?;
    }

    let bounds: Vec<String> = columns
        .iter()
        .zip(&names)
        .filter_map(|(column, name)| bound_line(column, name))
        .collect();
    if !bounds.is_empty() {
        writeln!(writer, "Bounds")?;
        for bound in bounds {
            writeln!(writer, " {bound}")?;
        }
    }

    let generals: Vec<&String> = columns
        .iter()
        .zip(&names)
        .filter(|(column, _)| column.is_integral() && column.kind != VariableType::Binary)
        .map(|(_, name)| name)
        .collect();
    if !generals.is_empty() {
        writeln!(writer, "Generals")?;
        for name in generals {
            writeln!(writer, " {name}")?;
        }
    }
    let binaries: Vec<&String> = columns
        .iter()
        .zip(&names)
        .filter(|(column, _)| column.kind == VariableType::Binary)
        .map(|(_, name)| name)
        .collect();
    if !binaries.is_empty() {
        writeln!(writer, "Binaries")?;
        for name in binaries {
            writeln!(writer, " {name}")?;
        }
    }
    writeln!(writer, "End")
}

#[cfg(test)]
mod tests {
    use super::{format_number, lp_name};

    #[test]
    fn numbers_drop_trailing_zeros() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.25), "0.25");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn names_are_sanitized() {
        assert_eq!(lp_name("cap[a b]"), "cap_a_b_");
        assert_eq!(lp_name("1st"), "_1st");
        assert_eq!(lp_name("x_lb"), "x_lb");
    }
}
