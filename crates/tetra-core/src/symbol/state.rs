use std::collections::BTreeSet;
use tetra_expr::{Polynomial, SymbolId, ValueRange, VariableId};

/// How a warm-start value for an auxiliary variable is derived from the
/// values of the function inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Seed {
    /// `max(p, 0)`
    PositivePart(Polynomial),
    /// `max(-p, 0)`
    NegativePart(Polynomial),
    /// 1 when `p <= 0`, else 0.
    NonPositive(Polynomial),
    /// 1 when `p > 0`, else 0.
    Positive(Polynomial),
    /// 1 when every input is 1.
    All(Vec<Polynomial>),
    /// 1 when some input is 1.
    Any(Vec<Polynomial>),
    Min(Vec<Polynomial>),
    Max(Vec<Polynomial>),
    /// 1 when input `index` attains the extremum (first wins on ties).
    Selects {
        inputs: Vec<Polynomial>,
        index: usize,
        maximum: bool,
    },
}

impl Seed {
    /// `None` while an input is unknown.
    pub fn evaluate(&self, value: &dyn Fn(&Polynomial) -> Option<f64>) -> Option<f64> {
        let indicator = |flag: bool| if flag { 1.0 } else { 0.0 };
        match self {
            Seed::PositivePart(p) => Some(value(p)?.max(0.0)),
            Seed::NegativePart(p) => Some((-value(p)?).max(0.0)),
            Seed::NonPositive(p) => Some(indicator(value(p)? <= 0.0)),
            Seed::Positive(p) => Some(indicator(value(p)? > 0.0)),
            Seed::All(inputs) => {
                let values = collect_values(inputs, value)?;
                Some(indicator(values.iter().all(|v| *v >= 0.5)))
            }
            Seed::Any(inputs) => {
                let values = collect_values(inputs, value)?;
                Some(indicator(values.iter().any(|v| *v >= 0.5)))
            }
            Seed::Min(inputs) => collect_values(inputs, value)?
                .into_iter()
                .reduce(f64::min),
            Seed::Max(inputs) => collect_values(inputs, value)?
                .into_iter()
                .reduce(f64::max),
            Seed::Selects {
                inputs,
                index,
                maximum,
            } => {
                let values = collect_values(inputs, value)?;
                let mut best = 0;
                for (position, candidate) in values.iter().enumerate() {
                    let better = if *maximum {
                        *candidate > values[best]
                    } else {
                        *candidate < values[best]
                    };
                    if better {
                        best = position;
                    }
                }
                Some(indicator(best == *index))
            }
        }
    }
}

fn collect_values(
    inputs: &[Polynomial],
    value: &dyn Fn(&Polynomial) -> Option<f64>,
) -> Option<Vec<f64>> {
    inputs.iter().map(value).collect()
}

/// Result of lowering a symbol into the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// Value of the symbol over variables and earlier symbols.
    pub expression: Polynomial,
    pub range: ValueRange<f64>,
    pub discrete: bool,
    pub auxiliaries: Vec<VariableId>,
    /// Row positions of the constraints added by the lowering.
    pub constraints: Vec<usize>,
    /// Symbols read directly.
    pub dependencies: BTreeSet<SymbolId>,
    /// Variables read, transitively through dependencies.
    pub variables: BTreeSet<VariableId>,
    pub seeds: Vec<(VariableId, Seed)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolState {
    Unregistered,
    Registered(Box<Registration>),
}

impl SymbolState {
    pub fn registration(&self) -> Option<&Registration> {
        match self {
            SymbolState::Registered(registration) => Some(registration),
            SymbolState::Unregistered => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, SymbolState::Registered(_))
    }
}

/// Cached value of a symbol, tagged with the token revision it was read at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CacheState {
    #[default]
    Stale,
    Valid {
        value: Option<f64>,
        revision: u64,
    },
}
