use tetra_expr::{Bound, Interval, Polynomial, Sign, ValueRange};

/// Optimization sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    pub fn as_str(self) -> &'static str {
        match self {
            Sense::Minimize => "minimize",
            Sense::Maximize => "maximize",
        }
    }

    pub fn reverse(self) -> Sense {
        match self {
            Sense::Minimize => Sense::Maximize,
            Sense::Maximize => Sense::Minimize,
        }
    }
}

/// Domain type of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VariableType {
    Binary,
    Integer,
    UInteger,
    Continuous,
    UContinuous,
    /// Continuous in `[0, 1]`; produced by relaxing binaries.
    Percentage,
}

impl VariableType {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableType::Binary => "binary",
            VariableType::Integer => "integer",
            VariableType::UInteger => "uinteger",
            VariableType::Continuous => "continuous",
            VariableType::UContinuous => "ucontinuous",
            VariableType::Percentage => "percentage",
        }
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            VariableType::Binary | VariableType::Integer | VariableType::UInteger
        )
    }

    pub fn is_binary(self) -> bool {
        self == VariableType::Binary
    }

    /// Range a fresh variable of this type starts with.
    pub fn default_range(self) -> ValueRange<f64> {
        match self {
            VariableType::Binary | VariableType::Percentage => ValueRange::closed(0.0, 1.0),
            VariableType::UInteger | VariableType::UContinuous => ValueRange::at_least(0.0),
            VariableType::Integer | VariableType::Continuous => ValueRange::full(),
        }
    }

    /// Continuous counterpart used by linear relaxation.
    pub fn relaxed(self) -> VariableType {
        match self {
            VariableType::Binary => VariableType::Percentage,
            VariableType::UInteger => VariableType::UContinuous,
            VariableType::Integer => VariableType::Continuous,
            other => other,
        }
    }
}

/// A typed scalar decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    display_name: Option<String>,
    kind: VariableType,
    range: ValueRange<f64>,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableType) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            kind,
            range: kind.default_range(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Binary)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Integer)
    }

    pub fn uinteger(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::UInteger)
    }

    pub fn continuous(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Continuous)
    }

    pub fn ucontinuous(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::UContinuous)
    }

    pub fn percentage(name: impl Into<String>) -> Self {
        Self::new(name, VariableType::Percentage)
    }

    /// Narrow the range to `[lower, upper]`; infinities are allowed.
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.range.intersect_with(&ValueRange::new(
            Bound::from_f64(lower),
            Interval::Closed,
            Bound::from_f64(upper),
            Interval::Closed,
        ));
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn kind(&self) -> VariableType {
        self.kind
    }

    pub fn range(&self) -> &ValueRange<f64> {
        &self.range
    }

    pub fn range_mut(&mut self) -> &mut ValueRange<f64> {
        &mut self.range
    }

    pub fn lower(&self) -> f64 {
        self.range.lower_f64()
    }

    pub fn upper(&self) -> f64 {
        self.range.upper_f64()
    }
}

/// A named row: `lhs sign rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub lhs: Polynomial,
    pub sign: Sign,
    pub rhs: f64,
}

/// One term of the objective, declared with its own sense.
#[derive(Debug, Clone, PartialEq)]
pub struct SubObjective {
    pub name: String,
    pub sense: Sense,
    pub polynomial: Polynomial,
}

/// Model objective: the sense of the first sub-objective wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objective {
    pub sense: Option<Sense>,
    pub parts: Vec<SubObjective>,
}

impl Objective {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all parts; parts with the opposite sense are subtracted.
    pub fn combined(&self) -> Option<(Sense, Polynomial)> {
        let sense = self.sense?;
        let total = self
            .parts
            .iter()
            .map(|part| {
                if part.sense == sense {
                    part.polynomial.clone()
                } else {
                    part.polynomial.neg()
                }
            })
            .sum();
        Some((sense, total))
    }
}
