//! Symbols: named sub-expressions and derived functions.
//!
//! A [`Symbol`] is a plain value until it is added to a model. Registration
//! lowers derived functions into auxiliary variables and constraints (see
//! `model::lowering`) and moves the entry from `Unregistered` to `Registered`.

mod state;

pub use state::{CacheState, Registration, Seed, SymbolState};

use tetra_expr::{Inequality, Polynomial};

/// Which side of a threshold a slack measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SlackDirection {
    /// Excess above the threshold.
    Positive,
    /// Shortfall below the threshold.
    Negative,
    Both,
}

impl SlackDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SlackDirection::Positive => "positive",
            SlackDirection::Negative => "negative",
            SlackDirection::Both => "both",
        }
    }
}

/// Derived functions that lower into auxiliary variables and constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Slack {
        x: Polynomial,
        threshold: f64,
        direction: SlackDirection,
    },
    SlackRange {
        x: Polynomial,
        lower: f64,
        upper: f64,
    },
    If {
        condition: Inequality,
    },
    Binarize {
        input: Polynomial,
    },
    And {
        inputs: Vec<Polynomial>,
    },
    Or {
        inputs: Vec<Polynomial>,
    },
    Not {
        input: Polynomial,
    },
    Abs {
        input: Polynomial,
    },
    Min {
        inputs: Vec<Polynomial>,
        exact: bool,
    },
    Max {
        inputs: Vec<Polynomial>,
        exact: bool,
    },
    Piecewise1D {
        input: Polynomial,
        points: Vec<(f64, f64)>,
    },
    /// `values[i][j]` is the value at `(xs[i], ys[j])`.
    Piecewise2D {
        x: Polynomial,
        y: Polynomial,
        xs: Vec<f64>,
        ys: Vec<f64>,
        values: Vec<Vec<f64>>,
    },
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Slack { .. } => "slack",
            Function::SlackRange { .. } => "slack_range",
            Function::If { .. } => "if",
            Function::Binarize { .. } => "binarize",
            Function::And { .. } => "and",
            Function::Or { .. } => "or",
            Function::Not { .. } => "not",
            Function::Abs { .. } => "abs",
            Function::Min { .. } => "min",
            Function::Max { .. } => "max",
            Function::Piecewise1D { .. } => "piecewise_1d",
            Function::Piecewise2D { .. } => "piecewise_2d",
        }
    }

    /// Every polynomial the function reads.
    pub fn inputs(&self) -> Vec<&Polynomial> {
        match self {
            Function::Slack { x, .. } | Function::SlackRange { x, .. } => vec![x],
            Function::If { condition } => vec![condition.lhs()],
            Function::Binarize { input }
            | Function::Not { input }
            | Function::Abs { input }
            | Function::Piecewise1D { input, .. } => vec![input],
            Function::And { inputs }
            | Function::Or { inputs }
            | Function::Min { inputs, .. }
            | Function::Max { inputs, .. } => inputs.iter().collect(),
            Function::Piecewise2D { x, y, .. } => vec![x, y],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Expression(Polynomial),
    Function(Function),
}

/// A named, cached expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    name: String,
    display_name: Option<String>,
    kind: SymbolKind,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            kind,
        }
    }

    pub fn expression(name: impl Into<String>, polynomial: impl Into<Polynomial>) -> Self {
        Self::new(name, SymbolKind::Expression(polynomial.into()))
    }

    fn function(name: impl Into<String>, function: Function) -> Self {
        Self::new(name, SymbolKind::Function(function))
    }

    pub fn slack(
        name: impl Into<String>,
        x: impl Into<Polynomial>,
        threshold: f64,
        direction: SlackDirection,
    ) -> Self {
        Self::function(
            name,
            Function::Slack {
                x: x.into(),
                threshold,
                direction,
            },
        )
    }

    pub fn slack_range(
        name: impl Into<String>,
        x: impl Into<Polynomial>,
        lower: f64,
        upper: f64,
    ) -> Self {
        Self::function(
            name,
            Function::SlackRange {
                x: x.into(),
                lower,
                upper,
            },
        )
    }

    /// Indicator of `condition`: 1 when it holds, 0 otherwise.
    pub fn if_then(name: impl Into<String>, condition: Inequality) -> Self {
        Self::function(name, Function::If { condition })
    }

    pub fn binarize(name: impl Into<String>, input: impl Into<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Binarize {
                input: input.into(),
            },
        )
    }

    pub fn and(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(name, Function::And { inputs })
    }

    pub fn or(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(name, Function::Or { inputs })
    }

    pub fn not(name: impl Into<String>, input: impl Into<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Not {
                input: input.into(),
            },
        )
    }

    pub fn abs(name: impl Into<String>, input: impl Into<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Abs {
                input: input.into(),
            },
        )
    }

    /// Lower envelope: the result never exceeds any input.
    pub fn min(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Min {
                inputs,
                exact: false,
            },
        )
    }

    /// Exact minimum, selected by one binary per input.
    pub fn exact_min(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Min {
                inputs,
                exact: true,
            },
        )
    }

    pub fn max(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Max {
                inputs,
                exact: false,
            },
        )
    }

    pub fn exact_max(name: impl Into<String>, inputs: Vec<Polynomial>) -> Self {
        Self::function(
            name,
            Function::Max {
                inputs,
                exact: true,
            },
        )
    }

    pub fn piecewise_1d(
        name: impl Into<String>,
        input: impl Into<Polynomial>,
        points: Vec<(f64, f64)>,
    ) -> Self {
        Self::function(
            name,
            Function::Piecewise1D {
                input: input.into(),
                points,
            },
        )
    }

    pub fn piecewise_2d(
        name: impl Into<String>,
        x: impl Into<Polynomial>,
        y: impl Into<Polynomial>,
        xs: Vec<f64>,
        ys: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> Self {
        Self::function(
            name,
            Function::Piecewise2D {
                x: x.into(),
                y: y.into(),
                xs,
                ys,
                values,
            },
        )
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

    pub fn kind(&self) -> &SymbolKind {
        &self.kind
    }

    /// Polynomials the definition reads, before lowering.
    pub fn inputs(&self) -> Vec<&Polynomial> {
        match &self.kind {
            SymbolKind::Expression(polynomial) => vec![polynomial],
            SymbolKind::Function(function) => function.inputs(),
        }
    }

    /// Same name and same definition; display names are ignored.
    pub fn same_definition(&self, other: &Symbol) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}
