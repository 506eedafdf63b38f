//! Lowering of derived functions into auxiliary variables and constraints.
//!
//! Every big-M is taken from the propagated range of the governed
//! expression; an unbounded range is an error rather than a guessed constant.
//! Auxiliaries are named `<symbol>_<role>` and rows `<symbol>_<role>`.

use crate::symbol::{Function, Registration, Seed, SlackDirection, Symbol, SymbolKind};
use crate::types::{Variable, VariableType};
use std::collections::BTreeSet;
use tetra_expr::{Bound, Interval, Polynomial, Sign, SymbolId, ValueRange, VariableId};

use super::MechanismModel;
use super::error::ModelError;

/// What one registration has added so far.
pub(crate) struct Lowering {
    pub(crate) symbol: String,
    pub(crate) auxiliaries: Vec<VariableId>,
    pub(crate) constraints: Vec<usize>,
    pub(crate) seeds: Vec<(VariableId, Seed)>,
}

impl Lowering {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            auxiliaries: Vec::new(),
            constraints: Vec::new(),
            seeds: Vec::new(),
        }
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidFunctionInput {
            symbol: self.symbol.clone(),
            reason: reason.into(),
        }
    }

    fn unbounded(&self) -> ModelError {
        ModelError::UnboundedExpression {
            symbol: self.symbol.clone(),
        }
    }
}

impl MechanismModel {
    pub(crate) fn lower_symbol(
        &mut self,
        id: SymbolId,
        symbol: &Symbol,
    ) -> Result<Registration, ModelError> {
        let mut lowering = Lowering::new(symbol.name());
        let expression = match symbol.kind() {
            SymbolKind::Expression(polynomial) => polynomial.clone(),
            SymbolKind::Function(function) => self.lower_function(&mut lowering, function)?,
        };

        let mut dependencies: BTreeSet<SymbolId> = expression.symbols();
        for input in symbol.inputs() {
            dependencies.extend(input.symbols());
        }
        if dependencies.iter().any(|dependency| *dependency >= id) {
            return Err(lowering.invalid("symbols may only read earlier symbols"));
        }

        let mut variables = expression.variables();
        for dependency in expression.symbols() {
            if let Some(registration) = self.symbols[dependency.index()].state.registration() {
                variables.extend(registration.variables.iter().copied());
            }
        }

        Ok(Registration {
            range: expression.range(self),
            discrete: expression.discrete(self),
            expression,
            auxiliaries: lowering.auxiliaries,
            constraints: lowering.constraints,
            dependencies,
            variables,
            seeds: lowering.seeds,
        })
    }

    fn lower_function(
        &mut self,
        lowering: &mut Lowering,
        function: &Function,
    ) -> Result<Polynomial, ModelError> {
        match function {
            Function::Slack {
                x,
                threshold,
                direction,
            } => self.lower_slack(lowering, x, *threshold, *direction),
            Function::SlackRange { x, lower, upper } => {
                self.lower_slack_range(lowering, x, *lower, *upper)
            }
            Function::If { condition } => {
                let residual = condition.residual();
                match condition.sign() {
                    Sign::LessEqual => self.indicator_non_positive(lowering, &residual, "le"),
                    Sign::GreaterEqual => {
                        self.indicator_non_positive(lowering, &residual.neg(), "ge")
                    }
                    Sign::Equal => {
                        let below = self.indicator_non_positive(lowering, &residual, "le")?;
                        let above =
                            self.indicator_non_positive(lowering, &residual.neg(), "ge")?;
                        self.conjunction(lowering, vec![below, above], "eq")
                    }
                }
            }
            Function::Binarize { input } => self.binary_of(lowering, input, "bin"),
            Function::And { inputs } => {
                let binaries = self.binaries_of(lowering, inputs)?;
                self.conjunction(lowering, binaries, "and")
            }
            Function::Or { inputs } => {
                let binaries = self.binaries_of(lowering, inputs)?;
                self.disjunction(lowering, binaries, "or")
            }
            Function::Not { input } => {
                let binary = self.binary_of(lowering, input, "bin")?;
                Ok(Polynomial::from_constant(1.0).sub(&binary))
            }
            Function::Abs { input } => self.lower_abs(lowering, input),
            Function::Min { inputs, exact } => self.lower_extremum(lowering, inputs, *exact, false),
            Function::Max { inputs, exact } => self.lower_extremum(lowering, inputs, *exact, true),
            Function::Piecewise1D { input, points } => {
                self.lower_piecewise_1d(lowering, input, points)
            }
            Function::Piecewise2D {
                x,
                y,
                xs,
                ys,
                values,
            } => self.lower_piecewise_2d(lowering, x, y, xs, ys, values),
        }
    }

    // ── Auxiliary plumbing ──────────────────────────────────

    pub(crate) fn auxiliary(
        &mut self,
        lowering: &mut Lowering,
        role: &str,
        kind: VariableType,
        lower: f64,
        upper: f64,
        seed: Option<Seed>,
    ) -> Result<VariableId, ModelError> {
        let mut name = format!("{}_{role}", lowering.symbol);
        if self.variable_names.contains_key(&name) {
            name = format!("{name}_{}", self.variables.len());
        }
        let variable = Variable::new(name, kind).with_bounds(lower, upper);
        let id = self.add_variable(variable)?;
        lowering.auxiliaries.push(id);
        if let Some(seed) = seed {
            lowering.seeds.push((id, seed));
        }
        Ok(id)
    }

    pub(crate) fn tie(
        &mut self,
        lowering: &mut Lowering,
        role: &str,
        lhs: Polynomial,
        sign: Sign,
        rhs: f64,
    ) {
        let name = format!("{}_{role}", lowering.symbol);
        let row = self.push_constraint(lhs, sign, rhs, name);
        lowering.constraints.push(row);
    }

    /// Propagated range, rejecting empty ones.
    pub(crate) fn span_of(
        &self,
        lowering: &Lowering,
        polynomial: &Polynomial,
    ) -> Result<ValueRange<f64>, ModelError> {
        let range = polynomial.range(self);
        if range.is_empty() {
            return Err(lowering.invalid("input range is empty"));
        }
        Ok(range)
    }

    /// Finite `(lower, upper)` of the propagated range.
    pub(crate) fn bounds_of(
        &self,
        lowering: &Lowering,
        polynomial: &Polynomial,
    ) -> Result<(f64, f64), ModelError> {
        let range = self.span_of(lowering, polynomial)?;
        if !range.is_bounded() {
            return Err(lowering.unbounded());
        }
        Ok((range.lower_f64(), range.upper_f64()))
    }

    /// Smallest positive gap a strict inequality on `polynomial` must clear.
    fn epsilon(&self, polynomial: &Polynomial) -> f64 {
        if polynomial.discrete(self) {
            1.0
        } else {
            self.options().tolerance
        }
    }

    fn is_binary_expression(&self, polynomial: &Polynomial) -> bool {
        polynomial.discrete(self)
            && polynomial
                .range(self)
                .is_subset_of(&ValueRange::closed(0.0, 1.0))
    }

    fn slack_kind(&self, polynomial: &Polynomial) -> VariableType {
        if polynomial.discrete(self) {
            VariableType::UInteger
        } else {
            VariableType::UContinuous
        }
    }

    // ── Logical building blocks ─────────────────────────────

    /// Binary that is 1 exactly when `expression <= 0`.
    fn indicator_non_positive(
        &mut self,
        lowering: &mut Lowering,
        expression: &Polynomial,
        role: &str,
    ) -> Result<Polynomial, ModelError> {
        let range = self.span_of(lowering, expression)?;
        if range.upper_f64() <= 0.0 {
            return Ok(Polynomial::from_constant(1.0));
        }
        let positive = ValueRange::new(
            Bound::Value(0.0),
            Interval::Open,
            Bound::PositiveInfinity,
            Interval::Open,
        );
        if range.is_subset_of(&positive) {
            return Ok(Polynomial::from_constant(0.0));
        }
        let (lower, upper) = self.bounds_of(lowering, expression)?;
        let epsilon = self.epsilon(expression);
        let indicator = self.auxiliary(
            lowering,
            role,
            VariableType::Binary,
            0.0,
            1.0,
            Some(Seed::NonPositive(expression.clone())),
        )?;
        // indicator = 1 => expression <= 0
        self.tie(
            lowering,
            &format!("{role}_holds"),
            expression.add(&Polynomial::term(indicator, upper)),
            Sign::LessEqual,
            upper,
        );
        // indicator = 0 => expression >= epsilon
        self.tie(
            lowering,
            &format!("{role}_fails"),
            expression.sub(&Polynomial::term(indicator, lower - epsilon)),
            Sign::GreaterEqual,
            epsilon,
        );
        Ok(Polynomial::from(indicator))
    }

    /// Binary that is 1 exactly when a non-negative `input` is positive.
    fn binary_of(
        &mut self,
        lowering: &mut Lowering,
        input: &Polynomial,
        role: &str,
    ) -> Result<Polynomial, ModelError> {
        if self.is_binary_expression(input) {
            return Ok(input.clone());
        }
        let range = self.span_of(lowering, input)?;
        if range.lower_f64() < 0.0 {
            return Err(lowering.invalid("binarized input must be non-negative"));
        }
        if range.upper_f64() <= 0.0 {
            return Ok(Polynomial::from_constant(0.0));
        }
        if range.lower_f64() > 0.0 {
            return Ok(Polynomial::from_constant(1.0));
        }
        let (_, upper) = self.bounds_of(lowering, input)?;
        let epsilon = self.epsilon(input);
        let binary = self.auxiliary(
            lowering,
            role,
            VariableType::Binary,
            0.0,
            1.0,
            Some(Seed::Positive(input.clone())),
        )?;
        self.tie(
            lowering,
            &format!("{role}_upper"),
            input.sub(&Polynomial::term(binary, upper)),
            Sign::LessEqual,
            0.0,
        );
        self.tie(
            lowering,
            &format!("{role}_lower"),
            input.sub(&Polynomial::term(binary, epsilon)),
            Sign::GreaterEqual,
            0.0,
        );
        Ok(Polynomial::from(binary))
    }

    fn binaries_of(
        &mut self,
        lowering: &mut Lowering,
        inputs: &[Polynomial],
    ) -> Result<Vec<Polynomial>, ModelError> {
        if inputs.is_empty() {
            return Err(lowering.invalid("at least one input is required"));
        }
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| self.binary_of(lowering, input, &format!("bin_{index}")))
            .collect()
    }

    /// AND over binary-valued polynomials.
    fn conjunction(
        &mut self,
        lowering: &mut Lowering,
        binaries: Vec<Polynomial>,
        role: &str,
    ) -> Result<Polynomial, ModelError> {
        let mut kept = Vec::with_capacity(binaries.len());
        for binary in binaries {
            if binary.is_constant() {
                if binary.constant() < 0.5 {
                    return Ok(Polynomial::from_constant(0.0));
                }
            } else {
                kept.push(binary);
            }
        }
        match kept.len() {
            0 => return Ok(Polynomial::from_constant(1.0)),
            1 => return Ok(kept.remove(0)),
            _ => {}
        }
        let result = self.auxiliary(
            lowering,
            role,
            VariableType::Binary,
            0.0,
            1.0,
            Some(Seed::All(kept.clone())),
        )?;
        for (index, binary) in kept.iter().enumerate() {
            self.tie(
                lowering,
                &format!("{role}_le_{index}"),
                Polynomial::from(result).sub(binary),
                Sign::LessEqual,
                0.0,
            );
        }
        let total: Polynomial = kept.iter().cloned().sum();
        self.tie(
            lowering,
            &format!("{role}_ge"),
            Polynomial::from(result).sub(&total),
            Sign::GreaterEqual,
            1.0 - kept.len() as f64,
        );
        Ok(Polynomial::from(result))
    }

    /// OR over binary-valued polynomials.
    fn disjunction(
        &mut self,
        lowering: &mut Lowering,
        binaries: Vec<Polynomial>,
        role: &str,
    ) -> Result<Polynomial, ModelError> {
        let mut kept = Vec::with_capacity(binaries.len());
        for binary in binaries {
            if binary.is_constant() {
                if binary.constant() >= 0.5 {
                    return Ok(Polynomial::from_constant(1.0));
                }
            } else {
                kept.push(binary);
            }
        }
        match kept.len() {
            0 => return Ok(Polynomial::from_constant(0.0)),
            1 => return Ok(kept.remove(0)),
            _ => {}
        }
        let result = self.auxiliary(
            lowering,
            role,
            VariableType::Binary,
            0.0,
            1.0,
            Some(Seed::Any(kept.clone())),
        )?;
        for (index, binary) in kept.iter().enumerate() {
            self.tie(
                lowering,
                &format!("{role}_ge_{index}"),
                Polynomial::from(result).sub(binary),
                Sign::GreaterEqual,
                0.0,
            );
        }
        let total: Polynomial = kept.iter().cloned().sum();
        self.tie(
            lowering,
            &format!("{role}_le"),
            Polynomial::from(result).sub(&total),
            Sign::LessEqual,
            0.0,
        );
        Ok(Polynomial::from(result))
    }

    // ── Slack, abs and extrema ──────────────────────────────

    fn lower_slack(
        &mut self,
        lowering: &mut Lowering,
        x: &Polynomial,
        threshold: f64,
        direction: SlackDirection,
    ) -> Result<Polynomial, ModelError> {
        let deviation = x.add_constant(-threshold);
        let range = self.span_of(lowering, &deviation)?;
        let kind = self.slack_kind(&deviation);
        let shortfall = (-range.lower_f64()).max(0.0);
        let excess = range.upper_f64().max(0.0);

        let negative = if matches!(direction, SlackDirection::Negative | SlackDirection::Both) {
            Some(self.auxiliary(
                lowering,
                "neg",
                kind,
                0.0,
                shortfall,
                Some(Seed::NegativePart(deviation.clone())),
            )?)
        } else {
            None
        };
        let positive = if matches!(direction, SlackDirection::Positive | SlackDirection::Both) {
            Some(self.auxiliary(
                lowering,
                "pos",
                kind,
                0.0,
                excess,
                Some(Seed::PositivePart(deviation.clone())),
            )?)
        } else {
            None
        };

        match (negative, positive) {
            (Some(negative), Some(positive)) => {
                self.tie(
                    lowering,
                    "balance",
                    deviation + negative - positive,
                    Sign::Equal,
                    0.0,
                );
                Ok(negative + positive)
            }
            (None, Some(positive)) => {
                self.tie(lowering, "upper", deviation - positive, Sign::LessEqual, 0.0);
                Ok(Polynomial::from(positive))
            }
            (Some(negative), None) => {
                self.tie(
                    lowering,
                    "lower",
                    deviation + negative,
                    Sign::GreaterEqual,
                    0.0,
                );
                Ok(Polynomial::from(negative))
            }
            (None, None) => Ok(Polynomial::new_empty()),
        }
    }

    fn lower_slack_range(
        &mut self,
        lowering: &mut Lowering,
        x: &Polynomial,
        lower: f64,
        upper: f64,
    ) -> Result<Polynomial, ModelError> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(lowering.invalid(format!("slack range [{lower}, {upper}] is invalid")));
        }
        let range = self.span_of(lowering, x)?;
        let below = x.add_constant(-lower);
        let above = x.add_constant(-upper);
        let kind = if below.discrete(self) && above.discrete(self) {
            VariableType::UInteger
        } else {
            VariableType::UContinuous
        };
        let negative = self.auxiliary(
            lowering,
            "neg",
            kind,
            0.0,
            (lower - range.lower_f64()).max(0.0),
            Some(Seed::NegativePart(below)),
        )?;
        let positive = self.auxiliary(
            lowering,
            "pos",
            kind,
            0.0,
            (range.upper_f64() - upper).max(0.0),
            Some(Seed::PositivePart(above)),
        )?;
        self.tie(
            lowering,
            "lower",
            x.add(&Polynomial::from(negative)),
            Sign::GreaterEqual,
            lower,
        );
        self.tie(
            lowering,
            "upper",
            x.sub(&Polynomial::from(positive)),
            Sign::LessEqual,
            upper,
        );
        Ok(negative + positive)
    }

    fn lower_abs(
        &mut self,
        lowering: &mut Lowering,
        input: &Polynomial,
    ) -> Result<Polynomial, ModelError> {
        let range = self.span_of(lowering, input)?;
        if range.lower_f64() >= 0.0 {
            return Ok(input.clone());
        }
        if range.upper_f64() <= 0.0 {
            return Ok(input.neg());
        }
        let (lower, upper) = self.bounds_of(lowering, input)?;
        let kind = self.slack_kind(input);
        let positive = self.auxiliary(
            lowering,
            "pos",
            kind,
            0.0,
            upper,
            Some(Seed::PositivePart(input.clone())),
        )?;
        let negative = self.auxiliary(
            lowering,
            "neg",
            kind,
            0.0,
            -lower,
            Some(Seed::NegativePart(input.clone())),
        )?;
        let sign = self.auxiliary(
            lowering,
            "sign",
            VariableType::Binary,
            0.0,
            1.0,
            Some(Seed::Positive(input.clone())),
        )?;
        self.tie(
            lowering,
            "balance",
            input.sub(&Polynomial::from(positive)).add(&Polynomial::from(negative)),
            Sign::Equal,
            0.0,
        );
        self.tie(
            lowering,
            "pos_switch",
            positive - sign * upper,
            Sign::LessEqual,
            0.0,
        );
        // neg <= -lower * (1 - sign)
        self.tie(
            lowering,
            "neg_switch",
            negative - sign * lower,
            Sign::LessEqual,
            -lower,
        );
        Ok(positive + negative)
    }

    fn lower_extremum(
        &mut self,
        lowering: &mut Lowering,
        inputs: &[Polynomial],
        exact: bool,
        maximum: bool,
    ) -> Result<Polynomial, ModelError> {
        match inputs {
            [] => return Err(lowering.invalid("at least one input is required")),
            [single] => return Ok(single.clone()),
            _ => {}
        }
        let mut ranges = Vec::with_capacity(inputs.len());
        for input in inputs {
            ranges.push(self.span_of(lowering, input)?);
        }
        let lowers: Vec<f64> = ranges.iter().map(|range| range.lower_f64()).collect();
        let uppers: Vec<f64> = ranges.iter().map(|range| range.upper_f64()).collect();
        let fold = |values: &[f64]| {
            values.iter().copied().fold(
                if maximum {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                },
                |acc, value| if maximum { acc.max(value) } else { acc.min(value) },
            )
        };
        let (result_lower, result_upper) = (fold(&lowers), fold(&uppers));
        let seed = if maximum {
            Seed::Max(inputs.to_vec())
        } else {
            Seed::Min(inputs.to_vec())
        };
        let result = self.auxiliary(
            lowering,
            "result",
            VariableType::Continuous,
            result_lower,
            result_upper,
            Some(seed),
        )?;
        let bound_sign = if maximum {
            Sign::GreaterEqual
        } else {
            Sign::LessEqual
        };
        for (index, input) in inputs.iter().enumerate() {
            self.tie(
                lowering,
                &format!("bound_{index}"),
                Polynomial::from(result).sub(input),
                bound_sign,
                0.0,
            );
        }
        if !exact {
            return Ok(Polynomial::from(result));
        }

        for input in inputs {
            self.bounds_of(lowering, input)?;
        }
        let mut selectors = Vec::with_capacity(inputs.len());
        for index in 0..inputs.len() {
            selectors.push(self.auxiliary(
                lowering,
                &format!("select_{index}"),
                VariableType::Binary,
                0.0,
                1.0,
                Some(Seed::Selects {
                    inputs: inputs.to_vec(),
                    index,
                    maximum,
                }),
            )?);
        }
        let selected = tetra_expr::sum(selectors.iter().copied());
        self.tie(lowering, "select", selected, Sign::Equal, 1.0);
        for (index, input) in inputs.iter().enumerate() {
            let selector = selectors[index];
            if maximum {
                // y <= p_i + M_i (1 - u_i), M_i = max_j U_j - L_i
                let big_m = result_upper - lowers[index];
                self.tie(
                    lowering,
                    &format!("attain_{index}"),
                    Polynomial::from(result)
                        .sub(input)
                        .add(&Polynomial::term(selector, big_m)),
                    Sign::LessEqual,
                    big_m,
                );
            } else {
                // y >= p_i - M_i (1 - u_i), M_i = U_i - min_j L_j
                let big_m = uppers[index] - result_lower;
                self.tie(
                    lowering,
                    &format!("attain_{index}"),
                    Polynomial::from(result)
                        .sub(input)
                        .sub(&Polynomial::term(selector, big_m)),
                    Sign::GreaterEqual,
                    -big_m,
                );
            }
        }
        Ok(Polynomial::from(result))
    }
}
