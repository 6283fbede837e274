//! Special ordered sets of type 1: at most one variable of the set is nonzero.
use std::fmt::{Display, Formatter};

use crate::constraint::{NormalConstraint, Operator};
use crate::error::ModelError;
use crate::lowering::{LoweringContext, DEFAULT_BIG_M, DEFAULT_EPSILON};
use crate::solvers::Solution;
use crate::term::{Shape, Term};
use crate::variable::Variable;

/// At most one of `variables` may take a nonzero value.
///
/// The weights only order the variables for solvers with a native SOS1 primitive,
/// they are not coefficients. The bound is the big-M of the rewriting and must
/// exceed the magnitude any of the variables can reach.
#[derive(Debug, Clone, PartialEq)]
pub struct Sos1Constraint {
    variables: Vec<Variable>,
    weights: Vec<f64>,
    bound: f64,
    epsilon: f64,
}

impl Sos1Constraint {
    /// A set weighted `1, 2, ..., n` in order
    pub fn new(variables: Vec<Variable>) -> Self {
        let weights = (1..=variables.len()).map(|w| w as f64).collect();
        Self::weighted(variables, weights)
    }

    /// A set with explicit weights.
    /// Both lists must have the same length, which [Sos1Constraint::validate] checks.
    pub fn weighted(variables: Vec<Variable>, weights: Vec<f64>) -> Self {
        Sos1Constraint {
            variables,
            weights,
            bound: DEFAULT_BIG_M,
            epsilon: DEFAULT_EPSILON,
        }
    }

    /// Sets the big-M
    pub fn with_bound(mut self, bound: f64) -> Self {
        self.bound = bound;
        self
    }

    /// Sets the epsilon carried by the constraints of the rewriting
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bound(&self) -> f64 {
        self.bound
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Native solvers order the set by weight, equal weights make that order ambiguous
    pub fn has_duplicate_weights(&self) -> bool {
        let mut sorted = self.weights.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.windows(2).any(|w| w[0] == w[1])
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.variables.is_empty() {
            return Err(ModelError::argument("SOS1 constraint without variables"));
        }
        if self.variables.len() != self.weights.len() {
            return Err(ModelError::argument(format!(
                "{} has {} variables but {} weights",
                self,
                self.variables.len(),
                self.weights.len()
            )));
        }
        Ok(())
    }

    /// True when at most one variable is farther than `tolerance` from 0
    pub fn is_satisfied_by<S: Solution>(&self, values: &S, tolerance: f64) -> bool {
        self.variables
            .iter()
            .filter(|v| values.value(v).abs() > tolerance)
            .count()
            <= 1
    }

    /// Rewrites the set with one binary indicator `s_i` per variable:
    /// `v_i - M s_i <= 0`, `v_i + M s_i >= 0` for each variable, then `sum(s_i) <= 1`.
    pub fn lower<C: LoweringContext>(&self, ctx: &mut C) -> Vec<NormalConstraint> {
        let mut lowered = Vec::with_capacity(2 * self.variables.len() + 1);
        let mut indicators = Vec::with_capacity(self.variables.len());
        for var in &self.variables {
            let indicator = Variable::binary(ctx.fresh_name("sos_binary"));
            for (sign, op) in [
                (-1., Operator::LessOrEqual),
                (1., Operator::GreaterOrEqual),
            ] {
                lowered.push(NormalConstraint::from_terms(
                    Shape::Linear,
                    vec![Term::linear(var, 1), Term::linear(&indicator, sign * self.bound)],
                    op,
                    0.,
                    self.epsilon,
                ));
            }
            indicators.push(Term::linear(&indicator, 1));
        }
        lowered.push(NormalConstraint::from_terms(
            Shape::Linear,
            indicators,
            Operator::LessOrEqual,
            1.,
            self.epsilon,
        ));
        lowered
    }
}

impl Display for Sos1Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOS1(")?;
        for (i, var) in self.variables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", var)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::lowering::NameGenerator;

    #[test]
    fn validation() {
        let a = Variable::real("a");
        let b = Variable::real("b");
        assert!(Sos1Constraint::new(vec![]).validate().is_err());
        let mismatched = Sos1Constraint::weighted(vec![a.clone(), b.clone()], vec![1.]);
        assert_eq!(mismatched.validate().unwrap_err().code(), "ARGUMENT_INVALID");
        let sos = Sos1Constraint::new(vec![a, b]);
        assert!(sos.validate().is_ok());
        assert_eq!(sos.weights(), &[1., 2.]);
        assert!(!sos.has_duplicate_weights());
        assert_eq!(sos.to_string(), "SOS1(a, b)");
    }

    /// Every assignment of a, b, c in {-10, 0, 10} and of the indicators
    #[test]
    fn lowering_enforces_exclusivity() {
        let vars: Vec<Variable> = ["a", "b", "c"].iter().map(|n| Variable::real(*n)).collect();
        let sos = Sos1Constraint::new(vars).with_bound(10.);
        let mut names = NameGenerator::default();
        let lowered = sos.lower(&mut names);
        assert_eq!(lowered.len(), 7);
        let indicators: Vec<String> = (0..3).map(|i| format!("sos_binary#{}", i)).collect();

        let levels = [-10., 0., 10.];
        for &a in &levels {
            for &b in &levels {
                for &c in &levels {
                    let nonzero = [a, b, c].iter().filter(|v: &&f64| **v != 0.).count();
                    let reachable = (0..8).any(|mask: u32| {
                        let mut values: HashMap<String, f64> =
                            HashMap::from([("a".into(), a), ("b".into(), b), ("c".into(), c)]);
                        for (i, name) in indicators.iter().enumerate() {
                            values.insert(name.clone(), f64::from((mask >> i) & 1));
                        }
                        lowered.iter().all(|c| c.is_satisfied_by(&values, 1e-9))
                    });
                    assert_eq!(reachable, nonzero <= 1, "a={} b={} c={}", a, b, c);
                }
            }
        }
    }
}
