//! Logical relations between binary variables.
use std::fmt::{Display, Formatter};

use crate::constraint::{NormalConstraint, Operator};
use crate::error::ModelError;
use crate::lowering::DEFAULT_EPSILON;
use crate::solvers::Solution;
use crate::term::{Shape, Term};
use crate::variable::{Variable, VariableKind};

/// A constraint some solvers understand natively
#[derive(Debug, Clone, PartialEq)]
pub enum GeneralConstraint {
    /// `result = OR(variables)`, over binaries
    OrVars {
        /// The operands
        variables: Vec<Variable>,
        /// 1 exactly when one of the operands is 1
        result: Variable,
    },
}

impl GeneralConstraint {
    /// `result = OR(variables)`
    pub fn or_vars(variables: Vec<Variable>, result: Variable) -> Self {
        GeneralConstraint::OrVars { variables, result }
    }

    /// The operands followed by the result
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        match self {
            GeneralConstraint::OrVars { variables, result } => {
                variables.iter().chain(std::iter::once(result))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            GeneralConstraint::OrVars { variables, .. } => {
                if variables.is_empty() {
                    return Err(ModelError::argument(format!("{} has no operand", self)));
                }
                if let Some(v) = self.variables().find(|v| v.kind() != VariableKind::Binary) {
                    return Err(ModelError::argument(format!(
                        "{}: {} is {}, only binaries are allowed",
                        self,
                        v,
                        v.kind()
                    )));
                }
                Ok(())
            }
        }
    }

    pub fn is_satisfied_by<S: Solution>(&self, values: &S, tolerance: f64) -> bool {
        match self {
            GeneralConstraint::OrVars { variables, result } => {
                let any = variables.iter().any(|v| values.value(v) > 0.5);
                let expected = if any { 1. } else { 0. };
                (values.value(result) - expected).abs() <= tolerance
            }
        }
    }

    /// For `r = OR(v_1..v_n)`: `r - v_i >= 0` for each operand, then `r - sum(v_i) <= 0`
    pub fn lower(&self) -> Vec<NormalConstraint> {
        match self {
            GeneralConstraint::OrVars { variables, result } => {
                let normal = |lhs, op| {
                    NormalConstraint::from_terms(Shape::Linear, lhs, op, 0., DEFAULT_EPSILON)
                };
                let mut lowered: Vec<NormalConstraint> = variables
                    .iter()
                    .map(|v| {
                        normal(
                            vec![Term::linear(result, 1), Term::linear(v, -1)],
                            Operator::GreaterOrEqual,
                        )
                    })
                    .collect();
                let mut sum = vec![Term::linear(result, 1)];
                sum.extend(variables.iter().map(|v| Term::linear(v, -1)));
                lowered.push(normal(sum, Operator::LessOrEqual));
                lowered
            }
        }
    }
}

impl Display for GeneralConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneralConstraint::OrVars { variables, result } => {
                write!(f, "{} = OR(", result)?;
                for (i, v) in variables.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}
