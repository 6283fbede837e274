//! Atomic pieces of an algebraic expression.
use std::fmt::{Display, Formatter};
use std::ops::{Mul, Neg};

use crate::solvers::Solution;
use crate::variable::Variable;

/// The algebraic degree a function or constraint is allowed to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Only linear terms
    Linear,
    /// Linear and quadratic terms
    Quadratic,
}

impl Shape {
    /// The smallest shape that contains both
    pub fn join(self, other: Shape) -> Shape {
        match (self, other) {
            (Shape::Linear, Shape::Linear) => Shape::Linear,
            _ => Shape::Quadratic,
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Shape::Linear => "linear",
            Shape::Quadratic => "quadratic",
        })
    }
}

/// A weighted product of one or two variables
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// `weight * var`
    Linear {
        /// The variable
        var: Variable,
        /// Its coefficient
        weight: f64,
    },
    /// `weight * var1 * var2`. Both variables may be the same one.
    Quadratic {
        /// First factor
        var1: Variable,
        /// Second factor
        var2: Variable,
        /// Coefficient of the product
        weight: f64,
    },
}

impl Term {
    /// `weight * var`
    pub fn linear<N: Into<f64>>(var: &Variable, weight: N) -> Self {
        Term::Linear {
            var: var.clone(),
            weight: weight.into(),
        }
    }

    /// `weight * var1 * var2`
    pub fn quadratic<N: Into<f64>>(var1: &Variable, var2: &Variable, weight: N) -> Self {
        Term::Quadratic {
            var1: var1.clone(),
            var2: var2.clone(),
            weight: weight.into(),
        }
    }

    /// The coefficient of the term
    pub fn weight(&self) -> f64 {
        match self {
            Term::Linear { weight, .. } | Term::Quadratic { weight, .. } => *weight,
        }
    }

    /// The same term with its coefficient multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Term {
        let mut term = self.clone();
        match &mut term {
            Term::Linear { weight, .. } | Term::Quadratic { weight, .. } => *weight *= factor,
        }
        term
    }

    /// Whether this is a linear or a quadratic term
    pub fn shape(&self) -> Shape {
        match self {
            Term::Linear { .. } => Shape::Linear,
            Term::Quadratic { .. } => Shape::Quadratic,
        }
    }

    /// The variables the term multiplies, with repetition for squares
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        let (first, second) = match self {
            Term::Linear { var, .. } => (var, None),
            Term::Quadratic { var1, var2, .. } => (var1, Some(var2)),
        };
        std::iter::once(first).chain(second)
    }

    /// Value of the term for the given variable values
    pub fn evaluate<S: Solution>(&self, values: &S) -> f64 {
        match self {
            Term::Linear { var, weight } => weight * values.value(var),
            Term::Quadratic { var1, var2, weight } => {
                weight * values.value(var1) * values.value(var2)
            }
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let weight = self.weight();
        if (weight - 1.).abs() > f64::EPSILON {
            write!(f, "{} ", weight)?;
        }
        match self {
            Term::Linear { var, .. } => write!(f, "{}", var),
            Term::Quadratic { var1, var2, .. } => write!(f, "{}*{}", var1, var2),
        }
    }
}

impl Neg for Term {
    type Output = Term;

    fn neg(self) -> Self::Output {
        self.scaled(-1.)
    }
}

macro_rules! impl_mul_num {
    ($($num:ty),*) => {$(
        impl Mul<$num> for Term {
            type Output = Term;

            fn mul(self, rhs: $num) -> Self::Output {
                self.scaled(f64::from(rhs))
            }
        }

        impl Mul<Term> for $num {
            type Output = Term;

            fn mul(self, rhs: Term) -> Self::Output {
                rhs.scaled(f64::from(self))
            }
        }
    )*};
}

impl_mul_num!(f64, i32);

/// A bare weight in a function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant(pub f64);

impl Constant {
    /// The value of the constant
    pub fn weight(self) -> f64 {
        self.0
    }
}

impl From<f64> for Constant {
    fn from(weight: f64) -> Self {
        Constant(weight)
    }
}
