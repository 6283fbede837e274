//! A [Variable] is a named decision variable.
//! The goal of the solver is to find optimal values for all variables in a problem.
//!
//! Each variable has a [VariableKind] and a pair of bounds. Integer and real variables
//! start with the default bounds `[-10000, 10000]`, and remember which bound is still
//! at its default so that a global override only touches those.
use std::collections::Bound;
use std::fmt::{Display, Formatter};
use std::ops::{Mul, RangeBounds};

use crate::error::ModelError;
use crate::term::Term;

/// Lower bound of integer and real variables whose lower bound was never set
pub const DEFAULT_LOWER_BOUND: f64 = -10_000.;
/// Upper bound of integer and real variables whose upper bound was never set
pub const DEFAULT_UPPER_BOUND: f64 = 10_000.;

/// The domain of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// 0 or 1
    Binary,
    /// Any integer between the bounds
    Integer,
    /// Any real number between the bounds
    Real,
}

impl Display for VariableKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VariableKind::Binary => "binary",
            VariableKind::Integer => "integer",
            VariableKind::Real => "real",
        })
    }
}

/// Which bounds of a variable still hold their type default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultBounds {
    /// The lower bound was never set explicitly
    pub lower: bool,
    /// The upper bound was never set explicitly
    pub upper: bool,
}

/// A decision variable.
///
/// Variables are identified by their name: two variables with the same name
/// represent the same decision in a [Problem](crate::Problem), which keeps the
/// first definition it sees and rejects later ones that disagree with it.
///
/// ```
/// # use ilp_lowering::Variable;
/// let x = Variable::integer("x").clamp(0, 10);
/// assert_eq!((x.lower_bound(), x.upper_bound()), (0., 10.));
/// assert!(!x.bound_is_default().lower);
///
/// let y = Variable::real("y").min(0);
/// assert_eq!((y.lower_bound(), y.upper_bound()), (0., 10_000.));
/// assert!(y.bound_is_default().upper);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    lower: f64,
    upper: f64,
    value: f64,
    default_bounds: DefaultBounds,
}

impl Variable {
    /// Creates a variable of the given kind with the default bounds of that kind
    pub fn new<S: Into<String>>(name: S, kind: VariableKind) -> Self {
        let (lower, upper, is_default) = match kind {
            VariableKind::Binary => (0., 1., false),
            VariableKind::Integer | VariableKind::Real => {
                (DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND, true)
            }
        };
        Variable {
            name: name.into(),
            kind,
            lower,
            upper,
            value: 0.,
            default_bounds: DefaultBounds {
                lower: is_default,
                upper: is_default,
            },
        }
    }

    /// Creates a 0-1 variable
    pub fn binary<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableKind::Binary)
    }

    /// Creates an integer variable with default bounds
    pub fn integer<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableKind::Integer)
    }

    /// Creates a continuous variable with default bounds
    pub fn real<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableKind::Real)
    }

    /// Set the lower bound of the variable
    pub fn min<N: Into<f64>>(mut self, min: N) -> Self {
        self.lower = min.into();
        self.default_bounds.lower = false;
        self
    }

    /// Set the higher bound of the variable
    pub fn max<N: Into<f64>>(mut self, max: N) -> Self {
        self.upper = max.into();
        self.default_bounds.upper = false;
        self
    }

    /// Set both the lower and higher bounds of the variable
    pub fn clamp<N1: Into<f64>, N2: Into<f64>>(self, min: N1, max: N2) -> Self {
        self.min(min).max(max)
    }

    /// Set the lower and/or higher bounds of the variable.
    /// An unbounded side keeps its current value.
    ///
    /// ```
    /// # use ilp_lowering::Variable;
    /// assert_eq!(Variable::real("x").bounds(1..2), Variable::real("x").clamp(1, 2));
    /// assert_eq!(Variable::real("x").bounds(..=2), Variable::real("x").max(2));
    /// ```
    pub fn bounds<N: Into<f64> + Copy, B: RangeBounds<N>>(self, bounds: B) -> Self {
        let with_min = match bounds.start_bound() {
            Bound::Included(&x) | Bound::Excluded(&x) => self.min(x),
            Bound::Unbounded => self,
        };
        match bounds.end_bound() {
            Bound::Included(&x) | Bound::Excluded(&x) => with_min.max(x),
            Bound::Unbounded => with_min,
        }
    }

    /// Replaces the lower bound.
    /// Binary variables only accept bounds inside `[0, 1]`.
    pub fn set_lower_bound(&mut self, bound: f64) -> Result<(), ModelError> {
        self.check_binary_bound(bound)?;
        self.lower = bound;
        self.default_bounds.lower = false;
        Ok(())
    }

    /// Replaces the upper bound.
    /// Binary variables only accept bounds inside `[0, 1]`.
    pub fn set_upper_bound(&mut self, bound: f64) -> Result<(), ModelError> {
        self.check_binary_bound(bound)?;
        self.upper = bound;
        self.default_bounds.upper = false;
        Ok(())
    }

    /// Replaces both bounds at once, refusing an empty interval
    pub fn set_bounds(&mut self, lower: f64, upper: f64) -> Result<(), ModelError> {
        if lower > upper {
            return Err(ModelError::argument(format!(
                "variable {}: lower bound {} is greater than upper bound {}",
                self.name, lower, upper
            )));
        }
        self.check_binary_bound(lower)?;
        self.check_binary_bound(upper)?;
        self.lower = lower;
        self.upper = upper;
        self.default_bounds = DefaultBounds {
            lower: false,
            upper: false,
        };
        Ok(())
    }

    fn check_binary_bound(&self, bound: f64) -> Result<(), ModelError> {
        if self.kind == VariableKind::Binary && !(0. ..=1.).contains(&bound) {
            return Err(ModelError::argument(format!(
                "binary variable {} cannot have the bound {}",
                self.name, bound
            )));
        }
        Ok(())
    }

    /// Checks that the bounds describe a non-empty interval
    /// (and stay inside `[0, 1]` for binaries)
    pub fn check_bounds(&self) -> Result<(), ModelError> {
        if self.lower > self.upper {
            return Err(ModelError::argument(format!(
                "variable {}: lower bound {} is greater than upper bound {}",
                self.name, self.lower, self.upper
            )));
        }
        self.check_binary_bound(self.lower)?;
        self.check_binary_bound(self.upper)
    }

    /// The name, which is also the identity of the variable
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The domain of the variable
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Current lower bound
    pub fn lower_bound(&self) -> f64 {
        self.lower
    }

    /// Current upper bound
    pub fn upper_bound(&self) -> f64 {
        self.upper
    }

    /// Which bounds were never set explicitly
    pub fn bound_is_default(&self) -> DefaultBounds {
        self.default_bounds
    }

    /// The value written back by a solver, 0 until then
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Stores a solution value.
    /// Values of integer variables are rounded, and binaries are stored as 0 or 1.
    pub fn set_value(&mut self, value: f64) {
        self.value = match self.kind {
            VariableKind::Binary => {
                if value.round() != 0. {
                    1.
                } else {
                    0.
                }
            }
            VariableKind::Integer => value.round(),
            VariableKind::Real => value,
        };
    }

    /// Whether the solver must give this variable an integral value
    pub fn is_integer(&self) -> bool {
        self.kind != VariableKind::Real
    }

    /// Overrides the bounds still at their default. Used for global bounds.
    pub(crate) fn override_default_bounds(&mut self, lower: f64, upper: f64) {
        if self.kind == VariableKind::Binary {
            return;
        }
        if self.default_bounds.lower {
            self.lower = lower;
            self.default_bounds.lower = false;
        }
        if self.default_bounds.upper {
            self.upper = upper;
            self.default_bounds.upper = false;
        }
    }

    /// Returns a description of the disagreement when `other` is a different
    /// definition of the variable with the same name.
    /// A bound left at its default in `other` never disagrees.
    pub(crate) fn conflict_with(&self, other: &Variable) -> Option<String> {
        if self.kind != other.kind {
            return Some(format!(
                "variable {} is declared as {} and cannot be redefined as {}",
                self.name, self.kind, other.kind
            ));
        }
        let lower_differs = !other.default_bounds.lower && other.lower != self.lower;
        let upper_differs = !other.default_bounds.upper && other.upper != self.upper;
        if lower_differs || upper_differs {
            return Some(format!(
                "variable {} is declared with bounds [{}, {}] and cannot be redefined with [{}, {}]",
                self.name, self.lower, self.upper, other.lower, other.upper
            ));
        }
        None
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

macro_rules! impl_mul_num {
    ($($num:ty),*) => {$(
        impl Mul<$num> for &Variable {
            type Output = Term;

            fn mul(self, rhs: $num) -> Self::Output {
                Term::linear(self, rhs)
            }
        }

        impl Mul<$num> for Variable {
            type Output = Term;

            fn mul(self, rhs: $num) -> Self::Output {
                Term::Linear {
                    var: self,
                    weight: f64::from(rhs),
                }
            }
        }

        impl Mul<&Variable> for $num {
            type Output = Term;

            fn mul(self, rhs: &Variable) -> Self::Output {
                Term::linear(rhs, self)
            }
        }
    )*};
}

impl_mul_num!(f64, i32);

impl Mul<&Variable> for &Variable {
    type Output = Term;

    fn mul(self, rhs: &Variable) -> Self::Output {
        Term::quadratic(self, rhs, 1.)
    }
}
