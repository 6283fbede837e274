//! Functions are sums of terms, constants and weighted sub-functions.
//!
//! A function keeps its nesting as it was built: `2 * (x + y + 42)` is stored as a
//! sub-function `x + y + 42` with weight 2. [Function::expand] flattens it
//! into `2 x + 2 y + 84`. Duplicate variables are never merged, backends do that if
//! they need to.
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use crate::error::ModelError;
use crate::solvers::Solution;
use crate::term::{Constant, Shape, Term};
use crate::variable::Variable;

/// A sub-function and the weight it is multiplied by
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFunction {
    /// The nested function
    pub function: Function,
    /// The factor applied to every term and constant of the nested function
    pub weight: f64,
}

/// A linear or quadratic function of variables
///
/// ```
/// # use ilp_lowering::{Function, Variable};
/// let x = Variable::real("x");
/// let y = Variable::real("y");
/// let f = 2 * (&x * 3 + &y + 1.);
/// assert!(!f.is_flat());
/// let flat = f.expand();
/// assert!(flat.is_flat());
/// assert_eq!(flat.to_string(), "6 x + 2 y + 2");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    shape: Shape,
    terms: Vec<Term>,
    constants: Vec<Constant>,
    nested: Vec<WeightedFunction>,
}

impl Function {
    /// An empty function of the given shape
    pub fn new(shape: Shape) -> Self {
        Function {
            shape,
            terms: vec![],
            constants: vec![],
            nested: vec![],
        }
    }

    /// An empty linear function. Quadratic terms are refused.
    pub fn linear() -> Self {
        Self::new(Shape::Linear)
    }

    /// An empty quadratic function
    pub fn quadratic() -> Self {
        Self::new(Shape::Quadratic)
    }

    fn check_shape(&self, shape: Shape, what: &str) -> Result<(), ModelError> {
        if self.shape == Shape::Linear && shape == Shape::Quadratic {
            return Err(ModelError::InvalidShape(format!(
                "cannot add a quadratic {} to the linear function {}",
                what, self
            )));
        }
        Ok(())
    }

    /// Adds a term, failing if a quadratic term is added to a linear function
    pub fn add_term(&mut self, term: Term) -> Result<(), ModelError> {
        self.check_shape(term.shape(), "term")?;
        self.terms.push(term);
        Ok(())
    }

    /// Adds `weight * var`
    pub fn add_linear_term<N: Into<f64>>(&mut self, var: &Variable, weight: N) {
        self.terms.push(Term::linear(var, weight));
    }

    /// Adds `weight * var1 * var2`
    pub fn add_quadratic_term<N: Into<f64>>(
        &mut self,
        var1: &Variable,
        var2: &Variable,
        weight: N,
    ) -> Result<(), ModelError> {
        self.add_term(Term::quadratic(var1, var2, weight))
    }

    /// Adds a constant
    pub fn add_constant<N: Into<f64>>(&mut self, weight: N) {
        self.constants.push(Constant(weight.into()));
    }

    /// Adds `weight * function` as a sub-function.
    /// A linear function only accepts linear sub-functions.
    pub fn add_nested<N: Into<f64>>(
        &mut self,
        function: Function,
        weight: N,
    ) -> Result<(), ModelError> {
        self.check_shape(function.shape, "function")?;
        self.nested.push(WeightedFunction {
            function,
            weight: weight.into(),
        });
        Ok(())
    }

    /// Whether the function may contain quadratic terms
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// The terms of this level, without those of the sub-functions
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// The constants of this level, without those of the sub-functions
    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    /// The weighted sub-functions
    pub fn nested(&self) -> &[WeightedFunction] {
        &self.nested
    }

    /// Sum of the constants of this level
    pub fn constant(&self) -> f64 {
        self.constants.iter().map(|c| c.0).sum()
    }

    /// True when there are no sub-functions left
    pub fn is_flat(&self) -> bool {
        self.nested.is_empty()
    }

    /// True when the function, sub-functions included, has no term
    pub fn has_no_terms(&self) -> bool {
        self.terms.is_empty() && self.nested.iter().all(|n| n.function.has_no_terms())
    }

    /// Returns an equivalent function without sub-functions.
    ///
    /// Terms and constants of this level are copied as they are, those of every
    /// sub-function are expanded recursively and multiplied by its weight.
    /// If a sub-function is quadratic, so is the result.
    pub fn expand(&self) -> Function {
        let mut flat = Function {
            shape: self.shape,
            terms: self.terms.clone(),
            constants: self.constants.clone(),
            nested: vec![],
        };
        for WeightedFunction { function, weight } in &self.nested {
            let inner = function.expand();
            flat.shape = flat.shape.join(inner.shape);
            flat.terms.extend(inner.terms.iter().map(|term| term.scaled(*weight)));
            flat.constants.extend(inner.constants.iter().map(|c| Constant(c.0 * weight)));
        }
        flat
    }

    /// Value of the function for the given variable values
    ///
    /// ```
    /// # use std::collections::HashMap;
    /// # use ilp_lowering::Variable;
    /// let a = Variable::real("a");
    /// let b = Variable::real("b");
    /// let values = HashMap::from([("a".to_string(), 100.), ("b".to_string(), -1.)]);
    /// assert_eq!((&a * 1 + 3. * (&b * 1 + 3.)).evaluate(&values), 106.);
    /// ```
    pub fn evaluate<S: Solution>(&self, values: &S) -> f64 {
        let own: f64 = self.terms.iter().map(|t| t.evaluate(values)).sum::<f64>() + self.constant();
        own + self
            .nested
            .iter()
            .map(|n| n.weight * n.function.evaluate(values))
            .sum::<f64>()
    }

    /// Every variable referenced by the function and its sub-functions,
    /// in order of appearance and with repetitions
    pub fn variables(&self) -> Vec<&Variable> {
        let mut out = vec![];
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a Variable>) {
        out.extend(self.terms.iter().flat_map(Term::variables));
        for nested in &self.nested {
            nested.function.collect_variables(out);
        }
    }

    /// Operators build new values, so unlike [Function::add_term] they widen the
    /// shape to fit the term: `Function::linear() + &x * &x` is quadratic.
    fn push_term(mut self, term: Term) -> Self {
        self.shape = self.shape.join(term.shape());
        self.terms.push(term);
        self
    }

    fn wrapped(self, weight: f64) -> Function {
        Function {
            shape: self.shape,
            terms: vec![],
            constants: vec![],
            nested: vec![WeightedFunction {
                function: self,
                weight,
            }],
        }
    }
}

impl Default for Function {
    fn default() -> Self {
        Function::linear()
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut separator = |f: &mut Formatter<'_>| {
            if first {
                first = false;
                Ok(())
            } else {
                write!(f, " + ")
            }
        };
        for term in &self.terms {
            separator(f)?;
            write!(f, "{}", term)?;
        }
        for constant in &self.constants {
            separator(f)?;
            write!(f, "{}", constant.0)?;
        }
        for WeightedFunction { function, weight } in &self.nested {
            separator(f)?;
            if (weight - 1.).abs() > f64::EPSILON {
                write!(f, "{} ", weight)?;
            }
            write!(f, "({})", function)?;
        }
        if first {
            write!(f, "0")?;
        }
        Ok(())
    }
}

impl FromIterator<Term> for Function {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        iter.into_iter().fold(Function::linear(), Function::push_term)
    }
}

impl Sum<Term> for Function {
    fn sum<I: Iterator<Item = Term>>(iter: I) -> Self {
        iter.collect()
    }
}

impl Sum<Function> for Function {
    fn sum<I: Iterator<Item = Function>>(iter: I) -> Self {
        iter.fold(Function::linear(), Add::add)
    }
}

impl From<Term> for Function {
    fn from(term: Term) -> Self {
        Function::linear().push_term(term)
    }
}

impl From<Vec<Term>> for Function {
    fn from(terms: Vec<Term>) -> Self {
        terms.into_iter().collect()
    }
}

impl From<&Variable> for Function {
    fn from(var: &Variable) -> Self {
        Term::linear(var, 1).into()
    }
}

impl From<Variable> for Function {
    fn from(var: Variable) -> Self {
        (&var).into()
    }
}

/// Widens a linear function to quadratic when `rhs` is quadratic.
/// Use [Function::add_term] to refuse quadratic terms instead.
impl Add<Term> for Function {
    type Output = Function;

    fn add(self, rhs: Term) -> Self::Output {
        self.push_term(rhs)
    }
}

impl Sub<Term> for Function {
    type Output = Function;

    fn sub(self, rhs: Term) -> Self::Output {
        self.push_term(-rhs)
    }
}

impl Add<&Variable> for Function {
    type Output = Function;

    fn add(self, rhs: &Variable) -> Self::Output {
        self + Term::linear(rhs, 1)
    }
}

impl Sub<&Variable> for Function {
    type Output = Function;

    fn sub(self, rhs: &Variable) -> Self::Output {
        self + Term::linear(rhs, -1)
    }
}

impl Add<Function> for Function {
    type Output = Function;

    fn add(mut self, rhs: Function) -> Self::Output {
        self.shape = self.shape.join(rhs.shape);
        self.nested.push(WeightedFunction {
            function: rhs,
            weight: 1.,
        });
        self
    }
}

impl Sub<Function> for Function {
    type Output = Function;

    fn sub(self, rhs: Function) -> Self::Output {
        self + (-rhs)
    }
}

impl Neg for Function {
    type Output = Function;

    fn neg(self) -> Self::Output {
        self.wrapped(-1.)
    }
}

impl Add<Term> for Term {
    type Output = Function;

    fn add(self, rhs: Term) -> Self::Output {
        Function::from(self) + rhs
    }
}

impl Sub<Term> for Term {
    type Output = Function;

    fn sub(self, rhs: Term) -> Self::Output {
        Function::from(self) - rhs
    }
}

impl Add<Function> for Term {
    type Output = Function;

    fn add(self, rhs: Function) -> Self::Output {
        Function::from(self) + rhs
    }
}

impl Add<&Variable> for Term {
    type Output = Function;

    fn add(self, rhs: &Variable) -> Self::Output {
        Function::from(self) + rhs
    }
}

impl Sub<&Variable> for Term {
    type Output = Function;

    fn sub(self, rhs: &Variable) -> Self::Output {
        Function::from(self) - rhs
    }
}

impl Add<Term> for &Variable {
    type Output = Function;

    fn add(self, rhs: Term) -> Self::Output {
        Function::from(self) + rhs
    }
}

impl Sub<Term> for &Variable {
    type Output = Function;

    fn sub(self, rhs: Term) -> Self::Output {
        Function::from(self) - rhs
    }
}

impl Add<&Variable> for &Variable {
    type Output = Function;

    fn add(self, rhs: &Variable) -> Self::Output {
        Function::from(self) + rhs
    }
}

impl Sub<&Variable> for &Variable {
    type Output = Function;

    fn sub(self, rhs: &Variable) -> Self::Output {
        Function::from(self) - rhs
    }
}

macro_rules! impl_num_ops {
    ($($num:ty),*) => {$(
        impl Add<$num> for Function {
            type Output = Function;

            fn add(mut self, rhs: $num) -> Self::Output {
                self.add_constant(rhs);
                self
            }
        }

        impl Sub<$num> for Function {
            type Output = Function;

            fn sub(mut self, rhs: $num) -> Self::Output {
                self.add_constant(-f64::from(rhs));
                self
            }
        }

        impl Add<$num> for Term {
            type Output = Function;

            fn add(self, rhs: $num) -> Self::Output {
                Function::from(self) + rhs
            }
        }

        impl Sub<$num> for Term {
            type Output = Function;

            fn sub(self, rhs: $num) -> Self::Output {
                Function::from(self) - rhs
            }
        }

        impl Mul<$num> for Function {
            type Output = Function;

            fn mul(self, rhs: $num) -> Self::Output {
                self.wrapped(f64::from(rhs))
            }
        }

        impl Mul<Function> for $num {
            type Output = Function;

            fn mul(self, rhs: Function) -> Self::Output {
                rhs.wrapped(f64::from(self))
            }
        }
    )*};
}

impl_num_ops!(f64, i32);
