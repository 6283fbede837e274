//! Constraints define the relations that must hold in the solution.
use std::fmt::{Display, Formatter};

use crate::error::ModelError;
use crate::function::Function;
use crate::general::GeneralConstraint;
use crate::lowering::{LoweringContext, DEFAULT_EPSILON};
use crate::or_constraint::OrConstraint;
use crate::solvers::Solution;
use crate::sos1::Sos1Constraint;
use crate::term::{Shape, Term};
use crate::variable::Variable;

/// The relation between the left-hand side and the right-hand side of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `=`
    Equal,
    /// `>=`
    GreaterOrEqual,
    /// `>`
    Greater,
    /// `!=`
    NotEqual,
}

impl Operator {
    /// Whether a solver understands the operator without any rewriting
    pub fn is_canonical(self) -> bool {
        matches!(
            self,
            Operator::LessOrEqual | Operator::Equal | Operator::GreaterOrEqual
        )
    }

    /// The operator that holds exactly when this one does not
    pub fn complement(self) -> Operator {
        match self {
            Operator::Less => Operator::GreaterOrEqual,
            Operator::LessOrEqual => Operator::Greater,
            Operator::Equal => Operator::NotEqual,
            Operator::GreaterOrEqual => Operator::Less,
            Operator::Greater => Operator::LessOrEqual,
            Operator::NotEqual => Operator::Equal,
        }
    }

    /// Checks `lhs op rhs`.
    /// Non-strict relations accept a violation up to `tolerance`,
    /// strict relations and `!=` require a separation of more than `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        let diff = lhs - rhs;
        match self {
            Operator::Less => diff < -tolerance,
            Operator::LessOrEqual => diff <= tolerance,
            Operator::Equal => diff.abs() <= tolerance,
            Operator::GreaterOrEqual => diff >= -tolerance,
            Operator::Greater => diff > tolerance,
            Operator::NotEqual => diff.abs() > tolerance,
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Less => "<",
            Operator::LessOrEqual => "<=",
            Operator::Equal => "=",
            Operator::GreaterOrEqual => ">=",
            Operator::Greater => ">",
            Operator::NotEqual => "!=",
        })
    }
}

/// `lhs op rhs`, where `lhs` is a flat sum of terms and `rhs` a number.
///
/// The shape says whether `lhs` may contain quadratic terms.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalConstraint {
    shape: Shape,
    lhs: Vec<Term>,
    op: Operator,
    rhs: f64,
    epsilon: f64,
    name: Option<String>,
}

/// Creates the linear constraint `lhs op rhs`.
///
/// `lhs` is expanded and its constants are moved to the right-hand side.
/// Fails with [ModelError::InvalidShape] if `lhs` contains a quadratic term.
///
/// ```
/// # use ilp_lowering::{constraint, Operator, Variable};
/// let x = Variable::real("x");
/// let c = constraint::linear(&x * 2 + 1, Operator::Less, 5).unwrap();
/// assert_eq!(c.to_string(), "2 x < 4");
/// ```
pub fn linear<F: Into<Function>, N: Into<f64>>(
    lhs: F,
    op: Operator,
    rhs: N,
) -> Result<NormalConstraint, ModelError> {
    let lhs = lhs.into().expand();
    let rhs = rhs.into();
    if let Some(term) = lhs.terms().iter().find(|t| t.shape() == Shape::Quadratic) {
        return Err(ModelError::InvalidShape(format!(
            "the linear constraint {} {} {} contains the quadratic term {}",
            lhs, op, rhs, term
        )));
    }
    Ok(NormalConstraint::from_flat(Shape::Linear, lhs, op, rhs))
}

/// Creates the quadratic constraint `lhs op rhs`.
/// `lhs` is expanded and its constants are moved to the right-hand side.
pub fn quadratic<F: Into<Function>, N: Into<f64>>(lhs: F, op: Operator, rhs: N) -> NormalConstraint {
    NormalConstraint::from_flat(Shape::Quadratic, lhs.into().expand(), op, rhs.into())
}

impl NormalConstraint {
    fn from_flat(shape: Shape, lhs: Function, op: Operator, rhs: f64) -> Self {
        NormalConstraint {
            shape,
            rhs: rhs - lhs.constant(),
            lhs: lhs.terms().to_vec(),
            op,
            epsilon: DEFAULT_EPSILON,
            name: None,
        }
    }

    /// A constraint over terms that are already known to fit `shape`
    pub(crate) fn from_terms(
        shape: Shape,
        lhs: Vec<Term>,
        op: Operator,
        rhs: f64,
        epsilon: f64,
    ) -> Self {
        NormalConstraint {
            shape,
            lhs,
            op,
            rhs,
            epsilon,
            name: None,
        }
    }

    fn derived(&self, lhs: Vec<Term>, op: Operator, rhs: f64) -> Self {
        NormalConstraint {
            shape: self.shape,
            lhs,
            op,
            rhs,
            epsilon: self.epsilon,
            name: None,
        }
    }

    /// Sets the epsilon used to rewrite strict relations
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the constraint name
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a term to the left-hand side
    pub fn add_term(&mut self, term: Term) -> Result<(), ModelError> {
        if self.shape == Shape::Linear && term.shape() == Shape::Quadratic {
            return Err(ModelError::InvalidShape(format!(
                "cannot add the quadratic term {} to the linear constraint {}",
                term, self
            )));
        }
        self.lhs.push(term);
        Ok(())
    }

    /// Linear or quadratic
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Terms of the left-hand side
    pub fn lhs(&self) -> &[Term] {
        &self.lhs
    }

    /// The relation
    pub fn op(&self) -> Operator {
        self.op
    }

    /// The right-hand side
    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// The margin used to rewrite `<`, `>` and `!=`
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The constraint name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Variables of the left-hand side
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.lhs.iter().flat_map(Term::variables)
    }

    /// A constraint can only be part of a problem if its left-hand side has terms
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.lhs.is_empty() {
            return Err(ModelError::argument(format!(
                "constraint {} has an empty left-hand side",
                self
            )));
        }
        Ok(())
    }

    /// Value of the left-hand side for the given variable values
    pub fn evaluate_lhs<S: Solution>(&self, values: &S) -> f64 {
        self.lhs.iter().map(|t| t.evaluate(values)).sum()
    }

    /// Checks the constraint against variable values, see [Operator::holds]
    pub fn is_satisfied_by<S: Solution>(&self, values: &S, tolerance: f64) -> bool {
        self.op.holds(self.evaluate_lhs(values), self.rhs, tolerance)
    }

    /// Rewrites `<`, `>` and `!=` with the canonical operators.
    ///
    /// Returns nothing when the constraint is already canonical.
    /// `x != r` becomes, with two fresh slacks `psi` and `psi'` in `[0, M]`:
    /// `psi + psi' >= 2 epsilon`, `SOS1(psi, psi')`,
    /// `x + psi >= r + epsilon` and `x - psi' <= r - epsilon`.
    /// `M` is the [LoweringContext::sos1_bound], so `|x - r|` must stay below it.
    pub fn lower_operator<C: LoweringContext>(&self, ctx: &mut C) -> Vec<Constraint> {
        let eps = self.epsilon;
        match self.op {
            Operator::LessOrEqual | Operator::Equal | Operator::GreaterOrEqual => vec![],
            Operator::Less => {
                let mut c = self.derived(self.lhs.clone(), Operator::LessOrEqual, self.rhs - eps);
                c.name = self.name.clone();
                vec![c.into()]
            }
            Operator::Greater => {
                let mut c = self.derived(self.lhs.clone(), Operator::GreaterOrEqual, self.rhs + eps);
                c.name = self.name.clone();
                vec![c.into()]
            }
            Operator::NotEqual => {
                let big_m = ctx.sos1_bound();
                let psi = Variable::real(ctx.fresh_name("psi")).clamp(0, big_m);
                let psi_prime = Variable::real(ctx.fresh_name("psi_prime")).clamp(0, big_m);
                let slack_sum = self.derived(
                    vec![Term::linear(&psi, 1), Term::linear(&psi_prime, 1)],
                    Operator::GreaterOrEqual,
                    2. * eps,
                );
                let exclusive = Sos1Constraint::new(vec![psi.clone(), psi_prime.clone()])
                    .with_bound(big_m)
                    .with_epsilon(eps);
                let mut above = self.lhs.clone();
                above.push(Term::linear(&psi, 1));
                let mut below = self.lhs.clone();
                below.push(Term::linear(&psi_prime, -1));
                vec![
                    slack_sum.into(),
                    exclusive.into(),
                    self.derived(above, Operator::GreaterOrEqual, self.rhs + eps).into(),
                    self.derived(below, Operator::LessOrEqual, self.rhs - eps).into(),
                ]
            }
        }
    }
}

impl Display for NormalConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{}: ", name)?;
        }
        if self.lhs.is_empty() {
            write!(f, "0")?;
        }
        for (i, term) in self.lhs.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", term)?;
        }
        write!(f, " {} {}", self.op, self.rhs)
    }
}

/// Any constraint a [Problem](crate::Problem) can hold
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// A linear or quadratic relation
    Normal(NormalConstraint),
    /// At most one variable of a set is nonzero
    Sos1(Sos1Constraint),
    /// At least one of several linear relations holds
    Or(OrConstraint),
    /// A logical relation between binaries
    General(GeneralConstraint),
}

impl Constraint {
    /// Checks the structural invariants required to add the constraint to a problem
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Constraint::Normal(c) => c.validate(),
            Constraint::Sos1(c) => c.validate(),
            Constraint::Or(c) => c.validate(),
            Constraint::General(c) => c.validate(),
        }
    }

    /// Every variable the constraint references
    pub fn variables(&self) -> Vec<&Variable> {
        match self {
            Constraint::Normal(c) => c.variables().collect(),
            Constraint::Sos1(c) => c.variables().iter().collect(),
            Constraint::Or(c) => c
                .subconstraints()
                .iter()
                .flat_map(NormalConstraint::variables)
                .collect(),
            Constraint::General(c) => c.variables().collect(),
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Normal(c) => Display::fmt(c, f),
            Constraint::Sos1(c) => Display::fmt(c, f),
            Constraint::Or(c) => Display::fmt(c, f),
            Constraint::General(c) => Display::fmt(c, f),
        }
    }
}

impl From<NormalConstraint> for Constraint {
    fn from(c: NormalConstraint) -> Self {
        Constraint::Normal(c)
    }
}

impl From<Sos1Constraint> for Constraint {
    fn from(c: Sos1Constraint) -> Self {
        Constraint::Sos1(c)
    }
}

impl From<OrConstraint> for Constraint {
    fn from(c: OrConstraint) -> Self {
        Constraint::Or(c)
    }
}

impl From<GeneralConstraint> for Constraint {
    fn from(c: GeneralConstraint) -> Self {
        Constraint::General(c)
    }
}

/// This macro allows defining linear constraints using `a + b <= 3`
/// instead of `constraint::linear(a + b, Operator::LessOrEqual, 3)`.
/// It accepts `<`, `<=`, `==`, `>=`, `>` and `!=`, and returns a
/// `Result<NormalConstraint, ModelError>`.
///
/// # Example
///
/// ```
/// # use ilp_lowering::*;
/// let a = Variable::integer("a").max(10);
/// let b = Variable::integer("b");
/// let c = constraint!(&a + &b * 2 - 1 != 3).unwrap();
/// assert_eq!(c.op(), Operator::NotEqual);
/// assert_eq!(c.rhs(), 4.);
/// ```
#[macro_export]
macro_rules! constraint {
    ([$($left:tt)*] <= $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::LessOrEqual, $($right)*)
    };
    ([$($left:tt)*] >= $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::GreaterOrEqual, $($right)*)
    };
    ([$($left:tt)*] == $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::Equal, $($right)*)
    };
    ([$($left:tt)*] != $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::NotEqual, $($right)*)
    };
    ([$($left:tt)*] < $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::Less, $($right)*)
    };
    ([$($left:tt)*] > $($right:tt)*) => {
        $crate::constraint::linear($($left)*, $crate::Operator::Greater, $($right)*)
    };
    // The next token is not a special one
    ([$($left:tt)*] $next:tt $($right:tt)*) => {
        $crate::constraint!([$($left)* $next] $($right)*)
    };
    // Initial rule: start the recursive calls
    ($($all:tt)*) => {
        $crate::constraint!([] $($all)*)
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use float_eq::assert_float_eq;

    use super::*;
    use crate::lowering::NameGenerator;

    fn normal(c: &Constraint) -> &NormalConstraint {
        match c {
            Constraint::Normal(n) => n,
            other => panic!("expected a normal constraint, got {}", other),
        }
    }

    #[test]
    fn constants_move_to_the_right() {
        let x = Variable::real("x");
        let c = linear(&x * 3 + 2 - 5, Operator::Equal, 1).unwrap();
        assert_eq!(c.lhs().len(), 1);
        assert_float_eq!(c.rhs(), 4., abs <= 1e-12);
    }

    #[test]
    fn quadratic_term_in_linear_constraint() {
        let x = Variable::real("x");
        let err = linear(&x * &x + &x * 1, Operator::LessOrEqual, 1).unwrap_err();
        assert_eq!(err.code(), "SHAPE_INVALID");

        let mut c = linear(&x * 1, Operator::LessOrEqual, 1).unwrap();
        assert!(c.add_term(&x * &x).is_err());
        assert_eq!(c.lhs().len(), 1);

        let mut q = quadratic(&x * 1, Operator::LessOrEqual, 1);
        assert!(q.add_term(&x * &x).is_ok());
    }

    #[test]
    fn strict_operators() {
        let x = Variable::real("x");
        let mut names = NameGenerator::default();
        let less = linear(&x * 1, Operator::Less, 4).unwrap();
        let lowered = less.lower_operator(&mut names);
        assert_eq!(lowered.len(), 1);
        let c = normal(&lowered[0]);
        assert_eq!(c.op(), Operator::LessOrEqual);
        assert_float_eq!(c.rhs(), 3.9999, abs <= 1e-12);

        let greater = linear(&x * 1, Operator::Greater, 4)
            .unwrap()
            .with_epsilon(1.);
        let c = greater.lower_operator(&mut names);
        assert_eq!(normal(&c[0]).op(), Operator::GreaterOrEqual);
        assert_float_eq!(normal(&c[0]).rhs(), 5., abs <= 1e-12);
    }

    #[test]
    fn canonical_constraints_are_left_alone() {
        let x = Variable::real("x");
        let mut names = NameGenerator::default();
        for op in [Operator::LessOrEqual, Operator::Equal, Operator::GreaterOrEqual] {
            let c = linear(&x * 1, op, 0).unwrap();
            assert!(c.lower_operator(&mut names).is_empty());
        }
    }

    #[test]
    fn not_equal_pattern() {
        let x = Variable::integer("x").clamp(0, 10);
        let mut names = NameGenerator::with_sos1_bound(50.);
        let c = linear(&x * 1, Operator::NotEqual, 5).unwrap().with_epsilon(0.5);
        let lowered = c.lower_operator(&mut names);
        assert_eq!(lowered.len(), 4);
        assert!(matches!(lowered[1], Constraint::Sos1(_)));
        if let Constraint::Sos1(sos) = &lowered[1] {
            assert_eq!(sos.bound(), 50.);
            assert_eq!(sos.variables().len(), 2);
        }
        let slack_sum = normal(&lowered[0]);
        assert_eq!(slack_sum.op(), Operator::GreaterOrEqual);
        assert_float_eq!(slack_sum.rhs(), 1., abs <= 1e-12);
        assert_float_eq!(normal(&lowered[2]).rhs(), 5.5, abs <= 1e-12);
        assert_float_eq!(normal(&lowered[3]).rhs(), 4.5, abs <= 1e-12);
        for c in &lowered {
            if let Constraint::Normal(n) = c {
                assert!(n.op().is_canonical());
            }
        }
    }

    #[test]
    fn not_equal_slacks_reach_the_big_m() {
        let x = Variable::real("x").clamp(-20000, 20000);
        let mut names = NameGenerator::with_sos1_bound(1e6);
        let c = linear(&x * 1, Operator::NotEqual, 5).unwrap();
        let lowered = c.lower_operator(&mut names);
        let slacks: Vec<&Variable> = normal(&lowered[0]).variables().collect();
        assert_eq!(slacks.len(), 2);
        for psi in slacks {
            assert_eq!((psi.lower_bound(), psi.upper_bound()), (0., 1e6));
            assert!(!psi.bound_is_default().upper);
        }
        // x = -20000 is only reachable through a slack far above the type default
        let values: HashMap<String, f64> = HashMap::from([
            ("x".into(), -20000.),
            ("psi#0".into(), 20006.),
            ("psi_prime#1".into(), 0.),
        ]);
        for c in &lowered {
            match c {
                Constraint::Normal(n) => assert!(n.is_satisfied_by(&values, 1e-9), "{}", n),
                Constraint::Sos1(s) => assert!(s.is_satisfied_by(&values, 1e-9), "{}", s),
                other => panic!("unexpected {}", other),
            }
        }
    }

    #[test]
    fn operator_semantics() {
        assert!(Operator::LessOrEqual.holds(4.00001, 4., 1e-4));
        assert!(!Operator::Less.holds(4., 4., 1e-4));
        assert!(Operator::NotEqual.holds(4., 5., 1e-4));
        assert!(!Operator::NotEqual.holds(5., 5., 1e-4));
        for op in [Operator::Less, Operator::Equal, Operator::Greater] {
            for (lhs, rhs) in [(1., 2.), (2., 2.), (3., 2.)] {
                assert_ne!(op.holds(lhs, rhs, 0.), op.complement().holds(lhs, rhs, 0.));
            }
        }
    }

    #[test]
    fn macro_and_display() {
        let a = Variable::real("a");
        let b = Variable::real("b");
        let c = constraint!(&a * 2 + &b <= 4).unwrap().with_name("capacity");
        assert_eq!(c.to_string(), "capacity: 2 a + b <= 4");
        let values: HashMap<String, f64> = HashMap::from([("a".into(), 1.), ("b".into(), 2.)]);
        assert!(c.is_satisfied_by(&values, 1e-9));
        let strict = constraint!(&a * 2 + &b > 4).unwrap();
        assert!(!strict.is_satisfied_by(&values, 1e-9));
    }

    #[test]
    fn empty_lhs_is_invalid() {
        let c = linear(Function::linear() + 3, Operator::LessOrEqual, 4).unwrap();
        assert_eq!(c.validate().unwrap_err().code(), "ARGUMENT_INVALID");
    }
}
