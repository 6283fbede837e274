//! Disjunctions of linear constraints.
use std::fmt::{Display, Formatter};

use crate::constraint::{Constraint, NormalConstraint, Operator};
use crate::error::ModelError;
use crate::lowering::{LoweringContext, DEFAULT_EPSILON};
use crate::solvers::Solution;
use crate::sos1::Sos1Constraint;
use crate::term::{Shape, Term};
use crate::variable::Variable;

/// At least one of the sub-constraints must hold.
///
/// ```
/// # use ilp_lowering::{constraint, OrConstraint, Variable};
/// let x = Variable::integer("x");
/// let y = Variable::integer("y");
/// let either = OrConstraint::from_constraints(vec![
///     constraint!(&x * 1 <= 3)?,
///     constraint!(&y * 1 >= 10)?,
/// ])?;
/// assert_eq!(either.to_string(), "OR(x <= 3, y >= 10)");
/// # Ok::<_, ilp_lowering::ModelError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrConstraint {
    subconstraints: Vec<NormalConstraint>,
    epsilon: f64,
}

impl Default for OrConstraint {
    fn default() -> Self {
        OrConstraint {
            subconstraints: vec![],
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl OrConstraint {
    /// An empty disjunction, to be filled with [OrConstraint::push]
    pub fn new() -> Self {
        Self::default()
    }

    /// A disjunction of the given linear constraints
    pub fn from_constraints(subconstraints: Vec<NormalConstraint>) -> Result<Self, ModelError> {
        let mut or = Self::new();
        for c in subconstraints {
            or.push(c)?;
        }
        Ok(or)
    }

    /// Adds a disjunct. Only linear constraints are accepted.
    pub fn push(&mut self, constraint: NormalConstraint) -> Result<(), ModelError> {
        if constraint.shape() != Shape::Linear {
            return Err(ModelError::InvalidShape(format!(
                "a disjunction only accepts linear constraints, got {}",
                constraint
            )));
        }
        self.subconstraints.push(constraint);
        Ok(())
    }

    /// Sets the epsilon used by every constraint of the rewriting
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn subconstraints(&self) -> &[NormalConstraint] {
        &self.subconstraints
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.subconstraints.is_empty() {
            return Err(ModelError::argument("disjunction without sub-constraints"));
        }
        self.subconstraints.iter().try_for_each(NormalConstraint::validate)
    }

    pub fn is_satisfied_by<S: Solution>(&self, values: &S, tolerance: f64) -> bool {
        self.subconstraints
            .iter()
            .any(|c| c.is_satisfied_by(values, tolerance))
    }

    /// Rewrites the disjunction with indicators, slacks and SOS1 constraints.
    ///
    /// Each disjunct gets a binary indicator `s` that can only be 1 when the disjunct
    /// holds, and the last constraint is `sum(s) >= 1`.
    /// An inequality `lhs op rhs` adds the complement indicator `s'` and the slacks
    /// `phi`, `phi'` (taking `+` for `>=` and `>`, `-` for `<=` and `<`):
    ///
    /// ```text
    /// s + s' = 1
    /// lhs ± phi op rhs
    /// lhs ∓ phi' complement(op) rhs
    /// phi + s >= 2 epsilon
    /// phi' + s' >= 2 epsilon
    /// SOS1(phi, s)
    /// SOS1(phi', s')
    /// ```
    ///
    /// An equality uses a single indicator:
    /// `lhs + phi >= rhs`, `lhs - phi' <= rhs`, `SOS1(phi, phi', s)`, `phi + phi' + s > epsilon`.
    /// A disequality is the disjunction of `>` and `<`.
    pub fn lower<C: LoweringContext>(&self, ctx: &mut C) -> Vec<Constraint> {
        let mut lowered = vec![];
        let mut indicators = vec![];
        for c in &self.subconstraints {
            match c.op() {
                Operator::NotEqual => {
                    for op in [Operator::Greater, Operator::Less] {
                        let s = self.lower_inequality(c.lhs(), op, c.rhs(), ctx, &mut lowered);
                        indicators.push(Term::linear(&s, 1));
                    }
                }
                Operator::Equal => {
                    let s = self.lower_equality(c.lhs(), c.rhs(), ctx, &mut lowered);
                    indicators.push(Term::linear(&s, 1));
                }
                op => {
                    let s = self.lower_inequality(c.lhs(), op, c.rhs(), ctx, &mut lowered);
                    indicators.push(Term::linear(&s, 1));
                }
            }
        }
        lowered.push(self.normal(indicators, Operator::GreaterOrEqual, 1.).into());
        lowered
    }

    fn normal(&self, lhs: Vec<Term>, op: Operator, rhs: f64) -> NormalConstraint {
        NormalConstraint::from_terms(Shape::Linear, lhs, op, rhs, self.epsilon)
    }

    fn sos1(&self, variables: Vec<Variable>, ctx: &impl LoweringContext) -> Constraint {
        Sos1Constraint::new(variables)
            .with_bound(ctx.sos1_bound())
            .with_epsilon(self.epsilon)
            .into()
    }

    fn with_slack(lhs: &[Term], slack: &Variable, weight: f64) -> Vec<Term> {
        let mut terms = lhs.to_vec();
        terms.push(Term::linear(slack, weight));
        terms
    }

    /// Returns the indicator of the disjunct
    fn lower_inequality<C: LoweringContext>(
        &self,
        lhs: &[Term],
        op: Operator,
        rhs: f64,
        ctx: &mut C,
        out: &mut Vec<Constraint>,
    ) -> Variable {
        let big_m = ctx.sos1_bound();
        let s = Variable::binary(ctx.fresh_name("or_s"));
        let s_prime = Variable::binary(ctx.fresh_name("or_s_prime"));
        let phi = Variable::real(ctx.fresh_name("or_phi")).clamp(0, big_m);
        let phi_prime = Variable::real(ctx.fresh_name("or_phi_prime")).clamp(0, big_m);
        let sign = match op {
            Operator::GreaterOrEqual | Operator::Greater => 1.,
            _ => -1.,
        };
        let two_eps = 2. * self.epsilon;
        out.push(
            self.normal(
                vec![Term::linear(&s, 1), Term::linear(&s_prime, 1)],
                Operator::Equal,
                1.,
            )
            .into(),
        );
        out.push(self.normal(Self::with_slack(lhs, &phi, sign), op, rhs).into());
        out.push(
            self.normal(Self::with_slack(lhs, &phi_prime, -sign), op.complement(), rhs)
                .into(),
        );
        out.push(
            self.normal(
                vec![Term::linear(&phi, 1), Term::linear(&s, 1)],
                Operator::GreaterOrEqual,
                two_eps,
            )
            .into(),
        );
        out.push(
            self.normal(
                vec![Term::linear(&phi_prime, 1), Term::linear(&s_prime, 1)],
                Operator::GreaterOrEqual,
                two_eps,
            )
            .into(),
        );
        out.push(self.sos1(vec![phi, s.clone()], &*ctx));
        out.push(self.sos1(vec![phi_prime, s_prime], &*ctx));
        s
    }

    fn lower_equality<C: LoweringContext>(
        &self,
        lhs: &[Term],
        rhs: f64,
        ctx: &mut C,
        out: &mut Vec<Constraint>,
    ) -> Variable {
        let big_m = ctx.sos1_bound();
        let s = Variable::binary(ctx.fresh_name("or_s"));
        let phi = Variable::real(ctx.fresh_name("or_phi")).clamp(0, big_m);
        let phi_prime = Variable::real(ctx.fresh_name("or_phi_prime")).clamp(0, big_m);
        out.push(
            self.normal(Self::with_slack(lhs, &phi, 1.), Operator::GreaterOrEqual, rhs)
                .into(),
        );
        out.push(
            self.normal(Self::with_slack(lhs, &phi_prime, -1.), Operator::LessOrEqual, rhs)
                .into(),
        );
        out.push(
            self.normal(
                vec![
                    Term::linear(&phi, 1),
                    Term::linear(&phi_prime, 1),
                    Term::linear(&s, 1),
                ],
                Operator::Greater,
                self.epsilon,
            )
            .into(),
        );
        out.push(self.sos1(vec![phi, phi_prime, s.clone()], &*ctx));
        s
    }
}

impl Display for OrConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "OR(")?;
        for (i, c) in self.subconstraints.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::constraint::{linear, quadratic};
    use crate::lowering::NameGenerator;
    use crate::variable::VariableKind;

    fn holds(c: &Constraint, values: &HashMap<String, f64>) -> bool {
        match c {
            Constraint::Normal(n) => n.is_satisfied_by(values, 0.),
            Constraint::Sos1(s) => s.is_satisfied_by(values, 0.),
            other => panic!("unexpected {}", other),
        }
    }

    fn counts(lowered: &[Constraint]) -> (usize, usize) {
        let sos = lowered
            .iter()
            .filter(|c| matches!(c, Constraint::Sos1(_)))
            .count();
        (lowered.len() - sos, sos)
    }

    #[test]
    fn rejects_quadratic_and_empty() {
        let x = Variable::real("x");
        let mut or = OrConstraint::new();
        assert_eq!(or.validate().unwrap_err().code(), "ARGUMENT_INVALID");
        let q = quadratic(&x * &x, Operator::LessOrEqual, 1);
        assert_eq!(or.push(q).unwrap_err().code(), "SHAPE_INVALID");
    }

    #[test]
    fn two_inequalities() {
        let x = Variable::real("x");
        let y = Variable::real("y");
        let or = OrConstraint::from_constraints(vec![
            linear(&x * 1, Operator::LessOrEqual, 3).unwrap(),
            linear(&y * 1, Operator::LessOrEqual, 4).unwrap(),
        ])
        .unwrap();
        let lowered = or.lower(&mut NameGenerator::default());
        assert_eq!(lowered.len(), 15);
        assert_eq!(counts(&lowered), (11, 4));
        match lowered.last() {
            Some(Constraint::Normal(closing)) => {
                assert_eq!(closing.op(), Operator::GreaterOrEqual);
                assert_eq!(closing.rhs(), 1.);
                assert_eq!(closing.lhs().len(), 2);
            }
            other => panic!("unexpected closing constraint {:?}", other),
        }
    }

    #[test]
    fn every_operator_has_an_encoding() {
        let x = Variable::real("x");
        for (op, expected) in [
            (Operator::Less, 8),
            (Operator::LessOrEqual, 8),
            (Operator::GreaterOrEqual, 8),
            (Operator::Greater, 8),
            (Operator::Equal, 5),
            (Operator::NotEqual, 15),
        ] {
            let or = OrConstraint::from_constraints(vec![linear(&x * 1, op, 0).unwrap()]).unwrap();
            let lowered = or.lower(&mut NameGenerator::default());
            assert_eq!(lowered.len(), expected, "{}", op);
        }
    }

    const INDICATOR_LEVELS: [f64; 2] = [0., 1.];
    const SLACK_LEVELS: [f64; 5] = [0., 1., 2., 3., 4.];

    /// Every assignment of the auxiliaries on a small grid, for x in 3..=7
    #[test]
    fn each_operator_holds_exactly_when_its_disjunct_does() {
        let x = Variable::integer("x");
        let levels = |v: &Variable| -> &'static [f64] {
            if v.kind() == VariableKind::Binary {
                &INDICATOR_LEVELS
            } else {
                &SLACK_LEVELS
            }
        };
        for op in [
            Operator::Less,
            Operator::LessOrEqual,
            Operator::Equal,
            Operator::GreaterOrEqual,
            Operator::Greater,
            Operator::NotEqual,
        ] {
            let or = OrConstraint::from_constraints(vec![linear(&x * 1, op, 5).unwrap()])
                .unwrap()
                .with_epsilon(0.5);
            let lowered = or.lower(&mut NameGenerator::with_sos1_bound(50.));
            let mut auxiliaries: Vec<&Variable> = vec![];
            for var in lowered.iter().flat_map(|c| c.variables()) {
                if var.name() != "x" && auxiliaries.iter().all(|a| a.name() != var.name()) {
                    auxiliaries.push(var);
                }
            }
            let combinations: usize = auxiliaries.iter().map(|v| levels(v).len()).product();
            for x_value in 3..=7 {
                let reachable = (0..combinations).any(|mut index| {
                    let mut values: HashMap<String, f64> =
                        HashMap::from([("x".into(), f64::from(x_value))]);
                    for var in &auxiliaries {
                        let options = levels(var);
                        values.insert(var.name().to_string(), options[index % options.len()]);
                        index /= options.len();
                    }
                    lowered.iter().all(|c| holds(c, &values))
                });
                assert_eq!(
                    reachable,
                    op.holds(f64::from(x_value), 5., 0.),
                    "x = {} with {}",
                    x_value,
                    op
                );
            }
        }
    }

    fn witness(x: f64, y: f64) -> HashMap<String, f64> {
        // x <= 3 is violated, y >= 10 holds
        HashMap::from([
            ("x".into(), x),
            ("y".into(), y),
            ("or_s#0".into(), 0.),
            ("or_s_prime#1".into(), 1.),
            ("or_phi#2".into(), 1.),
            ("or_phi_prime#3".into(), 0.),
            ("or_s#4".into(), 1.),
            ("or_s_prime#5".into(), 0.),
            ("or_phi#6".into(), 0.),
            ("or_phi_prime#7".into(), 1.),
        ])
    }

    #[test]
    fn satisfiable_through_the_second_disjunct() {
        let x = Variable::integer("x");
        let y = Variable::integer("y");
        let or = OrConstraint::from_constraints(vec![
            linear(&x * 1, Operator::LessOrEqual, 3).unwrap(),
            linear(&y * 1, Operator::GreaterOrEqual, 10).unwrap(),
        ])
        .unwrap();
        let lowered = or.lower(&mut NameGenerator::default());
        let values = witness(4., 10.);
        assert!(or.is_satisfied_by(&values, 0.));
        for c in &lowered {
            assert!(holds(c, &values), "{} violated", c);
        }
        // Same indicators, but now the chosen disjunct is false
        let values = witness(4., 5.);
        assert!(!or.is_satisfied_by(&values, 0.));
        assert!(lowered.iter().any(|c| !holds(c, &values)));
    }
}
