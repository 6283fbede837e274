//! Lowered models handed to microlp: a lowered system must be feasible exactly when
//! the original constraints can be satisfied.
#![cfg(feature = "microlp")]

use ilp_lowering::{
    constraint, microlp, GeneralConstraint, LoweringConfig, ObjectiveSense, Operator,
    OrConstraint, Problem, Solution, Solver, SolverConfig, SolverStatus, Sos1Constraint, Variable,
};

fn small_m_problem() -> Problem {
    Problem::new().with_lowering(LoweringConfig::default().big_m(50.))
}

fn status(problem: &mut Problem) -> SolverStatus {
    microlp().run(problem).unwrap().status
}

#[test]
fn not_equal_excludes_exactly_one_value() {
    for v in 0..=10 {
        let x = Variable::integer("x").clamp(v, v);
        let mut problem = small_m_problem();
        problem.set_objective(&x * 1, ObjectiveSense::Minimisation).unwrap();
        problem
            .add_constraint(constraint!(&x * 1 != 5).unwrap().with_epsilon(0.5))
            .unwrap();
        let expected = if v == 5 {
            SolverStatus::Infeasible
        } else {
            SolverStatus::Optimal
        };
        assert_eq!(status(&mut problem), expected, "x = {}", v);
    }
}

#[test]
fn not_equal_pushes_the_optimum_away() {
    let x = Variable::integer("x").clamp(0, 5);
    let mut problem = small_m_problem();
    problem.set_objective(&x * 1, ObjectiveSense::Maximisation).unwrap();
    problem
        .add_constraint(constraint!(&x * 1 != 5).unwrap().with_epsilon(0.5))
        .unwrap();
    let output = microlp().run(&mut problem).unwrap();
    assert_eq!(output.status, SolverStatus::Optimal);
    assert_eq!(problem.value(&x), 4.);
}

#[test]
fn strict_inequalities_use_epsilon() {
    let x = Variable::real("x").clamp(0, 10);
    let mut problem = small_m_problem();
    problem.set_objective(&x * 1, ObjectiveSense::Maximisation).unwrap();
    problem
        .add_constraint(constraint!(&x * 1 < 4).unwrap().with_epsilon(0.25))
        .unwrap();
    let output = microlp().run(&mut problem).unwrap();
    assert!((output.objective_value - 3.75).abs() < 1e-6);
}

#[test]
fn not_equal_far_from_the_excluded_value() {
    let x = Variable::integer("x").clamp(-20000, -20000);
    let mut problem = Problem::new().with_lowering(LoweringConfig::default().big_m(1e6));
    problem.set_objective(&x * 1, ObjectiveSense::Minimisation).unwrap();
    problem
        .add_constraint(constraint!(&x * 1 != 5).unwrap().with_epsilon(0.5))
        .unwrap();
    let mut solver = ilp_lowering::MicroLpSolver::new(SolverConfig::default().bounds(-1e6, 1e6));
    let output = solver.run(&mut problem).unwrap();
    assert_eq!(output.status, SolverStatus::Optimal);
    assert_eq!(problem.value(&x), -20000.);
    let psi = problem.variable("psi#0").unwrap();
    assert_eq!((psi.lower_bound(), psi.upper_bound()), (0., 1e6));
}

#[test]
fn disjunction_far_from_its_bounds() {
    let x = Variable::integer("x").clamp(-15000, -15000);
    let y = Variable::integer("y").clamp(5, 5);
    let mut problem = Problem::new();
    problem
        .set_objective(&x + &y, ObjectiveSense::Minimisation)
        .unwrap();
    let or = OrConstraint::from_constraints(vec![
        constraint!(&x * 1 <= 3).unwrap(),
        constraint!(&y * 1 >= 10).unwrap(),
    ])
    .unwrap()
    .with_epsilon(0.5);
    problem.add_constraint(or).unwrap();
    assert_eq!(status(&mut problem), SolverStatus::Optimal);
}

/// Feasibility of `OR(x op 5, y >= 10)` once `x` is fixed and `y` is stuck at 0,
/// so the first disjunct alone decides
fn single_disjunct(op: Operator, x_value: i32) -> SolverStatus {
    let x = Variable::integer("x").clamp(x_value, x_value);
    let y = Variable::integer("y").clamp(0, 0);
    let mut problem = small_m_problem();
    problem
        .set_objective(&x + &y, ObjectiveSense::Minimisation)
        .unwrap();
    let or = OrConstraint::from_constraints(vec![
        constraint::linear(&x * 1, op, 5).unwrap(),
        constraint!(&y * 1 >= 10).unwrap(),
    ])
    .unwrap()
    .with_epsilon(0.5);
    problem.add_constraint(or).unwrap();
    status(&mut problem)
}

#[test]
fn each_disjunct_operator_follows_its_truth_table() {
    for op in [
        Operator::Less,
        Operator::LessOrEqual,
        Operator::Equal,
        Operator::GreaterOrEqual,
        Operator::Greater,
        Operator::NotEqual,
    ] {
        for x_value in 3..=7 {
            let expected = if op.holds(f64::from(x_value), 5., 0.) {
                SolverStatus::Optimal
            } else {
                SolverStatus::Infeasible
            };
            assert_eq!(single_disjunct(op, x_value), expected, "x = {} with {}", x_value, op);
        }
    }
}

fn disjunction(x_value: i32, y_value: i32) -> Problem {
    let x = Variable::integer("x").clamp(x_value, x_value);
    let y = Variable::integer("y").clamp(y_value, y_value);
    let mut problem = small_m_problem();
    problem
        .set_objective(&x + &y, ObjectiveSense::Minimisation)
        .unwrap();
    let or = OrConstraint::from_constraints(vec![
        constraint!(&x * 1 <= 3).unwrap(),
        constraint!(&y * 1 >= 10).unwrap(),
    ])
    .unwrap()
    .with_epsilon(0.5);
    problem.add_constraint(or).unwrap();
    problem
}

#[test]
fn disjunction_is_satisfiable_iff_one_disjunct_holds() {
    assert_eq!(status(&mut disjunction(4, 10)), SolverStatus::Optimal);
    assert_eq!(status(&mut disjunction(3, 5)), SolverStatus::Optimal);
    assert_eq!(status(&mut disjunction(2, 12)), SolverStatus::Optimal);
    assert_eq!(status(&mut disjunction(4, 5)), SolverStatus::Infeasible);
}

#[test]
fn disjunction_with_equality_and_disequality() {
    let check = |x_value: i32, y_value: i32| {
        let x = Variable::integer("x").clamp(x_value, x_value);
        let y = Variable::integer("y").clamp(y_value, y_value);
        let mut problem = small_m_problem();
        problem
            .set_objective(&x + &y, ObjectiveSense::Minimisation)
            .unwrap();
        let or = OrConstraint::from_constraints(vec![
            constraint!(&x * 1 == 2).unwrap(),
            constraint!(&y * 1 != 3).unwrap(),
        ])
        .unwrap()
        .with_epsilon(0.5);
        problem.add_constraint(or).unwrap();
        status(&mut problem)
    };
    assert_eq!(check(2, 3), SolverStatus::Optimal);
    assert_eq!(check(1, 4), SolverStatus::Optimal);
    assert_eq!(check(1, 2), SolverStatus::Optimal);
    assert_eq!(check(1, 3), SolverStatus::Infeasible);
}

#[test]
fn sos1_keeps_a_single_nonzero() {
    let vars: Vec<Variable> = ["a", "b", "c"]
        .iter()
        .map(|n| Variable::real(*n).clamp(0, 10))
        .collect();
    let mut problem = small_m_problem();
    let objective = &vars[0] * 1 + &vars[1] * 2 + &vars[2] * 1;
    problem
        .set_objective(objective, ObjectiveSense::Maximisation)
        .unwrap();
    problem
        .add_constraint(Sos1Constraint::new(vars.clone()).with_bound(10.))
        .unwrap();
    let output = microlp().run(&mut problem).unwrap();
    assert!((output.objective_value - 20.).abs() < 1e-6);
    let nonzero = vars.iter().filter(|v| problem.value(v).abs() > 1e-6).count();
    assert_eq!(nonzero, 1);
    assert!((problem.value(&vars[1]) - 10.).abs() < 1e-6);
}

#[test]
fn or_of_binaries() {
    let a = Variable::binary("a");
    let b = Variable::binary("b");
    let r = Variable::binary("r");
    let mut problem = Problem::new();
    problem.set_objective(&r * 1, ObjectiveSense::Minimisation).unwrap();
    problem.add_constraint(constraint!(&b * 1 == 1).unwrap()).unwrap();
    problem
        .add_constraint(GeneralConstraint::or_vars(vec![a, b], r.clone()))
        .unwrap();
    let output = microlp().run(&mut problem).unwrap();
    assert_eq!(output.status, SolverStatus::Optimal);
    assert_eq!(problem.value(&r), 1.);
}

#[test]
fn global_bounds_from_the_configuration() {
    let x = Variable::integer("x");
    let y = Variable::integer("y").max(3);
    let mut problem = Problem::new();
    problem
        .set_objective(&x + &y, ObjectiveSense::Maximisation)
        .unwrap();
    let mut solver = ilp_lowering::MicroLpSolver::new(SolverConfig::default().bounds(0., 7.));
    let output = solver.run(&mut problem).unwrap();
    assert!((output.objective_value - 10.).abs() < 1e-6);
    assert_eq!(problem.variable("y").unwrap().lower_bound(), 0.);
}

#[test]
fn model_is_written_when_asked() {
    let path = std::env::temp_dir().join("ilp_lowering_model_is_written_when_asked.lp");
    let x = Variable::real("x").clamp(0, 1);
    let mut problem = Problem::new();
    problem.set_objective(&x * 1, ObjectiveSense::Maximisation).unwrap();
    let mut solver = ilp_lowering::MicroLpSolver::new(SolverConfig::default().output_path(path.clone()));
    solver.run(&mut problem).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("maximise: x"));
    std::fs::remove_file(&path).unwrap();
}
