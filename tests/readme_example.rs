use std::error::Error;

use ilp_lowering::{constraint, variables, ObjectiveSense, Problem};

#[test]
fn main() -> Result<(), Box<dyn Error>> {
    variables! {
        binary: b1, b2, b3;
    }
    let mut problem = Problem::new();
    problem.set_objective(&b1 + &b2 + &b3 * 2, ObjectiveSense::Maximisation)?;
    problem.add_constraint(constraint!(&b1 + &b2 * 2 + &b3 * 3 <= 4)?)?;
    problem.add_constraint(constraint!(&b1 + &b2 >= 1)?)?;
    let before: Vec<String> = problem
        .normal_constraints()
        .iter()
        .map(ToString::to_string)
        .collect();

    problem.lower();

    let after: Vec<String> = problem
        .normal_constraints()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(before, after);
    assert_eq!(problem.variable_count(), 3);
    assert!(problem.is_lowered());

    #[cfg(feature = "microlp")]
    {
        use ilp_lowering::{microlp, Solution, Solver, SolverStatus};
        let output = microlp().run(&mut problem)?;
        assert_eq!(output.status, SolverStatus::Optimal);
        assert_eq!(problem.value(&b1), 1.);
        assert_eq!(problem.value(&b3), 1.);
        println!("objective = {}", output.objective_value);
    }
    Ok(())
}
