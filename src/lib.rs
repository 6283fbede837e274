//! A solver-agnostic modeler for mixed-integer linear problems,
//! with a rich constraint vocabulary lowered to what solvers understand.
//!
//! Constraints may use `<`, `>` and `!=`, disjunctions ([OrConstraint]) and special
//! ordered sets ([Sos1Constraint]). [Problem::lower] rewrites them with `<=`, `>=`
//! and `=` only, introducing binary indicators and slack variables.
//!
//! ```rust
//! use ilp_lowering::{constraint, variables, ObjectiveSense, Problem};
//!
//! variables! { binary: b1, b2, b3; }
//! let mut problem = Problem::new();
//! problem.set_objective(&b1 + &b2 + &b3 * 2, ObjectiveSense::Maximisation)?;
//! problem.add_constraint(constraint!(&b1 + &b2 * 2 + &b3 * 3 <= 4)?)?;
//! problem.add_constraint(constraint!(&b1 + &b2 >= 1)?)?;
//! problem.lower();
//! assert_eq!(problem.normal_count(), 2);
//!
//! # #[cfg(feature = "microlp")] {
//! use ilp_lowering::{microlp, Solver, SolverStatus};
//! let output = microlp().run(&mut problem)?;
//! assert_eq!(output.status, SolverStatus::Optimal);
//! assert_eq!(output.objective_value.round(), 3.);
//! assert_eq!(problem.variable("b1").unwrap().value(), 1.);
//! # }
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

pub use constraint::{Constraint, NormalConstraint, Operator};
pub use error::ModelError;
pub use function::{Function, WeightedFunction};
pub use general::GeneralConstraint;
pub use lowering::{
    LoweringConfig, LoweringContext, NameGenerator, DEFAULT_BIG_M, DEFAULT_EPSILON,
};
pub use or_constraint::OrConstraint;
pub use problem::{LoweringState, ObjectiveSense, Problem};
#[cfg(feature = "microlp")]
pub use solvers::microlp::{microlp, MicroLpSolver};
pub use solvers::{ResolutionError, Solution, Solver, SolverConfig, SolverOutput, SolverStatus};
pub use sos1::Sos1Constraint;
pub use term::{Constant, Shape, Term};
pub use variable::{
    DefaultBounds, Variable, VariableKind, DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND,
};

pub mod constraint;
mod error;
mod function;
mod general;
mod lowering;
mod or_constraint;
mod problem;
pub mod solvers;
mod sos1;
mod term;
pub mod variable;
mod variables_macro;
