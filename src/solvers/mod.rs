//! The interface between a model and the solvers that consume it.
//!
//! A [Solver] takes a [Problem], lowers it to the vocabulary it understands,
//! materializes it, optimizes it and writes the variable values back.
#[cfg(feature = "microlp")]
pub mod microlp;

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::hash::{BuildHasher, Hash};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ModelError;
use crate::function::Function;
use crate::problem::Problem;
use crate::variable::Variable;

/// How the optimization ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    /// A proven optimal solution was found
    Optimal,
    /// A solution was found, but not proven optimal
    Feasible,
    /// There exists no solution that satisfies all of the constraints
    Infeasible,
    /// The objective can be made infinitely good without violating any constraint
    Unbounded,
    /// The solver could not tell infeasible and unbounded apart
    InfeasibleOrUnbounded,
    /// The time limit was reached
    TimedOut,
}

impl SolverStatus {
    /// Whether the variable values of the run mean anything
    pub fn has_solution(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }
}

impl Display for SolverStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Feasible => "feasible",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unbounded => "unbounded",
            SolverStatus::InfeasibleOrUnbounded => "infeasible or unbounded",
            SolverStatus::TimedOut => "timed out",
        })
    }
}

/// Summary of a solver run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOutput {
    pub status: SolverStatus,
    /// Objective value of the best solution, 0 when there is none
    pub objective_value: f64,
    /// Number of solutions found
    pub solution_count: usize,
}

/// Options common to all solvers.
/// A solver logs a warning for each option it cannot honour that differs from the default.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub time_limit: Option<Duration>,
    pub random_seed: Option<u64>,
    /// Feasibility tolerance
    pub tolerance: f64,
    /// Bounds given to every integer and real variable whose bounds were never set
    pub bounds: Option<(f64, f64)>,
    pub presolve: bool,
    pub debug_output: bool,
    /// Where to write the model before solving it
    pub output_path: Option<PathBuf>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: None,
            random_seed: None,
            tolerance: 1e-6,
            bounds: None,
            presolve: true,
            debug_output: false,
            output_path: None,
        }
    }
}

impl SolverConfig {
    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Replaces the default bounds of integer and real variables
    pub fn bounds(mut self, lower: f64, upper: f64) -> Self {
        self.bounds = Some((lower, upper));
        self
    }

    pub fn presolve(mut self, presolve: bool) -> Self {
        self.presolve = presolve;
        self
    }

    pub fn debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }

    pub fn output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_path = Some(path.into());
        self
    }
}

/// Represents an error that occurred when solving a problem
#[derive(Debug, PartialEq, Clone)]
pub enum ResolutionError {
    /// The problem could not be handed to the solver
    Model(ModelError),
    /// [Solver::solve] was called before [Solver::build]
    NotBuilt,
    /// Another error occurred
    Other(String),
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionError::Model(err) => write!(f, "{}", err),
            ResolutionError::NotBuilt => write!(f, "The problem was not built before solving it"),
            ResolutionError::Other(s) => write!(f, "An error occurred: {}", s),
        }
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolutionError::Model(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ModelError> for ResolutionError {
    fn from(err: ModelError) -> Self {
        ResolutionError::Model(err)
    }
}

/// A backend that turns a [Problem] into calls to an optimization engine
pub trait Solver {
    /// The error that can occur while building or solving the problem
    type Error: From<ModelError>;

    /// Lowers the problem as far as the solver needs and materializes it
    fn build(&mut self, problem: &mut Problem) -> Result<(), Self::Error>;

    /// Optimizes the problem handed to [Solver::build]
    fn solve(&mut self) -> Result<SolverOutput, Self::Error>;

    /// Writes the values of the last solution into the variables of the problem
    fn update_values(&self, problem: &mut Problem) -> Result<(), Self::Error>;

    /// Human-readable solver name
    fn name(&self) -> &'static str;

    /// Builds, solves, and writes back the values when a solution was found
    fn run(&mut self, problem: &mut Problem) -> Result<SolverOutput, Self::Error> {
        self.build(problem)?;
        let output = self.solve()?;
        if output.status.has_solution() {
            self.update_values(problem)?;
        }
        Ok(output)
    }
}

/// Values of variables, looked up by name
pub trait Solution {
    /// Get the value of a variable
    fn value(&self, variable: &Variable) -> f64;

    /// ## Example
    ///
    /// ```rust
    /// # use std::collections::HashMap;
    /// use ilp_lowering::{Solution, Variable};
    /// let a = Variable::real("a");
    /// let b = Variable::real("b");
    /// let values = HashMap::from([("a", 1.), ("b", 4.)]);
    /// assert_eq!(values.eval(&(&a * 1 + &b * 1)), 5.);
    /// ```
    fn eval(&self, function: &Function) -> f64
    where
        Self: Sized,
    {
        function.evaluate(self)
    }
}

/// Missing variables are worth 0
impl<K, N, S> Solution for HashMap<K, N, S>
where
    K: Borrow<str> + Eq + Hash,
    N: Into<f64> + Clone,
    S: BuildHasher,
{
    fn value(&self, variable: &Variable) -> f64 {
        self.get(variable.name()).map_or(0., |v| v.clone().into())
    }
}
