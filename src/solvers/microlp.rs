//! A solver that uses [microlp](https://docs.rs/microlp), a pure rust solver.
//!
//! microlp has no SOS1 primitive and no quadratic support: the problem is fully
//! lowered before being materialized, and quadratic terms are refused.
use std::time::Instant;

use fnv::FnvHashMap;

use crate::constraint::Operator;
use crate::error::ModelError;
use crate::problem::{ObjectiveSense, Problem};
use crate::solvers::{ResolutionError, Solver, SolverConfig, SolverOutput, SolverStatus};
use crate::term::Term;
use crate::variable::{Variable, VariableKind};

/// The [microlp](https://docs.rs/microlp) solver with the default configuration
pub fn microlp() -> MicroLpSolver {
    MicroLpSolver::new(SolverConfig::default())
}

/// A microlp model
pub struct MicroLpSolver {
    config: SolverConfig,
    model: Option<MicroLpModel>,
}

struct MicroLpModel {
    problem: microlp::Problem,
    /// Same order as the variables of the source problem
    variables: Vec<(String, microlp::Variable)>,
    objective_constant: f64,
    solution: Option<microlp::Solution>,
}

impl MicroLpSolver {
    pub fn new(config: SolverConfig) -> Self {
        MicroLpSolver {
            config,
            model: None,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Get the inner microlp model, once built
    pub fn as_inner(&self) -> Option<&microlp::Problem> {
        self.model.as_ref().map(|m| &m.problem)
    }

    /// Options set to something microlp cannot honour
    fn unsupported_options(&self) -> Vec<&'static str> {
        let defaults = SolverConfig::default();
        let mut ignored = vec![];
        if self.config.time_limit.is_some() {
            ignored.push("time_limit");
        }
        if self.config.random_seed.is_some() {
            ignored.push("random_seed");
        }
        if self.config.tolerance != defaults.tolerance {
            ignored.push("tolerance");
        }
        if self.config.presolve != defaults.presolve {
            ignored.push("presolve");
        }
        ignored
    }

    fn warn_unsupported_options(&self) {
        for option in self.unsupported_options() {
            tracing::warn!(
                component = "solver",
                operation = "build",
                status = "warning",
                solver = "microlp",
                option,
                "microlp does not support this option, ignoring it"
            );
        }
    }
}

fn integer_bounds(var: &Variable) -> Result<(i32, i32), ModelError> {
    let (min, max) = (var.lower_bound().ceil(), var.upper_bound().floor());
    let range = f64::from(i32::MIN)..=f64::from(i32::MAX);
    if !range.contains(&min) || !range.contains(&max) {
        return Err(ModelError::Unsupported(format!(
            "microlp needs the bounds [{}, {}] of integer variable {} to fit in an i32",
            var.lower_bound(),
            var.upper_bound(),
            var
        )));
    }
    Ok((min as i32, max as i32))
}

/// Sums the coefficients of each variable, keeping the order of first appearance.
/// microlp refuses an expression that lists a variable twice.
fn consolidate(
    terms: &[Term],
    index_of: &FnvHashMap<&str, usize>,
) -> Result<Vec<(usize, f64)>, ModelError> {
    let mut positions: FnvHashMap<usize, usize> = FnvHashMap::default();
    let mut coefficients: Vec<(usize, f64)> = vec![];
    for term in terms {
        let (var, weight) = match term {
            Term::Linear { var, weight } => (var, *weight),
            Term::Quadratic { .. } => {
                return Err(ModelError::Unsupported(format!(
                    "microlp cannot handle the quadratic term {}",
                    term
                )))
            }
        };
        let index = *index_of.get(var.name()).ok_or_else(|| {
            ModelError::argument(format!("variable {} is not part of the problem", var))
        })?;
        match positions.get(&index) {
            Some(&p) => coefficients[p].1 += weight,
            None => {
                positions.insert(index, coefficients.len());
                coefficients.push((index, weight));
            }
        }
    }
    Ok(coefficients)
}

impl Solver for MicroLpSolver {
    type Error = ResolutionError;

    fn build(&mut self, problem: &mut Problem) -> Result<(), Self::Error> {
        let started = Instant::now();
        self.warn_unsupported_options();
        problem.lower();
        // After lowering, so that auxiliaries with default bounds get them too
        if let Some((lower, upper)) = self.config.bounds {
            problem.apply_global_bounds(lower, upper)?;
        }
        if problem.sos1_count() > 0 || problem.general_count() > 0 {
            return Err(ModelError::Unsupported(
                "microlp has no native SOS1 or general constraints, lower them first".into(),
            )
            .into());
        }
        problem.validate()?;
        if let Some(path) = &self.config.output_path {
            std::fs::write(path, problem.to_string()).map_err(|e| {
                ResolutionError::Other(format!("cannot write {}: {}", path.display(), e))
            })?;
        }
        if self.config.debug_output {
            tracing::debug!(
                component = "solver",
                operation = "build",
                status = "ok",
                solver = "microlp",
                model = %problem,
                "Model handed to microlp"
            );
        }

        let index_of: FnvHashMap<&str, usize> = problem
            .variables()
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name(), i))
            .collect();
        let (objective_terms, objective_constant) = match problem.objective() {
            Some(objective) => (
                consolidate(objective.terms(), &index_of)?,
                objective.constant(),
            ),
            None => (vec![], 0.),
        };
        let mut objective_coefficients = vec![0.; problem.variable_count()];
        for (index, coefficient) in objective_terms {
            objective_coefficients[index] = coefficient;
        }

        let mut inner = microlp::Problem::new(match problem.sense() {
            ObjectiveSense::Maximisation => microlp::OptimizationDirection::Maximize,
            ObjectiveSense::Minimisation => microlp::OptimizationDirection::Minimize,
        });
        let mut variables: Vec<(String, microlp::Variable)> =
            Vec::with_capacity(problem.variable_count());
        for (var, coeff) in problem.variables().iter().zip(objective_coefficients) {
            let native = match var.kind() {
                VariableKind::Binary => inner.add_binary_var(coeff),
                VariableKind::Integer => inner.add_integer_var(coeff, integer_bounds(var)?),
                VariableKind::Real => {
                    inner.add_var(coeff, (var.lower_bound(), var.upper_bound()))
                }
            };
            variables.push((var.name().to_string(), native));
        }

        for constraint in problem.normal_constraints() {
            let op = match constraint.op() {
                Operator::LessOrEqual => microlp::ComparisonOp::Le,
                Operator::Equal => microlp::ComparisonOp::Eq,
                Operator::GreaterOrEqual => microlp::ComparisonOp::Ge,
                op => {
                    return Err(ModelError::Unsupported(format!(
                        "operator {} left in {} after lowering",
                        op, constraint
                    ))
                    .into())
                }
            };
            let mut linear_expr = microlp::LinearExpr::empty();
            for (index, coefficient) in consolidate(constraint.lhs(), &index_of)? {
                linear_expr.add(variables[index].1, coefficient);
            }
            inner.add_constraint(linear_expr, op, constraint.rhs());
        }

        tracing::debug!(
            component = "solver",
            operation = "build",
            status = "success",
            solver = "microlp",
            variables = variables.len(),
            constraints = problem.normal_count(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Built microlp model"
        );
        self.model = Some(MicroLpModel {
            problem: inner,
            variables,
            objective_constant,
            solution: None,
        });
        Ok(())
    }

    fn solve(&mut self) -> Result<SolverOutput, Self::Error> {
        let started = Instant::now();
        let model = self.model.as_mut().ok_or(ResolutionError::NotBuilt)?;
        let output = match model.problem.solve() {
            Ok(solution) => {
                let output = SolverOutput {
                    status: SolverStatus::Optimal,
                    objective_value: solution.objective() + model.objective_constant,
                    solution_count: 1,
                };
                model.solution = Some(solution);
                output
            }
            Err(error) => {
                model.solution = None;
                let status = match error {
                    microlp::Error::Infeasible => SolverStatus::Infeasible,
                    microlp::Error::Unbounded => SolverStatus::Unbounded,
                    microlp::Error::InternalError(s) => return Err(ResolutionError::Other(s)),
                };
                SolverOutput {
                    status,
                    objective_value: 0.,
                    solution_count: 0,
                }
            }
        };
        tracing::debug!(
            component = "solver",
            operation = "solve",
            status = %output.status,
            solver = "microlp",
            objective = output.objective_value,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "microlp finished"
        );
        Ok(output)
    }

    fn update_values(&self, problem: &mut Problem) -> Result<(), Self::Error> {
        let model = self.model.as_ref().ok_or(ResolutionError::NotBuilt)?;
        let solution = model
            .solution
            .as_ref()
            .ok_or_else(|| ResolutionError::Other("no solution to read values from".into()))?;
        for (name, var) in &model.variables {
            problem.set_variable_value(name, solution[*var])?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Microlp"
    }
}
