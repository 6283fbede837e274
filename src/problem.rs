//! A [Problem] aggregates an objective, constraints and the variables they use,
//! and drives the lowering pipeline.
use std::fmt::{Display, Formatter};
use std::time::Instant;

use fnv::FnvHashMap;

use crate::constraint::{Constraint, NormalConstraint};
use crate::error::ModelError;
use crate::function::Function;
use crate::general::GeneralConstraint;
use crate::lowering::{LoweringConfig, LoweringContext};
use crate::or_constraint::OrConstraint;
use crate::solvers::Solution;
use crate::sos1::Sos1Constraint;
use crate::variable::Variable;

/// Whether to search for the variable values that give the highest
/// or the lowest value of the objective function.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
pub enum ObjectiveSense {
    Maximisation,
    #[default]
    Minimisation,
}

impl Display for ObjectiveSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ObjectiveSense::Maximisation => "maximise",
            ObjectiveSense::Minimisation => "minimise",
        })
    }
}

/// Which lowering passes ran since the last change to the constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoweringState {
    pub or_lowered: bool,
    pub operators_lowered: bool,
    pub general_lowered: bool,
    pub sos1_lowered: bool,
}

/// An optimization problem.
///
/// Every variable referenced by the objective or a constraint is registered under its
/// name. The first definition of a name wins: adding a variable with the same name but
/// another kind or other explicit bounds fails and leaves the problem untouched.
/// Terms only identify variables by name: solvers read bounds from the registry,
/// which [Problem::variable_mut] may change after registration.
///
/// ```
/// use ilp_lowering::{constraint, ObjectiveSense, Problem, Variable};
///
/// let x = Variable::integer("x").clamp(0, 10);
/// let mut problem = Problem::new();
/// problem.set_objective(&x * 1, ObjectiveSense::Maximisation)?;
/// problem.add_constraint(constraint!(&x * 1 != 5)?)?;
/// assert_eq!(problem.normal_count(), 1);
///
/// problem.lower();
/// assert!(problem.is_lowered());
/// assert_eq!(problem.sos1_count(), 0);
/// assert_eq!(problem.normal_count(), 3 + 5);
/// # Ok::<_, ilp_lowering::ModelError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Problem {
    objective: Option<Function>,
    sense: ObjectiveSense,
    normal: Vec<NormalConstraint>,
    sos1: Vec<Sos1Constraint>,
    or: Vec<OrConstraint>,
    general: Vec<GeneralConstraint>,
    variables: Vec<Variable>,
    /// Each variable as it was first handed to the problem, before any change
    /// through [Problem::variable_mut] or global bounds
    declared: Vec<Variable>,
    by_name: FnvHashMap<String, usize>,
    lowering: LoweringConfig,
    next_auxiliary: usize,
    state: LoweringState,
}

/// Names auxiliary variables against the registry of a problem
struct Registry<'a> {
    by_name: &'a FnvHashMap<String, usize>,
    next: &'a mut usize,
    big_m: f64,
}

impl LoweringContext for Registry<'_> {
    fn fresh_name(&mut self, stem: &str) -> String {
        loop {
            let name = format!("{}#{}", stem, *self.next);
            *self.next += 1;
            if !self.by_name.contains_key(&name) {
                return name;
            }
        }
    }

    fn sos1_bound(&self) -> f64 {
        self.big_m
    }
}

impl Problem {
    /// An empty minimisation problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how far [Problem::lower] goes
    pub fn with_lowering(mut self, config: LoweringConfig) -> Self {
        self.lowering = config;
        self
    }

    pub fn lowering_config(&self) -> &LoweringConfig {
        &self.lowering
    }

    /// Sets the function to optimize and registers its variables
    pub fn set_objective<F: Into<Function>>(
        &mut self,
        objective: F,
        sense: ObjectiveSense,
    ) -> Result<(), ModelError> {
        let objective = objective.into();
        let staged = self.stage(objective.variables())?;
        if objective.has_no_terms() {
            tracing::warn!(
                component = "problem",
                operation = "set_objective",
                status = "warning",
                "The objective does not depend on any variable"
            );
        }
        self.commit(staged);
        self.objective = Some(objective);
        self.sense = sense;
        Ok(())
    }

    pub fn set_sense(&mut self, sense: ObjectiveSense) {
        self.sense = sense;
    }

    /// Validates the constraint, registers its variables and stores it
    pub fn add_constraint<C: Into<Constraint>>(&mut self, constraint: C) -> Result<(), ModelError> {
        self.add_constraints([constraint])
    }

    /// Adds several constraints. If one of them is invalid, none is added.
    pub fn add_constraints<C, I>(&mut self, constraints: I) -> Result<(), ModelError>
    where
        C: Into<Constraint>,
        I: IntoIterator<Item = C>,
    {
        let constraints: Vec<Constraint> = constraints.into_iter().map(Into::into).collect();
        for c in &constraints {
            c.validate()?;
        }
        let staged = self.stage(constraints.iter().flat_map(Constraint::variables))?;
        self.commit(staged);
        for c in constraints {
            self.push(c);
        }
        self.state = LoweringState::default();
        Ok(())
    }

    pub fn remove_normal_constraint(&mut self, index: usize) -> Option<NormalConstraint> {
        (index < self.normal.len()).then(|| self.normal.remove(index))
    }

    pub fn remove_sos1_constraint(&mut self, index: usize) -> Option<Sos1Constraint> {
        (index < self.sos1.len()).then(|| self.sos1.remove(index))
    }

    pub fn remove_or_constraint(&mut self, index: usize) -> Option<OrConstraint> {
        (index < self.or.len()).then(|| self.or.remove(index))
    }

    pub fn remove_general_constraint(&mut self, index: usize) -> Option<GeneralConstraint> {
        (index < self.general.len()).then(|| self.general.remove(index))
    }

    /// Checks every incoming variable against the first declaration of its name and
    /// against the other incoming variables, and returns the ones that are not
    /// registered yet.
    /// Bounds changed on the registered variable itself do not make the
    /// caller's own copies conflicting.
    fn stage<'a, I>(&self, incoming: I) -> Result<Vec<Variable>, ModelError>
    where
        I: IntoIterator<Item = &'a Variable>,
    {
        let mut staged: Vec<Variable> = vec![];
        let mut staged_index: FnvHashMap<&str, usize> = FnvHashMap::default();
        for var in incoming {
            let known = match self.by_name.get(var.name()) {
                Some(&i) => Some(&self.declared[i]),
                None => staged_index.get(var.name()).map(|&i| &staged[i]),
            };
            match known {
                Some(known) => {
                    if let Some(conflict) = known.conflict_with(var) {
                        return Err(ModelError::InvalidArgument(conflict));
                    }
                }
                None => {
                    staged_index.insert(var.name(), staged.len());
                    staged.push(var.clone());
                }
            }
        }
        Ok(staged)
    }

    fn commit(&mut self, staged: Vec<Variable>) {
        for var in staged {
            self.register(var);
        }
    }

    /// Registers a variable whose name is not known yet
    fn register(&mut self, var: Variable) {
        if !self.by_name.contains_key(var.name()) {
            self.by_name.insert(var.name().to_string(), self.variables.len());
            self.declared.push(var.clone());
            self.variables.push(var);
        }
    }

    fn push(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::Normal(c) => self.normal.push(c),
            Constraint::Sos1(c) => self.sos1.push(c),
            Constraint::Or(c) => self.or.push(c),
            Constraint::General(c) => self.general.push(c),
        }
    }

    /// Stores a constraint manufactured by a lowering pass.
    /// Its variables are either registered already or fresh auxiliaries.
    fn push_lowered(&mut self, constraint: Constraint) {
        let fresh: Vec<Variable> = constraint
            .variables()
            .into_iter()
            .filter(|v| !self.by_name.contains_key(v.name()))
            .cloned()
            .collect();
        for var in fresh {
            self.register(var);
        }
        self.push(constraint);
    }

    fn registry(&mut self) -> Registry<'_> {
        Registry {
            by_name: &self.by_name,
            next: &mut self.next_auxiliary,
            big_m: self.lowering.big_m,
        }
    }

    fn insert_lowered(&mut self, produced: Vec<Constraint>) {
        for c in produced {
            self.push_lowered(c);
        }
    }

    /// Replaces every disjunction by normal and SOS1 constraints
    pub fn substitute_or(&mut self) {
        let started = Instant::now();
        let consumed = std::mem::take(&mut self.or);
        let mut ctx = self.registry();
        let produced: Vec<Constraint> = consumed.iter().flat_map(|c| c.lower(&mut ctx)).collect();
        let produced_count = produced.len();
        self.insert_lowered(produced);
        self.state.or_lowered = true;
        tracing::debug!(
            component = "lowering",
            operation = "substitute_or",
            status = "success",
            consumed = consumed.len(),
            produced = produced_count,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Lowered disjunctions"
        );
    }

    /// Rewrites `<`, `>` and `!=` constraints with `<=`, `>=` and `=`
    pub fn substitute_operator(&mut self) {
        let started = Instant::now();
        let consumed = std::mem::take(&mut self.normal);
        let mut ctx = self.registry();
        let mut kept = Vec::with_capacity(consumed.len());
        let mut produced = vec![];
        let mut consumed_count = 0;
        for c in consumed {
            let lowered = c.lower_operator(&mut ctx);
            if lowered.is_empty() {
                kept.push(c);
            } else {
                consumed_count += 1;
                produced.extend(lowered);
            }
        }
        let produced_count = produced.len();
        self.normal = kept;
        self.insert_lowered(produced);
        self.state.operators_lowered = true;
        tracing::debug!(
            component = "lowering",
            operation = "substitute_operator",
            status = "success",
            consumed = consumed_count,
            produced = produced_count,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Lowered strict and non-equality operators"
        );
    }

    /// Replaces general constraints by normal constraints
    pub fn substitute_general(&mut self) {
        let started = Instant::now();
        let consumed = std::mem::take(&mut self.general);
        let produced: Vec<Constraint> = consumed
            .iter()
            .flat_map(GeneralConstraint::lower)
            .map(Constraint::from)
            .collect();
        let produced_count = produced.len();
        self.insert_lowered(produced);
        self.state.general_lowered = true;
        tracing::debug!(
            component = "lowering",
            operation = "substitute_general",
            status = "success",
            consumed = consumed.len(),
            produced = produced_count,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Lowered general constraints"
        );
    }

    /// Replaces every SOS1 constraint by big-M constraints over binary indicators
    pub fn substitute_sos1(&mut self) {
        let started = Instant::now();
        let consumed = std::mem::take(&mut self.sos1);
        let mut ctx = self.registry();
        let produced: Vec<Constraint> = consumed
            .iter()
            .flat_map(|c| c.lower(&mut ctx))
            .map(Constraint::from)
            .collect();
        let produced_count = produced.len();
        self.insert_lowered(produced);
        self.state.sos1_lowered = true;
        tracing::debug!(
            component = "lowering",
            operation = "substitute_sos1",
            status = "success",
            consumed = consumed.len(),
            produced = produced_count,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Lowered SOS1 constraints"
        );
    }

    /// Runs the lowering passes in order: disjunctions, operators, general constraints
    /// and SOS1 constraints, the last two unless the configuration keeps them.
    /// The objective is then expanded in place.
    pub fn lower(&mut self) {
        self.substitute_or();
        self.substitute_operator();
        if !self.lowering.native_general {
            self.substitute_general();
        }
        if self.lowering.native_sos1 {
            if let Some(sos) = self.sos1.iter().find(|s| s.has_duplicate_weights()) {
                tracing::warn!(
                    component = "lowering",
                    operation = "lower",
                    status = "warning",
                    constraint = %sos,
                    "SOS1 constraint with duplicate weights kept for a native solver"
                );
            }
        } else {
            self.substitute_sos1();
        }
        if let Some(objective) = &mut self.objective {
            *objective = objective.expand();
        }
    }

    /// True when only the vocabulary of a solver is left: no disjunction, only
    /// `<=`, `>=` and `=`, and SOS1 or general constraints only if the
    /// configuration keeps them.
    pub fn is_lowered(&self) -> bool {
        self.or.is_empty()
            && self.normal.iter().all(|c| c.op().is_canonical())
            && (self.lowering.native_sos1 || self.sos1.is_empty())
            && (self.lowering.native_general || self.general.is_empty())
            && self.objective.as_ref().map_or(true, Function::is_flat)
    }

    pub fn lowering_state(&self) -> LoweringState {
        self.state
    }

    /// Checks that the problem can be handed to a solver:
    /// an objective is set and every variable has ordered bounds.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.objective.is_none() {
            return Err(ModelError::argument("the problem has no objective"));
        }
        self.variables.iter().try_for_each(Variable::check_bounds)
    }

    /// Gives `[lower, upper]` to every integer and real variable whose bounds were
    /// never set. Binaries and explicit bounds are left as they are.
    pub fn apply_global_bounds(&mut self, lower: f64, upper: f64) -> Result<(), ModelError> {
        if lower > upper {
            return Err(ModelError::argument(format!(
                "global lower bound {} is greater than global upper bound {}",
                lower, upper
            )));
        }
        for var in &mut self.variables {
            var.override_default_bounds(lower, upper);
        }
        Ok(())
    }

    /// Writes solver values into every registered variable
    pub fn set_values<S: Solution>(&mut self, values: &S) {
        for var in &mut self.variables {
            let value = values.value(var);
            var.set_value(value);
        }
    }

    /// Writes the value of one variable
    pub fn set_variable_value(&mut self, name: &str, value: f64) -> Result<(), ModelError> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| ModelError::argument(format!("unknown variable {}", name)))?;
        var.set_value(value);
        Ok(())
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).map(|&i| &self.variables[i])
    }

    /// Gives access to the registered definition, to change its bounds
    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        let index = *self.by_name.get(name)?;
        self.variables.get_mut(index)
    }

    /// Registered variables, in registration order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn objective(&self) -> Option<&Function> {
        self.objective.as_ref()
    }

    pub fn sense(&self) -> ObjectiveSense {
        self.sense
    }

    pub fn normal_constraints(&self) -> &[NormalConstraint] {
        &self.normal
    }

    pub fn sos1_constraints(&self) -> &[Sos1Constraint] {
        &self.sos1
    }

    pub fn or_constraints(&self) -> &[OrConstraint] {
        &self.or
    }

    pub fn general_constraints(&self) -> &[GeneralConstraint] {
        &self.general
    }

    pub fn normal_count(&self) -> usize {
        self.normal.len()
    }

    pub fn sos1_count(&self) -> usize {
        self.sos1.len()
    }

    pub fn or_count(&self) -> usize {
        self.or.len()
    }

    pub fn general_count(&self) -> usize {
        self.general.len()
    }

    pub fn total_constraint_count(&self) -> usize {
        self.normal_count() + self.sos1_count() + self.or_count() + self.general_count()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }
}

/// Values currently stored in the registered variables
impl Solution for Problem {
    fn value(&self, variable: &Variable) -> f64 {
        self.variable(variable.name()).map_or(0., Variable::value)
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.objective {
            Some(objective) => writeln!(f, "{}: {}", self.sense, objective)?,
            None => writeln!(f, "{}: 0", self.sense)?,
        }
        writeln!(f, "subject to")?;
        for c in &self.normal {
            writeln!(f, "  {}", c)?;
        }
        for c in &self.sos1 {
            writeln!(f, "  {}", c)?;
        }
        for c in &self.or {
            writeln!(f, "  {}", c)?;
        }
        for c in &self.general {
            writeln!(f, "  {}", c)?;
        }
        writeln!(f, "bounds")?;
        for v in &self.variables {
            writeln!(
                f,
                "  {} <= {} <= {} {}",
                v.lower_bound(),
                v,
                v.upper_bound(),
                v.kind()
            )?;
        }
        Ok(())
    }
}
