//! Shared pieces of the lowering passes.
//!
//! A pass rewrites one kind of constraint into constraints of a narrower vocabulary.
//! Every auxiliary variable it introduces is named through a [LoweringContext],
//! which guarantees that the names never collide with anything already in the model.

/// Epsilon used by constraints that were not given one explicitly
pub const DEFAULT_EPSILON: f64 = 1e-4;
/// Big-M used by SOS1 constraints that were not given a bound explicitly
pub const DEFAULT_BIG_M: f64 = 1e5;

/// What a lowering pass needs from the model it rewrites
pub trait LoweringContext {
    /// Returns a name, starting with `stem`, that no variable of the model uses yet
    fn fresh_name(&mut self, stem: &str) -> String;

    /// Bound given to the SOS1 constraints manufactured by the passes
    fn sos1_bound(&self) -> f64 {
        DEFAULT_BIG_M
    }
}

/// A standalone [LoweringContext] numbering names `<stem>#<n>`.
///
/// It does not know about any model, so it is only collision-free
/// as long as user variables do not contain `#`.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    next: usize,
    sos1_bound: f64,
}

impl NameGenerator {
    /// A generator whose manufactured SOS1 constraints use `sos1_bound`
    pub fn with_sos1_bound(sos1_bound: f64) -> Self {
        NameGenerator {
            next: 0,
            sos1_bound,
        }
    }
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::with_sos1_bound(DEFAULT_BIG_M)
    }
}

impl LoweringContext for NameGenerator {
    fn fresh_name(&mut self, stem: &str) -> String {
        let name = format!("{}#{}", stem, self.next);
        self.next += 1;
        name
    }

    fn sos1_bound(&self) -> f64 {
        self.sos1_bound
    }
}

/// How far [Problem::lower](crate::Problem::lower) rewrites a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoweringConfig {
    /// Bound of every SOS1 constraint manufactured while lowering.
    /// It must exceed the magnitude of every variable it constrains.
    pub big_m: f64,
    /// Leave SOS1 constraints in place, for backends with a native SOS1 primitive
    pub native_sos1: bool,
    /// Leave general constraints in place, for backends that understand them
    pub native_general: bool,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        LoweringConfig {
            big_m: DEFAULT_BIG_M,
            native_sos1: false,
            native_general: false,
        }
    }
}

impl LoweringConfig {
    /// Sets the big-M of manufactured SOS1 constraints
    pub fn big_m(mut self, big_m: f64) -> Self {
        self.big_m = big_m;
        self
    }

    /// Keep SOS1 constraints for the backend
    pub fn native_sos1(mut self, native: bool) -> Self {
        self.native_sos1 = native;
        self
    }

    /// Keep general constraints for the backend
    pub fn native_general(mut self, native: bool) -> Self {
        self.native_general = native;
        self
    }
}
