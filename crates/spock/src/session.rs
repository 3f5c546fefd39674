//! The session API: the long-lived, stateful handle a host holds across
//! repeated script executions against one running engine.
//!
//! Owns persistent interpreter state and lets each call mutate it, without
//! any interactive-yield/resume machinery, since SpockDSL has no host
//! callback protocol to pause for.

use indexmap::IndexMap;

use crate::ast::Macro;
use crate::engine::Engine;
use crate::error::{Operand, SpockError, SpockResult};
use crate::exec::{self, ExecContext};
use crate::kernel;
use crate::namespace::{self, Namespace};
use crate::parse;
use crate::planner::{Action, PlanResult};
use crate::resource::LimitTracker;
use crate::tracer::{NoopTracer, RecordingTracer, TraceEvent, Tracer};
use crate::value::Value;
use crate::vector::{RngHandle, Vector};

/// A stateful handle to one running session against an [`Engine`]: its own
/// scope chain, minted concepts, and user-defined verbs, all persisting
/// across separate `learn`/`ask`/`prove` calls.
pub struct Session<'e> {
    engine: &'e Engine,
    namespace: Namespace<'static>,
    rng: RngHandle,
    auto_concepts: IndexMap<String, Vector>,
    user_verbs: IndexMap<String, Macro>,
}

impl<'e> Session<'e> {
    #[must_use]
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            namespace: Namespace::root(),
            rng: engine.fresh_rng(),
            auto_concepts: IndexMap::new(),
            user_verbs: IndexMap::new(),
        }
    }

    /// Parses and executes `source`, folding its declarations into the
    /// session's persistent scope. Returns every declaration the script
    /// bound, not only the last one.
    pub fn learn(&mut self, source: &str) -> SpockResult<IndexMap<String, Value>> {
        let mut tracer = NoopTracer;
        self.run(source, &mut tracer)
    }

    /// Runs `source`, then looks up `declaration` in the result (also
    /// resolvable against values already in scope from a prior `learn`).
    pub fn ask(&mut self, source: &str, declaration: &str) -> SpockResult<Value> {
        let results = self.learn(source)?;
        Self::lookup(&results, &self.namespace, declaration)
    }

    /// Like `ask`, but also returns the full ordered execution trace —
    /// the structure `replay_check` in `exec.rs` compares for determinism.
    pub fn explain(&mut self, source: &str) -> SpockResult<(IndexMap<String, Value>, Vec<TraceEvent>)> {
        let mut tracer = RecordingTracer::new();
        let results = self.run(source, &mut tracer)?;
        Ok((results, tracer.into_events()))
    }

    /// Runs `source` and reports whether `declaration`'s resulting `VECTOR`
    /// evaluates against `Truth` at or above `threshold` — a convenience
    /// wrapper around the `Evaluate` verb for yes/no questions.
    pub fn prove(&mut self, source: &str, declaration: &str, threshold: f64) -> SpockResult<bool> {
        let results = self.learn(source)?;
        let value = Self::lookup(&results, &self.namespace, declaration)?;
        let vector = value.as_vector().ok_or_else(|| SpockError::Type {
            expected: vec!["VECTOR"],
            actual: value.tag(),
            verb: "prove".to_string(),
            operand: Operand::Subject,
        })?;
        Ok(kernel::distance(&vector.vector, &self.engine.truth.truth) >= threshold)
    }

    /// Renders the session's current local declarations back to SpockDSL
    /// source text — the same serialization the `Remember` verb persists.
    #[must_use]
    pub fn summarise(&self) -> String {
        exec::render_declarations(self.namespace.local_declarations())
    }

    /// How many concepts this session has minted so far via bare literals.
    #[must_use]
    pub fn concept_count(&self) -> usize {
        self.auto_concepts.len()
    }

    /// Climbs from `start` toward `goal`, using every concept this session
    /// has minted so far as a candidate action — a convenience wrapper
    /// around the `Plan` verb for hosts driving the planner directly rather
    /// than through a script.
    pub fn plan(&mut self, start: Vector, goal: &Vector) -> SpockResult<PlanResult> {
        let mut limits = LimitTracker::new(self.engine.config.limits);
        let mut tracer = NoopTracer;
        let actions: Vec<Action> = self
            .auto_concepts
            .iter()
            .take(self.engine.config.candidate_limit)
            .map(|(name, vector)| Action { name: name.clone(), delta: vector.clone() })
            .collect();
        crate::planner::plan(start, goal, &actions, self.engine.config.plateau, &mut limits, &mut tracer, &mut self.rng)
    }

    /// Climbs from `start` toward maximum value of `constraint`, same
    /// action set as `plan`.
    pub fn solve<F: Fn(&Vector) -> f64>(&mut self, start: Vector, constraint: F) -> SpockResult<PlanResult> {
        let mut limits = LimitTracker::new(self.engine.config.limits);
        let mut tracer = NoopTracer;
        let actions: Vec<Action> = self
            .auto_concepts
            .iter()
            .take(self.engine.config.candidate_limit)
            .map(|(name, vector)| Action { name: name.clone(), delta: vector.clone() })
            .collect();
        crate::planner::solve(start, constraint, &actions, self.engine.config.plateau, &mut limits, &mut tracer, &mut self.rng)
    }

    fn lookup(results: &IndexMap<String, Value>, namespace: &Namespace<'_>, declaration: &str) -> SpockResult<Value> {
        let key = namespace::normalize_name(declaration);
        if let Some(value) = results.get(key) {
            return Ok(value.clone());
        }
        namespace
            .resolve(key)
            .cloned()
            .ok_or_else(|| SpockError::UnknownReference { name: declaration.to_string() })
    }

    fn run(&mut self, source: &str, tracer: &mut dyn Tracer) -> SpockResult<IndexMap<String, Value>> {
        let script = parse::parse(source)?;
        let mut limits = LimitTracker::new(self.engine.config.limits);
        let mut ctx = ExecContext::new(
            &mut self.namespace,
            &self.engine.truth,
            self.engine.config.dimension,
            self.engine.config.generation,
            &mut self.rng,
            &mut limits,
            tracer,
            &self.engine.theory_store,
            self.engine.config.plateau,
            self.engine.config.candidate_limit,
            self.engine.config.merge_strategy,
            &mut self.auto_concepts,
            &mut self.user_verbs,
        );
        exec::execute_script(&script, &mut ctx)
    }
}
