//! The execution trace recorder: a pluggable observer over the executor.
//!
//! [`Tracer`] has no-op default methods so a caller who only wants
//! `learn`/`ask` results pays nothing; [`RecordingTracer`] is the
//! implementation behind `Session::explain`, and is the piece the
//! determinism contract (`replay_check` in `exec.rs`) checks for equality.

use serde::{Deserialize, Serialize};

use crate::ast::Operand;

/// One observed moment during script execution, in the order it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TraceEvent {
    StatementExecuted {
        line: usize,
        declaration: String,
        verb: String,
        result_tag: String,
    },
    VerbDispatched {
        verb: String,
        subject: Operand,
        object: Option<Operand>,
    },
    AutoConceptMinted {
        name: String,
    },
    TheoryLoaded {
        name: String,
        version: String,
    },
    TheorySaved {
        name: String,
        version: String,
    },
    TheoryBranched {
        name: String,
        from_version: String,
        to_version: String,
    },
    TheoryMerged {
        name: String,
        target_version: String,
        source_version: String,
        conflicts: usize,
    },
    PlanStep {
        step: usize,
        score: f64,
    },
    PlateauReached {
        step: usize,
        strategy: String,
    },
}

/// Observer hooks invoked by `exec.rs` and `planner.rs`. Every method has a
/// no-op default so implementers only override what they care about.
pub trait Tracer {
    fn on_statement(&mut self, _event: TraceEvent) {}
    fn on_verb_dispatch(&mut self, _event: TraceEvent) {}
    fn on_auto_concept(&mut self, _event: TraceEvent) {}
    fn on_theory_event(&mut self, _event: TraceEvent) {}
    fn on_plan_step(&mut self, _event: TraceEvent) {}
}

/// The zero-cost default: every hook is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Collects every event into an ordered `Vec`, the structure `Session::
/// explain` returns and `replay_check` compares for determinism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl Tracer for RecordingTracer {
    fn on_statement(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    fn on_verb_dispatch(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    fn on_auto_concept(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    fn on_theory_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    fn on_plan_step(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_tracer_preserves_order() {
        let mut tracer = RecordingTracer::new();
        tracer.on_statement(TraceEvent::StatementExecuted {
            line: 1,
            declaration: "a".into(),
            verb: "bind".into(),
            result_tag: "VECTOR".into(),
        });
        tracer.on_plan_step(TraceEvent::PlanStep { step: 1, score: 0.5 });
        assert_eq!(tracer.events().len(), 2);
        assert!(matches!(tracer.events()[0], TraceEvent::StatementExecuted { .. }));
        assert!(matches!(tracer.events()[1], TraceEvent::PlanStep { .. }));
    }

    #[test]
    fn noop_tracer_records_nothing() {
        let mut tracer = NoopTracer;
        tracer.on_statement(TraceEvent::AutoConceptMinted { name: "x".into() });
    }

    #[test]
    fn identical_event_sequences_are_equal() {
        let mut a = RecordingTracer::new();
        let mut b = RecordingTracer::new();
        let event = TraceEvent::PlanStep { step: 3, score: 0.9 };
        a.on_plan_step(event.clone());
        b.on_plan_step(event);
        assert_eq!(a.events(), b.events());
    }
}
