#![doc = include_str!("../../../README.md")]

pub mod ast;
pub mod depgraph;
pub mod engine;
pub mod error;
pub mod exec;
pub mod kernel;
pub mod namespace;
pub mod numeric;
pub mod parse;
pub mod planner;
pub mod resource;
pub mod session;
pub mod theory;
pub mod token;
pub mod tracer;
pub mod value;
pub mod vector;
pub mod versioning;

pub use crate::{
    ast::{Macro, MacroKind, Operand, Script, Statement, TopLevel},
    engine::{Engine, EngineConfig},
    error::{SpockError, SpockResult},
    kernel::{add, bind, distance, identity, modulate_scalar, modulate_vector, mv, negate, normalise},
    planner::{Action, PlanResult, PlateauStrategy},
    resource::{LimitTracker, ResourceError, ResourceLimits},
    session::Session,
    theory::{TheoryDescriptor, TheorySnapshot, TheoryStore, TruthConstants},
    tracer::{NoopTracer, RecordingTracer, TraceEvent, Tracer},
    value::{
        ConceptRef, MacroValue, MeasuredValue, NumericValue, Origin, ScalarValue, StringValue, TheoryValue, Value,
        VectorValue,
    },
    vector::{RngHandle, Vector, VectorGeneration},
    versioning::MergeStrategy,
};
