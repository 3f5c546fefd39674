//! The executor: walks a scheduled [`Script`], resolving operands, dispatching
//! verbs, and writing results back into the session's [`Namespace`].
//!
//! One pass owns an explicit context object and calls into per-operation
//! logic rather than threading state through free functions. Verb
//! resolution checks, in order: user-defined macros, the geometric kernel
//! set, the numeric set, planning, theory verbs, then the distinguished
//! verbs (`Persist`/`Describe`/`Evaluate`) — so a script can shadow a
//! built-in name with its own macro.

use indexmap::IndexMap;

use crate::ast::{Macro, MacroKind, Operand, Script, Statement};
use crate::depgraph;
use crate::error::{Operand as ErrOperand, SpockError, SpockResult};
use crate::kernel;
use crate::namespace::Namespace;
use crate::numeric;
use crate::planner::{self, Action, PlateauStrategy};
use crate::resource::LimitTracker;
use crate::theory::{TheoryDescriptor, TheoryStore, TheorySnapshot, TruthConstants};
use crate::tracer::{TraceEvent, Tracer};
use crate::value::{MeasuredValue, NumericValue, Origin, ScalarValue, ConceptRef, TheoryValue, Value, VectorValue};
use crate::vector::{RngHandle, Vector, VectorGeneration};
use crate::versioning::{self, MergeStrategy};

/// Everything one `execute_script` call needs, threaded explicitly rather
/// than hung off a global, as an explicit context object passed through the
/// call chain instead of thread-locals.
pub struct ExecContext<'a, 'ns> {
    pub namespace: &'a mut Namespace<'ns>,
    pub truth: &'a TruthConstants,
    pub dim: usize,
    pub generation: VectorGeneration,
    pub rng: &'a mut RngHandle,
    pub limits: &'a mut LimitTracker,
    pub tracer: &'a mut dyn Tracer,
    pub theory_store: &'a TheoryStore,
    pub plateau: PlateauStrategy,
    /// Caps how many minted concepts `Plan`/`Solve` consider as candidate
    /// actions, so a session with thousands of auto-concepts doesn't turn
    /// every hill-climb step into an O(n) scan of all of them.
    pub candidate_limit: usize,
    /// Default strategy `MergeTheory` applies when a declaration collides.
    pub merge_strategy: MergeStrategy,
    /// Owned by the caller (typically `Session`) so minted concepts survive
    /// across separate `learn`/`ask` calls against the same session.
    auto_concepts: &'a mut IndexMap<String, Vector>,
    /// Likewise owned by the caller, so a macro defined in one call remains
    /// callable in a later one. Keyed by macro name.
    user_verbs: &'a mut IndexMap<String, Macro>,
}

impl<'a, 'ns> ExecContext<'a, 'ns> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        namespace: &'a mut Namespace<'ns>,
        truth: &'a TruthConstants,
        dim: usize,
        generation: VectorGeneration,
        rng: &'a mut RngHandle,
        limits: &'a mut LimitTracker,
        tracer: &'a mut dyn Tracer,
        theory_store: &'a TheoryStore,
        plateau: PlateauStrategy,
        candidate_limit: usize,
        merge_strategy: MergeStrategy,
        auto_concepts: &'a mut IndexMap<String, Vector>,
        user_verbs: &'a mut IndexMap<String, Macro>,
    ) -> Self {
        Self {
            namespace,
            truth,
            dim,
            generation,
            rng,
            limits,
            tracer,
            theory_store,
            plateau,
            candidate_limit,
            merge_strategy,
            auto_concepts,
            user_verbs,
        }
    }

    fn mint_concept(&mut self, name: &str) -> Vector {
        if let Some(existing) = self.auto_concepts.get(name) {
            return existing.clone();
        }
        let vector = self.rng.random_vector(self.dim, self.generation);
        self.auto_concepts.insert(name.to_string(), vector.clone());
        self.tracer.on_auto_concept(TraceEvent::AutoConceptMinted { name: name.to_string() });
        vector
    }

    fn auto_concepts_snapshot(&self) -> Vec<(String, Vector)> {
        self.auto_concepts.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Registers every `verb`-kind macro defined in a script (including ones
/// nested inside `theory`/`session` macros) as a callable user verb before
/// execution begins, so forward references between macros resolve.
fn register_macros(script: &Script, ctx: &mut ExecContext<'_, '_>) {
    for m in script.macros() {
        register_macro(m, ctx.user_verbs);
    }
}

fn register_macro(m: &Macro, user_verbs: &mut IndexMap<String, Macro>) {
    if m.kind == MacroKind::Verb {
        user_verbs.insert(m.name.clone(), m.clone());
    }
    for nested in &m.macros {
        register_macro(nested, user_verbs);
    }
}

/// Executes every statement in `script` in dependency order, returning the
/// final value bound to each declaration.
pub fn execute_script(script: &Script, ctx: &mut ExecContext<'_, '_>) -> SpockResult<IndexMap<String, Value>> {
    register_macros(script, ctx);
    let schedule = depgraph::schedule(script)?;

    let statements: IndexMap<String, Statement> =
        script.statements().into_iter().map(|s| (s.declaration.clone(), s.clone())).collect();

    let mut results = IndexMap::new();
    for name in &schedule.order {
        let Some(stmt) = statements.get(name) else { continue };
        let value = execute_statement(stmt, ctx)?;
        results.insert(name.clone(), value);
    }
    Ok(results)
}

/// Resolves an operand in a typed-value position: `$ref` looks up the
/// namespace, a bare `Identifier` looks up the namespace or else mints a
/// fresh `VECTOR` concept, `_` is the zero scalar, and a literal is a bare
/// `SCALAR` (never `NUMERIC` — that tag is reserved for values explicitly
/// boxed via `HasNumericValue`).
fn resolve_operand(operand: &Operand, ctx: &mut ExecContext<'_, '_>, line: usize) -> SpockResult<Value> {
    match operand {
        Operand::Reference(name) => ctx
            .namespace
            .resolve(name)
            .cloned()
            .ok_or_else(|| SpockError::UnknownReference { name: name.clone() }),
        Operand::Identifier(name) => {
            if let Some(value) = ctx.namespace.resolve(name) {
                return Ok(value.clone());
            }
            let vector = ctx.mint_concept(name);
            Ok(Value::Vector(VectorValue::new(vector, Origin::new(None, String::new(), line))))
        }
        Operand::Placeholder => Ok(Value::Scalar(ScalarValue::new(0.0, Origin::new(None, String::new(), line)))),
        Operand::Literal(n) => Ok(Value::Scalar(ScalarValue::new(*n, Origin::new(None, String::new(), line)))),
    }
}

/// Resolves an operand in a name position (a unit symbol, a persisted or
/// theory name) without ever resolving it as a typed value or minting a
/// concept: a bare `Identifier`/`Literal` is its own text, a `$ref` must
/// resolve to a `STRING` value.
fn resolve_as_name(operand: &Operand, ctx: &ExecContext<'_, '_>) -> SpockResult<String> {
    match operand {
        Operand::Identifier(name) => Ok(name.clone()),
        Operand::Literal(n) => Ok(n.to_string()),
        Operand::Reference(name) => {
            let value = ctx.namespace.resolve(name).ok_or_else(|| SpockError::UnknownReference { name: name.clone() })?;
            match value {
                Value::String(s) => Ok(s.text.clone()),
                other => Err(SpockError::Type {
                    expected: vec!["STRING"],
                    actual: other.tag(),
                    verb: "<name>".to_string(),
                    operand: ErrOperand::Object,
                }),
            }
        }
        Operand::Placeholder => Err(SpockError::Execution {
            message: "a placeholder cannot be used as a name".to_string(),
            statement: String::new(),
            line: 0,
        }),
    }
}

fn expect_vector<'v>(value: &'v Value, verb: &str, operand: ErrOperand) -> SpockResult<&'v VectorValue> {
    value.as_vector().ok_or_else(|| SpockError::Type {
        expected: vec!["VECTOR"],
        actual: value.tag(),
        verb: verb.to_string(),
        operand,
    })
}

fn expect_numeric<'v>(value: &'v Value, verb: &str, operand: ErrOperand) -> SpockResult<&'v NumericValue> {
    value.as_numeric().ok_or_else(|| SpockError::Type {
        expected: vec!["NUMERIC"],
        actual: value.tag(),
        verb: verb.to_string(),
        operand,
    })
}

fn expect_scalar<'v>(value: &'v Value, verb: &str, operand: ErrOperand) -> SpockResult<&'v ScalarValue> {
    value.as_scalar().ok_or_else(|| SpockError::Type {
        expected: vec!["SCALAR"],
        actual: value.tag(),
        verb: verb.to_string(),
        operand,
    })
}

fn expect_measured<'v>(value: &'v Value, verb: &str, operand: ErrOperand) -> SpockResult<&'v MeasuredValue> {
    value.as_measured().ok_or_else(|| SpockError::Type {
        expected: vec!["MEASURED"],
        actual: value.tag(),
        verb: verb.to_string(),
        operand,
    })
}

/// A scalar magnitude read from either a `SCALAR` or a `NUMERIC` operand,
/// used by `Solve`'s target-score object.
fn coerce_magnitude(value: &Value) -> Option<f64> {
    match value {
        Value::Scalar(s) => Some(s.value),
        Value::Numeric(n) => Some(n.magnitude),
        _ => None,
    }
}

fn execute_statement(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let result = dispatch_verb(stmt, ctx)?;

    let origin = Origin::new(Some(stmt.declaration.clone()), stmt.verb.clone(), stmt.line)
        .with_statement(stmt.subject.to_string(), stmt.object.to_string());
    let result = stamp_origin(result, origin);

    ctx.namespace.declare(&stmt.declaration, result.clone());
    ctx.tracer.on_statement(TraceEvent::StatementExecuted {
        line: stmt.line,
        declaration: stmt.declaration.clone(),
        verb: stmt.verb.clone(),
        result_tag: result.tag().to_string(),
    });
    ctx.tracer.on_verb_dispatch(TraceEvent::VerbDispatched {
        verb: stmt.verb.clone(),
        subject: stmt.subject.clone(),
        object: Some(stmt.object.clone()),
    });

    Ok(result)
}

fn stamp_origin(value: Value, origin: Origin) -> Value {
    match value {
        Value::Vector(mut v) => {
            v.origin = origin;
            Value::Vector(v)
        }
        Value::Scalar(mut s) => {
            s.origin = origin;
            Value::Scalar(s)
        }
        Value::Numeric(mut n) => {
            n.origin = origin;
            Value::Numeric(n)
        }
        Value::Measured(mut m) => {
            m.origin = origin;
            Value::Measured(m)
        }
        Value::String(mut s) => {
            s.origin = origin;
            Value::String(s)
        }
        Value::Macro(mut m) => {
            m.origin = origin;
            Value::Macro(m)
        }
        Value::Theory(mut t) => {
            t.origin = origin;
            Value::Theory(t)
        }
    }
}

fn dispatch_verb(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let verb = stmt.verb.as_str();
    let line = stmt.line;

    // User-defined macros take priority over every built-in name.
    if ctx.user_verbs.contains_key(verb) {
        let subject = resolve_operand(&stmt.subject, ctx, line)?;
        let object = resolve_operand(&stmt.object, ctx, line)?;
        return call_user_verb(verb, stmt, subject, object, ctx);
    }

    match verb {
        // --- kernel set -------------------------------------------------
        "Add" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            let b = expect_vector(&object, verb, ErrOperand::Object)?;
            Ok(kernel_result(kernel::add(&a.vector, &b.vector)))
        }
        "Bind" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            let b = expect_vector(&object, verb, ErrOperand::Object)?;
            Ok(kernel_result(kernel::bind(&a.vector, &b.vector)))
        }
        "Negate" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            Ok(kernel_result(kernel::negate(&a.vector)))
        }
        "Distance" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            let b = expect_vector(&object, verb, ErrOperand::Object)?;
            let score = kernel::distance(&a.vector, &b.vector);
            Ok(Value::Scalar(ScalarValue::new(score, Origin::new(None, String::new(), line))))
        }
        "Move" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            let b = expect_vector(&object, verb, ErrOperand::Object)?;
            Ok(kernel_result(kernel::mv(&a.vector, &b.vector)))
        }
        "Modulate" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            match &object {
                Value::Vector(b) => Ok(kernel_result(kernel::modulate_vector(&a.vector, &b.vector))),
                Value::Scalar(s) => Ok(kernel_result(kernel::modulate_scalar(&a.vector, s.value))),
                Value::Numeric(n) => Ok(kernel_result(kernel::modulate_scalar(&a.vector, n.magnitude))),
                other => Err(SpockError::Type {
                    expected: vec!["VECTOR", "SCALAR"],
                    actual: other.tag(),
                    verb: verb.to_string(),
                    operand: ErrOperand::Object,
                }),
            }
        }
        "Identity" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            Ok(kernel_result(kernel::identity(&a.vector)))
        }
        "Normalise" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            Ok(kernel_result(kernel::normalise(&a.vector)))
        }

        // --- numeric set --------------------------------------------------
        "HasNumericValue" => {
            let _subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let magnitude = expect_scalar(&object, verb, ErrOperand::Object)?.value;
            Ok(Value::Numeric(NumericValue::new(magnitude, None, Origin::new(None, String::new(), line))))
        }
        "AttachUnit" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let unit = resolve_as_name(&stmt.object, ctx)?;
            Ok(Value::Numeric(NumericValue::new(a.magnitude, Some(unit), Origin::new(None, String::new(), line))))
        }
        "AddNumeric" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let b = expect_numeric(&object, verb, ErrOperand::Object)?;
            let (magnitude, unit) = numeric::combine(a.magnitude, &a.unit, b.magnitude, &b.unit)?;
            Ok(Value::Numeric(NumericValue::new(magnitude, unit, Origin::new(None, String::new(), line))))
        }
        "SubNumeric" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let b = expect_numeric(&object, verb, ErrOperand::Object)?;
            let (magnitude, unit) = numeric::subtract(a.magnitude, &a.unit, b.magnitude, &b.unit)?;
            Ok(Value::Numeric(NumericValue::new(magnitude, unit, Origin::new(None, String::new(), line))))
        }
        "MulNumeric" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let b = expect_numeric(&object, verb, ErrOperand::Object)?;
            let (magnitude, unit) = numeric::compose_mul(a.magnitude, &a.unit, b.magnitude, &b.unit);
            Ok(Value::Numeric(NumericValue::new(magnitude, unit, Origin::new(None, String::new(), line))))
        }
        "DivNumeric" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let b = expect_numeric(&object, verb, ErrOperand::Object)?;
            let (magnitude, unit) = numeric::compose_div(a.magnitude, &a.unit, b.magnitude, &b.unit)?;
            Ok(Value::Numeric(NumericValue::new(magnitude, unit, Origin::new(None, String::new(), line))))
        }
        "AttachToConcept" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_numeric(&subject, verb, ErrOperand::Subject)?;
            let object = resolve_operand(&stmt.object, ctx, line)?;
            let concept = match &object {
                Value::Vector(v) => ConceptRef::Vector(v.vector.clone()),
                Value::String(s) => ConceptRef::Name(s.text.clone()),
                other => {
                    return Err(SpockError::Type {
                        expected: vec!["VECTOR", "STRING"],
                        actual: other.tag(),
                        verb: verb.to_string(),
                        operand: ErrOperand::Object,
                    });
                }
            };
            Ok(Value::Measured(MeasuredValue::new(
                a.magnitude,
                a.unit.clone(),
                Some(concept),
                Origin::new(None, String::new(), line),
            )))
        }
        "ProjectNumeric" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_measured(&subject, verb, ErrOperand::Subject)?;
            Ok(Value::Numeric(NumericValue::new(a.magnitude, a.unit.clone(), Origin::new(None, String::new(), line))))
        }

        // --- planning -------------------------------------------------
        "Plan" => plan_verb(stmt, ctx),
        "Solve" => solve_verb(stmt, ctx),

        // --- theory verbs -----------------------------------------------
        "UseTheory" => use_theory(stmt, ctx),
        "Remember" => remember_theory(stmt, ctx),
        "BranchTheory" => branch_theory(stmt, ctx),
        "MergeTheory" => merge_theory(stmt, ctx),

        // --- distinguished verbs -----------------------------------------
        "Persist" => persist(stmt, ctx),
        "Describe" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let note = resolve_as_name(&stmt.object, ctx)?;
            Ok(subject.described(note))
        }
        "Evaluate" => {
            let subject = resolve_operand(&stmt.subject, ctx, line)?;
            let a = expect_vector(&subject, verb, ErrOperand::Subject)?;
            let score = kernel::distance(&a.vector, &ctx.truth.truth);
            Ok(Value::Scalar(ScalarValue::new(score, Origin::new(None, String::new(), line))))
        }

        other => Err(SpockError::UnknownVerb { verb: other.to_string() }),
    }
}

fn kernel_result(vector: Vector) -> Value {
    Value::Vector(kernel::wrap(vector, Origin::new(None, String::new(), 0)))
}

fn plan_verb(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let subject = resolve_operand(&stmt.subject, ctx, stmt.line)?;
    let object = resolve_operand(&stmt.object, ctx, stmt.line)?;
    let start = expect_vector(&subject, &stmt.verb, ErrOperand::Subject)?.vector.clone();
    let goal = expect_vector(&object, &stmt.verb, ErrOperand::Object)?.vector.clone();
    let actions: Vec<Action> = ctx
        .auto_concepts_snapshot()
        .into_iter()
        .take(ctx.candidate_limit)
        .map(|(name, vector)| Action { name, delta: vector })
        .collect();
    let result = planner::plan(start, &goal, &actions, ctx.plateau, ctx.limits, ctx.tracer, ctx.rng)?;
    Ok(Value::Vector(VectorValue::new(result.final_vector, Origin::new(None, String::new(), stmt.line))))
}

fn solve_verb(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let subject = resolve_operand(&stmt.subject, ctx, stmt.line)?;
    let object = resolve_operand(&stmt.object, ctx, stmt.line)?;
    let start = expect_vector(&subject, &stmt.verb, ErrOperand::Subject)?.vector.clone();
    let target_score = coerce_magnitude(&object).unwrap_or(1.0);
    let truth = ctx.truth.truth.clone();
    let actions: Vec<Action> = ctx
        .auto_concepts_snapshot()
        .into_iter()
        .take(ctx.candidate_limit)
        .map(|(name, vector)| Action { name, delta: vector })
        .collect();
    let result = planner::solve(
        start,
        |v| 1.0 - (kernel::distance(v, &truth) - target_score).abs(),
        &actions,
        ctx.plateau,
        ctx.limits,
        ctx.tracer,
        ctx.rng,
    )?;
    Ok(Value::Vector(VectorValue::new(result.final_vector, Origin::new(None, String::new(), stmt.line))))
}

fn use_theory(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let name = resolve_as_name(&stmt.subject, ctx)?;
    let snapshot = ctx.theory_store.load(&name)?;
    ctx.namespace.push_theory_overlay(snapshot.declarations.clone());
    ctx.tracer.on_theory_event(TraceEvent::TheoryLoaded { name, version: snapshot.descriptor.version.to_string() });
    Ok(Value::Theory(TheoryValue::new(snapshot.descriptor, Origin::new(None, String::new(), stmt.line))))
}

fn remember_theory(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let name = resolve_as_name(&stmt.subject, ctx)?;
    let declarations = ctx.namespace.local_declarations().clone();
    let source = render_declarations(&declarations);
    let descriptor = TheoryDescriptor::new(&name, None);
    let snapshot = TheorySnapshot { descriptor: descriptor.clone(), source, declarations };
    ctx.theory_store.save(&snapshot)?;
    ctx.tracer.on_theory_event(TraceEvent::TheorySaved { name, version: descriptor.version.to_string() });
    Ok(Value::Theory(TheoryValue::new(descriptor, Origin::new(None, String::new(), stmt.line))))
}

fn branch_theory(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let source_name = resolve_as_name(&stmt.subject, ctx)?;
    let new_name = resolve_as_name(&stmt.object, ctx)?;
    let source_snapshot = ctx.theory_store.load(&source_name)?;
    let branched = versioning::branch(&source_snapshot, &new_name);
    ctx.theory_store.save(&branched)?;
    ctx.tracer.on_theory_event(TraceEvent::TheoryBranched {
        name: new_name,
        from_version: source_snapshot.descriptor.version.to_string(),
        to_version: branched.descriptor.version.to_string(),
    });
    Ok(Value::Theory(TheoryValue::new(branched.descriptor, Origin::new(None, String::new(), stmt.line))))
}

fn merge_theory(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let target_name = resolve_as_name(&stmt.subject, ctx)?;
    let source_name = resolve_as_name(&stmt.object, ctx)?;
    let target = ctx.theory_store.load(&target_name)?;
    let source = ctx.theory_store.load(&source_name)?;
    let merged = versioning::merge(&target, &source, ctx.merge_strategy)?;
    ctx.theory_store.save(&merged)?;
    ctx.tracer.on_theory_event(TraceEvent::TheoryMerged {
        name: target_name,
        target_version: target.descriptor.version.to_string(),
        source_version: source.descriptor.version.to_string(),
        conflicts: 0,
    });
    Ok(Value::Theory(TheoryValue::new(merged.descriptor, Origin::new(None, String::new(), stmt.line))))
}

fn persist(stmt: &Statement, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let subject = resolve_operand(&stmt.subject, ctx, stmt.line)?;
    let name = resolve_as_name(&stmt.object, ctx)?;
    let mut declarations = IndexMap::new();
    declarations.insert(name.clone(), subject.clone());
    let descriptor = TheoryDescriptor::new(&name, None);
    let snapshot = TheorySnapshot {
        descriptor: descriptor.clone(),
        source: render_declarations(&declarations),
        declarations,
    };
    ctx.theory_store.save(&snapshot)?;
    ctx.tracer.on_theory_event(TraceEvent::TheorySaved { name, version: descriptor.version.to_string() });
    Ok(subject)
}

fn call_user_verb(verb: &str, stmt: &Statement, subject: Value, object: Value, ctx: &mut ExecContext<'_, '_>) -> SpockResult<Value> {
    let Some(macro_def) = ctx.user_verbs.get(verb).cloned() else {
        return Err(SpockError::UnknownVerb { verb: stmt.verb.clone() });
    };

    ctx.limits.enter_call().map_err(|e| SpockError::Execution {
        message: e.to_string(),
        statement: stmt.to_string(),
        line: stmt.line,
    })?;

    let outcome = (|| -> SpockResult<Value> {
        let mut child = Namespace::child(ctx.namespace);
        child.declare("subject", subject);
        child.declare("object", object);

        let mut child_ctx = ExecContext {
            namespace: &mut child,
            truth: ctx.truth,
            dim: ctx.dim,
            generation: ctx.generation,
            rng: ctx.rng,
            limits: ctx.limits,
            tracer: ctx.tracer,
            theory_store: ctx.theory_store,
            plateau: ctx.plateau,
            candidate_limit: ctx.candidate_limit,
            merge_strategy: ctx.merge_strategy,
            auto_concepts: ctx.auto_concepts,
            user_verbs: ctx.user_verbs,
        };

        for body_stmt in &macro_def.body {
            execute_statement(body_stmt, &mut child_ctx)?;
        }

        child_ctx
            .namespace
            .local_declarations()
            .get("result")
            .cloned()
            .ok_or_else(|| SpockError::Execution {
                message: format!("verb macro '{verb}' did not declare '@result'"),
                statement: stmt.to_string(),
                line: stmt.line,
            })
    })();

    ctx.limits.leave_call();
    outcome
}

/// Renders a namespace's local declarations back into SpockDSL source
/// text. A value whose origin still carries its producing statement's
/// operand text is re-emitted verbatim (`@name subject verb object`);
/// anything else (a bare literal, an auto-concept with no recorded
/// statement) falls back to a self-referential `Identity` statement.
pub(crate) fn render_declarations(declarations: &IndexMap<String, Value>) -> String {
    let mut out = String::new();
    for (name, value) in declarations {
        let origin = value.origin();
        match (&origin.subject_text, &origin.object_text) {
            (Some(subject), Some(object)) if !origin.verb.is_empty() => {
                out.push_str(&format!("@{name} {subject} {} {object}\n", origin.verb));
            }
            _ => {
                out.push_str(&format!("@{name} {name} Identity {name}\n"));
            }
        }
    }
    out
}

/// Re-executes `script` against a fresh engine state built from the same
/// seed and theories, and asserts the two trace event sequences are
/// identical — the determinism contract of the testable properties.
pub fn replay_check(
    script: &Script,
    seed: u64,
    dim: usize,
    generation: VectorGeneration,
    theory_store: &TheoryStore,
    truth: &TruthConstants,
) -> SpockResult<bool> {
    use crate::resource::ResourceLimits;
    use crate::tracer::RecordingTracer;

    let run_once = |seed: u64| -> SpockResult<Vec<TraceEvent>> {
        let mut namespace = Namespace::root();
        let mut rng = RngHandle::from_seed(seed);
        let mut limits = LimitTracker::new(ResourceLimits::default());
        let mut tracer = RecordingTracer::new();
        let mut auto_concepts = IndexMap::new();
        let mut user_verbs = IndexMap::new();
        let mut ctx = ExecContext::new(
            &mut namespace,
            truth,
            dim,
            generation,
            &mut rng,
            &mut limits,
            &mut tracer,
            theory_store,
            PlateauStrategy::Stop,
            crate::engine::DEFAULT_CANDIDATE_LIMIT,
            MergeStrategy::PreferTarget,
            &mut auto_concepts,
            &mut user_verbs,
        );
        execute_script(script, &mut ctx)?;
        Ok(tracer.into_events())
    };

    let first = run_once(seed)?;
    let second = run_once(seed)?;
    Ok(first == second)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::resource::ResourceLimits;
    use crate::tracer::NoopTracer;

    fn truth_constants(dim: usize) -> TruthConstants {
        TruthConstants {
            truth: Vector::from_vec(vec![1.0; dim]).normalise(),
            falsehood: Vector::from_vec(vec![-1.0; dim]).normalise(),
            zero: Vector::zeros(dim),
        }
    }

    fn run(source: &str) -> SpockResult<IndexMap<String, Value>> {
        let dim = 8;
        let script = parse::parse(source).unwrap();
        let mut namespace = Namespace::root();
        let truth = truth_constants(dim);
        let mut rng = RngHandle::from_seed(7);
        let mut limits = LimitTracker::new(ResourceLimits::default());
        let mut tracer = NoopTracer;
        let dir = tempfile::tempdir().unwrap();
        let store = TheoryStore::new(dir.path().to_path_buf());
        let mut auto_concepts = IndexMap::new();
        let mut user_verbs = IndexMap::new();
        let mut ctx = ExecContext::new(
            &mut namespace,
            &truth,
            dim,
            VectorGeneration::Gaussian,
            &mut rng,
            &mut limits,
            &mut tracer,
            &store,
            PlateauStrategy::Stop,
            crate::engine::DEFAULT_CANDIDATE_LIMIT,
            MergeStrategy::PreferTarget,
            &mut auto_concepts,
            &mut user_verbs,
        );
        execute_script(&script, &mut ctx)
    }

    #[test]
    fn bind_produces_a_vector() {
        let results = run("@r a Bind b\n").unwrap();
        assert_eq!(results["r"].tag(), "VECTOR");
    }

    #[test]
    fn distance_of_same_identifier_is_one() {
        let results = run("@r a Distance a\n").unwrap();
        let score = results["r"].as_scalar().unwrap().value;
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_verb_is_an_error() {
        assert!(matches!(run("@r a Frobnicate b\n"), Err(SpockError::UnknownVerb { .. })));
    }

    #[test]
    fn modulate_accepts_either_vector_or_scalar_object() {
        assert!(run("@n a HasNumericValue 2\n@r a Modulate n\n").is_ok());
        assert!(run("@r a Modulate b\n").is_ok());
    }

    #[test]
    fn modulate_rejects_a_measured_object() {
        let source = "@n a HasNumericValue 2\n@m n AttachToConcept b\n@r a Modulate m\n";
        assert!(matches!(run(source), Err(SpockError::Type { .. })));
    }

    #[test]
    fn macro_defines_a_callable_user_verb() {
        let source = "@Double verb begin\n@result subject Bind subject\nend\n@r a Double _\n";
        let results = run(source).unwrap();
        assert_eq!(results["r"].tag(), "VECTOR");
    }

    #[test]
    fn verb_macro_without_result_declared_is_an_execution_error() {
        let source = "@Double verb begin\n@out subject Bind subject\nend\n";
        assert!(matches!(parse::parse(source), Err(SpockError::Parse { .. })));
    }

    #[test]
    fn has_numeric_value_boxes_a_literal() {
        let results = run("@n a HasNumericValue 5\n").unwrap();
        assert_eq!(results["n"].as_numeric().unwrap().magnitude, 5.0);
    }

    #[test]
    fn attach_unit_then_add_numeric_requires_matching_units() {
        let source = "@d1 a HasNumericValue 5\n@u1 d1 AttachUnit m\n@d2 b HasNumericValue 3\n@u2 d2 AttachUnit m\n@total u1 AddNumeric u2\n";
        let results = run(source).unwrap();
        assert_eq!(results["total"].as_numeric().unwrap().magnitude, 8.0);
    }

    #[test]
    fn attach_unit_accepts_any_symbol() {
        let results = run("@d a HasNumericValue 1\n@u d AttachUnit furlong\n").unwrap();
        assert_eq!(results["u"].as_numeric().unwrap().unit.as_deref(), Some("furlong"));
    }
}
