//! Test unit composition
//!
//! A [`TestUnit`] has three regions:
//! - arrange: the Setup phase rebuilt by the reconstruction backend
//! - act: the recorded call, binding its result or error when there is one
//! - assert: the Expect phase checked by the verification backend, skipping
//!   values the call left unchanged
//!
//! [`TestGenerator`] turns snapshots into units and doubles as a
//! [`SnapshotSink`] collecting them.

use crate::code::{Dialect, Expr, StandardDialect, Stmt};
use crate::error::CodegenError;
use crate::matchers::{MatcherAdaptors, MatcherGenerator, BOX_MATCHER};
use crate::scope::{TypeManager, UnitScope};
use crate::setup::{SetupAdaptors, SetupGenerator};
use parking_lot::Mutex;
use snaptest_matching::graph_equals;
use snaptest_values::{
    CallRecord, Literal, Outcome, RegistryError, Signature, SinkError, Snapshot, SnapshotSink,
    TypeRef, TypeRegistry, ValueGraph, ValueId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Local bound to the call result
pub const RESULT_LOCAL: &str = "result";

/// Local bound to the thrown error
pub const ERROR_LOCAL: &str = "error";

/// One generated test
#[derive(Debug, Clone)]
pub struct TestUnit {
    /// Function name, `test_<method><n>`
    pub name: String,
    /// Call under test
    pub signature: Signature,
    /// State preparation
    pub arrange: Vec<Stmt>,
    /// The recorded call
    pub act: Vec<Stmt>,
    /// Verification
    pub assert: Vec<Stmt>,
    /// Imports registered while building the unit
    pub types: TypeManager,
}

impl TestUnit {
    /// All statements in region order
    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.arrange.iter().chain(&self.act).chain(&self.assert)
    }

    /// Rendered statements, one per line
    #[must_use]
    pub fn lines(&self, dialect: &dyn Dialect) -> Vec<String> {
        let mut types = self.types.clone();
        self.statements()
            .map(|stmt| dialect.stmt(stmt, &mut types))
            .collect()
    }

    /// Rendered imports followed by the test function
    #[must_use]
    pub fn render(&self, dialect: &dyn Dialect) -> String {
        let mut types = self.types.clone();
        let mut body = Vec::new();
        for (region, statements) in [
            ("arrange", &self.arrange),
            ("act", &self.act),
            ("assert", &self.assert),
        ] {
            if statements.is_empty() {
                continue;
            }
            if !body.is_empty() {
                body.push(String::new());
            }
            body.push(format!("    // {region}"));
            body.extend(
                statements
                    .iter()
                    .map(|stmt| format!("    {}", dialect.stmt(stmt, &mut types))),
            );
        }

        let mut out = String::new();
        for path in types.imports().chain(types.static_imports()) {
            out.push_str(&dialect.import(path));
            out.push('\n');
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("#[test]\n");
        out.push_str(&format!("fn {}() {{\n", self.name));
        for line in body {
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

/// Builds test units from snapshots
pub struct TestGenerator {
    types: Arc<TypeRegistry>,
    setup: Arc<SetupAdaptors>,
    matchers: Arc<MatcherAdaptors>,
    dialect: Arc<dyn Dialect>,
    units: Mutex<Vec<TestUnit>>,
    counters: Mutex<HashMap<String, usize>>,
}

impl fmt::Debug for TestGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestGenerator")
            .field("setup", &self.setup)
            .field("matchers", &self.matchers)
            .field("dialect", &self.dialect.name())
            .field("units", &self.units.lock().len())
            .finish_non_exhaustive()
    }
}

impl TestGenerator {
    /// Generator with the given adaptor registries
    #[must_use]
    pub fn new(
        types: Arc<TypeRegistry>,
        setup: Arc<SetupAdaptors>,
        matchers: Arc<MatcherAdaptors>,
    ) -> Self {
        Self {
            types,
            setup,
            matchers,
            dialect: Arc::new(StandardDialect),
            units: Mutex::new(Vec::new()),
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Generator with the built-in adaptors
    ///
    /// # Errors
    /// Returns [`RegistryError`] if the built-in registries are malformed.
    pub fn standard(types: Arc<TypeRegistry>) -> Result<Self, RegistryError> {
        Ok(Self::new(
            types,
            Arc::new(SetupAdaptors::standard()?),
            Arc::new(MatcherAdaptors::standard()?),
        ))
    }

    /// Use `dialect` for rendering
    #[must_use]
    pub fn with_dialect(mut self, dialect: Arc<dyn Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    /// Rendering dialect
    #[inline]
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Class table
    #[inline]
    #[must_use]
    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Build the unit for `snapshot`
    ///
    /// # Errors
    /// Returns [`CodegenError::InvalidSnapshot`] for invalidated snapshots and
    /// any backend error raised while rendering.
    pub fn generate(&self, snapshot: &Snapshot) -> Result<TestUnit, CodegenError> {
        if !snapshot.is_valid() {
            return Err(CodegenError::InvalidSnapshot);
        }
        let mut scope = UnitScope::new();
        let graph = snapshot.graph();
        let signature = snapshot.signature();

        let mut arrange = vec![Stmt::Comment(format!("captured {signature}"))];
        let mut setup = SetupGenerator::new(graph, &self.types, &self.setup, &mut scope);
        let receiver = snapshot
            .setup()
            .this
            .map(|this| setup.value(this))
            .transpose()?;
        let args = snapshot
            .setup()
            .args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                let declared = signature
                    .param_types
                    .get(index)
                    .cloned()
                    .unwrap_or_else(TypeRef::object);
                setup.value_as(*arg, &declared)
            })
            .collect::<Result<Vec<_>, _>>()?;
        for global in &snapshot.setup().globals {
            let value = setup.value_as(global.value, &global.global.ty)?;
            setup.push(Stmt::Assign {
                target: Expr::StaticField {
                    owner: TypeRef::class(global.global.owner.clone()),
                    name: global.global.name.clone(),
                },
                value,
            });
        }
        for record in snapshot.inputs() {
            let stub = input_stub(record, &mut setup)?;
            setup.push(Stmt::Expr(stub));
        }
        arrange.extend(setup.take_statements());

        let call = match &receiver {
            Some(target) => Expr::call(target.clone(), signature.method.clone(), args.clone()),
            None => Expr::StaticCall {
                owner: Some(signature.declaring.erasure()),
                function: signature.method.clone(),
                type_args: Vec::new(),
                args: args.clone(),
            },
        };
        let act = match snapshot.outcome() {
            Outcome::Pending => return Err(CodegenError::InvalidSnapshot),
            Outcome::Returned(Some(_)) if !signature.is_void() => vec![Stmt::Let {
                name: RESULT_LOCAL.to_string(),
                ty: signature.result_type.clone(),
                value: call,
            }],
            Outcome::Returned(_) => vec![Stmt::Expr(call)],
            Outcome::Threw(error) => {
                scope.types.add_static_import("snaptest_matching::expect_throws");
                vec![Stmt::Let {
                    name: ERROR_LOCAL.to_string(),
                    ty: self.types.public_supertype(graph.node(error)?.runtime_type()),
                    value: Expr::function("expect_throws", vec![Expr::Closure(Box::new(call))]),
                }]
            }
        };

        let mut verify = MatcherGenerator::new(graph, &self.types, &self.matchers, &mut scope);
        match snapshot.outcome() {
            Outcome::Returned(Some(result)) if !signature.is_void() => {
                verify.assert_value(result, Expr::local(RESULT_LOCAL))?;
            }
            Outcome::Threw(error) => verify.assert_value(error, Expr::local(ERROR_LOCAL))?,
            _ => {}
        }
        if let (Some(target), Some(before), Some(after)) =
            (&receiver, snapshot.setup().this, snapshot.expect().this)
        {
            if changed(graph, before, after) {
                verify.assert_value(after, target.clone())?;
            } else {
                tracing::trace!(method = %signature.method, "receiver unchanged");
            }
        }
        for (index, (arg, (before, after))) in args
            .iter()
            .zip(snapshot.setup().args.iter().zip(&snapshot.expect().args))
            .enumerate()
        {
            let immutable = signature
                .param_types
                .get(index)
                .is_some_and(TypeRef::is_immutable);
            if immutable || arg.is_inline() || !changed(graph, *before, *after) {
                continue;
            }
            verify.assert_value(*after, arg.clone())?;
        }
        for (before, after) in snapshot.setup().globals.iter().zip(&snapshot.expect().globals) {
            if changed(graph, before.value, after.value) {
                let actual = Expr::StaticField {
                    owner: TypeRef::class(after.global.owner.clone()),
                    name: after.global.name.clone(),
                };
                verify.assert_value(after.value, actual)?;
            }
        }
        for record in snapshot.outputs() {
            let matchers = verify.matchers(&record.args)?;
            verify.push(Stmt::Expr(Expr::generic_function(
                "verify_call",
                vec![record.owner.erasure()],
                vec![
                    Expr::Literal(Literal::from(record.member.as_str())),
                    Expr::NewArray {
                        component: TypeRef::class(BOX_MATCHER),
                        elements: matchers,
                    },
                ],
            )));
        }
        let assert = verify.take_statements();

        let unit = TestUnit {
            name: self.next_name(&signature.method),
            signature: signature.clone(),
            arrange,
            act,
            assert,
            types: scope.types,
        };
        tracing::debug!(unit = %unit.name, snapshot = %snapshot.id(), "generated test unit");
        Ok(unit)
    }

    /// Generate and keep the unit for `snapshot`
    ///
    /// # Errors
    /// See [`Self::generate`].
    pub fn collect(&self, snapshot: &Snapshot) -> Result<(), CodegenError> {
        let unit = self.generate(snapshot)?;
        self.units.lock().push(unit);
        Ok(())
    }

    /// Names of the collected units
    #[must_use]
    pub fn unit_names(&self) -> Vec<String> {
        self.units.lock().iter().map(|unit| unit.name.clone()).collect()
    }

    /// Number of collected units
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    /// Check if no unit was collected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }

    /// Remove and return the collected units
    #[must_use]
    pub fn take_units(&self) -> Vec<TestUnit> {
        std::mem::take(&mut *self.units.lock())
    }

    fn next_name(&self, method: &str) -> String {
        let mut counters = self.counters.lock();
        let counter = counters.entry(method.to_string()).or_insert(0);
        *counter += 1;
        format!("test_{method}{counter}")
    }
}

impl SnapshotSink for TestGenerator {
    fn accept(&self, snapshot: Snapshot) -> Result<(), SinkError> {
        self.collect(&snapshot)
            .map_err(|e| SinkError::new(format!("{}: {e}", snapshot.signature())))
    }
}

fn changed(graph: &ValueGraph, before: ValueId, after: ValueId) -> bool {
    before != after && !graph_equals(graph, before, graph, after)
}

/// `fake_input::<Owner>("member", vec![args], result)`
fn input_stub(record: &CallRecord, setup: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
    let args = record
        .args
        .iter()
        .zip(record.param_types.iter().chain(std::iter::repeat(&TypeRef::Void)))
        .map(|(arg, declared)| {
            if declared.is_void() {
                setup.value(*arg)
            } else {
                setup.value_as(*arg, declared)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    let result = match record.result {
        Some(result) => setup.value(result)?,
        None => Expr::Null,
    };
    Ok(Expr::generic_function(
        "fake_input",
        vec![record.owner.erasure()],
        vec![
            Expr::Literal(Literal::from(record.member.as_str())),
            Expr::NewArray {
                component: TypeRef::object(),
                elements: args,
            },
            result,
        ],
    ))
}
