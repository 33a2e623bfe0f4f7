//! Evaluator for generated code
//!
//! Interprets the [`Expr`]/[`Stmt`] model against the host object model:
//! - `Type::new()` allocates lists, sets and maps per the class table and
//!   plain objects with every declared field at its default
//! - collection methods (`add`, `put`, `get`, `size`, `contains`) are
//!   built in; other methods are host methods registered by the caller
//! - matcher functions build the runtime matchers of `snaptest_matching`
//!   and `assert_that` checks them
//! - `fake_input`/`verify_call` go through a recorded [`Interactions`] log
//!
//! Running the statements of a [`TestUnit`] is how round-trip and scenario
//! properties are checked.

use crate::code::{Expr, Stmt};
use crate::error::EvalError;
use crate::generator::TestUnit;
use crate::matchers::BOX_MATCHER;
use snaptest_matching::matchers::{
    array_containing, contains_entries, contains_in_any_order, contains_in_order, entry, equal_to,
    null_value, primitive_array_containing, recursive, EntryMatcher,
};
use snaptest_matching::{
    assert_that, generic_matcher, live_equals, AssertionError, BoxMatcher, Expected,
    GenericMatcherBuilder,
};
use snaptest_values::{
    well_known, Literal, LiveValue, ObjRef, ObjectBody, Primitive, TypeRef, TypeRegistry,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Type of entry matcher sequences
pub const ENTRY_MATCHER: &str = "snaptest_matching::matchers::EntryMatcher";

/// Outcome of a host method: a value or a thrown error value
pub type HostResult = Result<LiveValue, LiveValue>;

/// Behavior of a method of the code under test
pub type HostMethod =
    Arc<dyn Fn(Option<&LiveValue>, &[LiveValue], &mut Interactions) -> HostResult + Send + Sync>;

/// Evaluated expression
#[derive(Debug, Clone)]
pub enum Value {
    /// Value of the host object model
    Live(LiveValue),
    /// Runtime matcher
    Matcher(BoxMatcher),
    /// Unfinished generic matcher
    Builder(GenericMatcherBuilder),
    /// Map entry matcher
    Entry(EntryMatcher),
    /// Sequence of matchers or entries
    Seq(Vec<Value>),
    /// Deferred expression
    Closure(Expr),
    /// No value
    Unit,
}

impl Value {
    /// Live value, or a mismatch error
    ///
    /// # Errors
    /// Returns [`EvalError::TypeMismatch`] for non-live values.
    pub fn into_live(self) -> Result<LiveValue, EvalError> {
        match self {
            Self::Live(value) => Ok(value),
            Self::Unit => Ok(LiveValue::Null),
            other => Err(EvalError::mismatch("live value", other)),
        }
    }

    fn into_matcher(self) -> Result<BoxMatcher, EvalError> {
        match self {
            Self::Matcher(matcher) => Ok(matcher),
            other => Err(EvalError::mismatch("matcher", other)),
        }
    }

    fn into_matchers(self) -> Result<Vec<BoxMatcher>, EvalError> {
        match self {
            Self::Seq(items) => items.into_iter().map(Self::into_matcher).collect(),
            other => Err(EvalError::mismatch("matcher sequence", other)),
        }
    }
}

/// Call made to a collaborator while the code under test ran
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Collaborator class
    pub owner: String,
    /// Member name
    pub member: String,
    /// Arguments
    pub args: Vec<LiveValue>,
}

#[derive(Debug, Clone)]
struct Stub {
    owner: String,
    member: String,
    args: Vec<LiveValue>,
    result: LiveValue,
}

/// Collaborator stubs and the calls made to collaborators
#[derive(Debug, Clone, Default)]
pub struct Interactions {
    stubs: Vec<Stub>,
    calls: Vec<RecordedCall>,
}

impl Interactions {
    /// Answer `owner::member(args)` with `result`
    pub fn stub(
        &mut self,
        owner: impl Into<String>,
        member: impl Into<String>,
        args: Vec<LiveValue>,
        result: LiveValue,
    ) {
        self.stubs.push(Stub {
            owner: owner.into(),
            member: member.into(),
            args,
            result,
        });
    }

    /// Stubbed answer for `owner::member(args)`
    #[must_use]
    pub fn stubbed(
        &self,
        types: &TypeRegistry,
        owner: &str,
        member: &str,
        args: &[LiveValue],
    ) -> Option<LiveValue> {
        self.stubs
            .iter()
            .find(|stub| {
                stub.owner == owner
                    && stub.member == member
                    && stub.args.len() == args.len()
                    && stub.args.iter().zip(args).all(|(a, b)| live_equals(types, a, b))
            })
            .map(|stub| stub.result.clone())
    }

    /// Log a call to a collaborator
    pub fn record(&mut self, owner: impl Into<String>, member: impl Into<String>, args: Vec<LiveValue>) {
        self.calls.push(RecordedCall {
            owner: owner.into(),
            member: member.into(),
            args,
        });
    }

    /// Calls logged so far
    #[must_use]
    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }
}

/// Interpreter for generated statements
pub struct Evaluator<'t> {
    types: &'t TypeRegistry,
    locals: HashMap<String, Value>,
    statics: HashMap<(String, String), LiveValue>,
    methods: HashMap<(String, String), HostMethod>,
    interactions: Interactions,
}

impl fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("locals", &self.locals.keys().collect::<Vec<_>>())
            .field("statics", &self.statics)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("interactions", &self.interactions)
            .finish()
    }
}

impl<'t> Evaluator<'t> {
    /// Evaluator over the class table `types`
    #[must_use]
    pub fn new(types: &'t TypeRegistry) -> Self {
        Self {
            types,
            locals: HashMap::new(),
            statics: HashMap::new(),
            methods: HashMap::new(),
            interactions: Interactions::default(),
        }
    }

    /// Register `owner::name` as a host method
    ///
    /// Instance calls resolve through the receiver's class ancestry; calls
    /// without a receiver use `owner` directly.
    #[must_use]
    pub fn with_method<F>(mut self, owner: impl Into<String>, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Option<&LiveValue>, &[LiveValue], &mut Interactions) -> HostResult + Send + Sync + 'static,
    {
        self.methods.insert((owner.into(), name.into()), Arc::new(method));
        self
    }

    /// Run every region of `unit`
    ///
    /// # Errors
    /// Returns the first [`EvalError`], including failed assertions.
    pub fn run_unit(&mut self, unit: &TestUnit) -> Result<(), EvalError> {
        tracing::debug!(unit = %unit.name, "evaluating test unit");
        self.run(unit.statements())
    }

    /// Run statements in order
    ///
    /// # Errors
    /// Returns the first [`EvalError`].
    pub fn run<'s>(&mut self, statements: impl IntoIterator<Item = &'s Stmt>) -> Result<(), EvalError> {
        for stmt in statements {
            self.exec(stmt)?;
        }
        Ok(())
    }

    /// Run one statement
    ///
    /// # Errors
    /// Returns [`EvalError`] if the statement cannot be evaluated.
    pub fn exec(&mut self, stmt: &Stmt) -> Result<(), EvalError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval(value)?;
                self.locals.insert(name.clone(), value);
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value)?.into_live()?;
                self.assign(target, value)?;
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
            Stmt::Comment(_) => {}
        }
        Ok(())
    }

    /// Live value bound to local `name`
    #[must_use]
    pub fn local(&self, name: &str) -> Option<&LiveValue> {
        match self.locals.get(name)? {
            Value::Live(value) => Some(value),
            _ => None,
        }
    }

    /// Bind `value` to local `name`, as the act region of a unit would
    pub fn bind(&mut self, name: impl Into<String>, value: LiveValue) {
        self.locals.insert(name.into(), Value::Live(value));
    }

    /// Current value of a class-level field
    #[must_use]
    pub fn static_value(&self, owner: &str, name: &str) -> LiveValue {
        if let Some(value) = self.statics.get(&(owner.to_string(), name.to_string())) {
            return value.clone();
        }
        self.types
            .static_fields(owner)
            .into_iter()
            .find(|field| field.name == name)
            .map_or(LiveValue::Null, |field| LiveValue::default_for(&field.ty))
    }

    /// Assign a class-level field
    pub fn set_static(&mut self, owner: impl Into<String>, name: impl Into<String>, value: LiveValue) {
        self.statics.insert((owner.into(), name.into()), value);
    }

    /// Collaborator log
    #[must_use]
    pub fn interactions(&self) -> &Interactions {
        &self.interactions
    }

    /// Evaluate an expression
    ///
    /// # Errors
    /// Returns [`EvalError`] if the expression cannot be evaluated.
    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        Ok(match expr {
            Expr::Literal(literal) => Value::Live(LiveValue::from_literal(literal)),
            Expr::Null => Value::Live(LiveValue::Null),
            Expr::Local(name) => self
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnboundLocal(name.clone()))?,
            Expr::EnumConstant { ty, name } => {
                Value::Live(LiveValue::enum_constant(ty.erasure().to_string(), name.clone()))
            }
            Expr::New { ty, .. } => Value::Live(self.instantiate(ty).into()),
            Expr::NewArray { component, elements } => {
                let values = elements
                    .iter()
                    .map(|element| self.eval(element))
                    .collect::<Result<Vec<_>, _>>()?;
                if matches!(component.raw_name(), Some(BOX_MATCHER | ENTRY_MATCHER)) {
                    Value::Seq(values)
                } else {
                    let items = values
                        .into_iter()
                        .map(Value::into_live)
                        .collect::<Result<Vec<_>, _>>()?;
                    Value::Live(ObjRef::array(component.clone(), items).into())
                }
            }
            Expr::Call {
                target,
                method,
                type_args,
                args,
            } => {
                let target = self.eval(target)?;
                let args = self.eval_all(args)?;
                self.call(target, method, type_args, args)?
            }
            Expr::StaticCall {
                owner,
                function,
                type_args,
                args,
            } => match owner {
                Some(owner) => {
                    let args = self.live_args(args)?;
                    let owner = owner.erasure().to_string();
                    Value::Live(self.host(&owner, function, None, &args)?)
                }
                None => self.function(function, type_args, args)?,
            },
            Expr::Field { target, name } => {
                let target = self.eval(target)?.into_live()?;
                let obj = target
                    .as_object()
                    .ok_or_else(|| EvalError::mismatch("object", &target))?;
                Value::Live(obj.field(name).unwrap_or(LiveValue::Null))
            }
            Expr::StaticField { owner, name } => {
                Value::Live(self.static_value(&owner.erasure().to_string(), name))
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?.into_live()?;
                let items = elements(&target)?;
                let len = items.len();
                Value::Live(
                    items
                        .into_iter()
                        .nth(*index)
                        .ok_or(EvalError::OutOfBounds { index: *index, len })?,
                )
            }
            Expr::Cast { expr, ty } => {
                let value = self.eval(expr)?.into_live()?;
                Value::Live(match ty.unboxed() {
                    Some(kind) if !value.is_null() => convert(&value, kind)?,
                    _ => value,
                })
            }
            Expr::Closure(body) => Value::Closure((**body).clone()),
        })
    }

    fn eval_all(&mut self, exprs: &[Expr]) -> Result<Vec<Value>, EvalError> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn live_args(&mut self, exprs: &[Expr]) -> Result<Vec<LiveValue>, EvalError> {
        exprs
            .iter()
            .map(|expr| self.eval(expr)?.into_live())
            .collect()
    }

    fn assign(&mut self, target: &Expr, value: LiveValue) -> Result<(), EvalError> {
        match target {
            Expr::Local(name) => {
                self.locals.insert(name.clone(), Value::Live(value));
            }
            Expr::Field { target, name } => {
                let target = self.eval(target)?.into_live()?;
                let obj = target
                    .as_object()
                    .ok_or_else(|| EvalError::mismatch("object", &target))?;
                if !obj.set_field(name.clone(), value) {
                    return Err(EvalError::mismatch("object with fields", obj.class()));
                }
            }
            Expr::Index { target, index } => {
                let target = self.eval(target)?.into_live()?;
                let obj = target
                    .as_object()
                    .ok_or_else(|| EvalError::mismatch("array", &target))?;
                if !obj.set_element(*index, value) {
                    return Err(EvalError::OutOfBounds {
                        index: *index,
                        len: obj.len(),
                    });
                }
            }
            Expr::StaticField { owner, name } => {
                self.set_static(owner.erasure().to_string(), name.clone(), value);
            }
            other => return Err(EvalError::mismatch("assignable place", other)),
        }
        Ok(())
    }

    fn instantiate(&self, ty: &TypeRef) -> ObjRef {
        if self.types.is_list(ty) {
            ObjRef::list(ty.clone(), Vec::new())
        } else if self.types.is_set(ty) {
            ObjRef::set(ty.clone(), Vec::new())
        } else if self.types.is_map(ty) {
            ObjRef::map(ty.clone(), Vec::new())
        } else {
            let fields = ty
                .raw_name()
                .map(|name| {
                    self.types
                        .all_fields(name)
                        .into_iter()
                        .map(|(_, field)| (field.name.clone(), LiveValue::default_for(&field.ty)))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            ObjRef::with_fields(ty.clone(), fields)
        }
    }

    fn host(
        &mut self,
        owner: &str,
        name: &str,
        receiver: Option<&LiveValue>,
        args: &[LiveValue],
    ) -> Result<LiveValue, EvalError> {
        let method = self
            .methods
            .get(&(owner.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| EvalError::UnknownMethod(format!("{owner}::{name}")))?;
        method(receiver, args, &mut self.interactions).map_err(EvalError::Thrown)
    }

    /// Host method `name` for an instance of `class`, nearest ancestor first
    fn resolve(&self, class: &TypeRef, name: &str) -> Option<String> {
        let raw = class.raw_name()?;
        let mut candidates: Vec<&str> = self
            .methods
            .keys()
            .filter(|(owner, method)| method == name && self.types.is_subclass(raw, owner))
            .map(|(owner, _)| owner.as_str())
            .collect();
        candidates.sort_by_key(|owner| (*owner != raw, *owner));
        candidates.first().map(ToString::to_string)
    }

    fn call(
        &mut self,
        target: Value,
        method: &str,
        type_args: &[TypeRef],
        args: Vec<Value>,
    ) -> Result<Value, EvalError> {
        let receiver = match target {
            Value::Builder(builder) => return builder_call(builder, method, type_args, args),
            Value::Matcher(matcher) if method == "clone" && args.is_empty() => {
                return Ok(Value::Matcher(matcher));
            }
            other => other.into_live()?,
        };
        let args = args
            .into_iter()
            .map(Value::into_live)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(owner) = receiver.runtime_type().and_then(|ty| self.resolve(&ty, method)) {
            return Ok(Value::Live(self.host(&owner, method, Some(&receiver), &args)?));
        }
        let obj = receiver
            .as_object()
            .ok_or_else(|| EvalError::UnknownMethod(format!("{receiver}.{method}")))?;
        Ok(Value::Live(collection_call(obj, method, &args)?))
    }

    fn function(
        &mut self,
        function: &str,
        type_args: &[TypeRef],
        args: &[Expr],
    ) -> Result<Value, EvalError> {
        if function == "expect_throws" {
            let [body] = args else {
                return Err(EvalError::mismatch("one closure", args));
            };
            let Value::Closure(body) = self.eval(body)? else {
                return Err(EvalError::mismatch("closure", body));
            };
            return match self.eval(&body) {
                Err(EvalError::Thrown(thrown)) => Ok(Value::Live(thrown)),
                Err(other) => Err(other),
                Ok(_) => Err(EvalError::NothingThrown),
            };
        }

        let mut args = self.eval_all(args)?.into_iter();
        let mut next = || args.next().ok_or_else(|| EvalError::mismatch("argument", function));
        let type_arg = || type_args.first().cloned().unwrap_or_else(TypeRef::object);

        Ok(match function {
            "equal_to" => Value::Matcher(equal_to(next()?.into_live()?)),
            "null_value" => Value::Matcher(null_value()),
            "recursive" => Value::Matcher(recursive(type_arg())),
            "contains_in_order" => Value::Matcher(contains_in_order(next()?.into_matchers()?)),
            "contains_in_any_order" => {
                Value::Matcher(contains_in_any_order(next()?.into_matchers()?))
            }
            "array_containing" => Value::Matcher(array_containing(next()?.into_matchers()?)),
            "entry" => {
                let key = next()?.into_matcher()?;
                Value::Entry(entry(key, next()?.into_matcher()?))
            }
            "contains_entries" => {
                let entries = match next()? {
                    Value::Seq(items) => items
                        .into_iter()
                        .map(|item| match item {
                            Value::Entry(entry) => Ok(entry),
                            other => Err(EvalError::mismatch("entry", other)),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    other => return Err(EvalError::mismatch("entry sequence", other)),
                };
                Value::Matcher(contains_entries(entries))
            }
            "primitive_array_containing" => {
                let kind = type_arg()
                    .unboxed()
                    .ok_or_else(|| EvalError::mismatch("primitive type", type_args))?;
                let values = elements(&next()?.into_live()?)?
                    .iter()
                    .map(|value| {
                        value
                            .as_literal()
                            .ok_or_else(|| EvalError::mismatch("literal", value))
                    })
                    .collect::<Result<Vec<Literal>, _>>()?;
                Value::Matcher(primitive_array_containing(kind, values))
            }
            "generic_matcher" => Value::Builder(generic_matcher()),
            "assert_that" => {
                let actual = next()?.into_live()?;
                let matcher = next()?.into_matcher()?;
                assert_that(&actual, matcher.as_ref(), self.types)?;
                Value::Unit
            }
            "fake_input" => {
                let member = string_arg(next()?)?;
                let stub_args = elements(&next()?.into_live()?)?;
                let result = next()?.into_live()?;
                let owner = type_arg().erasure().to_string();
                self.interactions.stub(owner, member, stub_args, result);
                Value::Unit
            }
            "verify_call" => {
                let member = string_arg(next()?)?;
                let matchers = next()?.into_matchers()?;
                let owner = type_arg().erasure().to_string();
                self.verify_call(&owner, &member, &matchers)?;
                Value::Unit
            }
            other => match wrapper_class(other) {
                Some(class) => Value::Live(self.wrap(class, type_args, args.collect())?.into()),
                None => return Err(EvalError::UnknownMethod(other.to_string())),
            },
        })
    }

    fn verify_call(&self, owner: &str, member: &str, matchers: &[BoxMatcher]) -> Result<(), EvalError> {
        let found = self.interactions.calls.iter().any(|call| {
            call.owner == owner
                && call.member == member
                && call.args.len() == matchers.len()
                && call
                    .args
                    .iter()
                    .zip(matchers)
                    .all(|(arg, matcher)| matcher.matches(arg, self.types))
        });
        if found {
            Ok(())
        } else {
            Err(AssertionError {
                expected: format!("a call to {owner}::{member} with {} matching arguments", matchers.len()),
                actual: format!("{} recorded calls", self.interactions.calls.len()),
            }
            .into())
        }
    }

    /// Instance of a hidden wrapper class
    ///
    /// Singletons hold their argument; other wrappers copy the elements of
    /// their payload collection.
    fn wrap(&self, class: String, type_args: &[TypeRef], args: Vec<Value>) -> Result<ObjRef, EvalError> {
        let is_list = class.ends_with("List");
        let mut type_args = type_args.to_vec();
        let items = match args.into_iter().next() {
            None => Vec::new(),
            Some(value) if class.contains("Singleton") => vec![value.into_live()?],
            Some(value) => {
                let value = value.into_live()?;
                let payload = value
                    .as_object()
                    .ok_or_else(|| EvalError::mismatch("collection payload", &value))?;
                if type_args.is_empty() {
                    type_args = payload.class().type_args().to_vec();
                }
                match payload.body() {
                    ObjectBody::List(items) | ObjectBody::Set(items) => items,
                    _ => return Err(EvalError::mismatch("collection payload", payload.class())),
                }
            }
        };
        let ty = TypeRef::generic(class, type_args);
        Ok(if is_list {
            ObjRef::list(ty, items)
        } else {
            ObjRef::set(ty, items)
        })
    }
}

/// Hidden class produced by a wrapper factory such as `unmodifiable_list`
fn wrapper_class(function: &str) -> Option<String> {
    let (kind, suffix) = function.rsplit_once('_')?;
    let suffix = match suffix {
        "list" => "List",
        "set" => "Set",
        _ => return None,
    };
    well_known::WRAPPER_KINDS
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(kind))
        .map(|kind| format!("{}{kind}{suffix}", well_known::WRAPPER_PREFIX))
}

fn builder_call(
    builder: GenericMatcherBuilder,
    method: &str,
    type_args: &[TypeRef],
    args: Vec<Value>,
) -> Result<Value, EvalError> {
    let ty = || {
        type_args
            .first()
            .cloned()
            .ok_or_else(|| EvalError::mismatch("type argument", method))
    };
    match method {
        "field" => {
            let mut args = args.into_iter();
            let (Some(name), Some(expected)) = (args.next(), args.next()) else {
                return Err(EvalError::mismatch("field name and expectation", method));
            };
            let expected = match expected {
                Value::Matcher(matcher) => Expected::Matcher(matcher),
                other => Expected::Value(other.into_live()?),
            };
            Ok(Value::Builder(builder.field(string_arg(name)?, expected)))
        }
        "matching" => Ok(Value::Matcher(builder.matching(ty()?))),
        "matching_as" => Ok(Value::Matcher(builder.matching_as(ty()?))),
        other => Err(EvalError::UnknownMethod(format!("generic_matcher().{other}"))),
    }
}

fn collection_call(obj: &ObjRef, method: &str, args: &[LiveValue]) -> Result<LiveValue, EvalError> {
    match (method, args) {
        ("add", [value]) => Ok(LiveValue::Bool(obj.push(value.clone()))),
        ("put", [key, value]) => Ok(obj.put(key.clone(), value.clone()).unwrap_or(LiveValue::Null)),
        ("size", []) => Ok(LiveValue::Int(i32::try_from(obj.len()).unwrap_or(i32::MAX))),
        ("contains", [value]) => Ok(LiveValue::Bool(match &*obj.read() {
            ObjectBody::List(items) | ObjectBody::Set(items) | ObjectBody::Array(items) => {
                items.iter().any(|item| item.same(value))
            }
            _ => false,
        })),
        ("get", [key]) => match &*obj.read() {
            ObjectBody::Map(entries) => Ok(entries
                .iter()
                .find(|(k, _)| k.same(key))
                .map_or(LiveValue::Null, |(_, v)| v.clone())),
            ObjectBody::List(items) | ObjectBody::Array(items) => {
                let LiveValue::Int(index) = key else {
                    return Err(EvalError::mismatch("int index", key));
                };
                let index = usize::try_from(*index).map_err(|_| EvalError::mismatch("index", index))?;
                items.get(index).cloned().ok_or(EvalError::OutOfBounds {
                    index,
                    len: items.len(),
                })
            }
            _ => Err(EvalError::UnknownMethod(format!("{}.get", obj.class()))),
        },
        _ => Err(EvalError::UnknownMethod(format!("{}.{method}", obj.class()))),
    }
}

fn elements(value: &LiveValue) -> Result<Vec<LiveValue>, EvalError> {
    let obj = value
        .as_object()
        .ok_or_else(|| EvalError::mismatch("array", value))?;
    match obj.body() {
        ObjectBody::Array(items) | ObjectBody::List(items) | ObjectBody::Set(items) => Ok(items),
        _ => Err(EvalError::mismatch("array", obj.class())),
    }
}

fn string_arg(value: Value) -> Result<String, EvalError> {
    match value.into_live()? {
        LiveValue::Str(text) => Ok(text.to_string()),
        other => Err(EvalError::mismatch("string", other)),
    }
}

/// Numeric conversion of a scalar to `kind`
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn convert(value: &LiveValue, kind: Primitive) -> Result<LiveValue, EvalError> {
    let (integral, floating) = match value {
        LiveValue::Byte(v) => (i64::from(*v), f64::from(*v)),
        LiveValue::Short(v) => (i64::from(*v), f64::from(*v)),
        LiveValue::Int(v) => (i64::from(*v), f64::from(*v)),
        LiveValue::Long(v) => (*v, *v as f64),
        LiveValue::Char(v) => (i64::from(u32::from(*v)), f64::from(u32::from(*v))),
        LiveValue::Float(v) => (*v as i64, f64::from(*v)),
        LiveValue::Double(v) => (*v as i64, *v),
        LiveValue::Bool(_) if kind == Primitive::Bool => return Ok(value.clone()),
        other => return Err(EvalError::mismatch("number", other)),
    };
    Ok(match kind {
        Primitive::Byte => LiveValue::Byte(integral as i8),
        Primitive::Short => LiveValue::Short(integral as i16),
        Primitive::Int => LiveValue::Int(integral as i32),
        Primitive::Long => LiveValue::Long(integral),
        Primitive::Float => LiveValue::Float(floating as f32),
        Primitive::Double => LiveValue::Double(floating),
        Primitive::Char => u32::try_from(integral)
            .ok()
            .and_then(char::from_u32)
            .map(LiveValue::Char)
            .ok_or_else(|| EvalError::mismatch("char code", integral))?,
        Primitive::Bool => return Err(EvalError::mismatch("bool", value)),
    })
}
