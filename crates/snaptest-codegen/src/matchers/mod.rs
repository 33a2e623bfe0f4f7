//! Verification backend
//!
//! Turns IR nodes into matcher expressions checked with `assert_that`.
//! Literals become equality checks, composites become structural matchers
//! built element-wise through the same dispatch. A node referenced more
//! than once under one asserted root is hoisted into a matcher local; a
//! reference back to a node still being described becomes an instance-of
//! check.

mod collections;
mod reflective;

pub use collections::{
    ArrayMatcherAdaptor, EnumMatcherAdaptor, ListMatcherAdaptor, LiteralMatcherAdaptor,
    MapMatcherAdaptor, NullMatcherAdaptor, PrimitiveArrayMatcherAdaptor, SetMatcherAdaptor,
};

use crate::code::{Expr, Stmt};
use crate::error::CodegenError;
use crate::registry::AdaptorRegistry;
use crate::scope::{prefix_for, UnitScope};
use snaptest_values::{
    Overridable, RegistryError, SerializedValue, TypeRef, TypeRegistry, ValueGraph, ValueId,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Module path of the runtime matcher functions
pub const MATCHERS_PATH: &str = "snaptest_matching::matchers";

/// Type of hoisted matcher locals
pub const BOX_MATCHER: &str = "snaptest_matching::BoxMatcher";

/// Verification strategy for a family of IR nodes
pub trait MatcherAdaptor: Overridable + Send + Sync + fmt::Debug {
    /// Check if this adaptor describes `value`
    fn accepts(&self, value: &SerializedValue, types: &TypeRegistry) -> bool;

    /// Matcher expression for node `id`
    ///
    /// # Errors
    /// Returns [`CodegenError`] if the node or one of its parts cannot be
    /// described.
    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError>;
}

/// Verification adaptors in override order
pub type MatcherAdaptors = AdaptorRegistry<dyn MatcherAdaptor>;

/// Built-in verification adaptors
#[must_use]
pub fn default_matcher_adaptors() -> Vec<Arc<dyn MatcherAdaptor>> {
    vec![
        Arc::new(LiteralMatcherAdaptor),
        Arc::new(NullMatcherAdaptor),
        Arc::new(EnumMatcherAdaptor),
        Arc::new(ArrayMatcherAdaptor),
        Arc::new(PrimitiveArrayMatcherAdaptor),
        Arc::new(ListMatcherAdaptor),
        Arc::new(SetMatcherAdaptor),
        Arc::new(MapMatcherAdaptor),
    ]
}

impl AdaptorRegistry<dyn MatcherAdaptor> {
    /// Defaults preceded by `additional`
    ///
    /// # Errors
    /// Returns [`RegistryError`] if the combined adaptors do not form a
    /// valid override chain.
    pub fn with_additional(additional: Vec<Arc<dyn MatcherAdaptor>>) -> Result<Self, RegistryError> {
        Self::build(additional, default_matcher_adaptors())
    }

    /// Built-in adaptors only
    ///
    /// # Errors
    /// Never fails for the built-in set; the signature mirrors
    /// [`Self::with_additional`].
    pub fn standard() -> Result<Self, RegistryError> {
        Self::with_additional(Vec::new())
    }
}

/// Verification state of one unit
pub struct MatcherGenerator<'a> {
    graph: &'a ValueGraph,
    types: &'a TypeRegistry,
    adaptors: &'a MatcherAdaptors,
    scope: &'a mut UnitScope,
    statements: Vec<Stmt>,
    active: HashSet<ValueId>,
    shared: HashSet<ValueId>,
    hoisted: HashMap<ValueId, String>,
}

impl fmt::Debug for MatcherGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherGenerator")
            .field("hoisted", &self.hoisted.len())
            .field("pending_statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}

impl<'a> MatcherGenerator<'a> {
    /// Create a generator over `graph`
    #[must_use]
    pub fn new(
        graph: &'a ValueGraph,
        types: &'a TypeRegistry,
        adaptors: &'a MatcherAdaptors,
        scope: &'a mut UnitScope,
    ) -> Self {
        Self {
            graph,
            types,
            adaptors,
            scope,
            statements: Vec::new(),
            active: HashSet::new(),
            shared: HashSet::new(),
            hoisted: HashMap::new(),
        }
    }

    /// Graph being described
    #[inline]
    #[must_use]
    pub fn graph(&self) -> &'a ValueGraph {
        self.graph
    }

    /// Class table
    #[inline]
    #[must_use]
    pub fn types(&self) -> &'a TypeRegistry {
        self.types
    }

    /// Node `id`
    ///
    /// # Errors
    /// Returns [`CodegenError::Graph`] for unknown ids.
    pub fn node(&self, id: ValueId) -> Result<&'a SerializedValue, CodegenError> {
        Ok(self.graph.node(id)?)
    }

    /// Call of a runtime matcher function, registering its import
    pub fn matcher_call(&mut self, function: &str, type_args: Vec<TypeRef>, args: Vec<Expr>) -> Expr {
        self.static_import(format!("{MATCHERS_PATH}::{function}"));
        Expr::generic_function(function, type_args, args)
    }

    /// Register a function import for the unit
    pub fn static_import(&mut self, path: impl Into<String>) {
        self.scope.types.add_static_import(path);
    }

    /// Matchers for each node of `parts`
    ///
    /// # Errors
    /// See [`Self::matcher`].
    pub fn matchers(&mut self, parts: &[ValueId]) -> Result<Vec<Expr>, CodegenError> {
        parts.iter().map(|part| self.matcher(*part)).collect()
    }

    /// Matcher for the asserted root `id`, hoisting composites it shares
    ///
    /// # Errors
    /// See [`Self::matcher`].
    pub fn describe(&mut self, id: ValueId) -> Result<Expr, CodegenError> {
        let graph = self.graph;
        self.shared = graph
            .reference_counts(id)
            .into_iter()
            .filter(|(node, count)| {
                *count > 1 && graph.get(*node).is_some_and(SerializedValue::is_reference)
            })
            .map(|(node, _)| node)
            .collect();
        self.matcher(id)
    }

    /// Emit `assert_that(actual, <matcher for id>)`
    ///
    /// # Errors
    /// See [`Self::matcher`].
    pub fn assert_value(&mut self, id: ValueId, actual: Expr) -> Result<(), CodegenError> {
        let matcher = self.describe(id)?;
        self.static_import("snaptest_matching::assert_that");
        self.statements.push(Stmt::Expr(Expr::function(
            "assert_that",
            vec![actual, matcher],
        )));
        Ok(())
    }

    /// Matcher expression for node `id`
    ///
    /// # Errors
    /// Returns [`CodegenError::ConfigurationGap`] if no adaptor accepts a
    /// node and the reflective fallback is disabled.
    pub fn matcher(&mut self, id: ValueId) -> Result<Expr, CodegenError> {
        if let Some(name) = self.hoisted.get(&id) {
            return Ok(hoisted_use(name));
        }
        let node = self.node(id)?;
        if self.active.contains(&id) {
            let ty = self.types.public_supertype(node.runtime_type());
            return Ok(self.matcher_call("recursive", vec![ty], Vec::new()));
        }

        self.active.insert(id);
        let rendered = self.dispatch(id, node);
        self.active.remove(&id);
        let expr = rendered?;

        if !self.shared.contains(&id) {
            return Ok(expr);
        }
        let prefix = format!("{}_matcher", prefix_for(&node.runtime_type().erasure()));
        let name = self.scope.names.fresh(&prefix);
        self.statements.push(Stmt::Let {
            name: name.clone(),
            ty: TypeRef::class(BOX_MATCHER),
            value: expr,
        });
        let use_site = hoisted_use(&name);
        self.hoisted.insert(id, name);
        Ok(use_site)
    }

    fn dispatch(&mut self, id: ValueId, node: &SerializedValue) -> Result<Expr, CodegenError> {
        let types = self.types;
        if let Some(adaptor) = self.adaptors.select(|a| a.accepts(node, types)) {
            tracing::trace!(%id, adaptor = adaptor.name(), "describing value");
            return adaptor.render(id, self);
        }
        if self.adaptors.reflective_fallback() && matches!(node, SerializedValue::Object(_)) {
            return reflective::render(id, self);
        }
        Err(CodegenError::configuration_gap(self.graph, id))
    }

    /// Append a statement
    #[inline]
    pub fn push(&mut self, stmt: Stmt) {
        self.statements.push(stmt);
    }

    /// Drain statements emitted so far
    pub fn take_statements(&mut self) -> Vec<Stmt> {
        std::mem::take(&mut self.statements)
    }
}

/// Hoisted matchers are shared by cloning, never moved
fn hoisted_use(name: &str) -> Expr {
    Expr::call(Expr::local(name), "clone", Vec::new())
}
