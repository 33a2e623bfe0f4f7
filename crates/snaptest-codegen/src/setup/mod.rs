//! Reconstruction backend
//!
//! Turns IR nodes into statements that rebuild an equivalent live value:
//! - literals, nulls and enum constants inline as expressions
//! - composites bind a fresh local before their parts are rebuilt, so every
//!   identity is constructed once and cycles close over the local
//! - a cast is emitted only where the rebuilt type is not assignable to the
//!   declared type

mod collections;
mod reflective;

pub use collections::{
    ArrayAdaptor, EnumAdaptor, ListAdaptor, LiteralAdaptor, MapAdaptor, NullAdaptor, SetAdaptor,
    WrapperAdaptor,
};

use crate::code::{Expr, Stmt};
use crate::error::CodegenError;
use crate::registry::AdaptorRegistry;
use crate::scope::UnitScope;
use snaptest_values::{
    GraphError, Overridable, RegistryError, SerializedValue, TypeRef, TypeRegistry, ValueGraph,
    ValueId,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reconstruction strategy for a family of IR nodes
pub trait SetupAdaptor: Overridable + Send + Sync + fmt::Debug {
    /// Check if this adaptor rebuilds `value`
    fn accepts(&self, value: &SerializedValue, types: &TypeRegistry) -> bool;

    /// Emit statements for node `id` and return the expression yielding it
    ///
    /// # Errors
    /// Returns [`CodegenError`] if the node or one of its parts cannot be
    /// rebuilt.
    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError>;
}

/// Reconstruction adaptors in override order
pub type SetupAdaptors = AdaptorRegistry<dyn SetupAdaptor>;

/// Built-in reconstruction adaptors
#[must_use]
pub fn default_setup_adaptors() -> Vec<Arc<dyn SetupAdaptor>> {
    vec![
        Arc::new(LiteralAdaptor),
        Arc::new(NullAdaptor),
        Arc::new(EnumAdaptor),
        Arc::new(ArrayAdaptor),
        Arc::new(ListAdaptor),
        Arc::new(SetAdaptor),
        Arc::new(MapAdaptor),
        Arc::new(WrapperAdaptor::list()),
        Arc::new(WrapperAdaptor::set()),
    ]
}

impl AdaptorRegistry<dyn SetupAdaptor> {
    /// Defaults preceded by `additional`
    ///
    /// # Errors
    /// Returns [`RegistryError`] if the combined adaptors do not form a
    /// valid override chain.
    pub fn with_additional(additional: Vec<Arc<dyn SetupAdaptor>>) -> Result<Self, RegistryError> {
        Self::build(additional, default_setup_adaptors())
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

/// Expression for a rebuilt value plus the statements that precede it
#[derive(Debug, Clone, PartialEq)]
pub struct Computation {
    /// Expression yielding the value
    pub value: Expr,
    /// Type of the expression in generated code
    pub ty: TypeRef,
    /// Statements emitted for this value
    pub statements: Vec<Stmt>,
}

impl Computation {
    /// Check if the value lives in a local
    #[inline]
    #[must_use]
    pub fn is_stored(&self) -> bool {
        self.value.as_local().is_some()
    }
}

#[derive(Debug, Clone)]
struct Local {
    name: String,
    ty: TypeRef,
}

/// Reconstruction state of one unit
pub struct SetupGenerator<'a> {
    graph: &'a ValueGraph,
    types: &'a TypeRegistry,
    adaptors: &'a SetupAdaptors,
    scope: &'a mut UnitScope,
    statements: Vec<Stmt>,
    built: HashMap<ValueId, Local>,
}

impl fmt::Debug for SetupGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupGenerator")
            .field("built", &self.built.len())
            .field("pending_statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}

impl<'a> SetupGenerator<'a> {
    /// Create a generator over `graph`
    #[must_use]
    pub fn new(
        graph: &'a ValueGraph,
        types: &'a TypeRegistry,
        adaptors: &'a SetupAdaptors,
        scope: &'a mut UnitScope,
    ) -> Self {
        Self {
            graph,
            types,
            adaptors,
            scope,
            statements: Vec::new(),
            built: HashMap::new(),
        }
    }

    /// Graph being rebuilt
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

    /// Naming state of the unit
    #[inline]
    pub fn scope(&mut self) -> &mut UnitScope {
        self.scope
    }

    /// Node `id`
    ///
    /// # Errors
    /// Returns [`GraphError::MissingValue`] for unknown ids.
    pub fn node(&self, id: ValueId) -> Result<&'a SerializedValue, CodegenError> {
        Ok(self.graph.node(id)?)
    }

    /// Rebuild node `id`, returning its expression and statements
    ///
    /// # Errors
    /// Returns [`CodegenError`] if any reachable node cannot be rebuilt.
    pub fn build(&mut self, id: ValueId) -> Result<Computation, CodegenError> {
        let value = self.value(id)?;
        let ty = self.code_type(id)?;
        Ok(Computation {
            value,
            ty,
            statements: self.take_statements(),
        })
    }

    /// Expression for node `id`, rebuilding it on first use
    ///
    /// # Errors
    /// Returns [`CodegenError::ConfigurationGap`] if no adaptor accepts a
    /// node and the reflective fallback is disabled.
    pub fn value(&mut self, id: ValueId) -> Result<Expr, CodegenError> {
        if let Some(local) = self.built.get(&id) {
            return Ok(Expr::local(local.name.clone()));
        }
        let node = self.node(id)?;
        let types = self.types;
        if let Some(adaptor) = self.adaptors.select(|a| a.accepts(node, types)) {
            tracing::trace!(%id, adaptor = adaptor.name(), "reconstructing value");
            return adaptor.render(id, self);
        }
        if self.adaptors.reflective_fallback() && matches!(node, SerializedValue::Object(_)) {
            return reflective::render(id, self);
        }
        Err(CodegenError::configuration_gap(self.graph, id))
    }

    /// Expression for node `id` stored where `declared` is expected
    ///
    /// # Errors
    /// See [`Self::value`].
    pub fn value_as(&mut self, id: ValueId, declared: &TypeRef) -> Result<Expr, CodegenError> {
        let value = self.value(id)?;
        if value == Expr::Null {
            return Ok(value);
        }
        let ty = self.code_type(id)?;
        if self.types.is_assignable(&ty, declared) {
            Ok(value)
        } else {
            Ok(Expr::Cast {
                expr: Box::new(value),
                ty: declared.clone(),
            })
        }
    }

    /// Type of the expression produced for node `id`
    ///
    /// # Errors
    /// Returns [`GraphError::MissingValue`] for unknown ids.
    pub fn code_type(&self, id: ValueId) -> Result<TypeRef, CodegenError> {
        if let Some(local) = self.built.get(&id) {
            return Ok(local.ty.clone());
        }
        Ok(match self.node(id)? {
            SerializedValue::Enum(constant) => constant.runtime.erasure(),
            other => other.runtime_type().clone(),
        })
    }

    /// Bind `init` to a fresh local standing for node `id`
    ///
    /// Later requests for `id` reuse the local, including those made while
    /// the node's own parts are being rebuilt.
    pub fn allocate(&mut self, id: ValueId, ty: TypeRef, init: Expr) -> String {
        let name = self.bind(ty.clone(), init);
        self.built.insert(
            id,
            Local {
                name: name.clone(),
                ty,
            },
        );
        name
    }

    /// Rebuild node `id` with the adaptor registered as `adaptor`, as a
    /// plain value that does not stand for the node's identity
    ///
    /// Specializing adaptors use this to build what they wrap.
    ///
    /// # Errors
    /// Returns [`CodegenError::ConfigurationGap`] if no adaptor has that
    /// name, otherwise whatever the adaptor returns.
    pub fn render_with(&mut self, name: &str, id: ValueId) -> Result<Expr, CodegenError> {
        let Some(adaptor) = self.adaptors.get(name) else {
            tracing::error!(%id, adaptor = name, "delegate adaptor is not registered");
            return Err(CodegenError::configuration_gap(self.graph, id));
        };
        let value = adaptor.render(id, self)?;
        self.built.remove(&id);
        Ok(value)
    }

    /// Bind `init` to a fresh local without recording an identity
    pub fn bind(&mut self, ty: TypeRef, init: Expr) -> String {
        let name = self.scope.names.for_type(&ty);
        self.statements.push(Stmt::Let {
            name: name.clone(),
            ty,
            value: init,
        });
        name
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

    /// Emit `local.method(part)` for every node in `parts`
    ///
    /// # Errors
    /// See [`Self::value`].
    pub fn fill(
        &mut self,
        local: &str,
        method: &str,
        parts: &[ValueId],
        declared: &TypeRef,
    ) -> Result<(), CodegenError> {
        for part in parts {
            let value = self.value_as(*part, declared)?;
            self.push(Stmt::Expr(Expr::call(Expr::local(local), method, vec![value])));
        }
        Ok(())
    }
}

pub(crate) fn unexpected(id: ValueId, expected: &'static str, actual: &SerializedValue) -> CodegenError {
    GraphError::unexpected(id, expected, actual.kind()).into()
}
