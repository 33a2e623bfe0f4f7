//! Built-in reconstruction adaptors

use super::{unexpected, SetupAdaptor, SetupGenerator};
use crate::code::{Expr, Stmt};
use crate::error::CodegenError;
use snaptest_values::{
    well_known, Literal, Overridable, SerializedValue, TypeRef, TypeRegistry, ValueId,
};

/// Inline literal
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralAdaptor;

impl Overridable for LiteralAdaptor {
    fn name(&self) -> &str {
        "literal"
    }
}

impl SetupAdaptor for LiteralAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Literal(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        match generator.node(id)? {
            SerializedValue::Literal(literal) => Ok(Expr::Literal(literal.value().clone())),
            other => Err(unexpected(id, "literal", other)),
        }
    }
}

/// Inline null
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdaptor;

impl Overridable for NullAdaptor {
    fn name(&self) -> &str {
        "null"
    }
}

impl SetupAdaptor for NullAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Null(_))
    }

    fn render(&self, _id: ValueId, _generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        Ok(Expr::Null)
    }
}

/// Enum constant reference
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumAdaptor;

impl Overridable for EnumAdaptor {
    fn name(&self) -> &str {
        "enum"
    }
}

impl SetupAdaptor for EnumAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Enum(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        match generator.node(id)? {
            SerializedValue::Enum(constant) => Ok(Expr::EnumConstant {
                ty: constant.runtime.erasure(),
                name: constant.name.clone(),
            }),
            other => Err(unexpected(id, "enum", other)),
        }
    }
}

/// Array literal, or allocation plus element stores when an element
/// leads back to the array
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayAdaptor;

impl Overridable for ArrayAdaptor {
    fn name(&self) -> &str {
        "array"
    }
}

fn default_element(component: &TypeRef) -> Expr {
    match component {
        TypeRef::Primitive(kind) => Expr::Literal(Literal::zero(*kind)),
        _ => Expr::Null,
    }
}

impl SetupAdaptor for ArrayAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Array(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        let array = match generator.node(id)? {
            SerializedValue::Array(array) => array,
            other => return Err(unexpected(id, "array", other)),
        };
        let component = array.component_type();
        let graph = generator.graph();
        let cyclic = array
            .elements
            .iter()
            .any(|element| graph.reachable(*element).contains(&id));

        if !cyclic {
            let elements = array
                .elements
                .iter()
                .map(|element| generator.value_as(*element, &component))
                .collect::<Result<Vec<_>, _>>()?;
            let name = generator.allocate(
                id,
                array.runtime.clone(),
                Expr::NewArray {
                    component,
                    elements,
                },
            );
            return Ok(Expr::local(name));
        }

        let name = generator.allocate(
            id,
            array.runtime.clone(),
            Expr::NewArray {
                component: component.clone(),
                elements: vec![default_element(&component); array.elements.len()],
            },
        );
        for (index, element) in array.elements.iter().enumerate() {
            let value = generator.value_as(*element, &component)?;
            generator.push(Stmt::Assign {
                target: Expr::Index {
                    target: Box::new(Expr::local(name.clone())),
                    index,
                },
                value,
            });
        }
        Ok(Expr::local(name))
    }
}

/// Ordered collection: empty instance of the implementation type, then `add`
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAdaptor;

impl Overridable for ListAdaptor {
    fn name(&self) -> &str {
        "list"
    }
}

impl SetupAdaptor for ListAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::List(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        let list = match generator.node(id)? {
            SerializedValue::List(list) => list,
            other => return Err(unexpected(id, "list", other)),
        };
        let ty = generator.types().default_implementation(&list.runtime);
        let name = generator.allocate(id, ty.clone(), Expr::New { ty, args: Vec::new() });
        generator.fill(&name, "add", &list.elements, &list.component_type())?;
        Ok(Expr::local(name))
    }
}

/// Set: empty instance of the implementation type, then `add` in capture order
#[derive(Debug, Clone, Copy, Default)]
pub struct SetAdaptor;

impl Overridable for SetAdaptor {
    fn name(&self) -> &str {
        "set"
    }
}

impl SetupAdaptor for SetAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Set(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        let set = match generator.node(id)? {
            SerializedValue::Set(set) => set,
            other => return Err(unexpected(id, "set", other)),
        };
        let ty = generator.types().default_implementation(&set.runtime);
        let name = generator.allocate(id, ty.clone(), Expr::New { ty, args: Vec::new() });
        generator.fill(&name, "add", &set.elements, &set.component_type())?;
        Ok(Expr::local(name))
    }
}

/// Keyed collection: empty instance, then `put` in capture order
#[derive(Debug, Clone, Copy, Default)]
pub struct MapAdaptor;

impl Overridable for MapAdaptor {
    fn name(&self) -> &str {
        "map"
    }
}

impl SetupAdaptor for MapAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Map(_))
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        let map = match generator.node(id)? {
            SerializedValue::Map(map) => map,
            other => return Err(unexpected(id, "map", other)),
        };
        let ty = generator.types().default_implementation(&map.runtime);
        let name = generator.allocate(id, ty.clone(), Expr::New { ty, args: Vec::new() });
        let (key_type, value_type) = (map.key_type(), map.value_type());
        for (key, value) in &map.entries {
            let key = generator.value_as(*key, &key_type)?;
            let value = generator.value_as(*value, &value_type)?;
            generator.push(Stmt::Expr(Expr::call(
                Expr::local(name.clone()),
                "put",
                vec![key, value],
            )));
        }
        Ok(Expr::local(name))
    }
}

/// Hidden wrapper collections rebuilt through their factory functions
///
/// `collections::{Kind}List` and `collections::{Kind}Set` specialize the
/// plain list and set adaptors. Wrapping kinds build their payload as a
/// plain collection first.
#[derive(Debug, Clone)]
pub struct WrapperAdaptor {
    name: &'static str,
    parent: &'static str,
    suffix: &'static str,
}

impl WrapperAdaptor {
    /// Adaptor for `collections::*List`
    #[must_use]
    pub fn list() -> Self {
        Self {
            name: "collections-list",
            parent: "list",
            suffix: "List",
        }
    }

    /// Adaptor for `collections::*Set`
    #[must_use]
    pub fn set() -> Self {
        Self {
            name: "collections-set",
            parent: "set",
            suffix: "Set",
        }
    }

    fn kind<'v>(&self, value: &'v SerializedValue) -> Option<&'v str> {
        value
            .runtime_type()
            .raw_name()?
            .strip_prefix(well_known::WRAPPER_PREFIX)?
            .strip_suffix(self.suffix)
    }

    fn factory(&self, kind: &str) -> String {
        format!("{}_{}", kind.to_ascii_lowercase(), self.suffix.to_ascii_lowercase())
    }
}

impl Overridable for WrapperAdaptor {
    fn name(&self) -> &str {
        self.name
    }

    fn parent(&self) -> Option<&str> {
        Some(self.parent)
    }
}

impl SetupAdaptor for WrapperAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::List(_) | SerializedValue::Set(_))
            && self.kind(value).is_some()
    }

    fn render(&self, id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
        let node = generator.node(id)?;
        let (runtime, elements, element_type) = match node {
            SerializedValue::List(list) => (&list.runtime, &list.elements, list.component_type()),
            SerializedValue::Set(set) => (&set.runtime, &set.elements, set.component_type()),
            other => return Err(unexpected(id, "wrapper collection", other)),
        };
        let kind = self
            .kind(node)
            .ok_or_else(|| CodegenError::unknown_wrapper(generator.graph(), id))?;
        let graph = generator.graph();
        if elements.iter().any(|element| graph.reachable(*element).contains(&id)) {
            tracing::warn!(%id, kind, "wrapper collection contains itself");
            return Err(CodegenError::Unconstructible { ty: runtime.clone() });
        }
        let factory = self.factory(kind);

        let init = match (kind, elements.as_slice()) {
            ("Empty", []) => Expr::generic_function(factory.clone(), vec![element_type], Vec::new()),
            ("Singleton", [element]) => {
                let element = generator.value_as(*element, &element_type)?;
                Expr::function(factory.clone(), vec![element])
            }
            ("Unmodifiable" | "Synchronized" | "Checked", _) => {
                let payload = generator.render_with(self.parent, id)?;
                let type_args = if kind == "Checked" { vec![element_type] } else { Vec::new() };
                Expr::generic_function(factory.clone(), type_args, vec![payload])
            }
            _ => {
                tracing::warn!(%id, kind, "wrapper collection without known construction");
                return Err(CodegenError::unknown_wrapper(generator.graph(), id));
            }
        };

        generator
            .scope()
            .types
            .add_static_import(format!("{}{factory}", well_known::WRAPPER_PREFIX));
        let public = generator.types().public_supertype(runtime);
        let name = generator.allocate(id, public, init);
        Ok(Expr::local(name))
    }
}
