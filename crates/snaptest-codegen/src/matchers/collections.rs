//! Built-in verification adaptors

use super::{MatcherAdaptor, MatcherGenerator};
use crate::code::Expr;
use crate::error::CodegenError;
use crate::setup::unexpected;
use snaptest_values::{Overridable, SerializedValue, TypeRef, TypeRegistry, ValueId};

/// `equal_to(literal)`
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralMatcherAdaptor;

impl Overridable for LiteralMatcherAdaptor {
    fn name(&self) -> &str {
        "literal"
    }
}

impl MatcherAdaptor for LiteralMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Literal(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        match generator.node(id)? {
            SerializedValue::Literal(literal) => {
                let value = Expr::Literal(literal.value().clone());
                Ok(generator.matcher_call("equal_to", Vec::new(), vec![value]))
            }
            other => Err(unexpected(id, "literal", other)),
        }
    }
}

/// `null_value()`
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMatcherAdaptor;

impl Overridable for NullMatcherAdaptor {
    fn name(&self) -> &str {
        "null"
    }
}

impl MatcherAdaptor for NullMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Null(_))
    }

    fn render(&self, _id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        Ok(generator.matcher_call("null_value", Vec::new(), Vec::new()))
    }
}

/// `equal_to(Type::CONSTANT)`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumMatcherAdaptor;

impl Overridable for EnumMatcherAdaptor {
    fn name(&self) -> &str {
        "enum"
    }
}

impl MatcherAdaptor for EnumMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Enum(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        match generator.node(id)? {
            SerializedValue::Enum(constant) => {
                let value = Expr::EnumConstant {
                    ty: constant.runtime.erasure(),
                    name: constant.name.clone(),
                };
                Ok(generator.matcher_call("equal_to", Vec::new(), vec![value]))
            }
            other => Err(unexpected(id, "enum", other)),
        }
    }
}

/// `array_containing(vec![..])` with one matcher per element
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayMatcherAdaptor;

impl Overridable for ArrayMatcherAdaptor {
    fn name(&self) -> &str {
        "array"
    }
}

impl MatcherAdaptor for ArrayMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Array(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        let array = match generator.node(id)? {
            SerializedValue::Array(array) => array,
            other => return Err(unexpected(id, "array", other)),
        };
        let elements = generator.matchers(&array.elements)?;
        Ok(generator.matcher_call("array_containing", Vec::new(), vec![matcher_vec(elements)]))
    }
}

/// Arrays of a primitive component compared by value:
/// `primitive_array_containing::<int>(vec![1, 2])`
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimitiveArrayMatcherAdaptor;

impl Overridable for PrimitiveArrayMatcherAdaptor {
    fn name(&self) -> &str {
        "primitive-array"
    }

    fn parent(&self) -> Option<&str> {
        Some("array")
    }
}

impl MatcherAdaptor for PrimitiveArrayMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Array(array) if array.component_type().is_primitive())
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        let array = match generator.node(id)? {
            SerializedValue::Array(array) => array,
            other => return Err(unexpected(id, "array", other)),
        };
        let graph = generator.graph();
        let mut values = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            match graph.node(*element)? {
                SerializedValue::Literal(literal) => values.push(Expr::Literal(literal.value().clone())),
                other => return Err(unexpected(*element, "literal", other)),
            }
        }
        let component = array.component_type();
        Ok(generator.matcher_call(
            "primitive_array_containing",
            vec![component.clone()],
            vec![Expr::NewArray {
                component,
                elements: values,
            }],
        ))
    }
}

/// `contains_in_order(vec![..])`
#[derive(Debug, Clone, Copy, Default)]
pub struct ListMatcherAdaptor;

impl Overridable for ListMatcherAdaptor {
    fn name(&self) -> &str {
        "list"
    }
}

impl MatcherAdaptor for ListMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::List(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        let list = match generator.node(id)? {
            SerializedValue::List(list) => list,
            other => return Err(unexpected(id, "list", other)),
        };
        let elements = generator.matchers(&list.elements)?;
        Ok(generator.matcher_call("contains_in_order", Vec::new(), vec![matcher_vec(elements)]))
    }
}

/// `contains_in_any_order(vec![..])`
#[derive(Debug, Clone, Copy, Default)]
pub struct SetMatcherAdaptor;

impl Overridable for SetMatcherAdaptor {
    fn name(&self) -> &str {
        "set"
    }
}

impl MatcherAdaptor for SetMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Set(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        let set = match generator.node(id)? {
            SerializedValue::Set(set) => set,
            other => return Err(unexpected(id, "set", other)),
        };
        let elements = generator.matchers(&set.elements)?;
        Ok(generator.matcher_call("contains_in_any_order", Vec::new(), vec![matcher_vec(elements)]))
    }
}

/// `contains_entries(vec![entry(k, v), ..])`
#[derive(Debug, Clone, Copy, Default)]
pub struct MapMatcherAdaptor;

impl Overridable for MapMatcherAdaptor {
    fn name(&self) -> &str {
        "map"
    }
}

impl MatcherAdaptor for MapMatcherAdaptor {
    fn accepts(&self, value: &SerializedValue, _types: &TypeRegistry) -> bool {
        matches!(value, SerializedValue::Map(_))
    }

    fn render(&self, id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
        let map = match generator.node(id)? {
            SerializedValue::Map(map) => map,
            other => return Err(unexpected(id, "map", other)),
        };
        let mut entries = Vec::with_capacity(map.entries.len());
        for (key, value) in &map.entries {
            let key = generator.matcher(*key)?;
            let value = generator.matcher(*value)?;
            entries.push(generator.matcher_call("entry", Vec::new(), vec![key, value]));
        }
        let entries = Expr::NewArray {
            component: TypeRef::class("snaptest_matching::matchers::EntryMatcher"),
            elements: entries,
        };
        Ok(generator.matcher_call("contains_entries", Vec::new(), vec![entries]))
    }
}

fn matcher_vec(elements: Vec<Expr>) -> Expr {
    Expr::NewArray {
        component: TypeRef::class(super::BOX_MATCHER),
        elements,
    }
}
