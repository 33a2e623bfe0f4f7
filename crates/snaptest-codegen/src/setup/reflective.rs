//! Reflective fallback: any plain object as `Type::new()` plus field stores

use super::{unexpected, SetupGenerator};
use crate::code::{Expr, Stmt};
use crate::error::CodegenError;
use snaptest_values::{ClassKind, Literal, SerializedField, SerializedValue, ValueGraph, ValueId};

/// Declared-field values a fresh instance already holds
fn holds_default(graph: &ValueGraph, field: &SerializedField) -> bool {
    match graph.get(field.value) {
        Some(SerializedValue::Null(_)) => true,
        Some(SerializedValue::Literal(literal)) => match field.ty.unboxed() {
            Some(kind) if field.ty.is_primitive() => *literal.value() == Literal::zero(kind),
            _ => false,
        },
        _ => false,
    }
}

pub(super) fn render(id: ValueId, generator: &mut SetupGenerator<'_>) -> Result<Expr, CodegenError> {
    let object = match generator.node(id)? {
        SerializedValue::Object(object) => object,
        other => return Err(unexpected(id, "object", other)),
    };
    let types = generator.types();
    let constructible = object.runtime.raw_name().is_some_and(|name| {
        !types.is_hidden(name)
            && types
                .get(name)
                .map_or(true, |def| def.kind == ClassKind::Class)
    });
    if !constructible {
        return Err(CodegenError::Unconstructible {
            ty: object.runtime.clone(),
        });
    }

    let name = generator.allocate(
        id,
        object.runtime.clone(),
        Expr::New {
            ty: object.runtime.clone(),
            args: Vec::new(),
        },
    );
    let graph = generator.graph();
    let declared: Vec<&str> = object
        .runtime
        .raw_name()
        .map(|name| types.all_fields(name).into_iter().map(|(_, f)| f.name.as_str()).collect())
        .unwrap_or_default();
    let fresh = |field: &SerializedField| {
        declared.contains(&field.name.as_str()) && holds_default(graph, field)
    };
    for field in object.fields.iter().filter(|f| !fresh(f)) {
        let value = generator.value_as(field.value, &field.ty)?;
        generator.push(Stmt::Assign {
            target: Expr::field(Expr::local(name.clone()), field.name.clone()),
            value,
        });
    }
    Ok(Expr::local(name))
}
