//! Reflective fallback: field-by-field generic matcher

use super::MatcherGenerator;
use crate::code::Expr;
use crate::error::CodegenError;
use crate::setup::unexpected;
use snaptest_values::{Literal, SerializedValue, ValueId};

pub(super) fn render(id: ValueId, generator: &mut MatcherGenerator<'_>) -> Result<Expr, CodegenError> {
    let object = match generator.node(id)? {
        SerializedValue::Object(object) => object,
        other => return Err(unexpected(id, "object", other)),
    };

    generator.static_import("snaptest_matching::generic_matcher");
    let mut matcher = Expr::function("generic_matcher", Vec::new());
    for field in &object.fields {
        let expected = match generator.node(field.value)? {
            SerializedValue::Literal(literal) => Expr::Literal(literal.value().clone()),
            _ => generator.matcher(field.value)?,
        };
        matcher = Expr::call(
            matcher,
            "field",
            vec![Expr::Literal(Literal::from(field.name.as_str())), expected],
        );
    }

    let types = generator.types();
    let hidden = object
        .runtime
        .raw_name()
        .is_some_and(|name| types.is_hidden(name));
    let (method, ty) = if hidden {
        ("matching_as", types.public_supertype(&object.runtime))
    } else {
        ("matching", object.runtime.erasure())
    };
    Ok(Expr::Call {
        target: Box::new(matcher),
        method: method.to_string(),
        type_args: vec![ty],
        args: Vec::new(),
    })
}
