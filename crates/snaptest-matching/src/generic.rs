//! Reflective structural matcher
//!
//! A [`GenericMatcher`] checks a live object's type and a list of expected
//! fields. Expected values go through the deep-equality engine, nested
//! matchers are delegated to. Two flavours exist:
//! - strict ([`GenericMatcherBuilder::matching`]): the runtime type must be
//!   exactly the expected type
//! - upcast ([`GenericMatcherBuilder::matching_as`]): the runtime type must be
//!   assignable to the expected type

use crate::description::{Description, DESCRIPTION_FAILED};
use crate::equality::{DeepEquality, Worklist};
use crate::matcher::{BoxMatcher, Matcher};
use crate::structure::LiveStructure;
use snaptest_values::{live_slots, LiveValue, ObjRef, Slots, TypeRef, TypeRegistry};
use std::sync::Arc;

/// Expected content of one field
#[derive(Debug, Clone)]
pub enum Expected {
    /// Deeply equal to a value
    Value(LiveValue),
    /// Accepted by a nested matcher
    Matcher(BoxMatcher),
}

impl From<LiveValue> for Expected {
    fn from(value: LiveValue) -> Self {
        Self::Value(value)
    }
}

impl From<BoxMatcher> for Expected {
    fn from(matcher: BoxMatcher) -> Self {
        Self::Matcher(matcher)
    }
}

impl From<i32> for Expected {
    fn from(value: i32) -> Self {
        Self::Value(LiveValue::Int(value))
    }
}

impl From<&str> for Expected {
    fn from(value: &str) -> Self {
        Self::Value(LiveValue::str(value))
    }
}

/// Start a [`GenericMatcher`]
#[inline]
#[must_use]
pub fn generic_matcher() -> GenericMatcherBuilder {
    GenericMatcherBuilder::default()
}

/// Collects expected fields before the type check is chosen
#[derive(Debug, Clone, Default)]
pub struct GenericMatcherBuilder {
    fields: Vec<(String, Expected)>,
}

impl GenericMatcherBuilder {
    /// Expect field `name`
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, expected: impl Into<Expected>) -> Self {
        self.fields.push((name.into(), expected.into()));
        self
    }

    /// Require exactly runtime type `ty`
    #[must_use]
    pub fn matching(self, ty: TypeRef) -> BoxMatcher {
        Arc::new(self.build(ty, true))
    }

    /// Require a runtime type assignable to `ty`
    #[must_use]
    pub fn matching_as(self, ty: TypeRef) -> BoxMatcher {
        Arc::new(self.build(ty, false))
    }

    /// Finish without erasing the matcher type
    #[must_use]
    pub fn build(self, ty: TypeRef, strict: bool) -> GenericMatcher {
        GenericMatcher {
            ty,
            strict,
            fields: self.fields,
        }
    }
}

/// Matcher comparing type and fields of a plain object
#[derive(Debug, Clone)]
pub struct GenericMatcher {
    ty: TypeRef,
    strict: bool,
    fields: Vec<(String, Expected)>,
}

impl GenericMatcher {
    /// Expected type
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Check for the exact-type flavour
    #[inline]
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    fn accepts_type(&self, obj: &ObjRef, types: &TypeRegistry) -> bool {
        if self.strict {
            obj.class().erasure() == self.ty.erasure()
        } else {
            types.is_assignable(obj.class(), &self.ty)
        }
    }
}

fn field_value<'a>(slots: &'a Slots<LiveValue>, name: &str) -> Option<&'a LiveValue> {
    slots
        .entries
        .iter()
        .find(|(slot, _)| slot.field_name() == Some(name))
        .map(|(_, value)| value)
}

impl Matcher for GenericMatcher {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        let Some(obj) = item.as_object() else {
            return false;
        };
        if !self.accepts_type(obj, types) {
            return false;
        }
        let Some(slots) = live_slots(obj, types) else {
            return false;
        };

        let view = LiveStructure::new(types);
        let engine = DeepEquality::new(&view, &view);
        let mut work = Worklist::new();
        for (name, expected) in &self.fields {
            let Some(actual) = field_value(&slots, name) else {
                return false;
            };
            let accepted = match expected {
                Expected::Value(value) => engine.pair(value.clone(), actual.clone(), &mut work),
                Expected::Matcher(matcher) => matcher.matches(actual, types),
            };
            if !accepted {
                return false;
            }
        }
        engine.drain(&mut work)
    }

    fn describe_to(&self, description: &mut Description) {
        description
            .text(if self.strict { "of type " } else { "assignable to " })
            .text(&self.ty.to_string())
            .text(" with fields ");
        description.list("{", ", ", "}", &self.fields, |d, (name, expected)| {
            d.text(name).text(": ");
            match expected {
                Expected::Value(value) => {
                    d.value(value);
                }
                Expected::Matcher(matcher) => matcher.describe_to(d),
            }
        });
    }

    fn describe_mismatch(
        &self,
        item: &LiveValue,
        types: &TypeRegistry,
        description: &mut Description,
    ) {
        let Some(obj) = item.as_object() else {
            description.text("was ").value(item);
            return;
        };
        let Some(slots) = live_slots(obj, types) else {
            description.text(DESCRIPTION_FAILED);
            return;
        };
        description
            .text("of type : ")
            .text(&obj.class().to_string())
            .text("\nwith fields:");
        for (slot, value) in &slots.entries {
            description.text("\n\t").text(&slot.to_string()).text(": ");
            match value.as_object() {
                Some(nested) if nested.try_read().is_none() => {
                    description.text(DESCRIPTION_FAILED);
                }
                _ => {
                    description.value(value);
                }
            }
        }
    }
}
