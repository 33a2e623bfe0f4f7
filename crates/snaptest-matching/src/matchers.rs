//! Runtime matcher library
//!
//! The vocabulary generated verification code is written in.

use crate::description::Description;
use crate::equality::live_equals;
use crate::matcher::{BoxMatcher, Matcher};
use snaptest_values::{live_slots, Literal, LiveValue, Primitive, Shape, TypeRef, TypeRegistry};
use std::sync::Arc;

/// Parts of a live composite of one of `shapes`
fn parts(item: &LiveValue, types: &TypeRegistry, shapes: &[Shape]) -> Option<Vec<LiveValue>> {
    let slots = live_slots(item.as_object()?, types)?;
    shapes
        .contains(&slots.shape)
        .then(|| slots.entries.into_iter().map(|(_, value)| value).collect())
}

/// Check that every matcher can be paired with a distinct item
fn perfect_matching(size: usize, accepts: impl Fn(usize, usize) -> bool) -> bool {
    let edges: Vec<Vec<usize>> = (0..size)
        .map(|m| (0..size).filter(|&i| accepts(m, i)).collect())
        .collect();
    let mut owner: Vec<Option<usize>> = vec![None; size];
    (0..size).all(|m| {
        let mut visited = vec![false; size];
        augment(m, &edges, &mut visited, &mut owner)
    })
}

fn augment(
    m: usize,
    edges: &[Vec<usize>],
    visited: &mut [bool],
    owner: &mut [Option<usize>],
) -> bool {
    for &i in &edges[m] {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let free = match owner[i] {
            None => true,
            Some(other) => augment(other, edges, visited, owner),
        };
        if free {
            owner[i] = Some(m);
            return true;
        }
    }
    false
}

fn describe_all(description: &mut Description, start: &str, matchers: &[BoxMatcher], end: &str) {
    description.list(start, ", ", end, matchers, |d, m| m.describe_to(d));
}

/// Deeply equal to `expected`
#[derive(Debug, Clone)]
pub struct IsEqual {
    expected: LiveValue,
}

impl Matcher for IsEqual {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        live_equals(types, &self.expected, item)
    }

    fn describe_to(&self, description: &mut Description) {
        description.value(&self.expected);
    }
}

/// Deep equality matcher
#[must_use]
pub fn equal_to(expected: LiveValue) -> BoxMatcher {
    Arc::new(IsEqual { expected })
}

/// Null matcher
#[derive(Debug, Clone, Copy)]
pub struct IsNull;

impl Matcher for IsNull {
    fn matches(&self, item: &LiveValue, _types: &TypeRegistry) -> bool {
        item.is_null()
    }

    fn describe_to(&self, description: &mut Description) {
        description.text("null");
    }
}

/// Matches only null
#[must_use]
pub fn null_value() -> BoxMatcher {
    Arc::new(IsNull)
}

/// Instance-of matcher standing in for a back reference
#[derive(Debug, Clone)]
pub struct IsInstance {
    ty: TypeRef,
}

impl Matcher for IsInstance {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        item.runtime_type()
            .is_some_and(|runtime| types.is_assignable(&runtime, &self.ty))
    }

    fn describe_to(&self, description: &mut Description) {
        description.text("an instance of ").text(&self.ty.to_string());
    }
}

/// Any non-null value assignable to `ty`
#[must_use]
pub fn recursive(ty: TypeRef) -> BoxMatcher {
    Arc::new(IsInstance { ty })
}

/// Ordered elements of a list or array
#[derive(Debug, Clone)]
pub struct InOrder {
    elements: Vec<BoxMatcher>,
    shapes: &'static [Shape],
}

impl Matcher for InOrder {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        parts(item, types, self.shapes).is_some_and(|items| {
            items.len() == self.elements.len()
                && items
                    .iter()
                    .zip(&self.elements)
                    .all(|(item, matcher)| matcher.matches(item, types))
        })
    }

    fn describe_to(&self, description: &mut Description) {
        let start = if self.shapes.contains(&Shape::Array) { "array [" } else { "iterable containing [" };
        describe_all(description, start, &self.elements, "]");
    }
}

/// Collection whose elements match `elements` position by position
#[must_use]
pub fn contains_in_order(elements: Vec<BoxMatcher>) -> BoxMatcher {
    Arc::new(InOrder {
        elements,
        shapes: &[Shape::List, Shape::Set],
    })
}

/// Array whose elements match `elements` position by position
#[must_use]
pub fn array_containing(elements: Vec<BoxMatcher>) -> BoxMatcher {
    Arc::new(InOrder {
        elements,
        shapes: &[Shape::Array],
    })
}

/// Elements in any order, each matcher used once
#[derive(Debug, Clone)]
pub struct AnyOrder {
    elements: Vec<BoxMatcher>,
}

impl Matcher for AnyOrder {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        let Some(items) = parts(item, types, &[Shape::List, Shape::Set, Shape::Array]) else {
            return false;
        };
        items.len() == self.elements.len()
            && perfect_matching(items.len(), |m, i| self.elements[m].matches(&items[i], types))
    }

    fn describe_to(&self, description: &mut Description) {
        describe_all(description, "iterable with items [", &self.elements, "] in any order");
    }
}

/// Collection whose elements match `elements` in some order
#[must_use]
pub fn contains_in_any_order(elements: Vec<BoxMatcher>) -> BoxMatcher {
    Arc::new(AnyOrder { elements })
}

/// Expected map entry
#[derive(Debug, Clone)]
pub struct EntryMatcher {
    key: BoxMatcher,
    value: BoxMatcher,
}

/// Entry whose key and value match
#[must_use]
pub fn entry(key: BoxMatcher, value: BoxMatcher) -> EntryMatcher {
    EntryMatcher { key, value }
}

/// Exact entry set of a map, in any order
#[derive(Debug, Clone)]
pub struct HasEntries {
    entries: Vec<EntryMatcher>,
}

impl Matcher for HasEntries {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        let Some(parts) = parts(item, types, &[Shape::Map]) else {
            return false;
        };
        let pairs: Vec<(&LiveValue, &LiveValue)> =
            parts.chunks_exact(2).map(|kv| (&kv[0], &kv[1])).collect();
        pairs.len() == self.entries.len()
            && perfect_matching(pairs.len(), |m, i| {
                let (key, value) = pairs[i];
                self.entries[m].key.matches(key, types) && self.entries[m].value.matches(value, types)
            })
    }

    fn describe_to(&self, description: &mut Description) {
        description.list("map containing {", ", ", "}", &self.entries, |d, e| {
            e.key.describe_to(d);
            d.text("=");
            e.value.describe_to(d);
        });
    }
}

/// Map whose entries are exactly `entries`
#[must_use]
pub fn contains_entries(entries: Vec<EntryMatcher>) -> BoxMatcher {
    Arc::new(HasEntries { entries })
}

/// Primitive array with exactly the given values
#[derive(Debug, Clone)]
pub struct PrimitiveArray {
    kind: Primitive,
    values: Vec<Literal>,
}

impl Matcher for PrimitiveArray {
    fn matches(&self, item: &LiveValue, types: &TypeRegistry) -> bool {
        let Some(obj) = item.as_object() else {
            return false;
        };
        if obj.class().component() != Some(&TypeRef::primitive(self.kind)) {
            return false;
        }
        parts(item, types, &[Shape::Array]).is_some_and(|items| {
            items.len() == self.values.len()
                && items
                    .iter()
                    .zip(&self.values)
                    .all(|(item, value)| item.as_literal().as_ref() == Some(value))
        })
    }

    fn describe_to(&self, description: &mut Description) {
        description
            .text(self.kind.name())
            .list(" array [", ", ", "]", &self.values, |d, v| {
                d.text(&v.to_string());
            });
    }
}

/// Array of primitive `kind` holding exactly `values`
#[must_use]
pub fn primitive_array_containing(kind: Primitive, values: Vec<Literal>) -> BoxMatcher {
    Arc::new(PrimitiveArray { kind, values })
}
