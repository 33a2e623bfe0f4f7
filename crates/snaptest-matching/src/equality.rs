//! Deep-equality engine
//!
//! Structural comparison of two value graphs without recursion:
//! - scalars, nulls and enum constants compare immediately
//! - reference pairs are deferred onto a breadth-first worklist
//! - a seen set keyed by both identities keeps each reference pair from
//!   being queued twice, so cycles terminate
//!
//! Plain objects compare field by field, arrays and lists positionally, sets
//! and maps order-insensitively when their elements or keys are value-like
//! and positionally otherwise. The first mismatch ends the comparison.

use crate::structure::{Atom, GraphStructure, Inspected, LiveStructure, Structure};
use snaptest_values::{LiveValue, Shape, Slot, Slots, TypeRef, TypeRegistry, ValueGraph, ValueId};
use std::collections::{HashMap, HashSet, VecDeque};

/// Pending reference pairs of one comparison
#[derive(Debug)]
pub struct Worklist<L: Structure, R: Structure> {
    queue: VecDeque<(L::Node, R::Node)>,
    seen: HashSet<(L::Key, R::Key)>,
}

impl<L: Structure, R: Structure> Default for Worklist<L, R> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
        }
    }
}

impl<L: Structure, R: Structure> Worklist<L, R> {
    /// Create an empty worklist
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued pairs
    #[inline]
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Deep equality between two structures
#[derive(Debug, Clone, Copy)]
pub struct DeepEquality<'s, L, R> {
    left: &'s L,
    right: &'s R,
}

impl<'s, L: Structure, R: Structure> DeepEquality<'s, L, R> {
    /// Compare nodes of `left` with nodes of `right`
    #[inline]
    #[must_use]
    pub fn new(left: &'s L, right: &'s R) -> Self {
        Self { left, right }
    }

    /// Compare two nodes and everything reachable from them
    #[must_use]
    pub fn equals(&self, left: L::Node, right: R::Node) -> bool {
        let mut work = Worklist::new();
        self.pair(left, right, &mut work) && self.drain(&mut work)
    }

    /// Compare a pair now if value-like, otherwise defer it
    ///
    /// Returns `false` only for an immediate mismatch.
    pub fn pair(&self, left: L::Node, right: R::Node, work: &mut Worklist<L, R>) -> bool {
        match (self.left.identity(&left), self.right.identity(&right)) {
            (Some(l), Some(r)) => {
                if work.seen.insert((l, r)) {
                    work.queue.push_back((left, right));
                }
                true
            }
            _ => self.compare(&left, &right, work),
        }
    }

    /// Compare every deferred pair, stopping at the first mismatch
    pub fn drain(&self, work: &mut Worklist<L, R>) -> bool {
        while let Some((left, right)) = work.queue.pop_front() {
            if !self.compare(&left, &right, work) {
                return false;
            }
        }
        true
    }

    fn compare(&self, left: &L::Node, right: &R::Node, work: &mut Worklist<L, R>) -> bool {
        match (self.left.inspect(left), self.right.inspect(right)) {
            (
                Inspected::Composite {
                    runtime: left_type,
                    slots: left_slots,
                },
                Inspected::Composite {
                    runtime: right_type,
                    slots: right_slots,
                },
            ) => self.compare_composites(&left_type, left_slots, &right_type, right_slots, work),
            (l, r) => match (l.atom(), r.atom()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    fn compare_composites(
        &self,
        left_type: &TypeRef,
        left: Slots<L::Node>,
        right_type: &TypeRef,
        right: Slots<R::Node>,
        work: &mut Worklist<L, R>,
    ) -> bool {
        if left_type.erasure() != right_type.erasure()
            || left.shape != right.shape
            || left.entries.len() != right.entries.len()
        {
            return false;
        }
        match left.shape {
            Shape::Object => self.compare_fields(left, &right, work),
            Shape::Array | Shape::List => self.compare_positions(left, right, work),
            Shape::Set => {
                let left_atoms = atoms(self.left, left.entries.iter().map(|(_, n)| n));
                let right_atoms = atoms(self.right, right.entries.iter().map(|(_, n)| n));
                match (left_atoms, right_atoms) {
                    (Some(a), Some(b)) => same_multiset(a, b),
                    _ => self.compare_positions(left, right, work),
                }
            }
            Shape::Map => self.compare_entries(left, right, work),
        }
    }

    fn compare_fields(
        &self,
        left: Slots<L::Node>,
        right: &Slots<R::Node>,
        work: &mut Worklist<L, R>,
    ) -> bool {
        for (slot, value) in left.entries {
            let Some(other) = find_field(right, &slot) else {
                return false;
            };
            if !self.pair(value, other.clone(), work) {
                return false;
            }
        }
        true
    }

    fn compare_positions(
        &self,
        left: Slots<L::Node>,
        right: Slots<R::Node>,
        work: &mut Worklist<L, R>,
    ) -> bool {
        left.entries
            .into_iter()
            .zip(right.entries)
            .all(|((_, l), (_, r))| self.pair(l, r, work))
    }

    fn compare_entries(
        &self,
        left: Slots<L::Node>,
        right: Slots<R::Node>,
        work: &mut Worklist<L, R>,
    ) -> bool {
        let left_keys = atoms(self.left, left.entries.iter().step_by(2).map(|(_, n)| n));
        let right_keys = atoms(self.right, right.entries.iter().step_by(2).map(|(_, n)| n));
        let (Some(left_keys), Some(right_keys)) = (left_keys, right_keys) else {
            return self.compare_positions(left, right, work);
        };

        let right_values: Vec<R::Node> = right
            .entries
            .into_iter()
            .skip(1)
            .step_by(2)
            .map(|(_, n)| n)
            .collect();
        let lookup: HashMap<Atom, usize> = right_keys
            .into_iter()
            .enumerate()
            .map(|(i, key)| (key, i))
            .collect();

        let left_values = left.entries.into_iter().skip(1).step_by(2).map(|(_, n)| n);
        for (key, value) in left_keys.into_iter().zip(left_values) {
            let Some(&index) = lookup.get(&key) else {
                return false;
            };
            if !self.pair(value, right_values[index].clone(), work) {
                return false;
            }
        }
        true
    }
}

fn find_field<'a, N>(slots: &'a Slots<N>, wanted: &Slot) -> Option<&'a N> {
    slots
        .entries
        .iter()
        .find(|(slot, _)| slot == wanted)
        .or_else(|| {
            let name = wanted.field_name()?;
            slots
                .entries
                .iter()
                .find(|(slot, _)| slot.field_name() == Some(name))
        })
        .map(|(_, node)| node)
}

fn atoms<'n, S: Structure>(
    structure: &S,
    nodes: impl Iterator<Item = &'n S::Node>,
) -> Option<Vec<Atom>>
where
    S::Node: 'n,
{
    nodes
        .map(|node| {
            if structure.identity(node).is_some() {
                None
            } else {
                structure.inspect(node).atom()
            }
        })
        .collect()
}

fn same_multiset(left: Vec<Atom>, right: Vec<Atom>) -> bool {
    let mut counts: HashMap<Atom, isize> = HashMap::new();
    for atom in left {
        *counts.entry(atom).or_insert(0) += 1;
    }
    for atom in right {
        *counts.entry(atom).or_insert(0) -= 1;
    }
    counts.values().all(|count| *count == 0)
}

/// Deep equality of two live values
#[must_use]
pub fn live_equals(types: &TypeRegistry, left: &LiveValue, right: &LiveValue) -> bool {
    let view = LiveStructure::new(types);
    DeepEquality::new(&view, &view).equals(left.clone(), right.clone())
}

/// Deep equality of two IR nodes, possibly of different graphs
#[must_use]
pub fn graph_equals(
    left_graph: &ValueGraph,
    left: ValueId,
    right_graph: &ValueGraph,
    right: ValueId,
) -> bool {
    let left_view = GraphStructure::new(left_graph);
    let right_view = GraphStructure::new(right_graph);
    DeepEquality::new(&left_view, &right_view).equals(left, right)
}

/// Deep equality of an IR node and a live value
#[must_use]
pub fn graph_matches_live(
    graph: &ValueGraph,
    id: ValueId,
    types: &TypeRegistry,
    value: &LiveValue,
) -> bool {
    let graph_view = GraphStructure::new(graph);
    let live_view = LiveStructure::new(types);
    DeepEquality::new(&graph_view, &live_view).equals(id, value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptest_values::{ObjRef, TypeRef};

    fn types() -> TypeRegistry {
        TypeRegistry::with_builtins()
    }

    #[test]
    fn scalars_compare_by_value() {
        let types = types();
        assert!(live_equals(&types, &LiveValue::Int(1), &LiveValue::Int(1)));
        assert!(!live_equals(&types, &LiveValue::Int(1), &LiveValue::Long(1)));
        assert!(!live_equals(&types, &LiveValue::Null, &LiveValue::str("null")));
    }

    #[test]
    fn sets_of_scalars_ignore_order() {
        let types = types();
        let class = TypeRef::class("LinkedHashSet");
        let a = ObjRef::set(class.clone(), vec![1.into(), 2.into()]);
        let b = ObjRef::set(class, vec![2.into(), 1.into()]);
        assert!(live_equals(&types, &a.into(), &b.into()));
    }

    #[test]
    fn lists_respect_order() {
        let types = types();
        let class = TypeRef::class("ArrayList");
        let a = ObjRef::list(class.clone(), vec![1.into(), 2.into()]);
        let b = ObjRef::list(class, vec![2.into(), 1.into()]);
        assert!(!live_equals(&types, &a.into(), &b.into()));
    }

    #[test]
    fn maps_with_scalar_keys_ignore_order() {
        let types = types();
        let class = TypeRef::class("LinkedHashMap");
        let a = ObjRef::map(class.clone(), vec![("a".into(), 1.into()), ("b".into(), 2.into())]);
        let b = ObjRef::map(class.clone(), vec![("b".into(), 2.into()), ("a".into(), 1.into())]);
        let c = ObjRef::map(class, vec![("b".into(), 2.into()), ("a".into(), 3.into())]);
        assert!(live_equals(&types, &a.clone().into(), &b.into()));
        assert!(!live_equals(&types, &a.into(), &c.into()));
    }

    #[test]
    fn runtime_types_must_agree() {
        let types = types();
        let a = ObjRef::list(TypeRef::class("ArrayList"), vec![]);
        let b = ObjRef::list(TypeRef::class("LinkedList"), vec![]);
        assert!(!live_equals(&types, &a.into(), &b.into()));
    }

    #[test]
    fn locked_objects_never_match() {
        let types = types();
        let a = ObjRef::object(TypeRef::class("Bean"));
        let b = ObjRef::object(TypeRef::class("Bean"));
        let _guard = b.write();
        assert!(!live_equals(&types, &a.into(), &b.clone().into()));
    }
}
