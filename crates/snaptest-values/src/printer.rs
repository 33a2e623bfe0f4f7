//! Human-readable rendering of IR nodes
//!
//! Used for diagnostics and error messages. Back references to a node that is
//! still being printed render as `<cycle Type>`.

use crate::graph::{
    SerializedArray, SerializedEnum, SerializedList, SerializedMap, SerializedObject,
    SerializedSet, ValueGraph, ValueId,
};
use crate::intern::{SerializedLiteral, SerializedNull};
use crate::visit::ValueVisitor;
use std::collections::HashSet;

/// Cycle-safe IR printer
#[derive(Debug)]
pub struct ValuePrinter<'g> {
    graph: &'g ValueGraph,
    active: HashSet<ValueId>,
}

impl<'g> ValuePrinter<'g> {
    /// Create a printer over `graph`
    #[must_use]
    pub fn new(graph: &'g ValueGraph) -> Self {
        Self {
            graph,
            active: HashSet::new(),
        }
    }

    /// Render the node `id`
    pub fn print(&mut self, id: ValueId) -> String {
        let graph = self.graph;
        let Some(node) = graph.get(id) else {
            return format!("<missing {id}>");
        };
        if self.active.contains(&id) {
            return format!("<cycle {}>", node.runtime_type().simple_name());
        }
        self.active.insert(id);
        let out = node.accept(id, self);
        self.active.remove(&id);
        out
    }

    fn join(&mut self, ids: &[ValueId]) -> String {
        ids.iter()
            .map(|id| self.print(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Render the node `id` of `graph`
#[must_use]
pub fn print(graph: &ValueGraph, id: ValueId) -> String {
    ValuePrinter::new(graph).print(id)
}

impl ValueVisitor for ValuePrinter<'_> {
    type Output = String;

    fn visit_literal(&mut self, _id: ValueId, value: &SerializedLiteral) -> String {
        value.value().to_string()
    }

    fn visit_null(&mut self, _id: ValueId, _value: &SerializedNull) -> String {
        "null".to_string()
    }

    fn visit_enum(&mut self, _id: ValueId, value: &SerializedEnum) -> String {
        format!("{}::{}", value.runtime.simple_name(), value.name)
    }

    fn visit_array(&mut self, _id: ValueId, value: &SerializedArray) -> String {
        format!("[{}]", self.join(&value.elements))
    }

    fn visit_list(&mut self, _id: ValueId, value: &SerializedList) -> String {
        format!("[{}]", self.join(&value.elements))
    }

    fn visit_set(&mut self, _id: ValueId, value: &SerializedSet) -> String {
        format!("{{{}}}", self.join(&value.elements))
    }

    fn visit_map(&mut self, _id: ValueId, value: &SerializedMap) -> String {
        let entries = value
            .entries
            .iter()
            .map(|(k, v)| format!("{}={}", self.print(*k), self.print(*v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{entries}}}")
    }

    fn visit_object(&mut self, _id: ValueId, value: &SerializedObject) -> String {
        let fields = value
            .fields
            .iter()
            .map(|f| format!("{}: {}", f.name, self.print(f.value)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {{{fields}}}", value.runtime.simple_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{SerializedField, SerializedValue};
    use crate::{Literal, TypeRef};

    #[test]
    fn prints_nested_collections() {
        let mut graph = ValueGraph::standalone();
        let a = graph.literal(TypeRef::string(), Literal::from("a"));
        let one = graph.literal(TypeRef::class("Integer"), Literal::Int(1));
        let mut map = SerializedMap::new(TypeRef::class("Map"), TypeRef::class("LinkedHashMap"));
        map.entries.push((a, one));
        let map = graph.insert(SerializedValue::Map(map));
        let mut list = SerializedList::new(TypeRef::class("List"), TypeRef::class("ArrayList"));
        list.elements.extend([a, map]);
        let list = graph.insert(SerializedValue::List(list));

        assert_eq!(print(&graph, list), r#"["a", {"a"=1}]"#);
    }

    #[test]
    fn prints_cycles_once() {
        let mut graph = ValueGraph::standalone();
        let node = TypeRef::class("demo::Node");
        let id = graph.insert(SerializedValue::Object(SerializedObject::new(node.clone(), node.clone())));
        if let Some(SerializedValue::Object(obj)) = graph.get_mut(id) {
            obj.fields.push(SerializedField {
                owner: "demo::Node".into(),
                name: "next".into(),
                ty: node,
                value: id,
            });
        }
        assert_eq!(print(&graph, id), "Node {next: <cycle Node>}");
    }
}
