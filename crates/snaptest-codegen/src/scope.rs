//! Per-unit naming state
//!
//! Every generated test unit gets a fresh [`UnitScope`]: a local-name
//! allocator and an import aggregator. Both backends of one unit share it,
//! so arrange locals and matcher locals never collide.

use snaptest_values::TypeRef;
use std::collections::{BTreeSet, HashMap};

/// Allocates type-derived local names: `prefix` + per-prefix counter from 1
#[derive(Debug, Clone, Default)]
pub struct LocalNames {
    counters: HashMap<String, usize>,
}

impl LocalNames {
    /// Create an allocator with no names taken
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name for `prefix`
    pub fn fresh(&mut self, prefix: &str) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{prefix}{counter}")
    }

    /// Next name for a local of type `ty`
    pub fn for_type(&mut self, ty: &TypeRef) -> String {
        self.fresh(&prefix_for(ty))
    }
}

/// Snake-case prefix derived from a type
#[must_use]
pub fn prefix_for(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Void => "unit".to_string(),
        TypeRef::Primitive(kind) => format!("{}_value", kind.name()),
        TypeRef::Class { name, .. } => snake_case(TypeRef::simple(name)),
        TypeRef::Array(component) => match component.as_ref() {
            TypeRef::Primitive(kind) => format!("{}_array", kind.name()),
            other => format!("{}_array", prefix_for(other)),
        },
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if previous_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            previous_lower = true;
        } else {
            previous_lower = false;
        }
    }
    if out.is_empty() {
        out.push_str("value");
    }
    out
}

/// Import aggregator and class-name resolver
///
/// Qualified class names (`a::b::Name`) render by their last segment and
/// register an import, unless another class already claimed that segment in
/// this unit; the latter then renders fully qualified.
#[derive(Debug, Clone, Default)]
pub struct TypeManager {
    imports: BTreeSet<String>,
    static_imports: BTreeSet<String>,
    simple_names: HashMap<String, String>,
}

impl TypeManager {
    /// Create an empty aggregator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name to use in code for the class `name`
    pub fn class_name(&mut self, name: &str) -> String {
        if !name.contains("::") {
            return name.to_string();
        }
        let simple = TypeRef::simple(name);
        match self.simple_names.get(simple) {
            Some(owner) if owner == name => simple.to_string(),
            Some(_) => name.to_string(),
            None => {
                self.simple_names.insert(simple.to_string(), name.to_string());
                self.imports.insert(name.to_string());
                simple.to_string()
            }
        }
    }

    /// Register a type import; repeated registration is a no-op
    pub fn add_import(&mut self, path: impl Into<String>) {
        self.imports.insert(path.into());
    }

    /// Register a function import; repeated registration is a no-op
    pub fn add_static_import(&mut self, path: impl Into<String>) {
        self.static_imports.insert(path.into());
    }

    /// Type imports in sorted order
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(String::as_str)
    }

    /// Function imports in sorted order
    pub fn static_imports(&self) -> impl Iterator<Item = &str> {
        self.static_imports.iter().map(String::as_str)
    }
}

/// Naming state of one generated unit
#[derive(Debug, Clone, Default)]
pub struct UnitScope {
    /// Local-name allocator
    pub names: LocalNames,
    /// Import aggregator
    pub types: TypeManager,
}

impl UnitScope {
    /// Fresh scope
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
