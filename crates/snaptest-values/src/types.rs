//! Type model
//!
//! Types are described by [`TypeRef`] and resolved against a [`TypeRegistry`]
//! that holds one [`ClassDef`] per known class. The registry answers the
//! questions every other layer asks:
//! - which instance fields a class declares across its ancestry
//! - whether a value of one type may be stored where another is declared
//! - which concrete class to instantiate for an interface-typed aggregate

use crate::error::TypeParseError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

/// Names of the classes registered by [`TypeRegistry::with_builtins`]
pub mod well_known {
    /// Root of every class hierarchy
    pub const OBJECT: &str = "Object";
    /// Immutable text
    pub const STRING: &str = "String";
    /// Base collection interface
    pub const COLLECTION: &str = "Collection";
    /// Ordered collection interface
    pub const LIST: &str = "List";
    /// Unique-element collection interface
    pub const SET: &str = "Set";
    /// Keyed collection interface
    pub const MAP: &str = "Map";
    /// Default [`LIST`] implementation
    pub const ARRAY_LIST: &str = "ArrayList";
    /// Linked [`LIST`] implementation
    pub const LINKED_LIST: &str = "LinkedList";
    /// Hashed [`SET`] implementation
    pub const HASH_SET: &str = "HashSet";
    /// Default [`SET`] implementation, keeps insertion order
    pub const LINKED_HASH_SET: &str = "LinkedHashSet";
    /// Sorted [`SET`] implementation
    pub const TREE_SET: &str = "TreeSet";
    /// Hashed [`MAP`] implementation
    pub const HASH_MAP: &str = "HashMap";
    /// Default [`MAP`] implementation, keeps insertion order
    pub const LINKED_HASH_MAP: &str = "LinkedHashMap";
    /// Sorted [`MAP`] implementation
    pub const TREE_MAP: &str = "TreeMap";
    /// Path prefix of the hidden factory-produced collection wrappers
    pub const WRAPPER_PREFIX: &str = "collections::";
    /// Wrapper flavours produced by the collection factories
    pub const WRAPPER_KINDS: [&str; 5] =
        ["Empty", "Singleton", "Unmodifiable", "Synchronized", "Checked"];
}

use well_known::{
    ARRAY_LIST, COLLECTION, HASH_MAP, HASH_SET, LINKED_HASH_MAP, LINKED_HASH_SET, LINKED_LIST,
    LIST, MAP, OBJECT, SET, STRING, TREE_MAP, TREE_SET, WRAPPER_KINDS, WRAPPER_PREFIX,
};

/// Primitive value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl Primitive {
    /// Every primitive kind
    pub const ALL: [Self; 8] = [
        Self::Bool,
        Self::Char,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Source name of the primitive
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Name of the boxed class wrapping the primitive
    #[must_use]
    pub const fn boxed_name(self) -> &'static str {
        match self {
            Self::Bool => "Boolean",
            Self::Char => "Character",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    /// Look up a primitive by source name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Look up a primitive by boxed class name
    #[must_use]
    pub fn from_boxed_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.boxed_name() == name)
    }
}

/// Reference to a type, possibly parameterized
///
/// Class names may be path-qualified with `::` (`demo::beans::Bean`).
/// Serialized as its display form (`List<String>`, `int[]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    /// No value; only valid as a result type
    Void,
    /// Primitive kind
    Primitive(Primitive),
    /// Named class with type arguments
    Class {
        /// Qualified class name
        name: String,
        /// Type arguments, empty for raw types
        args: Vec<TypeRef>,
    },
    /// Array of a component type
    Array(Box<TypeRef>),
}

impl TypeRef {
    /// Raw class type
    #[inline]
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::Class {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Parameterized class type
    #[inline]
    #[must_use]
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Class {
            name: name.into(),
            args,
        }
    }

    /// Array type
    #[inline]
    #[must_use]
    pub fn array(component: TypeRef) -> Self {
        Self::Array(Box::new(component))
    }

    /// Primitive type
    #[inline]
    #[must_use]
    pub const fn primitive(kind: Primitive) -> Self {
        Self::Primitive(kind)
    }

    /// The root `Object` type
    #[inline]
    #[must_use]
    pub fn object() -> Self {
        Self::class(OBJECT)
    }

    /// The `String` type
    #[inline]
    #[must_use]
    pub fn string() -> Self {
        Self::class(STRING)
    }

    /// Boxed class of a primitive
    #[inline]
    #[must_use]
    pub fn boxed(kind: Primitive) -> Self {
        Self::class(kind.boxed_name())
    }

    /// Check for [`TypeRef::Void`]
    #[inline]
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Check for a primitive type
    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Check for an array type
    #[inline]
    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Check for the `String` type
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.raw_name() == Some(STRING)
    }

    /// Primitive, boxed primitive or `String`: values that are inlined,
    /// never mutated and never shared by identity
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.unboxed().is_some() || self.is_string()
    }

    /// Class name without type arguments
    #[inline]
    #[must_use]
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            Self::Class { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Type arguments of a parameterized class
    #[must_use]
    pub fn type_args(&self) -> &[TypeRef] {
        match self {
            Self::Class { args, .. } => args,
            _ => &[],
        }
    }

    /// Type argument at `index`, `Object` when absent
    #[must_use]
    pub fn type_arg(&self, index: usize) -> TypeRef {
        self.type_args()
            .get(index)
            .cloned()
            .unwrap_or_else(Self::object)
    }

    /// Component type of an array
    #[must_use]
    pub fn component(&self) -> Option<&TypeRef> {
        match self {
            Self::Array(component) => Some(component),
            _ => None,
        }
    }

    /// Same type with every type argument removed
    #[must_use]
    pub fn erasure(&self) -> TypeRef {
        match self {
            Self::Class { name, .. } => Self::class(name.clone()),
            Self::Array(component) => Self::array(component.erasure()),
            other => other.clone(),
        }
    }

    /// Primitive kind of a primitive or boxed type
    #[must_use]
    pub fn unboxed(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            Self::Class { name, args } if args.is_empty() => Primitive::from_boxed_name(name),
            _ => None,
        }
    }

    /// Boxed class for primitives, `self` otherwise
    #[must_use]
    pub fn boxed_type(&self) -> TypeRef {
        match self {
            Self::Primitive(kind) => Self::boxed(*kind),
            other => other.clone(),
        }
    }

    /// Rendering with every class name reduced to its last path segment
    #[must_use]
    pub fn simple_name(&self) -> String {
        let mut out = String::new();
        write_type(&mut out, self, true);
        out
    }

    /// Last path segment of a qualified name
    #[must_use]
    pub fn simple(name: &str) -> &str {
        name.rsplit("::").next().unwrap_or(name)
    }

    /// Parse a type from its display form
    ///
    /// # Errors
    /// Returns [`TypeParseError`] for malformed input.
    pub fn parse(input: &str) -> Result<Self, TypeParseError> {
        let mut parser = TypeParser {
            bytes: input.as_bytes(),
            src: input,
            pos: 0,
        };
        let parsed = parser.parse_type().and_then(|ty| {
            parser.skip_ws();
            if parser.pos == parser.bytes.len() {
                Ok(ty)
            } else {
                Err(format!("unexpected trailing input at offset {}", parser.pos))
            }
        });
        parsed.map_err(|reason| TypeParseError {
            input: input.to_string(),
            reason,
        })
    }
}

fn write_type(out: &mut String, ty: &TypeRef, simple: bool) {
    match ty {
        TypeRef::Void => out.push_str("void"),
        TypeRef::Primitive(kind) => out.push_str(kind.name()),
        TypeRef::Class { name, args } => {
            out.push_str(if simple { TypeRef::simple(name) } else { name });
            if !args.is_empty() {
                out.push('<');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_type(out, arg, simple);
                }
                out.push('>');
            }
        }
        TypeRef::Array(component) => {
            write_type(out, component, simple);
            out.push_str("[]");
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_type(&mut out, self, false);
        f.write_str(&out)
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for TypeRef {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct TypeParser<'a> {
    bytes: &'a [u8],
    src: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn skip_ws(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        self.skip_ws();
        if self.bytes.get(self.pos) == Some(&expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
                self.pos += 1;
            } else if b == b':' && self.bytes.get(self.pos + 1) == Some(&b':') {
                self.pos += 2;
            } else {
                break;
            }
        }
        let src = self.src;
        let end = self.pos;
        (end > start).then(|| &src[start..end])
    }

    fn parse_type(&mut self) -> Result<TypeRef, String> {
        let name = self
            .ident()
            .ok_or_else(|| format!("expected a type name at offset {}", self.pos))?;

        let mut ty = if name == "void" {
            TypeRef::Void
        } else if let Some(kind) = Primitive::from_name(name) {
            TypeRef::Primitive(kind)
        } else {
            let mut args = Vec::new();
            if self.eat(b'<') {
                loop {
                    args.push(self.parse_type()?);
                    if self.eat(b',') {
                        continue;
                    }
                    if self.eat(b'>') {
                        break;
                    }
                    return Err(format!("expected ',' or '>' at offset {}", self.pos));
                }
            }
            TypeRef::generic(name, args)
        };

        while self.eat(b'[') {
            if !self.eat(b']') {
                return Err(format!("expected ']' at offset {}", self.pos));
            }
            ty = TypeRef::array(ty);
        }
        Ok(ty)
    }
}

/// Category of a registered class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Instantiable class
    Class,
    /// Interface, never instantiated directly
    Interface,
    /// Enumeration with named constants
    Enum,
}

/// Whether generated code may name a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Nameable from generated code
    #[default]
    Public,
    /// Internal class, only reachable through factories
    Hidden,
}

/// Declared field of a class
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Class-level (global) field
    #[serde(default)]
    pub is_static: bool,
}

/// Class table entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Qualified name
    pub name: String,
    /// Class, interface or enum
    pub kind: ClassKind,
    /// Nameable from generated code or not
    #[serde(default)]
    pub visibility: Visibility,
    /// Direct superclass
    #[serde(default)]
    pub superclass: Option<String>,
    /// Directly implemented interfaces
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Declared fields, in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Enum constants, in declaration order
    #[serde(default)]
    pub constants: Vec<String>,
}

impl ClassDef {
    fn with_kind(name: impl Into<String>, kind: ClassKind) -> Self {
        let name = name.into();
        let superclass = (kind != ClassKind::Interface && name != OBJECT).then(|| OBJECT.to_string());
        Self {
            name,
            kind,
            visibility: Visibility::Public,
            superclass,
            interfaces: Vec::new(),
            fields: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Instantiable class extending `Object`
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Class)
    }

    /// Interface
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self::with_kind(name, ClassKind::Interface)
    }

    /// Enum with the given constants
    #[must_use]
    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut def = Self::with_kind(name, ClassKind::Enum);
        def.constants = constants.into_iter().map(Into::into).collect();
        def
    }

    /// Set the superclass
    #[must_use]
    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Add an instance field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
            is_static: false,
        });
        self
    }

    /// Add a class-level field
    #[must_use]
    pub fn with_static_field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
            is_static: true,
        });
        self
    }

    /// Mark the class as hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }
}

/// Class table
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    classes: HashMap<String, ClassDef>,
}

impl TypeRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in classes
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(ClassDef::class(OBJECT));
        registry.register(ClassDef::class(STRING));
        for kind in Primitive::ALL {
            registry.register(ClassDef::class(kind.boxed_name()));
        }

        registry.register(ClassDef::interface(COLLECTION));
        registry.register(ClassDef::interface(LIST).implements(COLLECTION));
        registry.register(ClassDef::interface(SET).implements(COLLECTION));
        registry.register(ClassDef::interface(MAP));

        registry.register(ClassDef::class(ARRAY_LIST).implements(LIST));
        registry.register(ClassDef::class(LINKED_LIST).implements(LIST));
        registry.register(ClassDef::class(HASH_SET).implements(SET));
        registry.register(ClassDef::class(LINKED_HASH_SET).extends(HASH_SET));
        registry.register(ClassDef::class(TREE_SET).implements(SET));
        registry.register(ClassDef::class(HASH_MAP).implements(MAP));
        registry.register(ClassDef::class(LINKED_HASH_MAP).extends(HASH_MAP));
        registry.register(ClassDef::class(TREE_MAP).implements(MAP));

        for kind in WRAPPER_KINDS {
            registry.register(
                ClassDef::class(format!("{WRAPPER_PREFIX}{kind}List"))
                    .implements(LIST)
                    .hidden(),
            );
            registry.register(
                ClassDef::class(format!("{WRAPPER_PREFIX}{kind}Set"))
                    .implements(SET)
                    .hidden(),
            );
        }
        registry
    }

    /// Register a class, returning the definition it replaced
    pub fn register(&mut self, def: ClassDef) -> Option<ClassDef> {
        self.classes.insert(def.name.clone(), def)
    }

    /// Look up a class
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(name)
    }

    /// Check if a class is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Number of registered classes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if the registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Instance fields declared by `name` and its superclasses, base class
    /// first, each paired with its declaring class
    #[must_use]
    pub fn all_fields(&self, name: &str) -> Vec<(&str, &FieldDef)> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(name);
        while let Some(class) = current {
            if !seen.insert(class) {
                break;
            }
            let Some(def) = self.classes.get(class) else {
                break;
            };
            chain.push(def);
            current = def.superclass.as_deref();
        }

        chain
            .into_iter()
            .rev()
            .flat_map(|def| {
                def.fields
                    .iter()
                    .filter(|field| !field.is_static)
                    .map(move |field| (def.name.as_str(), field))
            })
            .collect()
    }

    /// Class-level fields declared directly by `name`
    #[must_use]
    pub fn static_fields(&self, name: &str) -> Vec<&FieldDef> {
        self.classes
            .get(name)
            .map(|def| def.fields.iter().filter(|f| f.is_static).collect())
            .unwrap_or_default()
    }

    /// Check if class `from` is `to` or inherits from it
    #[must_use]
    pub fn is_subclass(&self, from: &str, to: &str) -> bool {
        if from == to || to == OBJECT {
            return true;
        }
        let mut queue = VecDeque::from([from]);
        let mut seen = HashSet::new();
        while let Some(name) = queue.pop_front() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(def) = self.classes.get(name) {
                queue.extend(def.superclass.as_deref());
                queue.extend(def.interfaces.iter().map(String::as_str));
            }
        }
        false
    }

    /// Check if a value of type `from` may be stored where `to` is declared
    ///
    /// Covers identity, boxing and unboxing, superclass and interface
    /// closure and covariant reference arrays. Type arguments must agree
    /// only when both sides carry them.
    #[must_use]
    pub fn is_assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        if from == to {
            return true;
        }
        match (from, to) {
            (TypeRef::Void, _) | (_, TypeRef::Void) => false,
            (TypeRef::Primitive(a), TypeRef::Primitive(b)) => a == b,
            (TypeRef::Primitive(kind), TypeRef::Class { .. }) => {
                self.is_assignable(&TypeRef::boxed(*kind), to)
            }
            (TypeRef::Class { .. }, TypeRef::Primitive(kind)) => from.unboxed() == Some(*kind),
            (
                TypeRef::Class {
                    name: from_name,
                    args: from_args,
                },
                TypeRef::Class {
                    name: to_name,
                    args: to_args,
                },
            ) => {
                if to_name == OBJECT {
                    return true;
                }
                let args_agree =
                    from_args.is_empty() || to_args.is_empty() || from_args == to_args;
                args_agree && self.is_subclass(from_name, to_name)
            }
            (TypeRef::Array(_), TypeRef::Class { name, .. }) => name == OBJECT,
            (TypeRef::Array(a), TypeRef::Array(b)) => {
                !a.is_primitive() && !b.is_primitive() && self.is_assignable(a, b)
            }
            _ => false,
        }
    }

    /// Check if `ty` is an ordered collection type
    #[must_use]
    pub fn is_list(&self, ty: &TypeRef) -> bool {
        ty.raw_name().is_some_and(|name| self.is_subclass(name, LIST))
    }

    /// Check if `ty` is a set type
    #[must_use]
    pub fn is_set(&self, ty: &TypeRef) -> bool {
        ty.raw_name().is_some_and(|name| self.is_subclass(name, SET))
    }

    /// Check if `ty` is a keyed collection type
    #[must_use]
    pub fn is_map(&self, ty: &TypeRef) -> bool {
        ty.raw_name().is_some_and(|name| self.is_subclass(name, MAP))
    }

    /// Check if `name` is a public, registered, non-abstract class
    #[must_use]
    pub fn is_instantiable(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .is_some_and(|def| def.kind == ClassKind::Class && def.visibility == Visibility::Public)
    }

    /// Check if `name` is hidden from generated code
    #[must_use]
    pub fn is_hidden(&self, name: &str) -> bool {
        self.classes
            .get(name)
            .is_some_and(|def| def.visibility == Visibility::Hidden)
    }

    /// Concrete class to instantiate for an aggregate declared as `ty`
    ///
    /// Instantiable classes stand for themselves; collection interfaces and
    /// hidden wrappers resolve to the insertion-ordered default
    /// implementation, keeping type arguments.
    #[must_use]
    pub fn default_implementation(&self, ty: &TypeRef) -> TypeRef {
        let Some(name) = ty.raw_name() else {
            return ty.clone();
        };
        if self.is_instantiable(name) {
            return ty.clone();
        }
        let implementation = if self.is_subclass(name, LIST) {
            ARRAY_LIST
        } else if self.is_subclass(name, SET) {
            LINKED_HASH_SET
        } else if self.is_subclass(name, MAP) {
            LINKED_HASH_MAP
        } else {
            return ty.clone();
        };
        TypeRef::generic(implementation, ty.type_args().to_vec())
    }

    /// Nearest public ancestor of a hidden class, keeping type arguments
    #[must_use]
    pub fn public_supertype(&self, ty: &TypeRef) -> TypeRef {
        let Some(name) = ty.raw_name() else {
            return ty.clone();
        };
        if !self.is_hidden(name) {
            return ty.clone();
        }
        let mut queue = VecDeque::from([name]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            if current != name && !self.is_hidden(current) && self.contains(current) {
                return TypeRef::generic(current, ty.type_args().to_vec());
            }
            if let Some(def) = self.classes.get(current) {
                queue.extend(def.interfaces.iter().map(String::as_str));
                queue.extend(def.superclass.as_deref());
            }
        }
        TypeRef::object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_display_and_parse() {
        let ty = TypeRef::generic(
            "Map",
            vec![TypeRef::string(), TypeRef::array(TypeRef::primitive(Primitive::Int))],
        );
        assert_eq!(ty.to_string(), "Map<String, int[]>");
        assert_eq!(TypeRef::parse("Map<String, int[]>").unwrap(), ty);
    }

    #[test]
    fn parse_qualified_and_void() {
        assert_eq!(
            TypeRef::parse("demo::beans::Bean").unwrap(),
            TypeRef::class("demo::beans::Bean")
        );
        assert_eq!(TypeRef::parse(" void ").unwrap(), TypeRef::Void);
        assert_eq!(
            TypeRef::class("demo::beans::Bean").simple_name(),
            "Bean".to_string()
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(TypeRef::parse("List<String").is_err());
        assert!(TypeRef::parse("int]").is_err());
        assert!(TypeRef::parse("").is_err());
    }

    #[test]
    fn immutable_types() {
        assert!(TypeRef::primitive(Primitive::Long).is_immutable());
        assert!(TypeRef::class("Integer").is_immutable());
        assert!(TypeRef::string().is_immutable());
        assert!(!TypeRef::class("ArrayList").is_immutable());
    }

    #[test]
    fn assignability() {
        let registry = TypeRegistry::with_builtins();
        let list_of_string = TypeRef::generic(LIST, vec![TypeRef::string()]);
        let array_list_of_string = TypeRef::generic(ARRAY_LIST, vec![TypeRef::string()]);

        assert!(registry.is_assignable(&array_list_of_string, &list_of_string));
        assert!(registry.is_assignable(&TypeRef::class(ARRAY_LIST), &list_of_string));
        assert!(!registry.is_assignable(&list_of_string, &array_list_of_string));
        assert!(registry.is_assignable(&TypeRef::class(LINKED_HASH_SET), &TypeRef::class(SET)));
        assert!(registry.is_assignable(
            &TypeRef::primitive(Primitive::Int),
            &TypeRef::class("Integer")
        ));
        assert!(registry.is_assignable(&TypeRef::primitive(Primitive::Int), &TypeRef::object()));
        assert!(!registry.is_assignable(
            &TypeRef::primitive(Primitive::Int),
            &TypeRef::primitive(Primitive::Long)
        ));
    }

    #[test]
    fn fields_walk_ancestry_base_first() {
        let mut registry = TypeRegistry::with_builtins();
        registry.register(ClassDef::class("Base").with_field("id", TypeRef::primitive(Primitive::Int)));
        registry.register(
            ClassDef::class("Derived")
                .extends("Base")
                .with_field("name", TypeRef::string())
                .with_static_field("COUNT", TypeRef::primitive(Primitive::Int)),
        );

        let fields: Vec<_> = registry
            .all_fields("Derived")
            .into_iter()
            .map(|(owner, field)| (owner, field.name.as_str()))
            .collect();
        assert_eq!(fields, vec![("Base", "id"), ("Derived", "name")]);
        assert_eq!(registry.static_fields("Derived").len(), 1);
    }

    #[test]
    fn superclass_cycle_terminates() {
        let mut registry = TypeRegistry::new();
        registry.register(ClassDef::class("A").extends("B"));
        registry.register(ClassDef::class("B").extends("A"));
        assert!(!registry.is_subclass("A", "C"));
        assert_eq!(registry.all_fields("A").len(), 0);
    }

    #[test]
    fn default_implementation_and_public_supertype() {
        let registry = TypeRegistry::with_builtins();
        let wrapper = TypeRef::generic("collections::UnmodifiableList", vec![TypeRef::string()]);

        assert_eq!(
            registry.default_implementation(&wrapper),
            TypeRef::generic(ARRAY_LIST, vec![TypeRef::string()])
        );
        assert_eq!(
            registry.public_supertype(&wrapper),
            TypeRef::generic(LIST, vec![TypeRef::string()])
        );
        assert_eq!(
            registry.default_implementation(&TypeRef::class(TREE_SET)),
            TypeRef::class(TREE_SET)
        );
        assert_eq!(
            registry.default_implementation(&TypeRef::class(MAP)),
            TypeRef::class(LINKED_HASH_MAP)
        );
    }
}
