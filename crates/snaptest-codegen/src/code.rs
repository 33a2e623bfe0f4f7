//! Code model and dialects
//!
//! Backends build typed [`Expr`]/[`Stmt`] trees; a [`Dialect`] turns them into
//! finished source text. The same trees drive the evaluator, so what is
//! rendered is exactly what is checked.

use crate::scope::TypeManager;
use snaptest_values::{Literal, TypeRef};
use std::fmt;

/// Expression of generated code
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Inline literal
    Literal(Literal),
    /// Null reference
    Null,
    /// Bound local
    Local(String),
    /// Enum constant
    EnumConstant {
        /// Enum class
        ty: TypeRef,
        /// Constant name
        name: String,
    },
    /// Empty instance of a class
    New {
        /// Class to instantiate
        ty: TypeRef,
        /// Constructor arguments
        args: Vec<Expr>,
    },
    /// Array with the given elements
    NewArray {
        /// Component type
        component: TypeRef,
        /// Elements
        elements: Vec<Expr>,
    },
    /// Method call on a target
    Call {
        /// Receiver
        target: Box<Expr>,
        /// Method name
        method: String,
        /// Explicit type arguments
        type_args: Vec<TypeRef>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Call of an associated or free function
    StaticCall {
        /// Owning type, `None` for imported free functions
        owner: Option<TypeRef>,
        /// Function name
        function: String,
        /// Explicit type arguments
        type_args: Vec<TypeRef>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Instance field
    Field {
        /// Owning object
        target: Box<Expr>,
        /// Field name
        name: String,
    },
    /// Class-level field
    StaticField {
        /// Declaring type
        owner: TypeRef,
        /// Field name
        name: String,
    },
    /// Array element
    Index {
        /// Array
        target: Box<Expr>,
        /// Position
        index: usize,
    },
    /// Conversion to a declared type
    Cast {
        /// Converted expression
        expr: Box<Expr>,
        /// Target type
        ty: TypeRef,
    },
    /// Deferred expression
    Closure(Box<Expr>),
}

impl Expr {
    /// Reference to a local
    #[inline]
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::Local(name.into())
    }

    /// Method call without type arguments
    #[must_use]
    pub fn call(target: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            target: Box::new(target),
            method: method.into(),
            type_args: Vec::new(),
            args,
        }
    }

    /// Free function call
    #[must_use]
    pub fn function(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::StaticCall {
            owner: None,
            function: function.into(),
            type_args: Vec::new(),
            args,
        }
    }

    /// Free function call with explicit type arguments
    #[must_use]
    pub fn generic_function(
        function: impl Into<String>,
        type_args: Vec<TypeRef>,
        args: Vec<Expr>,
    ) -> Self {
        Self::StaticCall {
            owner: None,
            function: function.into(),
            type_args,
            args,
        }
    }

    /// Field of `target`
    #[must_use]
    pub fn field(target: Expr, name: impl Into<String>) -> Self {
        Self::Field {
            target: Box::new(target),
            name: name.into(),
        }
    }

    /// Name of the local this expression reads, if it is one
    #[must_use]
    pub fn as_local(&self) -> Option<&str> {
        match self {
            Self::Local(name) => Some(name),
            _ => None,
        }
    }

    /// Check for expressions without statements behind them
    #[must_use]
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Null | Self::EnumConstant { .. })
    }
}

impl From<Literal> for Expr {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// Statement of generated code
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Bind a new local
    Let {
        /// Local name
        name: String,
        /// Declared type
        ty: TypeRef,
        /// Initial value
        value: Expr,
    },
    /// Store into a field, element or class field
    Assign {
        /// Place
        target: Expr,
        /// Stored value
        value: Expr,
    },
    /// Expression evaluated for effect
    Expr(Expr),
    /// Line comment
    Comment(String),
}

/// Target syntax for the code model
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Dialect name
    fn name(&self) -> &'static str;

    /// Render a type
    fn type_name(&self, ty: &TypeRef, types: &mut TypeManager) -> String;

    /// Render an expression
    fn expr(&self, expr: &Expr, types: &mut TypeManager) -> String;

    /// Render a statement
    fn stmt(&self, stmt: &Stmt, types: &mut TypeManager) -> String;

    /// Render an import line
    fn import(&self, path: &str) -> String;
}

/// Rust-like syntax: `let name: Type = value;`, `Type::new()`, `(e as T)`
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDialect;

impl StandardDialect {
    fn literal(literal: &Literal) -> String {
        match literal {
            Literal::Byte(v) => format!("{v}_i8"),
            Literal::Short(v) => format!("{v}_i16"),
            Literal::Long(v) => format!("{v}_i64"),
            Literal::Float(v) => float(f64::from(*v), "f32"),
            Literal::Double(v) => float(*v, "f64"),
            other => other.to_string(),
        }
    }

    fn list(&self, items: &[Expr], types: &mut TypeManager) -> String {
        items
            .iter()
            .map(|item| self.expr(item, types))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn turbofish(&self, type_args: &[TypeRef], types: &mut TypeManager) -> String {
        if type_args.is_empty() {
            return String::new();
        }
        let args: Vec<String> = type_args.iter().map(|t| self.type_name(t, types)).collect();
        format!("::<{}>", args.join(", "))
    }

    fn raw_name(&self, ty: &TypeRef, types: &mut TypeManager) -> String {
        match ty.raw_name() {
            Some(name) => types.class_name(name),
            None => self.type_name(ty, types),
        }
    }
}

fn float(value: f64, suffix: &str) -> String {
    if value.is_nan() {
        format!("{suffix}::NAN")
    } else if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "NEG_" };
        format!("{suffix}::{sign}INFINITY")
    } else if suffix == "f32" {
        #[allow(clippy::cast_possible_truncation)]
        let narrow = value as f32;
        format!("{narrow:?}_f32")
    } else {
        format!("{value:?}")
    }
}

impl Dialect for StandardDialect {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn type_name(&self, ty: &TypeRef, types: &mut TypeManager) -> String {
        match ty {
            TypeRef::Void => "()".to_string(),
            TypeRef::Primitive(kind) => kind.name().to_string(),
            TypeRef::Class { name, args } => {
                let mut out = types.class_name(name);
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(|a| self.type_name(a, types)).collect();
                    out.push('<');
                    out.push_str(&args.join(", "));
                    out.push('>');
                }
                out
            }
            TypeRef::Array(component) => format!("Vec<{}>", self.type_name(component, types)),
        }
    }

    fn expr(&self, expr: &Expr, types: &mut TypeManager) -> String {
        match expr {
            Expr::Literal(literal) => Self::literal(literal),
            Expr::Null => "null".to_string(),
            Expr::Local(name) => name.clone(),
            Expr::EnumConstant { ty, name } => format!("{}::{name}", self.raw_name(ty, types)),
            Expr::New { ty, args } => {
                format!("{}::new({})", self.raw_name(ty, types), self.list(args, types))
            }
            Expr::NewArray { elements, .. } => format!("vec![{}]", self.list(elements, types)),
            Expr::Call {
                target,
                method,
                type_args,
                args,
            } => format!(
                "{}.{method}{}({})",
                self.expr(target, types),
                self.turbofish(type_args, types),
                self.list(args, types)
            ),
            Expr::StaticCall {
                owner,
                function,
                type_args,
                args,
            } => {
                let prefix = owner
                    .as_ref()
                    .map(|owner| format!("{}::", self.raw_name(owner, types)))
                    .unwrap_or_default();
                format!(
                    "{prefix}{function}{}({})",
                    self.turbofish(type_args, types),
                    self.list(args, types)
                )
            }
            Expr::Field { target, name } => format!("{}.{name}", self.expr(target, types)),
            Expr::StaticField { owner, name } => format!("{}::{name}", self.raw_name(owner, types)),
            Expr::Index { target, index } => format!("{}[{index}]", self.expr(target, types)),
            Expr::Cast { expr, ty } => {
                format!("({} as {})", self.expr(expr, types), self.type_name(ty, types))
            }
            Expr::Closure(body) => format!("|| {}", self.expr(body, types)),
        }
    }

    fn stmt(&self, stmt: &Stmt, types: &mut TypeManager) -> String {
        match stmt {
            Stmt::Let { name, ty, value } => format!(
                "let {name}: {} = {};",
                self.type_name(ty, types),
                self.expr(value, types)
            ),
            Stmt::Assign { target, value } => {
                format!("{} = {};", self.expr(target, types), self.expr(value, types))
            }
            Stmt::Expr(expr) => format!("{};", self.expr(expr, types)),
            Stmt::Comment(text) => format!("// {text}"),
        }
    }

    fn import(&self, path: &str) -> String {
        format!("use {path};")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(stmt: &Stmt) -> String {
        StandardDialect.stmt(stmt, &mut TypeManager::new())
    }

    #[test]
    fn renders_bindings_and_calls() {
        let list = TypeRef::generic("ArrayList", vec![TypeRef::string()]);
        let binding = Stmt::Let {
            name: "array_list1".into(),
            ty: list.clone(),
            value: Expr::New { ty: list, args: vec![] },
        };
        assert_eq!(render(&binding), "let array_list1: ArrayList<String> = ArrayList::new();");

        let add = Stmt::Expr(Expr::call(
            Expr::local("array_list1"),
            "add",
            vec![Literal::from("x").into()],
        ));
        assert_eq!(render(&add), "array_list1.add(\"x\");");
    }

    #[test]
    fn renders_literal_suffixes_and_casts() {
        let dialect = StandardDialect;
        let mut types = TypeManager::new();
        assert_eq!(dialect.expr(&Literal::Long(5).into(), &mut types), "5_i64");
        assert_eq!(dialect.expr(&Literal::Double(2.0).into(), &mut types), "2.0");
        assert_eq!(dialect.expr(&Literal::Float(0.5).into(), &mut types), "0.5_f32");
        assert_eq!(dialect.expr(&Literal::Double(f64::NAN).into(), &mut types), "f64::NAN");
        assert_eq!(dialect.expr(&Literal::Char('c').into(), &mut types), "'c'");
        let cast = Expr::Cast {
            expr: Box::new(Literal::Int(1).into()),
            ty: TypeRef::primitive(snaptest_values::Primitive::Long),
        };
        assert_eq!(dialect.expr(&cast, &mut types), "(1 as long)");
    }

    #[test]
    fn qualified_names_are_imported() {
        let mut types = TypeManager::new();
        let assign = Stmt::Assign {
            target: Expr::StaticField {
                owner: TypeRef::class("demo::Counter"),
                name: "COUNT".into(),
            },
            value: Literal::Int(3).into(),
        };
        assert_eq!(StandardDialect.stmt(&assign, &mut types), "Counter::COUNT = 3;");
        assert_eq!(types.imports().collect::<Vec<_>>(), vec!["demo::Counter"]);
    }
}
