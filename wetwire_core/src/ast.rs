//! Abstract syntax tree for the Go-subset source language.
//!
//! This mirrors the slice of `go/ast` the discoverer actually inspects:
//! top-level `var` declarations, their optional type expressions, and
//! their initializer expression trees. Functions, control flow and
//! generics are deliberately absent.

use crate::token::Line;

/// A parsed source file.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub package: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub alias: Option<String>,
    pub path: String,
}

/// A top-level declaration. Only `Var` carries resource-discovery
/// meaning; the others are parsed just well enough to be skipped.
#[derive(Debug, Clone)]
pub enum Decl {
    Var(Vec<ValueSpec>),
    Other,
}

/// One name (or comma-separated group of names sharing a type/initializer
/// list) from a `var` block, e.g. `var MyConfigMap = &corev1.ConfigMap{...}`.
#[derive(Debug, Clone)]
pub struct ValueSpec {
    pub name: String,
    pub line: Line,
    /// The declared type, if the binding spells one out explicitly:
    /// `var X corev1.ConfigMap`.
    pub typ: Option<Expr>,
    /// The initializer expression, if any: `var X = &corev1.ConfigMap{...}`.
    pub value: Option<Expr>,
}

/// Expression tree. Only the shapes the discoverer cares about are
/// modelled; anything else collapses to `Expr::Opaque`.
#[derive(Debug, Clone)]
pub enum Expr {
    /// A bare identifier: `AppConfig`.
    Ident(String),
    /// A qualified/selector identifier: `corev1.ConfigMap` or `AppConfig.Name`.
    Selector(Box<Expr>, String),
    /// `*T`
    Pointer(Box<Expr>),
    /// `[]T`
    Slice(Box<Expr>),
    /// `&expr`
    Unary(UnaryOp, Box<Expr>),
    /// `Type{ Field: Value, ... }` or `Type{ a, b, c }`
    CompositeLit {
        typ: Option<Box<Expr>>,
        elts: Vec<Element>,
    },
    BasicLit(Literal),
    /// `f(args...)` — arguments are still walked for dependency extraction.
    Call(Box<Expr>, Vec<Expr>),
    /// Anything the grammar above doesn't model; still traversed for
    /// identifiers so dependency extraction stays conservative.
    Opaque(Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    AddressOf,
}

#[derive(Debug, Clone)]
pub enum Literal {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// One element of a composite literal: either positional or keyed
/// (`Key: Value`). `key` is `None` for positional elements such as
/// slice literal entries.
#[derive(Debug, Clone)]
pub struct Element {
    pub key: Option<String>,
    pub value: Expr,
}

impl Expr {
    /// The rightmost identifier of a selector chain, and its qualifying
    /// alias if the expression was qualified. Unwraps `Pointer`/`Slice`
    /// wrappers first.
    pub fn kind_qualifier(&self) -> Option<(Option<String>, String)> {
        match self.unwrap_pointer() {
            Expr::Ident(name) => Some((None, name.clone())),
            Expr::Selector(base, name) => match base.unwrap_pointer() {
                Expr::Ident(alias) => Some((Some(alias.clone()), name.clone())),
                _ => Some((None, name.clone())),
            },
            _ => None,
        }
    }

    fn unwrap_pointer(&self) -> &Expr {
        match self {
            Expr::Pointer(inner) => inner.unwrap_pointer(),
            other => other,
        }
    }

    /// Collect every bare identifier and every left-most selector base
    /// referenced anywhere in this expression tree, per the
    /// dependency-extraction rule below. Order of first occurrence is preserved.
    pub fn collect_identifier_bases(&self, out: &mut Vec<String>) {
        match self {
            Expr::Ident(name) => push_unique(out, name),
            Expr::Selector(base, _) => {
                // Only the left-most base of a selector chain is a reference
                // to a top-level name; `AppConfig.Name` depends on
                // `AppConfig`, not on a (nonexistent) top-level `Name`.
                match base.leftmost_base() {
                    Some(name) => push_unique(out, &name),
                    None => base.collect_identifier_bases(out),
                }
            }
            Expr::Pointer(inner) | Expr::Slice(inner) | Expr::Unary(_, inner) => {
                inner.collect_identifier_bases(out)
            }
            Expr::CompositeLit { typ: _, elts } => {
                // `typ` names a *type* (the literal's own kind, or a
                // nested struct type) — never a top-level value binding —
                // so it is deliberately not traversed here.
                for e in elts {
                    e.value.collect_identifier_bases(out);
                }
            }
            Expr::Call(callee, args) => {
                callee.collect_identifier_bases(out);
                for a in args {
                    a.collect_identifier_bases(out);
                }
            }
            Expr::Opaque(children) => {
                for c in children {
                    c.collect_identifier_bases(out);
                }
            }
            Expr::BasicLit(_) => {}
        }
    }

    fn leftmost_base(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.clone()),
            Expr::Selector(base, _) => base.leftmost_base(),
            _ => None,
        }
    }
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|x| x == name) {
        out.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Expr {
        Expr::Ident(s.to_string())
    }

    #[test]
    fn kind_qualifier_unwraps_pointer_and_selector() {
        let e = Expr::Pointer(Box::new(Expr::Selector(
            Box::new(ident("corev1")),
            "ConfigMap".to_string(),
        )));
        assert_eq!(
            e.kind_qualifier(),
            Some((Some("corev1".to_string()), "ConfigMap".to_string()))
        );
    }

    #[test]
    fn selector_dependency_is_only_the_base() {
        let e = Expr::Selector(Box::new(ident("AppConfig")), "Name".to_string());
        let mut out = vec![];
        e.collect_identifier_bases(&mut out);
        assert_eq!(out, vec!["AppConfig".to_string()]);
    }

    #[test]
    fn dependencies_deduplicate_preserving_first_occurrence() {
        let e = Expr::CompositeLit {
            typ: None,
            elts: vec![
                Element {
                    key: Some("A".into()),
                    value: ident("Foo"),
                },
                Element {
                    key: Some("B".into()),
                    value: ident("Foo"),
                },
            ],
        };
        let mut out = vec![];
        e.collect_identifier_bases(&mut out);
        assert_eq!(out, vec!["Foo".to_string()]);
    }
}
