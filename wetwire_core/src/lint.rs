//! Component J — the linter and fixer.
//!
//! Inspects already-discovered resources against a small catalog of
//! rules and reports `Violation`s; `Fixer` offers best-effort
//! auto-rewrites for the subset of rules that have an unambiguous fix.
//!
//! Rule identifiers follow a `WK80xx`/`WK81xx` numbering: `WK80xx` are
//! structural/style rules over a single resource, `WK81xx` are
//! cross-resource/referential rules that need the whole resource set.

use std::path::PathBuf;

use crate::discover::Resource;
use crate::graph::validate_references;
use crate::registry::TypeRegistry;
use crate::serialize::canonicalize;
use crate::token::Line;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub id: &'static str,
    pub name: &'static str,
    pub severity: Severity,
    pub description: &'static str,
    /// Whether `Fixer` implementations may propose a rewrite for this
    /// rule. Referential rules (`WK81xx`) never are — resolving them
    /// requires a human decision about which resource was meant.
    pub auto_fixable: bool,
}

pub const RULES: &[Rule] = &[
    Rule {
        id: "WK8001",
        name: "empty-data-map",
        severity: Severity::Warning,
        description: "ConfigMap/Secret has no data after zero-value elision",
        auto_fixable: false,
    },
    Rule {
        id: "WK8002",
        name: "dead-name-field",
        severity: Severity::Info,
        description: "resource declares an explicit Name field; metadata.name is always the canonicalized symbol name, so the field is ignored",
        auto_fixable: true,
    },
    Rule {
        id: "WK8101",
        name: "duplicate-resource-name",
        severity: Severity::Error,
        description: "two resources in the same build declare the same name",
        auto_fixable: false,
    },
    Rule {
        id: "WK8102",
        name: "unresolved-dependency",
        severity: Severity::Error,
        description: "a resource's initializer references a name no discovered resource declares",
        auto_fixable: false,
    },
];

#[derive(Debug, Clone)]
pub struct Violation {
    pub rule: &'static str,
    pub severity: Severity,
    pub resource: String,
    pub file: PathBuf,
    pub line: Line,
    pub message: String,
}

#[derive(Clone)]
pub struct LintOptions {
    pub registry: TypeRegistry,
    /// Rule ids that never run, regardless of `RULES`.
    pub disabled: Vec<&'static str>,
    /// Violations below this severity are dropped before `lint` returns.
    pub min_severity: Severity,
}

impl Default for LintOptions {
    fn default() -> Self {
        LintOptions {
            registry: TypeRegistry::with_builtins(),
            disabled: Vec::new(),
            min_severity: Severity::Info,
        }
    }
}

impl LintOptions {
    fn enabled(&self, id: &str) -> bool {
        !self.disabled.iter().any(|r| *r == id)
    }
}

pub fn lint(resources: &[Resource], options: &LintOptions) -> Vec<Violation> {
    let mut out = Vec::new();

    if options.enabled("WK8001") {
        for r in resources {
            if matches!(r.kind.as_str(), "ConfigMap" | "Secret") {
                let v = canonicalize(r);
                let has_data = v
                    .as_map()
                    .map(|m| m.get("data").is_some() || m.get("stringData").is_some())
                    .unwrap_or(false);
                if !has_data {
                    out.push(violation(&RULES[0], r, "no data/stringData survived canonicalization".to_string()));
                }
            }
        }
    }

    if options.enabled("WK8002") {
        for r in resources {
            if has_explicit_name(r) {
                out.push(violation(
                    &RULES[1],
                    r,
                    format!(
                        "Name field is ignored; metadata.name will be {:?}",
                        crate::serialize::canonical_wire_name(&r.name)
                    ),
                ));
            }
        }
    }

    if options.enabled("WK8101") {
        out.extend(duplicate_name_violations(resources));
    }

    if options.enabled("WK8102") {
        if let Err(e) = validate_references(resources) {
            // validate_references stops at the first unresolved reference;
            // surface it as a lint violation rather than a fatal error.
            out.push(Violation {
                rule: "WK8102",
                severity: Severity::Error,
                resource: String::new(),
                file: PathBuf::new(),
                line: 0,
                message: e.to_string(),
            });
        }
    }

    out.retain(|v| v.severity >= options.min_severity);
    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}

fn violation(rule: &Rule, r: &Resource, message: String) -> Violation {
    Violation {
        rule: rule.id,
        severity: rule.severity,
        resource: r.name.clone(),
        file: r.file.clone(),
        line: r.line,
        message,
    }
}

fn has_explicit_name(r: &Resource) -> bool {
    use crate::ast::{Expr, Literal};
    if let Expr::CompositeLit { elts, .. } = &r.literal {
        elts.iter()
            .any(|e| e.key.as_deref() == Some("Name") && matches!(e.value, Expr::BasicLit(Literal::String(_))))
    } else {
        false
    }
}

fn duplicate_name_violations(resources: &[Resource]) -> Vec<Violation> {
    let mut by_name: std::collections::HashMap<&str, Vec<&Resource>> = std::collections::HashMap::new();
    for r in resources {
        by_name.entry(r.name.as_str()).or_default().push(r);
    }
    let mut out = Vec::new();
    for (name, group) in by_name {
        if group.len() > 1 {
            for r in &group {
                out.push(Violation {
                    rule: "WK8101",
                    severity: Severity::Error,
                    resource: name.to_string(),
                    file: r.file.clone(),
                    line: r.line,
                    message: format!("{:?} is declared {} times", name, group.len()),
                });
            }
        }
    }
    out
}

/// A proposed text-level rewrite for one violation. `Fixer` only
/// produces fixes for rules whose `Rule::auto_fixable` is set;
/// referential rules (`WK81xx`) never are, since resolving them
/// requires a human decision about which resource was meant.
#[derive(Debug, Clone)]
pub struct Fix {
    pub rule: &'static str,
    pub resource: String,
    pub description: String,
    /// The line to remove from the resource's initializer, when the
    /// fix is a deletion (e.g. the dead `Name:` field for `WK8002`).
    pub remove_line_containing: Option<String>,
}

pub trait Fixer {
    fn fix(&self, resources: &[Resource], violations: &[Violation]) -> Vec<Fix>;
}

/// The built-in fixer: for every resource flagged by `WK8002`,
/// proposes deleting its dead `Name:` field from source, since
/// `metadata.name` never reads it.
pub struct DefaultFixer;

impl Fixer for DefaultFixer {
    fn fix(&self, resources: &[Resource], violations: &[Violation]) -> Vec<Fix> {
        violations
            .iter()
            .filter(|v| RULES.iter().any(|r| r.id == v.rule && r.auto_fixable))
            .filter_map(|v| {
                resources.iter().find(|r| r.name == v.resource).map(|r| Fix {
                    rule: v.rule,
                    resource: r.name.clone(),
                    description: format!("remove the dead Name field from {}", r.name),
                    remove_line_containing: Some("Name:".to_string()),
                })
            })
            .collect()
    }
}

/// Apply a batch of `Fix`es that target line deletions to one
/// resource's source file, returning the rewritten text. Lines are
/// matched by substring, which is sufficient for the one shape
/// `DefaultFixer` currently proposes (`Name: "...",`) and keeps the
/// fixer from needing a full pretty-printer round trip through the
/// parser just to drop a field.
pub fn apply_fixes(source: &str, fixes: &[Fix]) -> String {
    let needles: Vec<&str> = fixes
        .iter()
        .filter_map(|f| f.remove_line_containing.as_deref())
        .collect();
    if needles.is_empty() {
        return source.to_string();
    }
    source
        .lines()
        .filter(|line| !needles.iter().any(|n| line.contains(n)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output formats for a batch of violations: plain text (one line
/// each), JSON (an array of objects), or CI-annotated text in the
/// `::<level> file=...,line=...::message` convention most CI systems
/// that consume inline annotations already understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Ci,
}

/// Only violations at or above `min_severity` are rendered.
pub fn format_violations(violations: &[Violation], min_severity: Severity, format: Format) -> String {
    let filtered: Vec<&Violation> = violations.iter().filter(|v| v.severity >= min_severity).collect();
    match format {
        Format::Text => filtered
            .iter()
            .map(|v| {
                format!(
                    "{}:{}: {} [{:?}] {}: {}",
                    v.file.display(),
                    v.line,
                    v.rule,
                    v.severity,
                    v.resource,
                    v.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Format::Json => {
            let entries: Vec<serde_json::Value> = filtered
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "rule": v.rule,
                        "severity": format!("{:?}", v.severity).to_lowercase(),
                        "resource": v.resource,
                        "file": v.file.display().to_string(),
                        "line": v.line,
                        "message": v.message,
                    })
                })
                .collect();
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        }
        Format::Ci => filtered
            .iter()
            .map(|v| {
                let level = match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "notice",
                };
                format!(
                    "::{} file={},line={}::{} {}: {}",
                    level,
                    v.file.display(),
                    v.line,
                    v.rule,
                    v.resource,
                    v.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
