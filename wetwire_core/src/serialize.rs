//! Component E — the serializer.
//!
//! Turns a discovered `Resource`'s initializer expression into a
//! canonical manifest `Value`, then renders that as YAML or JSON.
//! Canonicalization covers:
//!
//!  1. PascalCase Go field names -> camelCase wire keys.
//!  2. `Name`/`Namespace`/`Labels`/`Annotations` fields lift into a
//!     synthesized `metadata` map rather than staying at top level.
//!  3. `apiVersion`/`kind`/`metadata` are always emitted first, in that
//!     order, ahead of the resource's own fields in declaration order.
//!  4. Zero-value fields (see `Value::is_zero`) are elided, post-order,
//!     so an emptied-out parent map or list is itself elided.

use crate::ast::{Element, Expr, Literal};
use crate::discover::Resource;
use crate::value::{OrderedMap, Value};

/// Fields that are moved from the resource's top-level initializer
/// into the synthesized `metadata` map instead of staying at the top
/// level of the manifest body. `Name` is excluded: `metadata.name` is
/// always derived from the Go symbol name (see `canonical_wire_name`),
/// never from a declared `Name` field.
const METADATA_FIELDS: &[&str] = &["Namespace", "Labels", "Annotations"];

fn camel_case(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Rewrite a Go symbol name to its wire name: insert `-` before each
/// uppercase letter after the first position, then lowercase the
/// whole thing. `MyDeployment` -> `my-deployment`.
pub fn canonical_wire_name(symbol: &str) -> String {
    let mut out = String::new();
    for (i, c) in symbol.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a parsed Go expression into a manifest `Value`. Identifiers,
/// selectors and calls that don't resolve to a literal collapse to
/// `Value::Null` rather than failing the whole resource — the
/// serializer is best-effort over whatever the parser could model.
fn expr_to_value(expr: &Expr) -> Value {
    match expr {
        Expr::BasicLit(Literal::String(s)) => Value::String(s.clone()),
        Expr::BasicLit(Literal::Int(i)) => Value::Int(*i),
        Expr::BasicLit(Literal::Float(f)) => Value::Float(*f),
        Expr::BasicLit(Literal::Bool(b)) => Value::Bool(*b),
        Expr::Unary(_, inner) => expr_to_value(inner),
        Expr::Pointer(inner) | Expr::Slice(inner) => expr_to_value(inner),
        Expr::CompositeLit { elts, .. } => composite_to_value(elts),
        Expr::Ident(_) | Expr::Selector(_, _) | Expr::Call(_, _) | Expr::Opaque(_) => Value::Null,
    }
}

fn composite_to_value(elts: &[Element]) -> Value {
    if elts.is_empty() {
        // An empty composite literal is ambiguous between `{}` and
        // `[]`; a map reads better as the default since it elides
        // cleanly either way.
        return Value::map();
    }
    if elts.iter().all(|e| e.key.is_some()) {
        let mut map = OrderedMap::new();
        for e in elts {
            let key = e.key.clone().unwrap();
            map.insert(camel_case(&key), expr_to_value(&e.value));
        }
        Value::Map(map)
    } else {
        Value::List(elts.iter().map(|e| expr_to_value(&e.value)).collect())
    }
}

/// Recursively drop zero-value entries from maps and lists, post-order
/// — a map that becomes empty once its own zero-value children are
/// dropped is itself a zero value, and is dropped by the caller in turn.
fn elide_zero_values(value: Value) -> Value {
    match value {
        Value::Map(m) => {
            let mut out = OrderedMap::new();
            for (k, v) in m.0 {
                let v = elide_zero_values(v);
                if !v.is_zero() {
                    out.insert(k, v);
                }
            }
            Value::Map(out)
        }
        Value::List(items) => {
            let out: Vec<Value> = items
                .into_iter()
                .map(elide_zero_values)
                .filter(|v| !v.is_zero())
                .collect();
            Value::List(out)
        }
        other => other,
    }
}

/// Build the canonical manifest document for one resource: apiVersion,
/// kind and metadata first, then the resource's own fields.
pub fn canonicalize(resource: &Resource) -> Value {
    let body = expr_to_value(&resource.literal);
    let mut fields = match body {
        Value::Map(m) => m,
        _ => OrderedMap::new(),
    };

    let mut metadata = OrderedMap::new();
    // metadata.name always comes from the symbol name, canonicalized —
    // only declarative metadata (the binding itself) is extracted; any
    // `Name` field written inside the initializer is irrelevant to this
    // path and is dropped below along with the other metadata fields.
    metadata.insert("name", Value::String(canonical_wire_name(&resource.name)));
    for field in METADATA_FIELDS {
        let key = camel_case(field);
        if let Some(v) = fields.get(&key).cloned() {
            metadata.insert(key, v);
        }
    }
    // Rebuild `fields` without the metadata-bound entries (including
    // the now-discarded `Name`).
    let remaining: Vec<(String, Value)> = fields
        .0
        .into_iter()
        .filter(|(k, _)| k != "name" && !METADATA_FIELDS.iter().any(|f| camel_case(f) == *k))
        .collect();

    let mut out = OrderedMap::new();
    out.insert("apiVersion", Value::String(resource.api_version.clone()));
    out.insert("kind", Value::String(resource.kind.clone()));
    out.insert("metadata", Value::Map(metadata));
    for (k, v) in remaining {
        out.insert(k, v);
    }

    elide_zero_values(Value::Map(out))
}

pub fn to_yaml(resource: &Resource) -> crate::Result<String> {
    let value = canonicalize(resource);
    let yaml_value: serde_yaml::Value = (&value).into();
    Ok(serde_yaml::to_string(&yaml_value)?)
}

pub fn to_json(resource: &Resource) -> crate::Result<String> {
    let value = canonicalize(resource);
    let json_value: serde_json::Value = (&value).into();
    Ok(serde_json::to_string_pretty(&json_value)?)
}

/// Render every resource as one `---`-separated multi-document YAML
/// stream, in the order given (the driver is responsible for having
/// already applied the dependency order).
pub fn to_multi_yaml(resources: &[Resource]) -> crate::Result<String> {
    let mut out = String::new();
    for resource in resources {
        out.push_str("---\n");
        out.push_str(&to_yaml(resource)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resource_from(src: &str, name: &str) -> Resource {
        use crate::discover::{DiscoverOptions, Discoverer};
        let d = Discoverer::new(DiscoverOptions::default());
        let resources = d.discover_source(PathBuf::from("t.go"), src).unwrap();
        resources.into_iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn canonicalizes_symbol_name_into_metadata_and_camel_cases_fields() {
        let r = resource_from(
            r#"var MyConfigMap = &corev1.ConfigMap{ Name: "my-config", Data: map[string]string{"key": "value"} }"#,
            "MyConfigMap",
        );
        let v = canonicalize(&r);
        let m = v.as_map().unwrap();
        assert_eq!(m.get("apiVersion").unwrap().as_str(), Some("v1"));
        assert_eq!(m.get("kind").unwrap().as_str(), Some("ConfigMap"));
        let metadata = m.get("metadata").unwrap().as_map().unwrap();
        // The declared `Name: "my-config"` field is irrelevant; only the
        // canonicalized symbol name ends up in metadata.name (S1).
        assert_eq!(metadata.get("name").unwrap().as_str(), Some("my-config-map"));
        assert!(m.get("data").is_some());
        assert!(m.get("name").is_none());
    }

    #[test]
    fn zero_value_fields_are_elided() {
        let r = resource_from(
            r#"var Empty = &corev1.ConfigMap{ Name: "empty", Data: map[string]string{} }"#,
            "Empty",
        );
        let v = canonicalize(&r);
        let m = v.as_map().unwrap();
        assert!(m.get("data").is_none());
    }

    #[test]
    fn metadata_name_ignores_absence_of_an_explicit_name_field_too() {
        let r = resource_from(
            r#"var WebAppConfig = &corev1.ConfigMap{ Data: map[string]string{"k": "v"} }"#,
            "WebAppConfig",
        );
        let v = canonicalize(&r);
        let metadata = v.as_map().unwrap().get("metadata").unwrap().as_map().unwrap();
        assert_eq!(metadata.get("name").unwrap().as_str(), Some("web-app-config"));
    }

    #[test]
    fn wire_name_canonicalization_examples() {
        assert_eq!(canonical_wire_name("MyDeployment"), "my-deployment");
        assert_eq!(canonical_wire_name("MyConfigMap"), "my-config-map");
        assert_eq!(canonical_wire_name("webApp"), "web-app");
    }
}
