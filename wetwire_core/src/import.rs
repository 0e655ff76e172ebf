//! Component F — the importer.
//!
//! The inverse of `serialize`: given parsed manifest documents, pick a
//! package alias/import path for each `apiVersion`, and render a Go
//! source file of `var` declarations that would discover back to
//! equivalent resources. Best-effort by construction — the generated
//! source is meant to be a starting point a human edits, not a
//! byte-exact inverse of any particular original source file.

use serde::Deserialize;

use crate::value::{OrderedMap, Value};

#[derive(Debug, Fail)]
pub enum ImportErrorKind {
    #[fail(display = "manifest has no top-level map")]
    NotAMap,
    #[fail(display = "manifest is missing required field {:?}", _0)]
    MissingField(&'static str),
    #[fail(display = "{}: {}", _0, _1)]
    Parse(String, String),
}

pub type ImportError = ImportErrorKind;

/// Map an `apiVersion`'s group to the short package name used to build
/// its alias, per the fixed group->short-name table. Unrecognized
/// groups fall back to their first dotted component.
fn short_name_for_group(group: &str) -> String {
    match group {
        "" => "core".to_string(),
        "apps" => "apps".to_string(),
        "batch" => "batch".to_string(),
        "networking.k8s.io" => "networking".to_string(),
        "rbac.authorization.k8s.io" => "rbac".to_string(),
        "storage.k8s.io" => "storage".to_string(),
        "policy" => "policy".to_string(),
        "autoscaling" => "autoscaling".to_string(),
        other => other.split('.').next().unwrap_or(other).to_string(),
    }
}

/// `(package_alias, import_path)` for every builtin group, keyed by
/// the apiVersion that group serves. Mirrors `registry::builtin_types`'s
/// grouping, but only importer-facing code needs to know the module
/// paths resources get imported from.
fn import_path_for_alias(alias: &str) -> String {
    match alias {
        "corev1" => "k8s.io/api/core/v1".to_string(),
        "appsv1" => "k8s.io/api/apps/v1".to_string(),
        "batchv1" => "k8s.io/api/batch/v1".to_string(),
        "networkingv1" => "k8s.io/api/networking/v1".to_string(),
        "rbacv1" => "k8s.io/api/rbac/v1".to_string(),
        "storagev1" => "k8s.io/api/storage/v1".to_string(),
        "policyv1" => "k8s.io/api/policy/v1".to_string(),
        "autoscalingv1" => "k8s.io/api/autoscaling/v1".to_string(),
        "autoscalingv2" => "k8s.io/api/autoscaling/v2".to_string(),
        other => format!("k8s.io/api/{}", other),
    }
}

/// Split `apiVersion` into `(group, version, alias)`: `""`/`v1` ->
/// `("", "v1", "corev1")`; `"apps/v1"` -> `("apps", "v1", "appsv1")`.
fn resolve_alias(api_version: &str) -> (String, String, String) {
    let (group, version) = match api_version.split_once('/') {
        Some((g, v)) => (g.to_string(), v.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    let short = short_name_for_group(&group);
    let alias = format!("{}{}", short, version);
    (group, version, alias)
}

#[derive(Clone)]
pub struct ImportOptions {
    /// Go package clause for the generated file.
    pub package: String,
    /// Prepended to every synthesized symbol name, e.g. `"Prod"` ->
    /// `ProdWebAppConfigMap`.
    pub prefix: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            package: "manifests".to_string(),
            prefix: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImportResult {
    pub source: String,
    pub resource_count: usize,
    /// Unmodeled detail the generic/specialized field handlers couldn't
    /// express, one entry per occurrence.
    pub warnings: Vec<String>,
}

struct ImportedDoc {
    symbol: String,
    package_alias: String,
    import_path: String,
    kind: String,
    name: String,
    map: OrderedMap,
}

/// Parse a multi-document manifest byte stream and reconstruct a
/// single synthetic source file: empty documents are skipped, and any
/// document missing `apiVersion` or `kind` is dropped (not fatal to
/// the rest of the stream).
pub fn import_manifests(bytes: &[u8], options: &ImportOptions) -> crate::Result<ImportResult> {
    let text = std::str::from_utf8(bytes).map_err(|e| ImportErrorKind::Parse("utf8".to_string(), e.to_string()))?;

    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| ImportErrorKind::Parse("yaml".to_string(), e.to_string()))?;
        if value.is_null() {
            continue;
        }
        docs.push(Value::from(&value));
    }

    let mut warnings = Vec::new();
    let mut imported = Vec::new();
    for doc in &docs {
        match prepare_doc(doc, options) {
            Ok(d) => imported.push(d),
            Err(e) => warnings.push(e.to_string()),
        }
    }

    let mut import_lines: Vec<(String, String)> = imported
        .iter()
        .map(|d| (d.package_alias.clone(), d.import_path.clone()))
        .collect();
    import_lines.sort();
    import_lines.dedup();

    let mut source = String::new();
    source.push_str(&format!("package {}\n\n", options.package));
    if !import_lines.is_empty() {
        source.push_str("import (\n");
        for (alias, path) in &import_lines {
            source.push_str(&format!("\t{} \"{}\"\n", alias, path));
        }
        source.push_str(")\n\n");
    }

    for d in &imported {
        let fields = synthesize_fields(&d.kind, &d.name, &d.map, &mut warnings);
        source.push_str(&format!("var {} = &{}.{}{{\n", d.symbol, d.package_alias, d.kind));
        for line in fields.lines() {
            source.push('\t');
            source.push_str(line);
            source.push('\n');
        }
        source.push_str("}\n\n");
    }

    Ok(ImportResult {
        source,
        resource_count: imported.len(),
        warnings,
    })
}

/// Reconstruct a Go source declaration from a single manifest document
/// — a convenience wrapper over `import_manifests` for callers that
/// already have exactly one document in hand.
pub fn import(document: &Value, options: &ImportOptions) -> crate::Result<ImportResult> {
    let d = prepare_doc(document, options)?;
    let mut warnings = Vec::new();
    let fields = synthesize_fields(&d.kind, &d.name, &d.map, &mut warnings);

    let mut source = String::new();
    source.push_str(&format!("package {}\n\n", options.package));
    source.push_str(&format!("import {} \"{}\"\n\n", d.package_alias, d.import_path));
    source.push_str(&format!("var {} = &{}.{}{{\n", d.symbol, d.package_alias, d.kind));
    for line in fields.lines() {
        source.push('\t');
        source.push_str(line);
        source.push('\n');
    }
    source.push_str("}\n");

    Ok(ImportResult {
        source,
        resource_count: 1,
        warnings,
    })
}

fn prepare_doc(document: &Value, options: &ImportOptions) -> crate::Result<ImportedDoc> {
    let map = document.as_map().ok_or(ImportErrorKind::NotAMap)?;

    let api_version = map
        .get("apiVersion")
        .and_then(Value::as_str)
        .ok_or(ImportErrorKind::MissingField("apiVersion"))?;
    let kind = map
        .get("kind")
        .and_then(Value::as_str)
        .ok_or(ImportErrorKind::MissingField("kind"))?;
    let name = map
        .get("metadata")
        .and_then(Value::as_map)
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .ok_or(ImportErrorKind::MissingField("metadata.name"))?;

    let (_, _, package_alias) = resolve_alias(api_version);
    let import_path = import_path_for_alias(&package_alias);
    let symbol = synthesize_symbol(name, kind, options.prefix.as_deref());

    Ok(ImportedDoc {
        symbol,
        package_alias,
        import_path,
        kind: kind.to_string(),
        name: name.to_string(),
        map: map.clone(),
    })
}

/// Always PascalCase(name) concatenated with the kind, prefixed by an
/// optional caller-provided prefix.
fn synthesize_symbol(name: &str, kind: &str, prefix: Option<&str>) -> String {
    let base = format!("{}{}", pascal_case(name), kind);
    match prefix {
        Some(p) if !p.is_empty() => format!("{}{}", p, base),
        _ => base,
    }
}

fn pascal_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c == '.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Render the resource's own fields (everything but apiVersion/kind)
/// as Go composite-literal element lines, folding `metadata.name` (and
/// any other metadata sub-fields) back to top-level `Name`/etc. fields
/// — the exact inverse of `serialize::canonicalize`.
fn synthesize_fields(kind: &str, name: &str, map: &OrderedMap, warnings: &mut Vec<String>) -> String {
    match kind {
        "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" => {
            workload_fields(kind, name, map, warnings)
        }
        "Service" => service_fields(name, map, warnings),
        "ConfigMap" | "Secret" => generic_fields(name, map),
        _ => generic_fields(name, map),
    }
}

fn metadata_fields(name: &str, map: &OrderedMap) -> String {
    let mut out = String::new();
    out.push_str(&format!("Name: {:?},\n", name));
    if let Some(metadata) = map.get("metadata").and_then(Value::as_map) {
        for (k, v) in metadata.iter() {
            if k == "name" {
                continue;
            }
            out.push_str(&format!("{}: {},\n", pascal_case(k), value_to_go(v)));
        }
    }
    out
}

fn generic_fields(name: &str, map: &OrderedMap) -> String {
    let mut out = metadata_fields(name, map);
    for (k, v) in map.iter() {
        if k == "apiVersion" || k == "kind" || k == "metadata" {
            continue;
        }
        out.push_str(&format!("{}: {},\n", pascal_case(k), value_to_go(v)));
    }
    out.trim_end_matches('\n').to_string()
}

/// Deployment/StatefulSet/DaemonSet/ReplicaSet share the
/// selector+template `spec` shape; render `Spec.Selector`,
/// `Spec.Template` (with its pod `Containers`) explicitly rather than
/// through the generic map path, and surface anything under `spec`
/// this handler doesn't recognize as a warning.
fn workload_fields(kind: &str, name: &str, map: &OrderedMap, warnings: &mut Vec<String>) -> String {
    let mut out = metadata_fields(name, map);

    let spec = match map.get("spec").and_then(Value::as_map) {
        Some(s) => s,
        None => return out.trim_end_matches('\n').to_string(),
    };

    let mut spec_lines = String::new();
    if let Some(replicas) = spec.get("replicas") {
        spec_lines.push_str(&format!("Replicas: {},\n", value_to_go(replicas)));
    }
    if let Some(selector) = spec.get("selector").and_then(Value::as_map) {
        if let Some(match_labels) = selector.get("matchLabels") {
            spec_lines.push_str(&format!(
                "Selector: &metav1.LabelSelector{{MatchLabels: {}}},\n",
                value_to_go(match_labels)
            ));
        }
    }
    if let Some(template) = spec.get("template").and_then(Value::as_map) {
        spec_lines.push_str("Template: corev1.PodTemplateSpec{\n");
        if let Some(pod_spec) = template.get("spec").and_then(Value::as_map) {
            spec_lines.push_str("\tSpec: corev1.PodSpec{\n");
            if let Some(containers) = pod_spec.get("containers").and_then(Value::as_list) {
                spec_lines.push_str("\t\tContainers: []corev1.Container{\n");
                for c in containers {
                    spec_lines.push_str(&format!("\t\t\t{},\n", container_to_go(c, warnings)));
                }
                spec_lines.push_str("\t\t},\n");
            }
            spec_lines.push_str("\t},\n");
        }
        spec_lines.push_str("},\n");
    }

    for (k, _) in spec.iter() {
        if !matches!(k.as_str(), "replicas" | "selector" | "template") {
            warnings.push(format!("{} {:?}: spec.{} is not modeled by the importer", kind, name, k));
        }
    }

    out.push_str("Spec: ");
    out.push_str(&format!(
        "{}Spec{{\n{}}},\n",
        kind,
        indent(&spec_lines, 1)
    ));
    out.trim_end_matches('\n').to_string()
}

fn container_to_go(value: &Value, warnings: &mut Vec<String>) -> String {
    let map = match value.as_map() {
        Some(m) => m,
        None => return "corev1.Container{}".to_string(),
    };
    let mut fields = String::new();
    if let Some(n) = map.get("name").and_then(Value::as_str) {
        fields.push_str(&format!("Name: {:?}, ", n));
    }
    if let Some(img) = map.get("image").and_then(Value::as_str) {
        fields.push_str(&format!("Image: {:?}, ", img));
    }
    if let Some(ports) = map.get("ports").and_then(Value::as_list) {
        let rendered: Vec<String> = ports
            .iter()
            .filter_map(|p| p.as_map())
            .map(|p| {
                let port = p.get("containerPort").map(value_to_go).unwrap_or_else(|| "0".to_string());
                format!("{{ContainerPort: {}}}", port)
            })
            .collect();
        fields.push_str(&format!("Ports: []corev1.ContainerPort{{{}}}, ", rendered.join(", ")));
    }
    if map.get("envFrom").is_some() {
        warnings.push("container envFrom is not modeled by the importer".to_string());
    }
    format!("corev1.Container{{{}}}", fields.trim_end_matches(", "))
}

/// Service's `spec.ports[].targetPort` is an integer-or-string union in
/// the wire format; render whichever shape the parsed value actually
/// carries.
fn service_fields(name: &str, map: &OrderedMap, warnings: &mut Vec<String>) -> String {
    let mut out = metadata_fields(name, map);
    let spec = match map.get("spec").and_then(Value::as_map) {
        Some(s) => s,
        None => return out.trim_end_matches('\n').to_string(),
    };

    let mut spec_lines = String::new();
    if let Some(t) = spec.get("type").and_then(Value::as_str) {
        spec_lines.push_str(&format!("Type: corev1.ServiceType({:?}),\n", t));
    }
    if let Some(selector) = spec.get("selector") {
        spec_lines.push_str(&format!("Selector: {},\n", value_to_go(selector)));
    }
    if let Some(ports) = spec.get("ports").and_then(Value::as_list) {
        spec_lines.push_str("Ports: []corev1.ServicePort{\n");
        for p in ports {
            if let Some(pm) = p.as_map() {
                let mut fields = String::new();
                if let Some(port) = pm.get("port") {
                    fields.push_str(&format!("Port: {}, ", value_to_go(port)));
                }
                if let Some(target) = pm.get("targetPort") {
                    let rendered = match target {
                        Value::Int(i) => format!("intstr.FromInt({})", i),
                        Value::String(s) => format!("intstr.FromString({:?})", s),
                        other => value_to_go(other),
                    };
                    fields.push_str(&format!("TargetPort: {}, ", rendered));
                }
                spec_lines.push_str(&format!("\t{{{}}},\n", fields.trim_end_matches(", ")));
            }
        }
        spec_lines.push_str("},\n");
    }

    for (k, _) in spec.iter() {
        if !matches!(k.as_str(), "type" | "selector" | "ports") {
            warnings.push(format!("Service {:?}: spec.{} is not modeled by the importer", name, k));
        }
    }

    out.push_str(&format!("Spec: corev1.ServiceSpec{{\n{}}},\n", indent(&spec_lines, 1)));
    out.trim_end_matches('\n').to_string()
}

fn indent(text: &str, levels: usize) -> String {
    let prefix = "\t".repeat(levels);
    text.lines()
        .map(|l| format!("{}{}\n", prefix, l))
        .collect()
}

fn value_to_go(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("{:?}", s),
        Value::List(items) => {
            let rendered: Vec<String> = items.iter().map(value_to_go).collect();
            format!("[]interface{{}}{{{}}}", rendered.join(", "))
        }
        Value::Map(m) => {
            let rendered: Vec<String> = m
                .iter()
                .map(|(k, v)| format!("{:?}: {}", k, value_to_go(v)))
                .collect();
            format!("map[string]interface{{}}{{{}}}", rendered.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OrderedMap;

    fn config_map_document() -> Value {
        let mut metadata = OrderedMap::new();
        metadata.insert("name", Value::String("web-app".to_string()));

        let mut data = OrderedMap::new();
        data.insert("key", Value::String("value".to_string()));

        let mut root = OrderedMap::new();
        root.insert("apiVersion", Value::String("v1".to_string()));
        root.insert("kind", Value::String("ConfigMap".to_string()));
        root.insert("metadata", Value::Map(metadata));
        root.insert("data", Value::Map(data));
        Value::Map(root)
    }

    #[test]
    fn imports_a_known_kind_into_a_var_declaration() {
        let doc = config_map_document();
        let result = import(&doc, &ImportOptions::default()).unwrap();
        assert!(result.source.contains("import corev1 \"k8s.io/api/core/v1\""));
        assert!(result.source.contains("var WebAppConfigMap = &corev1.ConfigMap{"));
        assert!(result.source.contains("Name: \"web-app\""));
    }

    #[test]
    fn symbol_always_concatenates_name_and_kind() {
        // Even when the name already happens to end with the kind text.
        let mut metadata = OrderedMap::new();
        metadata.insert("name", Value::String("my-config-map".to_string()));
        let mut root = OrderedMap::new();
        root.insert("apiVersion", Value::String("v1".to_string()));
        root.insert("kind", Value::String("ConfigMap".to_string()));
        root.insert("metadata", Value::Map(metadata));
        let result = import(&Value::Map(root), &ImportOptions::default()).unwrap();
        assert!(result.source.contains("var MyConfigMapConfigMap ="));
    }

    #[test]
    fn prefix_is_prepended_to_the_symbol() {
        let doc = config_map_document();
        let options = ImportOptions {
            prefix: Some("Prod".to_string()),
            ..ImportOptions::default()
        };
        let result = import(&doc, &options).unwrap();
        assert!(result.source.contains("var ProdWebAppConfigMap ="));
    }

    #[test]
    fn unknown_api_version_still_gets_a_derived_alias() {
        let mut root = OrderedMap::new();
        root.insert("apiVersion", Value::String("example.com/v1".to_string()));
        root.insert("kind", Value::String("Widget".to_string()));
        let mut metadata = OrderedMap::new();
        metadata.insert("name", Value::String("x".to_string()));
        root.insert("metadata", Value::Map(metadata));
        let result = import(&Value::Map(root), &ImportOptions::default()).unwrap();
        assert!(result.source.contains("examplev1.Widget"));
    }

    #[test]
    fn missing_metadata_name_is_an_error() {
        let mut root = OrderedMap::new();
        root.insert("apiVersion", Value::String("v1".to_string()));
        root.insert("kind", Value::String("ConfigMap".to_string()));
        assert!(import(&Value::Map(root), &ImportOptions::default()).is_err());
    }

    #[test]
    fn import_manifests_skips_empty_documents_and_dedupes_imports() {
        let text = "---\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n";
        let result = import_manifests(text.as_bytes(), &ImportOptions::default()).unwrap();
        assert_eq!(result.resource_count, 2);
        assert_eq!(result.source.matches("corev1 \"k8s.io/api/core/v1\"").count(), 1);
    }

    #[test]
    fn import_manifests_warns_on_documents_missing_required_fields() {
        let text = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\nfoo: bar\n";
        let result = import_manifests(text.as_bytes(), &ImportOptions::default()).unwrap();
        assert_eq!(result.resource_count, 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn service_target_port_renders_as_int_or_string() {
        let mut metadata = OrderedMap::new();
        metadata.insert("name", Value::String("web".to_string()));
        let mut port = OrderedMap::new();
        port.insert("port", Value::Int(80));
        port.insert("targetPort", Value::String("http".to_string()));
        let mut spec = OrderedMap::new();
        spec.insert("ports", Value::List(vec![Value::Map(port)]));
        let mut root = OrderedMap::new();
        root.insert("apiVersion", Value::String("v1".to_string()));
        root.insert("kind", Value::String("Service".to_string()));
        root.insert("metadata", Value::Map(metadata));
        root.insert("spec", Value::Map(spec));
        let result = import(&Value::Map(root), &ImportOptions::default()).unwrap();
        assert!(result.source.contains("intstr.FromString(\"http\")"));
    }
}
