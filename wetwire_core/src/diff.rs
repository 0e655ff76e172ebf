//! Component G — the round-trip comparator.
//!
//! A path-addressed structural diff between two manifest `Value`s
//! document, plus a convenience that exercises a full
//! discover -> serialize -> import -> discover -> serialize loop over
//! one source file and reports whether it comes back unchanged.

use serde::Deserialize;

use crate::driver::{self, PipelineOptions};
use crate::import::{self, ImportOptions};
use crate::registry::TypeRegistry;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffType {
    /// Present in the left-hand (expected) value, absent on the right.
    Missing,
    /// Present on the right-hand (actual) value, absent on the left.
    Added,
    /// Present on both sides with a different value.
    Modified,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    /// Dotted path from the document root, e.g. `metadata.labels.tier`.
    pub path: String,
    pub diff_type: DiffType,
    pub left: Option<Value>,
    pub right: Option<Value>,
}

#[derive(Clone, Default)]
pub struct CompareOptions {
    /// Dotted paths to skip entirely, e.g. `metadata.annotations` for
    /// fields a cluster mutates that aren't meaningful to compare.
    pub ignore_paths: Vec<String>,
}

impl CompareOptions {
    fn ignores(&self, path: &str) -> bool {
        self.ignore_paths.iter().any(|p| p == path)
    }
}

/// Structural diff between `left` (expected) and `right` (actual).
/// Numeric comparison uses `Value::numerically_equal` so `2` and `2.0`
/// are not reported as a difference.
pub fn compare(left: &Value, right: &Value) -> Vec<Difference> {
    compare_with(left, right, &CompareOptions::default())
}

pub fn compare_with(left: &Value, right: &Value, options: &CompareOptions) -> Vec<Difference> {
    let mut out = Vec::new();
    walk("", left, right, options, &mut out);
    out
}

fn walk(path: &str, left: &Value, right: &Value, options: &CompareOptions, out: &mut Vec<Difference>) {
    if options.ignores(path) {
        return;
    }
    match (left, right) {
        (Value::Map(lm), Value::Map(rm)) => {
            for (k, lv) in lm.iter() {
                let child_path = join(path, k);
                match rm.get(k) {
                    Some(rv) => walk(&child_path, lv, rv, options, out),
                    None => out.push(Difference {
                        path: child_path,
                        diff_type: DiffType::Missing,
                        left: Some(lv.clone()),
                        right: None,
                    }),
                }
            }
            for (k, rv) in rm.iter() {
                if lm.get(k).is_none() {
                    let child_path = join(path, k);
                    if options.ignores(&child_path) {
                        continue;
                    }
                    out.push(Difference {
                        path: child_path,
                        diff_type: DiffType::Added,
                        left: None,
                        right: Some(rv.clone()),
                    });
                }
            }
        }
        (Value::List(ll), Value::List(rl)) => {
            let max = ll.len().max(rl.len());
            for i in 0..max {
                let child_path = format!("{}[{}]", path, i);
                if options.ignores(&child_path) {
                    continue;
                }
                match (ll.get(i), rl.get(i)) {
                    (Some(lv), Some(rv)) => walk(&child_path, lv, rv, options, out),
                    (Some(lv), None) => out.push(Difference {
                        path: child_path,
                        diff_type: DiffType::Missing,
                        left: Some(lv.clone()),
                        right: None,
                    }),
                    (None, Some(rv)) => out.push(Difference {
                        path: child_path,
                        diff_type: DiffType::Added,
                        left: None,
                        right: Some(rv.clone()),
                    }),
                    (None, None) => unreachable!(),
                }
            }
        }
        _ if values_equal(left, right) => {}
        _ => out.push(Difference {
            path: path.to_string(),
            diff_type: DiffType::Modified,
            left: Some(left.clone()),
            right: Some(right.clone()),
        }),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if a.is_number() && b.is_number() {
        a.numerically_equal(b)
    } else {
        a == b
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[derive(Clone)]
pub struct RoundTripOptions {
    pub registry: TypeRegistry,
    pub import: ImportOptions,
}

impl Default for RoundTripOptions {
    fn default() -> Self {
        RoundTripOptions {
            registry: TypeRegistry::with_builtins(),
            import: ImportOptions::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundTripResult {
    pub original: Vec<u8>,
    pub generated_source: String,
    pub result: Vec<u8>,
    pub equivalent: bool,
    pub differences: Vec<Difference>,
}

/// Exercise Importer -> Pipeline Driver over a manifest byte stream and
/// report whether it comes back unchanged.
///
/// 1. Parse `bytes`; an empty stream (no documents) is trivially
///    equivalent.
/// 2. Run the Importer over `bytes` to synthesize Go source, then run
///    the Pipeline Driver (in-memory, no filesystem involved) over that
///    source to regenerate manifest bytes.
/// 3. Parse both the original and regenerated streams and diff them
///    document-by-document.
pub fn round_trip(bytes: &[u8], options: &RoundTripOptions) -> crate::Result<RoundTripResult> {
    let original_docs = parse_multi_yaml(bytes)?;
    if original_docs.is_empty() {
        return Ok(RoundTripResult {
            original: bytes.to_vec(),
            generated_source: String::new(),
            result: Vec::new(),
            equivalent: true,
            differences: Vec::new(),
        });
    }

    let imported = import::import_manifests(bytes, &options.import)?;

    let pipeline_options = PipelineOptions {
        registry: options.registry.clone(),
        ..PipelineOptions::default()
    };
    let build_result = driver::build_source("round_trip.go", &imported.source, &pipeline_options)?;
    let result_bytes = build_result.output.unwrap_or_default().into_bytes();

    let result_docs = parse_multi_yaml(&result_bytes)?;
    let differences = compare_documents(&original_docs, &result_docs);

    Ok(RoundTripResult {
        original: bytes.to_vec(),
        generated_source: imported.source,
        result: result_bytes,
        equivalent: differences.is_empty(),
        differences,
    })
}

/// Parse a multi-document YAML byte stream into `Value`s, skipping
/// empty documents — the same relaxed parse the Importer itself uses.
fn parse_multi_yaml(bytes: &[u8]) -> crate::Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes).map_err(|e| format_err!("round trip: invalid utf8: {}", e))?;
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| format_err!("round trip: invalid yaml: {}", e))?;
        if value.is_null() {
            continue;
        }
        docs.push(Value::from(&value));
    }
    Ok(docs)
}

/// `compare` extended with the document-count mismatch rule: a
/// differing number of documents is reported as a single MODIFIED at
/// the root path rather than walked element-by-element.
fn compare_documents(left: &[Value], right: &[Value]) -> Vec<Difference> {
    if left.len() != right.len() {
        return vec![Difference {
            path: String::new(),
            diff_type: DiffType::Modified,
            left: Some(Value::Int(left.len() as i64)),
            right: Some(Value::Int(right.len() as i64)),
        }];
    }
    let options = CompareOptions::default();
    let mut out = Vec::new();
    for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
        walk(&format!("doc[{}]", i), l, r, &options, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::OrderedMap;

    #[test]
    fn identical_values_produce_no_differences() {
        let mut m = OrderedMap::new();
        m.insert("a", Value::Int(1));
        let v = Value::Map(m);
        assert!(compare(&v, &v).is_empty());
    }

    #[test]
    fn numeric_types_do_not_count_as_modified() {
        let mut left = OrderedMap::new();
        left.insert("replicas", Value::Int(2));
        let mut right = OrderedMap::new();
        right.insert("replicas", Value::Float(2.0));
        let diffs = compare(&Value::Map(left), &Value::Map(right));
        assert!(diffs.is_empty());
    }

    #[test]
    fn missing_and_added_keys_are_reported() {
        let mut left = OrderedMap::new();
        left.insert("keep", Value::Int(1));
        left.insert("removed", Value::Int(2));
        let mut right = OrderedMap::new();
        right.insert("keep", Value::Int(1));
        right.insert("added", Value::Int(3));
        let diffs = compare(&Value::Map(left), &Value::Map(right));
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().any(|d| d.path == "removed" && d.diff_type == DiffType::Missing));
        assert!(diffs.iter().any(|d| d.path == "added" && d.diff_type == DiffType::Added));
    }

    #[test]
    fn round_trip_of_a_simple_config_map_is_clean() {
        let src = r#"var WebAppConfig = &corev1.ConfigMap{ Name: "web-app", Data: map[string]string{"key": "value"} }"#;
        let built = driver::build_source("t.go", src, &PipelineOptions::default()).unwrap();
        let manifest = built.output.unwrap();

        let result = round_trip(manifest.as_bytes(), &RoundTripOptions::default()).unwrap();
        assert!(result.equivalent, "differences: {:?}", result.differences);
        assert_eq!(result.original, manifest.as_bytes());
        assert!(result.generated_source.contains("ConfigMap"));
    }

    #[test]
    fn round_trip_of_empty_bytes_is_trivially_equivalent() {
        let result = round_trip(b"", &RoundTripOptions::default()).unwrap();
        assert!(result.equivalent);
        assert!(result.differences.is_empty());
    }

    #[test]
    fn round_trip_reports_a_document_count_mismatch() {
        let left = parse_multi_yaml(b"a: 1\n---\nb: 2\n").unwrap();
        let right = parse_multi_yaml(b"a: 1\n").unwrap();
        let diffs = compare_documents(&left, &right);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].path, "");
        assert_eq!(diffs[0].diff_type, DiffType::Modified);
    }
}
