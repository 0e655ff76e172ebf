//! Component H — the pipeline driver.
//!
//! Sequences the other components into five build stages: DISCOVER,
//! VALIDATE, EXTRACT, ORDER, SERIALIZE/EMIT.
//! EXTRACT is a deliberate no-op: there is no
//! separate extraction step beyond what `discover` already does while
//! walking the AST, so it is a literal no-op kept as its own named
//! stage for parity with the five-stage model and so a future stage
//! (e.g. external reference resolution) has somewhere to live.

use std::path::{Path, PathBuf};

use crate::discover::{DiscoverOptions, Discoverer, Resource};
use crate::graph::{topological_sort, validate_references};
use crate::registry::TypeRegistry;
use crate::serialize::{to_json, to_multi_yaml, to_yaml};

#[derive(Debug, Fail)]
pub enum StageErrorKind {
    #[fail(display = "discover stage: {}", _0)]
    Discover(failure::Error),
    #[fail(display = "validate stage: {}", _0)]
    Validate(failure::Error),
    #[fail(display = "order stage: {}", _0)]
    Order(failure::Error),
    #[fail(display = "serialize stage: {}", _0)]
    Serialize(failure::Error),
}

pub type StageError = StageErrorKind;

/// Wire format used for emission. Orthogonal to `OutputMode`, which
/// governs whether the emitted documents land in one file or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

/// Whether SERIALIZE/EMIT writes one combined file or one file per
/// resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    SingleFile,
    SeparateFiles,
}

#[derive(Clone)]
pub struct PipelineOptions {
    pub registry: TypeRegistry,
    pub format: Format,
    pub output_mode: OutputMode,
    /// Empty (`None`) composes the result in memory for the caller;
    /// otherwise SINGLE_FILE treats this as a file path and
    /// SEPARATE_FILES treats it as a target directory.
    pub output_path: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            registry: TypeRegistry::with_builtins(),
            format: Format::Yaml,
            output_mode: OutputMode::SingleFile,
            output_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub resources: Vec<Resource>,
    /// Resource names in dependency order, matching `resources`' order.
    pub order: Vec<String>,
    /// In-memory byte result, populated whenever `output_path` is empty.
    pub output: Option<String>,
    /// Populated when `output_mode` is SINGLE_FILE and `output_path` is set.
    pub output_path: Option<PathBuf>,
    /// Populated when `output_mode` is SEPARATE_FILES and `output_path` is set.
    pub output_paths: Vec<PathBuf>,
}

/// Run the full pipeline over a single source file or a directory of
/// source files (directory discovery requires the `filesystem` feature).
pub fn build(path: impl AsRef<Path>, options: &PipelineOptions) -> crate::Result<BuildResult> {
    let path = path.as_ref();
    let discover_options = DiscoverOptions {
        registry: options.registry.clone(),
        registry_only: true,
    };
    let discoverer = Discoverer::new(discover_options);

    info!("discovering resources under {}", path.display());
    let resources = discover(&discoverer, path)?;
    debug!("discovered {} resource(s)", resources.len());

    run_pipeline(resources, options)
}

/// Run the full pipeline over in-memory source text, `label` attributed
/// to the discovered resources the way a file path would be. Never
/// touches the filesystem — this is what `diff::round_trip` uses to
/// regenerate manifest bytes from Importer output without writing a
/// temporary file.
pub fn build_source(label: impl AsRef<Path>, src: &str, options: &PipelineOptions) -> crate::Result<BuildResult> {
    let discover_options = DiscoverOptions {
        registry: options.registry.clone(),
        registry_only: true,
    };
    let discoverer = Discoverer::new(discover_options);
    let resources = discoverer
        .discover_source(label, src)
        .map_err(StageErrorKind::Discover)?;
    debug!("discovered {} resource(s)", resources.len());

    run_pipeline(resources, options)
}

fn run_pipeline(resources: Vec<Resource>, options: &PipelineOptions) -> crate::Result<BuildResult> {
    validate_references(&resources).map_err(StageErrorKind::Validate)?;

    // EXTRACT: no-op by design (see module doc).
    let extracted = resources;

    let order = topological_sort(&extracted).map_err(StageErrorKind::Order)?;
    let ordered: Vec<Resource> = order
        .iter()
        .map(|name| {
            extracted
                .iter()
                .find(|r| &r.name == name)
                .cloned()
                .expect("topological_sort only returns known resource names")
        })
        .collect();

    match &options.output_path {
        None => {
            let output = emit_in_memory(&ordered, options.format).map_err(StageErrorKind::Serialize)?;
            Ok(BuildResult {
                resources: ordered,
                order,
                output: Some(output),
                output_path: None,
                output_paths: Vec::new(),
            })
        }
        Some(target) => match options.output_mode {
            OutputMode::SingleFile => {
                let output = emit_in_memory(&ordered, options.format).map_err(StageErrorKind::Serialize)?;
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| StageErrorKind::Serialize(format_err!("{}", e)))?;
                }
                std::fs::write(target, &output).map_err(|e| StageErrorKind::Serialize(format_err!("{}", e)))?;
                Ok(BuildResult {
                    resources: ordered,
                    order,
                    output: None,
                    output_path: Some(target.clone()),
                    output_paths: Vec::new(),
                })
            }
            OutputMode::SeparateFiles => {
                std::fs::create_dir_all(target).map_err(|e| StageErrorKind::Serialize(format_err!("{}", e)))?;
                let mut paths = Vec::with_capacity(ordered.len());
                for resource in &ordered {
                    let text = match options.format {
                        Format::Yaml => to_yaml(resource),
                        Format::Json => to_json(resource),
                    }
                    .map_err(StageErrorKind::Serialize)?;
                    let file_path = target.join(format!("{}.yaml", resource.name));
                    std::fs::write(&file_path, text)
                        .map_err(|e| StageErrorKind::Serialize(format_err!("{}", e)))?;
                    paths.push(file_path);
                }
                Ok(BuildResult {
                    resources: ordered,
                    order,
                    output: None,
                    output_path: None,
                    output_paths: paths,
                })
            }
        },
    }
}

#[cfg(feature = "filesystem")]
fn discover(discoverer: &Discoverer, path: &Path) -> crate::Result<Vec<Resource>> {
    if path.is_dir() {
        discoverer.discover_dir(path).map_err(StageErrorKind::Discover)
    } else {
        discoverer.discover_file(path).map_err(StageErrorKind::Discover)
    }
}

#[cfg(not(feature = "filesystem"))]
fn discover(discoverer: &Discoverer, path: &Path) -> crate::Result<Vec<Resource>> {
    discoverer.discover_file(path).map_err(StageErrorKind::Discover)
}

/// Compose the single in-memory byte result for a whole build: a
/// multi-document YAML stream, or a JSON array of documents.
fn emit_in_memory(resources: &[Resource], format: Format) -> crate::Result<String> {
    match format {
        Format::Yaml => to_multi_yaml(resources),
        Format::Json => {
            let docs: crate::Result<Vec<String>> = resources.iter().map(to_json).collect();
            Ok(format!("[{}]", docs?.join(",")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn build_orders_dependent_resources_before_emitting() {
        let src = r#"
            package manifests
            var WebAppDeployment = &appsv1.Deployment{
                Name: WebAppConfig.Name,
            }
            var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(src.as_bytes()).unwrap();

        let result = build(file.path(), &PipelineOptions::default()).unwrap();
        let pos_config = result.order.iter().position(|n| n == "WebAppConfig").unwrap();
        let pos_deploy = result.order.iter().position(|n| n == "WebAppDeployment").unwrap();
        assert!(pos_config < pos_deploy);
        assert!(result.output.unwrap().contains("---\n"));
        assert!(result.output_path.is_none());
        assert!(result.output_paths.is_empty());
    }

    #[test]
    fn build_source_runs_the_pipeline_without_touching_disk() {
        let src = r#"var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }"#;
        let result = build_source("in_memory.go", src, &PipelineOptions::default()).unwrap();
        assert_eq!(result.order, vec!["WebAppConfig".to_string()]);
        assert!(result.output.unwrap().contains("kind: ConfigMap"));
    }

    #[test]
    fn build_rejects_a_cycle() {
        let src = r#"
            var A = &corev1.ConfigMap{ Name: B.Name }
            var B = &corev1.ConfigMap{ Name: A.Name }
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(src.as_bytes()).unwrap();
        assert!(build(file.path(), &PipelineOptions::default()).is_err());
    }

    #[test]
    fn single_file_output_path_writes_one_multi_document_file() {
        let src = r#"var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(src.as_bytes()).unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let target = out_dir.path().join("nested").join("manifest.yaml");
        let options = PipelineOptions {
            output_path: Some(target.clone()),
            ..PipelineOptions::default()
        };
        let result = build(file.path(), &options).unwrap();
        assert_eq!(result.output_path, Some(target.clone()));
        assert!(result.output.is_none());
        let written = std::fs::read_to_string(&target).unwrap();
        assert!(written.contains("kind: ConfigMap"));
    }

    #[test]
    fn separate_files_output_path_writes_one_file_per_resource() {
        let src = r#"
            var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }
            var OtherConfig = &corev1.ConfigMap{ Name: "other" }
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(src.as_bytes()).unwrap();

        let out_dir = tempfile::tempdir().unwrap();
        let options = PipelineOptions {
            output_mode: OutputMode::SeparateFiles,
            output_path: Some(out_dir.path().to_path_buf()),
            ..PipelineOptions::default()
        };
        let result = build(file.path(), &options).unwrap();
        assert_eq!(result.output_paths.len(), 2);
        for path in &result.output_paths {
            assert!(path.exists());
        }
    }
}
