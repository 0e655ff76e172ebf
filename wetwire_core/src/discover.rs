//! Component C — the discoverer.
//!
//! Walks parsed source files, picks out every top-level `var` binding
//! whose type resolves to a known Kubernetes kind via the type
//! registry, and produces one `Resource` per binding together with its
//! declared-dependency list.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::ast::{Decl, Expr, File, ValueSpec};
use crate::parser;
use crate::registry::TypeRegistry;
use crate::token::Line;

/// One discovered resource binding.
#[derive(Debug, Clone)]
pub struct Resource {
    /// The Go variable name, e.g. `WebAppDeployment`.
    pub name: String,
    pub kind: String,
    pub api_version: String,
    pub package_alias: Option<String>,
    pub file: PathBuf,
    pub line: Line,
    /// Names of other top-level bindings this resource's initializer
    /// expression refers to, in first-occurrence order.
    pub dependencies: Vec<String>,
    /// The initializer expression, unwrapped of any leading `&`/`*` —
    /// the serializer walks this to build the manifest document body.
    pub literal: Expr,
}

#[derive(Debug, Fail)]
pub enum DiscoverErrorKind {
    #[fail(display = "{}: {}", _0, _1)]
    Parse(String, failure::Error),
    #[fail(
        display = "duplicate resource name {:?}: declared at {}:{} and again at {}:{}",
        _0, _1, _2, _3, _4
    )]
    DuplicateResourceName(String, String, Line, String, Line),
    #[fail(display = "{}:{}: cannot read directory entry: {}", _0, _1, _2)]
    Io(String, Line, String),
}

pub type DiscoverError = DiscoverErrorKind;

/// Options controlling discovery.
#[derive(Clone)]
pub struct DiscoverOptions {
    pub registry: TypeRegistry,
    /// Only bindings whose `typ`/initializer resolves against the
    /// registry are kept; everything else is silently skipped, per
    /// "only resource-shaped bindings become resources".
    pub registry_only: bool,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        DiscoverOptions {
            registry: TypeRegistry::with_builtins(),
            registry_only: true,
        }
    }
}

pub struct Discoverer {
    options: DiscoverOptions,
}

impl Discoverer {
    pub fn new(options: DiscoverOptions) -> Self {
        Discoverer { options }
    }

    /// Parse and discover resources from a single in-memory source
    /// string, attributed to `file` for error messages and `Resource::file`.
    pub fn discover_source(&self, file: impl AsRef<Path>, src: &str) -> crate::Result<Vec<Resource>> {
        let file = file.as_ref();
        let parsed = parser::parse(src).map_err(|e| {
            DiscoverErrorKind::Parse(file.display().to_string(), e)
        })?;
        Ok(self.resources_from_file(file, &parsed))
    }

    /// Discover resources from a single file on disk. `Resource::file`
    /// is always the canonicalized absolute path, per the discovered-set
    /// invariant that `file_path` is absolute.
    pub fn discover_file(&self, path: impl AsRef<Path>) -> crate::Result<Vec<Resource>> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .map_err(|e| DiscoverErrorKind::Io(path.display().to_string(), 0, e.to_string()))?;
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.discover_source(absolute, &src)
    }

    /// Recursively walk `root`, parsing every `.go` file, merging all
    /// discovered resources and checking for cross-file name collisions.
    #[cfg(feature = "filesystem")]
    pub fn discover_dir(&self, root: impl AsRef<Path>) -> crate::Result<Vec<Resource>> {
        let root = root.as_ref();
        let mut all = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            match self.discover_file(entry.path()) {
                // discover_file already canonicalizes; a symlink cycle or
                // permission error just skips this one entry.
                Ok(mut resources) => all.append(&mut resources),
                Err(e) => warn!("skipping {}: {}", entry.path().display(), e),
            }
        }
        self.check_duplicates(&all)?;
        Ok(all)
    }

    fn resources_from_file(&self, file: &Path, parsed: &File) -> Vec<Resource> {
        // A bare identifier or selector base only counts as a dependency
        // if it names another top-level binding declared in this same
        // file; anything else (a package alias, a helper function such
        // as `intstr.FromInt`) is just noise collected conservatively by
        // `collect_identifier_bases` and must be filtered back out here.
        let sibling_names: HashSet<&str> = parsed
            .decls
            .iter()
            .filter_map(|decl| match decl {
                Decl::Var(specs) => Some(specs.iter().map(|s| s.name.as_str())),
                Decl::Other => None,
            })
            .flatten()
            .filter(|name| *name != "_")
            .collect();

        let mut out = Vec::new();
        for decl in &parsed.decls {
            if let Decl::Var(specs) = decl {
                for spec in specs {
                    if let Some(resource) = self.resource_from_spec(file, spec, &sibling_names) {
                        out.push(resource);
                    }
                }
            }
        }
        out
    }

    fn resource_from_spec(&self, file: &Path, spec: &ValueSpec, sibling_names: &HashSet<&str>) -> Option<Resource> {
        // The blank symbol never declares a resource; Go only allows it
        // to discard a value, and a discovered set can't refer to it.
        if spec.name == "_" {
            return None;
        }
        let init = spec.value.as_ref()?;
        let literal = unwrap_unary(init);
        let qualifier = literal
            .kind_qualifier()
            .or_else(|| spec.typ.as_ref().and_then(Expr::kind_qualifier))?;
        let (alias, kind) = qualifier;

        if self.options.registry_only {
            let known = self
                .options
                .registry
                .get_type_info(alias.as_deref(), &kind)
                .is_some();
            if !known {
                debug!(
                    "{}:{}: {:?} does not resolve to a known kind, skipping",
                    file.display(),
                    spec.line,
                    spec.name
                );
                return None;
            }
        }

        let type_info = self.options.registry.get_type_info(alias.as_deref(), &kind);
        let api_version = type_info
            .as_ref()
            .map(|t| t.api_version())
            .or_else(|| {
                alias
                    .as_deref()
                    .and_then(|a| self.options.registry.api_version_for_package(a))
            })
            .unwrap_or_default();

        let mut dependencies = Vec::new();
        literal.collect_identifier_bases(&mut dependencies);
        dependencies.retain(|name| sibling_names.contains(name.as_str()));
        // Self-references are kept rather than filtered out here: the
        // graph engine's VALIDATE stage is what is specified to reject
        // them, not silent removal at discovery time.

        Some(Resource {
            name: spec.name.clone(),
            kind,
            api_version,
            package_alias: alias,
            file: file.to_path_buf(),
            line: spec.line,
            dependencies,
            literal: literal.clone(),
        })
    }

    fn check_duplicates(&self, resources: &[Resource]) -> crate::Result<()> {
        let mut seen: HashMap<&str, &Resource> = HashMap::new();
        for r in resources {
            if let Some(first) = seen.get(r.name.as_str()) {
                bail!(DiscoverErrorKind::DuplicateResourceName(
                    r.name.clone(),
                    first.file.display().to_string(),
                    first.line,
                    r.file.display().to_string(),
                    r.line,
                ));
            }
            seen.insert(&r.name, r);
        }
        Ok(())
    }
}

fn unwrap_unary(e: &Expr) -> &Expr {
    match e {
        Expr::Unary(_, inner) => unwrap_unary(inner),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discoverer() -> Discoverer {
        Discoverer::new(DiscoverOptions::default())
    }

    #[test]
    fn discovers_a_single_known_kind() {
        let src = r#"
            package manifests
            var WebAppConfig = &corev1.ConfigMap{
                Name: "web-app",
            }
        "#;
        let resources = discoverer().discover_source("app.go", src).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].name, "WebAppConfig");
        assert_eq!(resources[0].kind, "ConfigMap");
        assert_eq!(resources[0].api_version, "v1");
    }

    #[test]
    fn skips_bindings_that_do_not_resolve_to_known_kinds() {
        let src = r#"
            package manifests
            var notAResource = 5
        "#;
        let resources = discoverer().discover_source("app.go", src).unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn collects_sibling_binding_dependencies() {
        let src = r#"
            package manifests
            var WebAppConfig = &corev1.ConfigMap{ Name: "web-app" }
            var WebAppDeployment = &appsv1.Deployment{
                Name: WebAppConfig.Name,
            }
        "#;
        let resources = discoverer().discover_source("app.go", src).unwrap();
        let deployment = resources.iter().find(|r| r.name == "WebAppDeployment").unwrap();
        assert_eq!(deployment.dependencies, vec!["WebAppConfig".to_string()]);
    }

    #[test]
    fn helper_calls_and_package_aliases_are_not_dependencies() {
        let src = r#"
            package manifests
            var Web = &corev1.Service{
                Name: "web",
                TargetPort: intstr.FromInt(8080),
            }
        "#;
        let resources = discoverer().discover_source("app.go", src).unwrap();
        let web = resources.iter().find(|r| r.name == "Web").unwrap();
        assert!(web.dependencies.is_empty(), "{:?}", web.dependencies);
    }

    #[test]
    fn duplicate_names_across_files_are_rejected() {
        let d = discoverer();
        let mut a = d.discover_source("a.go", r#"var X = &corev1.ConfigMap{Name: "a"}"#).unwrap();
        let b = d.discover_source("b.go", r#"var X = &corev1.ConfigMap{Name: "b"}"#).unwrap();
        a.extend(b);
        assert!(d.check_duplicates(&a).is_err());
    }
}
