//! Component A — the type registry.
//!
//! A process-wide, concurrently-readable mapping of package-alias/kind
//! pairs to API group/version metadata. Generalizes the common pattern
//! of a single shared, lockable configuration object (compare
//! `shipcat_definitions::config::Config`) to a concurrent registry
//! that many discoverers can read at once while one writer updates it.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// `group/version`, or just `version` when `group` is empty.
fn api_version_of(group: &str, version: &str) -> String {
    if group.is_empty() {
        version.to_string()
    } else {
        format!("{}/{}", group, version)
    }
}

/// Metadata for one `(package_alias, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub package_alias: String,
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Optional grouping tag for CRD bundles registered together via
    /// `register_crd_types`.
    pub domain: Option<String>,
}

impl TypeInfo {
    pub fn new<S: Into<String>>(package_alias: S, group: S, version: S, kind: S) -> Self {
        TypeInfo {
            package_alias: package_alias.into(),
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
            domain: None,
        }
    }

    pub fn api_version(&self) -> String {
        api_version_of(&self.group, &self.version)
    }

    fn qualified_name(&self) -> String {
        format!("{}.{}", self.package_alias, self.kind)
    }
}

/// Metadata for a package alias, independent of any one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub alias: String,
    pub group: String,
    pub version: String,
}

impl PackageInfo {
    pub fn api_version(&self) -> String {
        api_version_of(&self.group, &self.version)
    }
}

#[derive(Default)]
struct Inner {
    /// "package.Kind" -> TypeInfo
    qualified: HashMap<String, TypeInfo>,
    /// package_alias -> PackageInfo
    packages: HashMap<String, PackageInfo>,
    /// bare Kind -> TypeInfo (last registration wins)
    bare: HashMap<String, TypeInfo>,
}

/// Thread-safe, extensible type registry.
///
/// Many-reader/single-writer: all operations take a brief `RwLock`
/// read or write guard, never held across an I/O call.
#[derive(Clone)]
pub struct TypeRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl TypeRegistry {
    /// A registry with no entries, for tests that want full control.
    pub fn empty() -> Self {
        TypeRegistry {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// A registry pre-populated with the standard kinds across the
    /// recognized core/apps/batch/... groups.
    pub fn with_builtins() -> Self {
        let reg = Self::empty();
        reg.register_bulk(builtin_types());
        reg
    }

    /// Idempotent; overwrites any existing entry for the same qualified
    /// name. Thread-safe.
    pub fn register(&self, info: TypeInfo) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        inner.packages.insert(
            info.package_alias.clone(),
            PackageInfo {
                alias: info.package_alias.clone(),
                group: info.group.clone(),
                version: info.version.clone(),
            },
        );
        inner.bare.insert(info.kind.clone(), info.clone());
        inner.qualified.insert(info.qualified_name(), info);
    }

    pub fn register_bulk(&self, infos: impl IntoIterator<Item = TypeInfo>) {
        for info in infos {
            self.register(info);
        }
    }

    /// Convenience for registering a batch of CRD kinds that all share
    /// one `domain` grouping tag.
    pub fn register_crd_types(&self, domain: &str, infos: impl IntoIterator<Item = TypeInfo>) {
        for mut info in infos {
            info.domain = Some(domain.to_string());
            self.register(info);
        }
    }

    /// Accepts qualified ("pkg.Kind"), bare ("Kind"), or alias-only
    /// input; true if any of the three lookup tables contains a match.
    pub fn is_known_type(&self, name: &str) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.qualified.contains_key(name)
            || inner.bare.contains_key(name)
            || inner.packages.contains_key(name)
    }

    pub fn is_known_package(&self, alias: &str) -> bool {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.packages.contains_key(alias)
    }

    pub fn api_version_for_package(&self, alias: &str) -> Option<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.packages.get(alias).map(PackageInfo::api_version)
    }

    /// Look up by qualified "pkg.Kind" first, falling back to bare kind.
    pub fn get_type_info(&self, package_alias: Option<&str>, kind: &str) -> Option<TypeInfo> {
        let inner = self.inner.read().expect("registry lock poisoned");
        if let Some(alias) = package_alias {
            let qualified = format!("{}.{}", alias, kind);
            if let Some(t) = inner.qualified.get(&qualified) {
                return Some(t.clone());
            }
        }
        inner.bare.get(kind).cloned()
    }

    pub fn get_package_info(&self, alias: &str) -> Option<PackageInfo> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.packages.get(alias).cloned()
    }

    pub fn list_packages(&self) -> Vec<PackageInfo> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut v: Vec<_> = inner.packages.values().cloned().collect();
        v.sort_by(|a, b| a.alias.cmp(&b.alias));
        v
    }

    pub fn list_types(&self) -> Vec<TypeInfo> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut v: Vec<_> = inner.qualified.values().cloned().collect();
        v.sort_by(|a, b| a.qualified_name().cmp(&b.qualified_name()));
        v
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        *inner = Inner::default();
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// `(package_alias, group, version, kinds...)` groups, matching the
/// enumeration of builtin groups above.
fn builtin_types() -> Vec<TypeInfo> {
    let groups: &[(&str, &str, &str, &[&str])] = &[
        (
            "corev1",
            "",
            "v1",
            &[
                "Pod",
                "Service",
                "ConfigMap",
                "Secret",
                "Namespace",
                "ServiceAccount",
                "PersistentVolume",
                "PersistentVolumeClaim",
                "Node",
                "Endpoints",
                "Event",
                "LimitRange",
                "ResourceQuota",
                "ReplicationController",
                "PodTemplateSpec",
                "Container",
                "Volume",
            ],
        ),
        (
            "appsv1",
            "apps",
            "v1",
            &[
                "Deployment",
                "StatefulSet",
                "DaemonSet",
                "ReplicaSet",
                "ControllerRevision",
            ],
        ),
        ("batchv1", "batch", "v1", &["Job", "CronJob"]),
        (
            "networkingv1",
            "networking.k8s.io",
            "v1",
            &["Ingress", "IngressClass", "NetworkPolicy"],
        ),
        (
            "rbacv1",
            "rbac.authorization.k8s.io",
            "v1",
            &["Role", "RoleBinding", "ClusterRole", "ClusterRoleBinding"],
        ),
        (
            "storagev1",
            "storage.k8s.io",
            "v1",
            &["StorageClass", "VolumeAttachment", "CSIDriver", "CSINode"],
        ),
        (
            "policyv1",
            "policy",
            "v1",
            &["PodDisruptionBudget", "PodSecurityPolicy"],
        ),
        (
            "autoscalingv1",
            "autoscaling",
            "v1",
            &["HorizontalPodAutoscaler", "Scale"],
        ),
        (
            "autoscalingv2",
            "autoscaling",
            "v2",
            &["HorizontalPodAutoscaler", "Scale"],
        ),
    ];

    let mut out = Vec::new();
    for (alias, group, version, kinds) in groups {
        for kind in *kinds {
            out.push(TypeInfo::new(
                alias.to_string(),
                group.to_string(),
                version.to_string(),
                kind.to_string(),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_qualified_and_bare_and_alias() {
        let reg = TypeRegistry::with_builtins();
        assert!(reg.is_known_type("corev1.ConfigMap"));
        assert!(reg.is_known_type("ConfigMap"));
        assert!(reg.is_known_type("corev1"));
        assert!(!reg.is_known_type("corev1.NoSuchKind"));
    }

    #[test]
    fn api_version_rules() {
        let reg = TypeRegistry::with_builtins();
        assert_eq!(reg.api_version_for_package("corev1").as_deref(), Some("v1"));
        assert_eq!(
            reg.api_version_for_package("appsv1").as_deref(),
            Some("apps/v1")
        );
    }

    #[test]
    fn register_overwrites_atomically() {
        let reg = TypeRegistry::empty();
        reg.register(TypeInfo::new("foov1", "foo.example.com", "v1", "Widget"));
        reg.register(TypeInfo::new("foov1", "foo.example.com", "v2", "Widget"));
        let t = reg.get_type_info(Some("foov1"), "Widget").unwrap();
        assert_eq!(t.version, "v2");
    }

    #[test]
    fn concurrent_register_and_lookup_never_observes_partial_write() {
        use std::thread;
        let reg = TypeRegistry::empty();
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let reg = reg.clone();
                thread::spawn(move || {
                    reg.register(TypeInfo::new(
                        format!("pkg{}", i),
                        "example.com",
                        "v1",
                        format!("Kind{}", i),
                    ));
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        for i in 0..8 {
            assert!(reg.is_known_type(&format!("pkg{}.Kind{}", i, i)));
        }
    }
}
