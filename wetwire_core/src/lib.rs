#![allow(renamed_and_removed_lints)]
#![allow(non_snake_case)]

extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate serde_yaml;

extern crate petgraph;
extern crate regex;

#[cfg(feature = "filesystem")]
extern crate walkdir;

#[cfg(feature = "watch")]
extern crate notify;

#[macro_use]
extern crate log;

#[macro_use]
extern crate failure;

pub use failure::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Tokens and source positions for the Go-subset source language.
pub mod token;

/// The parsed abstract syntax tree for the Go-subset source language.
pub mod ast;

/// A hand-written recursive-descent parser from source bytes to `ast::File`.
pub mod parser;

/// Central, thread-safe mapping of package-alias/kind pairs to API group/version metadata.
pub mod registry;

/// The generic, recursive manifest document value used by the serializer,
/// importer and comparator.
pub mod value;

/// Walks file/directory ASTs and extracts top-level declared resources.
pub mod discover;

/// Referential integrity, cycle detection and topological sort over discovered resources.
pub mod graph;

/// Canonicalization (camelCase, zero-value elision) and YAML/JSON emission.
pub mod serialize;

/// Parses multi-document manifests and reconstructs a source-code representation.
pub mod import;

/// Parses manifest streams, normalizes them, and produces a path-addressed semantic diff.
pub mod diff;

/// Sequences discover/validate/order/serialize for a given source path.
pub mod driver;

/// Rule-based inspection of discovered resources with optional auto-rewrite.
pub mod lint;

/// Renders the dependency graph as an ASCII tree or as Graphviz DOT text.
pub mod format_graph;

/// Recursive filesystem observation with debounced rebuild.
#[cfg(feature = "watch")]
pub mod watch;

pub use ast::{Decl, Expr, File as SourceFile};
pub use diff::{compare, round_trip, CompareOptions, DiffType, Difference, RoundTripOptions, RoundTripResult};
pub use discover::{DiscoverError, DiscoverOptions, Discoverer, Resource};
pub use driver::{build, build_source, BuildResult, Format, OutputMode, PipelineOptions, StageError};
pub use format_graph::{format_ascii_tree, format_dot};
pub use graph::{topological_sort, validate_references, GraphError};
pub use import::{import, import_manifests, ImportOptions, ImportResult};
pub use lint::{
    format_violations, lint, DefaultFixer, Fix, Fixer, LintOptions, Rule, Severity, Violation,
};
pub use lint::Format as LintFormat;
pub use registry::{PackageInfo, TypeInfo, TypeRegistry};
pub use serialize::{to_json, to_multi_yaml, to_yaml};
pub use value::Value;

#[cfg(feature = "watch")]
pub use watch::{watch, WatchEvent, WatchOptions};
