//! A thin command-line wrapper around `wetwire_core`.
//!
//! The command surface itself — subcommands, flags, exit codes — is
//! deliberately out of scope for the library; this crate only exists
//! to give the library something to be invoked by, the way
//! `shipcat_cli` sits thinly over `shipcat_definitions`.

#[macro_use]
extern crate log;
#[macro_use]
extern crate failure;

extern crate clap;
extern crate serde_yaml;
extern crate wetwire_core;

pub use failure::Error;
pub type Result<T> = std::result::Result<T, Error>;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wetwire_core::{
    build, compare, format_ascii_tree, format_dot, lint, round_trip, DiffType, DiscoverOptions,
    Discoverer, Format, ImportOptions, LintOptions, PipelineOptions, RoundTripOptions, TypeRegistry,
};

#[derive(Parser)]
#[command(name = "wetwire", about = "Compile Go-declared Kubernetes resources to manifests, and back")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover, validate, order and emit manifests for a source path.
    Build {
        path: PathBuf,
        #[arg(long, value_enum, default_value = "yaml")]
        output: OutputFormat,
    },
    /// Watch a source directory and rebuild on change.
    Watch { path: PathBuf },
    /// Reconstruct a Go source declaration from a manifest document.
    Import { manifest: PathBuf },
    /// Diff two manifest streams.
    Diff { left: PathBuf, right: PathBuf },
    /// Import a manifest, rebuild it, and report whether it round-trips clean.
    RoundTrip { manifest: PathBuf },
    /// Lint discovered resources.
    Lint { path: PathBuf },
    /// Render the dependency graph.
    Graph {
        path: PathBuf,
        #[arg(long, value_enum, default_value = "ascii")]
        format: GraphFormat,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl From<OutputFormat> for Format {
    fn from(f: OutputFormat) -> Self {
        match f {
            OutputFormat::Yaml => Format::Yaml,
            OutputFormat::Json => Format::Json,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum GraphFormat {
    Ascii,
    Dot,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Build { path, output } => {
            let options = PipelineOptions {
                registry: TypeRegistry::with_builtins(),
                format: output.into(),
                ..PipelineOptions::default()
            };
            let result = build(&path, &options)?;
            info!("built {} resource(s)", result.resources.len());
            if let Some(output) = result.output {
                println!("{}", output);
            }
        }
        Command::Watch { path } => {
            wetwire_core::watch(
                &path,
                &wetwire_core::WatchOptions::default(),
                |event| match event {
                    wetwire_core::WatchEvent::InitialBuilt(result) | wetwire_core::WatchEvent::Built(result) => {
                        info!("built {} resource(s)", result.resources.len());
                        if let Some(output) = result.output {
                            println!("{}", output);
                        }
                    }
                    wetwire_core::WatchEvent::InitialBuildFailed(message) | wetwire_core::WatchEvent::BuildFailed(message) => {
                        warn!("build failed: {}", message);
                    }
                },
                || false,
            )?;
        }
        Command::Import { manifest } => {
            let bytes = std::fs::read(&manifest)?;
            let result = wetwire_core::import_manifests(&bytes, &ImportOptions::default())?;
            for warning in &result.warnings {
                warn!("{}", warning);
            }
            println!("{}", result.source);
        }
        Command::Diff { left, right } => {
            let left_text = std::fs::read_to_string(&left)?;
            let right_text = std::fs::read_to_string(&right)?;
            let left_value = wetwire_core::Value::from(&serde_yaml::from_str::<serde_yaml::Value>(&left_text)?);
            let right_value = wetwire_core::Value::from(&serde_yaml::from_str::<serde_yaml::Value>(&right_text)?);
            let differences = compare(&left_value, &right_value);
            if differences.is_empty() {
                println!("no differences");
            } else {
                for d in &differences {
                    let label = match d.diff_type {
                        DiffType::Missing => "missing",
                        DiffType::Added => "added",
                        DiffType::Modified => "modified",
                    };
                    println!("{}: {}", label, d.path);
                }
            }
        }
        Command::RoundTrip { manifest } => {
            let bytes = std::fs::read(&manifest)?;
            let result = round_trip(&bytes, &RoundTripOptions::default())?;
            if result.equivalent {
                println!("round trip clean");
            } else {
                for d in &result.differences {
                    let label = match d.diff_type {
                        DiffType::Missing => "missing",
                        DiffType::Added => "added",
                        DiffType::Modified => "modified",
                    };
                    println!("{}: {}", label, d.path);
                }
            }
        }
        Command::Lint { path } => {
            let discoverer = Discoverer::new(DiscoverOptions::default());
            let src = std::fs::read_to_string(&path)?;
            let resources = discoverer.discover_source(&path, &src)?;
            let violations = lint(&resources, &LintOptions::default());
            let text = wetwire_core::format_violations(
                &violations,
                wetwire_core::Severity::Info,
                wetwire_core::LintFormat::Text,
            );
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        Command::Graph { path, format } => {
            let discoverer = Discoverer::new(DiscoverOptions::default());
            let src = std::fs::read_to_string(&path)?;
            let resources = discoverer.discover_source(&path, &src)?;
            match format {
                GraphFormat::Ascii => println!("{}", format_ascii_tree(&resources)),
                GraphFormat::Dot => println!("{}", format_dot(&resources)),
            }
        }
    }
    Ok(())
}

