//! Bundle Builder Binary
//!
//! Builds every package of a project and persists each package's version
//! index as soon as its build succeeds.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin bundle_builder --features cli -- project.json dependencies.json
//! ```
//!
//! `dependencies.json` maps every asset to its direct dependencies, as
//! exported by the content host: `{ "Assets/a.prefab": ["Assets/a.mat"] }`.

use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bundle_kernel::{
    InMemoryDependencyProvider, PackageBuilder, PackedArchiveBuilder, ProjectConfig,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bundle_builder=info,bundle_kernel=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_current_span(true).flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <project.json> <dependencies.json>", args[0]);
        return ExitCode::from(2);
    }
    let project_path = PathBuf::from(&args[1]);
    let dependencies_path = PathBuf::from(&args[2]);

    let mut project = match ProjectConfig::load(&project_path) {
        Ok(project) => project,
        Err(e) => {
            error!(path = %project_path.display(), error = %e, "failed to load project config");
            return ExitCode::FAILURE;
        }
    };
    let provider = match InMemoryDependencyProvider::from_json_file(&dependencies_path) {
        Ok(provider) => provider,
        Err(e) => {
            error!(path = %dependencies_path.display(), error = %e, "failed to load dependency map");
            return ExitCode::FAILURE;
        }
    };
    info!(assets = provider.num_assets(), packages = project.packages.len(), "starting build");

    let archiver = PackedArchiveBuilder::new(project.project_root.clone());
    let builder = PackageBuilder::new(&project, provider, archiver);

    let mut failed = 0usize;
    for idx in 0..project.packages.len() {
        match builder.build_package(&mut project.packages[idx]) {
            Ok(report) => {
                info!(
                    package = %report.session.package,
                    version_index = report.version_index,
                    bundles = report.plaintext.records.len(),
                    output = %report.output_dir.display(),
                    "package built"
                );
                if let Err(e) = project.save(&project_path) {
                    error!(error = %e, "failed to persist version index");
                    return ExitCode::FAILURE;
                }
            }
            Err(e) => {
                error!(package = %project.packages[idx].name, error = %e, "package build failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        error!(failed, "build finished with failures");
        ExitCode::FAILURE
    } else {
        info!("build finished");
        ExitCode::SUCCESS
    }
}
